//! # LRU replacement
//! the recency of a line is kept as an age counter:
//! - every access to a set ages all the valid lines of that set by one
//! - the touched (hit or installed) line goes back to age 0
//!
//! so inside a set, a line that was touched earlier always has a larger age than
//! a line touched later, and the line with the largest age is the least recently used one.

use super::Line;

/// age every valid line of the set, done before looking for the tag
pub(super) fn age_valid_lines(lines: &mut [Line]) {
    for line in lines.iter_mut().filter(|line| line.valid) {
        line.age = line.age.saturating_add(1);
    }
}

/// the first empty line of the set
pub(super) fn find_empty(lines: &[Line]) -> Option<usize> {
    lines.iter().position(|line| !line.valid)
}

/// the line to evict from a full set: the oldest one, the lowest index wins a tie
pub(super) fn find_victim(lines: &[Line]) -> usize {
    let mut victim = 0;
    for (index, line) in lines.iter().enumerate().skip(1) {
        if line.age > lines[victim].age {
            victim = index;
        }
    }
    victim
}

/// make the line the most recently used one
pub(super) fn touch(line: &mut Line) {
    line.age = 0;
}
