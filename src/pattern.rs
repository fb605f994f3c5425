//! OSC address pattern matching
//!
//! Patterns use the OSC 1.0 glob syntax: `?` for one character, `*` for a
//! run of characters, `[a-z]` / `[!a-z]` character classes and `{foo,bar}`
//! alternatives, none of which cross a `/` separator. Matching proceeds
//! component by component and may stop early with one side exhausted; the
//! completion flags record which.

use bitflags::bitflags;

bitflags! {
    /// Outcome of [`match_pattern`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MatchResult: u32 {
        /// The whole pattern was consumed, with the address at a
        /// component boundary.
        const PATTERN_COMPLETE = 0b01;
        /// The whole address was consumed, with the pattern at a
        /// component boundary.
        const ADDRESS_COMPLETE = 0b10;
    }
}

/// Completion flags plus the number of pattern and address bytes consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub result: MatchResult,
    pub pattern_consumed: usize,
    pub address_consumed: usize,
}

/// Match `pattern` against `address` up to `/` boundaries.
pub fn match_pattern(pattern: &str, address: &str) -> Match {
    let p = pattern.as_bytes();
    let a = address.as_bytes();
    let mut pi = 0;
    let mut ai = 0;

    loop {
        let pe = component_end(p, pi);
        let ae = component_end(a, ai);
        if !component_match(&p[pi..pe], &a[ai..ae]) {
            break;
        }
        pi = pe;
        ai = ae;
        if pi == p.len() || ai == a.len() {
            break;
        }
        // both sides sit on a separator
        pi += 1;
        ai += 1;
    }

    let mut result = MatchResult::empty();
    if pi == p.len() && (ai == a.len() || a[ai] == b'/') {
        result |= MatchResult::PATTERN_COMPLETE;
    }
    if ai == a.len() && (pi == p.len() || p[pi] == b'/') {
        result |= MatchResult::ADDRESS_COMPLETE;
    }
    Match {
        result,
        pattern_consumed: pi,
        address_consumed: ai,
    }
}

fn component_end(s: &[u8], from: usize) -> usize {
    s[from..]
        .iter()
        .position(|&c| c == b'/')
        .map(|i| from + i)
        .unwrap_or(s.len())
}

/// Match one pattern component against one address component.
fn component_match(p: &[u8], a: &[u8]) -> bool {
    if p.is_empty() {
        return a.is_empty();
    }
    match p[0] {
        b'*' => {
            // shortest-first backtracking keeps the recursion shallow
            (0..=a.len()).any(|n| component_match(&p[1..], &a[n..]))
        }
        b'?' => !a.is_empty() && component_match(&p[1..], &a[1..]),
        b'[' => match class_end(p) {
            Some(end) => {
                !a.is_empty()
                    && class_match(&p[1..end], a[0])
                    && component_match(&p[end + 1..], &a[1..])
            }
            None => false,
        },
        b'{' => match p.iter().position(|&c| c == b'}') {
            Some(end) => p[1..end].split(|&c| c == b',').any(|alt| {
                a.len() >= alt.len()
                    && &a[..alt.len()] == alt
                    && component_match(&p[end + 1..], &a[alt.len()..])
            }),
            None => false,
        },
        c => !a.is_empty() && a[0] == c && component_match(&p[1..], &a[1..]),
    }
}

fn class_end(p: &[u8]) -> Option<usize> {
    p.iter().skip(1).position(|&c| c == b']').map(|i| i + 1)
}

fn class_match(set: &[u8], c: u8) -> bool {
    let (set, negate) = match set.first() {
        Some(b'!') => (&set[1..], true),
        _ => (set, false),
    };
    let mut hit = false;
    let mut i = 0;
    while i < set.len() {
        if i + 2 < set.len() && set[i + 1] == b'-' {
            if (set[i]..=set[i + 2]).contains(&c) {
                hit = true;
            }
            i += 3;
        } else {
            if set[i] == c {
                hit = true;
            }
            i += 1;
        }
    }
    hit != negate
}
