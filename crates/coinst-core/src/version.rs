use std::cmp::Ordering;

use crate::Relation;

/// Orders version strings. The solver only ever sees versions through this
/// trait, so the ordering policy can be swapped per universe.
pub trait VersionComparator {
    fn compare(&self, left: &str, right: &str) -> Ordering;

    fn satisfies(&self, left: &str, relation: Relation, right: &str) -> bool {
        let ordering = self.compare(left, right);
        match relation {
            Relation::None => true,
            Relation::Lt => ordering == Ordering::Less,
            Relation::LtEq => ordering != Ordering::Greater,
            Relation::Eq => ordering == Ordering::Equal,
            Relation::GtEq => ordering != Ordering::Less,
            Relation::Gt => ordering == Ordering::Greater,
        }
    }
}

/// dpkg ordering: `[epoch:]upstream[-revision]`.
///
/// Non-digit runs compare character by character with letters before other
/// characters and `~` before everything, even the end of the run; digit runs
/// compare numerically with an empty run counting as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebianVersions;

impl VersionComparator for DebianVersions {
    fn compare(&self, left: &str, right: &str) -> Ordering {
        if left == right {
            return Ordering::Equal;
        }

        let (left_epoch, left_upstream, left_revision) = split_version(left);
        let (right_epoch, right_upstream, right_revision) = split_version(right);

        left_epoch
            .cmp(&right_epoch)
            .then_with(|| compare_part(left_upstream, right_upstream))
            .then_with(|| compare_part(left_revision, right_revision))
    }
}

fn split_version(version: &str) -> (u64, &str, &str) {
    let (epoch, rest) = match version.split_once(':') {
        Some((epoch, rest)) if !epoch.is_empty() && epoch.bytes().all(|b| b.is_ascii_digit()) => {
            (epoch.parse().unwrap_or(u64::MAX), rest)
        }
        _ => (0, version),
    };
    match rest.rsplit_once('-') {
        Some((upstream, revision)) => (epoch, upstream, revision),
        None => (epoch, rest, ""),
    }
}

fn char_order(ch: Option<u8>) -> i32 {
    match ch {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

fn compare_part(left: &str, right: &str) -> Ordering {
    let mut left = left.as_bytes();
    let mut right = right.as_bytes();

    while !left.is_empty() || !right.is_empty() {
        loop {
            let l = left.first().copied().filter(|c| !c.is_ascii_digit());
            let r = right.first().copied().filter(|c| !c.is_ascii_digit());
            if l.is_none() && r.is_none() {
                break;
            }
            let ordering = char_order(l).cmp(&char_order(r));
            if ordering != Ordering::Equal {
                return ordering;
            }
            left = &left[1..];
            right = &right[1..];
        }

        let left_digits = left.iter().take_while(|c| c.is_ascii_digit()).count();
        let right_digits = right.iter().take_while(|c| c.is_ascii_digit()).count();
        let ordering = compare_digits(&left[..left_digits], &right[..right_digits]);
        if ordering != Ordering::Equal {
            return ordering;
        }
        left = &left[left_digits..];
        right = &right[right_digits..];
    }

    Ordering::Equal
}

// Arbitrarily long digit runs: strip leading zeros, then longer is larger.
fn compare_digits(left: &[u8], right: &[u8]) -> Ordering {
    let trim = |digits: &[u8]| -> usize { digits.iter().take_while(|d| **d == b'0').count() };
    let left = &left[trim(left)..];
    let right = &right[trim(right)..];
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}
