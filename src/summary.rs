//! Aggregate counts over a run.
//!
//! A [`Tally`] is the running accumulator owned by whoever drives the run.
//! Folding is addition, so the final counts do not depend on the order
//! outcomes are folded in.  [`Tally::summarize`] consumes it and yields the
//! read-only [`Summary`]; nothing can be folded into a summary afterwards.

use serde::Serialize;

use crate::verify::{Outcome, Verdict};

/// Final counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total:       usize,
    pub matched:     usize,
    pub mismatched:  usize,
    pub no_checksum: usize,
    pub unreadable:  usize,
    /// Subset of `unreadable` where the file did not exist.
    pub missing:     usize,
}

impl Summary {
    pub fn count(&self, verdict: Verdict) -> usize {
        match verdict {
            Verdict::Match           => self.matched,
            Verdict::Mismatch        => self.mismatched,
            Verdict::NoChecksumFound => self.no_checksum,
            Verdict::Unreadable      => self.unreadable,
        }
    }

    /// Unreadable for any reason other than the file being absent.
    pub fn read_errors(&self) -> usize {
        self.unreadable - self.missing
    }

    /// True when every target matched.
    pub fn is_ok(&self) -> bool {
        self.mismatched == 0 && self.no_checksum == 0 && self.unreadable == 0
    }
}

/// Running counts; folded one outcome at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: Summary,
}

impl Tally {
    pub fn fold_verdict(&mut self, verdict: Verdict) {
        let c = &mut self.counts;
        c.total += 1;
        match verdict {
            Verdict::Match           => c.matched += 1,
            Verdict::Mismatch        => c.mismatched += 1,
            Verdict::NoChecksumFound => c.no_checksum += 1,
            Verdict::Unreadable      => c.unreadable += 1,
        }
    }

    pub fn fold(&mut self, outcome: &Outcome) {
        self.fold_verdict(outcome.verdict);
        if outcome.is_missing() {
            self.counts.missing += 1;
        }
    }

    /// Add another tally's counts, e.g. a per-directory tally into a total.
    pub fn merge(&mut self, other: &Tally) {
        let (a, b) = (&mut self.counts, &other.counts);
        a.total       += b.total;
        a.matched     += b.matched;
        a.mismatched  += b.mismatched;
        a.no_checksum += b.no_checksum;
        a.unreadable  += b.unreadable;
        a.missing     += b.missing;
    }

    /// Counts folded so far.
    pub fn peek(&self) -> &Summary {
        &self.counts
    }

    /// Close the tally.
    pub fn summarize(self) -> Summary {
        self.counts
    }
}

impl FromIterator<Verdict> for Tally {
    fn from_iter<T: IntoIterator<Item = Verdict>>(iter: T) -> Self {
        let mut tally = Tally::default();
        tally.extend(iter);
        tally
    }
}

impl Extend<Verdict> for Tally {
    fn extend<T: IntoIterator<Item = Verdict>>(&mut self, iter: T) {
        for verdict in iter {
            self.fold_verdict(verdict);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksum;
    use crate::resolve::{IoFailure, Target};
    use proptest::prelude::*;
    use std::io;
    use std::path::PathBuf;

    fn verdict_strategy() -> impl Strategy<Value = Verdict> {
        prop_oneof![
            Just(Verdict::Match),
            Just(Verdict::Mismatch),
            Just(Verdict::NoChecksumFound),
            Just(Verdict::Unreadable),
        ]
    }

    fn summarize(verdicts: &[Verdict]) -> Summary {
        verdicts.iter().copied().collect::<Tally>().summarize()
    }

    #[test]
    fn counts_per_verdict() {
        let s = summarize(&[Verdict::Match, Verdict::Mismatch, Verdict::Match]);
        assert_eq!(s.matched, 2);
        assert_eq!(s.mismatched, 1);
        assert_eq!(s.total, 3);
        assert_eq!(s.count(Verdict::Match), 2);
        assert!(!s.is_ok());
    }

    #[test]
    fn empty_and_all_matching_are_ok() {
        assert!(Tally::default().summarize().is_ok());
        assert!(summarize(&[Verdict::Match, Verdict::Match]).is_ok());
    }

    #[test]
    fn one_unreadable_fails_the_run() {
        assert!(!summarize(&[Verdict::Match, Verdict::Unreadable]).is_ok());
    }

    #[test]
    fn missing_is_tracked_separately() {
        let outcome = Outcome {
            target:  Target::from_filename(PathBuf::from("gone"), Some(Checksum(0))),
            actual:  None,
            error:   Some(IoFailure { kind: io::ErrorKind::NotFound, message: "gone".into() }),
            verdict: Verdict::Unreadable,
        };
        let mut tally = Tally::default();
        tally.fold(&outcome);
        let s = tally.summarize();
        assert_eq!((s.unreadable, s.missing, s.read_errors()), (1, 1, 0));
    }

    #[test]
    fn merge_adds_counts() {
        let mut a: Tally = [Verdict::Match].into_iter().collect();
        let b: Tally = [Verdict::Mismatch, Verdict::NoChecksumFound].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.peek().total, 3);
        let s = a.summarize();
        assert_eq!(s.no_checksum, 1);
        assert_eq!(s.total, 3);
    }

    proptest! {
        #[test]
        fn fold_order_does_not_matter(mut verdicts in proptest::collection::vec(verdict_strategy(), 0..64)) {
            let forward = summarize(&verdicts);
            verdicts.reverse();
            let backward = summarize(&verdicts);
            prop_assert_eq!(forward, backward);
            prop_assert_eq!(forward.is_ok(), verdicts.iter().all(|v| v.is_ok()));
        }
    }
}
