//! Verification: one [`Target`] in, one [`Outcome`] out.
//!
//! [`verify`] never fails; every problem becomes a [`Verdict`].  [`run`]
//! drives a whole stream of targets, reporting outcomes in resolver order and
//! folding them into the [`Tally`] owned by the run.
//!
//! # Parallelism
//! With the `parallel` feature, targets are pulled in batches and checked on
//! a Rayon pool.  Each batch is collected in order before it is reported, so
//! the sink sees exactly the sequence the sequential path would produce.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::checksum::{self, Checksum};
use crate::resolve::{Fault, IoFailure, Target};
use crate::summary::{Summary, Tally};

/// Targets pulled from the resolver per parallel batch.
pub const PARALLEL_BATCH: usize = 64;

// ── Verdict / Outcome ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Match,
    Mismatch,
    NoChecksumFound,
    Unreadable,
}

impl Verdict {
    pub fn is_ok(self) -> bool {
        self == Verdict::Match
    }
}

/// The result of checking one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub target:  Target,
    /// Computed checksum, present whenever the file was read to the end.
    pub actual:  Option<Checksum>,
    pub error:   Option<IoFailure>,
    pub verdict: Verdict,
}

impl Outcome {
    /// Unreadable because the file does not exist.
    pub fn is_missing(&self) -> bool {
        self.verdict == Verdict::Unreadable && self.error.as_ref().is_some_and(IoFailure::is_not_found)
    }
}

/// Pure verdict function.
pub fn classify(expected: Option<Checksum>, actual: Option<Checksum>, readable: bool) -> Verdict {
    match (expected, actual) {
        (None, _)                    => Verdict::NoChecksumFound,
        _ if !readable               => Verdict::Unreadable,
        (Some(e), Some(a)) if e == a => Verdict::Match,
        (Some(_), Some(_))           => Verdict::Mismatch,
        (Some(_), None)              => Verdict::Unreadable,
    }
}

/// Check one target.  Reads the file only when there is something to
/// compare against; never writes.
pub fn verify(target: Target) -> Outcome {
    let settled = match &target.fault {
        Some(Fault::Unreadable(failure)) => Some((Verdict::Unreadable, Some(failure.clone()))),
        Some(Fault::Malformed(_))        => Some((Verdict::NoChecksumFound, None)),
        None                             => None,
    };
    if let Some((verdict, error)) = settled {
        return Outcome { target, actual: None, error, verdict };
    }

    if target.expected.is_none() {
        return Outcome { target, actual: None, error: None, verdict: Verdict::NoChecksumFound };
    }

    let (actual, error) = match checksum::compute_file(&target.path) {
        Ok(sum) => (Some(sum), None),
        Err(e)  => (None, Some(IoFailure::from(&e))),
    };
    let verdict = classify(target.expected, actual, error.is_none());
    debug!(path = %target.path.display(), ?verdict, "verified");
    Outcome { target, actual, error, verdict }
}

// ── Run ──────────────────────────────────────────────────────────────────────

/// Knobs for [`run`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Worker threads; `0` lets Rayon decide, `1` forces sequential checking.
    /// Ignored without the `parallel` feature.
    pub jobs:   usize,
    /// When raised, no further targets are pulled; work in flight finishes
    /// and the partial summary is returned.
    pub cancel: Arc<AtomicBool>,
}

impl RunOptions {
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Verify every target, handing each outcome to `sink` in target order.
pub fn run<I, F>(targets: I, options: &RunOptions, mut sink: F) -> Summary
where
    I: IntoIterator<Item = Target>,
    F: FnMut(&Outcome),
{
    let mut targets = targets.into_iter();
    let mut tally = Tally::default();
    info!(jobs = options.jobs, "verification started");

    #[cfg(feature = "parallel")]
    {
        if options.jobs != 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(options.jobs).build() {
                Ok(pool) => {
                    run_parallel(&pool, &mut targets, options, &mut tally, &mut sink);
                    return finish(tally);
                }
                Err(e) => tracing::warn!(error = %e, "thread pool unavailable, checking sequentially"),
            }
        }
    }

    while !options.cancelled() {
        let Some(target) = targets.next() else { break };
        let outcome = verify(target);
        tally.fold(&outcome);
        sink(&outcome);
    }
    finish(tally)
}

#[cfg(feature = "parallel")]
fn run_parallel<I, F>(
    pool:    &rayon::ThreadPool,
    targets: &mut I,
    options: &RunOptions,
    tally:   &mut Tally,
    sink:    &mut F,
) where
    I: Iterator<Item = Target>,
    F: FnMut(&Outcome),
{
    use rayon::prelude::*;

    while !options.cancelled() {
        let batch: Vec<Target> = targets.by_ref().take(PARALLEL_BATCH).collect();
        if batch.is_empty() {
            break;
        }
        let outcomes: Vec<Outcome> = pool.install(|| batch.into_par_iter().map(verify).collect());
        for outcome in &outcomes {
            tally.fold(outcome);
            sink(outcome);
        }
    }
}

fn finish(tally: Tally) -> Summary {
    let summary = tally.summarize();
    info!(
        total      = summary.total,
        matched    = summary.matched,
        mismatched = summary.mismatched,
        unreadable = summary.unreadable,
        "verification finished"
    );
    summary
}
