//! CRC-32 file verification from filename tags and SFV manifests.
//!
//! ```no_run
//! use autocrc::{Config, RunOptions, TargetResolver};
//!
//! let config = Config { recursive: true, ..Config::with_paths(["downloads"]) };
//! let targets = TargetResolver::new(config)?;
//! let summary = autocrc::run(targets, &RunOptions::default(), |outcome| {
//!     println!("{:?} {}", outcome.verdict, outcome.target.path.display());
//! });
//! assert!(summary.is_ok());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod checksum;
pub mod config;
pub mod filename;
pub mod resolve;
pub mod sfv;
pub mod summary;
pub mod verify;

pub use checksum::Checksum;
pub use config::Config;
pub use resolve::{ResolveError, Source, Target, TargetResolver};
pub use sfv::ManifestEntry;
pub use summary::{Summary, Tally};
pub use verify::{run, verify, Outcome, RunOptions, Verdict};
