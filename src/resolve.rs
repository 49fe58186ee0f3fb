//! Target discovery: turns a [`Config`] into a lazy stream of [`Target`]s.
//!
//! # Traversal
//! Top-level paths are handled in the order given.  A directory is listed,
//! its entries sorted by name, and its files turned into targets before any
//! subdirectory is entered.  With `recursive` set, subdirectories are walked
//! depth-first in name order; otherwise they are ignored.
//!
//! Directories are scanned one at a time, so memory is bounded by the
//! largest single directory (plus the manifest paths the walk has not
//! reached yet), not by the size of the tree.
//!
//! # Per-file rule
//! - `*.sfv` → one target per manifest line, resolved against the manifest's
//!   own directory.
//! - anything else → one target whose expected checksum comes from the
//!   filename tag (see [`crate::filename`]).
//!
//! A file listed by a manifest met earlier in the walk (in the same
//! directory or an ancestor) is checked through the manifest only, so each
//! file gets one verdict.  With `sfv` off, manifests are skipped entirely;
//! with `filename_tags` off, so is every other file.
//!
//! # Faults
//! Nothing found during traversal aborts it.  Symlinks, unreadable
//! directories and unreadable manifests become targets carrying
//! [`Fault::Unreadable`]; malformed manifest lines carry [`Fault::Malformed`].
//! The only fatal error is a top-level path that does not exist, reported by
//! [`TargetResolver::new`] before any target is produced.

use std::collections::{HashSet, VecDeque};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::checksum::Checksum;
use crate::config::Config;
use crate::filename;
use crate::sfv::{self, ManifestEntry, SfvError};

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{}: No such file or directory", .0.display())]
    NotFound(PathBuf),
}

// ── Target ───────────────────────────────────────────────────────────────────

/// Where a target's expected checksum came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Filename,
    Manifest { manifest: PathBuf, line: usize },
}

/// An I/O error reduced to something cheap to clone and compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoFailure {
    pub kind:    io::ErrorKind,
    pub message: String,
}

impl IoFailure {
    pub fn is_not_found(&self) -> bool {
        self.kind == io::ErrorKind::NotFound
    }
}

impl From<&io::Error> for IoFailure {
    fn from(err: &io::Error) -> Self {
        Self { kind: err.kind(), message: err.to_string() }
    }
}

/// A problem found while resolving a target that fixes its verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The manifest line could not be parsed.
    Malformed(String),
    /// The path could not be read or was deliberately not followed.
    Unreadable(IoFailure),
}

/// One file to verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub path:     PathBuf,
    pub expected: Option<Checksum>,
    pub source:   Source,
    pub fault:    Option<Fault>,
}

impl Target {
    pub fn from_filename(path: PathBuf, expected: Option<Checksum>) -> Self {
        Self { path, expected, source: Source::Filename, fault: None }
    }

    pub fn from_manifest(path: PathBuf, manifest: &Path, entry: &ManifestEntry) -> Self {
        Self {
            path,
            expected: Some(entry.checksum),
            source:   Source::Manifest { manifest: manifest.to_path_buf(), line: entry.line },
            fault:    None,
        }
    }

    pub fn malformed(manifest: &Path, line: usize, reason: String) -> Self {
        Self {
            path:     manifest.to_path_buf(),
            expected: None,
            source:   Source::Manifest { manifest: manifest.to_path_buf(), line },
            fault:    Some(Fault::Malformed(reason)),
        }
    }

    pub fn unreadable(path: PathBuf, source: Source, err: &io::Error) -> Self {
        Self { path, expected: None, source, fault: Some(Fault::Unreadable(err.into())) }
    }
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Lazy iterator over the targets described by a [`Config`].
pub struct TargetResolver {
    config:  Config,
    roots:   VecDeque<PathBuf>,
    /// Directories waiting to be scanned; the top is scanned next.
    dirs:    Vec<PathBuf>,
    ready:   VecDeque<Target>,
    /// Paths named by manifests and not yet met by the walk.
    covered: HashSet<PathBuf>,
}

impl TargetResolver {
    /// Validate the top-level paths and prepare the traversal.
    pub fn new(config: Config) -> Result<Self, ResolveError> {
        let roots = config.effective_paths();
        for root in &roots {
            if let Err(e) = fs::symlink_metadata(root) {
                if e.kind() == io::ErrorKind::NotFound {
                    return Err(ResolveError::NotFound(root.clone()));
                }
            }
        }
        Ok(Self {
            config,
            roots:   roots.into(),
            dirs:    Vec::new(),
            ready:   VecDeque::new(),
            covered: HashSet::new(),
        })
    }

    fn scan_root(&mut self, root: PathBuf) {
        let meta = match fs::metadata(&root) {
            Ok(m)  => m,
            Err(e) => {
                warn!(path = %root.display(), error = %e, "cannot stat path");
                self.ready.push_back(Target::unreadable(root, Source::Filename, &e));
                return;
            }
        };
        if meta.is_dir() {
            self.dirs.push(root);
        } else if self.config.is_manifest(&root) {
            if self.config.sfv {
                let targets = self.expand_manifest(&root);
                self.ready.extend(targets);
            } else {
                debug!(path = %root.display(), "sfv handling off, skipping manifest");
            }
        } else if self.config.filename_tags && !self.covered.remove(&root) {
            let expected = filename::extract(&root);
            self.ready.push_back(Target::from_filename(root, expected));
        }
    }

    fn scan_dir(&mut self, dir: PathBuf) {
        debug!(dir = %dir.display(), "scanning directory");
        let listing = match read_sorted(&dir) {
            Ok(l)  => l,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read directory");
                self.ready.push_back(Target::unreadable(dir, Source::Filename, &e));
                return;
            }
        };

        let mut files   = Vec::new();
        let mut subdirs = Vec::new();
        for (path, file_type) in listing {
            if file_type.is_symlink() {
                let err = io::Error::new(io::ErrorKind::Unsupported, "symbolic link not followed");
                warn!(path = %path.display(), "skipping symbolic link");
                files.push(Entry::Faulty(Target::unreadable(path, Source::Filename, &err)));
            } else if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                files.push(Entry::File(path));
            }
        }

        // Manifests first, so files they cover are not reported twice.
        let mut expanded = VecDeque::new();
        if self.config.sfv {
            for entry in &files {
                if let Entry::File(path) = entry {
                    if self.config.is_manifest(path) {
                        expanded.push_back(self.expand_manifest(path));
                    }
                }
            }
        }

        for entry in files {
            match entry {
                Entry::Faulty(target) => self.ready.push_back(target),
                Entry::File(path) if self.config.is_manifest(&path) => {
                    if self.config.sfv {
                        self.ready.extend(expanded.pop_front().unwrap_or_default());
                    }
                }
                Entry::File(path) => {
                    if self.covered.remove(&path) || !self.config.filename_tags {
                        continue;
                    }
                    let expected = filename::extract(&path);
                    self.ready.push_back(Target::from_filename(path, expected));
                }
            }
        }

        if self.config.recursive {
            self.dirs.extend(subdirs.into_iter().rev());
        }
    }

    /// Targets for every line of `manifest`.  The paths they name are
    /// remembered so the walk does not report them again.
    fn expand_manifest(&mut self, manifest: &Path) -> Vec<Target> {
        let manifest_source = || Source::Manifest { manifest: manifest.to_path_buf(), line: 0 };
        let parser = match sfv::parse_file(manifest) {
            Ok(p)  => p,
            Err(e) => {
                warn!(manifest = %manifest.display(), error = %e, "cannot open manifest");
                return vec![Target::unreadable(manifest.to_path_buf(), manifest_source(), &e)];
            }
        };

        let base = manifest.parent().unwrap_or(Path::new(""));
        let mut targets = Vec::new();
        for item in parser {
            match item {
                Ok(entry) => {
                    let path = resolve_entry(base, &entry, self.config.ignore_case);
                    debug!(path = %path.display(), checksum = %entry.checksum, "manifest entry");
                    self.covered.insert(path.clone());
                    targets.push(Target::from_manifest(path, manifest, &entry));
                }
                Err(SfvError::MalformedLine { line, reason }) => {
                    warn!(manifest = %manifest.display(), line, %reason, "malformed manifest line");
                    targets.push(Target::malformed(manifest, line, reason));
                }
                Err(SfvError::Io(e)) => {
                    warn!(manifest = %manifest.display(), error = %e, "manifest read failed");
                    targets.push(Target::unreadable(manifest.to_path_buf(), manifest_source(), &e));
                }
            }
        }
        targets
    }
}

impl Iterator for TargetResolver {
    type Item = Target;

    fn next(&mut self) -> Option<Target> {
        loop {
            if let Some(target) = self.ready.pop_front() {
                return Some(target);
            }
            if let Some(dir) = self.dirs.pop() {
                self.scan_dir(dir);
                continue;
            }
            let root = self.roots.pop_front()?;
            self.scan_root(root);
        }
    }
}

enum Entry {
    File(PathBuf),
    Faulty(Target),
}

fn read_sorted(dir: &Path) -> io::Result<Vec<(PathBuf, fs::FileType)>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        out.push((entry.path(), entry.file_type()?));
    }
    out.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(out)
}

/// Join a manifest entry onto the manifest's directory.
///
/// With `ignore_case`, a component that does not exist verbatim is replaced
/// by the first directory entry whose name matches it case-insensitively.
pub fn resolve_entry(base: &Path, entry: &ManifestEntry, ignore_case: bool) -> PathBuf {
    let mut path = base.to_path_buf();
    for comp in sfv::split_components(&entry.path) {
        let exact = path.join(comp);
        if !ignore_case || comp == ".." || fs::symlink_metadata(&exact).is_ok() {
            path = exact;
            continue;
        }
        path = match find_ignoring_case(&path, comp) {
            Some(name) => path.join(name),
            None       => exact,
        };
    }
    path
}

fn find_ignoring_case(dir: &Path, name: &str) -> Option<OsString> {
    let wanted = name.to_lowercase();
    let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
    let mut names: Vec<OsString> = fs::read_dir(dir).ok()?.flatten().map(|e| e.file_name()).collect();
    names.sort();
    names
        .into_iter()
        .find(|n| n.to_str().is_some_and(|s| s.to_lowercase() == wanted))
}
