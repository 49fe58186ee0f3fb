//! Run configuration handed to [`TargetResolver`](crate::resolve::TargetResolver).

use std::path::{Path, PathBuf};

/// File extension that marks a path as an SFV manifest.
pub const SFV_EXTENSION: &str = "sfv";

/// What to verify and how to discover it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Files and directories to check, in order.  Empty means the base
    /// directory.
    pub paths:         Vec<PathBuf>,
    /// Descend into subdirectories.
    pub recursive:     bool,
    /// Match the `.sfv` extension and manifest entry paths without regard to
    /// case.  Checksum comparison is always case-insensitive.
    pub ignore_case:   bool,
    /// Read expected checksums from filename tags.
    pub filename_tags: bool,
    /// Read expected checksums from SFV manifests.
    pub sfv:           bool,
    /// Directory relative `paths` are resolved against.  `None` means the
    /// process working directory.
    pub base_dir:      Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths:         Vec::new(),
            recursive:     false,
            ignore_case:   false,
            filename_tags: true,
            sfv:           true,
            base_dir:      None,
        }
    }
}

impl Config {
    pub fn with_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Top-level paths after applying `base_dir` and the empty-list default.
    pub fn effective_paths(&self) -> Vec<PathBuf> {
        let base = self.base_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        if self.paths.is_empty() {
            return vec![base];
        }
        match &self.base_dir {
            Some(dir) => self.paths.iter().map(|p| dir.join(p)).collect(),
            None      => self.paths.clone(),
        }
    }

    /// Whether `path` names a manifest under this configuration.
    pub fn is_manifest(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if self.ignore_case {
            ext.eq_ignore_ascii_case(SFV_EXTENSION)
        } else {
            ext == SFV_EXTENSION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_paths_default_to_base() {
        assert_eq!(Config::default().effective_paths(), vec![PathBuf::from(".")]);
        let cfg = Config { base_dir: Some("/data".into()), ..Config::default() };
        assert_eq!(cfg.effective_paths(), vec![PathBuf::from("/data")]);
    }

    #[test]
    fn relative_paths_join_base() {
        let cfg = Config { base_dir: Some("/data".into()), ..Config::with_paths(["a", "/abs"]) };
        assert_eq!(cfg.effective_paths(), vec![PathBuf::from("/data/a"), PathBuf::from("/abs")]);
    }

    #[test]
    fn manifest_extension_respects_ignore_case() {
        let strict = Config::default();
        assert!(strict.is_manifest(Path::new("x/check.sfv")));
        assert!(!strict.is_manifest(Path::new("CHECK.SFV")));
        assert!(!strict.is_manifest(Path::new("sfv")));

        let loose = Config { ignore_case: true, ..Config::default() };
        assert!(loose.is_manifest(Path::new("CHECK.SFV")));
        assert!(!loose.is_manifest(Path::new("check.sfvx")));
    }
}
