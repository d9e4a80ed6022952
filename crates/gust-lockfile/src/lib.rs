//! Pin store (lockfile) handling for Gust.
//!
//! Persists the exact resolved state of every package identity so that
//! repeated installs reproduce the same dependency graph. The on-disk
//! format mirrors SwiftPM's versioned `Package.resolved` pin schema so
//! that existing tooling can read it; the in-memory API is shaped around
//! how the installer actually wants to manipulate it (diff, merge,
//! incremental rewrite).

use fs4::FileExt;
use gust_types::{DependencySource, Version};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current pin-file format version. Older files are migrated in memory
/// on load and rewritten at this version on next save.
pub const LOCKFILE_VERSION: u32 = 3;

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("failed to read lockfile: {0}")]
    ReadError(#[source] io::Error),
    #[error("failed to write lockfile: {0}")]
    WriteError(#[source] io::Error),
    #[error("failed to lock lockfile: {0}")]
    LockError(#[source] io::Error),
    #[error("failed to parse lockfile: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A single package pinned to an exact resolved state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: String,
    pub version: Version,
    pub source: DependencySource,
    pub git: Option<String>,
    pub revision: Option<String>,
    pub branch: Option<String>,
    pub checksum: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl LockedPackage {
    /// Pin a git-sourced package to a specific revision.
    pub fn git(
        name: impl Into<String>,
        version: Version,
        url: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            source: DependencySource::Git,
            git: Some(url.into()),
            revision: Some(revision.into()),
            branch: None,
            checksum: None,
            dependencies: Vec::new(),
        }
    }

    /// Pin a registry-sourced package to a specific version and content checksum.
    pub fn registry(name: impl Into<String>, version: Version, checksum: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            source: DependencySource::Registry,
            git: None,
            revision: None,
            branch: None,
            checksum: Some(checksum.into()),
            dependencies: Vec::new(),
        }
    }

    /// Builder-style: attach a branch name (git packages tracking a branch
    /// rather than a tag).
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Local path dependencies are identity-pinned but carry no version
    /// state worth persisting across resolutions.
    pub fn path(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            source: DependencySource::Path,
            git: None,
            revision: None,
            branch: None,
            checksum: None,
            dependencies: Vec::new(),
        }
    }

    fn identity(&self) -> &str {
        &self.name
    }

    /// True if `other` represents the same package pinned to a different state.
    fn differs_from(&self, other: &LockedPackage) -> bool {
        self.version != other.version || self.revision != other.revision || self.checksum != other.checksum
    }
}

/// The pin store: every package name mapped to its locked state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    pub packages: Vec<LockedPackage>,
}

impl Lockfile {
    /// Load a lockfile from disk, or an empty one if it doesn't exist yet.
    pub fn load(path: &Path) -> Result<Self, LockfileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let file = File::open(path).map_err(LockfileError::ReadError)?;
        file.lock_shared().map_err(LockfileError::LockError)?;
        let content = fs::read_to_string(path).map_err(LockfileError::ReadError)?;
        let _ = file.unlock();

        let pin_file: PinFile = serde_json::from_str(&content)?;
        Ok(pin_file.into_lockfile())
    }

    /// Compute the diff between this (existing) lockfile and a freshly
    /// resolved package list, without writing anything.
    pub fn diff(&self, new_packages: &[LockedPackage]) -> LockfileDiff {
        let mut added = Vec::new();
        let mut updated = Vec::new();
        let mut unchanged = Vec::new();

        for new_pkg in new_packages {
            match self.packages.iter().find(|p| p.identity() == new_pkg.identity()) {
                None => added.push(new_pkg.clone()),
                Some(existing) if existing.differs_from(new_pkg) => updated.push(new_pkg.clone()),
                Some(_) => unchanged.push(new_pkg.clone()),
            }
        }

        let removed: Vec<LockedPackage> = self
            .packages
            .iter()
            .filter(|p| !new_packages.iter().any(|n| n.identity() == p.identity()))
            .cloned()
            .collect();

        LockfileDiff {
            added,
            removed,
            updated,
            unchanged,
        }
    }

    /// Whether resolving again would produce a different lockfile.
    pub fn needs_update(&self, new_packages: &[LockedPackage]) -> bool {
        self.diff(new_packages).has_changes()
    }

    /// Merge a freshly resolved package list into this lockfile, returning
    /// the diff that was applied and the merged lockfile. Entries not
    /// present in `new_packages` are dropped (they're no longer reachable).
    pub fn merge(&self, new_packages: Vec<LockedPackage>) -> (LockfileDiff, Lockfile) {
        let diff = self.diff(&new_packages);
        let merged = Lockfile {
            packages: new_packages,
        };
        (diff, merged)
    }

    /// Atomically write the lockfile to disk (temp file + rename), guarded
    /// by an exclusive lock so concurrent installs don't interleave writes.
    pub async fn save_async(self, path: PathBuf) -> Result<(), LockfileError> {
        tokio::task::spawn_blocking(move || self.save(&path))
            .await
            .map_err(|e| LockfileError::WriteError(io::Error::new(io::ErrorKind::Other, e)))?
    }

    fn save(&self, path: &Path) -> Result<(), LockfileError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(LockfileError::WriteError)?;
        }

        let pin_file = PinFile::from_lockfile(self);
        let content = serde_json::to_string_pretty(&pin_file)?;

        let tmp_path = path.with_extension("resolved.tmp");
        let tmp = File::create(&tmp_path).map_err(LockfileError::WriteError)?;
        tmp.lock_exclusive().map_err(LockfileError::LockError)?;
        fs::write(&tmp_path, content.as_bytes()).map_err(LockfileError::WriteError)?;
        let _ = tmp.unlock();

        fs::rename(&tmp_path, path).map_err(LockfileError::WriteError)?;
        Ok(())
    }
}

/// Result of reconciling an existing lockfile against a new resolution.
#[derive(Debug, Clone, Default)]
pub struct LockfileDiff {
    pub added: Vec<LockedPackage>,
    pub removed: Vec<LockedPackage>,
    pub updated: Vec<LockedPackage>,
    pub unchanged: Vec<LockedPackage>,
}

impl LockfileDiff {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.updated.is_empty()
    }

    /// One-line human summary, e.g. "+2 -1 ~3".
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.added.is_empty() {
            parts.push(format!("+{}", self.added.len()));
        }
        if !self.removed.is_empty() {
            parts.push(format!("-{}", self.removed.len()));
        }
        if !self.updated.is_empty() {
            parts.push(format!("~{}", self.updated.len()));
        }
        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// On-disk pin-file schema: `{"version":N,"pins":[{"identity","location","state"}...]}`.
/// Versions 1-2 keyed the location field as `repositoryURL`; all versions
/// are accepted on read, only the latest is ever written.
#[derive(Debug, Serialize, Deserialize)]
struct PinFile {
    version: u32,
    pins: Vec<PinEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PinEntry {
    identity: String,
    #[serde(alias = "repositoryURL")]
    location: String,
    state: PinState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PinState {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<String>,
    revision: String,
}

impl PinFile {
    fn from_lockfile(lockfile: &Lockfile) -> Self {
        let pins = lockfile
            .packages
            .iter()
            .map(|pkg| {
                let location = match pkg.source {
                    DependencySource::Git => pkg.git.clone().unwrap_or_default(),
                    DependencySource::Registry => pkg.name.clone(),
                    DependencySource::Path => pkg.name.clone(),
                };
                let revision = pkg
                    .revision
                    .clone()
                    .or_else(|| pkg.checksum.clone())
                    .unwrap_or_default();

                PinEntry {
                    identity: pkg.name.clone(),
                    location,
                    state: PinState {
                        version: Some(pkg.version.to_string()),
                        branch: pkg.branch.clone(),
                        revision,
                    },
                    dependencies: pkg.dependencies.clone(),
                }
            })
            .collect();

        Self {
            version: LOCKFILE_VERSION,
            pins,
        }
    }

    fn into_lockfile(self) -> Lockfile {
        let packages = self
            .pins
            .into_iter()
            .map(|pin| {
                let version = pin
                    .state
                    .version
                    .as_deref()
                    .and_then(|v| Version::parse(v).ok())
                    .unwrap_or_else(|| Version::new(0, 0, 0));

                let is_git = pin.location.contains("://") || pin.location.ends_with(".git");
                let state_value = (!pin.state.revision.is_empty()).then_some(pin.state.revision);

                // For git pins the pin-file `revision` field is a real commit
                // revision; for everything else (registry, path) `from_lockfile`
                // stuffed the content checksum in there instead, so it has to
                // come back out as `checksum`, not be reinterpreted as a `revision`.
                let (revision, checksum) = if is_git {
                    (state_value, None)
                } else {
                    (None, state_value)
                };

                LockedPackage {
                    name: pin.identity,
                    version,
                    source: if is_git {
                        DependencySource::Git
                    } else {
                        DependencySource::Registry
                    },
                    git: is_git.then_some(pin.location.clone()),
                    revision,
                    branch: pin.state.branch,
                    checksum,
                    dependencies: pin.dependencies,
                }
            })
            .collect();

        Lockfile { packages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_diff_detects_added_and_removed() {
        let existing = Lockfile {
            packages: vec![LockedPackage::registry("swift-log", Version::new(1, 4, 0), "abc")],
        };

        let new_packages = vec![LockedPackage::registry(
            "swift-nio",
            Version::new(2, 0, 0),
            "def",
        )];

        let diff = existing.diff(&new_packages);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.removed.len(), 1);
        assert!(diff.has_changes());
    }

    #[test]
    fn test_diff_detects_version_update() {
        let existing = Lockfile {
            packages: vec![LockedPackage::registry("swift-log", Version::new(1, 4, 0), "abc")],
        };

        let new_packages = vec![LockedPackage::registry(
            "swift-log",
            Version::new(1, 5, 0),
            "abc2",
        )];

        let diff = existing.diff(&new_packages);
        assert_eq!(diff.updated.len(), 1);
        assert!(diff.added.is_empty());
    }

    #[test]
    fn test_needs_update_false_when_identical() {
        let pkg = LockedPackage::registry("swift-log", Version::new(1, 4, 0), "abc");
        let existing = Lockfile {
            packages: vec![pkg.clone()],
        };
        assert!(!existing.needs_update(&[pkg]));
    }

    #[tokio::test]
    async fn test_roundtrip_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Package.resolved");

        let lockfile = Lockfile {
            packages: vec![LockedPackage::git(
                "swift-algorithms",
                Version::new(1, 2, 0),
                "https://github.com/apple/swift-algorithms.git",
                "abc123",
            )],
        };

        lockfile.clone().save_async(path.clone()).await.unwrap();
        let loaded = Lockfile::load(&path).unwrap();

        assert_eq!(loaded.packages.len(), 1);
        assert_eq!(loaded.packages[0].name, "swift-algorithms");
        assert_eq!(loaded.packages[0].revision.as_deref(), Some("abc123"));
    }

    #[tokio::test]
    async fn test_roundtrip_save_and_load_registry_checksum() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("Package.resolved");

        let lockfile = Lockfile {
            packages: vec![LockedPackage::registry(
                "swift-log",
                Version::new(1, 5, 4),
                "sha256:deadbeef",
            )],
        };

        lockfile.clone().save_async(path.clone()).await.unwrap();
        let loaded = Lockfile::load(&path).unwrap();

        assert_eq!(loaded.packages.len(), 1);
        assert_eq!(loaded.packages[0].checksum.as_deref(), Some("sha256:deadbeef"));
        assert_eq!(loaded.packages[0].revision, None);
        assert_eq!(loaded.packages[0], lockfile.packages[0]);
    }
}
