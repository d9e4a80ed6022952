//! Workspace Controller: orchestrates a full refresh -> resolve -> graph ->
//! plan -> emit pass and its cancellation/locking semantics.
//!
//! This is distinct from [`crate::WorkspaceLoader`]/[`crate::discovery`], which
//! only answer "which package manifests exist under this root". The
//! controller drives a single state machine through those discovery results.

use crate::{Workspace, WorkspaceError, WorkspaceLoader, WorkspaceResolution, WorkspaceResolver};
use gust_graph::{build_graph, GraphError, PackageGraph, PackageNode};
use gust_lockfile::{Lockfile, LockedPackage, LockfileDiff};
use gust_resolver::{PackageProvider, ResolvedSource};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// States the controller moves through for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceState {
    Idle,
    Refreshing,
    Resolving,
    Pinning,
    Graphing,
    Planning,
    Emitting,
    Failed(String),
}

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("operation cancelled during {0:?}")]
    Cancelled(WorkspaceState),
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Identity(#[from] gust_types::IdentityError),
    #[error(transparent)]
    Lockfile(#[from] gust_lockfile::LockfileError),
}

/// Output of a full controller pass, up to and including graph construction.
/// Build-plan/emit are driven by `gust-build` from this result.
pub struct ControllerOutcome {
    pub workspace: Workspace,
    pub resolution: WorkspaceResolution,
    pub graph: PackageGraph,
    /// What changed in the pin store as part of this run, if anything did.
    pub lockfile_diff: LockfileDiff,
}

/// Drives the `Idle -> Refreshing -> Resolving -> Graphing -> (Planning -> Emitting)`
/// pipeline, acquiring a workspace-scoped advisory lock and honoring a
/// [`CancellationToken`] at each transition boundary.
pub struct WorkspaceController {
    root: PathBuf,
    state: WorkspaceState,
    cancellation: CancellationToken,
}

impl WorkspaceController {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: WorkspaceState::Idle,
            cancellation: CancellationToken::new(),
        }
    }

    /// A child token callers can hold to cancel an in-flight `run`.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    fn check_cancelled(&mut self) -> Result<(), ControllerError> {
        if self.cancellation.is_cancelled() {
            let failed_during = self.state.clone();
            self.state = WorkspaceState::Failed("cancelled".to_string());
            return Err(ControllerError::Cancelled(failed_during));
        }
        Ok(())
    }

    /// Run refresh -> resolve -> graph. Returns to `Idle` on success and
    /// leaves the controller in `Failed(reason)` on any error, mirroring the
    /// "Failed reached from any state" transition rule.
    pub async fn run<P: PackageProvider>(
        &mut self,
        resolver: WorkspaceResolver<P>,
    ) -> Result<ControllerOutcome, ControllerError> {
        let _lock = crate::lock::WorkspaceLock::acquire(&self.root)?;

        self.state = WorkspaceState::Refreshing;
        self.check_cancelled()?;
        let workspace = match WorkspaceLoader::new().load(&self.root) {
            Ok(workspace) => workspace,
            Err(e) => return self.fail(e.into()),
        };

        self.state = WorkspaceState::Resolving;
        self.check_cancelled()?;
        let resolution = match resolver.resolve(&workspace) {
            Ok(r) => r,
            Err(e) => return self.fail(e.into()),
        };

        self.state = WorkspaceState::Pinning;
        self.check_cancelled()?;
        let lockfile_path = self.root.join("Gust.lock");
        let existing_lockfile = match Lockfile::load(&lockfile_path) {
            Ok(lf) => lf,
            Err(e) => return self.fail(e.into()),
        };
        let new_packages = locked_packages(&resolution);
        let (lockfile_diff, merged_lockfile) = existing_lockfile.merge(new_packages);
        if lockfile_diff.has_changes() {
            if let Err(e) = merged_lockfile.save_async(lockfile_path).await {
                return self.fail(e.into());
            }
        }

        self.state = WorkspaceState::Graphing;
        self.check_cancelled()?;
        let nodes = match package_nodes(&workspace, &resolution) {
            Ok(n) => n,
            Err(e) => return self.fail(e),
        };
        let graph = match build_graph(&nodes) {
            Ok(g) => g,
            Err(e) => return self.fail(e.into()),
        };

        self.state = WorkspaceState::Idle;
        Ok(ControllerOutcome {
            workspace,
            resolution,
            graph,
            lockfile_diff,
        })
    }

    fn fail(&mut self, err: ControllerError) -> Result<ControllerOutcome, ControllerError> {
        self.state = WorkspaceState::Failed(err.to_string());
        Err(err)
    }
}

/// Builds the graph-builder's input nodes, and — via an [`gust_types::IdentityRegistry`]
/// — catches the two ambiguity conditions spec component A names: two root
/// packages canonicalizing to the same identity, and the same identity
/// reached through two locations whose checksums disagree. The identity
/// strings `gust-graph` actually keys nodes by are left unchanged (declared
/// package/dependency names), so this only adds detection, not a behavior
/// change to dependency-name resolution.
fn package_nodes(
    workspace: &Workspace,
    resolution: &WorkspaceResolution,
) -> Result<Vec<PackageNode>, ControllerError> {
    let mut nodes = Vec::new();
    let mut identities = gust_types::IdentityRegistry::new();

    let root_location = workspace.root.display().to_string();
    let root_identity = gust_types::canonicalize(&root_location);
    identities.observe_root(&root_identity, &root_location)?;
    nodes.push(PackageNode {
        identity: workspace.root_manifest.package.name.clone(),
        manifest: workspace.root_manifest.clone(),
        root_path: workspace.root.clone(),
        is_root: true,
    });

    for member in &workspace.members {
        let location = member.path.display().to_string();
        let identity = gust_types::canonicalize(&location);
        identities.observe_root(&identity, &location)?;
        nodes.push(PackageNode {
            identity: member.name.clone(),
            manifest: member.manifest.clone(),
            root_path: member.path.clone(),
            is_root: true,
        });
    }

    for dep in resolution.all_packages() {
        let location = match &dep.source {
            ResolvedSource::Git { url, .. } => url.clone(),
            ResolvedSource::Path { path } => path.display().to_string(),
            ResolvedSource::Registry => dep.name.clone(),
        };
        let identity = gust_types::canonicalize(&location);
        identities.observe_dependency(&identity, &location, None)?;
        nodes.push(PackageNode {
            identity: dep.name.clone(),
            manifest: gust_types::Manifest::default(),
            root_path: PathBuf::new(),
            is_root: false,
        });
    }

    Ok(nodes)
}

/// Translate a resolution into pin-store entries. Path dependencies are
/// never locked (no version state worth persisting); revisions/checksums
/// here are the identity-level placeholders `gust-resolver` already produces
/// until the checkout cache fills in the real fetched state.
fn locked_packages(resolution: &WorkspaceResolution) -> Vec<LockedPackage> {
    resolution
        .all_packages()
        .filter_map(|dep| {
            let mut pkg = match &dep.source {
                ResolvedSource::Git { url, revision, .. } => {
                    LockedPackage::git(&dep.name, dep.version.clone(), url, revision)
                }
                ResolvedSource::Registry => {
                    LockedPackage::registry(&dep.name, dep.version.clone(), String::new())
                }
                ResolvedSource::Path { .. } => return None,
            };
            pkg.dependencies = dep.dependencies.clone();
            Some(pkg)
        })
        .collect()
}

pub(crate) fn workspace_path(root: &Path) -> PathBuf {
    root.join(".gust").join("workspace.lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_initial_state_is_idle() {
        let controller = WorkspaceController::new("/tmp/workspace");
        assert_eq!(*controller.state(), WorkspaceState::Idle);
    }

    #[test]
    fn test_cancellation_token_cancels_run() {
        let controller = WorkspaceController::new("/tmp/workspace");
        let token = controller.cancellation_token();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    fn make_resolution(packages: Vec<gust_resolver::ResolvedDep>) -> WorkspaceResolution {
        WorkspaceResolution {
            resolution: gust_resolver::Resolution {
                packages: packages.into_iter().map(|p| (p.name.clone(), p)).collect(),
            },
            member_deps: HashMap::new(),
            workspace_root: PathBuf::from("/workspace"),
        }
    }

    #[test]
    fn test_locked_packages_skips_path_deps_and_carries_dependencies() {
        use gust_resolver::ResolvedDep;
        use gust_types::Version;

        let resolution = make_resolution(vec![
            ResolvedDep {
                name: "swift-log".to_string(),
                version: Version::new(1, 5, 4),
                source: ResolvedSource::Git {
                    url: "https://github.com/apple/swift-log".to_string(),
                    revision: "abc123".to_string(),
                    tag: Some("1.5.4".to_string()),
                },
                dependencies: vec!["swift-log-core".to_string()],
            },
            ResolvedDep {
                name: "swift-numerics".to_string(),
                version: Version::new(1, 0, 0),
                source: ResolvedSource::Registry,
                dependencies: vec![],
            },
            ResolvedDep {
                name: "local-tool".to_string(),
                version: Version::new(0, 1, 0),
                source: ResolvedSource::Path {
                    path: PathBuf::from("/workspace/vendor/local-tool"),
                },
                dependencies: vec![],
            },
        ]);

        let locked = locked_packages(&resolution);
        assert_eq!(locked.len(), 2);
        assert!(!locked.iter().any(|p| p.name == "local-tool"));

        let log_pkg = locked.iter().find(|p| p.name == "swift-log").unwrap();
        assert_eq!(log_pkg.git.as_deref(), Some("https://github.com/apple/swift-log"));
        assert_eq!(log_pkg.revision.as_deref(), Some("abc123"));
        assert_eq!(log_pkg.dependencies, vec!["swift-log-core".to_string()]);

        let numerics_pkg = locked.iter().find(|p| p.name == "swift-numerics").unwrap();
        assert_eq!(numerics_pkg.source, gust_types::DependencySource::Registry);
    }

    #[test]
    fn test_package_nodes_flags_ambiguous_identity_across_workspace_members() {
        let mut workspace = Workspace {
            root: PathBuf::from("/workspace"),
            root_manifest: gust_types::Manifest::default(),
            config: gust_types::WorkspaceConfig::default(),
            members: vec![],
            shared_dependencies: HashMap::new(),
        };

        // Two members whose paths canonicalize to the same identity despite
        // differing as raw strings (trailing slash is stripped during
        // canonicalization but not before it's recorded as the observed
        // location).
        workspace.members.push(crate::WorkspaceMember {
            path: PathBuf::from("/workspace/packages/core"),
            name: "core".to_string(),
            manifest: gust_types::Manifest::default(),
            workspace_deps: vec![],
        });
        workspace.members.push(crate::WorkspaceMember {
            path: PathBuf::from("/workspace/packages/core/"),
            name: "core-dup".to_string(),
            manifest: gust_types::Manifest::default(),
            workspace_deps: vec![],
        });

        let resolution = make_resolution(vec![]);
        let result = package_nodes(&workspace, &resolution);
        assert!(matches!(result, Err(ControllerError::Identity(_))));
    }
}
