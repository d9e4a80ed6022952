//! PubGrub-based dependency resolution for Gust.

mod conflict;
mod error;
mod hints;
mod package;
mod provider;

pub use conflict::{ConflictFormatter, ErrorMessageBuilder};
pub use error::{ConflictDerivation, ConflictingRequirement, DerivationStep, ResolutionSuggestion, ResolveError};
pub use hints::{ChoiceReason, LockfileHints, ResolutionTrace};
pub use package::GustPackage;
pub use provider::{
    GustDependencyProvider, GustVersion, GustVersionSet, MemoryProvider, PackageProvider,
};

use gust_types::{Dependency, DependencySource, Manifest, ResolutionStrategy, Version};
use pubgrub::{DefaultStringReporter, DerivationTree, External, PubGrubError, Reporter};
use std::collections::HashMap;
use std::sync::Arc;

/// A resolved dependency graph.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Map of package name to resolved version
    pub packages: HashMap<String, ResolvedDep>,
}

/// A single resolved dependency.
#[derive(Debug, Clone)]
pub struct ResolvedDep {
    pub name: String,
    pub version: Version,
    pub source: ResolvedSource,
    pub dependencies: Vec<String>,
}

/// The resolved source of a package.
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    Registry,
    Git {
        url: String,
        revision: String,
        tag: Option<String>,
    },
    Path {
        path: std::path::PathBuf,
    },
}

impl ResolvedSource {
    /// Build a resolved source from a manifest dependency declaration.
    ///
    /// The actual git revision isn't known until the package is fetched, so
    /// this is only an identity-level placeholder until the checkout cache
    /// fills in the real commit.
    fn from_dependency(dep: &Dependency) -> Self {
        match dep.source_kind() {
            DependencySource::Git => Self::Git {
                url: dep.git.clone().unwrap_or_default(),
                revision: String::new(),
                tag: dep.tag.clone(),
            },
            DependencySource::Path => Self::Path {
                path: dep.path.clone().map(std::path::PathBuf::from).unwrap_or_default(),
            },
            DependencySource::Registry => Self::Registry,
        }
    }
}

/// The dependency resolver, backed by PubGrub's CDCL solver.
pub struct Resolver<'a, P: PackageProvider> {
    provider: &'a P,
    hints: LockfileHints,
    strategy: ResolutionStrategy,
}

impl<'a, P: PackageProvider> Resolver<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            hints: LockfileHints::new(),
            strategy: ResolutionStrategy::Highest,
        }
    }

    /// Prefer versions already present in an existing lockfile.
    pub fn with_hints(mut self, hints: LockfileHints) -> Self {
        self.hints = hints;
        self
    }

    /// Set the resolution strategy (highest/lowest/locked).
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Resolve dependencies for a manifest using PubGrub.
    pub fn resolve(&self, manifest: &Manifest) -> Result<Resolution, ResolveError> {
        let manifest = Arc::new(manifest.clone());
        let dep_provider = GustDependencyProvider::new(self.provider, Arc::clone(&manifest))
            .with_hints(self.hints.clone())
            .with_strategy(self.strategy.clone());

        let solution = match pubgrub::resolve(
            &dep_provider,
            GustPackage::Root,
            GustVersion(Version::new(0, 0, 0)),
        ) {
            Ok(solution) => solution,
            Err(PubGrubError::NoSolution(mut derivation_tree)) => {
                derivation_tree.collapse_no_versions();
                return Err(no_solution_to_version_conflict(&derivation_tree));
            }
            Err(e) => return Err(ResolveError::ProviderError(e.to_string())),
        };

        let mut resolution = Resolution::default();

        for (package, version) in solution {
            let name = match package.name() {
                Some(name) => name.to_string(),
                None => continue, // skip the synthetic root
            };

            let deps = self.provider.dependencies(&name, &version.0)?;
            let dep_names: Vec<String> = deps.iter().map(|d| d.name.clone()).collect();

            let source = manifest
                .dependencies
                .get(&name)
                .map(ResolvedSource::from_dependency)
                .unwrap_or(ResolvedSource::Registry);

            resolution.packages.insert(
                name.clone(),
                ResolvedDep {
                    name,
                    version: version.0,
                    source,
                    dependencies: dep_names,
                },
            );
        }

        Ok(resolution)
    }
}

/// Best-effort package name implicated by a PubGrub derivation tree, walking
/// down into whichever branch actually names a package.
fn root_package_name(tree: &DerivationTree<GustPackage, GustVersionSet, String>) -> Option<String> {
    match tree {
        DerivationTree::External(external) => match external {
            External::NoVersions(p, _) => Some(p.to_string()),
            External::Unavailable(p, _) => Some(p.to_string()),
            External::FromDependencyOf(_, _, dependency, _) => Some(dependency.to_string()),
            _ => None,
        },
        DerivationTree::Derived(derived) => root_package_name(&derived.cause1)
            .or_else(|| root_package_name(&derived.cause2)),
    }
}

/// Turn a failed resolution's derivation tree into [`ResolveError::VersionConflict`],
/// via [`ConflictFormatter`] rather than discarding the tree into an opaque string.
fn no_solution_to_version_conflict(
    tree: &DerivationTree<GustPackage, GustVersionSet, String>,
) -> ResolveError {
    let report = DefaultStringReporter::report(tree);
    let package = root_package_name(tree).unwrap_or_else(|| "<unknown>".to_string());

    let requirements = vec![("pubgrub".to_string(), report.clone())];
    let mut derivation = ConflictFormatter::format_incompatibility(&package, &requirements, "<root>");
    derivation.root_cause = report.clone();
    derivation.format();

    ResolveError::VersionConflict {
        package,
        conflicts: vec![ConflictingRequirement {
            from: "pubgrub".to_string(),
            requirement: report,
            dependency_chain: Vec::new(),
        }],
        derivation: Some(derivation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gust_types::{Dependency, VersionReq};

    #[test]
    fn test_simple_resolution() {
        let mut provider = MemoryProvider::new();
        provider.add_package("swift-log", Version::new(1, 5, 4), vec![]);
        provider.add_package("swift-log", Version::new(1, 4, 0), vec![]);

        let mut manifest = Manifest::default();
        manifest.dependencies.insert(
            "swift-log".to_string(),
            Dependency::registry("swift-log", VersionReq::parse("^1.4").unwrap()),
        );

        let resolver = Resolver::new(&provider);
        let resolution = resolver.resolve(&manifest).unwrap();
        let resolved = resolution.packages.get("swift-log").unwrap();
        assert_eq!(resolved.version, Version::new(1, 5, 4));
    }

    #[test]
    fn test_resolution_honors_lockfile_hints() {
        let mut provider = MemoryProvider::new();
        provider.add_package("swift-log", Version::new(1, 5, 4), vec![]);
        provider.add_package("swift-log", Version::new(1, 4, 0), vec![]);

        let mut manifest = Manifest::default();
        manifest.dependencies.insert(
            "swift-log".to_string(),
            Dependency::registry("swift-log", VersionReq::parse("^1.4").unwrap()),
        );

        let mut hints = LockfileHints::new();
        hints.add_preferred_version("swift-log", Version::new(1, 4, 0));

        let resolver = Resolver::new(&provider).with_hints(hints);
        let resolution = resolver.resolve(&manifest).unwrap();
        let resolved = resolution.packages.get("swift-log").unwrap();
        assert_eq!(resolved.version, Version::new(1, 4, 0));
    }
}
