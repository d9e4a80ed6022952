//! PubGrub DependencyProvider implementation for Gust.

use crate::error::ResolveError;
use crate::hints::{ChoiceReason, LockfileHints, ResolutionTrace};
use crate::package::GustPackage;
use gust_types::{Dependency, Manifest, ResolutionStrategy, Version, VersionReq};
use pubgrub::{Dependencies, DependencyProvider, Map, PackageResolutionStatistics, VersionSet};
use semver::{Comparator, Op};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::ops::Bound;
use std::sync::Arc;

/// A provider that supplies package information to PubGrub.
///
/// This trait is implemented by different backends (registry, git, memory)
/// to provide version and dependency information.
pub trait PackageProvider: Send + Sync {
    /// Get all available versions for a package.
    fn available_versions(&self, package: &str) -> Result<Vec<Version>, ResolveError>;

    /// Get the dependencies of a specific package version.
    fn dependencies(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Dependency>, ResolveError>;
}

/// Wrapper around semver::Version that implements pubgrub traits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GustVersion(pub Version);

impl From<Version> for GustVersion {
    fn from(v: Version) -> Self {
        Self(v)
    }
}

impl Display for GustVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single closed/open/unbounded range of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lower: Bound<Version>,
    upper: Bound<Version>,
}

impl Interval {
    fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, _) | (_, Bound::Unbounded) => false,
            (Bound::Included(a), Bound::Included(b)) => a > b,
            (Bound::Included(a), Bound::Excluded(b))
            | (Bound::Excluded(a), Bound::Included(b))
            | (Bound::Excluded(a), Bound::Excluded(b)) => a >= b,
        }
    }

    fn contains(&self, v: &Version) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(l) => v >= l,
            Bound::Excluded(l) => v > l,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(u) => v <= u,
            Bound::Excluded(u) => v < u,
        };
        above_lower && below_upper
    }

    fn intersect(&self, other: &Self) -> Self {
        let lower = if cmp_lower(&self.lower, &other.lower) == Ordering::Greater {
            self.lower.clone()
        } else {
            other.lower.clone()
        };
        let upper = if cmp_upper(&self.upper, &other.upper) == Ordering::Less {
            self.upper.clone()
        } else {
            other.upper.clone()
        };
        Self { lower, upper }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.lower, &self.upper) {
            (Bound::Unbounded, Bound::Unbounded) => write!(f, "*"),
            (Bound::Included(a), Bound::Included(b)) if a == b => write!(f, "={a}"),
            (lower, upper) => {
                let mut parts = Vec::new();
                match lower {
                    Bound::Included(v) => parts.push(format!(">={v}")),
                    Bound::Excluded(v) => parts.push(format!(">{v}")),
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(v) => parts.push(format!("<={v}")),
                    Bound::Excluded(v) => parts.push(format!("<{v}")),
                    Bound::Unbounded => {}
                }
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// Order two lower bounds by how restrictive a starting point they are:
/// `Unbounded` is the least restrictive, and at equal version `Excluded` is
/// more restrictive than `Included` (it starts just after that version).
fn cmp_lower(a: &Bound<Version>, b: &Bound<Version>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Less,
        (_, Bound::Unbounded) => Ordering::Greater,
        (Bound::Included(x), Bound::Included(y)) => x.cmp(y),
        (Bound::Excluded(x), Bound::Excluded(y)) => x.cmp(y),
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Less),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Greater),
    }
}

/// Order two upper bounds by how restrictive an ending point they are:
/// `Unbounded` is the least restrictive, and at equal version `Excluded` is
/// more restrictive than `Included` (it ends just before that version).
fn cmp_upper(a: &Bound<Version>, b: &Bound<Version>) -> Ordering {
    match (a, b) {
        (Bound::Unbounded, Bound::Unbounded) => Ordering::Equal,
        (Bound::Unbounded, _) => Ordering::Greater,
        (_, Bound::Unbounded) => Ordering::Less,
        (Bound::Included(x), Bound::Included(y)) => x.cmp(y),
        (Bound::Excluded(x), Bound::Excluded(y)) => x.cmp(y),
        (Bound::Included(x), Bound::Excluded(y)) => x.cmp(y).then(Ordering::Greater),
        (Bound::Excluded(x), Bound::Included(y)) => x.cmp(y).then(Ordering::Less),
    }
}

/// Whether the gap between `upper` (end of one interval) and `lower` (start
/// of the next, sorted after it) is zero-width, i.e. the two intervals can
/// be merged into one without changing which versions are covered.
fn touches(upper: &Bound<Version>, lower: &Bound<Version>) -> bool {
    match (upper, lower) {
        (Bound::Unbounded, _) | (_, Bound::Unbounded) => true,
        (Bound::Excluded(u), Bound::Excluded(l)) => u > l,
        (Bound::Included(u), Bound::Included(l))
        | (Bound::Included(u), Bound::Excluded(l))
        | (Bound::Excluded(u), Bound::Included(l)) => u >= l,
    }
}

/// Sort and merge overlapping/adjacent intervals into a minimal, normalized
/// set of disjoint intervals. Every `GustVersionSet` is expected to carry
/// its intervals in this form, so equality and `subset_of` can compare them
/// directly.
fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|i| !i.is_empty());
    intervals.sort_by(|a, b| cmp_lower(&a.lower, &b.lower));

    let mut merged: Vec<Interval> = Vec::new();
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if touches(&last.upper, &interval.lower) {
                if cmp_upper(&interval.upper, &last.upper) == Ordering::Greater {
                    last.upper = interval.upper;
                }
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Flip an `Included`/`Excluded` boundary in place (used to derive the
/// complementary bound on the other side of a cut point). `Unbounded` has no
/// complementary cut and is returned unchanged.
fn flip_bound(b: &Bound<Version>) -> Bound<Version> {
    match b {
        Bound::Included(v) => Bound::Excluded(v.clone()),
        Bound::Excluded(v) => Bound::Included(v.clone()),
        Bound::Unbounded => Bound::Unbounded,
    }
}

/// The base version a comparator pins, treating any omitted minor/patch
/// component as `0` (e.g. `1.2` behaves like `1.2.0` as a concrete point).
fn base_version(c: &Comparator) -> Version {
    Version {
        major: c.major,
        minor: c.minor.unwrap_or(0),
        patch: c.patch.unwrap_or(0),
        pre: c.pre.clone(),
        build: semver::BuildMetadata::EMPTY,
    }
}

/// The version one step past the most specific component a comparator pins
/// (e.g. `1.2` -> `1.3.0`, `1` -> `2.0.0`, `1.2.3` -> `1.2.4`). This is the
/// exclusive upper bound of the "wildcard" range that comparator's missing
/// components imply.
fn bump_at_specificity(c: &Comparator) -> Version {
    match (c.minor, c.patch) {
        (_, Some(patch)) => Version::new(c.major, c.minor.unwrap_or(0), patch + 1),
        (Some(minor), None) => Version::new(c.major, minor + 1, 0),
        (None, None) => Version::new(c.major + 1, 0, 0),
    }
}

/// Tilde's exclusive upper bound: always a minor-level bump, regardless of
/// whether a patch component was pinned (`~1.2.3` and `~1.2` both allow up
/// to, but excluding, `1.3.0`); `~1` bumps the major instead.
fn tilde_bump(c: &Comparator) -> Version {
    match c.minor {
        Some(minor) => Version::new(c.major, minor + 1, 0),
        None => Version::new(c.major + 1, 0, 0),
    }
}

/// Caret's exclusive upper bound, per Cargo's caret-requirement rules: bump
/// the leftmost non-zero component, or the next component after the last
/// one pinned if everything pinned so far is zero.
fn caret_bump(c: &Comparator) -> Version {
    if c.major > 0 {
        return Version::new(c.major + 1, 0, 0);
    }
    match c.minor {
        Some(minor) if minor > 0 => Version::new(0, minor + 1, 0),
        Some(_) => match c.patch {
            Some(patch) => Version::new(0, 0, patch + 1),
            None => Version::new(0, 1, 0),
        },
        None => Version::new(1, 0, 0),
    }
}

/// Translate one `semver::Comparator` into the interval of versions it
/// matches. `Op` is `#[non_exhaustive]`; an operator not covered here
/// conservatively matches everything rather than wrongly excluding versions.
fn comparator_interval(c: &Comparator) -> Interval {
    match c.op {
        Op::Exact => {
            if c.patch.is_some() {
                let v = base_version(c);
                Interval {
                    lower: Bound::Included(v.clone()),
                    upper: Bound::Included(v),
                }
            } else {
                Interval {
                    lower: Bound::Included(base_version(c)),
                    upper: Bound::Excluded(bump_at_specificity(c)),
                }
            }
        }
        Op::Greater => {
            if c.patch.is_some() {
                Interval {
                    lower: Bound::Excluded(base_version(c)),
                    upper: Bound::Unbounded,
                }
            } else {
                Interval {
                    lower: Bound::Included(bump_at_specificity(c)),
                    upper: Bound::Unbounded,
                }
            }
        }
        Op::GreaterEq => Interval {
            lower: Bound::Included(base_version(c)),
            upper: Bound::Unbounded,
        },
        Op::Less => Interval {
            lower: Bound::Unbounded,
            upper: Bound::Excluded(base_version(c)),
        },
        Op::LessEq => {
            if c.patch.is_some() {
                Interval {
                    lower: Bound::Unbounded,
                    upper: Bound::Included(base_version(c)),
                }
            } else {
                Interval {
                    lower: Bound::Unbounded,
                    upper: Bound::Excluded(bump_at_specificity(c)),
                }
            }
        }
        Op::Tilde => Interval {
            lower: Bound::Included(base_version(c)),
            upper: Bound::Excluded(tilde_bump(c)),
        },
        Op::Caret => Interval {
            lower: Bound::Included(base_version(c)),
            upper: Bound::Excluded(caret_bump(c)),
        },
        Op::Wildcard => {
            if c.minor.is_none() {
                Interval::full()
            } else {
                Interval {
                    lower: Bound::Included(base_version(c)),
                    upper: Bound::Excluded(bump_at_specificity(c)),
                }
            }
        }
        _ => Interval::full(),
    }
}

/// Version set for Gust packages, backed by a normalized list of disjoint,
/// sorted version intervals rather than a raw `VersionReq` — this is what
/// lets `intersection`/`union`/`complement` be real set algebra instead of
/// string-level `VersionReq` combination, which PubGrub's solver depends on
/// to merge per-package terms contributed by unrelated incompatibilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GustVersionSet {
    intervals: Vec<Interval>,
}

impl GustVersionSet {
    /// Create a set that matches any version.
    pub fn any() -> Self {
        Self {
            intervals: vec![Interval::full()],
        }
    }

    /// Create a set from a version requirement. A `VersionReq`'s comparators
    /// are conjunctive (all must match), so this intersects their intervals
    /// rather than unioning them.
    pub fn from_req(req: VersionReq) -> Self {
        let mut interval = Interval::full();
        for comparator in &req.comparators {
            interval = interval.intersect(&comparator_interval(comparator));
        }
        if interval.is_empty() {
            Self::empty()
        } else {
            Self {
                intervals: vec![interval],
            }
        }
    }

    /// Create a set that matches exactly one version.
    pub fn exact(version: Version) -> Self {
        Self {
            intervals: vec![Interval {
                lower: Bound::Included(version.clone()),
                upper: Bound::Included(version),
            }],
        }
    }

    /// Create an empty set.
    pub fn empty() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}

impl VersionSet for GustVersionSet {
    type V = GustVersion;

    fn empty() -> Self {
        GustVersionSet::empty()
    }

    fn singleton(v: Self::V) -> Self {
        GustVersionSet::exact(v.0)
    }

    fn complement(&self) -> Self {
        let mut result = Vec::new();
        let mut cursor = Bound::Unbounded;
        let mut reached_infinity = false;

        for interval in &self.intervals {
            if matches!(interval.lower, Bound::Unbounded) {
                // Nothing precedes an interval that starts at -infinity.
            } else {
                let gap = Interval {
                    lower: cursor,
                    upper: flip_bound(&interval.lower),
                };
                if !gap.is_empty() {
                    result.push(gap);
                }
            }

            cursor = flip_bound(&interval.upper);
            if matches!(interval.upper, Bound::Unbounded) {
                reached_infinity = true;
                break;
            }
        }

        if !reached_infinity {
            let tail = Interval {
                lower: cursor,
                upper: Bound::Unbounded,
            };
            if !tail.is_empty() {
                result.push(tail);
            }
        }

        Self { intervals: result }
    }

    fn intersection(&self, other: &Self) -> Self {
        let mut result = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                let i = a.intersect(b);
                if !i.is_empty() {
                    result.push(i);
                }
            }
        }
        Self {
            intervals: merge_intervals(result),
        }
    }

    fn contains(&self, v: &Self::V) -> bool {
        self.intervals.iter().any(|i| i.contains(&v.0))
    }

    fn full() -> Self {
        GustVersionSet::any()
    }

    fn union(&self, other: &Self) -> Self {
        let mut combined = self.intervals.clone();
        combined.extend(other.intervals.iter().cloned());
        Self {
            intervals: merge_intervals(combined),
        }
    }

    fn is_disjoint(&self, other: &Self) -> bool {
        self.intersection(other).intervals.is_empty()
    }

    fn subset_of(&self, other: &Self) -> bool {
        self.intersection(other) == *self
    }
}

impl Display for GustVersionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "<no versions>");
        }
        let parts: Vec<String> = self.intervals.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", parts.join(" || "))
    }
}

/// Gust's DependencyProvider implementation for PubGrub.
pub struct GustDependencyProvider<'a, P: PackageProvider> {
    /// The underlying package provider
    provider: &'a P,

    /// The root manifest being resolved
    manifest: Arc<Manifest>,

    /// Version overrides (force specific versions)
    overrides: HashMap<String, VersionReq>,

    /// Additional constraints
    constraints: HashMap<String, VersionReq>,

    /// Lockfile hints for preferring locked versions
    hints: LockfileHints,

    /// Resolution strategy
    strategy: ResolutionStrategy,

    /// Track why each version was selected
    trace: RefCell<ResolutionTrace>,

    /// Cache of available versions
    version_cache: RefCell<HashMap<String, Vec<Version>>>,
}

impl<'a, P: PackageProvider> GustDependencyProvider<'a, P> {
    /// Create a new dependency provider.
    pub fn new(provider: &'a P, manifest: Arc<Manifest>) -> Self {
        // Extract overrides from manifest
        let overrides: HashMap<String, VersionReq> = manifest
            .overrides
            .iter()
            .filter_map(|(name, version)| {
                VersionReq::parse(version).ok().map(|v| (name.clone(), v))
            })
            .collect();

        // Extract constraints from manifest
        let constraints: HashMap<String, VersionReq> = manifest
            .constraints
            .iter()
            .filter_map(|(name, version)| {
                VersionReq::parse(version).ok().map(|v| (name.clone(), v))
            })
            .collect();

        Self {
            provider,
            manifest,
            overrides,
            constraints,
            hints: LockfileHints::new(),
            strategy: ResolutionStrategy::Highest,
            trace: RefCell::new(ResolutionTrace::new()),
            version_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Set lockfile hints for preferring locked versions.
    pub fn with_hints(mut self, hints: LockfileHints) -> Self {
        self.hints = hints;
        self
    }

    /// Set the resolution strategy.
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Get the resolution trace.
    pub fn trace(&self) -> std::cell::Ref<'_, ResolutionTrace> {
        self.trace.borrow()
    }

    /// Get available versions for a package (cached).
    fn get_versions(&self, package: &str) -> Result<Vec<Version>, ResolveError> {
        {
            let cache = self.version_cache.borrow();
            if let Some(versions) = cache.get(package) {
                return Ok(versions.clone());
            }
        }

        let versions = self.provider.available_versions(package)?;
        self.version_cache
            .borrow_mut()
            .insert(package.to_string(), versions.clone());
        Ok(versions)
    }
}

impl<'a, P: PackageProvider> DependencyProvider for GustDependencyProvider<'a, P> {
    type P = GustPackage;
    type V = GustVersion;
    type VS = GustVersionSet;
    type M = String;
    type Err = ResolveError;
    type Priority = u32;

    fn prioritize(
        &self,
        package: &Self::P,
        _range: &Self::VS,
        _stats: &PackageResolutionStatistics,
    ) -> Self::Priority {
        // Lower priority = resolve first
        // Prioritize packages with fewer versions (finds conflicts faster)
        match package {
            GustPackage::Root => 0, // Always resolve root first
            GustPackage::Named(name) => {
                if self.overrides.contains_key(name) {
                    1 // Overrides second
                } else {
                    match self.get_versions(name) {
                        Ok(versions) => (100 + versions.len()) as u32,
                        Err(_) => 1000,
                    }
                }
            }
        }
    }

    fn choose_version(
        &self,
        package: &Self::P,
        range: &Self::VS,
    ) -> Result<Option<Self::V>, Self::Err> {
        #[cfg(test)]
        eprintln!(
            "choose_version called for {:?} with range {:?}",
            package, range
        );

        match package {
            GustPackage::Root => {
                #[cfg(test)]
                eprintln!("  Returning Root version 0.0.0");
                Ok(Some(GustVersion(Version::new(0, 0, 0))))
            }
            GustPackage::Named(name) => {
                // Check for override
                if let Some(override_req) = self.overrides.get(name) {
                    let versions = self.get_versions(name)?;
                    let matching: Vec<_> = versions
                        .into_iter()
                        .filter(|v| override_req.matches(v))
                        .collect();

                    if let Some(version) = matching.into_iter().max() {
                        self.trace.borrow_mut().record_choice(
                            name,
                            &version,
                            ChoiceReason::Override,
                        );
                        return Ok(Some(GustVersion(version)));
                    }
                }

                // Get versions and filter by range
                let versions = self.get_versions(name)?;
                let matching: Vec<_> = versions
                    .into_iter()
                    .filter(|v| range.contains(&GustVersion(v.clone())))
                    .collect();

                // Check lockfile hints first
                if let Some(locked) = self.hints.preferred_version(name) {
                    if matching.iter().any(|v| v == locked) {
                        self.trace.borrow_mut().record_choice(
                            name,
                            locked,
                            ChoiceReason::LockedHint,
                        );
                        return Ok(Some(GustVersion(locked.clone())));
                    }
                }

                // Apply strategy
                let chosen = match self.strategy {
                    ResolutionStrategy::Highest => matching.into_iter().max(),
                    ResolutionStrategy::Lowest => matching.into_iter().min(),
                    ResolutionStrategy::Locked => matching.into_iter().max(),
                };

                if let Some(ref version) = chosen {
                    let reason = match self.strategy {
                        ResolutionStrategy::Highest => ChoiceReason::HighestCompatible,
                        ResolutionStrategy::Lowest => ChoiceReason::LowestCompatible,
                        ResolutionStrategy::Locked => ChoiceReason::HighestCompatible,
                    };
                    self.trace.borrow_mut().record_choice(name, version, reason);
                }

                Ok(chosen.map(GustVersion))
            }
        }
    }

    fn get_dependencies(
        &self,
        package: &Self::P,
        version: &Self::V,
    ) -> Result<Dependencies<Self::P, Self::VS, Self::M>, Self::Err> {
        match package {
            GustPackage::Root => {
                // Root package dependencies come from the manifest
                let mut deps = Map::default();

                #[cfg(test)]
                eprintln!(
                    "get_dependencies for Root, manifest has {} deps",
                    self.manifest.dependencies.len()
                );

                for (name, dep) in &self.manifest.dependencies {
                    let pkg = GustPackage::named(name);
                    let range = if let Some(version) = &dep.version {
                        #[cfg(test)]
                        eprintln!("  Adding dep {} with version {:?}", name, version);
                        GustVersionSet::from_req(version.clone())
                    } else {
                        #[cfg(test)]
                        eprintln!("  Adding dep {} with any version", name);
                        GustVersionSet::any()
                    };
                    deps.insert(pkg, range);
                }

                #[cfg(test)]
                eprintln!("Returning {} dependencies for Root", deps.len());

                Ok(Dependencies::Available(deps))
            }
            GustPackage::Named(name) => {
                // Get dependencies from the provider
                let deps = self.provider.dependencies(name, &version.0)?;

                // Record requirements for trace
                for dep in &deps {
                    self.trace.borrow_mut().record_requirement(&dep.name, name);
                }

                // Convert to PubGrub format
                let mut pubgrub_deps = Map::default();

                for dep in deps {
                    let pkg = GustPackage::named(&dep.name);
                    let mut range = if let Some(version_req) = &dep.version {
                        GustVersionSet::from_req(version_req.clone())
                    } else {
                        GustVersionSet::any()
                    };

                    // Apply additional constraints
                    if let Some(constraint) = self.constraints.get(&dep.name) {
                        let constraint_set = GustVersionSet::from_req(constraint.clone());
                        range = range.intersection(&constraint_set);
                    }

                    pubgrub_deps.insert(pkg, range);
                }

                Ok(Dependencies::Available(pubgrub_deps))
            }
        }
    }
}

/// A simple in-memory provider for testing.
#[derive(Default)]
pub struct MemoryProvider {
    packages: HashMap<String, Vec<(Version, Vec<Dependency>)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&mut self, name: &str, version: Version, deps: Vec<Dependency>) {
        self.packages
            .entry(name.to_string())
            .or_default()
            .push((version, deps));
    }
}

impl PackageProvider for MemoryProvider {
    fn available_versions(&self, package: &str) -> Result<Vec<Version>, ResolveError> {
        self.packages
            .get(package)
            .map(|versions| versions.iter().map(|(v, _)| v.clone()).collect())
            .ok_or_else(|| ResolveError::PackageNotFound {
                name: package.to_string(),
                suggestions: vec![],
            })
    }

    fn dependencies(
        &self,
        package: &str,
        version: &Version,
    ) -> Result<Vec<Dependency>, ResolveError> {
        self.packages
            .get(package)
            .and_then(|versions| {
                versions
                    .iter()
                    .find(|(v, _)| v == version)
                    .map(|(_, deps)| deps.clone())
            })
            .ok_or_else(|| ResolveError::PackageNotFound {
                name: package.to_string(),
                suggestions: vec![],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_provider() {
        let mut provider = MemoryProvider::new();
        provider.add_package("swift-log", Version::new(1, 5, 4), vec![]);
        provider.add_package("swift-log", Version::new(1, 4, 0), vec![]);

        let versions = provider.available_versions("swift-log").unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn test_version_set() {
        let set = GustVersionSet::from_req(VersionReq::parse("^1.4").unwrap());
        assert!(set.contains(&GustVersion(Version::new(1, 5, 0))));
        assert!(set.contains(&GustVersion(Version::new(1, 4, 0))));
        assert!(!set.contains(&GustVersion(Version::new(2, 0, 0))));
    }

    #[test]
    fn test_intersection_of_overlapping_caret_ranges_is_the_overlap() {
        // root requires foo ^1.4 ([1.4.0, 2.0.0)), something else requires
        // foo >=1.5, <1.8 transitively — only [1.5.0, 1.8.0) should survive.
        let a = GustVersionSet::from_req(VersionReq::parse("^1.4").unwrap());
        let b = GustVersionSet::from_req(VersionReq::parse(">=1.5.0, <1.8.0").unwrap());
        let combined = a.intersection(&b);

        assert!(!combined.contains(&GustVersion(Version::new(1, 4, 0))));
        assert!(combined.contains(&GustVersion(Version::new(1, 5, 0))));
        assert!(combined.contains(&GustVersion(Version::new(1, 7, 9))));
        assert!(!combined.contains(&GustVersion(Version::new(1, 8, 0))));
        assert!(!combined.contains(&GustVersion(Version::new(2, 0, 0))));
    }

    #[test]
    fn test_intersection_of_disjoint_ranges_is_empty() {
        // root requires foo ^1.0 directly, bar requires foo ^2.0 transitively:
        // these must not merge into either side's range, and must not be
        // satisfiable by any single version.
        let a = GustVersionSet::from_req(VersionReq::parse("^1.0").unwrap());
        let b = GustVersionSet::from_req(VersionReq::parse("^2.0").unwrap());
        let combined = a.intersection(&b);

        assert_eq!(combined, GustVersionSet::empty());
        assert!(!combined.contains(&GustVersion(Version::new(1, 5, 0))));
        assert!(!combined.contains(&GustVersion(Version::new(2, 5, 0))));
        assert!(combined.is_disjoint(&GustVersionSet::any()));
    }

    #[test]
    fn test_union_and_complement_are_real_set_algebra() {
        let below = GustVersionSet::from_req(VersionReq::parse("<1.0.0").unwrap());
        let above = GustVersionSet::from_req(VersionReq::parse(">=2.0.0").unwrap());
        let union = below.union(&above);

        assert!(union.contains(&GustVersion(Version::new(0, 5, 0))));
        assert!(union.contains(&GustVersion(Version::new(2, 0, 0))));
        assert!(!union.contains(&GustVersion(Version::new(1, 5, 0))));

        // The complement of "below 1.0 or at/above 2.0" is exactly [1.0, 2.0).
        let middle = union.complement();
        assert!(!middle.contains(&GustVersion(Version::new(0, 5, 0))));
        assert!(middle.contains(&GustVersion(Version::new(1, 0, 0))));
        assert!(middle.contains(&GustVersion(Version::new(1, 9, 9))));
        assert!(!middle.contains(&GustVersion(Version::new(2, 0, 0))));

        assert!(middle.subset_of(&middle.union(&below)));
        assert!(middle.is_disjoint(&below));
    }

    #[test]
    fn test_subset_and_full_set() {
        let narrow = GustVersionSet::from_req(VersionReq::parse("^1.4").unwrap());
        assert!(narrow.subset_of(&GustVersionSet::full()));
        assert!(!GustVersionSet::full().subset_of(&narrow));
    }
}
