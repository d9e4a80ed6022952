//! Build Plan: per-target/product compile and link descriptions derived
//! from a resolved [`gust_graph::PackageGraph`].
//!
//! This is the layer between graph construction and the build manifest
//! emitter. It owns no process-invocation or I/O concerns of its own; it
//! only decides what needs compiling and linking, and in what order.

use gust_graph::{LibraryLinkage, PackageGraph, ProductType};
use gust_types::{BuildConfiguration, TargetType};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    SwiftCompiler,
}

/// The platform a build plan is being lowered for — only distinguishes
/// darwin (which needs test-bundle wrapping and code signing) from
/// everything else, which gets a plain executable for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPlatform {
    Darwin,
    Other,
}

impl TargetPlatform {
    pub fn from_os(os: &str) -> Self {
        if os == "macos" {
            TargetPlatform::Darwin
        } else {
            TargetPlatform::Other
        }
    }
}

/// Describes compiling a single resolved target into object output.
#[derive(Debug, Clone)]
pub struct CompileDescription {
    /// `<package-identity>::<target-name>` key matching `PackageGraph::targets`.
    pub target_key: String,
    pub tool: ToolKind,
    pub module_name: String,
    pub sources: Vec<PathBuf>,
    pub object_dir: PathBuf,
    pub include_paths: Vec<PathBuf>,
    pub extra_flags: Vec<String>,
    /// Target keys that must be compiled before this one.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    StaticArchive,
    DynamicLibrary,
    Executable,
    TestBundle,
}

/// Describes linking a resolved product from its member targets' object output.
#[derive(Debug, Clone)]
pub struct LinkDescription {
    pub product_name: String,
    pub kind: LinkKind,
    /// Target keys whose compiled objects feed this link step.
    pub inputs: Vec<String>,
    pub output: PathBuf,
    pub link_file_list: PathBuf,
    pub extra_flags: Vec<String>,
    /// Non-compile file inputs this link step must wait on (e.g. a test
    /// bundle's `Info.plist` on darwin). Plain file paths, not target keys.
    pub extra_inputs: Vec<PathBuf>,
}

/// Which plist a [`PlistDescription`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlistKind {
    /// A test bundle's `Contents/Info.plist` on darwin.
    Info,
    /// An executable's debugging entitlements, ahead of signing.
    Entitlements,
}

/// Describes writing a generated plist file that a later link or sign step
/// depends on.
#[derive(Debug, Clone)]
pub struct PlistDescription {
    pub product_name: String,
    pub kind: PlistKind,
    pub output: PathBuf,
}

/// Describes the final step of the debug-entitlements chain: sign the
/// `-unsigned` binary a [`LinkDescription`] produced, against an entitlements
/// plist, and move the result into the product's real output path.
#[derive(Debug, Clone)]
pub struct SignDescription {
    pub product_name: String,
    pub unsigned_input: PathBuf,
    pub entitlements: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub compiles: Vec<CompileDescription>,
    pub links: Vec<LinkDescription>,
    pub plists: Vec<PlistDescription>,
    pub signs: Vec<SignDescription>,
}

/// Lower a package graph into a build plan rooted at `build_dir`.
///
/// Binary and system-library targets have nothing to compile and are
/// skipped; plugin products have nothing to link and are skipped too.
///
/// `platform` controls test-bundle wrapping (darwin gets an `.xctest`
/// bundle with an `Info.plist`; everywhere else gets a plain executable).
/// `entitlements`, when set, requests the debug-entitlements signing chain
/// for every executable product in the plan.
pub fn build_plan(
    graph: &PackageGraph,
    build_dir: &PathBuf,
    _configuration: BuildConfiguration,
    platform: TargetPlatform,
    entitlements: Option<&Path>,
) -> BuildPlan {
    let mut plan = BuildPlan::default();
    let object_root = build_dir.join("objects");

    for target in graph.targets.values() {
        if matches!(
            target.target_type,
            TargetType::SystemLibrary | TargetType::Binary
        ) {
            continue;
        }

        let mut extra_flags = Vec::new();
        if let Some(settings) = graph.build_settings.get(&target.package_identity) {
            extra_flags.extend(settings.swift_flags.iter().cloned());
            extra_flags.extend(settings.c_flags.iter().cloned());
        }

        // Public headers of transitive library targets: SwiftPM's convention
        // of a target's C-family headers living under `<target>/include`.
        let include_paths = graph
            .closure(&target.key(), gust_graph::BuildSubset::Main)
            .unwrap_or_default()
            .into_iter()
            .filter(|key| key != &target.key())
            .filter_map(|key| graph.targets.get(&key))
            .filter(|dep| dep.target_type == TargetType::Library)
            .filter_map(|dep| dep.source_root.as_ref())
            .map(|root| root.join("include"))
            .collect();

        plan.compiles.push(CompileDescription {
            target_key: target.key(),
            tool: ToolKind::SwiftCompiler,
            module_name: target.name.clone(),
            sources: target.source_root.iter().cloned().collect(),
            object_dir: object_root.join(&target.package_identity).join(&target.name),
            include_paths,
            extra_flags,
            dependencies: target.dependencies.clone(),
        });
    }

    for product in graph.products.values() {
        // A binary target's "product" has nothing to link: it's a prebuilt
        // archive consumed directly by whatever depends on it.
        let is_pure_binary_artifact = product
            .targets
            .iter()
            .all(|key| graph.targets.get(key).map(|t| t.target_type == TargetType::Binary).unwrap_or(false));
        if is_pure_binary_artifact {
            continue;
        }

        let kind = match &product.product_type {
            ProductType::Executable => LinkKind::Executable,
            ProductType::Library(LibraryLinkage::Static) => LinkKind::StaticArchive,
            ProductType::Library(LibraryLinkage::Dynamic) => LinkKind::DynamicLibrary,
            ProductType::Test => LinkKind::TestBundle,
            ProductType::Plugin => continue,
        };

        let link_file_list = build_dir.join(format!("{}.LinkFileList", product.name));
        let mut extra_inputs = Vec::new();

        // Binary targets transitively reachable from this product's own
        // targets never get a compile or link command of their own; instead
        // their extracted archive directory is referenced directly in this
        // product's link arguments.
        let mut link_extra_flags = Vec::new();
        let mut seen_artifacts = std::collections::HashSet::new();
        for target_key in &product.targets {
            for dep_key in graph
                .closure(target_key, gust_graph::BuildSubset::Main)
                .unwrap_or_default()
            {
                if dep_key == *target_key {
                    continue;
                }
                let Some(dep) = graph.targets.get(&dep_key) else { continue };
                if dep.target_type != TargetType::Binary {
                    continue;
                }
                let artifact_dir = binary_artifact_dir(build_dir, dep);
                if seen_artifacts.insert(artifact_dir.clone()) {
                    link_extra_flags.push("-F".to_string());
                    link_extra_flags.push(artifact_dir.display().to_string());
                }
            }
        }

        // Test bundles get darwin-specific `.xctest` wrapping: the binary
        // lands inside Contents/MacOS, and a written Info.plist both lives
        // alongside it and gates the link step.
        let output = if kind == LinkKind::TestBundle && platform == TargetPlatform::Darwin {
            let bundle_dir = build_dir.join(format!("{}.xctest", product.name));
            let plist_output = bundle_dir.join("Contents/Info.plist");
            plan.plists.push(PlistDescription {
                product_name: product.name.clone(),
                kind: PlistKind::Info,
                output: plist_output.clone(),
            });
            extra_inputs.push(plist_output);
            bundle_dir.join("Contents/MacOS").join(&product.name)
        } else {
            let output_name = match kind {
                LinkKind::StaticArchive => format!("lib{}.a", product.name),
                LinkKind::DynamicLibrary => format!("lib{}.dylib", product.name),
                LinkKind::Executable | LinkKind::TestBundle => product.name.clone(),
            };
            build_dir.join(output_name)
        };

        // Debug entitlements requested for an executable: link to an
        // "-unsigned" sibling, generate the entitlements plist, then sign
        // and move the result into the real output path.
        let link_output = if kind == LinkKind::Executable && entitlements.is_some() {
            let final_output = output.clone();
            let unsigned_output = build_dir.join(format!("{}-unsigned", product.name));
            let entitlements_output = build_dir.join(format!("{}.entitlements", product.name));
            plan.plists.push(PlistDescription {
                product_name: product.name.clone(),
                kind: PlistKind::Entitlements,
                output: entitlements_output.clone(),
            });
            plan.signs.push(SignDescription {
                product_name: product.name.clone(),
                unsigned_input: unsigned_output.clone(),
                entitlements: entitlements_output,
                output: final_output,
            });
            unsigned_output
        } else {
            output
        };

        plan.links.push(LinkDescription {
            product_name: product.name.clone(),
            kind,
            inputs: product.targets.clone(),
            output: link_output,
            link_file_list,
            extra_flags: link_extra_flags,
            extra_inputs,
        });
    }

    plan
}

/// Where a binary target's archive is extracted to under the build
/// directory, by package identity and target name.
fn binary_artifact_dir(build_dir: &Path, target: &gust_graph::ResolvedTargetNode) -> PathBuf {
    build_dir
        .join("artifacts")
        .join(&target.package_identity)
        .join(&target.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gust_graph::{BuildSubset, PackageNode};
    use gust_types::{Manifest, Package, Target};

    fn package_node(identity: &str, targets: Vec<Target>) -> PackageNode {
        PackageNode {
            identity: identity.to_string(),
            manifest: Manifest {
                package: Package {
                    name: identity.to_string(),
                    ..Default::default()
                },
                targets,
                ..Default::default()
            },
            root_path: PathBuf::from(format!("/{identity}")),
            is_root: true,
        }
    }

    #[test]
    fn test_plan_has_one_compile_per_target_and_skips_plugins() {
        let mut exe = Target::executable("app");
        exe.path = Some(PathBuf::from("Sources/app"));
        let nodes = vec![package_node("app", vec![exe])];
        let graph = gust_graph::build_graph(&nodes).unwrap();
        let plan = build_plan(
            &graph,
            &PathBuf::from("/tmp/.build"),
            BuildConfiguration::Debug,
            TargetPlatform::Other,
            None,
        );
        assert_eq!(plan.compiles.len(), 1);
        assert_eq!(plan.links.len(), 1);
        assert_eq!(plan.links[0].kind, LinkKind::Executable);
        assert!(plan.plists.is_empty());
        assert!(plan.signs.is_empty());
        let _ = BuildSubset::Main;
    }

    #[test]
    fn test_darwin_test_bundle_gets_plist_and_xctest_layout() {
        let mut exe = Target::test("AppTests");
        exe.path = Some(PathBuf::from("Tests/AppTests"));
        let nodes = vec![package_node("app", vec![exe])];
        let graph = gust_graph::build_graph(&nodes).unwrap();
        let plan = build_plan(
            &graph,
            &PathBuf::from("/tmp/.build"),
            BuildConfiguration::Debug,
            TargetPlatform::Darwin,
            None,
        );

        assert_eq!(plan.plists.len(), 1);
        assert_eq!(plan.plists[0].kind, PlistKind::Info);
        let link = &plan.links[0];
        assert_eq!(link.kind, LinkKind::TestBundle);
        assert!(link.output.ends_with("AppTests.xctest/Contents/MacOS/AppTests"));
        assert_eq!(link.extra_inputs, vec![plan.plists[0].output.clone()]);
    }

    #[test]
    fn test_entitlements_requested_chains_sign_after_unsigned_link() {
        let mut exe = Target::executable("app");
        exe.path = Some(PathBuf::from("Sources/app"));
        let nodes = vec![package_node("app", vec![exe])];
        let graph = gust_graph::build_graph(&nodes).unwrap();
        let entitlements_src = PathBuf::from("/tmp/app.entitlements.in");
        let plan = build_plan(
            &graph,
            &PathBuf::from("/tmp/.build"),
            BuildConfiguration::Debug,
            TargetPlatform::Darwin,
            Some(&entitlements_src),
        );

        assert_eq!(plan.signs.len(), 1);
        let sign = &plan.signs[0];
        assert_eq!(plan.links[0].output, sign.unsigned_input);
        assert_eq!(sign.output, PathBuf::from("/tmp/.build/app"));
        assert!(plan
            .plists
            .iter()
            .any(|p| p.kind == PlistKind::Entitlements && p.output == sign.entitlements));
    }

    #[test]
    fn test_binary_target_has_no_compile_and_is_referenced_in_link_args() {
        let foo = Target::binary("Foo", "https://example.com/Foo.zip", "deadbeef");
        let mut exe = Target::executable("app");
        exe.path = Some(PathBuf::from("Sources/app"));
        exe.dependencies = vec!["Foo".to_string()];
        let nodes = vec![package_node("root", vec![foo, exe])];
        let graph = gust_graph::build_graph(&nodes).unwrap();

        let plan = build_plan(
            &graph,
            &PathBuf::from("/tmp/.build"),
            BuildConfiguration::Debug,
            TargetPlatform::Other,
            None,
        );

        // Only the executable gets compiled; the binary target has no source.
        assert_eq!(plan.compiles.len(), 1);
        assert_eq!(plan.compiles[0].target_key, "root::app");

        // Only the executable gets linked; the binary's own "product" is a
        // prebuilt artifact with nothing to link.
        assert_eq!(plan.links.len(), 1);
        let link = &plan.links[0];
        assert!(link.extra_flags.contains(&"-F".to_string()));
        assert!(link
            .extra_flags
            .iter()
            .any(|f| f.contains("artifacts/root/Foo")));
    }
}
