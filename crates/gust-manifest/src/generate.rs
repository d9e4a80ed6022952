//! Generates a `Package.swift` manifest from a parsed [`Manifest`].
//!
//! This is the inverse of [`crate::parse_package_swift`] for the subset of
//! SwiftPM's manifest DSL that a Gust.toml can express: products, targets,
//! and package dependencies. Build settings and platform declarations that
//! have no Gust.toml equivalent are simply omitted.

use crate::ManifestError;
use gust_types::{Manifest, TargetType};
use std::path::Path;

/// Render `manifest` as SwiftPM's declarative `Package.swift` source.
pub fn generate_package_swift(manifest: &Manifest) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "// swift-tools-version:{}\n",
        manifest.package.swift_tools_version
    ));
    out.push_str("import PackageDescription\n\n");
    out.push_str("let package = Package(\n");
    out.push_str(&format!("    name: \"{}\",\n", manifest.package.name));

    let products = generate_products(manifest);
    if !products.is_empty() {
        out.push_str("    products: [\n");
        out.push_str(&products);
        out.push_str("    ],\n");
    }

    if !manifest.dependencies.is_empty() {
        out.push_str("    dependencies: [\n");
        let mut names: Vec<&String> = manifest.dependencies.keys().collect();
        names.sort();
        for name in names {
            let dep = &manifest.dependencies[name];
            out.push_str(&format!("        {},\n", generate_dependency(dep)));
        }
        out.push_str("    ],\n");
    }

    if !manifest.targets.is_empty() {
        out.push_str("    targets: [\n");
        for target in &manifest.targets {
            out.push_str(&format!("        {},\n", generate_target(target)));
        }
        out.push_str("    ]\n");
    }

    out.push_str(")\n");
    out
}

fn generate_products(manifest: &Manifest) -> String {
    let mut out = String::new();
    for target in &manifest.targets {
        match target.target_type {
            TargetType::Library => out.push_str(&format!(
                "        .library(name: \"{0}\", targets: [\"{0}\"]),\n",
                target.name
            )),
            TargetType::Executable => out.push_str(&format!(
                "        .executable(name: \"{0}\", targets: [\"{0}\"]),\n",
                target.name
            )),
            _ => {}
        }
    }
    out
}

fn generate_dependency(dep: &gust_types::Dependency) -> String {
    if let Some(path) = &dep.path {
        return format!(".package(path: \"{}\")", path.display());
    }

    if let Some(url) = &dep.git {
        if let Some(tag) = &dep.tag {
            return format!(".package(url: \"{}\", exact: \"{}\")", url, tag);
        }
        if let Some(branch) = &dep.branch {
            return format!(".package(url: \"{}\", branch: \"{}\")", url, branch);
        }
        if let Some(revision) = &dep.revision {
            return format!(".package(url: \"{}\", revision: \"{}\")", url, revision);
        }
        return format!(".package(url: \"{}\", from: \"0.0.0\")", url);
    }

    match &dep.version {
        Some(req) => format!(".package(id: \"{}\", {})", dep.name, from_version_req(req)),
        None => format!(".package(id: \"{}\")", dep.name),
    }
}

fn from_version_req(req: &gust_types::VersionReq) -> String {
    format!("from: \"{}\"", req.to_string().trim_start_matches(['^', '~', '=']))
}

fn generate_target(target: &gust_types::Target) -> String {
    let deps = if target.dependencies.is_empty() {
        String::new()
    } else {
        let list = target
            .dependencies
            .iter()
            .map(|d| format!("\"{}\"", d))
            .collect::<Vec<_>>()
            .join(", ");
        format!(", dependencies: [{}]", list)
    };

    let path = target
        .path
        .as_ref()
        .map(|p| format!(", path: \"{}\"", p.display()))
        .unwrap_or_default();

    match target.target_type {
        TargetType::Test => format!("        .testTarget(name: \"{}\"{}{})", target.name, deps, path),
        TargetType::Plugin => format!("        .plugin(name: \"{}\"{})", target.name, deps),
        TargetType::SystemLibrary => format!("        .systemLibrary(name: \"{}\"{})", target.name, path),
        TargetType::Binary => format!("        .binaryTarget(name: \"{}\", path: \"{}\")", target.name, path),
        TargetType::Executable | TargetType::Library => {
            format!("        .target(name: \"{}\"{}{})", target.name, deps, path)
        }
    }
}

/// Write the generated manifest to `<dir>/Package.swift`.
pub fn write_package_swift(manifest: &Manifest, dir: &Path) -> Result<(), ManifestError> {
    let content = generate_package_swift(manifest);
    std::fs::write(dir.join("Package.swift"), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gust_types::{Dependency, Package, Target, VersionReq};

    #[test]
    fn test_generate_minimal_package() {
        let manifest = Manifest {
            package: Package {
                name: "Foo".to_string(),
                swift_tools_version: "5.9".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };

        let swift = generate_package_swift(&manifest);
        assert!(swift.contains("// swift-tools-version:5.9"));
        assert!(swift.contains("name: \"Foo\""));
    }

    #[test]
    fn test_generate_with_target_and_dependency() {
        let mut manifest = Manifest {
            package: Package {
                name: "Foo".to_string(),
                swift_tools_version: "5.9".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        manifest.dependencies.insert(
            "swift-log".to_string(),
            Dependency::registry("swift-log", VersionReq::parse("^1.4").unwrap()),
        );
        manifest.targets.push(Target::library("Foo"));

        let swift = generate_package_swift(&manifest);
        assert!(swift.contains(".library(name: \"Foo\", targets: [\"Foo\"])"));
        assert!(swift.contains(".target(name: \"Foo\""));
        assert!(swift.contains("swift-log"));
    }
}
