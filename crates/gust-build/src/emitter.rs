//! Build Manifest Emitter: serializes a [`BuildPlan`] into the JSON wire
//! format consumed by the external incremental build engine.
//!
//! The engine itself is not invoked from here; this module only produces
//! the manifest and the per-product link file lists it references.

use crate::plan::{BuildPlan, CompileDescription, LinkDescription, LinkKind, PlistKind, SignDescription};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: u32,
    pub file_system: String,
}

#[derive(Debug, Serialize)]
pub struct ToolDescription {
    pub kind: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum CommandDescription {
    Compile {
        inputs: Vec<String>,
        outputs: Vec<String>,
        args: Vec<String>,
    },
    Link {
        inputs: Vec<String>,
        outputs: Vec<String>,
        link_file_list: String,
        args: Vec<String>,
    },
    /// Writes a generated plist file (a test bundle's `Info.plist`, or an
    /// executable's debug entitlements) that a later link/sign step waits on.
    WritePlist { outputs: Vec<String> },
    /// Signs a `-unsigned` binary against an entitlements plist and moves
    /// the result into the product's real output path.
    Sign {
        inputs: Vec<String>,
        outputs: Vec<String>,
        args: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct BuildManifest {
    pub client: ClientInfo,
    pub tools: BTreeMap<String, ToolDescription>,
    /// Named pseudo-targets (`main`, `test`) to the product outputs they include.
    pub targets: BTreeMap<String, Vec<String>>,
    pub default: String,
    pub commands: BTreeMap<String, CommandDescription>,
}

fn compiled_marker(target_key: &str) -> String {
    format!("<compiled-{target_key}>")
}

fn compile_args(compile: &CompileDescription) -> Vec<String> {
    let mut args = vec!["-module-name".to_string(), compile.module_name.clone()];
    for include in &compile.include_paths {
        args.push("-I".to_string());
        args.push(include.display().to_string());
    }
    args.extend(compile.extra_flags.iter().cloned());
    args
}

fn link_args(link: &LinkDescription) -> Vec<String> {
    let mut args = match link.kind {
        LinkKind::StaticArchive => vec!["-static".to_string()],
        LinkKind::DynamicLibrary => vec!["-shared".to_string()],
        LinkKind::Executable | LinkKind::TestBundle => Vec::new(),
    };
    args.extend(link.extra_flags.iter().cloned());
    args
}

fn plist_key(product_name: &str, kind: PlistKind) -> String {
    match kind {
        PlistKind::Info => format!("plist-info::{product_name}"),
        PlistKind::Entitlements => format!("plist-entitlements::{product_name}"),
    }
}

fn sign_args(sign: &SignDescription) -> Vec<String> {
    vec![
        "--entitlements".to_string(),
        sign.entitlements.display().to_string(),
        "--sign".to_string(),
    ]
}

/// Lower a build plan into the wire-format manifest. Pure function: no I/O.
pub fn emit(plan: &BuildPlan) -> BuildManifest {
    let mut tools = BTreeMap::new();
    tools.insert(
        "swift-compile".to_string(),
        ToolDescription { kind: "shell".to_string() },
    );
    tools.insert(
        "swift-link".to_string(),
        ToolDescription { kind: "shell".to_string() },
    );

    let mut commands = BTreeMap::new();
    for compile in &plan.compiles {
        commands.insert(
            format!("compile::{}", compile.target_key),
            CommandDescription::Compile {
                inputs: compile
                    .sources
                    .iter()
                    .map(|p| p.display().to_string())
                    .chain(compile.dependencies.iter().map(|dep| compiled_marker(dep)))
                    .collect(),
                outputs: vec![compiled_marker(&compile.target_key)],
                args: compile_args(compile),
            },
        );
    }

    for plist in &plan.plists {
        commands.insert(
            plist_key(&plist.product_name, plist.kind),
            CommandDescription::WritePlist {
                outputs: vec![plist.output.display().to_string()],
            },
        );
    }

    let signed_outputs: HashMap<&str, String> = plan
        .signs
        .iter()
        .map(|s| (s.product_name.as_str(), s.output.display().to_string()))
        .collect();

    let mut main_outputs = Vec::new();
    let mut test_outputs = Vec::new();
    for link in &plan.links {
        let output = link.output.display().to_string();
        let inputs = link
            .inputs
            .iter()
            .map(|key| compiled_marker(key))
            .chain(link.extra_inputs.iter().map(|p| p.display().to_string()))
            .collect();
        commands.insert(
            format!("link::{}", link.product_name),
            CommandDescription::Link {
                inputs,
                outputs: vec![output.clone()],
                link_file_list: link.link_file_list.display().to_string(),
                args: link_args(link),
            },
        );

        // The product's visible output is the post-sign path when an
        // entitlements chain applies, not the intermediate unsigned binary
        // this link step actually produces.
        let visible_output = signed_outputs
            .get(link.product_name.as_str())
            .cloned()
            .unwrap_or(output);
        match link.kind {
            LinkKind::TestBundle => test_outputs.push(visible_output),
            _ => main_outputs.push(visible_output),
        }
    }

    for sign in &plan.signs {
        commands.insert(
            format!("sign::{}", sign.product_name),
            CommandDescription::Sign {
                inputs: vec![
                    sign.unsigned_input.display().to_string(),
                    sign.entitlements.display().to_string(),
                ],
                outputs: vec![sign.output.display().to_string()],
                args: sign_args(sign),
            },
        );
    }

    let mut targets = BTreeMap::new();
    targets.insert("main".to_string(), main_outputs);
    targets.insert("test".to_string(), test_outputs);

    BuildManifest {
        client: ClientInfo {
            name: "gust".to_string(),
            version: 1,
            file_system: "device-agnostic".to_string(),
        },
        tools,
        targets,
        default: "main".to_string(),
        commands,
    }
}

/// Write the manifest JSON, via a sibling temp file plus rename so a reader
/// never observes a half-written manifest.
pub fn write_manifest_atomic(path: &Path, manifest: &BuildManifest) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(manifest)?;
    write_atomic(path, &json)
}

/// Write a `.LinkFileList`: one object path per line, in link order.
pub fn write_link_file_list(path: &Path, objects: &[PathBuf]) -> std::io::Result<()> {
    let content = objects
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    write_atomic(path, content.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ToolKind;

    #[test]
    fn test_emit_groups_link_outputs_by_target_pseudo_target() {
        let plan = BuildPlan {
            compiles: vec![
                CompileDescription {
                    target_key: "root::Lib".to_string(),
                    tool: ToolKind::SwiftCompiler,
                    module_name: "Lib".to_string(),
                    sources: vec![PathBuf::from("/root/Sources/Lib")],
                    object_dir: PathBuf::from("/root/.build/objects/root/Lib"),
                    include_paths: Vec::new(),
                    extra_flags: Vec::new(),
                    dependencies: Vec::new(),
                },
                CompileDescription {
                    target_key: "root::App".to_string(),
                    tool: ToolKind::SwiftCompiler,
                    module_name: "App".to_string(),
                    sources: vec![PathBuf::from("/root/Sources/App")],
                    object_dir: PathBuf::from("/root/.build/objects/root/App"),
                    include_paths: Vec::new(),
                    extra_flags: Vec::new(),
                    dependencies: vec!["root::Lib".to_string()],
                },
            ],
            links: vec![
                LinkDescription {
                    product_name: "App".to_string(),
                    kind: LinkKind::Executable,
                    inputs: vec!["root::App".to_string()],
                    output: PathBuf::from("/root/.build/App"),
                    link_file_list: PathBuf::from("/root/.build/App.LinkFileList"),
                    extra_flags: Vec::new(),
                    extra_inputs: Vec::new(),
                },
                LinkDescription {
                    product_name: "AppTests".to_string(),
                    kind: LinkKind::TestBundle,
                    inputs: vec!["root::App".to_string()],
                    output: PathBuf::from("/root/.build/AppTests"),
                    link_file_list: PathBuf::from("/root/.build/AppTests.LinkFileList"),
                    extra_flags: Vec::new(),
                    extra_inputs: Vec::new(),
                },
            ],
        };

        let manifest = emit(&plan);
        assert_eq!(manifest.targets["main"], vec!["/root/.build/App".to_string()]);
        assert_eq!(
            manifest.targets["test"],
            vec!["/root/.build/AppTests".to_string()]
        );
        assert_eq!(manifest.commands.len(), 4);
        assert_eq!(manifest.default, "main");

        match &manifest.commands["compile::root::App"] {
            CommandDescription::Compile { inputs, .. } => {
                assert!(inputs.contains(&compiled_marker("root::Lib")));
            }
            other => panic!("expected a compile command, got {other:?}"),
        }
    }

    #[test]
    fn test_emit_wires_plist_and_sign_commands_and_surfaces_signed_output() {
        let plan = BuildPlan {
            compiles: vec![CompileDescription {
                target_key: "root::app".to_string(),
                tool: ToolKind::SwiftCompiler,
                module_name: "app".to_string(),
                sources: vec![PathBuf::from("/root/Sources/app")],
                object_dir: PathBuf::from("/root/.build/objects/root/app"),
                include_paths: Vec::new(),
                extra_flags: Vec::new(),
                dependencies: Vec::new(),
            }],
            links: vec![LinkDescription {
                product_name: "app".to_string(),
                kind: LinkKind::Executable,
                inputs: vec!["root::app".to_string()],
                output: PathBuf::from("/root/.build/app-unsigned"),
                link_file_list: PathBuf::from("/root/.build/app.LinkFileList"),
                extra_flags: Vec::new(),
                extra_inputs: Vec::new(),
            }],
            plists: vec![PlistDescription {
                product_name: "app".to_string(),
                kind: PlistKind::Entitlements,
                output: PathBuf::from("/root/.build/app.entitlements"),
            }],
            signs: vec![SignDescription {
                product_name: "app".to_string(),
                unsigned_input: PathBuf::from("/root/.build/app-unsigned"),
                entitlements: PathBuf::from("/root/.build/app.entitlements"),
                output: PathBuf::from("/root/.build/app"),
            }],
        };

        let manifest = emit(&plan);

        assert_eq!(
            manifest.targets["main"],
            vec!["/root/.build/app".to_string()]
        );
        assert!(manifest.commands.contains_key("plist-entitlements::app"));
        assert!(manifest.commands.contains_key("sign::app"));

        match &manifest.commands["sign::app"] {
            CommandDescription::Sign { inputs, outputs, .. } => {
                assert_eq!(
                    inputs,
                    &vec![
                        "/root/.build/app-unsigned".to_string(),
                        "/root/.build/app.entitlements".to_string(),
                    ]
                );
                assert_eq!(outputs, &vec!["/root/.build/app".to_string()]);
            }
            other => panic!("expected a sign command, got {other:?}"),
        }
    }

    #[test]
    fn test_write_manifest_atomic_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = emit(&BuildPlan::default());
        let path = dir.path().join("gust-manifest.json");
        write_manifest_atomic(&path, &manifest).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\"default\": \"main\""));
    }
}
