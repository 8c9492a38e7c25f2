//! CLI modes: `static` and `dump` output writers.
//!
//! Both modes process the tree once and write every cached artifact below
//! the output directory, mirroring the file's site-relative path. `dump`
//! additionally writes a `.yaml` metadata sidecar per file and a
//! `context.json` snapshot, which golden-file tests diff against a known
//! good output.

pub mod args;

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::{File, FileMetadata, FileStore};
use crate::log;

/// Per-file metadata sidecar written by `dump`.
#[derive(Serialize)]
struct FileSidecar<'a> {
    path: &'a str,
    #[serde(flatten)]
    metadata: &'a FileMetadata,
}

/// Deterministic, pointer-free view of one file for `context.json`.
#[derive(Serialize)]
struct FileSnapshot<'a> {
    path: &'a str,
    routes: &'a [String],
    metadata: &'a FileMetadata,
    dependencies: Vec<&'a str>,
    dependents: Vec<&'a str>,
}

#[derive(Serialize)]
struct ContextSnapshot<'a> {
    config: &'a SiteConfig,
    files: Vec<FileSnapshot<'a>>,
}

/// Write every processed artifact to the output directory.
///
/// With `everything` (dump mode), also writes metadata sidecars and the
/// serialized context.
pub fn write_static(store: &FileStore, config: &SiteConfig, everything: bool) -> Result<()> {
    let out_dir = &config.out_dir;
    std::fs::create_dir(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let files = store.get_all_files();
    let mut paths: Vec<&String> = files.keys().collect();
    paths.sort();

    for path in &paths {
        let file = &files[*path];
        let out_path = out_dir.join(path);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to mkdir {}", parent.display()))?;
        }

        std::fs::write(&out_path, file.content.as_deref().unwrap_or_default())
            .with_context(|| format!("failed to write {}", out_path.display()))?;

        if everything {
            write_sidecar(&out_path, file)?;
        }
    }

    if everything {
        write_context_json(out_dir, config, &files, &paths)?;
    }

    log!("static"; "wrote {} files to {}", paths.len(), out_dir.display());
    Ok(())
}

fn write_sidecar(out_path: &Path, file: &File) -> Result<()> {
    let sidecar = FileSidecar {
        path: &file.path,
        metadata: &file.metadata,
    };
    let yaml = serde_yaml::to_string(&sidecar)?;
    let sidecar_path = format!("{}.yaml", out_path.display());
    std::fs::write(&sidecar_path, yaml)
        .with_context(|| format!("failed to write {sidecar_path}"))?;
    Ok(())
}

fn write_context_json(
    out_dir: &Path,
    config: &SiteConfig,
    files: &rustc_hash::FxHashMap<String, File>,
    sorted_paths: &[&String],
) -> Result<()> {
    let snapshots: Vec<FileSnapshot> = sorted_paths
        .iter()
        .map(|path| {
            let file = &files[*path];
            let mut dependencies: Vec<&str> =
                file.dependencies.iter().map(String::as_str).collect();
            let mut dependents: Vec<&str> = file.dependents.iter().map(String::as_str).collect();
            dependencies.sort_unstable();
            dependents.sort_unstable();
            FileSnapshot {
                path: &file.path,
                routes: &file.routes,
                metadata: &file.metadata,
                dependencies,
                dependents,
            }
        })
        .collect();

    let snapshot = ContextSnapshot {
        config,
        files: snapshots,
    };
    let json = serde_json::to_string_pretty(&snapshot)?;
    let out_path = out_dir.join("context.json");
    std::fs::write(&out_path, json)
        .with_context(|| format!("failed to write {}", out_path.display()))?;
    Ok(())
}
