use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

use crate::models::{AppProfile, DepotConfig, ToolConfig};

/// Outcome of rendering one profile's build scripts
///
/// Tracks which files were actually written and which already matched on
/// disk, so callers can tell an idempotent re-render from a real update.
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// Path of the rendered app descriptor (the file passed to `+run_app_build`)
    pub app_script: Utf8PathBuf,

    /// Files that were missing or whose contents changed
    pub written: Vec<Utf8PathBuf>,

    /// Files whose on-disk contents already matched the rendered text
    pub unchanged: Vec<Utf8PathBuf>,
}

/// File name of a depot descriptor: `depot_<DepotID>.vdf`
pub fn depot_file_name(depot_id: &str) -> String {
    format!("depot_{}.vdf", depot_id)
}

/// Render the descriptor text for one depot
///
/// Field values are rendered verbatim, empty or not; validation is the
/// caller's job (build pre-flight and `check`), not the renderer's. The text
/// layout is fixed and must not be reformatted: SteamCMD parses these files.
pub fn render_depot(depot: &DepotConfig) -> String {
    format!(
        r#""DepotBuild"
{{
"DepotID" "{id}"
"ContentRoot" "{root}"
"FileMapping"
{{
"LocalPath" "*"
"DepotPath" "."
"recursive" "1"
}}
}}"#,
        id = depot.depot_id,
        root = depot.content_root,
    )
}

/// Render the app descriptor text for a profile
///
/// `BuildOutput` and `ContentRoot` are derived from the configured builder
/// base by plain string concatenation, matching the paths existing script
/// trees were generated with. Depot entries after the first carry a single
/// leading space.
pub fn render_app(profile: &AppProfile, config: &ToolConfig) -> String {
    let depot_entries = profile
        .depots
        .iter()
        .map(|d| format!("\"{}\" \"{}\"", d.depot_id, depot_file_name(&d.depot_id)))
        .collect::<Vec<_>>()
        .join("\n ");

    format!(
        r#""AppBuild"
{{
"AppID" "{app_id}"
"Desc" "{desc}"
"BuildOutput" "{base}/output"
"ContentRoot" "{base}/content"
"Depots"
{{
{entries}
}}
}}"#,
        app_id = profile.app_id,
        desc = profile.description,
        base = config.builder_path,
        entries = depot_entries,
    )
}

/// Render all VDF scripts for a profile under `<builder base>/scripts/`
///
/// Creates the scripts directory if absent, then writes one depot descriptor
/// per depot and the app descriptor. Each file is compared against its
/// existing contents first and skipped when identical, so an unchanged
/// profile leaves every modification time untouched.
pub fn render_scripts(profile: &AppProfile, config: &ToolConfig) -> Result<RenderReport> {
    let scripts_dir = config.scripts_dir();
    fs::create_dir_all(&scripts_dir)
        .with_context(|| format!("Failed to create scripts directory: {}", scripts_dir))?;

    let mut written = Vec::new();
    let mut unchanged = Vec::new();

    for depot in &profile.depots {
        let depot_path = scripts_dir.join(depot_file_name(&depot.depot_id));
        if write_if_changed(&depot_path, &render_depot(depot))? {
            written.push(depot_path);
        } else {
            unchanged.push(depot_path);
        }
    }

    let app_path = config.app_script_path(&profile.app_id);
    if write_if_changed(&app_path, &render_app(profile, config))? {
        written.push(app_path.clone());
    } else {
        unchanged.push(app_path.clone());
    }

    tracing::debug!(
        "Rendered scripts for '{}': {} written, {} unchanged",
        profile.name,
        written.len(),
        unchanged.len()
    );

    Ok(RenderReport {
        app_script: app_path,
        written,
        unchanged,
    })
}

/// Write `text` to `path` unless the file already holds exactly that text
///
/// A missing or unreadable file counts as different and gets written.
/// Returns whether a write happened.
fn write_if_changed(path: &Utf8Path, text: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == text {
            return Ok(false);
        }
    }

    fs::write(path, text).with_context(|| format!("Failed to write {}", path))?;
    tracing::debug!("Wrote {}", path);
    Ok(true)
}
