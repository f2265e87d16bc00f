// SteamCMD launcher discovery
//
// The Steamworks SDK has shipped the ContentBuilder tree in a few different
// layouts over the years; the launcher script moved between them. We probe a
// fixed list of known locations under the configured builder base and take
// the first hit.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Relative launcher locations under the builder base, in probe order
///
/// First match wins; the order must not be changed.
pub const STEAMCMD_CANDIDATES: [&str; 4] = [
    "builder_osx/steamcmd.sh",
    "steamcmd.sh",
    "builder/steamcmd.sh",
    "tools/ContentBuilder/builder_osx/steamcmd.sh",
];

/// Every path that gets probed for a given builder base, in probe order
///
/// Exposed so failure diagnostics can enumerate the full search list.
pub fn candidate_paths(builder_base: &Utf8Path) -> Vec<Utf8PathBuf> {
    STEAMCMD_CANDIDATES
        .iter()
        .map(|rel| builder_base.join(rel))
        .collect()
}

/// Find the SteamCMD launcher under the builder base
///
/// Returns the first candidate that exists on disk, or `None` when no
/// candidate does. Absence is an expected condition (unconfigured or wrong
/// base path), not an error.
pub fn locate_steamcmd(builder_base: &Utf8Path) -> Option<Utf8PathBuf> {
    for path in candidate_paths(builder_base) {
        if path.exists() {
            tracing::debug!("Found SteamCMD launcher at {}", path);
            return Some(path);
        }
    }

    tracing::debug!("No SteamCMD launcher under {}", builder_base);
    None
}

/// Whether the launcher at `path` can actually be executed
///
/// A launcher that exists but lost its executable bit (a common result of
/// unzipping the SDK) is reported separately from "not found".
#[cfg(unix)]
pub fn is_executable(path: &Utf8Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: &Utf8Path) -> bool {
    fs::metadata(path).is_ok()
}
