use anyhow::Result;
use std::path::PathBuf;

const LOG_FOLDER_NAME: &str = "Pitch_Wizard_Log";

/// Resolve the folder the binary runs from (absolute path)
pub fn resolve_deployment_folder() -> Result<PathBuf> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return Ok(dir.to_path_buf());
        }
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    Ok(cwd)
}

/// Resolve log folder (absolute path)
///
/// Order:
/// - `PITCH_WIZARD_LOG_DIR` if set
/// - an existing `Pitch_Wizard_Log/` in the CWD or any of its parents
/// - the platform data dir (`~/.local/share/pitch-wizard/logs` on Linux)
/// - `Pitch_Wizard_Log/` next to the binary
pub fn resolve_log_folder() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("PITCH_WIZARD_LOG_DIR").filter(|v| !v.is_empty()) {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow::anyhow!("Failed to create log folder {:?}: {}", dir, e))?;
        return Ok(dir);
    }

    if let Ok(mut dir) = std::env::current_dir() {
        for _ in 0..12 {
            let candidate = dir.join(LOG_FOLDER_NAME);
            if candidate.is_dir() {
                return Ok(candidate);
            }
            match dir.parent() {
                Some(parent) => dir = parent.to_path_buf(),
                None => break,
            }
        }
    }

    if let Some(data) = dirs::data_local_dir() {
        let log_dir = data.join("pitch-wizard").join("logs");
        if std::fs::create_dir_all(&log_dir).is_ok() {
            return Ok(log_dir);
        }
    }

    let log_dir = resolve_deployment_folder()?.join(LOG_FOLDER_NAME);
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
    Ok(log_dir)
}

/// Default config file location (`<config dir>/pitch-wizard/pitch-wizard.toml`).
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pitch-wizard").join("pitch-wizard.toml"))
}
