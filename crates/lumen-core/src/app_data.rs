//! Where Lumen stores its own data (config, index snapshot).
//!
//! Indexed documents stay where they are. We only store app state here.

use std::path::PathBuf;

/// Returns the directory where Lumen stores config and the index snapshot.
/// On macOS: `~/Library/Application Support/Lumen/`.
/// Creates the directory if it doesn't exist; returns `None` if we can't determine the path.
pub fn app_data_dir() -> Option<PathBuf> {
    let dir = directories::ProjectDirs::from("app", "Lumen", "Lumen")?
        .data_local_dir()
        .to_path_buf();
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir)
}
