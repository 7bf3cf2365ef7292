// Utility Functions
// Working-directory resolution for pipeline invocations

use std::path::{Path, PathBuf};

/// Directory containing the runner executable, with symlinks resolved.
///
/// Returns `None` when the executable path cannot be determined (e.g.
/// the binary was deleted while running).
pub fn exe_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let exe = exe.canonicalize().ok()?;
    exe.parent().map(Path::to_path_buf)
}

/// Resolve the working directory for a pipeline invocation.
///
/// The configured override wins; otherwise the directory containing the
/// runner executable is used so relative paths inside the invoked
/// pipeline resolve the same way no matter where the runner was called
/// from. Falls back to the caller's cwd as a last resort.
pub fn resolve_working_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }
    exe_dir().unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}
