//! Path validation helpers, ported from the source tool's path-validation
//! utility: the SUT executable must exist and be readable, and any output
//! directory must be writable.

use std::path::Path;

use crate::errors::{InvalidPathSnafu, ReporterError};

/// Validate that `path` exists, is a file, and is readable — the same checks
/// the source tool applies before spawning the SUT.
pub fn validate_input_path(path: &Path) -> Result<(), ReporterError> {
    if !path.exists() {
        return InvalidPathSnafu {
            message: format!("path does not exist: {}", path.display()),
        }
        .fail();
    }
    if !path.is_file() {
        return InvalidPathSnafu {
            message: format!("path is not a file: {}", path.display()),
        }
        .fail();
    }
    if !is_readable(path) {
        return InvalidPathSnafu {
            message: format!("no read permission: {}", path.display()),
        }
        .fail();
    }
    if !is_executable(path) {
        return InvalidPathSnafu {
            message: format!("no execute permission: {}", path.display()),
        }
        .fail();
    }
    Ok(())
}

/// Validate that `path` is a directory that exists and is writable, creating
/// none of its ancestors (the caller chose the directory; this only checks).
pub fn validate_output_dir(path: &Path) -> Result<(), ReporterError> {
    if !path.exists() {
        return InvalidPathSnafu {
            message: format!("output directory does not exist: {}", path.display()),
        }
        .fail();
    }
    if !path.is_dir() {
        return InvalidPathSnafu {
            message: format!("output path is not a directory: {}", path.display()),
        }
        .fail();
    }
    if !is_writable(path) {
        return InvalidPathSnafu {
            message: format!("no write permission in directory: {}", path.display()),
        }
        .fail();
    }
    Ok(())
}

#[cfg(unix)]
fn is_readable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o444 != 0)
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(unix)]
fn is_writable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o222 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_readable(path: &Path) -> bool {
    std::fs::File::open(path).is_ok()
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(not(unix))]
fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}
