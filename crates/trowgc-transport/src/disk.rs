use std::path::Path;
use std::process::Command;

use trowgc_types::{TransportError, TransportResult};

/// Free-space report for the registry volume, printed around each cycle.
pub trait DiskUsage {
    /// Human-readable `df`-style report.
    fn disk_usage(&mut self) -> TransportResult<String>;
}

/// Run `df -h` on a local path.
pub(crate) fn local_df(path: &Path) -> TransportResult<String> {
    let output = Command::new("df").arg("-h").arg(path).output()?;
    if !output.status.success() {
        return Err(TransportError::CommandFailed {
            command: format!("df -h {}", path.display()),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
