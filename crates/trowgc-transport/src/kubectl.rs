//! `kubectl exec` transport.

use std::io::{self, Write};
use std::process::{Command, Output, Stdio};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trowgc_catalog::{BlobDeleter, DeletionMode};
use trowgc_cycle::{DocumentFeed, InventoryFeed, ManifestFeed, StoreLayout};
use trowgc_types::{Digest, InventoryEntry, TransportError, TransportResult};

use crate::disk::DiskUsage;
use crate::stat::{parse_stat_output, STAT_FORMAT};

/// Where the registry pod lives and how to reach it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KubectlConfig {
    /// `kubectl` executable.
    pub kubectl: String,
    pub namespace: String,
    pub pod: String,
    /// Root of the registry volume inside the pod.
    pub data_root: String,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".into(),
            namespace: "trow".into(),
            pod: "trow-0".into(),
            data_root: "/data/".into(),
        }
    }
}

/// Registry volume inside a Kubernetes pod.
#[derive(Clone, Debug)]
pub struct KubectlRegistry {
    config: KubectlConfig,
    layout: StoreLayout,
}

impl KubectlRegistry {
    pub fn new(config: KubectlConfig, layout: StoreLayout) -> Self {
        Self { config, layout }
    }

    /// Arguments passed to `kubectl` to run `cmd` in the pod. `-i` is added
    /// only when stdin data is sent.
    pub fn exec_args(&self, cmd: &[&str], with_stdin: bool) -> Vec<String> {
        let mut args = vec![
            "exec".to_string(),
            "-n".to_string(),
            self.config.namespace.clone(),
            self.config.pod.clone(),
        ];
        if with_stdin {
            args.push("-i".into());
        }
        args.push("--".into());
        args.extend(cmd.iter().map(|s| s.to_string()));
        args
    }

    /// Run `cmd` in the pod and capture its output. A non-zero exit status
    /// is an error.
    fn exec(&self, cmd: &[&str], stdin: Option<&[u8]>) -> TransportResult<Output> {
        let stdin = stdin.filter(|data| !data.is_empty());
        let args = self.exec_args(cmd, stdin.is_some());
        debug!(kubectl = %self.config.kubectl, ?args, "running remote command");

        let mut child = Command::new(&self.config.kubectl)
            .args(&args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // A failed stdin write fails the command even if the remote side exits 0.
        let output = std::thread::scope(|scope| -> io::Result<Output> {
            let writer = match (stdin, child.stdin.take()) {
                (Some(data), Some(mut pipe)) => Some(scope.spawn(move || pipe.write_all(data))),
                _ => None,
            };
            let output = child.wait_with_output()?;
            if let Some(writer) = writer {
                writer
                    .join()
                    .map_err(|_| io::Error::other("stdin writer panicked"))??;
            }
            Ok(output)
        })?;

        if !output.status.success() {
            return Err(TransportError::CommandFailed {
                command: cmd.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    fn bash(&self, script: &str, stdin: Option<&[u8]>) -> TransportResult<Output> {
        self.exec(&["/bin/bash", "-c", script], stdin)
    }

    fn inventory_script(&self) -> String {
        format!(
            "find {} -type f -print0 | xargs --no-run-if-empty -0 -n 1 stat -c '{STAT_FORMAT}'",
            shell_quote(&self.config.data_root)
        )
    }
}

/// Quote `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn nul_joined(paths: &[String]) -> Vec<u8> {
    paths.join("\0").into_bytes()
}

impl InventoryFeed for KubectlRegistry {
    fn inventory(&mut self) -> TransportResult<Vec<InventoryEntry>> {
        let output = self.bash(&self.inventory_script(), None)?;
        let text = String::from_utf8(output.stdout)
            .map_err(|e| TransportError::Malformed(format!("inventory is not UTF-8: {e}")))?;
        parse_stat_output(&text)
    }
}

impl ManifestFeed for KubectlRegistry {
    fn manifest_text(&mut self, name: &str) -> TransportResult<String> {
        let output = self.exec(&["cat", "--", name], None)?;
        String::from_utf8(output.stdout)
            .map_err(|e| TransportError::Malformed(format!("manifest {name} is not UTF-8: {e}")))
    }
}

impl DocumentFeed for KubectlRegistry {
    fn document_bytes(&mut self, digest: &Digest) -> TransportResult<Vec<u8>> {
        let path = self.layout.blob_path(digest);
        Ok(self.exec(&["cat", "--", path.as_str()], None)?.stdout)
    }
}

impl BlobDeleter for KubectlRegistry {
    fn delete(&mut self, paths: &[String], mode: DeletionMode) -> TransportResult<()> {
        let stdin = nul_joined(paths);
        let stat_script = format!("xargs -0 -n 1 stat -c '{STAT_FORMAT}'");

        // Every path must still exist before anything is removed.
        let listing = self
            .bash(&stat_script, Some(&stdin))
            .map_err(|e| TransportError::Rejected(format!("pre-deletion check failed: {e}")))?;
        if mode.is_simulated() {
            info!("dry run, files that would be deleted:");
            for line in String::from_utf8_lossy(&listing.stdout).lines() {
                info!("{line}");
            }
            return Ok(());
        }

        let removed = self.bash("xargs -0 -n 1 rm --", Some(&stdin))?;
        let stdout = String::from_utf8_lossy(&removed.stdout);
        if !stdout.trim().is_empty() {
            info!("{}", stdout.trim());
        }
        info!(files = paths.len(), "orphaned blobs deleted");
        Ok(())
    }
}

impl DiskUsage for KubectlRegistry {
    fn disk_usage(&mut self) -> TransportResult<String> {
        let output = self.exec(&["df", "-h", self.config.data_root.as_str()], None)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> KubectlRegistry {
        KubectlRegistry::new(KubectlConfig::default(), StoreLayout::default())
    }

    #[test]
    fn exec_args_without_stdin() {
        let args = registry().exec_args(&["df", "-h", "/data"], false);
        assert_eq!(args, vec!["exec", "-n", "trow", "trow-0", "--", "df", "-h", "/data"]);
    }

    #[test]
    fn exec_args_with_stdin_adds_interactive_flag() {
        let args = registry().exec_args(&["/bin/bash", "-c", "xargs -0 rm"], true);
        assert_eq!(args[4], "-i");
        assert_eq!(args[5], "--");
    }

    #[test]
    fn inventory_script_quotes_root() {
        let mut config = KubectlConfig::default();
        config.data_root = "/it's data/".into();
        let reg = KubectlRegistry::new(config, StoreLayout::default());
        let script = reg.inventory_script();
        assert!(script.starts_with(r"find '/it'\''s data/' -type f -print0"));
        assert!(script.ends_with("stat -c '%s %Y %n'"));
    }

    #[test]
    fn paths_are_nul_joined() {
        let joined = nul_joined(&["/a".into(), "/b c".into()]);
        assert_eq!(joined, b"/a\0/b c".to_vec());
    }

    #[test]
    fn config_deserializes_partially() {
        let c: KubectlConfig = serde_json::from_str(r#"{"pod": "registry-1"}"#).unwrap();
        assert_eq!(c.pod, "registry-1");
        assert_eq!(c.namespace, "trow");
    }

    /// Write an executable stand-in for `kubectl` into `dir`.
    #[cfg(unix)]
    fn fake_kubectl(dir: &std::path::Path, script: &str) -> KubectlRegistry {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("kubectl");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        let config = KubectlConfig {
            kubectl: path.to_str().unwrap().to_string(),
            ..Default::default()
        };
        KubectlRegistry::new(config, StoreLayout::default())
    }

    #[cfg(unix)]
    fn many_paths() -> Vec<String> {
        (0..20_000)
            .map(|i| format!("/data/blobs/sha256/{i:064}"))
            .collect()
    }

    #[cfg(unix)]
    #[test]
    fn deletion_succeeds_when_remote_reads_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut reg = fake_kubectl(dir.path(), "#!/bin/sh\ncat >/dev/null\n");
        reg.delete(&many_paths(), DeletionMode::Delete).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn truncated_path_list_fails_deletion() {
        // Exits successfully without reading stdin, so the path list can
        // never be written in full.
        let dir = tempfile::tempdir().unwrap();
        let mut reg = fake_kubectl(dir.path(), "#!/bin/sh\nexit 0\n");
        assert!(reg.delete(&many_paths(), DeletionMode::Delete).is_err());
        assert!(reg.delete(&many_paths(), DeletionMode::Simulate).is_err());
    }

    #[test]
    fn missing_kubectl_binary_is_an_io_error() {
        let mut config = KubectlConfig::default();
        config.kubectl = "/nonexistent/kubectl-for-tests".into();
        let mut reg = KubectlRegistry::new(config, StoreLayout::default());
        assert!(matches!(reg.inventory(), Err(TransportError::Io(_))));
    }
}
