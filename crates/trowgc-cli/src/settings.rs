//! Layered configuration: command line and environment over the TOML file
//! over built-in defaults.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use trowgc_cycle::{GcConfig, GcSettings};
use trowgc_transport::KubectlConfig;

use crate::cli::{BackendArgs, BackendKind, GcArgs};

const DEFAULT_ROOT: &str = "/data/";

/// Contents of the `--config` file.
///
/// ```toml
/// [gc]
/// min_blob_age_secs = 3600
/// dry_run = true
///
/// [transport]
/// backend = "local"
/// root = "/srv/trow/"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSettings {
    pub gc: GcSettings,
    pub transport: TransportSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub backend: Option<BackendKind>,
    pub kubectl: Option<String>,
    pub namespace: Option<String>,
    pub pod: Option<String>,
    pub root: Option<String>,
}

impl TransportSettings {
    fn overlay(self, over: TransportSettings) -> TransportSettings {
        TransportSettings {
            backend: over.backend.or(self.backend),
            kubectl: over.kubectl.or(self.kubectl),
            namespace: over.namespace.or(self.namespace),
            pod: over.pod.or(self.pod),
            root: over.root.or(self.root),
        }
    }
}

impl From<&BackendArgs> for TransportSettings {
    fn from(args: &BackendArgs) -> Self {
        Self {
            backend: args.backend,
            kubectl: args.kubectl.clone(),
            namespace: args.namespace.clone(),
            pod: args.pod.clone(),
            root: args.root.clone(),
        }
    }
}

impl From<&GcArgs> for GcSettings {
    fn from(args: &GcArgs) -> Self {
        GcSettings {
            min_blob_age_secs: args.min_blob_age,
            poll_interval_secs: args.poll_interval,
            dry_run: args.dry_run,
            ..Default::default()
        }
    }
}

/// The configuration a command runs with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Effective {
    pub gc: GcConfig,
    pub backend: BackendKind,
    /// Root of the registry volume, local or inside the pod.
    pub root: String,
    pub kubectl: KubectlConfig,
}

/// Read and parse a settings file.
pub fn load_file(path: &Path) -> anyhow::Result<FileSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
}

/// Merge the file layer with the command-line layer and apply defaults.
///
/// Blob and manifest prefixes that are not set explicitly are placed under
/// the volume root.
pub fn resolve(file: FileSettings, args: &GcArgs) -> Effective {
    let transport = file.transport.overlay(TransportSettings::from(&args.backend));
    let mut gc = file.gc.overlay(GcSettings::from(args));

    let mut root = transport.root.unwrap_or_else(|| DEFAULT_ROOT.to_string());
    if !root.ends_with('/') {
        root.push('/');
    }
    gc.blob_prefix.get_or_insert_with(|| format!("{root}blobs/sha256/"));
    gc.manifest_prefix.get_or_insert_with(|| format!("{root}manifests/"));

    let defaults = KubectlConfig::default();
    let kubectl = KubectlConfig {
        kubectl: transport.kubectl.unwrap_or(defaults.kubectl),
        namespace: transport.namespace.unwrap_or(defaults.namespace),
        pod: transport.pod.unwrap_or(defaults.pod),
        data_root: root.clone(),
    };

    Effective {
        gc: GcConfig::from_settings(&gc),
        backend: transport.backend.unwrap_or_default(),
        root,
        kubectl,
    }
}
