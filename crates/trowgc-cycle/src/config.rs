use std::time::Duration;

use serde::{Deserialize, Serialize};
use trowgc_types::Digest;

/// Default minimum age before an unreferenced blob may be reclaimed.
pub const DEFAULT_MIN_BLOB_AGE_SECS: i64 = 86_400;
/// Default delay between two cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: i64 = 3_600;
/// Default location of blob files on the registry volume.
pub const DEFAULT_BLOB_PREFIX: &str = "/data/blobs/sha256/";
/// Default location of manifest files on the registry volume.
pub const DEFAULT_MANIFEST_PREFIX: &str = "/data/manifests/";

/// Where the registry keeps blobs and manifests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreLayout {
    /// Directory holding one file per blob, named by digest.
    pub blob_prefix: String,
    /// Directory tree holding manifest files.
    pub manifest_prefix: String,
}

impl StoreLayout {
    /// Build a layout, making sure both prefixes end with `/`.
    pub fn new(blob_prefix: impl Into<String>, manifest_prefix: impl Into<String>) -> Self {
        Self {
            blob_prefix: with_trailing_slash(blob_prefix.into()),
            manifest_prefix: with_trailing_slash(manifest_prefix.into()),
        }
    }

    /// Path of the blob file for `digest`.
    pub fn blob_path(&self, digest: &Digest) -> String {
        format!("{}{}", self.blob_prefix, digest.to_hex())
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new(DEFAULT_BLOB_PREFIX, DEFAULT_MANIFEST_PREFIX)
    }
}

fn with_trailing_slash(mut prefix: String) -> String {
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// Unvalidated, partially specified settings from one configuration source.
///
/// Sources (file, environment, command line) each produce a `GcSettings`;
/// they are merged with [`GcSettings::overlay`] and turned into a
/// [`GcConfig`] once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcSettings {
    /// Seconds; negative values are clamped to zero.
    pub min_blob_age_secs: Option<i64>,
    /// Seconds; values below one are clamped to one.
    pub poll_interval_secs: Option<i64>,
    pub dry_run: Option<bool>,
    pub blob_prefix: Option<String>,
    pub manifest_prefix: Option<String>,
}

impl GcSettings {
    /// Merge two layers; every field set in `over` wins.
    pub fn overlay(self, over: GcSettings) -> GcSettings {
        GcSettings {
            min_blob_age_secs: over.min_blob_age_secs.or(self.min_blob_age_secs),
            poll_interval_secs: over.poll_interval_secs.or(self.poll_interval_secs),
            dry_run: over.dry_run.or(self.dry_run),
            blob_prefix: over.blob_prefix.or(self.blob_prefix),
            manifest_prefix: over.manifest_prefix.or(self.manifest_prefix),
        }
    }
}

/// Immutable configuration for the collector, built once at startup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GcConfig {
    /// Unreferenced blobs younger than this are kept.
    pub min_blob_age: Duration,
    /// Delay between the end of one cycle and the start of the next.
    pub poll_interval: Duration,
    /// Simulate deletions instead of performing them.
    pub dry_run: bool,
    pub layout: StoreLayout,
}

impl GcConfig {
    /// Apply defaults and clamps to `settings`.
    pub fn from_settings(settings: &GcSettings) -> Self {
        let min_age = settings
            .min_blob_age_secs
            .unwrap_or(DEFAULT_MIN_BLOB_AGE_SECS)
            .max(0);
        let poll = settings
            .poll_interval_secs
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);
        let layout = StoreLayout::new(
            settings
                .blob_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_BLOB_PREFIX.to_string()),
            settings
                .manifest_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_MANIFEST_PREFIX.to_string()),
        );
        Self {
            min_blob_age: Duration::from_secs(min_age.unsigned_abs()),
            poll_interval: Duration::from_secs(poll.unsigned_abs()),
            dry_run: settings.dry_run.unwrap_or(false),
            layout,
        }
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self::from_settings(&GcSettings::default())
    }
}
