//! Node settings shared by every subcommand.
//!
//! Settings come from an optional TOML file, overridden by environment
//! variables prefixed with `CCN__` (nested keys separated by `__`, e.g.
//! `CCN__AQM__MIN_THRESHOLD=8`).

use anyhow::{anyhow, Context, Result};
use rust_ccn_forwarder::{AqmConfig, LinkConfig, DEFAULT_OVERHEAD_BYTES, PHYSICAL_BANDWIDTH_BPS};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Marking parameters of router link queues
    pub aqm: AqmConfig,

    /// Bandwidth of the real interface under the emulated links
    pub physical_bandwidth_bps: u64,

    /// Framing bytes added to each packet when timing a send
    pub overhead_bytes: usize,

    /// Directory for per-link queue logs; no logs when unset
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            aqm: AqmConfig::default(),
            physical_bandwidth_bps: PHYSICAL_BANDWIDTH_BPS,
            overhead_bytes: DEFAULT_OVERHEAD_BYTES,
            diagnostics_dir: None,
        }
    }
}

impl NodeSettings {
    /// Load settings from `file` (if given) and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("CCN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read node settings")?
            .try_deserialize::<NodeSettings>()
            .context("Invalid node settings")?;
        Ok(settings)
    }

    /// Link toward `peer` with these settings applied.
    pub fn link(&self, name: &str, peer: SocketAddr, bandwidth_kbps: u64, delay_ms: u64) -> Result<LinkConfig> {
        let bandwidth_bps = bandwidth_kbps
            .checked_mul(1000)
            .ok_or_else(|| anyhow!("Bandwidth of link {} too large: {} kbps", name, bandwidth_kbps))?;
        let mut link =
            LinkConfig::new(name, peer, bandwidth_bps).with_delay(Duration::from_millis(delay_ms));
        link.physical_bandwidth_bps = self.physical_bandwidth_bps;
        link.overhead_bytes = self.overhead_bytes;
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = NodeSettings::default();
        assert_eq!(settings.aqm.seed, 68413);
        assert_eq!(settings.physical_bandwidth_bps, 1_000_000_000);
        assert_eq!(settings.overhead_bytes, 36);
        assert!(settings.diagnostics_dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "overhead_bytes = 40\ndiagnostics_dir = \"/tmp/ccn\"\n\n[aqm]\nmin_threshold = 8.0\nseed = 7"
        )
        .unwrap();

        let settings = NodeSettings::load(Some(file.path())).unwrap();
        assert_eq!(settings.overhead_bytes, 40);
        assert_eq!(settings.diagnostics_dir, Some(PathBuf::from("/tmp/ccn")));
        assert_eq!(settings.aqm.min_threshold, 8.0);
        assert_eq!(settings.aqm.seed, 7);
        assert_eq!(settings.aqm.max_probability, 0.1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NodeSettings::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_link_applies_settings() {
        let settings = NodeSettings {
            overhead_bytes: 0,
            ..NodeSettings::default()
        };
        let link = settings.link("r-s", "127.0.0.1:9000".parse().unwrap(), 2000, 5).unwrap();
        assert_eq!(link.bandwidth_bps, 2_000_000);
        assert_eq!(link.delay, Duration::from_millis(5));
        assert_eq!(link.overhead_bytes, 0);
    }

    #[test]
    fn test_link_rejects_overflowing_bandwidth() {
        let settings = NodeSettings::default();
        let err = settings
            .link("r-s", "127.0.0.1:9000".parse().unwrap(), u64::MAX, 0)
            .unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
