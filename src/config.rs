use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::layout::LayoutOptions;

pub const DEFAULT_WORKERS: usize = 2;

/// Construction-time settings for a [`Packer`](crate::Packer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackerConfig {
    /// Worker threads to spawn. Zero packs on the caller's thread.
    pub workers: usize,
    pub options: LayoutOptions,
}

impl Default for PackerConfig {
    fn default() -> Self {
        PackerConfig {
            workers: DEFAULT_WORKERS,
            options: LayoutOptions::default(),
        }
    }
}

impl PackerConfig {
    /// Defaults overridden by `GRIDPACK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PackerConfig::default();

        if let Some(raw) = lookup("GRIDPACK_WORKERS") {
            config.workers = raw
                .trim()
                .parse()
                .with_context(|| format!("GRIDPACK_WORKERS must be a worker count, got {raw:?}"))?;
        }

        let options = &mut config.options;
        for (key, field) in [
            ("GRIDPACK_FILL_GAPS", &mut options.fill_gaps),
            ("GRIDPACK_HORIZONTAL", &mut options.horizontal),
            ("GRIDPACK_ALIGN_RIGHT", &mut options.align_right),
            ("GRIDPACK_ALIGN_BOTTOM", &mut options.align_bottom),
            ("GRIDPACK_ROUNDING", &mut options.rounding),
        ] {
            if let Some(raw) = lookup(key) {
                *field = parse_flag(&raw).with_context(|| format!("invalid value for {key}"))?;
            }
        }

        tracing::debug!("Packer config: {:?}", config);
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("failed to parse packer config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}
