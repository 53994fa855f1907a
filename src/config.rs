//! Session configuration.
//!
//! Values come from three places, later ones winning: built-in defaults, an optional
//! JSON file, and command-line overrides. Both the file and the command line are read
//! into [`ConfigOverrides`], merged, then applied on top of [`SessionConfig::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::kfold::{DEFAULT_FOLD_COUNT, DEFAULT_KFOLD_ARTIFACT};
use crate::resilient::DEFAULT_RESILIENT_ARTIFACT;
use crate::topology::{self, DEFAULT_HIDDEN_DIVISOR, NetworkConfig};
use crate::{Error, Result};

/// Feature vector length produced by the text feature extractor.
pub const DEFAULT_INPUT_SIZE: usize = 510;
/// Number of supported languages.
pub const DEFAULT_OUTPUTS: usize = 235;
pub const DEFAULT_EPOCHS: usize = 50;
pub const DEFAULT_ERROR_RATE: f32 = 0.0023;
pub const DEFAULT_STALL_CYCLES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub input_size: usize,
    pub outputs: usize,
    pub hidden_divisor: usize,
    pub epochs: usize,
    pub error_rate: f32,
    pub fold_count: usize,
    pub stall_cycles: usize,
    pub seed: Option<u64>,
    pub kfold_artifact: PathBuf,
    pub resilient_artifact: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            outputs: DEFAULT_OUTPUTS,
            hidden_divisor: DEFAULT_HIDDEN_DIVISOR,
            epochs: DEFAULT_EPOCHS,
            error_rate: DEFAULT_ERROR_RATE,
            fold_count: DEFAULT_FOLD_COUNT,
            stall_cycles: DEFAULT_STALL_CYCLES,
            seed: None,
            kfold_artifact: PathBuf::from(DEFAULT_KFOLD_ARTIFACT),
            resilient_artifact: PathBuf::from(DEFAULT_RESILIENT_ARTIFACT),
        }
    }
}

/// Partial configuration. Also defines the config file format (every field may be omitted).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    pub input_size: Option<usize>,
    pub outputs: Option<usize>,
    pub hidden_divisor: Option<usize>,
    pub epochs: Option<usize>,
    pub error_rate: Option<f32>,
    pub fold_count: Option<usize>,
    pub stall_cycles: Option<usize>,
    pub seed: Option<u64>,
    pub kfold_artifact: Option<PathBuf>,
    pub resilient_artifact: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Read overrides from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let text = std::fs::read_to_string(p)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", p.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::InvalidConfig(format!("{}: {e}", p.display())))
    }

    /// Merge two override sets; values in `other` win.
    pub fn merge(self, other: Self) -> Self {
        Self {
            input_size: other.input_size.or(self.input_size),
            outputs: other.outputs.or(self.outputs),
            hidden_divisor: other.hidden_divisor.or(self.hidden_divisor),
            epochs: other.epochs.or(self.epochs),
            error_rate: other.error_rate.or(self.error_rate),
            fold_count: other.fold_count.or(self.fold_count),
            stall_cycles: other.stall_cycles.or(self.stall_cycles),
            seed: other.seed.or(self.seed),
            kfold_artifact: other.kfold_artifact.or(self.kfold_artifact),
            resilient_artifact: other.resilient_artifact.or(self.resilient_artifact),
        }
    }
}

impl SessionConfig {
    /// Defaults with `overrides` applied, then validated.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let d = Self::default();
        let cfg = Self {
            input_size: overrides.input_size.unwrap_or(d.input_size),
            outputs: overrides.outputs.unwrap_or(d.outputs),
            hidden_divisor: overrides.hidden_divisor.unwrap_or(d.hidden_divisor),
            epochs: overrides.epochs.unwrap_or(d.epochs),
            error_rate: overrides.error_rate.unwrap_or(d.error_rate),
            fold_count: overrides.fold_count.unwrap_or(d.fold_count),
            stall_cycles: overrides.stall_cycles.unwrap_or(d.stall_cycles),
            seed: overrides.seed.or(d.seed),
            kfold_artifact: overrides.kfold_artifact.unwrap_or(d.kfold_artifact),
            resilient_artifact: overrides.resilient_artifact.unwrap_or(d.resilient_artifact),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("input_size", self.input_size),
            ("outputs", self.outputs),
            ("hidden_divisor", self.hidden_divisor),
            ("epochs", self.epochs),
            ("stall_cycles", self.stall_cycles),
        ] {
            if v == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        if self.fold_count < 2 {
            return Err(Error::InvalidConfig(format!(
                "fold_count must be >= 2, got {}",
                self.fold_count
            )));
        }
        if !(self.error_rate.is_finite() && self.error_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "error_rate must be finite and > 0, got {}",
                self.error_rate
            )));
        }
        Ok(())
    }

    pub fn hidden_width(&self) -> Result<usize> {
        topology::hidden_width(self.input_size, self.hidden_divisor)
    }

    /// Network configuration for this session (default activation set).
    pub fn network(&self) -> Result<NetworkConfig> {
        let mut net = NetworkConfig::new(self.input_size, self.outputs, self.hidden_width()?);
        if let Some(seed) = self.seed {
            net = net.with_seed(seed);
        }
        Ok(net)
    }
}
