use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{KernelError, KernelResult};
use crate::quant::{RescaleMode, Rounding};

/// Dispatcher family selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Tiled when alignment and divisibility allow, generic otherwise.
    #[default]
    Auto,
    /// Tiled regardless of alignment; the tiled kernels stay exact on any slice.
    Tiled,
    /// Always one row and one vector at a time.
    Generic,
}

/// Per-call engine configuration. Decided once (usually at startup) and passed to every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rescale: RescaleMode,
    pub rounding: Rounding,
    pub strategy: Strategy,
    /// Largest row tile the dispatcher may use: 1, 2, 4 or 8.
    pub max_row_tile: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { rescale: RescaleMode::default(), rounding: Rounding::default(), strategy: Strategy::Auto, max_row_tile: 4 }
    }
}

impl EngineConfig {
    /// Defaults with the row-tile cap chosen from the probed CPU.
    pub fn detect() -> Self {
        let caps = CpuCapabilities::probe();
        let cfg = Self { max_row_tile: caps.preferred_row_tile(), ..Self::default() };
        debug!("engine config from {:?}: {:?}", caps, cfg);
        cfg
    }

    pub fn generic() -> Self { Self { strategy: Strategy::Generic, ..Self::default() } }

    pub fn with_rescale(mut self, rescale: RescaleMode, rounding: Rounding) -> Self {
        self.rescale = rescale;
        self.rounding = rounding;
        self
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(&path).with_context(|| format!("open engine config: {}", path.as_ref().display()))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).context("parse engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if !matches!(self.max_row_tile, 1 | 2 | 4 | 8) {
            return Err(KernelError::NotImplemented(format!("row tile {}", self.max_row_tile)));
        }
        if self.rescale == RescaleMode::DoubleRounding && self.rounding == Rounding::HalfToEven {
            return Err(KernelError::NotImplemented("double rounding with half-to-even ties".into()));
        }
        Ok(())
    }
}

/// SIMD capabilities of the running CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCapabilities {
    pub has_avx2: bool,
    pub has_avx512: bool,
    pub has_neon: bool,
}

impl CpuCapabilities {
    pub fn probe() -> Self {
        #[cfg(target_arch = "x86_64")]
        let (has_avx2, has_avx512, has_neon) =
            (is_x86_feature_detected!("avx2"), is_x86_feature_detected!("avx512f"), false);

        #[cfg(target_arch = "aarch64")]
        let (has_avx2, has_avx512, has_neon) = (false, false, true);

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        let (has_avx2, has_avx512, has_neon) = (false, false, false);

        Self { has_avx2, has_avx512, has_neon }
    }

    /// Wide register files keep eight row accumulators live without spilling.
    pub fn preferred_row_tile(&self) -> usize {
        if self.has_avx2 || self.has_avx512 || self.has_neon { 8 } else { 4 }
    }
}
