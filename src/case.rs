use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::Status;
use crate::layout::OutputLayout;
use crate::ops::flat::{matxvec, matxvec_per_channel, FlatShape};
use crate::precision::Precision;
use crate::quant::{ElemKind, QuantElem, QuantizedMultiplier, ShiftSpec};

/// Precision given either by family name (`"8x8_8"`) or as explicit element kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrecisionSpec {
    Named(String),
    Explicit(Precision),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRescale {
    PerTensor { multiplier: i32, shift: ShiftSpec },
    PerChannel { multipliers: Vec<i32>, shifts: Vec<i32> },
    /// Real-valued scale converted with [`QuantizedMultiplier::from_real`].
    Real { scale: f64 },
}

fn one() -> i32 { 1 }

/// One engine call described as JSON. Element data is carried as plain integers and
/// range-checked against the selected precision when the case runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub precision: PrecisionSpec,
    pub rows: i32,
    pub cols: i32,
    #[serde(default)]
    pub row_stride: Option<i32>,
    #[serde(default = "one")]
    pub vec_count: i32,
    #[serde(default)]
    pub vec_offset: Option<i32>,
    #[serde(default)]
    pub out_offset: Option<i32>,
    #[serde(default = "one")]
    pub out_stride: i32,
    pub mat: Vec<i32>,
    pub vec: Vec<i32>,
    #[serde(default)]
    pub bias: Option<Vec<i64>>,
    #[serde(default)]
    pub mat_zero_point: i32,
    #[serde(default)]
    pub vec_zero_point: i32,
    #[serde(default)]
    pub out_zero_point: i32,
    pub rescale: CaseRescale,
    #[serde(default)]
    pub config: Option<EngineConfig>,
    /// Optional expected output, compared by [`CaseOutcome::matches`].
    #[serde(default)]
    pub expected: Option<Vec<i32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub status: i32,
    pub output: Vec<i32>,
}

impl CaseOutcome {
    fn failed(status: Status) -> Self { Self { status: status.code(), output: Vec::new() } }

    pub fn matches(&self, expected: &[i32]) -> bool { self.status == Status::Ok.code() && self.output == expected }
}

impl Case {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(&path).with_context(|| format!("open case file: {}", path.as_ref().display()))?;
        serde_json::from_reader(BufReader::new(f)).with_context(|| format!("parse case file: {}", path.as_ref().display()))
    }

    pub fn from_json(s: &str) -> Result<Self> { serde_json::from_str(s).context("parse case json") }

    pub fn shape(&self) -> FlatShape {
        FlatShape {
            rows: self.rows,
            cols: self.cols,
            row_stride: self.row_stride.unwrap_or(self.cols),
            vec_count: self.vec_count,
            vec_offset: self.vec_offset.unwrap_or(self.cols),
            out_offset: self.out_offset.unwrap_or(self.rows),
            out_stride: self.out_stride,
        }
    }

    /// Run with `cfg`, or the case's own config, or the probed default.
    pub fn run(&self, cfg: Option<&EngineConfig>) -> Result<CaseOutcome> {
        let cfg = cfg.copied().or(self.config).unwrap_or_else(EngineConfig::detect);
        let prec = match &self.precision {
            PrecisionSpec::Named(name) => match Precision::by_name(name) {
                Some(p) => p,
                None => {
                    info!("discarding case: unknown precision family {:?}", name);
                    return Ok(CaseOutcome::failed(Status::NotImplemented));
                }
            },
            PrecisionSpec::Explicit(p) => *p,
        };
        debug!("running case {} ({}x{}, {} vectors)", prec, self.rows, self.cols, self.vec_count);
        use ElemKind::*;
        match (prec.mat, prec.vec, prec.out) {
            (I8, I8, I8) => self.run_typed::<i8, i8, i8>(&cfg),
            (I8, I8, I16) => self.run_typed::<i8, i8, i16>(&cfg),
            (U8, U8, U8) => self.run_typed::<u8, u8, u8>(&cfg),
            (I8, I16, I16) => self.run_typed::<i8, i16, i16>(&cfg),
            (I16, I16, I16) => self.run_typed::<i16, i16, i16>(&cfg),
            _ => {
                info!("discarding case: precision {} is not shipped", prec);
                Ok(CaseOutcome::failed(Status::NotImplemented))
            }
        }
    }

    fn run_typed<M: QuantElem, V: QuantElem, O: QuantElem>(&self, cfg: &EngineConfig) -> Result<CaseOutcome> {
        let mat: Vec<M> = narrow_all("mat", &self.mat)?;
        let vec: Vec<V> = narrow_all("vec", &self.vec)?;
        let shape = self.shape();
        let out_len = if shape.rows > 0 && shape.vec_count > 0 && shape.out_offset > 0 && shape.out_stride > 0 {
            OutputLayout::new(shape.out_offset as usize, shape.out_stride as usize)
                .required_len(shape.rows as usize, shape.vec_count as usize)
                .unwrap_or(0)
        } else {
            0
        };
        let mut out = vec![O::default(); out_len];
        let bias = self.bias.as_deref();

        let status = match &self.rescale {
            CaseRescale::PerTensor { multiplier, shift } => match shift.to_signed() {
                Ok(s) => matxvec(&mut out, &mat, &vec, bias, &shape, self.mat_zero_point, self.vec_zero_point, *multiplier, s, self.out_zero_point, cfg),
                Err(e) => e.status().code(),
            },
            CaseRescale::PerChannel { multipliers, shifts } => {
                matxvec_per_channel(&mut out, &mat, &vec, bias, &shape, self.mat_zero_point, self.vec_zero_point, multipliers, shifts, self.out_zero_point, cfg)
            }
            CaseRescale::Real { scale } => match QuantizedMultiplier::from_real(*scale) {
                Ok(q) => matxvec(&mut out, &mat, &vec, bias, &shape, self.mat_zero_point, self.vec_zero_point, q.multiplier, q.shift, self.out_zero_point, cfg),
                Err(e) => e.status().code(),
            },
        };
        if status != Status::Ok.code() {
            return Ok(CaseOutcome { status, output: Vec::new() });
        }
        Ok(CaseOutcome { status, output: out.iter().map(|o| o.widen()).collect() })
    }
}

fn narrow_all<T: QuantElem>(what: &str, data: &[i32]) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(data.len());
    for (i, &v) in data.iter().enumerate() {
        if v < T::MIN || v > T::MAX {
            bail!("{}[{}] = {} does not fit {}", what, i, v, T::KIND);
        }
        out.push(T::narrow(v));
    }
    Ok(out)
}
