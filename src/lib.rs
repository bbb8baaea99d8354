//! Quantized integer matXvec / matmul engine with bit-exact requantization.
pub mod case;
pub mod config;
pub mod error;
pub mod kernels;
pub mod layout;
pub mod ops;
pub mod precision;
pub mod quant;
pub mod reference;

pub use config::{EngineConfig, Strategy};
pub use error::{status_of, KernelError, KernelResult, Status};
pub use layout::{MatrixRef, OutputLayout, VectorBatch};
pub use ops::{mat_x_vec, mat_x_vec_batch, mat_x_vec_dual, mat_x_vec_raw, matmul, requantize_accumulators, QuantParams, Rescale};
pub use quant::{QuantizedMultiplier, RescaleMode, Rounding, ShiftSpec};
