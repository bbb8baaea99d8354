pub mod dispatch;
pub mod dot;
pub mod fold;

pub use dispatch::{run, select_path, Operand, Path};
pub use fold::{fold_bias, folded_bias_scratch_bytes};
