//! Quantized element types and the requantization pipeline.
pub mod multiplier;
pub mod saturate;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use multiplier::{QuantizedMultiplier, RescaleMode, Rounding, ShiftSpec};
pub use saturate::saturate;

/// Storage type tag, used where precision is chosen at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElemKind {
    I8,
    U8,
    I16,
}

impl fmt::Display for ElemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self { ElemKind::I8 => "i8", ElemKind::U8 => "u8", ElemKind::I16 => "i16" };
        f.write_str(s)
    }
}

/// An 8- or 16-bit quantized storage element.
///
/// `ZP_MIN..=ZP_MAX` bounds the operand zero-point. Zero-points here are offsets that are
/// *added* to the stored value before multiplication, so for i8 data whose real zero is
/// stored as `z` the offset is `-z`, which needs one extra bit: `[-127, 128]`.
pub trait QuantElem: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const KIND: ElemKind;
    const MIN: i32;
    const MAX: i32;
    const ZP_MIN: i32;
    const ZP_MAX: i32;

    fn widen(self) -> i32;

    /// Caller guarantees `v` is already inside `MIN..=MAX`.
    fn narrow(v: i32) -> Self;
}

impl QuantElem for i8 {
    const KIND: ElemKind = ElemKind::I8;
    const MIN: i32 = i8::MIN as i32;
    const MAX: i32 = i8::MAX as i32;
    const ZP_MIN: i32 = -127;
    const ZP_MAX: i32 = 128;
    #[inline(always)]
    fn widen(self) -> i32 { self as i32 }
    #[inline(always)]
    fn narrow(v: i32) -> Self { v as i8 }
}

impl QuantElem for u8 {
    const KIND: ElemKind = ElemKind::U8;
    const MIN: i32 = 0;
    const MAX: i32 = u8::MAX as i32;
    const ZP_MIN: i32 = -255;
    const ZP_MAX: i32 = 0;
    #[inline(always)]
    fn widen(self) -> i32 { self as i32 }
    #[inline(always)]
    fn narrow(v: i32) -> Self { v as u8 }
}

impl QuantElem for i16 {
    const KIND: ElemKind = ElemKind::I16;
    const MIN: i32 = i16::MIN as i32;
    const MAX: i32 = i16::MAX as i32;
    const ZP_MIN: i32 = -32767;
    const ZP_MAX: i32 = 32768;
    #[inline(always)]
    fn widen(self) -> i32 { self as i32 }
    #[inline(always)]
    fn narrow(v: i32) -> Self { v as i16 }
}
