use crate::error::{KernelError, KernelResult};
use serde::{Deserialize, Serialize};

/// Tie-breaking rule for every rounding step of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    #[default]
    HalfAwayFromZero,
    HalfToEven,
}

/// How the multiply and the shift are combined.
///
/// `SingleRounding` forms the exact product and rounds once. `DoubleRounding` is the split
/// pipeline: left shift, rounding doubling-high-multiply, then a rounding right shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescaleMode {
    #[default]
    SingleRounding,
    DoubleRounding,
}

/// External shift encodings. Both convert to the single signed shift used internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftSpec {
    /// Separate left and right shift fields, at most one of them nonzero.
    Split { left: u32, right: u32 },
    /// Positive shifts left, negative shifts right.
    Signed(i32),
}

impl ShiftSpec {
    pub fn to_signed(self) -> KernelResult<i32> {
        match self {
            ShiftSpec::Signed(s) => Ok(s),
            ShiftSpec::Split { left, right } => {
                if left != 0 && right != 0 {
                    return Err(KernelError::quant(format!("split shift has both left={} and right={}", left, right)));
                }
                let max = QuantizedMultiplier::MAX_SHIFT as u32;
                if left > max || right > max {
                    return Err(KernelError::quant(format!("split shift out of range: left={} right={}", left, right)));
                }
                Ok(left as i32 - right as i32)
            }
        }
    }
}

/// Fixed-point rescale factor `multiplier / 2^31 * 2^shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedMultiplier {
    pub multiplier: i32,
    pub shift: i32,
}

impl Default for QuantizedMultiplier {
    fn default() -> Self { Self::IDENTITY }
}

impl QuantizedMultiplier {
    pub const MAX_SHIFT: i32 = 31;

    /// Exactly 1.0: `2^30 / 2^31 * 2^1`.
    pub const IDENTITY: Self = Self { multiplier: 1 << 30, shift: 1 };

    pub const fn new(multiplier: i32, shift: i32) -> Self { Self { multiplier, shift } }

    pub fn from_spec(multiplier: i32, spec: ShiftSpec) -> KernelResult<Self> {
        let q = Self { multiplier, shift: spec.to_signed()? };
        q.validate()?;
        Ok(q)
    }

    pub fn validate(&self) -> KernelResult<()> {
        if self.multiplier < 0 {
            return Err(KernelError::quant(format!("negative multiplier {}", self.multiplier)));
        }
        if self.shift.abs() > Self::MAX_SHIFT {
            return Err(KernelError::quant(format!("shift {} outside [-{m}, {m}]", self.shift, m = Self::MAX_SHIFT)));
        }
        Ok(())
    }

    /// `(left, right)` fields of the split encoding.
    pub fn split(&self) -> (u32, u32) {
        if self.shift > 0 { (self.shift as u32, 0) } else { (0, self.shift.unsigned_abs()) }
    }

    /// Nearest representable multiplier for a non-negative real scale.
    pub fn from_real(scale: f64) -> KernelResult<Self> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(KernelError::quant(format!("scale {} is not a finite non-negative number", scale)));
        }
        if scale == 0.0 { return Ok(Self { multiplier: 0, shift: 0 }); }
        // Normalise into [0.5, 1)
        let mut q = scale;
        let mut exp = 0i32;
        while q >= 1.0 { q /= 2.0; exp += 1; }
        while q < 0.5 { q *= 2.0; exp -= 1; }
        let mut m = (q * (1u64 << 31) as f64).round() as i64;
        if m == 1i64 << 31 { m /= 2; exp += 1; }
        if exp < -Self::MAX_SHIFT { return Ok(Self { multiplier: 0, shift: 0 }); }
        if exp > Self::MAX_SHIFT {
            return Err(KernelError::quant(format!("scale {} needs shift {} > {}", scale, exp, Self::MAX_SHIFT)));
        }
        Ok(Self { multiplier: m as i32, shift: exp })
    }

    pub fn to_real(&self) -> f64 {
        self.multiplier as f64 / (1u64 << 31) as f64 * 2f64.powi(self.shift)
    }

    /// Rescale a wide accumulator into the 32-bit intermediate range.
    #[inline]
    pub fn apply(&self, x: i64, mode: RescaleMode, rounding: Rounding) -> i32 {
        if self.multiplier == 0 { return 0; }
        match mode {
            RescaleMode::SingleRounding => {
                let total = (31 - self.shift) as u32;
                let prod = x as i128 * self.multiplier as i128;
                clamp_i32(round_shift_right(prod, total, rounding))
            }
            RescaleMode::DoubleRounding => {
                let (left, right) = self.split();
                let shifted = (x as i128) << left;
                let high = clamp_i32(round_shift_right(shifted * self.multiplier as i128, 31, rounding));
                clamp_i32(round_shift_right(high as i128, right, rounding))
            }
        }
    }
}

/// `v / 2^n` rounded to nearest, ties broken by `rounding`.
#[inline]
pub fn round_shift_right(v: i128, n: u32, rounding: Rounding) -> i128 {
    if n == 0 { return v; }
    let half = 1i128 << (n - 1);
    match rounding {
        Rounding::HalfAwayFromZero => {
            if v >= 0 { (v + half) >> n } else { -((-v + half) >> n) }
        }
        Rounding::HalfToEven => {
            let q = v >> n;
            let r = v - (q << n);
            if r > half || (r == half && q & 1 == 1) { q + 1 } else { q }
        }
    }
}

#[inline]
fn clamp_i32(v: i128) -> i32 {
    v.clamp(i32::MIN as i128, i32::MAX as i128) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_shift_ties() {
        // 5/2 = 2.5, -5/2 = -2.5, 7/2 = 3.5
        assert_eq!(round_shift_right(5, 1, Rounding::HalfAwayFromZero), 3);
        assert_eq!(round_shift_right(-5, 1, Rounding::HalfAwayFromZero), -3);
        assert_eq!(round_shift_right(5, 1, Rounding::HalfToEven), 2);
        assert_eq!(round_shift_right(-5, 1, Rounding::HalfToEven), -2);
        assert_eq!(round_shift_right(7, 1, Rounding::HalfToEven), 4);
        assert_eq!(round_shift_right(-7, 1, Rounding::HalfToEven), -4);
        // non-ties agree
        assert_eq!(round_shift_right(-11, 2, Rounding::HalfToEven), -3);
        assert_eq!(round_shift_right(-11, 2, Rounding::HalfAwayFromZero), -3);
    }

    #[test]
    fn split_and_signed_agree() {
        assert_eq!(ShiftSpec::Split { left: 3, right: 0 }.to_signed(), Ok(3));
        assert_eq!(ShiftSpec::Split { left: 0, right: 7 }.to_signed(), Ok(-7));
        assert!(ShiftSpec::Split { left: 1, right: 1 }.to_signed().is_err());
        assert!(ShiftSpec::Split { left: 32, right: 0 }.to_signed().is_err());
        let q = QuantizedMultiplier::new(1 << 30, -4);
        assert_eq!(q.split(), (0, 4));
    }

    #[test]
    fn from_real_identity_and_halves() {
        assert_eq!(QuantizedMultiplier::from_real(1.0).unwrap(), QuantizedMultiplier::IDENTITY);
        assert_eq!(QuantizedMultiplier::from_real(0.5).unwrap(), QuantizedMultiplier::new(1 << 30, 0));
        assert_eq!(QuantizedMultiplier::from_real(0.0).unwrap(), QuantizedMultiplier::new(0, 0));
        assert!(QuantizedMultiplier::from_real(-1.0).is_err());
        assert!(QuantizedMultiplier::from_real(f64::NAN).is_err());
        let q = QuantizedMultiplier::from_real(0.0123).unwrap();
        assert!((q.to_real() - 0.0123).abs() < 1e-9);
    }
}
