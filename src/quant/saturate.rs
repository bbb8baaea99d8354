use super::QuantElem;

/// Add the output zero-point and clamp into `O`'s range. Never wraps.
#[inline(always)]
pub fn saturate<O: QuantElem>(v: i32, out_zero_point: i32) -> O {
    let shifted = v as i64 + out_zero_point as i64;
    O::narrow(shifted.clamp(O::MIN as i64, O::MAX as i64) as i32)
}
