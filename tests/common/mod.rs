#![allow(dead_code)]
use qmatvec::quant::QuantElem;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub fn rng(seed: u64) -> SmallRng { SmallRng::seed_from_u64(seed) }

/// Uniform values over the whole storage range of `T`.
pub fn random_elems<T: QuantElem>(rng: &mut SmallRng, n: usize) -> Vec<T> {
    (0..n).map(|_| T::narrow(rng.gen_range(T::MIN..=T::MAX))).collect()
}

pub fn random_bias(rng: &mut SmallRng, n: usize, mag: i64) -> Vec<i64> {
    (0..n).map(|_| rng.gen_range(-mag..=mag)).collect()
}
