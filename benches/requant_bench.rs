use criterion::{criterion_group, criterion_main, Criterion, black_box};
use qmatvec::config::EngineConfig;
use qmatvec::ops::{requantize_accumulators, Rescale};
use qmatvec::quant::{QuantizedMultiplier, RescaleMode, Rounding};

fn bench_requantize(c: &mut Criterion) {
    let mut seed = 20240601u64;
    let acc: Vec<i64> = (0..4096).map(|_| {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((seed >> 40) as i64) - (1 << 23)
    }).collect();
    let q = QuantizedMultiplier::from_real(0.0037).unwrap();
    let mut out = vec![0i8; acc.len()];

    for (name, mode, rounding) in [
        ("requant_single_away", RescaleMode::SingleRounding, Rounding::HalfAwayFromZero),
        ("requant_single_even", RescaleMode::SingleRounding, Rounding::HalfToEven),
        ("requant_double_away", RescaleMode::DoubleRounding, Rounding::HalfAwayFromZero),
    ] {
        let cfg = EngineConfig::default().with_rescale(mode, rounding);
        c.bench_function(name, |ben| {
            ben.iter(|| {
                requantize_accumulators(&mut out, black_box(&acc), 64, Rescale::PerTensor(q), 0, &cfg).unwrap();
                black_box(out[0])
            })
        });
    }
}

criterion_group!(benches, bench_requantize);
criterion_main!(benches);
