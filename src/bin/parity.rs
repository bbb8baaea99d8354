use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use qmatvec::config::{EngineConfig, Strategy};
use qmatvec::layout::{MatrixRef, OutputLayout, VectorBatch};
use qmatvec::ops::{mat_x_vec_batch, QuantParams, Rescale};
use qmatvec::quant::{QuantElem, QuantizedMultiplier, RescaleMode, Rounding};
use qmatvec::reference;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

#[derive(Parser, Debug, Clone)]
#[command(name = "qmatvec-parity", version, about = "Randomized parity sweep: tiled vs generic vs reference")]
struct Args {
    /// Number of random cases
    #[arg(long, default_value_t = 2000)]
    cases: u64,

    /// Base RNG seed
    #[arg(long, default_value_t = 20240601)]
    seed: u64,

    /// Worker threads
    #[arg(long, default_value_t = 1)]
    threads: usize,

    /// Largest row count to draw
    #[arg(long, default_value_t = 33)]
    max_rows: usize,

    /// Largest column count to draw
    #[arg(long, default_value_t = 67)]
    max_cols: usize,
}

fn gen_elems<T: QuantElem>(rng: &mut SmallRng, n: usize) -> Vec<T> {
    let center = ((T::MIN + T::MAX) / 2) as f64;
    let sigma = (T::MAX - T::MIN) as f64 / 6.0;
    let normal = Normal::new(center, sigma).expect("valid sigma");
    (0..n).map(|_| {
        let x = normal.sample(&mut *rng).round() as i64;
        T::narrow(x.clamp(T::MIN as i64, T::MAX as i64) as i32)
    }).collect()
}

fn draw_multiplier(rng: &mut SmallRng) -> QuantizedMultiplier {
    let scale = 2f64.powf(rng.gen_range(-24.0..0.0));
    QuantizedMultiplier::from_real(scale).unwrap_or(QuantizedMultiplier::new(0, 0))
}

fn check_case<M: QuantElem, V: QuantElem, O: QuantElem>(args: &Args, idx: u64) -> Option<String> {
    let mut rng = SmallRng::seed_from_u64(args.seed ^ idx.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    let rows = rng.gen_range(1..=args.max_rows);
    let cols = rng.gen_range(1..=args.max_cols);
    let count = rng.gen_range(1..=3usize);
    let row_stride = cols + rng.gen_range(0..=3);
    let vec_offset = cols + rng.gen_range(0..=2);

    let mat_data = gen_elems::<M>(&mut rng, rows * row_stride);
    let vec_data = gen_elems::<V>(&mut rng, count * vec_offset);
    let bias: Vec<i64> = (0..rows).map(|_| rng.gen_range(-(1i64 << 20)..(1i64 << 20))).collect();

    let per_channel: Vec<QuantizedMultiplier> = (0..rows).map(|_| draw_multiplier(&mut rng)).collect();
    let multipliers: Vec<i32> = per_channel.iter().map(|q| q.multiplier).collect();
    let shifts: Vec<i32> = per_channel.iter().map(|q| q.shift).collect();
    let rescale = if rng.gen_bool(0.5) {
        Rescale::PerChannel { multipliers: &multipliers, shifts: &shifts }
    } else {
        Rescale::PerTensor(draw_multiplier(&mut rng))
    };
    let q = QuantParams {
        mat_zero_point: rng.gen_range(M::ZP_MIN..=M::ZP_MAX),
        vec_zero_point: rng.gen_range(V::ZP_MIN..=V::ZP_MAX),
        out_zero_point: rng.gen_range(O::MIN..=O::MAX),
        rescale,
    };
    let (mode, rounding) = match rng.gen_range(0..3) {
        0 => (RescaleMode::SingleRounding, Rounding::HalfAwayFromZero),
        1 => (RescaleMode::SingleRounding, Rounding::HalfToEven),
        _ => (RescaleMode::DoubleRounding, Rounding::HalfAwayFromZero),
    };

    let mat = MatrixRef::new(&mat_data, rows, cols, row_stride);
    let vecs = VectorBatch::new(&vec_data, cols, count, vec_offset);
    let base = EngineConfig::default().with_rescale(mode, rounding);
    let expected: Vec<O> = reference::mat_x_vec_batch(&mat, &vecs, Some(bias.as_slice()), &q, &base);

    let configs = [
        EngineConfig { strategy: Strategy::Generic, ..base },
        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 8, ..base },
        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 2, ..base },
        EngineConfig { strategy: Strategy::Auto, ..base },
    ];
    for cfg in configs {
        let mut out = vec![O::default(); rows * count];
        if let Err(e) = mat_x_vec_batch(&mut out, OutputLayout::vector_major(rows), &mat, &vecs, Some(bias.as_slice()), &q, &cfg) {
            return Some(format!("case {}: {:?} rejected valid input: {}", idx, cfg, e));
        }
        if out != expected {
            return Some(format!(
                "case {}: {:?} {}x{} vecs={} differs from reference", idx, cfg, rows, cols, count
            ));
        }
    }
    None
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pb = ProgressBar::new(args.cases);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} cases ({eta})")?);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(args.threads.max(1)).build()?;
    let failures: Vec<String> = pool.install(|| {
        (0..args.cases).into_par_iter().filter_map(|i| {
            let r = match i % 5 {
                0 => check_case::<i8, i8, i8>(&args, i),
                1 => check_case::<i8, i8, i16>(&args, i),
                2 => check_case::<u8, u8, u8>(&args, i),
                3 => check_case::<i8, i16, i16>(&args, i),
                _ => check_case::<i16, i16, i16>(&args, i),
            };
            pb.inc(1);
            r
        }).collect()
    });
    pb.finish_and_clear();

    for f in failures.iter().take(20) { eprintln!("{}", f); }
    println!("cases={} failures={}", args.cases, failures.len());
    if !failures.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
