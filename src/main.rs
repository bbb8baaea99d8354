use anyhow::Result;
use clap::Parser;
use qmatvec::case::Case;
use qmatvec::config::{EngineConfig, Strategy};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a quantized matXvec case file and print the result as JSON", long_about = None)]
struct Args {
    /// Case file (JSON)
    case: PathBuf,

    /// Engine config file (JSON); overrides the config embedded in the case
    #[arg(long)]
    config: Option<PathBuf>,

    /// Force a dispatch strategy: auto, tiled or generic
    #[arg(long)]
    strategy: Option<String>,

    /// Run this many times and report the mean time per call
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn parse_strategy(s: &str) -> Result<Strategy> {
    match s.to_lowercase().as_str() {
        "auto" => Ok(Strategy::Auto),
        "tiled" => Ok(Strategy::Tiled),
        "generic" => Ok(Strategy::Generic),
        _ => anyhow::bail!("Invalid strategy: use 'auto', 'tiled' or 'generic'"),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let case = Case::load(&args.case)?;
    let mut cfg = match &args.config {
        Some(p) => EngineConfig::from_json_file(p)?,
        None => case.config.unwrap_or_else(EngineConfig::detect),
    };
    if let Some(s) = args.strategy.as_deref() {
        cfg.strategy = parse_strategy(s)?;
    }

    let t0 = Instant::now();
    let mut outcome = case.run(Some(&cfg))?;
    for _ in 1..args.repeat.max(1) {
        outcome = case.run(Some(&cfg))?;
    }
    let dt = t0.elapsed();

    let matched = case.expected.as_deref().map(|e| outcome.matches(e));
    let report = serde_json::json!({
        "status": outcome.status,
        "output": outcome.output,
        "matches_expected": matched,
        "mean_us": dt.as_secs_f64() * 1e6 / args.repeat.max(1) as f64,
    });
    if args.pretty {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", serde_json::to_string(&report)?);
    }

    if outcome.status != 0 || matched == Some(false) {
        std::process::exit(1);
    }
    Ok(())
}
