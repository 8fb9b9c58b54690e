use std::env;
use std::process::ExitCode;

use mccycle::math::monte_carlo::{IntegrationSession, SessionConfig, DEFAULT_CYCLE_SAMPLES};
use mccycle::Error;

const USAGE: &str = "usage: cycle_calculation [samples-per-cycle] [cycles] [seed]";

fn parse_arg<T: std::str::FromStr>(arg: Option<String>, name: &str) -> Result<Option<T>, String> {
    arg.map(|raw| raw.parse().map_err(|_| format!("invalid {name}: {raw}")))
        .transpose()
}

fn parse_samples(arg: Option<String>) -> Result<u64, String> {
    let samples = parse_arg(arg, "samples-per-cycle")?.unwrap_or(DEFAULT_CYCLE_SAMPLES);
    if samples == 0 {
        return Err(Error::InvalidSampleCount(samples).to_string());
    }
    Ok(samples)
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let samples = parse_samples(args.next())?;
    let cycles: u32 = parse_arg(args.next(), "cycles")?.unwrap_or(10);
    let seed: Option<u64> = parse_arg(args.next(), "seed")?;

    let mut config = SessionConfig::default().with_default_cycle_samples(samples);
    config.seed = seed;
    let session = IntegrationSession::new(config).map_err(|e| e.to_string())?;

    println!("{:>12} {:>20} {:>12}", "total", "integral", "log10 error");
    for _ in 0..cycles {
        let report = session.run_default_cycle().map_err(|e| e.to_string())?;
        println!(
            "{:>12} {:>20.15} {:>12.4}",
            report.total_guesses, report.estimate, report.log_error
        );
    }
    if let Some(slope) = session.convergence_slope() {
        println!("fitted slope of log error vs log n: {slope:.3}");
    }
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            ExitCode::from(2)
        }
    }
}
