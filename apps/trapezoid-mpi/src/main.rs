//! Distributed Trapezoid Integration
//!
//! Estimates ∫ f(x) dx over `[left, right]` with the composite trapezoid
//! rule, splitting the trapezoids across a process group.
//!
//! ```text
//! [left ─────────────────────────────────────────────── right]
//!   │  Rank 0: [0, n/4)  │  Rank 1  │  Rank 2  │  Rank 3 (+rest)  │
//!   h = (right - left) / n, shared by every rank
//! ```
//!
//! # Usage
//!
//! ```bash
//! ./trapezoid-mpi --left 0 --right 1 -n 4
//! ./trapezoid-mpi --left 0 --right 3.14159 --integrand sine --samples 4096
//! mpirun -np 4 ./trapezoid-mpi --runtime mpi
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use partition_reduce::cli::GroupArgs;
use partition_reduce::kernel::{Integrand, IntervalParams, Trapezoid, DEFAULT_SAMPLES};
use partition_reduce::launch;
use partition_reduce::logging::init_logging;
use partition_reduce::process::Report;
use partition_reduce::prompt::prompt_stdin;

/// Distributed numerical integration by the trapezoid rule
#[derive(Parser, Debug)]
#[command(name = "trapezoid-mpi")]
#[command(about = "Integrate a function across a process group", long_about = None)]
struct Args {
    /// Starting point of integration (prompted if omitted)
    #[arg(short = 'a', long, allow_negative_numbers = true)]
    left: Option<f64>,

    /// Ending point of integration (prompted if omitted)
    #[arg(short = 'b', long, allow_negative_numbers = true)]
    right: Option<f64>,

    /// Number of trapezoids
    #[arg(short, long, default_value_t = DEFAULT_SAMPLES)]
    samples: u64,

    /// Function to integrate
    #[arg(short, long, value_enum, default_value_t = Integrand::Square)]
    integrand: Integrand,

    #[command(flatten)]
    group: GroupArgs,
}

/// Coordinator input: flags first, terminal otherwise
fn acquire(args: &Args) -> partition_reduce::Result<IntervalParams> {
    let left = match args.left {
        Some(a) => a,
        None => prompt_stdin("Enter the starting point of integration:")?,
    };
    let right = match args.right {
        Some(b) => b,
        None => prompt_stdin("Enter the ending point of integration:")?,
    };
    IntervalParams::new(left, right, args.samples, args.integrand)
}

fn csv_line(report: &Report<IntervalParams>) -> String {
    // left,right,samples,procs,time_ms,value
    let params = &report.params;
    format!(
        "{},{},{},{},{:.3},{:.12}",
        params.left(),
        params.right(),
        params.samples(),
        report.group_size,
        report.elapsed.as_secs_f64() * 1000.0,
        report.value
    )
}

fn print_results(report: &Report<IntervalParams>, args: &Args) {
    if args.group.csv {
        println!("{}", csv_line(report));
        return;
    }

    let params = &report.params;
    println!("═══════════════════════════════════════════════════════════");
    println!("           DISTRIBUTED TRAPEZOID INTEGRATION");
    println!("═══════════════════════════════════════════════════════════");
    println!("Configuration:");
    println!("  Runtime: {}", args.group.runtime);
    println!("  Processes: {}", report.group_size);
    println!("  Integrand: {:?}", params.integrand());
    println!("  Reduce order: {:?}", report.order);
    println!("───────────────────────────────────────────────────────────");
    println!("Results:");
    println!("  with n = {} trapezoids", params.samples());
    println!(
        "  Estimation from {:.6} to {:.6} = {:.5}",
        params.left(),
        params.right(),
        report.value
    );
    println!("  Execution time: {:.3} ms", report.elapsed.as_secs_f64() * 1000.0);
    println!("───────────────────────────────────────────────────────────");
    println!("Per-rank breakdown:");

    for c in &report.contributions {
        let label = if c.rank == 0 { "Coordinator" } else { "Worker" };
        println!("  {} {}: {:.10}", label, c.rank, c.value);
    }

    println!("═══════════════════════════════════════════════════════════");
}

fn run(args: &Args) -> Result<()> {
    let report = launch::run(&args.group, &Trapezoid, || acquire(args))
        .context("trapezoid integration failed")?;

    if let Some(report) = report {
        print_results(&report, args);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.group.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["trapezoid-mpi", "-a", "0", "-b", "1"]);
        let params = acquire(&args).unwrap();
        assert_eq!(params.samples(), 1024);
        assert_eq!(params.integrand(), Integrand::Square);
    }

    #[test]
    fn test_negative_endpoints() {
        let args = Args::parse_from(["trapezoid-mpi", "--left", "-2.5", "--right", "-1"]);
        assert_eq!(args.left, Some(-2.5));
        assert_eq!(args.right, Some(-1.0));
    }

    #[test]
    fn test_zero_samples_rejected() {
        let args = Args::parse_from(["trapezoid-mpi", "-a", "0", "-b", "1", "-s", "0"]);
        assert!(acquire(&args).is_err());
    }

    #[test]
    fn test_rayon_and_threads_agree() {
        let threads = Args::parse_from(["trapezoid-mpi", "-a", "0", "-b", "1", "-n", "4"]);
        let rayon = Args::parse_from([
            "trapezoid-mpi", "-a", "0", "-b", "1", "-n", "4", "--runtime", "rayon",
        ]);

        let a = launch::run(&threads.group, &Trapezoid, || acquire(&threads))
            .unwrap()
            .unwrap();
        let b = launch::run(&rayon.group, &Trapezoid, || acquire(&rayon))
            .unwrap()
            .unwrap();

        assert!((a.value - 1.0 / 3.0).abs() < 1e-4);
        assert!((a.value - b.value).abs() < 1e-12);
        assert_eq!(csv_line(&a).split(',').count(), 6);
    }
}
