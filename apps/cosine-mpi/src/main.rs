//! Distributed Cosine Approximation
//!
//! Approximates cos(x) with a truncated Maclaurin series whose terms are
//! split across a process group.
//!
//! # Architecture
//!
//! ```text
//! cos(x) ≈ Σ_{i=0}^{k} (-1)^i · x^{2i} / (2i)!      k = 20, 4 ranks
//!
//!   Rank 0 (Coordinator): terms [0, 5)   ─┐
//!   Rank 1 (Worker):      terms [5, 10)   │  partials (tag 0)
//!   Rank 2 (Worker):      terms [10, 15)  ├──────────────▶ Rank 0 sums
//!   Rank 3 (Worker):      terms [15, 21) ─┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! # All ranks as threads of one process
//! ./cosine-mpi --iterations 20 --degrees 60 -n 4
//!
//! # One process per rank over TCP
//! ./cosine-mpi --runtime tcp -n 3 --rank 0 -k 20 -d 60
//! ./cosine-mpi --runtime tcp -n 3 --rank 1
//! ./cosine-mpi --runtime tcp -n 3 --rank 2
//!
//! # With MPI (build with --features mpi)
//! mpirun -np 4 ./cosine-mpi --runtime mpi
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use partition_reduce::cli::GroupArgs;
use partition_reduce::kernel::{AngleReduction, CosineSeries, SeriesParams};
use partition_reduce::launch;
use partition_reduce::logging::init_logging;
use partition_reduce::process::Report;
use partition_reduce::prompt::prompt_stdin;

/// Distributed cosine approximation by truncated series
#[derive(Parser, Debug)]
#[command(name = "cosine-mpi")]
#[command(about = "Approximate cos(x) across a process group", long_about = None)]
struct Args {
    /// Iteration bound k: terms 0..=k are summed (prompted if omitted)
    #[arg(short = 'k', long)]
    iterations: Option<u32>,

    /// Angle in degrees (prompted if omitted)
    #[arg(short, long, allow_negative_numbers = true)]
    degrees: Option<f64>,

    /// How the angle is folded into range before summing
    #[arg(long, value_enum, default_value_t = AngleReduction::Reference)]
    angle_reduction: AngleReduction,

    #[command(flatten)]
    group: GroupArgs,
}

/// Coordinator input: flags first, terminal otherwise
fn acquire(args: &Args) -> partition_reduce::Result<SeriesParams> {
    let iterations = match args.iterations {
        Some(k) => k,
        None => prompt_stdin("Enter the number of iterations:")?,
    };
    let degrees = match args.degrees {
        Some(d) => d,
        None => prompt_stdin("Enter the required value in degrees:")?,
    };
    SeriesParams::from_degrees(iterations, degrees, args.angle_reduction)
}

fn csv_line(report: &Report<SeriesParams>) -> String {
    // iterations,degrees,procs,time_ms,value
    format!(
        "{},{},{},{:.3},{:.12}",
        report.params.iterations(),
        report.params.degrees(),
        report.group_size,
        report.elapsed.as_secs_f64() * 1000.0,
        report.value
    )
}

fn print_results(report: &Report<SeriesParams>, args: &Args) {
    if args.group.csv {
        println!("{}", csv_line(report));
        return;
    }

    let params = &report.params;
    println!("═══════════════════════════════════════════════════════════");
    println!("            DISTRIBUTED COSINE APPROXIMATION");
    println!("═══════════════════════════════════════════════════════════");
    println!("Configuration:");
    println!("  Runtime: {}", args.group.runtime);
    println!("  Processes: {}", report.group_size);
    println!("  Angle reduction: {:?}", params.reduction());
    println!("  Reduce order: {:?}", report.order);
    println!("───────────────────────────────────────────────────────────");
    println!("Results:");
    println!(
        "  Computed value of cosine(x) where x = {:.6} is = {:.6}",
        params.degrees(),
        report.value
    );
    println!("  Number of iterations = {}", params.iterations());
    println!("  Time taken = {:.6} s", report.elapsed.as_secs_f64());
    println!("───────────────────────────────────────────────────────────");
    println!("Per-rank breakdown:");

    for c in &report.contributions {
        let label = if c.rank == 0 { "Coordinator" } else { "Worker" };
        println!("  {} {}: {:+.12e}", label, c.rank, c.value);
    }

    println!("═══════════════════════════════════════════════════════════");
}

fn run(args: &Args) -> Result<()> {
    let report = launch::run(&args.group, &CosineSeries, || acquire(args))
        .context("cosine approximation failed")?;

    // Only the coordinator reports
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
    use partition_reduce::cli::Runtime;

    #[test]
    fn test_flags_skip_prompts() {
        let args = Args::parse_from(["cosine-mpi", "-k", "20", "-d", "60"]);
        let params = acquire(&args).unwrap();
        assert_eq!(params.iterations(), 20);
        assert!((params.degrees() - 60.0).abs() < 1e-12);
        assert_eq!(params.reduction(), AngleReduction::Reference);
    }

    #[test]
    fn test_negative_angle_and_policy() {
        let args = Args::parse_from([
            "cosine-mpi",
            "-k",
            "30",
            "--degrees",
            "-200",
            "--angle-reduction",
            "periodic",
        ]);
        assert_eq!(args.degrees, Some(-200.0));
        assert_eq!(args.angle_reduction, AngleReduction::Periodic);
    }

    #[test]
    fn test_iteration_bound_is_checked() {
        let args = Args::parse_from(["cosine-mpi", "-k", "500", "-d", "10"]);
        assert!(acquire(&args).is_err());
    }

    #[test]
    fn test_threads_run_end_to_end() {
        let args = Args::parse_from(["cosine-mpi", "-k", "20", "-d", "60", "-n", "4"]);
        assert_eq!(args.group.runtime, Runtime::Threads);

        let report = launch::run(&args.group, &CosineSeries, || acquire(&args))
            .unwrap()
            .unwrap();
        assert!((report.value - 0.5).abs() < 1e-6);

        let line = csv_line(&report);
        assert!(line.starts_with("20,"));
        assert_eq!(line.split(',').count(), 5);
    }
}
