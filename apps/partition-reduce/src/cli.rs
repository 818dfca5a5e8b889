//! Command-line options shared by every program built on this crate.

use clap::{Args, ValueEnum};

use crate::reduce::ReduceOrder;

/// Message-passing runtime that hosts the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Runtime {
    /// Every rank is a thread of this process
    #[default]
    Threads,
    /// One process per rank, connected over TCP
    Tcp,
    /// Ranks assigned by `mpirun` (requires the `mpi` feature)
    Mpi,
    /// Shared-memory baseline on the rayon pool, no messaging
    Rayon,
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Runtime::Threads => write!(f, "threads"),
            Runtime::Tcp => write!(f, "tcp"),
            Runtime::Mpi => write!(f, "mpi"),
            Runtime::Rayon => write!(f, "rayon"),
        }
    }
}

/// Group configuration, flattened into each program's `Args`
#[derive(Args, Debug, Clone)]
pub struct GroupArgs {
    /// Runtime that hosts the process group
    #[arg(long, value_enum, default_value_t = Runtime::Threads)]
    pub runtime: Runtime,

    /// Number of processes in the group (threads, tcp and rayon runtimes)
    #[arg(short = 'n', long, default_value_t = 4)]
    pub procs: usize,

    /// Rank of this process (tcp runtime)
    #[arg(long, default_value_t = 0)]
    pub rank: usize,

    /// Coordinator address (tcp runtime)
    #[arg(long, default_value = "127.0.0.1:7878")]
    pub master_addr: String,

    /// Order in which the coordinator folds partial results
    #[arg(long, value_enum, default_value_t = ReduceOrder::Ascending)]
    pub reduce_order: ReduceOrder,

    /// Output in CSV format
    #[arg(long, default_value_t = false)]
    pub csv: bool,

    /// Log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
