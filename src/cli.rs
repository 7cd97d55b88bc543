use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "coursepay-core")]
#[command(about = "Course payment orchestration and webhook reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction maintenance commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Finalize enrollments for completed transactions that lack one
    Repair,

    /// Fail pending transactions older than the cutoff
    ExpirePending {
        /// Age cutoff in hours; defaults to PENDING_MAX_AGE_HOURS
        #[arg(long)]
        hours: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}
