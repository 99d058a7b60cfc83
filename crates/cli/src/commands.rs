use clap::Subcommand;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Ingest up to the current head, refresh validators and compute stats (default)
    Run,
    /// Show the checkpoint, stored record counts and recent journal entries
    Status {
        #[arg(long, help = "Print the status as JSON instead of a table")]
        json: bool,

        #[arg(long, default_value_t = 5, help = "Number of journal entries to show")]
        recent: usize,
    },
    /// Show the most recent stats snapshot
    Stats {
        #[arg(long, help = "Print the snapshot as JSON instead of a table")]
        json: bool,
    },
}
