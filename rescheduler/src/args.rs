use clap::Parser;

/// The Command line args to pass to the rescheduler
#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
pub struct Args {
    /// The path to load the config file from
    #[clap(short, long, default_value = "rescheduler.yml")]
    pub config: String,
    /// The kube config context to use instead of the in cluster service account
    #[clap(long)]
    pub context_name: Option<String>,
    /// Log decisions without deleting anything or persisting state
    #[clap(long, default_value_t)]
    pub dry_run: bool,
    /// Run a single reschedule and exit
    #[clap(long, default_value_t)]
    pub once: bool,
}
