use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "findings-gate", version, about = "Upload static-analysis results, score builds and browse issues")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a results file, wait for processing and record the build score
    Upload(UploadArgs),
    /// Start the issue browser and trend HTTP API
    Serve(ServeArgs),
    /// Compare the last build's summary with the previous one
    Trend(ReportArgs),
    /// Print the score of every recorded build
    History(ReportArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Options shared by every command that talks to the server or reads builds.
#[derive(Args, Clone, Debug, Default)]
pub struct CommonArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Findings server URL (or FORTIFY_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Authentication token (or FORTIFY_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Directory holding numbered build records
    #[arg(long)]
    pub builds_dir: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Application name on the server
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application version on the server
    #[arg(long)]
    pub app_version: Option<String>,

    /// Results file; `.fpr` is appended unless it ends in .fpr or .zip
    #[arg(short, long)]
    pub results: Option<String>,

    /// Copy the results file into a private temp directory before uploading
    #[arg(long)]
    pub remote: bool,

    /// Filter set used for folder buckets
    #[arg(long)]
    pub filter_set: Option<String>,

    /// Search condition; matching issues mark the build unstable
    #[arg(long)]
    pub failure_condition: Option<String>,

    /// Processing timeout in minutes (0 waits forever)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Minutes between status polls
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Report into this build number instead of the next one
    #[arg(long)]
    pub build_number: Option<u64>,

    /// Exit non-zero when the build ends unstable
    #[arg(long)]
    pub fail_on_unstable: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Listen port
    #[arg(long, default_value = "8080")]
    pub port: u16,

    /// Listen address
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Application name to browse
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application version to browse
    #[arg(long)]
    pub app_version: Option<String>,

    /// Filter set used for folder buckets
    #[arg(long)]
    pub filter_set: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Application name qualifying the summaries
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application version qualifying the summaries
    #[arg(long)]
    pub app_version: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Path to YAML config file
    pub config: String,
}
