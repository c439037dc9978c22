use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Load the session once and print the settled snapshot.
    Status,
    /// Follow the session and print every snapshot change until Ctrl-C.
    Watch(WatchArgs),
    /// Store a session token issued by the identity provider.
    SignIn(SignInArgs),
    /// Remove the stored session token.
    SignOut,
    /// Print the JSON Schema of the snapshot record.
    Schema,
}

#[derive(Clone, Debug, Args)]
pub struct WatchArgs {
    /// Request a refresh every N seconds in addition to provider notices.
    #[arg(long, value_name = "SECS")]
    pub refresh_every: Option<u64>,
    /// Exit after printing this many snapshots.
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,
}

#[derive(Clone, Debug, Args)]
pub struct SignInArgs {
    /// Compact JWT issued by the identity provider.
    #[arg(long)]
    pub token: String,
}
