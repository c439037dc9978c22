use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `vigil` binary.
#[derive(Debug, Parser)]
#[command(name = "vigil", version, about = "Vigil - synchronized session and profile state")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read profiles from a JSON fixture instead of the REST profile store
    #[arg(long, global = true, value_name = "FILE")]
    pub profiles: Option<PathBuf>,
}

impl Cli {
    /// Extract ergonomic global flags struct for command handlers.
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            profiles: self.profiles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, GlobalFlags, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["vigil", "--format", "raw", "--verbose", "status"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Status));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["vigil", "watch", "--quiet", "--profiles", "p.json"])
            .expect("cli should parse");

        assert!(cli.quiet);
        assert_eq!(cli.profiles.as_deref(), Some(Path::new("p.json")));
        assert!(matches!(cli.command, Commands::Watch(_)));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["vigil", "--format", "table", "status"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn watch_options_parse() {
        let cli = Cli::try_parse_from(["vigil", "watch", "--refresh-every", "30", "--count", "2"])
            .expect("cli should parse");
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.refresh_every, Some(30));
        assert_eq!(args.count, Some(2));
    }

    #[test]
    fn sign_in_requires_token() {
        assert!(Cli::try_parse_from(["vigil", "sign-in"]).is_err());

        let cli = Cli::try_parse_from(["vigil", "sign-in", "--token", "a.b.c"])
            .expect("cli should parse");
        let Commands::SignIn(args) = cli.command else {
            panic!("expected sign-in");
        };
        assert_eq!(args.token, "a.b.c");
    }

    #[test]
    fn global_flags_extraction_copies_values() {
        let cli = Cli::try_parse_from(["vigil", "--profiles", "/tmp/p.json", "sign-out"])
            .expect("cli should parse");
        let flags: GlobalFlags = cli.global_flags();
        assert_eq!(flags.profiles.as_deref(), Some(Path::new("/tmp/p.json")));
        assert_eq!(flags.format, OutputFormat::Json);
    }
}
