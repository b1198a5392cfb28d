#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Database used when `--db` is not given.
const DEFAULT_DB: &str = "tagging.db";

#[derive(Parser, Debug)]
#[command(
    name = "tg",
    author,
    version,
    about = "tg: topic tags and tag notifications",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// SQLite database file.
    #[arg(long, global = true, default_value = DEFAULT_DB)]
    db: PathBuf,

    /// Config file (defaults to ./tagging.toml, then the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn session(&self) -> cmd::Session {
        cmd::Session {
            db_path: self.db.clone(),
            config_path: self.config.clone(),
            output: OutputMode::from_json_flag(self.json),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Create or migrate the tagging database",
        after_help = "EXAMPLES:\n    # Create tagging.db in the current directory\n    tg init\n\n    # Also write a default tagging.toml here\n    tg init --write-config ."
    )]
    Init(cmd::init::InitArgs),

    #[command(about = "Manage users")]
    User(cmd::user::UserArgs),

    #[command(
        about = "Create, retag and inspect topics",
        after_help = "EXAMPLES:\n    # Create a tagged topic as a trusted user\n    tg topic create \"Release notes\" --tag release --tag Docs --as alice\n\n    # Replace the tag set\n    tg topic edit 1 --tag release --tag changelog --as alice\n\n    # Show tags and their change history\n    tg topic show 1 --history"
    )]
    Topic(cmd::topic::TopicArgs),

    #[command(about = "Inspect a tag")]
    Tag(cmd::tag::TagArgs),

    #[command(about = "Most-used tags, sorted by name")]
    Cloud(cmd::cloud::CloudArgs),

    #[command(about = "Search tags by substring, most used first")]
    Search(cmd::search::SearchArgs),

    #[command(
        about = "Per-tag notification preferences",
        after_help = "EXAMPLES:\n    # Watch every topic tagged `release`\n    tg notifications set --user bob release watching\n\n    # List bob's tag preferences\n    tg notifications get --user bob"
    )]
    Notifications(cmd::notifications::NotificationsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TAGGING_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "tagging_core=debug,tg=debug,info"
        } else {
            "tagging_core=info,tg=info,warn"
        })
    });

    let format = env::var("TAGGING_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let session = cli.session();
    debug!(db = %session.db_path.display(), "starting");

    let command_result = match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, &session),
        Commands::User(args) => cmd::user::run_user(args, &session),
        Commands::Topic(args) => cmd::topic::run_topic(args, &session),
        Commands::Tag(args) => cmd::tag::run_tag(args, &session),
        Commands::Cloud(args) => cmd::cloud::run_cloud(args, &session),
        Commands::Search(args) => cmd::search::run_search(args, &session),
        Commands::Notifications(args) => {
            cmd::notifications::run_notifications(args, &session)
        }
    };

    if let Err(err) = command_result {
        render_error(session.output, &CliError::from(&err))?;
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::parse_from(["tg", "cloud", "--json", "--db", "x.db"]);
        assert!(cli.json);
        assert_eq!(cli.db, PathBuf::from("x.db"));
        assert!(matches!(cli.command, Commands::Cloud(_)));
    }

    #[test]
    fn db_defaults_to_local_file() {
        let cli = Cli::try_parse_from(["tg", "search", "ru"]).expect("parse");
        assert_eq!(cli.db, PathBuf::from(DEFAULT_DB));
        assert_eq!(cli.session().output, OutputMode::Human);
    }

    #[test]
    fn clap_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
