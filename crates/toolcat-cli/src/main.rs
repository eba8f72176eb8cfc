//! `toolcat` command-line interface.
//!
//! Usage:
//! ```bash
//! toolcat describe --catalog lights            # Print the declarations
//! toolcat call turn_on_light '{"on": true}'    # Dispatch directly
//! toolcat ask "dim the lights to 20, warm"     # Let the model choose
//! toolcat summarize                            # Answer a question about the inbox
//! toolcat graph extract contacts               # Read Microsoft Graph
//! toolcat serve                                # Run the interact backend
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use toolcat_core::Config;
use tracing_subscriber::EnvFilter;

mod catalogs;
mod commands;

#[derive(Debug, Parser)]
#[command(name = "toolcat", author, version, about)]
struct Cli {
    /// Path to `toolcat.toml`. Defaults to the usual search locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every function declaration of a catalog
    Describe(commands::describe::DescribeArgs),

    /// Dispatch one function call without a model
    Call(commands::call::CallArgs),

    /// Let the model pick a function for a prompt and run it
    Ask(commands::ask::AskArgs),

    /// Answer a question about the inbox fetched from the backend
    Summarize(commands::summarize::SummarizeArgs),

    /// Microsoft Graph flows
    Graph(commands::graph::GraphArgs),

    /// Serve the interact backend
    Serve(commands::serve::ServeArgs),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Describe(_) => f.debug_tuple("Describe").finish(),
            Self::Call(_) => f.debug_tuple("Call").finish(),
            Self::Ask(_) => f.debug_tuple("Ask").finish(),
            Self::Summarize(_) => f.debug_tuple("Summarize").finish(),
            Self::Graph(_) => f.debug_tuple("Graph").finish(),
            Self::Serve(_) => f.debug_tuple("Serve").finish(),
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => Config::load_resolved().context("failed to load config")?,
    };
    config.validate().context("invalid config")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Describe(args) => commands::describe::run(args, &config),
        Command::Call(args) => commands::call::run(args, &config).await,
        Command::Ask(args) => commands::ask::run(args, &config).await,
        Command::Summarize(args) => commands::summarize::run(args, &config).await,
        Command::Graph(args) => commands::graph::run(args, &config).await,
        Command::Serve(args) => commands::serve::run(args, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;
    use crate::catalogs::CatalogKind;

    fn parse_command(argv: &[&str]) -> Result<Command, clap::Error> {
        Ok(Cli::try_parse_from(argv.iter().copied())?.command)
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = Cli::try_parse_from(["toolcat"]).expect_err("expected clap parse error");
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let err = Cli::try_parse_from(["toolcat", "not-a-command"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_describe_defaults_to_interact_catalog() -> Result<(), clap::Error> {
        let Command::Describe(args) = parse_command(&["toolcat", "describe"])? else {
            panic!("expected Command::Describe");
        };
        assert_eq!(args.catalog, CatalogKind::Interact);
        Ok(())
    }

    #[test]
    fn test_cli_call_requires_input_json_argument() {
        let err = Cli::try_parse_from(["toolcat", "call", "turn_on_light"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_call_with_catalog() -> Result<(), clap::Error> {
        let command = parse_command(&[
            "toolcat",
            "call",
            "turn_on_light",
            r#"{"on": true}"#,
            "--catalog",
            "lights",
        ])?;
        let Command::Call(args) = command else {
            panic!("expected Command::Call");
        };
        assert_eq!(args.function, "turn_on_light");
        assert_eq!(args.input, r#"{"on": true}"#);
        assert_eq!(args.catalog, CatalogKind::Lights);
        Ok(())
    }

    #[test]
    fn test_cli_ask_prompt_is_optional() -> Result<(), clap::Error> {
        let Command::Ask(args) = parse_command(&["toolcat", "ask"])? else {
            panic!("expected Command::Ask");
        };
        assert!(args.prompt.is_none());
        Ok(())
    }

    #[test]
    fn test_cli_rejects_unknown_catalog() {
        let err = Cli::try_parse_from(["toolcat", "describe", "--catalog", "toaster"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }

    #[test]
    fn test_cli_summarize_default_query() -> Result<(), clap::Error> {
        let Command::Summarize(args) = parse_command(&["toolcat", "summarize"])? else {
            panic!("expected Command::Summarize");
        };
        assert_eq!(args.query, "What are the subjects of my received emails?");
        Ok(())
    }

    #[test]
    fn test_cli_serve_defaults() -> Result<(), clap::Error> {
        let Command::Serve(args) = parse_command(&["toolcat", "serve"])? else {
            panic!("expected Command::Serve");
        };
        assert_eq!(args.addr, "127.0.0.1:5000");
        Ok(())
    }

    #[test]
    fn test_cli_global_config_after_subcommand() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["toolcat", "describe", "--config", "/tmp/toolcat.toml"])?;
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/toolcat.toml")));
        Ok(())
    }

    #[test]
    fn test_cli_graph_extract_sharepoint_search() -> Result<(), clap::Error> {
        let command = parse_command(&[
            "toolcat", "graph", "extract", "sharepoint", "--search", "finance",
        ])?;
        let Command::Graph(args) = command else {
            panic!("expected Command::Graph");
        };
        let commands::graph::GraphCommand::Extract(extract) = args.command else {
            panic!("expected GraphCommand::Extract");
        };
        assert_eq!(extract.report, commands::graph::Report::Sharepoint);
        assert_eq!(extract.search.as_deref(), Some("finance"));
        Ok(())
    }

    #[test]
    fn test_load_config_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolcat.toml");
        std::fs::write(&path, "[model]\nid = \"gemini-2.0-flash\"\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.model.id, "gemini-2.0-flash");
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toolcat.toml");
        std::fs::write(&path, "[model]\ntemperature = 7.5\n").unwrap();

        let err = load_config(Some(path.as_path())).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config"));
    }
}
