use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;

use sqlean::completion::{CompletionClient, GeminiCompletion};
use sqlean::config::Config;
use sqlean::controller::Controller;
use sqlean::dialect::{Dialect, registry};
use sqlean::render::MountedRoot;

#[derive(Parser, Debug)]
#[command(name = "sqlean")]
#[command(about = "Review a query read from stdin and print the analysis as HTML.")]
struct Cli {
    /// Target dialect id; defaults to the configured dialect
    dialect: Option<String>,

    /// List supported dialects and exit
    #[arg(long, conflicts_with_all = ["dialect", "example", "echo_query"])]
    list: bool,

    /// Print a dialect's example query and exit
    #[arg(long, value_name = "DIALECT", conflicts_with_all = ["dialect", "echo_query"])]
    example: Option<String>,

    /// Print the highlighted query before the analysis
    #[arg(long)]
    echo_query: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the rendered analysis
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list {
        for d in registry() {
            println!("{:<10} {}", d.identifier.cyan(), d.display_label);
        }
        return Ok(());
    }
    if let Some(id) = cli.example {
        let dialect = Dialect::parse(&id).ok_or_else(|| anyhow!("unknown dialect: {id}"))?;
        println!("{}", dialect.example());
        return Ok(());
    }
    analyze(cli.dialect, cli.echo_query).await
}

async fn analyze(dialect: Option<String>, echo_query: bool) -> Result<()> {
    let config = Config::load();

    let client = match GeminiCompletion::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    tracing::info!("Using model {}", client.model());

    let mut controller = Controller::new(Arc::new(client), config.render.clone(), config.app.default_dialect);
    if let Some(id) = dialect {
        controller.change_dialect(&id);
    }

    if !std::io::stdin().is_terminal() {
        let mut query = String::new();
        tokio::io::stdin().read_to_string(&mut query).await?;
        if !query.trim().is_empty() {
            controller.set_query_text(query);
        }
    }

    if echo_query {
        println!(
            "<pre><code class=\"hljs language-{}\">{}</code></pre>",
            controller.dialect().editor_language(),
            controller.editor_html()
        );
    }

    let mut root = MountedRoot::new();
    if let Some(ticket) = controller.begin_submit() {
        controller.commit(&mut root);
        eprintln!(
            "{} analyzing {} query...",
            "sqlean".cyan().bold(),
            controller.dialect().id()
        );

        let client = controller.client();
        let prompt = ticket.prompt.clone();
        let outcome = tokio::spawn(async move { client.request_completion(&prompt).await }).await?;
        controller.finish(ticket, outcome);
    }

    controller.commit(&mut root);
    println!("{}", root.html());

    if matches!(controller.state(), sqlean::UiState::Failed(_)) {
        std::process::exit(2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["sqlean"]).expect("no args");
        assert!(cli.dialect.is_none() && !cli.list && cli.example.is_none() && !cli.echo_query);

        let cli = Cli::try_parse_from(["sqlean", "--list"]).expect("list");
        assert!(cli.list);

        let cli = Cli::try_parse_from(["sqlean", "--example", "postgres"]).expect("example");
        assert_eq!(cli.example.as_deref(), Some("postgres"));

        let cli = Cli::try_parse_from(["sqlean", "mongodb", "--echo-query"]).expect("dialect");
        assert_eq!(cli.dialect.as_deref(), Some("mongodb"));
        assert!(cli.echo_query);
    }

    #[test]
    fn test_cli_rejects_bad_input() {
        assert!(Cli::try_parse_from(["sqlean", "--bogus"]).is_err());
        assert!(Cli::try_parse_from(["sqlean", "a", "b"]).is_err());
        assert!(Cli::try_parse_from(["sqlean", "--list", "postgres"]).is_err());

        let help = Cli::try_parse_from(["sqlean", "--help"]).expect_err("help exits early");
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
    }
}
