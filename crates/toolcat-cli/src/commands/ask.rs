//! `toolcat ask`: the model picks a function for a prompt, then it runs.

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use toolcat_core::{
    Catalog, CatalogError, Config, DispatchOutcome, DispatchRequest, config::ModelConfig,
};
use toolcat_gemini::GeminiClient;
use tracing::info;

use crate::catalogs::{self, CatalogKind};

#[derive(Args)]
pub struct AskArgs {
    /// Prompt for the model. Read from stdin when omitted.
    pub prompt: Option<String>,

    /// Catalog offered to the model.
    #[arg(long, value_enum, default_value_t)]
    pub catalog: CatalogKind,
}

pub async fn run(args: &AskArgs, config: &Config) -> Result<()> {
    let catalog = catalogs::build(args.catalog, config)?;
    let gemini = GeminiClient::from_config(&config.model).context("failed to create Gemini client")?;

    let prompt = match &args.prompt {
        Some(prompt) => prompt.clone(),
        None => read_prompt().await?,
    };

    let (request, result) = choose_and_dispatch(&gemini, &config.model, &catalog, &prompt).await?;

    println!("Model Response:");
    println!("{}", serde_json::to_string_pretty(&request)?);

    println!("\nFunction Call Output:");
    match result {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Err(CatalogError::UnknownFunction(name)) => {
            println!("Function {name} not found");
            bail!("the model chose '{name}', which is not in the {} catalog", args.catalog)
        }
        Err(e) => Err(e).context("function call failed"),
    }
}

/// Asks the model for a call, then dispatches it.
///
/// The outer error covers the model exchange; the inner result is the
/// dispatch, so the chosen call can be shown even when it fails.
pub(crate) async fn choose_and_dispatch(
    gemini: &GeminiClient,
    model: &ModelConfig,
    catalog: &Catalog,
    prompt: &str,
) -> Result<(DispatchRequest, Result<DispatchOutcome, CatalogError>)> {
    let request = gemini
        .choose_function(&model.id, prompt, &catalog.describe_all(), model.temperature)
        .await
        .context("model request failed")?;
    info!(function = %request.function_name, "Model chose a function");

    let result = catalog.dispatch(request.clone()).await;
    Ok((request, result))
}

async fn read_prompt() -> Result<String> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(format!("{} ", style("Enter a prompt:").bold()).as_bytes()).await?;
    stdout.flush().await?;

    let line = BufReader::new(tokio::io::stdin())
        .lines()
        .next_line()
        .await
        .context("failed to read prompt")?
        .unwrap_or_default();

    let prompt = line.trim();
    if prompt.is_empty() {
        bail!("prompt must not be empty");
    }
    Ok(prompt.to_string())
}
