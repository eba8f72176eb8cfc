//! `toolcat summarize`: answers a question about the inbox.
//!
//! The inbox comes from the backend's option 2 and is handed to the
//! completion model as question-answering context.

use anyhow::{Context, Result};
use clap::Args;
use toolcat_core::Config;
use toolcat_gemini::{GeminiClient, TextQaPrompt};
use toolcat_tools::{InteractAction, InteractClient};

pub const DEFAULT_QUERY: &str = "What are the subjects of my received emails?";

#[derive(Args)]
pub struct SummarizeArgs {
    /// Question to answer from the inbox.
    #[arg(short, long, default_value = DEFAULT_QUERY)]
    pub query: String,
}

pub async fn run(args: &SummarizeArgs, config: &Config) -> Result<()> {
    let backend =
        InteractClient::from_config(&config.backend).context("failed to create backend client")?;
    let gemini = GeminiClient::from_config(&config.model).context("failed to create Gemini client")?;

    let answer = summarize(&backend, &gemini, &config.model.completion_id, &args.query).await?;
    println!("{answer}");
    Ok(())
}

pub(crate) async fn summarize(
    backend: &InteractClient,
    gemini: &GeminiClient,
    model: &str,
    query: &str,
) -> Result<String> {
    let inbox = backend
        .interact(InteractAction::ListInbox, None)
        .await
        .context("failed to fetch inbox")?;

    let prompt = TextQaPrompt::new(&serde_json::to_string(&inbox)?, query);
    gemini
        .answer(model, &prompt)
        .await
        .context("completion request failed")
}
