//! `toolcat call`: dispatches one function without a model.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use console::style;
use serde_json::{Map, Value};
use toolcat_core::{Config, DispatchRequest};

use crate::catalogs::{self, CatalogKind};

#[derive(Args)]
pub struct CallArgs {
    /// Function name (e.g. "turn_on_light").
    pub function: String,

    /// Arguments as a JSON object (inline or @file.json).
    pub input: String,

    /// Catalog the function belongs to.
    #[arg(long, value_enum, default_value_t)]
    pub catalog: CatalogKind,
}

pub async fn run(args: &CallArgs, config: &Config) -> Result<()> {
    let arguments = parse_input(&args.input)?;
    let catalog = catalogs::build(args.catalog, config)?;

    eprintln!(
        "{} Calling function: {}",
        style("→").cyan(),
        style(&args.function).bold()
    );

    let outcome = catalog
        .dispatch(DispatchRequest::new(args.function.clone(), arguments))
        .await
        .with_context(|| format!("call to '{}' failed", args.function))?;

    eprintln!("{} Result:", style("✓").green().bold());
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn parse_input(input: &str) -> Result<Map<String, Value>> {
    let json = match input.strip_prefix('@') {
        Some(path) => {
            let path = PathBuf::from(path);
            std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read input file: {}", path.display()))?
        }
        None => input.to_string(),
    };

    match serde_json::from_str::<Value>(&json).context("invalid input JSON")? {
        Value::Object(map) => Ok(map),
        _ => bail!("input must be a JSON object"),
    }
}
