//! `toolcat describe`: prints the declarations a model would receive.

use anyhow::Result;
use clap::Args;
use console::style;
use toolcat_core::{Config, FunctionSpec};

use crate::catalogs::{self, CatalogKind};

#[derive(Args)]
pub struct DescribeArgs {
    /// Catalog to describe.
    #[arg(long, value_enum, default_value_t)]
    pub catalog: CatalogKind,

    /// Print a short list instead of JSON declarations.
    #[arg(long, default_value_t = false)]
    pub brief: bool,
}

pub fn run(args: &DescribeArgs, config: &Config) -> Result<()> {
    let catalog = catalogs::build(args.catalog, config)?;
    let declarations = catalog.describe_all();

    if args.brief {
        println!(
            "{} ({} functions)",
            style(args.catalog).bold().underlined(),
            declarations.len()
        );
        for spec in &declarations {
            println!("  {}", brief_line(spec));
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&declarations)?);
    }
    Ok(())
}

fn brief_line(spec: &FunctionSpec) -> String {
    let params: Vec<String> = spec
        .parameters
        .properties
        .iter()
        .map(|(name, param)| {
            let marker = if spec.parameters.required.contains(name) { "" } else { "?" };
            format!("{name}{marker}: {}", param.param_type.as_str())
        })
        .collect();
    format!("{}({}): {}", spec.name, params.join(", "), spec.description)
}
