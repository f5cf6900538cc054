//! `forksync config`: show the resolved configuration.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tabled::{settings::Style, Table, Tabled};

use super::SourceArgs;

/// Arguments for `forksync config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ConfigRow {
    #[tabled(rename = "setting")]
    key: String,
    #[tabled(rename = "value")]
    value: String,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let config = self.source.load_config()?;
        // Secrets serialize as "****".
        let value = serde_json::to_value(&config).context("failed to serialize configuration")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("failed to serialize configuration")?
            );
            return Ok(());
        }

        let rows: Vec<ConfigRow> = match value {
            Value::Object(map) => map
                .into_iter()
                .map(|(key, value)| ConfigRow {
                    key,
                    value: display_value(&value),
                })
                .collect(),
            _ => Vec::new(),
        };
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_owned(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
