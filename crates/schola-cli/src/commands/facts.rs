use std::sync::Arc;

use anyhow::{Context, bail};
use schola_core::enums::FactKind;
use schola_db::{FactFilter, JsonlFactSink};
use schola_scheduler::{FactRelay, RelayReport};
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::FactsCommands;
use crate::context::AppContext;
use crate::output::{fact_line, output};

#[derive(Debug, Serialize)]
struct RelayOutput {
    dir: String,
    delivered: usize,
    failure: Option<String>,
}

impl RelayOutput {
    fn new(dir: &std::path::Path, report: RelayReport) -> Self {
        Self {
            dir: dir.display().to_string(),
            delivered: report.delivered,
            failure: report.failure.map(|f| f.to_string()),
        }
    }
}

/// Handle `schola facts`.
pub async fn handle(action: &FactsCommands, ctx: &AppContext, flags: &GlobalFlags) -> anyhow::Result<()> {
    match action {
        FactsCommands::Relay { dir, batch } => {
            let dir = dir
                .as_deref()
                .map(std::path::PathBuf::from)
                .or_else(|| ctx.config.facts.jsonl_path())
                .context("no sink directory: pass --dir or set facts.jsonl_dir")?;
            let sink = JsonlFactSink::new(&dir)?;
            let mut relay = FactRelay::new(
                ctx.store.clone(),
                batch.unwrap_or_else(|| ctx.config.facts.batch_size()),
            );
            relay.subscribe(Arc::new(sink));
            let report = RelayOutput::new(&dir, relay.drain().await?);
            output(&report, flags, |r| match &r.failure {
                Some(failure) => format!("delivered {} fact(s) to {}; stopped: {failure}", r.delivered, r.dir),
                None => format!("delivered {} fact(s) to {}", r.delivered, r.dir),
            })
        }
        FactsCommands::List {
            kind,
            entity,
            section,
            pending,
            limit,
        } => {
            let filter = FactFilter {
                kind: kind.as_deref().map(parse_kind).transpose()?,
                entity_id: entity.clone(),
                section_id: section.clone(),
                undelivered_only: *pending,
                limit: *limit,
            };
            let facts = ctx.store.query_facts(&filter).await?;
            output(&facts, flags, |list| {
                if list.is_empty() {
                    return String::from("(no facts)");
                }
                list.iter().map(fact_line).collect::<Vec<_>>().join("\n")
            })
        }
    }
}

fn parse_kind(value: &str) -> anyhow::Result<FactKind> {
    match serde_json::from_value(serde_json::Value::String(value.trim().to_string())) {
        Ok(kind) => Ok(kind),
        Err(_) => bail!("unknown fact kind '{value}'"),
    }
}
