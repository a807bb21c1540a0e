//! Lineage command implementation - ingest files and print lineage as JSON

use anyhow::{Context, Result};
use lg_lineage::{LineagePath, TransformationSummary, ValidationRecord};
use serde::Serialize;

use crate::cli::{GlobalArgs, LineageArgs};
use crate::commands::common::{ingest_paths, print_json, IngestSummary};

#[derive(Serialize)]
struct LineageOutput {
    entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream: Option<Vec<LineagePath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    downstream: Option<Vec<LineagePath>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TransformationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<Vec<ValidationRecord>>,
    ingest: IngestSummary,
}

/// Execute the lineage command
pub async fn execute(args: &LineageArgs, global: &GlobalArgs) -> Result<()> {
    let (engine, report) = ingest_paths(global, &args.paths, args.dialect.as_deref()).await?;

    let entity_id = match (&args.entity, &args.table, &args.column) {
        (Some(entity), _, _) => entity.clone(),
        (None, Some(table), Some(column)) => {
            let table_id = engine.resolve_table_id(table).await?;
            lg_core::naming::column_id(&table_id, column).into_inner()
        }
        (None, Some(table), None) => engine.resolve_table_id(table).await?.into_inner(),
        (None, None, _) => anyhow::bail!("Either --entity or --table is required"),
    };
    let depth = args.depth.unwrap_or(engine.default_depth());

    let upstream = if args.direction.includes_upstream() {
        Some(
            engine
                .get_upstream(&entity_id, depth)
                .await
                .context("Upstream lineage failed")?,
        )
    } else {
        None
    };
    let downstream = if args.direction.includes_downstream() {
        Some(
            engine
                .get_downstream(&entity_id, depth)
                .await
                .context("Downstream lineage failed")?,
        )
    } else {
        None
    };
    let summary = if args.summary {
        Some(engine.get_transformation_summary(&entity_id).await?)
    } else {
        None
    };
    let validation = if args.validate {
        Some(engine.validate_lineage_types(&entity_id).await?)
    } else {
        None
    };

    print_json(&LineageOutput {
        entity_id,
        upstream,
        downstream,
        summary,
        validation,
        ingest: IngestSummary::from(&report),
    })
}
