//! Path command implementation - print paths between two entities

use anyhow::{Context, Result};
use lg_lineage::LineagePath;
use serde::Serialize;

use crate::cli::{GlobalArgs, PathArgs};
use crate::commands::common::{ingest_paths, print_json, IngestSummary};

#[derive(Serialize)]
struct PathOutput<'a> {
    from: &'a str,
    to: &'a str,
    paths: Vec<LineagePath>,
    ingest: IngestSummary,
}

/// Execute the path command
pub async fn execute(args: &PathArgs, global: &GlobalArgs) -> Result<()> {
    let (engine, report) = ingest_paths(global, &args.paths, args.dialect.as_deref()).await?;
    let depth = args.depth.unwrap_or(engine.default_depth());

    let paths = engine
        .find_path(&args.from, &args.to, depth)
        .await
        .with_context(|| format!("Path search from {} to {} failed", args.from, args.to))?;
    if paths.is_empty() {
        log::info!("No path from {} to {} within {} hops", args.from, args.to, depth);
    }

    print_json(&PathOutput {
        from: &args.from,
        to: &args.to,
        paths,
        ingest: IngestSummary::from(&report),
    })
}
