//! Analyze command implementation - print extraction records per file

use anyhow::Result;
use lg_core::ExtractionRecord;
use lg_sql::ScriptAnalysis;
use serde::Serialize;

use crate::cli::{AnalyzeArgs, AnalyzeOutput, GlobalArgs};
use crate::commands::common::{build_analyzer, collect_sql_files, load_config, print_json, read_sources};

#[derive(Serialize)]
struct FileAnalysis {
    path: String,
    #[serde(flatten)]
    analysis: ScriptAnalysis,
}

/// Execute the analyze command
pub async fn execute(args: &AnalyzeArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let analyzer = build_analyzer(&config, args.dialect.as_deref())?;
    let files = collect_sql_files(&args.paths)?;
    let sources = read_sources(&files)?;

    let results: Vec<FileAnalysis> = sources
        .into_iter()
        .map(|source| FileAnalysis {
            analysis: analyzer.analyze_script(&source.sql),
            path: source.path,
        })
        .collect();

    match args.output {
        AnalyzeOutput::Json => print_json(&results)?,
        AnalyzeOutput::Pretty => {
            for file in &results {
                print_pretty(file);
            }
        }
    }
    Ok(())
}

fn print_pretty(file: &FileAnalysis) {
    println!(
        "{} ({} statements, {} failed)",
        file.path,
        file.analysis.records.len(),
        file.analysis.failures.len()
    );
    for statement in &file.analysis.records {
        println!("  [{}] {}", statement.index + 1, describe(&statement.record));
        for column in &statement.record.columns {
            let sources: Vec<&str> = column.sources.iter().map(String::as_str).collect();
            println!(
                "      {} <- {} ({})",
                column.target,
                if sources.is_empty() { "-".to_string() } else { sources.join(", ") },
                column.transformation
            );
        }
    }
    for failure in &file.analysis.failures {
        match failure.line {
            Some(line) => println!("  [{}] line {}: {}", failure.index + 1, line, failure.error),
            None => println!("  [{}] {}", failure.index + 1, failure.error),
        }
    }
}

fn describe(record: &ExtractionRecord) -> String {
    let mut parts = vec![record.kind.to_string()];
    if let Some(write) = &record.write {
        parts.push(format!("writes {}", write));
    }
    if !record.read.is_empty() {
        let reads: Vec<&str> = record.read.iter().map(String::as_str).collect();
        parts.push(format!("reads {}", reads.join(", ")));
    }
    let objects = record
        .functions_and_procedures
        .iter()
        .chain(record.triggers.iter().map(|t| &t.name))
        .chain(record.synonyms.iter().map(|s| &s.name));
    for name in objects {
        parts.push(format!("defines {}", name));
    }
    for call in &record.procedure_calls {
        parts.push(format!("calls {}", call.name));
    }
    parts.join(", ")
}
