use std::path::Path;

use anyhow::Context;
use comfy_table::{presets, CellAlignment, Table};
use serde::Serialize;

use crate::{
    app::{GlobalOptions, RewriteOptions},
    commands::common::{build_config, file_display_name, load_pipeline, DiagnosticEntry, SiteEntry},
    output::print_output,
};

#[derive(Debug, Serialize)]
struct FindOutput {
    path: String,
    target: String,
    stages: Vec<String>,
    sites: Vec<SiteEntry>,
    count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<DiagnosticEntry>,
}

pub fn run(path: &Path, options: &RewriteOptions, opts: &GlobalOptions) -> anyhow::Result<()> {
    let mut pipeline = load_pipeline(path, build_config(options, false))?;
    let analysis = pipeline
        .analyze()
        .with_context(|| format!("analysis failed for: {}", path.display()))?;

    let sites: Vec<SiteEntry> = analysis.sites.iter().map(SiteEntry::from).collect();
    let output = FindOutput {
        path: path.display().to_string(),
        target: options.target.clone(),
        stages: analysis.stages.iter().map(ToString::to_string).collect(),
        count: sites.len(),
        sites,
        warnings: analysis.warnings.iter().map(DiagnosticEntry::from).collect(),
    };

    print_output(&output, opts, |o| {
        println!(
            "{} call site(s) to '{}' in {}",
            o.count,
            o.target,
            file_display_name(path)
        );
        if o.sites.is_empty() {
            return;
        }
        println!();
        println!("{}", site_table(&o.sites));
    })
}

/// Render the sites as whitespace-aligned columns, indented by two spaces.
fn site_table(sites: &[SiteEntry]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_header(["Caller", "Block", "#", "Callee", "Demangled"]);
    for site in sites {
        table.add_row(vec![
            site.caller.clone(),
            site.block.clone(),
            site.index.to_string(),
            site.callee.clone(),
            site.demangled.clone(),
        ]);
    }
    if let Some(column) = table.column_mut(2) {
        column.set_cell_alignment(CellAlignment::Right);
    }

    table
        .to_string()
        .lines()
        .map(|line| format!("  {}", line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}
