use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::{
    app::{GlobalOptions, RewriteOptions},
    commands::common::{build_config, load_pipeline, DiagnosticEntry, SiteEntry},
    output::print_output,
};

#[derive(Debug, Serialize)]
struct ReplacementEntry {
    caller: String,
    block: String,
    index: usize,
    original: String,
    replacement: String,
    argument: i32,
}

#[derive(Debug, Serialize)]
struct RewriteOutput {
    path: String,
    stages: Vec<String>,
    sites: Vec<SiteEntry>,
    replacements: Vec<ReplacementEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<DiagnosticEntry>,
    program: String,
    #[serde(skip)]
    rendered: Option<String>,
}

pub fn run(path: &Path, options: &RewriteOptions, opts: &GlobalOptions) -> anyhow::Result<()> {
    let mut pipeline = load_pipeline(path, build_config(options, !opts.json))?;
    let run = pipeline
        .run()
        .with_context(|| format!("failed to transform: {}", path.display()))?;

    let output = RewriteOutput {
        path: path.display().to_string(),
        stages: run.stages.iter().map(ToString::to_string).collect(),
        sites: run.sites.iter().map(SiteEntry::from).collect(),
        replacements: run
            .replacements
            .iter()
            .map(|r| ReplacementEntry {
                caller: r.caller.clone(),
                block: r.block.clone(),
                index: r.location.index,
                original: r.original.clone(),
                replacement: r.replacement.clone(),
                argument: r.argument,
            })
            .collect(),
        warnings: run.warnings.iter().map(DiagnosticEntry::from).collect(),
        program: pipeline.program().to_string(),
        rendered: run.rendered,
    };

    print_output(&output, opts, |o| {
        if let Some(rendered) = &o.rendered {
            print!("{rendered}");
        }
    })
}
