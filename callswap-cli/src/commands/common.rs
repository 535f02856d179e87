use std::path::Path;

use anyhow::Context;
use callswap::{
    analysis::CallSite,
    ir::Diagnostic,
    pipeline::{Pipeline, RewriteConfig},
    utils::demangle,
};
use serde::Serialize;

use crate::app::RewriteOptions;

#[derive(Debug, Serialize)]
pub struct SiteEntry {
    pub caller: String,
    pub block: String,
    pub index: usize,
    pub callee: String,
    pub demangled: String,
}

impl From<&CallSite> for SiteEntry {
    fn from(site: &CallSite) -> Self {
        SiteEntry {
            caller: site.caller.clone(),
            block: site.block.clone(),
            index: site.location.index,
            callee: site.callee.clone(),
            demangled: demangle(&site.callee).into_owned(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnosticEntry {
    pub severity: String,
    pub category: String,
    pub message: String,
}

impl From<&Diagnostic> for DiagnosticEntry {
    fn from(d: &Diagnostic) -> Self {
        DiagnosticEntry {
            severity: d.severity.to_string(),
            category: d.category.to_string(),
            message: d.message.clone(),
        }
    }
}

/// Build the rewrite configuration from the command-line options.
pub fn build_config(options: &RewriteOptions, print: bool) -> RewriteConfig {
    RewriteConfig {
        target: options.target.clone(),
        replacement: options.replacement.clone(),
        match_mode: options.match_mode,
        policy: options.policy,
        fixed_value: options.fixed_value,
        strategy: options.strategy,
        counter_seed: options.counter_seed,
        print,
    }
}

/// Load and parse a program file into a fresh pipeline.
pub fn load_pipeline(path: &Path, config: RewriteConfig) -> anyhow::Result<Pipeline> {
    Pipeline::from_path(path, config)
        .with_context(|| format!("failed to load program: {}", path.display()))
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |f| f.to_string_lossy().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_the_io_cause_once() {
        let path = Path::new("/nonexistent/callswap/missing.ll");
        let Err(err) = load_pipeline(path, RewriteConfig::default()) else {
            panic!("loading a missing file succeeded");
        };

        let cause = err.root_cause().to_string();
        let message = format!("{err:#}");
        assert!(message.starts_with("failed to load program: /nonexistent/callswap/missing.ll"));
        assert_eq!(message.matches(cause.as_str()).count(), 1);
    }

    #[test]
    fn display_name_is_the_file_name() {
        assert_eq!(file_display_name(Path::new("demos/target_program.ll")), "target_program.ll");
    }
}
