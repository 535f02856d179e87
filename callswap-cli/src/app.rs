use std::path::PathBuf;

use callswap::{
    analysis::NameMatch,
    transform::{ArgumentPolicy, RewriteStrategy},
};
use clap::Parser;

/// callswap - redirect every direct call of one function to another
#[derive(Debug, Parser)]
#[command(name = "callswap", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(flatten)]
    pub rewrite: RewriteOptions,

    /// Path to the program text file.
    #[arg(value_name = "FILE")]
    pub path: PathBuf,
}

/// Options controlling output and logging.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit a JSON report instead of the transformed program.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Only list the located call sites; do not transform.
    #[arg(long)]
    pub dry_run: bool,
}

/// Options selecting what is rewritten and how.
#[derive(Debug, Parser)]
pub struct RewriteOptions {
    /// Function whose call sites are rewritten.
    #[arg(long, value_name = "NAME", default_value = "foo()")]
    pub target: String,

    /// Function the calls are redirected to (raw symbol or demangled name).
    #[arg(long, value_name = "NAME", default_value = "_Z3bari")]
    pub replacement: String,

    /// How the target is compared against symbols: exact or demangled.
    #[arg(long = "match", value_name = "MODE", default_value = "demangled")]
    pub match_mode: NameMatch,

    /// How the injected argument is chosen: counter or fixed.
    #[arg(long, value_name = "POLICY", default_value = "counter")]
    pub policy: ArgumentPolicy,

    /// Constant injected under the fixed policy.
    #[arg(long, value_name = "N", default_value_t = 42, allow_hyphen_values = true)]
    pub fixed_value: i32,

    /// First value of the counter.
    #[arg(long, value_name = "N", default_value_t = 1, allow_hyphen_values = true)]
    pub counter_seed: i32,

    /// How each call is rewritten: replace or mutate.
    #[arg(long, value_name = "STRATEGY", default_value = "replace")]
    pub strategy: RewriteStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["callswap", "prog.ll"]).unwrap();
        assert_eq!(cli.rewrite.target, "foo()");
        assert_eq!(cli.rewrite.replacement, "_Z3bari");
        assert_eq!(cli.rewrite.match_mode, NameMatch::Demangled);
        assert_eq!(cli.rewrite.policy, ArgumentPolicy::Counter);
        assert_eq!(cli.rewrite.strategy, RewriteStrategy::Replace);
        assert_eq!(cli.rewrite.fixed_value, 42);
        assert_eq!(cli.rewrite.counter_seed, 1);
        assert!(!cli.global.dry_run);
    }

    #[test]
    fn test_options() {
        let cli = Cli::try_parse_from([
            "callswap",
            "--match",
            "exact",
            "--policy",
            "fixed",
            "--fixed-value",
            "-3",
            "--strategy",
            "mutate",
            "--json",
            "prog.ll",
        ])
        .unwrap();
        assert_eq!(cli.rewrite.match_mode, NameMatch::Exact);
        assert_eq!(cli.rewrite.policy, ArgumentPolicy::Fixed);
        assert_eq!(cli.rewrite.fixed_value, -3);
        assert_eq!(cli.rewrite.strategy, RewriteStrategy::Mutate);
        assert!(cli.global.json);
    }

    #[test]
    fn test_argument_count() {
        assert!(Cli::try_parse_from(["callswap"]).is_err());
        assert!(Cli::try_parse_from(["callswap", "a.ll", "b.ll"]).is_err());
        assert!(Cli::try_parse_from(["callswap", "--policy", "random", "a.ll"]).is_err());
    }
}
