//! End-to-end scenarios for the call-site rewriting pipeline.
//!
//! Each test loads a program from text, runs the full pipeline (or the analysis
//! alone) and checks the observable result: which calls were found, what they
//! were rewritten to, and that the transformed program is still valid.

use callswap::prelude::*;
use std::path::PathBuf;

const TWO_CALLS: &str = r#"
declare void @_Z3foov()

define void @_Z3bari(i32 %I) {
entry:
  ret void
}

define i32 @main() {
entry:
  call void @_Z3foov()
  call void @_Z3foov()
  ret i32 0
}
"#;

fn demo_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/target_program.ll")
}

fn calls_to(program: &Program, symbol: &str) -> Vec<Vec<Operand>> {
    program
        .functions()
        .iter()
        .flat_map(|f| f.blocks())
        .flat_map(|b| b.instructions())
        .filter_map(|i| i.op().as_call())
        .filter(|call| call.callee.symbol() == Some(symbol))
        .map(|call| call.args.clone())
        .collect()
}

fn non_call_text(program: &Program) -> Vec<String> {
    program
        .functions()
        .iter()
        .flat_map(|f| f.blocks())
        .flat_map(|b| b.instructions())
        .filter(|i| i.category() != InstructionCategory::Call)
        .map(ToString::to_string)
        .collect()
}

#[test]
fn two_calls_in_main_are_numbered() {
    let mut pipeline = Pipeline::from_source(TWO_CALLS, RewriteConfig::default()).unwrap();
    let output = pipeline.run().unwrap();

    assert_eq!(output.sites.len(), 2);
    assert!(output.sites.iter().all(|s| s.caller == "main"));

    let program = pipeline.program();
    assert!(calls_to(program, "_Z3foov").is_empty());
    assert_eq!(
        calls_to(program, "_Z3bari"),
        vec![vec![Operand::i32(1)], vec![Operand::i32(2)]]
    );
    assert!(program.verify().is_valid());
}

#[test]
fn no_calls_leaves_program_unchanged() {
    let source = "declare void @_Z3foov()\ndeclare void @_Z3bari(i32)\n\
                  define i32 @main() {\nentry:\n  ret i32 0\n}\n";
    let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
    let before = pipeline.program().clone();

    let output = pipeline.run().unwrap();
    assert!(output.sites.is_empty());
    assert!(output.replacements.is_empty());
    assert_eq!(pipeline.program(), &before);
}

#[test]
fn missing_replacement_is_fatal() {
    let source = "declare void @_Z3foov()\n\
                  define i32 @main() {\nentry:\n  call void @_Z3foov()\n  ret i32 0\n}\n";
    let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, Error::MissingSymbol(ref name) if name == "_Z3bari"));
    assert_eq!(calls_to(pipeline.program(), "_Z3foov").len(), 1);
}

#[test]
fn indirect_call_is_not_rewritten() {
    let source = r#"
declare void @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  %slot = alloca ptr
  store ptr @_Z3foov, ptr %slot
  %fp = load ptr, ptr %slot
  call void %fp()
  ret i32 0
}
"#;
    let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
    let before = pipeline.program().clone();
    let output = pipeline.run().unwrap();

    assert!(output.sites.is_empty());
    assert_eq!(pipeline.program(), &before);
}

#[test]
fn demo_program_rewrites_every_direct_call() {
    let mut pipeline = Pipeline::from_path(&demo_path(), RewriteConfig::default()).unwrap();
    let before = pipeline.program().clone();
    let output = pipeline.run().unwrap();

    // foo() is called from baz and from main
    let callers: Vec<_> = output.sites.iter().map(|s| s.caller.as_str()).collect();
    assert_eq!(callers, ["_Z3bazv", "main"]);
    let arguments: Vec<_> = output.replacements.iter().map(|r| r.argument).collect();
    assert_eq!(arguments, [1, 2]);

    let after = pipeline.program();
    assert!(after.verify().is_valid());
    assert_eq!(after.function_count(), before.function_count());
    for (old, new) in before.functions().iter().zip(after.functions()) {
        assert_eq!(old.block_count(), new.block_count());
    }
    assert_eq!(non_call_text(after), non_call_text(&before));
    assert!(!output.broken_debug_info());
}

#[test]
fn fresh_runs_restart_numbering() {
    for _ in 0..3 {
        let mut pipeline = Pipeline::from_path(&demo_path(), RewriteConfig::default()).unwrap();
        let output = pipeline.run().unwrap();
        assert_eq!(output.replacements.first().map(|r| r.argument), Some(1));
    }
}

#[test]
fn fixed_policy_uses_the_constant_everywhere() {
    let config = RewriteConfig::default().with_fixed_value(42);
    let mut pipeline = Pipeline::from_path(&demo_path(), config).unwrap();
    pipeline.run().unwrap();
    let calls = calls_to(pipeline.program(), "_Z3bari");
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|args| args == &[Operand::i32(42)]));
}

#[test]
fn exact_matching_uses_linker_symbols() {
    let config = RewriteConfig::new("_Z3foov", "bar(int)").with_match_mode(NameMatch::Exact);
    let mut pipeline = Pipeline::from_path(&demo_path(), config).unwrap();
    let output = pipeline.run().unwrap();
    assert_eq!(output.replacements.len(), 2);
    assert!(output.replacements.iter().all(|r| r.replacement == "_Z3bari"));

    // a demangled target never matches a raw symbol in exact mode
    let config = RewriteConfig::new("foo()", "_Z3bari").with_match_mode(NameMatch::Exact);
    let mut pipeline = Pipeline::from_path(&demo_path(), config).unwrap();
    assert!(pipeline.run().unwrap().sites.is_empty());
}

#[test]
fn mutate_strategy_matches_replace_strategy() {
    let mut replaced = Pipeline::from_path(&demo_path(), RewriteConfig::default()).unwrap();
    replaced.run().unwrap();

    let config = RewriteConfig::default().with_strategy(RewriteStrategy::Mutate);
    let mut mutated = Pipeline::from_path(&demo_path(), config).unwrap();
    mutated.run().unwrap();

    assert_eq!(replaced.program(), mutated.program());
}

#[test]
fn mutate_rejects_a_return_type_mismatch() {
    let source = r#"
declare i32 @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  %v = call i32 @_Z3foov()
  ret i32 %v
}
"#;
    let config = RewriteConfig::default().with_strategy(RewriteStrategy::Mutate);
    let mut pipeline = Pipeline::from_source(source, config).unwrap();
    let before = pipeline.program().clone();

    assert!(matches!(
        pipeline.run(),
        Err(Error::SignatureMismatch { .. })
    ));
    assert_eq!(pipeline.program(), &before);
}

#[test]
fn replace_refuses_to_break_a_use_of_the_result() {
    // %v is used after the call, but bar(int) returns void
    let source = r#"
declare i32 @_Z3foov()
declare void @_Z3bari(i32)

define i32 @main() {
entry:
  %v = call i32 @_Z3foov()
  ret i32 %v
}
"#;
    let mut pipeline = Pipeline::from_source(source, RewriteConfig::default()).unwrap();
    let before = pipeline.program().clone();

    let err = pipeline.run().unwrap_err();
    assert!(matches!(err, Error::SignatureMismatch { .. }));
    assert_eq!(pipeline.program(), &before);
    assert_eq!(pipeline.stage(), PipelineStage::Analyzed);
    assert!(pipeline.program().verify().is_valid());
}

#[test]
fn analysis_is_memoized_until_the_program_changes() {
    let mut program = Program::from_source(TWO_CALLS).unwrap();
    let mut analyses = AnalysisManager::new();
    analyses.register(CallSiteFinder::new("foo()", NameMatch::Demangled));

    let first = analyses.get_result::<CallSiteFinder>(&program).unwrap().clone();
    let second = analyses.get_result::<CallSiteFinder>(&program).unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(analyses.computation_count(), 1);

    let mut replacer = CallSiteReplacer::new("_Z3bari");
    let preserved = replacer.run(&mut program, &mut analyses).unwrap();
    analyses.invalidate(&program, &preserved);

    assert!(analyses
        .get_result::<CallSiteFinder>(&program)
        .unwrap()
        .is_empty());
    assert_eq!(analyses.computation_count(), 2);
}

#[test]
fn stale_sets_are_rejected() {
    let mut program = Program::from_source(TWO_CALLS).unwrap();
    let sites = CallSiteFinder::new("foo()", NameMatch::Demangled).find(&program);

    CallSiteReplacer::new("_Z3bari")
        .replace(&mut program, sites.clone())
        .unwrap();

    let err = CallSiteReplacer::new("_Z3bari")
        .replace(&mut program, sites)
        .unwrap_err();
    assert!(matches!(err, Error::StaleAnalysis { .. }));
}
