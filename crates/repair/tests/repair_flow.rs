//! End-to-end repair flows over a shared in-memory store.

use mend_repair::{EngineError, FailureReason, FragmentMeta, RepairEngine};
use mend_store::{content_hash, FragmentStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn engine() -> RepairEngine {
    RepairEngine::new(Arc::new(FragmentStore::new()))
}

fn meta(filename: &str) -> FragmentMeta {
    FragmentMeta::for_file(filename)
}

#[test]
fn analyze_hashes_and_fingerprints() {
    let engine = engine();
    let code = "function add(a, b) { return a + b; }";

    let fragment = engine.analyze_code(code, &meta("calc.js")).unwrap();

    assert_eq!(fragment.content_hash, content_hash(code));
    assert_eq!(fragment.fingerprint, "FunctionDeclaration:add(2)");
    assert!(fragment.last_good_state);
    assert!(fragment.lineage.is_empty());
}

#[test]
fn analyze_requires_filename() {
    let engine = engine();
    let err = engine
        .analyze_code("let x = 1;", &meta("  "))
        .unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[test]
fn analyze_tolerates_unparseable_input() {
    let engine = engine();
    let fragment = engine
        .analyze_code(
            "function add(a, b) { return a + b; }\n@@garbage@@",
            &meta("calc.js"),
        )
        .unwrap();
    // permissive fallback still sees the declaration
    assert!(fragment.fingerprint.contains("FunctionDeclaration:add(2)"));
}

#[test]
fn clean_code_is_left_alone() {
    let engine = engine();
    // a donor exists, but clean input must not be replaced
    engine
        .analyze_code("function add(a, b) { return a + b; }", &meta("calc.js"))
        .unwrap();

    let outcome = engine
        .repair_code("function add(a, b) { return a + b; }", &meta("calc.js"))
        .unwrap();

    assert!(!outcome.fixed);
    assert_eq!(outcome.repaired_code, None);
    assert_eq!(outcome.diff, None);
    assert_eq!(outcome.reason, Some(FailureReason::NoTransformApplied));
    // idempotent: no new fragment was recorded
    assert_eq!(engine.fragments_for_file("calc.js").len(), 1);
}

#[test]
fn duplicate_methods_elided_last_wins() {
    let engine = engine();
    let broken = "function foo() { return 1; }\nfunction foo() { return 2; }\n";

    let outcome = engine.repair_code(broken, &meta("dup.js")).unwrap();

    assert!(outcome.fixed);
    let repaired = outcome.repaired_code.unwrap();
    assert_eq!(repaired.matches("function foo").count(), 1);
    assert!(repaired.contains("return 2"));
    assert!(!outcome.diff.unwrap().is_empty());
}

#[test]
fn missing_brace_recovered_line_level() {
    let engine = engine();
    let broken = "function add(a, b) { return a + b;";

    let outcome = engine.repair_code(broken, &meta("calc.js")).unwrap();

    assert!(outcome.fixed);
    assert_eq!(
        outcome.repaired_code.unwrap(),
        "function add(a, b) { return a + b;}"
    );
}

#[test]
fn unterminated_element_becomes_self_closing() {
    let engine = engine();
    let outcome = engine
        .repair_code("const panel = <Panel>;", &meta("panel.jsx"))
        .unwrap();

    assert!(outcome.fixed);
    assert!(outcome.repaired_code.unwrap().contains("<Panel />"));
}

#[test]
fn unterminated_element_with_children_falls_through() {
    let engine = engine();
    // Panel is unclosed but has a child: the normalization must not touch
    // it, and with no donors stored the attempt ends as a non-fix.
    let outcome = engine
        .repair_code("const panel = <Panel><Row />;", &meta("panel.jsx"))
        .unwrap();

    assert!(!outcome.fixed);
    assert_eq!(outcome.repaired_code, None);
    assert_eq!(outcome.reason, Some(FailureReason::NoCandidateFound));
}

#[test]
fn closed_element_is_untouched() {
    let engine = engine();
    let outcome = engine
        .repair_code("const panel = <Panel><Row /></Panel>;", &meta("panel.jsx"))
        .unwrap();

    assert!(!outcome.fixed);
    assert_eq!(outcome.reason, Some(FailureReason::NoTransformApplied));
}

#[test]
fn similarity_fallback_uses_known_good_donor() {
    let engine = engine();
    let good = "function add(a, b) { return a + b; }";
    let donor = engine.analyze_code(good, &meta("calc.js")).unwrap();
    assert_eq!(donor.fingerprint, "FunctionDeclaration:add(2)");

    // unparseable and unrecoverable: garbage line is bracket-balanced
    let broken = "function add(a, b) { return a + b; }\n@@garbage@@";
    let outcome = engine.repair_code(broken, &meta("calc.js")).unwrap();

    assert!(outcome.fixed);
    assert_eq!(outcome.repaired_code.as_deref(), Some(good));
    assert!(!outcome.diff.unwrap().is_empty());
}

#[test]
fn no_candidate_is_a_reasoned_non_fix() {
    let engine = engine();
    let outcome = engine
        .repair_code("function broken(a { @@@", &meta("empty.js"))
        .unwrap();

    assert!(!outcome.fixed);
    assert_eq!(outcome.reason, Some(FailureReason::NoCandidateFound));
}

#[test]
fn demoted_fragments_are_not_donors() {
    let engine = engine();
    let good = "function add(a, b) { return a + b; }";
    let donor = engine.analyze_code(good, &meta("calc.js")).unwrap();
    engine.store().mark_not_good(donor.id).unwrap();

    let outcome = engine
        .repair_code(
            "function add(a, b) { return a + b; }\n@@garbage@@",
            &meta("calc.js"),
        )
        .unwrap();

    assert!(!outcome.fixed);
    assert_eq!(outcome.reason, Some(FailureReason::NoCandidateFound));
}

#[test]
fn successful_repair_records_lineage() {
    let engine = engine();
    let good = "function add(a, b) { return a + b; }";
    let donor = engine.analyze_code(good, &meta("calc.js")).unwrap();

    let broken = "function add(a, b) { return a + b; }\n@@garbage@@";
    let outcome = engine.repair_code(broken, &meta("calc.js")).unwrap();
    assert!(outcome.fixed);

    let history = engine.fragments_for_file("calc.js");
    assert_eq!(history.len(), 2);
    let repaired = &history[1];
    assert_eq!(repaired.parent_id, Some(donor.id));
    assert_eq!(repaired.lineage, vec![donor.id]);
    assert_eq!(repaired.code, good);
    assert_eq!(
        repaired.metadata.get("origin").and_then(|v| v.as_str()),
        Some("repair")
    );
}

#[test]
fn unsupported_language_degrades_without_panic() {
    let engine = engine();
    let outcome = engine
        .repair_code("func main() {\n\tfmt.Println(1)\n}", &meta("main.go"))
        .unwrap();
    assert!(!outcome.fixed);
}

#[test]
fn repair_requires_filename() {
    let engine = engine();
    let err = engine.repair_code("let x = 1;", &meta("")).unwrap_err();
    assert!(matches!(err, EngineError::Configuration(_)));
}

#[test]
fn repair_outcome_serializes_camel_case() {
    let engine = engine();
    let outcome = engine
        .repair_code(
            "function foo() { return 1; }\nfunction foo() { return 2; }\n",
            &meta("dup.js"),
        )
        .unwrap();

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["fixed"], true);
    assert!(json.get("repairedCode").is_some());
    assert!(json.get("reason").is_none());
}
