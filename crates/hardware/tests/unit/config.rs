//! Configuration Tests.
//!
//! Verifies JSON parsing with partial documents, file loading, the default
//! machine, and rejection of geometries the pipeline cannot run with.

use std::io::Write;

use oosim_core::config::{BranchPredictorType, Config, FetchPolicy};
use oosim_core::SimError;
use pretty_assertions::assert_eq;
use rstest::rstest;

// ══════════════════════════════════════════════════════════
// Defaults and parsing
// ══════════════════════════════════════════════════════════

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.num_threads(), 4);
    assert_eq!(config.processor.fetch_policy, FetchPolicy::AllThreads);
    assert_eq!(config.branch_predictor.kind, BranchPredictorType::Perfect);
}

#[test]
fn empty_document_yields_defaults() {
    let config = Config::from_json("{}").unwrap();
    let defaults = Config::default();
    assert_eq!(config.processor.decode_width, defaults.processor.decode_width);
    assert_eq!(config.l1d.mshrs, defaults.l1d.mshrs);
    assert_eq!(
        config.simulation.commit_timeout_cycles,
        defaults.simulation.commit_timeout_cycles
    );
}

#[test]
fn partial_sections_keep_other_defaults() {
    let json = r#"{
        "processor": { "threads_per_core": 1, "fetch_policy": "RoundRobin" },
        "branch_predictor": { "kind": "Bimod", "bimod_size": 64 },
        "simulation": { "warmup_instructions": 100, "max_cycles": 5000 }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.processor.threads_per_core, 1);
    assert_eq!(config.processor.fetch_policy, FetchPolicy::RoundRobin);
    assert_eq!(config.processor.num_cores, Config::default().processor.num_cores);
    assert_eq!(config.branch_predictor.kind, BranchPredictorType::TwoBit);
    assert_eq!(config.branch_predictor.bimod_size, 64);
    assert_eq!(config.simulation.warmup_instructions, 100);
    assert_eq!(config.simulation.max_cycles, Some(5000));
}

#[test]
fn malformed_json_is_invalid_config() {
    let err = Config::from_json("{ processor: ").unwrap_err();
    assert!(matches!(err, SimError::InvalidConfig(_)));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "processor": {{ "num_cores": 3 }} }}"#).unwrap();
    let config = Config::from_json_file(file.path()).unwrap();
    assert_eq!(config.processor.num_cores, 3);
}

#[test]
fn missing_file_is_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SimError::InvalidConfig(msg) if msg.contains("absent.json")));
}

// ══════════════════════════════════════════════════════════
// Validation
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::no_cores(r#"{ "processor": { "num_cores": 0 } }"#, "num_cores")]
#[case::no_issue(r#"{ "processor": { "issue_width": 0 } }"#, "issue_width")]
#[case::no_lsq(r#"{ "processor": { "load_store_queue_capacity": 0 } }"#, "load_store_queue_capacity")]
#[case::no_memory_port(r#"{ "functional_units": { "memory_port": 0 } }"#, "memory_port")]
#[case::no_rename_registers(
    r#"{ "processor": { "threads_per_core": 4, "physical_register_file_capacity": 128 } }"#,
    "physical_register_file_capacity"
)]
#[case::odd_page(r#"{ "tlb": { "page_size": 3000 } }"#, "page_size")]
#[case::no_mshrs(r#"{ "l1d": { "mshrs": 0 } }"#, "l1d")]
fn rejects_unrunnable_geometry(#[case] json: &str, #[case] needle: &str) {
    match Config::from_json(json) {
        Err(SimError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig mentioning {needle}, got {other:?}"),
    }
}

#[test]
fn perfect_predictor_ignores_table_geometry() {
    let json = r#"{ "branch_predictor": { "kind": "Perfect", "bimod_size": 3 } }"#;
    assert!(Config::from_json(json).is_ok());
}

#[test]
fn two_bit_predictor_requires_power_of_two_tables() {
    let json = r#"{ "branch_predictor": { "kind": "TwoBit", "bimod_size": 3 } }"#;
    assert!(matches!(Config::from_json(json), Err(SimError::InvalidConfig(_))));
}
