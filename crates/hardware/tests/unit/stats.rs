//! Statistics Tests.
//!
//! Verifies aggregation across threads, IPC over the measurement window, the
//! sectioned text report and JSON serialization.

use oosim_core::stats::{CoreStats, SimStats, ThreadStats};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn sample() -> SimStats {
    let mut t0 = ThreadStats::new(0);
    t0.committed_instructions = 300;
    t0.squashes = 2;
    let mut t1 = ThreadStats::new(1);
    t1.committed_instructions = 100;
    t1.forwarded_loads = 7;
    let mut core = CoreStats::new(0);
    core.aliased_accesses = 4;
    core.l1d.hits = 9;
    core.l1d.misses = 1;
    SimStats {
        cycles: 250,
        measurement_cycles: 200,
        threads: vec![t0, t1],
        cores: vec![core],
    }
}

#[test]
fn committed_instructions_sum_over_threads() {
    assert_eq!(sample().committed_instructions(), 400);
}

#[test]
fn ipc_uses_measurement_window() {
    let stats = sample();
    assert!((stats.ipc() - 2.0).abs() < f64::EPSILON);

    let idle = SimStats {
        measurement_cycles: 0,
        ..sample()
    };
    assert!(idle.ipc().abs() < f64::EPSILON);
}

#[test]
fn full_report_has_every_section() {
    let report = sample().render_sections(&[]);
    for heading in ["sim_ipc", "THREADS", "FUNCTIONAL UNITS", "MEMORY HIERARCHY"] {
        assert!(report.contains(heading), "missing {heading}");
    }
    assert!(report.contains("c0.aliased_accesses 4"));
    assert!(report
        .lines()
        .any(|line| line.starts_with("sim_insts") && line.trim_end().ends_with(" 400")));
}

#[rstest]
#[case::summary("summary", "sim_cycles", "THREADS")]
#[case::threads("threads", "THREADS", "MEMORY HIERARCHY")]
#[case::functional_units("functional_units", "FUNCTIONAL UNITS", "sim_cycles")]
#[case::memory("memory", "MEMORY HIERARCHY", "FUNCTIONAL UNITS")]
fn section_filter(#[case] section: &str, #[case] present: &str, #[case] absent: &str) {
    let report = sample().render_sections(&[section.to_owned()]);
    assert!(report.contains(present));
    assert!(!report.contains(absent));
}

#[test]
fn serializes_counters_by_name() {
    let value = serde_json::to_value(sample()).unwrap();
    assert_eq!(value["cycles"], 250);
    assert_eq!(value["threads"][1]["forwarded_loads"], 7);
    assert_eq!(value["cores"][0]["l1d"]["misses"], 1);
}
