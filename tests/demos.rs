//! The sample programs under `demos/` load and behave as documented.

use ilsim::{load_program, Plc, PlcConfig, Program, ScriptedInputs};
use std::path::PathBuf;
use std::time::Duration;

fn demos_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/demos"))
}

fn demo(name: &str) -> Program {
    load_program(demos_dir().join(name)).unwrap()
}

/// Run `program` for `cycles` scans and return `output` after each one.
fn trace(program: &Program, stimuli: &[&str], output: &str, cycles: usize) -> Vec<bool> {
    let mut plc = Plc::new(&PlcConfig::default());
    let mut script = ScriptedInputs::new(stimuli.iter().map(|s| s.parse().unwrap()).collect());
    plc.run();

    (0..cycles)
        .map(|_| {
            let report = plc.scan(program, &mut script, &mut ()).unwrap();
            assert!(report.is_clean(), "{:?}", report.errors);
            plc.outputs().get(output).unwrap()
        })
        .collect()
}

#[test]
fn every_demo_scans_clean() {
    let mut names: Vec<_> = std::fs::read_dir(demos_dir())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "il"))
        .collect();
    names.sort();
    assert!(names.len() >= 5, "{names:?}");

    for path in names {
        let program = load_program(&path).unwrap();
        let mut plc = Plc::new(&PlcConfig::default());
        let mut script = ScriptedInputs::new(vec!["I0.0@2..4".parse().unwrap()]);
        plc.run();
        for cycle in 1..=8 {
            let report = plc.scan(&program, &mut script, &mut ()).unwrap();
            assert!(report.is_clean(), "{}: {:?}", path.display(), report.errors);
            assert_eq!(report.cycle, cycle);
            assert!(report.elapsed < Duration::from_secs(1));
        }
    }
}

#[test]
fn start_stop_latches_until_stop() {
    let seen = trace(&demo("start_stop.il"), &["I0.0@2", "I0.1@5"], "Q0.0", 6);
    assert_eq!(seen, vec![false, true, true, true, false, false]);
}

#[test]
fn on_delay_switches_on_after_preset() {
    let seen = trace(&demo("on_delay.il"), &["I0.0@2.."], "Q0.0", 8);
    assert!(seen[..4].iter().all(|q| !q), "{seen:?}");
    assert!(seen[5..].iter().all(|q| *q), "{seen:?}");
}

#[test]
fn off_delay_holds_after_release() {
    let seen = trace(&demo("off_delay.il"), &["I0.0@2..3"], "Q0.0", 10);
    assert_eq!(
        seen,
        vec![false, false, true, true, true, false, false, false, false, false]
    );
}

#[test]
fn up_counter_done_on_third_pulse() {
    let seen = trace(&demo("up_counter.il"), &["I0.0@2", "I0.0@4", "I0.0@6"], "Q0.0", 7);
    assert_eq!(seen, vec![false, false, false, false, false, true, true]);
}

#[test]
fn gates_follow_truth_table() {
    let program = demo("gates.il");
    for (stimuli, and, or, xor) in [
        (vec![], false, false, false),
        (vec!["I0.0"], false, true, true),
        (vec!["I0.1"], false, true, true),
        (vec!["I0.0", "I0.1"], true, true, false),
    ] {
        let got: Vec<bool> = ["Q0.0", "Q0.1", "Q0.2"]
            .iter()
            .map(|q| trace(&program, &stimuli, q, 1)[0])
            .collect();
        assert_eq!(got, vec![and, or, xor], "{stimuli:?}");
    }
}
