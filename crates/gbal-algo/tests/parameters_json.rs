use gbal_algo::{BalanceComputationParameters, BalanceType, MismatchMode};
use std::fs;
use tempfile::tempdir;

#[test]
fn parameters_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("balance.json");

    let mut parameters = BalanceComputationParameters::new(0.5, 10).unwrap();
    parameters.mismatch_mode = MismatchMode::Max;
    parameters.load_flow_parameters.distributed_slack = false;
    parameters.write(&path).unwrap();

    let read = BalanceComputationParameters::read(&path).unwrap();
    assert_eq!(read.threshold_net_position(), 0.5);
    assert_eq!(read.max_number_iterations(), 10);
    assert_eq!(read.mismatch_mode, MismatchMode::Max);
    assert!(!read.load_flow_parameters.distributed_slack);
    assert!(read.with_load_flow);
}

#[test]
fn update_from_partial_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("update.json");
    fs::write(
        &path,
        r#"{
            "version": "1.0",
            "maxNumberIterations": 8,
            "loadFlowParameters": { "balanceType": "PROPORTIONAL_TO_GENERATION_P" }
        }"#,
    )
    .unwrap();

    let mut parameters = BalanceComputationParameters::new(2.0, 5).unwrap();
    parameters.update(&path).unwrap();
    assert_eq!(parameters.threshold_net_position(), 2.0);
    assert_eq!(parameters.max_number_iterations(), 8);
    assert_eq!(
        parameters.load_flow_parameters.balance_type,
        BalanceType::ProportionalToGenerationP
    );
}

#[test]
fn invalid_files_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");

    fs::write(&path, r#"{"thresholdNetPosition": -3.0}"#).unwrap();
    assert!(BalanceComputationParameters::read(&path).is_err());

    fs::write(&path, r#"{"mismatchMode": "CUBIC"}"#).unwrap();
    assert!(BalanceComputationParameters::read(&path).is_err());

    fs::write(&path, "[1, 2]").unwrap();
    let mut parameters = BalanceComputationParameters::default();
    assert!(parameters.update(&path).is_err());

    assert!(BalanceComputationParameters::read(&dir.path().join("missing.json")).is_err());
}
