use std::fs;

use comms::{
    GlobalUpdate, ParameterVector,
    specs::{EndOfData, ModelSpec, SplitSpec, WorkerSpec},
};
use machine_learning::RecordFactoryRegistry;
use worker::{WorkerDriver, WorkerErr};

fn spec(records: &[&str], batch_size: usize, end_of_data: EndOfData) -> WorkerSpec {
    WorkerSpec {
        worker_id: "0".into(),
        model: ModelSpec::new(3, 2),
        batch_size,
        record_factory: "csv".into(),
        split: SplitSpec::Inline {
            records: records.iter().map(|r| r.to_string()).collect(),
        },
        end_of_data,
        learning_rate: 0.5,
    }
}

fn driver(records: &[&str], batch_size: usize, end_of_data: EndOfData) -> WorkerDriver {
    WorkerDriver::setup(&spec(records, batch_size, end_of_data), &RecordFactoryRegistry::default()).unwrap()
}

const RECORDS: [&str; 5] = ["1,1,0", "0,0,1", "1,2,0", "0,0,2", "1,1,1"];

#[test]
fn setup_rejects_invalid_specs() {
    let registry = RecordFactoryRegistry::default();

    let unknown = WorkerSpec {
        record_factory: "arff".into(),
        ..spec(&RECORDS, 2, EndOfData::Wrap)
    };
    assert!(matches!(WorkerDriver::setup(&unknown, &registry), Err(WorkerErr::Config(_))));

    let no_batch = spec(&RECORDS, 0, EndOfData::Wrap);
    assert!(matches!(WorkerDriver::setup(&no_batch, &registry), Err(WorkerErr::Config(_))));

    let no_features = WorkerSpec {
        model: ModelSpec::new(0, 2),
        ..spec(&RECORDS, 2, EndOfData::Wrap)
    };
    assert!(matches!(WorkerDriver::setup(&no_features, &registry), Err(WorkerErr::Config(_))));
}

#[test]
fn setup_starts_from_the_initial_value() {
    let spec = WorkerSpec {
        model: ModelSpec {
            initial_value: -1.,
            ..ModelSpec::new(3, 2)
        },
        ..spec(&RECORDS, 2, EndOfData::Wrap)
    };

    let driver = WorkerDriver::setup(&spec, &RecordFactoryRegistry::default()).unwrap();
    assert_eq!(driver.params(), &ParameterVector::filled(-1., 6));
    assert_eq!(driver.round(), 0);
}

#[test]
fn split_smaller_than_a_batch_is_not_an_error() {
    let mut driver = driver(&RECORDS[..1], 4, EndOfData::Wrap);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 4);
    assert!(report.wrapped);
}

#[test]
fn batches_wrap_around_the_split() {
    let mut driver = driver(&RECORDS, 2, EndOfData::Wrap);

    for _ in 0..2 {
        let report = driver.run_next_training_batch().unwrap();
        assert_eq!(report.records, 2);
        assert!(!report.wrapped);
        assert!(report.mean_loss.is_some());
    }

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 2);
    assert!(report.wrapped);
    assert!(!report.exhausted);
}

#[test]
fn malformed_records_are_skipped() {
    let records = ["1,1,0", "garbage", "0,0,1", "5,1"];
    let mut driver = driver(&records, 2, EndOfData::Wrap);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!((report.records, report.skipped), (2, 1));

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!((report.records, report.skipped), (2, 2));
    assert!(report.wrapped);
}

#[test]
fn stop_policy_ends_the_split() {
    let mut driver = driver(&RECORDS[..3], 2, EndOfData::Stop);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 2);
    assert!(!report.exhausted);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 1);
    assert!(report.exhausted);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 0);
    assert_eq!(report.mean_loss, None);
    assert!(report.exhausted);
    assert!(driver.is_exhausted());
}

#[test]
fn wrapping_a_split_without_usable_records_exhausts_it() {
    let mut driver = driver(&["bad", "worse"], 3, EndOfData::Wrap);

    let report = driver.run_next_training_batch().unwrap();
    assert_eq!((report.records, report.skipped), (0, 2));
    assert!(report.exhausted);

    let mut empty = self::driver(&[], 3, EndOfData::Wrap);
    assert!(empty.run_next_training_batch().unwrap().exhausted);
}

#[test]
fn update_messages_take_the_delta() {
    let mut driver = driver(&RECORDS, 2, EndOfData::Wrap);
    driver.run_next_training_batch().unwrap();

    let first = driver.generate_update_message();
    assert_eq!(first.worker_id, "0");
    assert_eq!(first.round_id, 0);
    assert_eq!(first.observed_batch_size, 2);
    assert_eq!(first.delta.len(), 6);
    assert!(!first.delta.is_zero());
    assert!(first.delta.bits_eq(driver.params()));

    let second = driver.generate_update_message();
    assert!(second.delta.is_zero());
    assert_eq!(second.observed_batch_size, 0);
}

#[test]
fn parameters_of_another_size_are_rejected() {
    let mut driver = driver(&RECORDS, 2, EndOfData::Wrap);
    driver.run_next_training_batch().unwrap();
    let before = driver.params().clone();

    let msg = GlobalUpdate::new(ParameterVector::zeros(7), 0);
    let err = driver.process_incoming_parameter_vector_message(&msg).unwrap_err();

    assert!(matches!(
        err,
        WorkerErr::DimensionMismatch {
            round: 0,
            got: 7,
            expected: 6
        }
    ));
    assert!(driver.params().bits_eq(&before));
    assert_eq!(driver.round(), 0);
    assert!(!driver.generate_update_message().delta.is_zero());
}

#[test]
fn parameters_replace_the_local_model() {
    let mut driver = driver(&RECORDS, 2, EndOfData::Wrap);
    driver.run_next_training_batch().unwrap();

    let global = ParameterVector::from(vec![0.5, -0., 1., 2., 3., 4.]);
    let msg = GlobalUpdate::new(global.clone(), 0);
    driver.process_incoming_parameter_vector_message(&msg).unwrap();

    assert!(driver.params().bits_eq(&global));
    assert_eq!(driver.round(), 1);

    let update = driver.generate_update_message();
    assert!(update.delta.is_zero());
    assert_eq!(update.round_id, 1);
}

#[test]
fn reads_file_splits() {
    let path = std::env::temp_dir().join(format!("worker-driver-{}.csv", std::process::id()));
    fs::write(&path, RECORDS.join("\n")).unwrap();
    let len = fs::metadata(&path).unwrap().len();

    let spec = WorkerSpec {
        split: SplitSpec::File {
            path: path.clone(),
            start: 0,
            end: len,
        },
        ..spec(&[], 5, EndOfData::Stop)
    };

    let mut driver = WorkerDriver::setup(&spec, &RecordFactoryRegistry::default()).unwrap();
    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 5);

    fs::remove_file(path).unwrap();
}

#[test]
fn missing_file_fails_setup() {
    let spec = WorkerSpec {
        split: SplitSpec::File {
            path: "/definitely/not/here.csv".into(),
            start: 0,
            end: 10,
        },
        ..spec(&[], 5, EndOfData::Stop)
    };

    let res = WorkerDriver::setup(&spec, &RecordFactoryRegistry::default());
    assert!(matches!(res, Err(WorkerErr::Io(_))));
}

#[test]
fn file_split_smaller_than_a_batch_wraps() {
    let path = std::env::temp_dir().join(format!("worker-driver-small-{}.csv", std::process::id()));
    fs::write(&path, RECORDS[..2].join("\n")).unwrap();
    let len = fs::metadata(&path).unwrap().len();

    let spec = WorkerSpec {
        split: SplitSpec::File {
            path: path.clone(),
            start: 0,
            end: len,
        },
        ..spec(&[], 5, EndOfData::Wrap)
    };

    let mut driver = WorkerDriver::setup(&spec, &RecordFactoryRegistry::default()).unwrap();
    let report = driver.run_next_training_batch().unwrap();
    assert_eq!(report.records, 5);
    assert!(report.wrapped);

    fs::remove_file(path).unwrap();
}

#[test]
fn debug_output_names_the_worker() {
    let driver = driver(&RECORDS, 2, EndOfData::Stop);

    let debug = format!("{driver:?}");
    assert!(debug.starts_with("WorkerDriver"));
    assert!(debug.contains(r#"worker_id: "0""#));
    assert!(debug.contains("Stop"));
}

#[test]
fn parameters_of_any_round_are_adopted() {
    let mut driver = driver(&RECORDS, 2, EndOfData::Wrap);
    let update = GlobalUpdate::new(ParameterVector::filled(0.5, 6), 7);

    driver.process_incoming_parameter_vector_message(&update).unwrap();
    assert!(driver.params().bits_eq(&update.vector));
    assert_eq!(driver.round(), 8);
}
