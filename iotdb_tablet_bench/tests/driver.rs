use iotdb_client::{Column, Session, TSDataType, Tablet, TabletValues, Value};
use iotdb_tablet_bench::{
    driver::{Error, RunConfig, performance_test},
    encoder::{Encoding, canonical_value},
    memory::{DATA_TYPE_MISMATCH, MemorySession},
    validation::ValidationError,
};
use pretty_assertions::assert_eq;

fn small_run(
    data_types: Vec<TSDataType>,
    encoding: Encoding,
    rows: usize,
    columns: usize,
) -> RunConfig {
    RunConfig {
        data_types,
        encoding,
        validate: true,
        rows,
        columns,
        ..Default::default()
    }
}

#[test_log::test(tokio::test)]
async fn smoke_scenario() {
    let mut session = MemorySession::default().with_retained_values();
    let config = small_run(vec![TSDataType::Float], Encoding::Row, 3, 1);

    let report = performance_test(&mut session, &config).await.unwrap();

    assert_eq!(report.batches(), 1);
    assert_eq!(session.device_ids().collect::<Vec<_>>(), ["root.sg0.0"]);
    let series = session.device("root.sg0.0").unwrap().get("s0").unwrap();
    assert_eq!(series.data_type(), TSDataType::Float);
    assert_eq!(series.timestamps(), vec![0, 1, 2]);
    assert_eq!(series.values(), Some(vec![Value::Float(1.2); 3]));
    assert_eq!(session.insert_calls(), 1);
    assert_eq!(session.query_calls(), 1);
    assert_eq!(session.close_calls(), 1);
    assert!(!session.is_open());

    let printed = report.to_string();
    assert!(printed.contains("use time: "), "{printed}");
    assert!(printed.contains("insert time: "), "{printed}");
}

#[test_log::test(tokio::test)]
async fn every_series_gets_one_tablet() {
    for encoding in [Encoding::Row, Encoding::Columnar] {
        let mut session = MemorySession::default().with_retained_values();
        let config = small_run(TSDataType::ALL.to_vec(), encoding, 4, 10);

        performance_test(&mut session, &config).await.unwrap();

        let ids: Vec<_> = session.device_ids().map(ToOwned::to_owned).collect();
        assert_eq!(ids.len(), 10);
        for index in 0..10 {
            let device = session
                .device(&format!("root.sg{}.{index}", index % 8))
                .unwrap_or_else(|| panic!("{encoding}: series {index} missing"));
            assert_eq!(device.series().len(), TSDataType::ALL.len());
            for (col, series) in device.series().iter().enumerate() {
                assert_eq!(series.measurement(), format!("s{col}"));
                assert_eq!(
                    series.values(),
                    Some(vec![canonical_value(TSDataType::ALL[col]); 4])
                );
            }
        }
        assert_eq!(session.insert_calls(), 10);
        assert_eq!(session.query_calls(), 10);
    }
}

#[test_log::test(tokio::test)]
async fn row_and_columnar_store_the_same_points() {
    let mut stores = Vec::new();
    for encoding in [Encoding::Row, Encoding::Columnar] {
        let mut session = MemorySession::default().with_retained_values();
        let config = RunConfig {
            random_values: true,
            seed: 17,
            ..small_run(TSDataType::ALL.to_vec(), encoding, 6, 3)
        };
        performance_test(&mut session, &config).await.unwrap();
        stores.push(session);
    }

    let (row, columnar) = (&stores[0], &stores[1]);
    for device_id in row.device_ids() {
        let row_device = row.device(device_id).unwrap();
        let columnar_device = columnar.device(device_id).unwrap();
        for (a, b) in row_device.series().iter().zip(columnar_device.series()) {
            assert_eq!(a.timestamps(), b.timestamps());
            assert!(a.values().is_some());
            assert_eq!(a.values(), b.values());
        }
    }
}

#[test_log::test(tokio::test)]
async fn empty_tablets_are_still_inserted_and_counted() {
    let mut session = MemorySession::default();
    let config = small_run(vec![TSDataType::Int64], Encoding::Columnar, 0, 2);

    let report = performance_test(&mut session, &config).await.unwrap();

    assert_eq!(report.batches(), 2);
    assert_eq!(session.insert_calls(), 2);
    assert_eq!(session.query_calls(), 2);
    assert_eq!(
        session.device("root.sg1.1").unwrap().get("s0").unwrap().count(),
        0
    );
}

#[test_log::test(tokio::test)]
async fn dry_run_store_keeps_only_timestamps() {
    let mut session = MemorySession::default();
    let config = small_run(TSDataType::ALL.to_vec(), Encoding::Columnar, 2_000, 16);

    performance_test(&mut session, &config).await.unwrap();

    for device_id in session.device_ids() {
        for series in session.device(device_id).unwrap().series() {
            assert_eq!(series.count(), 2_000);
            assert_eq!(series.values(), None, "{device_id}.{}", series.measurement());
        }
    }
}

#[test_log::test(tokio::test)]
async fn use_time_covers_insert_time() {
    let mut session = MemorySession::default();
    let config = small_run(TSDataType::ALL.to_vec(), Encoding::Row, 50, 20);

    let report = performance_test(&mut session, &config).await.unwrap();

    assert!(report.total() >= report.insert());
}

#[test_log::test(tokio::test)]
async fn insert_failure_aborts_and_closes() {
    let mut session = MemorySession::default();
    // s0 of the second series already exists with another type
    session.open().await.unwrap();
    let existing = Tablet::try_new(
        "root.sg1.1",
        vec!["s0".into()],
        vec![TSDataType::Int32],
        TabletValues::Columns(vec![Column::Int32(vec![1])]),
        vec![100],
    )
    .unwrap();
    session.insert_tablet(&existing).await.unwrap();

    let config = small_run(vec![TSDataType::Float], Encoding::Columnar, 3, 4);
    let err = performance_test(&mut session, &config).await.unwrap_err();

    match err {
        Error::Insert { device_id, source } => {
            assert_eq!(device_id, "root.sg1.1");
            assert!(
                matches!(source, iotdb_client::Error::Server { code: DATA_TYPE_MISMATCH, .. }),
                "{source}"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!session.is_open());
    // nothing after the failing series was attempted
    assert!(session.device("root.sg2.2").is_none());
    assert_eq!(session.insert_calls(), 3);
}

#[test_log::test(tokio::test)]
async fn count_mismatch_fails_validation() {
    let mut session = MemorySession::default();
    session.open().await.unwrap();
    let extra_point = Tablet::try_new(
        "root.sg0.0",
        vec!["s0".into()],
        vec![TSDataType::Float],
        TabletValues::Rows(vec![vec![Value::Float(9.0)]]),
        vec![1_000],
    )
    .unwrap();
    session.insert_tablet(&extra_point).await.unwrap();

    let config = small_run(vec![TSDataType::Float], Encoding::Row, 3, 2);
    let err = performance_test(&mut session, &config).await.unwrap_err();

    assert!(
        matches!(
            err,
            Error::Validation {
                ref device_id,
                source: ValidationError::CountMismatch {
                    expected: 3,
                    actual: 4
                }
            } if device_id == "root.sg0.0"
        ),
        "{err}"
    );
    assert!(!session.is_open());
}

#[tokio::test]
async fn empty_schema_is_rejected_before_opening() {
    let mut session = MemorySession::default();
    let config = small_run(vec![], Encoding::Row, 3, 1);

    let err = performance_test(&mut session, &config).await.unwrap_err();

    assert!(matches!(err, Error::EmptySchema), "{err}");
    assert_eq!(session.insert_calls(), 0);
    assert!(!session.is_open());
}
