//! Fail-fast checks that inserted data is visible to queries.

use std::num::NonZeroUsize;

use iotdb_client::Session;
use observability_deps::tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("select count has no result")]
    NoResult,

    #[error("select count returned a row without fields")]
    EmptyRow,

    #[error("select count returned more than one line")]
    MoreThanOneLine,

    #[error("count result error: expected {expected} but got {actual}")]
    CountMismatch { expected: i64, actual: i64 },

    #[error("count query failed: {0}")]
    Query(#[from] iotdb_client::Error),
}

/// The statement counting every point of `device_id`
pub fn count_statement(device_id: &str) -> String {
    format!("select count(*) from {device_id}")
}

/// Run `sql`, which must be a count statement, and check that it yields exactly one row whose
/// first field equals `expected`
pub async fn check_count<S: Session + ?Sized>(
    session: &mut S,
    expected: i64,
    sql: &str,
) -> Result<(), ValidationError> {
    info!(sql, "execute query for validation");
    let mut data_set = session
        .execute_query_statement_with_fetch_size(sql, NonZeroUsize::MIN)
        .await?;

    let line = data_set.next().ok_or(ValidationError::NoResult)?;
    let actual = line
        .fields()
        .first()
        .ok_or(ValidationError::EmptyRow)?
        .long_value()?;
    if actual != expected {
        return Err(ValidationError::CountMismatch { expected, actual });
    }
    if data_set.has_next() {
        return Err(ValidationError::MoreThanOneLine);
    }
    data_set.close_operation_handle();

    info!(sql, count = actual, "query validation passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use async_trait::async_trait;
    use iotdb_client::{Field, RowRecord, SessionDataSet, Tablet, Value};

    use super::*;

    /// Answers every query with a fixed set of rows
    #[derive(Debug)]
    struct CannedSession {
        rows: Vec<RowRecord>,
        last_fetch_size: Option<NonZeroUsize>,
    }

    impl CannedSession {
        fn new(rows: Vec<RowRecord>) -> Self {
            Self {
                rows,
                last_fetch_size: None,
            }
        }
    }

    #[async_trait]
    impl Session for CannedSession {
        async fn open(&mut self) -> iotdb_client::Result<()> {
            Ok(())
        }

        async fn insert_tablet(&mut self, _tablet: &Tablet) -> iotdb_client::Result<()> {
            Ok(())
        }

        async fn execute_query_statement_with_fetch_size(
            &mut self,
            _sql: &str,
            fetch_size: NonZeroUsize,
        ) -> iotdb_client::Result<SessionDataSet> {
            self.last_fetch_size = Some(fetch_size);
            Ok(SessionDataSet::new(vec![], self.rows.clone()))
        }

        async fn close(&mut self) -> iotdb_client::Result<()> {
            Ok(())
        }

        fn fetch_size(&self) -> NonZeroUsize {
            NonZeroUsize::new(1024).unwrap()
        }
    }

    fn count_row(count: i64) -> RowRecord {
        RowRecord::new(None, vec![Field::new(Some(Value::Int64(count)))])
    }

    #[tokio::test]
    async fn matching_count_passes_with_fetch_size_one() {
        let mut session = CannedSession::new(vec![count_row(3)]);
        check_count(&mut session, 3, &count_statement("root.sg0.0"))
            .await
            .unwrap();
        assert_eq!(session.last_fetch_size.map(NonZeroUsize::get), Some(1));
    }

    #[tokio::test]
    async fn zero_count_is_a_result() {
        let mut session = CannedSession::new(vec![count_row(0)]);
        check_count(&mut session, 0, "select count(*) from root.sg0.0")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn no_rows() {
        let mut session = CannedSession::new(vec![]);
        let err = check_count(&mut session, 3, "select count(*) from root.sg0.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::NoResult), "{err}");
    }

    #[tokio::test]
    async fn too_many_rows() {
        let mut session = CannedSession::new(vec![count_row(3), count_row(3)]);
        let err = check_count(&mut session, 3, "select count(*) from root.sg0.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::MoreThanOneLine), "{err}");
    }

    #[tokio::test]
    async fn mismatch_is_reported_before_extra_rows() {
        let mut session = CannedSession::new(vec![count_row(2), count_row(3)]);
        let err = check_count(&mut session, 3, "select count(*) from root.sg0.0")
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ValidationError::CountMismatch {
                    expected: 3,
                    actual: 2
                }
            ),
            "{err}"
        );
    }

    #[tokio::test]
    async fn non_integer_count() {
        let mut session = CannedSession::new(vec![RowRecord::new(
            None,
            vec![Field::new(Some(Value::Text("3".into())))],
        )]);
        let err = check_count(&mut session, 3, "select count(*) from root.sg0.0")
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::Query(_)), "{err}");
    }

    #[test]
    fn statement() {
        assert_eq!(count_statement("root.sg5.13"), "select count(*) from root.sg5.13");
    }
}
