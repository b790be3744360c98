//! Generic query execution: run a parameterised statement and turn its result
//! cursor into a `ResultSet` of ordered rows.

use crate::decode::DecodeRow;
use crate::error::{QueryError, QueryStage};
use core_types::{ResultSet, Row};
use futures::{Stream, StreamExt};
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-call execution settings. The default runs the query once, unlogged,
/// uncapped and not cancellable.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Stop after this many rows. 0 means unlimited.
    pub max_rows: usize,
    /// Emit the statement and its bound arguments before execution.
    pub log_query: bool,
    /// When set, cancelling the token aborts the in-flight query.
    pub cancel: Option<CancellationToken>,
}

impl QueryOptions {
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_logging(mut self, log_query: bool) -> Self {
        self.log_query = log_query;
        self
    }

    pub fn cancellable(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Executes `template` with `args` bound positionally (`$1`, `$2`, ...).
///
/// Arguments are always sent as bound text parameters, never spliced into the
/// statement; the template is responsible for casting them. Nothing is retried.
pub async fn execute(
    pool: &PgPool,
    template: &str,
    args: &[&str],
    options: &QueryOptions,
) -> Result<ResultSet, QueryError> {
    if options.log_query {
        tracing::info!(sql = %template.trim(), args = ?args, "Executing query.");
    }

    let mut query = sqlx::query::<Postgres>(template);
    for arg in args {
        query = query.bind(arg.to_string());
    }

    collect(query.fetch(pool), options).await
}

/// Drains a row stream under the given options, honouring cancellation.
pub(crate) async fn collect<S, R>(stream: S, options: &QueryOptions) -> Result<ResultSet, QueryError>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    R: DecodeRow,
{
    match &options.cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(QueryError::new(
                    QueryStage::Cancelled,
                    "query cancelled before completion",
                )),
                result = collect_rows(stream, options.max_rows) => result,
            }
        }
        None => collect_rows(stream, options.max_rows).await,
    }
}

/// Materialises at most `max_rows` rows (0 = all) from the cursor.
///
/// An error before any row arrived means the statement itself failed; an
/// error after that is a cursor failure. Remaining rows past the cap are
/// dropped with the stream.
async fn collect_rows<S, R>(mut stream: S, max_rows: usize) -> Result<ResultSet, QueryError>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    R: DecodeRow,
{
    let mut result = ResultSet::new();
    let mut columns: Option<Arc<[String]>> = None;
    let mut received = 0usize;

    loop {
        if max_rows > 0 && result.len() >= max_rows {
            break;
        }

        let next = match stream.next().await {
            Some(next) => next,
            None => break,
        };

        let raw = match next {
            Ok(raw) => raw,
            Err(e) => {
                let stage = if received == 0 {
                    QueryStage::Execute
                } else {
                    QueryStage::Iterate
                };
                return Err(QueryError::new(stage, e));
            }
        };
        received += 1;

        let projection: Arc<[String]> = match columns.clone() {
            Some(projection) => {
                if !raw.has_columns(&projection) {
                    return Err(QueryError::new(
                        QueryStage::Columns,
                        format!(
                            "row {} has columns {:?}, expected {:?}",
                            received,
                            raw.column_names(),
                            projection
                        ),
                    ));
                }
                projection
            }
            None => {
                let projection: Arc<[String]> = raw.column_names().into();
                columns = Some(projection.clone());
                projection
            }
        };

        let values = raw
            .decode_values()
            .map_err(|e| QueryError::new(QueryStage::Scan, e))?;
        let row = Row::new(projection, values)
            .map_err(|e| QueryError::new(QueryStage::Scan, e))?;
        result
            .push(row)
            .map_err(|e| QueryError::new(QueryStage::Columns, e))?;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::Value;
    use futures::stream;
    use pretty_assertions::assert_eq;

    /// An in-memory stand-in for a driver row.
    struct FakeRow {
        columns: Vec<&'static str>,
        values: Result<Vec<Value>, &'static str>,
    }

    impl DecodeRow for FakeRow {
        fn column_names(&self) -> Vec<String> {
            self.columns.iter().map(|c| c.to_string()).collect()
        }

        fn decode_values(&self) -> Result<Vec<Value>, sqlx::Error> {
            self.values
                .clone()
                .map_err(|msg| sqlx::Error::Decode(msg.into()))
        }
    }

    fn unrate(y: i32, m: u32, rate: f64) -> Result<FakeRow, sqlx::Error> {
        Ok(FakeRow {
            columns: vec!["Date", "UNRATE"],
            values: Ok(vec![
                Value::Date(NaiveDate::from_ymd_opt(y, m, 1).unwrap()),
                Value::Float(rate),
            ]),
        })
    }

    fn seeded() -> Vec<Result<FakeRow, sqlx::Error>> {
        vec![unrate(2020, 1, 3.5), unrate(2020, 2, 4.4), unrate(2020, 3, 14.7)]
    }

    #[tokio::test]
    async fn collects_every_row_in_cursor_order() {
        let result = collect(stream::iter(seeded()), &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.columns(), Some(&["Date".to_string(), "UNRATE".to_string()][..]));
        let rates: Vec<_> = result.iter().map(|r| r.values()[1].clone()).collect();
        assert_eq!(
            rates,
            vec![Value::Float(3.5), Value::Float(4.4), Value::Float(14.7)]
        );
        assert_eq!(
            serde_json::to_string(result.iter().next().unwrap()).unwrap(),
            r#"{"Date":"2020-01-01","UNRATE":3.5}"#
        );
    }

    #[tokio::test]
    async fn empty_cursor_is_an_empty_result_not_an_error() {
        let rows: Vec<Result<FakeRow, sqlx::Error>> = Vec::new();
        let result = collect(stream::iter(rows), &QueryOptions::default())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn row_cap_truncates_without_error() {
        let options = QueryOptions::default().with_max_rows(2);
        let result = collect(stream::iter(seeded()), &options).await.unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn row_cap_does_not_surface_errors_past_the_cap() {
        let mut rows = seeded();
        rows.push(Err(sqlx::Error::Protocol("connection reset".into())));
        let options = QueryOptions::default().with_max_rows(3);
        let result = collect(stream::iter(rows), &options).await.unwrap();
        assert_eq!(result.len(), 3);
    }

    #[tokio::test]
    async fn failure_before_first_row_is_an_execute_error() {
        let rows: Vec<Result<FakeRow, sqlx::Error>> =
            vec![Err(sqlx::Error::Protocol("invalid input syntax for type date".into()))];
        let err = collect(stream::iter(rows), &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, QueryStage::Execute);
    }

    #[tokio::test]
    async fn failure_mid_cursor_is_an_iterate_error() {
        let mut rows = seeded();
        rows.insert(1, Err(sqlx::Error::Protocol("connection reset".into())));
        let err = collect(stream::iter(rows), &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, QueryStage::Iterate);
    }

    #[tokio::test]
    async fn undecodable_row_is_a_scan_error() {
        let rows = vec![Ok(FakeRow {
            columns: vec!["Date", "UNRATE"],
            values: Err("unsupported column type"),
        })];
        let err = collect(stream::iter(rows), &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, QueryStage::Scan);
    }

    #[tokio::test]
    async fn shifting_projection_is_a_columns_error() {
        let mut rows = seeded();
        rows.push(Ok(FakeRow {
            columns: vec!["Date", "DFF"],
            values: Ok(vec![Value::Null, Value::Null]),
        }));
        let err = collect(stream::iter(rows), &QueryOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.stage, QueryStage::Columns);
    }

    #[tokio::test]
    async fn cancelled_token_aborts_a_pending_query() {
        let token = CancellationToken::new();
        let options = QueryOptions::default().cancellable(token.clone());
        token.cancel();

        let err = collect(stream::pending::<Result<FakeRow, sqlx::Error>>(), &options)
            .await
            .unwrap_err();
        assert_eq!(err.stage, QueryStage::Cancelled);
    }

    #[tokio::test]
    async fn uncancelled_token_lets_the_query_finish() {
        let options = QueryOptions::default().cancellable(CancellationToken::new());
        let result = collect(stream::iter(seeded()), &options).await.unwrap();
        assert_eq!(result.len(), 3);
    }
}
