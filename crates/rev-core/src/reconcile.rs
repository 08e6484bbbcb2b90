//! Stitching vendor outcomes back onto submitted rows.
//!
//! REST writes are correlated positionally: the i-th result of a batch belongs
//! to the i-th record of that batch. Bulk jobs report three disjoint CSV
//! partitions which are labeled and unioned diagonally.

use crate::{Error, Record, Result, Table};
use polars::prelude::{lit, IntoLazy};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Column appended to bulk results naming the partition a row came from
pub const STATUS_COLUMN: &str = "status";

/// Bulk job result partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
    Unprocessed,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Success, Outcome::Failed, Outcome::Unprocessed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed => "failed",
            Outcome::Unprocessed => "unprocessed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge a batch's result entries onto its input records by position.
///
/// Result objects contribute their fields after the original ones; a
/// non-object result is stored under `result`.
pub fn zip_batch_results(batch: &[Record], results: Vec<Value>) -> Result<Vec<Record>> {
    if batch.len() != results.len() {
        return Err(Error::execution(
            "Result count does not match batch",
            format!(
                "submitted {} records, received {} results",
                batch.len(),
                results.len()
            ),
        ));
    }

    Ok(batch
        .iter()
        .zip(results)
        .map(|(input, result)| {
            let mut merged = input.clone();
            match result {
                Value::Object(fields) => merged.extend(fields),
                other => {
                    merged.insert("result".to_string(), other);
                }
            }
            merged
        })
        .collect())
}

/// Submit `table` in consecutive batches of `batch_size`, one call at a time,
/// and return every input row merged with its result entry, in input order.
///
/// `submit` receives the batch index and the batch rows as records and must
/// return one result entry per row. Nothing is sent for an empty table; the
/// result then carries the input columns only.
pub async fn submit_in_batches<F, Fut>(
    table: &Table,
    batch_size: usize,
    mut submit: F,
) -> Result<Table>
where
    F: FnMut(usize, Vec<Record>) -> Fut,
    Fut: Future<Output = Result<Vec<Value>>>,
{
    let mut merged = Vec::with_capacity(table.len());

    for (index, batch) in table.batches(batch_size)?.iter().enumerate() {
        let records = batch.records()?;
        debug!("Submitting batch {} ({} records)", index, records.len());
        let results = submit(index, records.clone()).await?;
        merged.extend(zip_batch_results(&records, results)?);
    }

    Table::with_schema(table.columns(), merged)
}

/// Append the partition label to every row of a bulk result table.
pub fn label_partition(table: Table, outcome: Outcome) -> Result<Table> {
    let df = table
        .into_frame()
        .lazy()
        .with_column(lit(outcome.as_str()).alias(STATUS_COLUMN))
        .collect()?;
    Ok(Table::from(df))
}

/// Combine labeled bulk partitions into one table.
///
/// Partitions without rows contribute neither rows nor columns; when every
/// partition is empty the result has no columns. The status column is last.
pub fn combine_partitions<I>(partitions: I) -> Result<Table>
where
    I: IntoIterator<Item = (Outcome, Table)>,
{
    let labeled = partitions
        .into_iter()
        .filter(|(_, table)| !table.is_empty())
        .map(|(outcome, table)| label_partition(table, outcome))
        .collect::<Result<Vec<Table>>>()?;

    let mut combined = Table::concat_diagonal(labeled)?;
    combined.move_column_to_end(STATUS_COLUMN)?;
    Ok(combined)
}
