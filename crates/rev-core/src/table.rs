use crate::{Error, Result};
use polars::functions::concat_df_diagonal;
use polars::prelude::{
    AnyValue, CsvReadOptions, CsvWriter, DataFrame, NamedFrom, SerReader, SerWriter, Series,
};
use serde_json::{Map, Number, Value};
use std::io::{Cursor, Read, Write};
use std::path::Path;

/// One row exchanged with a vendor API: field name to JSON value.
pub type Record = Map<String, Value>;

/// Ordered rows over one ordered column list, backed by a polars [`DataFrame`].
///
/// Columns are typed from their JSON cells: all-boolean, all-integer and
/// all-numeric columns keep their type, everything else is text. Nested
/// objects and arrays are stored as JSON text. A table can declare columns
/// while holding no rows.
#[derive(Debug, Clone)]
pub struct Table {
    df: DataFrame,
}

/// Column type inferred from the non-null cells of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Boolean,
    Integer,
    Float,
    Text,
}

impl Table {
    /// Table with a declared schema and no rows
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let series = unique_names(columns, &[])
            .iter()
            .map(|name| Series::new(name.as_str(), Vec::<Option<String>>::new()))
            .collect();
        // names are unique and every series is empty
        let df = DataFrame::new(series).unwrap_or_else(|_| DataFrame::empty());
        Self { df }
    }

    /// Table without columns or rows
    pub fn empty() -> Self {
        Self {
            df: DataFrame::empty(),
        }
    }

    /// Build a table whose schema is the union of record keys in first-seen order.
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        Self::with_schema(Vec::<String>::new(), records)
    }

    /// Build a table over `columns` followed by any further record keys.
    /// Cells a record lacks are null.
    pub fn with_schema<I, S>(columns: I, records: Vec<Record>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = unique_names(columns, &records);
        let series = names
            .iter()
            .map(|name| {
                let cells: Vec<&Value> = records
                    .iter()
                    .map(|record| record.get(name).unwrap_or(&Value::Null))
                    .collect();
                column_series(name, &cells)
            })
            .collect();
        Ok(Self {
            df: DataFrame::new(series)?,
        })
    }

    /// Build a table from JSON values. Objects become rows; scalars land in a `value` column.
    pub fn from_values(values: Vec<Value>) -> Result<Self> {
        Self::from_records(values.into_iter().map(into_record).collect())
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_frame(self) -> DataFrame {
        self.df
    }

    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.column(name).is_ok()
    }

    /// Cell value; `null` when the table lacks the column, `None` past the last row.
    pub fn get(&self, row: usize, column: &str) -> Option<Value> {
        if row >= self.len() {
            return None;
        }
        match self.df.column(column) {
            Ok(series) => series.get(row).ok().map(json_value),
            Err(_) => Some(Value::Null),
        }
    }

    /// All values of one column in row order.
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        match self.df.column(column) {
            Ok(series) => (0..self.len())
                .map(|row| series.get(row).map(json_value).unwrap_or(Value::Null))
                .collect(),
            Err(_) => vec![Value::Null; self.len()],
        }
    }

    /// Rows as JSON records, keys in column order.
    pub fn records(&self) -> Result<Vec<Record>> {
        let columns = self.df.get_columns();
        let mut records = Vec::with_capacity(self.len());
        for row in 0..self.len() {
            let mut record = Record::with_capacity(columns.len());
            for series in columns {
                record.insert(series.name().to_string(), json_value(series.get(row)?));
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Consecutive slices of at most `size` rows, in order.
    pub fn batches(&self, size: usize) -> Result<Vec<Table>> {
        if size == 0 {
            return Err(Error::Validation("batch size must be at least 1".to_string()));
        }
        Ok((0..self.len())
            .step_by(size)
            .map(|offset| Table::from(self.df.slice(offset as i64, size)))
            .collect())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<()> {
        if self.has_column(name) {
            self.df.drop_in_place(name)?;
        }
        Ok(())
    }

    pub fn move_column_to_end(&mut self, name: &str) -> Result<()> {
        if !self.has_column(name) {
            return Ok(());
        }
        let mut order: Vec<String> = self.columns().into_iter().filter(|c| c != name).collect();
        order.push(name.to_string());
        self.df = self.df.select(order)?;
        Ok(())
    }

    /// Diagonal union: rows of every table in order, over the superset of
    /// their columns. Tables without columns are skipped.
    pub fn concat_diagonal<I>(tables: I) -> Result<Self>
    where
        I: IntoIterator<Item = Table>,
    {
        let frames: Vec<DataFrame> = tables
            .into_iter()
            .map(Table::into_frame)
            .filter(|df| df.width() > 0)
            .collect();
        if frames.is_empty() {
            return Ok(Self::empty());
        }
        Ok(Self::from(concat_df_diagonal(&frames)?))
    }

    /// Parse CSV bytes with a header line. Every column is read as text and
    /// empty cells become `null`. Blank input yields a table without columns.
    pub fn from_csv_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::empty());
        }
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(Self::from(df))
    }

    pub fn from_csv_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_csv_bytes(bytes)
    }

    pub fn from_csv_str(text: &str) -> Result<Self> {
        Self::from_csv_bytes(text.as_bytes().to_vec())
    }

    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_csv_bytes(std::fs::read(path)?)
    }

    /// Write the header line followed by every row; nulls are empty cells.
    /// A table without columns writes nothing.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.df.width() == 0 {
            return Ok(());
        }
        let mut df = self.df.clone();
        CsvWriter::new(&mut writer)
            .include_header(true)
            .finish(&mut df)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Generic(e.into()))
    }

    pub fn write_csv_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<DataFrame> for Table {
    fn from(df: DataFrame) -> Self {
        Self { df }
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.df.equals_missing(&other.df)
    }
}

/// Objects become records; any other value is stored under `value`.
pub fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => {
            let mut record = Record::new();
            record.insert("value".to_string(), other);
            record
        }
    }
}

/// Flatten nested objects into dotted keys, `max_level` levels deep.
/// Empty objects and anything deeper are kept as they are.
pub fn flatten_record(record: Record, max_level: usize) -> Record {
    let mut flat = Record::new();
    flatten_into(&mut flat, None, record, max_level);
    flat
}

/// Text form of a cell: strings as-is, nulls empty, nested values as JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn flatten_into(out: &mut Record, prefix: Option<&str>, record: Record, levels_left: usize) {
    for (key, value) in record {
        let name = match prefix {
            Some(p) => format!("{}.{}", p, key),
            None => key,
        };
        match value {
            Value::Object(inner) if levels_left > 0 && !inner.is_empty() => {
                flatten_into(out, Some(&name), inner, levels_left - 1);
            }
            other => {
                out.insert(name, other);
            }
        }
    }
}

fn unique_names<I, S>(columns: I, records: &[Record]) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut names: Vec<String> = Vec::new();
    let keys = records.iter().flat_map(|record| record.keys().cloned());
    for name in columns.into_iter().map(Into::into).chain(keys) {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn column_kind(cells: &[&Value]) -> ColumnKind {
    let mut present = cells.iter().filter(|v| !v.is_null()).peekable();
    if present.peek().is_none() {
        return ColumnKind::Text;
    }
    present.fold(None, |kind, value| {
        let cell = match value {
            Value::Bool(_) => ColumnKind::Boolean,
            Value::Number(n) if n.is_i64() => ColumnKind::Integer,
            Value::Number(_) => ColumnKind::Float,
            _ => ColumnKind::Text,
        };
        Some(match (kind, cell) {
            (None, cell) => cell,
            (Some(a), b) if a == b => a,
            (Some(ColumnKind::Integer), ColumnKind::Float)
            | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
            _ => ColumnKind::Text,
        })
    })
    .unwrap_or(ColumnKind::Text)
}

fn column_series(name: &str, cells: &[&Value]) -> Series {
    match column_kind(cells) {
        ColumnKind::Boolean => {
            let values: Vec<Option<bool>> = cells.iter().map(|v| v.as_bool()).collect();
            Series::new(name, values)
        }
        ColumnKind::Integer => {
            let values: Vec<Option<i64>> = cells.iter().map(|v| v.as_i64()).collect();
            Series::new(name, values)
        }
        ColumnKind::Float => {
            let values: Vec<Option<f64>> = cells.iter().map(|v| v.as_f64()).collect();
            Series::new(name, values)
        }
        ColumnKind::Text => {
            let values: Vec<Option<String>> = cells
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    other => Some(cell_text(other)),
                })
                .collect();
            Series::new(name, values)
        }
    }
}

fn json_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::Int32(i) => Value::from(i),
        AnyValue::Int64(i) => Value::from(i),
        AnyValue::UInt32(u) => Value::from(u),
        AnyValue::UInt64(u) => Value::from(u),
        AnyValue::Float32(f) => Number::from_f64(f as f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::Float64(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_records_schema_union() {
        let table = Table::from_records(vec![
            record(json!({"Id": "1", "Name": "Acme"})),
            record(json!({"Id": "2", "Phone": "555"})),
        ])
        .unwrap();

        assert_eq!(table.columns(), &["Id", "Name", "Phone"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Name"), Some(Value::Null));
        assert_eq!(table.get(1, "Phone"), Some(json!("555")));
        assert_eq!(table.get(2, "Id"), None);
    }

    #[test]
    fn test_column_types_follow_cells() {
        let table = Table::from_records(vec![
            record(json!({"n": 1, "x": 1.5, "ok": true, "errors": [], "mixed": 1})),
            record(json!({
                "n": null,
                "x": 2,
                "ok": false,
                "errors": [{"code": "E"}],
                "mixed": "a"
            })),
        ])
        .unwrap();

        assert_eq!(table.get(0, "n"), Some(json!(1)));
        assert_eq!(table.get(1, "n"), Some(Value::Null));
        assert_eq!(table.get(1, "x"), Some(json!(2.0)));
        assert_eq!(table.get(1, "ok"), Some(json!(false)));
        assert_eq!(table.get(1, "errors"), Some(json!(r#"[{"code":"E"}]"#)));
        assert_eq!(table.get(0, "mixed"), Some(json!("1")));
    }

    #[test]
    fn test_declared_schema_without_rows() {
        let table = Table::new(["Id", "Name", "Id"]);
        assert!(table.is_empty());
        assert_eq!(table.columns(), &["Id", "Name"]);
    }

    #[test]
    fn test_with_schema_keeps_declared_order() {
        let table =
            Table::with_schema(["Name", "Rank"], vec![record(json!({"id": "x", "Name": "A"}))])
                .unwrap();
        assert_eq!(table.columns(), &["Name", "Rank", "id"]);
        assert_eq!(table.get(0, "Rank"), Some(Value::Null));
    }

    #[test]
    fn test_batches() {
        let table =
            Table::from_records((0..5).map(|i| record(json!({"n": i}))).collect()).unwrap();
        let batches = table.batches(2).unwrap();
        let sizes: Vec<usize> = batches.iter().map(Table::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[2].get(0, "n"), Some(json!(4)));

        assert!(matches!(table.batches(0), Err(Error::Validation(_))));
        assert!(Table::empty().batches(3).unwrap().is_empty());
    }

    #[test]
    fn test_records_in_column_order() {
        let table = Table::from_csv_str("b,a\n1,\n").unwrap();
        let records = table.records().unwrap();
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(records[0]["a"], Value::Null);
    }

    #[test]
    fn test_concat_diagonal_fills_missing() {
        let a = Table::from_csv_str("sf__Id,sf__Created\n1,true\n").unwrap();
        let b = Table::from_csv_str("sf__Id,sf__Error\n,REQUIRED_FIELD_MISSING\n").unwrap();

        let combined = Table::concat_diagonal([a, b]).unwrap();
        assert_eq!(combined.columns(), &["sf__Id", "sf__Created", "sf__Error"]);
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.get(0, "sf__Error"), Some(Value::Null));
        assert_eq!(combined.get(1, "sf__Created"), Some(Value::Null));
    }

    #[test]
    fn test_concat_diagonal_of_nothing() {
        let combined = Table::concat_diagonal([Table::empty(), Table::from_csv_str("").unwrap()])
            .unwrap();
        assert!(combined.is_empty());
        assert!(combined.columns().is_empty());
    }

    #[test]
    fn test_move_and_drop_column() {
        let mut table = Table::from_csv_str("status,a,b\nsuccess,1,2\n").unwrap();
        table.move_column_to_end("status").unwrap();
        assert_eq!(table.columns(), &["a", "b", "status"]);

        table.drop_column("a").unwrap();
        table.drop_column("missing").unwrap();
        assert_eq!(table.columns(), &["b", "status"]);
    }

    #[test]
    fn test_csv_reads_text_and_nulls() {
        let table =
            Table::from_csv_str("Id,Name,Zip\n1,Acme,\n2,Globex,02134\n").unwrap();
        assert_eq!(table.columns(), &["Id", "Name", "Zip"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "Id"), Some(json!("1")));
        assert_eq!(table.get(0, "Zip"), Some(Value::Null));
        assert_eq!(table.get(1, "Zip"), Some(json!("02134")));
    }

    #[test]
    fn test_csv_header_only_and_blank() {
        let header_only = Table::from_csv_str("\"sf__Id\",\"sf__Error\",Name\n").unwrap();
        assert_eq!(header_only.columns(), &["sf__Id", "sf__Error", "Name"]);
        assert!(header_only.is_empty());

        let blank = Table::from_csv_str("").unwrap();
        assert!(blank.columns().is_empty());
        assert!(blank.is_empty());
    }

    #[test]
    fn test_csv_write() {
        let table = Table::from_records(vec![
            record(json!({"Id": "1", "success": true, "errors": []})),
            record(json!({"Id": "2", "success": false, "errors": [{"message": "bad, value"}]})),
        ])
        .unwrap();
        let text = table.to_csv_string().unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Id,success,errors");
        assert_eq!(lines[1], "1,true,[]");
        assert_eq!(lines[2], r#"2,false,"[{""message"":""bad, value""}]""#);
        assert_eq!(Table::empty().to_csv_string().unwrap(), "");
    }

    #[test]
    fn test_csv_file_roundtrip_keeps_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.csv");
        let table = Table::from_records(vec![record(json!({"Name": "Acme", "Phone": null}))])
            .unwrap();
        table.write_csv_path(&path).unwrap();

        let read_back = Table::from_csv_path(&path).unwrap();
        assert_eq!(read_back, table);
    }

    #[test]
    fn test_flatten_record_depth() {
        let flat = flatten_record(
            record(json!({
                "id": "prod_1",
                "package_dimensions": {"height": 1.0, "width": 2.0},
                "a": {"b": {"c": {"d": {"e": 1}}}},
                "metadata": {}
            })),
            3,
        );

        assert_eq!(flat["package_dimensions.height"], json!(1.0));
        assert_eq!(flat["a.b.c.d"], json!({"e": 1}));
        assert_eq!(flat["metadata"], json!({}));
        assert!(!flat.contains_key("package_dimensions"));
    }

    #[test]
    fn test_from_values_scalars() {
        let table = Table::from_values(vec![json!("animal"), json!("career")]).unwrap();
        assert_eq!(table.columns(), &["value"]);
        assert_eq!(table.get(1, "value"), Some(json!("career")));
    }
}
