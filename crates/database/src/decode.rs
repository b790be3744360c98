use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core_types::Value;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

/// A result tuple that can be flattened into column names and `Value`s.
pub trait DecodeRow {
    fn column_names(&self) -> Vec<String>;

    /// Whether this row's columns are exactly `columns`, in order.
    fn has_columns(&self, columns: &[String]) -> bool {
        self.column_names() == columns
    }

    /// Decodes every column, in column order.
    fn decode_values(&self) -> Result<Vec<Value>, sqlx::Error>;
}

impl DecodeRow for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn has_columns(&self, columns: &[String]) -> bool {
        self.columns().len() == columns.len()
            && self
                .columns()
                .iter()
                .zip(columns)
                .all(|(column, expected)| column.name() == expected)
    }

    fn decode_values(&self) -> Result<Vec<Value>, sqlx::Error> {
        (0..self.len()).map(|idx| decode_column(self, idx)).collect()
    }
}

/// Decodes one column according to its Postgres type name.
fn decode_column(row: &PgRow, idx: usize) -> Result<Value, sqlx::Error> {
    let type_name = row.column(idx).type_info().name();
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(|v| Value::Int(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(|v| Value::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        "FLOAT4" => row.try_get::<Option<f32>, _>(idx)?.map(|v| Value::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(idx)?.map(Value::Float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(idx)?.map(numeric_to_value),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(idx)?.map(Value::Text)
        }
        "DATE" => row.try_get::<Option<NaiveDate>, _>(idx)?.map(Value::Date),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(idx)?
            .map(|ts| Value::Timestamp(ts.and_utc())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(Value::Timestamp),
        other => match row.try_get::<Option<String>, _>(idx) {
            Ok(text) => text.map(Value::Text),
            Err(_) => {
                return Err(sqlx::Error::ColumnDecode {
                    index: row.column(idx).name().to_string(),
                    source: format!("unsupported column type {other}").into(),
                });
            }
        },
    };
    Ok(value.unwrap_or(Value::Null))
}

/// NUMERIC values (e.g. `AVG` over a numeric column) are exposed as floats.
/// A value outside the f64 range keeps its exact text form.
fn numeric_to_value(d: Decimal) -> Value {
    match d.to_f64() {
        Some(f) => Value::Float(f),
        None => Value::Text(d.to_string()),
    }
}
