//! Type coercion of row-sets to a table's declared column types.
//!
//! Coercion makes freshly extracted rows and previously stored rows
//! comparable: after [`coerce_rows`], equal data has equal [`Value`]s no
//! matter which side it came from. Nulls always stay null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{
  Error, Result,
  row::{RowSet, TIMESTAMP_FORMAT, Value},
  schema::{ColumnType, TableSchema},
};

const TIMESTAMP_LAYOUTS: &[&str] = &[
  TIMESTAMP_FORMAT,
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
];

/// The integer `f` represents exactly, if any.
pub(crate) fn exact_i64(f: f64) -> Option<i64> {
  // `i64::MAX as f64` rounds up to 2^63, which is already out of range.
  let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
  (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

/// Outcome of converting one value to an integer.
enum IntegerCast {
  Cast(Value),
  /// Numeric, but with no integer form (NaN, ±∞, a fractional part, or
  /// beyond the `i64` range).
  NotIntegral,
}

/// Coerce every column of `rows` that `schema` declares.
///
/// Integer columns convert atomically: when any value in the column is a
/// number without an integer form, the whole column is left as it was. Any
/// other unconvertible value is an [`Error::Coercion`], wherever it sits in
/// the column.
pub fn coerce_rows(schema: &TableSchema, mut rows: RowSet) -> Result<RowSet> {
  for column in &schema.columns {
    if column.ty == ColumnType::Integer {
      coerce_integer_column(&schema.table, &column.name, &mut rows)?;
      continue;
    }
    for row in rows.iter_mut() {
      if let Some(value) = row.get_mut(&column.name) {
        let taken = std::mem::take(value);
        *value = coerce_value(&schema.table, &column.name, column.ty, taken)?;
      }
    }
  }
  Ok(rows)
}

fn coerce_integer_column(table: &str, column: &str, rows: &mut RowSet) -> Result<()> {
  let mut cast = Vec::with_capacity(rows.len());
  let mut integral = true;
  for row in rows.iter() {
    if !row.contains(column) {
      cast.push(None);
      continue;
    }
    match to_integer(table, column, row.get(column))? {
      IntegerCast::Cast(v) => cast.push(Some(v)),
      IntegerCast::NotIntegral => {
        integral = false;
        cast.push(None);
      }
    }
  }
  if !integral {
    tracing::debug!("{table}.{column}: non-integral values present, left uncoerced");
    return Ok(());
  }
  for (row, value) in rows.iter_mut().zip(cast) {
    if let Some(value) = value {
      row.set(column, value);
    }
  }
  Ok(())
}

/// Convert one value to `target`.
pub fn coerce_value(table: &str, column: &str, target: ColumnType, value: Value) -> Result<Value> {
  if value.is_null() {
    return Ok(Value::Null);
  }
  let fail = |value: &Value| Error::Coercion {
    table:  table.to_owned(),
    column: column.to_owned(),
    value:  format!("{value:?}"),
    target: target.into(),
  };

  let out = match (target, value) {
    (ColumnType::Text, Value::Text(s)) => Value::Text(s),
    (ColumnType::Text, other) => Value::Text(other.to_string()),

    (ColumnType::Integer, v) => match to_integer(table, column, &v)? {
      IntegerCast::Cast(cast) => cast,
      IntegerCast::NotIntegral => return Err(fail(&v)),
    },

    (ColumnType::Float, Value::Float(f)) => Value::Float(f),
    (ColumnType::Float, Value::Int(i)) => Value::Float(i as f64),
    (ColumnType::Float, Value::Bool(b)) => Value::Float(if b { 1.0 } else { 0.0 }),
    (ColumnType::Float, Value::Text(s)) => match s.trim() {
      "" => Value::Null,
      t => t.parse::<f64>().map(Value::Float).map_err(|_| fail(&Value::Text(s.clone())))?,
    },

    (ColumnType::Boolean, Value::Bool(b)) => Value::Bool(b),
    (ColumnType::Boolean, Value::Int(i)) => Value::Bool(i != 0),
    (ColumnType::Boolean, Value::Float(f)) => Value::Bool(f != 0.0),
    (ColumnType::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
      "" => Value::Null,
      "true" | "t" | "yes" | "y" | "1" => Value::Bool(true),
      "false" | "f" | "no" | "n" | "0" => Value::Bool(false),
      _ => return Err(fail(&Value::Text(s.clone()))),
    },

    (ColumnType::Timestamp, Value::Timestamp(ts)) => Value::Timestamp(ts),
    (ColumnType::Timestamp, Value::Text(s)) => match s.trim() {
      "" => Value::Null,
      t => parse_timestamp(t)
        .map(Value::Timestamp)
        .ok_or_else(|| fail(&Value::Text(s.clone())))?,
    },

    (_, other) => return Err(fail(&other)),
  };
  Ok(out)
}

fn to_integer(table: &str, column: &str, value: &Value) -> Result<IntegerCast> {
  let from_float = |f: f64| match exact_i64(f) {
    Some(i) => IntegerCast::Cast(Value::Int(i)),
    None => IntegerCast::NotIntegral,
  };
  let cast = match value {
    v if v.is_null() => IntegerCast::Cast(Value::Null),
    Value::Int(i) => IntegerCast::Cast(Value::Int(*i)),
    Value::Bool(b) => IntegerCast::Cast(Value::Int(i64::from(*b))),
    Value::Float(f) => from_float(*f),
    Value::Text(s) => {
      let t = s.trim();
      if t.is_empty() {
        IntegerCast::Cast(Value::Null)
      } else if let Ok(i) = t.parse::<i64>() {
        IntegerCast::Cast(Value::Int(i))
      } else if let Ok(f) = t.parse::<f64>() {
        from_float(f)
      } else {
        return Err(Error::Coercion {
          table:  table.to_owned(),
          column: column.to_owned(),
          value:  format!("{value:?}"),
          target: ColumnType::Integer.into(),
        });
      }
    }
    other => {
      return Err(Error::Coercion {
        table:  table.to_owned(),
        column: column.to_owned(),
        value:  format!("{other:?}"),
        target: ColumnType::Integer.into(),
      });
    }
  };
  Ok(cast)
}

/// Parse the timestamp layouts seen in source extracts and in the warehouse.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.naive_utc());
  }
  TIMESTAMP_LAYOUTS
    .iter()
    .find_map(|layout| NaiveDateTime::parse_from_str(s, layout).ok())
    .or_else(|| {
      NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::row;

  fn schema() -> TableSchema {
    TableSchema::from_declared(
      "t",
      [
        ("n", "integer"),
        ("s", "text"),
        ("active_flag", "numeric"),
        ("score", "numeric"),
        ("at", "datetime"),
      ],
    )
    .unwrap()
  }

  fn column(rows: &RowSet, name: &str) -> Vec<Value> {
    rows.iter().map(|r| r.get(name).clone()).collect()
  }

  #[test]
  fn nullable_integers_keep_nulls() {
    let rows = vec![row! { "n" => "1" }, row! { "n" => Value::Null }, row! { "n" => 3.0 }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(column(&out, "n"), vec![Value::Int(1), Value::Null, Value::Int(3)]);
  }

  #[test]
  fn non_integral_integer_column_is_left_as_is() {
    let rows = vec![row! { "n" => 1.5 }, row! { "n" => Value::Null }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(column(&out, "n"), vec![Value::Float(1.5), Value::Null]);
  }

  #[test]
  fn infinite_integer_column_is_left_as_is() {
    let rows = vec![row! { "n" => "inf" }, row! { "n" => "2" }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(column(&out, "n"), vec![Value::from("inf"), Value::from("2")]);
  }

  #[test]
  fn garbage_integer_text_is_an_error() {
    let rows = vec![row! { "n" => "twelve" }];
    let err = coerce_rows(&schema(), rows).unwrap_err();
    assert!(matches!(err, Error::Coercion { ref column, .. } if column == "n"));
  }

  #[test]
  fn garbage_after_a_fractional_value_is_still_an_error() {
    let fractional_first = vec![row! { "n" => 1.5 }, row! { "n" => "twelve" }];
    let garbage_first = vec![row! { "n" => "twelve" }, row! { "n" => 1.5 }];
    assert!(coerce_rows(&schema(), fractional_first).is_err());
    assert!(coerce_rows(&schema(), garbage_first).is_err());
  }

  #[test]
  fn out_of_range_floats_do_not_saturate() {
    let rows = vec![row! { "n" => 1e30 }, row! { "n" => 2.0 }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(column(&out, "n"), vec![Value::Float(1e30), Value::Float(2.0)]);

    assert_eq!(exact_i64(-9_223_372_036_854_775_808.0), Some(i64::MIN));
    assert_eq!(exact_i64(9_223_372_036_854_775_808.0), None);
    assert_eq!(exact_i64(4096.0), Some(4096));
  }

  #[test]
  fn flag_columns_become_booleans() {
    let rows = vec![row! { "active_flag" => 1, "score" => "2.5" }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(out[0].get("active_flag"), &Value::Bool(true));
    assert_eq!(out[0].get("score"), &Value::Float(2.5));
  }

  #[test]
  fn timestamps_parse_from_text() {
    let rows = vec![
      row! { "at" => "2023-05-04 10:11:12" },
      row! { "at" => "2023-05-04" },
      row! { "at" => "2023-05-04T10:11:12.5" },
    ];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert!(out.iter().all(|r| matches!(r.get("at"), Value::Timestamp(_))));
  }

  #[test]
  fn text_columns_stringify() {
    let rows = vec![row! { "s" => 7 }, row! { "s" => 1.0 }];
    let out = coerce_rows(&schema(), rows).unwrap();
    assert_eq!(column(&out, "s"), vec![Value::from("7"), Value::from("1.0")]);
  }

  #[test]
  fn absent_columns_stay_absent() {
    let out = coerce_rows(&schema(), vec![row! { "s" => "x" }]).unwrap();
    assert!(!out[0].contains("n"));
  }
}
