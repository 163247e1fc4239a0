//! Table schemas as introspected from the warehouse.

use strum::{Display, IntoStaticStr};

use crate::{
  Error, Result,
  row::Row,
};

/// Semantic type of a warehouse column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
  Integer,
  Text,
  Boolean,
  Float,
  Timestamp,
}

impl ColumnType {
  /// Map a declared SQL type to its semantic type.
  ///
  /// `numeric` columns are floats unless the column name contains `flag`, in
  /// which case they hold booleans.
  pub fn from_declared(column: &str, declared: &str) -> Result<Self> {
    let declared_lc = declared.trim().to_ascii_lowercase();
    let ty = match declared_lc.as_str() {
      "integer" | "int" | "bigint" | "smallint" => ColumnType::Integer,
      "text" | "blob" | "varchar" => ColumnType::Text,
      "datetime" | "timestamp" | "date" => ColumnType::Timestamp,
      "bool" | "boolean" => ColumnType::Boolean,
      "numeric" if column.contains("flag") => ColumnType::Boolean,
      "numeric" | "float4" | "float8" | "real" | "double" => ColumnType::Float,
      _ => {
        return Err(Error::UnmappedType {
          column:   column.to_owned(),
          declared: declared.to_owned(),
        });
      }
    };
    Ok(ty)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
  pub name: String,
  pub ty:   ColumnType,
}

/// The declared column layout of one warehouse table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
  pub table:   String,
  pub columns: Vec<ColumnDef>,
}

impl TableSchema {
  pub fn new(table: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
    Self { table: table.into(), columns }
  }

  /// Build a schema from `(name, declared type)` pairs.
  pub fn from_declared<'a>(
    table: impl Into<String>,
    declared: impl IntoIterator<Item = (&'a str, &'a str)>,
  ) -> Result<Self> {
    let columns = declared
      .into_iter()
      .map(|(name, ty)| {
        Ok(ColumnDef { name: name.to_owned(), ty: ColumnType::from_declared(name, ty)? })
      })
      .collect::<Result<Vec<_>>>()?;
    Ok(Self::new(table, columns))
  }

  pub fn column(&self, name: &str) -> Option<&ColumnDef> {
    self.columns.iter().find(|c| c.name == name)
  }

  pub fn contains(&self, name: &str) -> bool { self.column(name).is_some() }

  /// Reshape `row` to exactly this table's columns, in declared order.
  /// Undeclared columns are dropped and missing ones are null.
  pub fn conform(&self, row: &Row) -> Row {
    self
      .columns
      .iter()
      .map(|c| (c.name.clone(), row.get(&c.name).clone()))
      .collect()
  }

  pub fn conform_all(&self, rows: &[Row]) -> Vec<Row> {
    rows.iter().map(|r| self.conform(r)).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{row, row::Value};

  #[test]
  fn numeric_flag_columns_are_boolean() {
    assert_eq!(
      ColumnType::from_declared("required_flag", "NUMERIC").unwrap(),
      ColumnType::Boolean
    );
    assert_eq!(ColumnType::from_declared("score", "numeric").unwrap(), ColumnType::Float);
  }

  #[test]
  fn declared_types_map() {
    assert_eq!(ColumnType::from_declared("_rev", "INTEGER").unwrap(), ColumnType::Integer);
    assert_eq!(ColumnType::from_declared("x", "blob").unwrap(), ColumnType::Text);
    assert_eq!(
      ColumnType::from_declared("_createdat", "DATETIME").unwrap(),
      ColumnType::Timestamp
    );
    assert_eq!(ColumnType::from_declared("ok", "bool").unwrap(), ColumnType::Boolean);
  }

  #[test]
  fn unknown_declared_type_is_an_error() {
    let err = ColumnType::from_declared("geom", "POINT").unwrap_err();
    assert!(matches!(err, Error::UnmappedType { .. }));
  }

  #[test]
  fn conform_fills_and_drops() {
    let schema =
      TableSchema::from_declared("t", [("a", "text"), ("b", "integer")]).unwrap();
    let conformed = schema.conform(&row! { "b" => 2, "zzz" => "gone" });
    assert_eq!(conformed.columns().collect::<Vec<_>>(), vec!["a", "b"]);
    assert_eq!(conformed.get("a"), &Value::Null);
    assert_eq!(conformed.get("b"), &Value::Int(2));
  }
}
