//! Walking custom-form definitions.
//!
//! A form definition is a tree of components. Nodes with `components` open a
//! new question group named after their key; `columns` layouts only arrange
//! their children and keep the enclosing group.

use serde_json::{Map, Value as Json};

/// A keyed component found in a form, with the dotted group path it sits in.
#[derive(Debug, Clone, PartialEq)]
pub struct FormItem<'a> {
  pub group_id: Option<String>,
  pub item:     &'a Map<String, Json>,
}

impl FormItem<'_> {
  pub fn key(&self) -> Option<String> { text(self.item.get("key")) }

  pub fn field(&self, name: &str) -> Option<String> { text(self.item.get(name)) }

  /// `(code, display)` pairs of the options a question offers, from either
  /// `data.values` or `values`.
  pub fn options(&self) -> Vec<(Option<String>, Option<String>)> {
    let values = match self.item.get("data") {
      Some(data) => data.get("values"),
      None => self.item.get("values"),
    };
    values
      .and_then(Json::as_array)
      .into_iter()
      .flatten()
      .map(|option| (text(option.get("label")), text(option.get("value"))))
      .collect()
  }
}

/// Text of a scalar JSON value. Strings are taken verbatim; null and missing
/// values are `None`.
pub fn text(value: Option<&Json>) -> Option<String> {
  match value? {
    Json::Null => None,
    Json::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

/// The forms in a definition document.
pub fn forms(doc: &Json) -> impl Iterator<Item = &Json> {
  doc.get("components").and_then(Json::as_array).into_iter().flatten()
}

/// A form's identifier: the key of its first component.
pub fn questionnaire_uuid(form: &Json) -> Option<String> {
  text(form.pointer("/components/0/key"))
}

/// Every keyed component of `form`, depth first in document order.
pub fn walk(form: &Json) -> Vec<FormItem<'_>> {
  let mut out = Vec::new();
  if let Some(node) = form.as_object() {
    walk_into(node, "components", None, &mut out);
  }
  out
}

fn walk_into<'a>(
  node: &'a Map<String, Json>,
  field: &str,
  group: Option<&str>,
  out: &mut Vec<FormItem<'a>>,
) {
  let children = node.get(field).and_then(Json::as_array).into_iter().flatten();
  for item in children.filter_map(Json::as_object) {
    let key = text(item.get("key"));
    if key.is_some() {
      out.push(FormItem { group_id: group.map(str::to_owned), item });
    }

    if item.contains_key("components") {
      let nested = match (&key, group) {
        (Some(k), Some(g)) => Some(format!("{g}.{k}")),
        (Some(k), None) => Some(k.clone()),
        (None, _) => group.map(str::to_owned),
      };
      walk_into(item, "components", nested.as_deref(), out);
    } else if item.contains_key("columns") {
      walk_into(item, "columns", group, out);
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn sample() -> Json {
    json!({
      "title": "Intake",
      "components": [{
        "key": "f-uuid",
        "type": "container",
        "components": [
          { "key": "age", "type": "number" },
          { "key": "layout", "type": "columns", "columns": [
            { "components": [{ "key": "sex", "type": "radio",
                "values": [{ "label": "F", "value": "female" }] }] }
          ]},
          { "key": "meds", "type": "datagrid", "components": [
            { "key": "drug", "type": "select",
              "data": { "values": [{ "label": "A", "value": "aspirin" }] } }
          ]},
          { "type": "htmlelement" }
        ]
      }]
    })
  }

  fn groups(form: &Json) -> Vec<(Option<String>, String)> {
    walk(form)
      .into_iter()
      .map(|i| (i.group_id.clone(), i.key().unwrap()))
      .collect()
  }

  #[test]
  fn components_open_groups_and_columns_do_not() {
    let form = sample();
    assert_eq!(groups(&form), vec![
      (None, "f-uuid".to_owned()),
      (Some("f-uuid".to_owned()), "age".to_owned()),
      (Some("f-uuid".to_owned()), "layout".to_owned()),
      (Some("f-uuid".to_owned()), "sex".to_owned()),
      (Some("f-uuid".to_owned()), "meds".to_owned()),
      (Some("f-uuid.meds".to_owned()), "drug".to_owned()),
    ]);
  }

  #[test]
  fn options_come_from_values_or_data() {
    let form = sample();
    let items = walk(&form);
    let sex = items.iter().find(|i| i.key().as_deref() == Some("sex")).unwrap();
    let drug = items.iter().find(|i| i.key().as_deref() == Some("drug")).unwrap();
    assert_eq!(sex.options(), vec![(Some("F".to_owned()), Some("female".to_owned()))]);
    assert_eq!(drug.options(), vec![(Some("A".to_owned()), Some("aspirin".to_owned()))]);
    assert!(items[0].options().is_empty());
  }

  #[test]
  fn uuid_is_the_first_component_key() {
    assert_eq!(questionnaire_uuid(&sample()).as_deref(), Some("f-uuid"));
    assert_eq!(forms(&json!({ "components": [sample()] })).count(), 1);
  }
}
