use std::collections::VecDeque;

use serde_json::Value as Json;

use super::parent_index;
use crate::{identity::IdentifierGenerator, row::Value};

/// One flattened answer, or one container that answers hang off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseNode {
  pub question_id:    String,
  /// Dotted path of the enclosing containers. `None` at the document root.
  pub group_id:       Option<String>,
  /// Dotted positions from the root, e.g. `0.2.1`.
  pub index_path:     String,
  /// Shared by every node produced from one mapping or list occurrence.
  pub list_group_uri: Option<String>,
  /// Scalar answer text. `None` for containers and JSON nulls.
  pub answer:         Option<String>,
  /// The answer is the key of a ticked checkbox.
  pub multiselect:    bool,
}

enum Payload<'a> {
  Json(&'a Json),
  Selected(&'a str),
}

struct Pending<'a> {
  variable: String,
  payload:  Payload<'a>,
  index:    String,
  group:    Option<String>,
  list_uri: Option<String>,
}

/// Flatten one subject's answer document, breadth first.
///
/// Each mapping yields a container node and descends one group level; each
/// list yields its elements under the same group with a shared list URI.
/// `false` checkbox values are dropped and `true` ones become multiselect
/// answers named after their key. List URIs are derived from content, so
/// flattening an identical document twice yields identical nodes.
pub fn flatten(root: &Json, uri_base: &str, ids: &IdentifierGenerator) -> Vec<ResponseNode> {
  let Json::Object(fields) = root else {
    return Vec::new();
  };

  let mut queue: VecDeque<Pending<'_>> = fields
    .iter()
    .enumerate()
    .map(|(i, (k, v))| Pending {
      variable: k.clone(),
      payload:  Payload::Json(v),
      index:    i.to_string(),
      group:    None,
      list_uri: None,
    })
    .collect();

  let mut out = Vec::new();
  while let Some(node) = queue.pop_front() {
    let value = match node.payload {
      Payload::Selected(key) => {
        out.push(ResponseNode {
          question_id:    node.variable,
          group_id:       node.group,
          index_path:     node.index,
          list_group_uri: node.list_uri,
          answer:         Some(key.to_owned()),
          multiselect:    true,
        });
        continue;
      }
      Payload::Json(value) => value,
    };

    match value {
      Json::Object(children) => {
        let group_uri = occurrence_uri(ids, uri_base, &node, Occurrence::Mapping);
        let prefix = node.group.as_ref().map(|g| format!("{g}.")).unwrap_or_default();

        for (key_count, (k, v)) in children.iter().enumerate() {
          let index = format!("{}.{key_count}", node.index);
          match v {
            Json::Bool(false) => {}
            Json::Bool(true) => queue.push_back(Pending {
              variable: node.variable.clone(),
              payload:  Payload::Selected(k),
              index,
              group:    node.group.clone(),
              list_uri: Some(group_uri.clone()),
            }),
            other => queue.push_back(Pending {
              variable: k.clone(),
              payload:  Payload::Json(other),
              index,
              group:    Some(format!("{prefix}{}", node.variable)),
              list_uri: Some(group_uri.clone()),
            }),
          }
        }

        out.push(ResponseNode {
          question_id:    node.variable,
          group_id:       node.group,
          index_path:     node.index,
          list_group_uri: node.list_uri,
          answer:         None,
          multiselect:    false,
        });
      }
      Json::Array(items) => {
        let shared = occurrence_uri(ids, uri_base, &node, Occurrence::List);
        let base = parent_index(&node.index).unwrap_or(&node.index);
        for (i, item) in items.iter().enumerate() {
          queue.push_back(Pending {
            variable: node.variable.clone(),
            payload:  Payload::Json(item),
            index:    format!("{base}.{i}"),
            group:    node.group.clone(),
            list_uri: Some(shared.clone()),
          });
        }
      }
      scalar => out.push(ResponseNode {
        question_id:    node.variable,
        group_id:       node.group,
        index_path:     node.index,
        list_group_uri: node.list_uri,
        answer:         scalar_text(scalar),
        multiselect:    false,
      }),
    }
  }
  out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Occurrence {
  Mapping,
  List,
}

/// The URI shared by the children of one mapping or list occurrence.
fn occurrence_uri(
  ids: &IdentifierGenerator,
  uri_base: &str,
  node: &Pending<'_>,
  occurrence: Occurrence,
) -> String {
  let mut seed = vec![
    Value::from(node.group.clone().unwrap_or_default()),
    Value::from(node.variable.as_str()),
    Value::from(node.index.as_str()),
  ];
  // A list and its first mapping element share a group, variable and index.
  if occurrence == Occurrence::List {
    seed.push(Value::from("list"));
  }
  ids.derive(uri_base, &seed)
}

fn scalar_text(value: &Json) -> Option<String> {
  match value {
    Json::Null => None,
    Json::String(s) => Some(s.clone()),
    other => Some(other.to_string()),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn ids() -> IdentifierGenerator { IdentifierGenerator::new("salt", "|") }

  fn leaves(nodes: &[ResponseNode]) -> Vec<&ResponseNode> {
    nodes.iter().filter(|n| n.answer.is_some()).collect()
  }

  fn find<'a>(nodes: &'a [ResponseNode], qid: &str, answer: &str) -> &'a ResponseNode {
    nodes
      .iter()
      .find(|n| n.question_id == qid && n.answer.as_deref() == Some(answer))
      .unwrap()
  }

  #[test]
  fn nested_mapping_and_list() {
    let doc = json!({ "a": { "x": 1, "y": 2 }, "b": [10, 20] });
    let nodes = flatten(&doc, "u/", &ids());

    assert_eq!(leaves(&nodes).len(), 4);

    let x = find(&nodes, "x", "1");
    let y = find(&nodes, "y", "2");
    assert_eq!(x.group_id.as_deref(), Some("a"));
    assert_eq!(y.group_id.as_deref(), Some("a"));
    assert_eq!(x.list_group_uri, y.list_group_uri);

    let b0 = find(&nodes, "b", "10");
    let b1 = find(&nodes, "b", "20");
    assert_eq!(b0.index_path, "1.0");
    assert_eq!(b1.index_path, "1.1");
    assert_eq!(b0.group_id, None);
    assert!(b0.list_group_uri.is_some());
    assert_eq!(b0.list_group_uri, b1.list_group_uri);
  }

  #[test]
  fn mapping_emits_a_container_node() {
    let nodes = flatten(&json!({ "a": { "x": 1 } }), "u/", &ids());
    let container = nodes.iter().find(|n| n.question_id == "a").unwrap();
    assert_eq!(container.answer, None);
    assert_eq!(container.group_id, None);
    assert_eq!(container.index_path, "0");
  }

  #[test]
  fn flattening_is_deterministic() {
    let doc = json!({ "a": { "x": [1, 2], "y": { "z": "q" } }, "b": [10, 20] });
    assert_eq!(flatten(&doc, "u/", &ids()), flatten(&doc, "u/", &ids()));
  }

  #[test]
  fn unticked_checkboxes_are_dropped() {
    let doc = json!({ "form": { "colors": { "opt1": false, "opt2": true } } });
    let nodes = flatten(&doc, "u/", &ids());
    let selected: Vec<_> = nodes.iter().filter(|n| n.multiselect).collect();

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].question_id, "colors");
    assert_eq!(selected[0].answer.as_deref(), Some("opt2"));
    assert_eq!(selected[0].group_id.as_deref(), Some("form"));
    assert_eq!(selected[0].index_path, "0.0.1");
  }

  #[test]
  fn group_paths_nest() {
    let doc = json!({ "root": { "outer": { "inner": "v" } } });
    let nodes = flatten(&doc, "u/", &ids());
    let leaf = find(&nodes, "inner", "v");
    assert_eq!(leaf.group_id.as_deref(), Some("root.outer"));
    assert_eq!(leaf.index_path, "0.0.0");
  }

  #[test]
  fn lists_of_mappings_share_group_with_distinct_positions() {
    let doc = json!({ "form": { "grid": [{ "n": 1 }, { "n": 2 }] } });
    let nodes = flatten(&doc, "u/", &ids());
    let first = find(&nodes, "n", "1");
    let second = find(&nodes, "n", "2");
    assert_eq!(first.group_id.as_deref(), Some("form.grid"));
    assert_eq!(first.index_path, "0.0.0");
    assert_eq!(second.index_path, "0.1.0");
    assert_ne!(first.list_group_uri, second.list_group_uri);
  }

  #[test]
  fn scalars_render_as_text() {
    let doc = json!({ "s": "x", "n": 2.5, "z": null });
    let nodes = flatten(&doc, "u/", &ids());
    assert_eq!(find(&nodes, "n", "2.5").index_path, "1");
    let z = nodes.iter().find(|n| n.question_id == "z").unwrap();
    assert_eq!(z.answer, None);
  }

  #[test]
  fn non_object_root_is_empty() {
    assert!(flatten(&json!([1, 2]), "u/", &ids()).is_empty());
  }
}
