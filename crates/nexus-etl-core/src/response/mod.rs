//! Questionnaire responses: nested answer documents to warehouse rows.
//!
//! A subject's answers arrive as one nested JSON document. [`flatten`] turns
//! it into [`ResponseNode`]s, [`join_responses`] attaches question metadata,
//! and the [`carry`] helpers reuse group and list identities minted by
//! earlier runs.

pub mod carry;
mod flatten;
mod join;

pub use self::{
  carry::{assign_group_uris, assign_list_uris},
  flatten::{ResponseNode, flatten},
  join::{JoinedResponses, join_responses},
};

pub const QUESTION_ID: &str = "question_id";
pub const QUESTION_GROUP_ID: &str = "question_group_id";
pub const QUESTION_TYPE: &str = "question_type";
pub const RESPONSE_TEXT: &str = "response_text";
pub const RESPONSE_CODE_DISPLAY: &str = "response_code_display";
pub const RESPONSE_INDEX: &str = "response_index_in_list";
pub const RESPONSE_LIST_GROUP_URI: &str = "response_list_group_uri";
pub const RESPONSE_GROUP_URI: &str = "response_group_uri";
pub const RESPONSE_ITEM_URI: &str = "questionnaire_response_item_uri";
pub const RESPONSE_SUBJECT_URI: &str = "response_subject_uri";
pub const QUESTIONNAIRE_LABEL: &str = "questionnaire_label";

/// Strip the last `.segment` of an index path, if it has more than one.
pub(crate) fn parent_index(index: &str) -> Option<&str> {
  index.rsplit_once('.').map(|(parent, _)| parent)
}
