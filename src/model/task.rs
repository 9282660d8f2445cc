use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::serde_utils::{lenient_epoch, null_as_default};

/// A task as returned by the upstream listing and single-task endpoints.
/// Every field except `id` is optional upstream, so everything defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Task {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub list: Option<TaskList>,
    /// Plain-text rendering of the description.
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default, deserialize_with = "lenient_epoch")]
    pub date_created: Option<i64>,
    #[serde(default, deserialize_with = "lenient_epoch")]
    pub date_updated: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assignees: Vec<Assignee>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskList {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Assignee {
    #[serde(default)]
    pub username: Option<String>,
}

/// A custom field exactly as upstream sent it. The value is kept raw so
/// callers get it back untouched; matching goes through `normalized`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CustomField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl CustomField {
    pub fn normalized(&self) -> FieldValue {
        FieldValue::from(&self.value)
    }
}

/// Custom field values come in loosely typed shapes: scalars, label
/// objects from dropdown fields, arrays, or nothing at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldValue {
    #[default]
    Absent,
    Plain(String),
    Structured {
        label: Option<String>,
        name: Option<String>,
    },
}

impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::String(s) => FieldValue::Plain(s.clone()),
            Value::Number(n) => FieldValue::Plain(n.to_string()),
            Value::Bool(b) => FieldValue::Plain(b.to_string()),
            Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| FieldValue::from(item).as_text().map(str::to_string))
                    .collect();
                FieldValue::Plain(parts.join(","))
            }
            Value::Object(obj) => {
                let text = |key: &str| obj.get(key).and_then(Value::as_str).map(String::from);
                FieldValue::Structured {
                    label: text("label"),
                    name: text("name"),
                }
            }
        }
    }
}

impl FieldValue {
    /// Normalized text of the value: the string itself for plain values,
    /// `label` then `name` for structured ones.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Plain(s) => Some(s),
            FieldValue::Structured { label, name } => label.as_deref().or(name.as_deref()),
        }
    }
}

impl Task {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.text_content.as_deref().unwrap_or_default()
    }

    pub fn list_name(&self) -> Option<&str> {
        self.list.as_ref().and_then(|l| l.name.as_deref())
    }

    pub fn list_id(&self) -> Option<&str> {
        self.list.as_ref().and_then(|l| l.id.as_deref())
    }

    pub fn status_label(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.status.as_deref())
    }
}

/// The shape returned to callers of the list tool. Never the raw upstream payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultItem {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub list: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub date_created: Option<i64>,
}

impl From<Task> for ResultItem {
    fn from(task: Task) -> Self {
        let status = task.status_label().map(String::from);
        let list = task.list_name().map(String::from);
        ResultItem {
            id: task.id,
            name: task.name.unwrap_or_default(),
            url: task.url,
            status,
            list,
            custom_fields: task.custom_fields,
            date_created: task.date_created,
        }
    }
}

/// Projection for the single-task pass-through tool.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskDetail {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub list: Option<String>,
    pub description: Option<String>,
    pub custom_fields: Vec<CustomField>,
    pub date_created: Option<i64>,
    pub date_updated: Option<i64>,
    pub assignees: Vec<String>,
}

impl From<Task> for TaskDetail {
    fn from(task: Task) -> Self {
        let status = task.status_label().map(String::from);
        let list = task.list_name().map(String::from);
        let description = task.text_content.filter(|d| !d.trim().is_empty());
        let assignees = task
            .assignees
            .into_iter()
            .filter_map(|a| a.username)
            .collect();
        TaskDetail {
            id: task.id,
            name: task.name.unwrap_or_default(),
            url: task.url,
            status,
            list,
            description,
            custom_fields: task.custom_fields,
            date_created: task.date_created,
            date_updated: task.date_updated,
            assignees,
        }
    }
}
