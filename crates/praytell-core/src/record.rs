//! Records as they are written to and read from the context store

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fields returned for one search hit, keyed by store field name
pub type RecordFields = serde_json::Map<String, serde_json::Value>;

/// An insert request: properties classed under a record category, keyed by
/// store field name
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub category: String,
    pub properties: RecordFields,
}

/// A nearest-neighbour text search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearTextQuery {
    pub category: String,
    pub fields: Vec<String>,
    pub concepts: Vec<String>,
    pub limit: usize,
}

/// A record category in the store and the field names it uses.
///
/// Categories that only carry a body (such as the generic `Message` class)
/// leave `location_field` and `timestamp_field` unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub class_name: String,

    #[serde(default = "default_body_field")]
    pub body_field: String,

    #[serde(default = "default_role_field")]
    pub role_field: String,

    #[serde(default)]
    pub location_field: Option<String>,

    #[serde(default)]
    pub timestamp_field: Option<String>,
}

impl CategoryConfig {
    /// Category holding persisted chat turns
    pub fn chat_turns() -> Self {
        Self {
            class_name: "Praytell2".to_string(),
            body_field: "body".to_string(),
            role_field: default_role_field(),
            location_field: Some("location".to_string()),
            timestamp_field: Some("datetime".to_string()),
        }
    }

    /// Generic message collection searched by the similar-messages query
    pub fn messages() -> Self {
        Self {
            class_name: "Message".to_string(),
            body_field: "content".to_string(),
            role_field: default_role_field(),
            location_field: None,
            timestamp_field: None,
        }
    }

    /// Field names to request from the store, body first
    pub fn fields(&self) -> Vec<String> {
        let mut fields = vec![self.body_field.clone()];
        fields.extend(self.location_field.iter().cloned());
        fields.extend(self.timestamp_field.iter().cloned());
        fields
    }

    /// Turns are written here, so location and timestamp must be mapped
    pub fn require_turn_fields(&self) -> Result<()> {
        if self.location_field.is_none() || self.timestamp_field.is_none() {
            return Err(Error::config_error(format!(
                "Category '{}' must map location_field and timestamp_field to store turns",
                self.class_name
            )));
        }
        Ok(())
    }

    /// Key one turn's properties by this category's field names.
    ///
    /// Properties the category does not map are left out.
    pub fn turn_fields(
        &self,
        body: &str,
        role: &str,
        location: &str,
        timestamp: &str,
    ) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert(self.body_field.clone(), body.into());
        fields.insert(self.role_field.clone(), role.into());
        if let Some(name) = &self.location_field {
            fields.insert(name.clone(), location.into());
        }
        if let Some(name) = &self.timestamp_field {
            fields.insert(name.clone(), timestamp.into());
        }
        fields
    }
}

fn default_body_field() -> String {
    "body".to_string()
}

fn default_role_field() -> String {
    "role".to_string()
}

/// A previously persisted turn as retrieved from the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub body: String,
    pub location: String,
    #[serde(rename = "datetime")]
    pub timestamp: String,
}

impl ContextRecord {
    pub fn new(
        body: impl Into<String>,
        location: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            body: body.into(),
            location: location.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Project one search hit through a category's field mapping.
    ///
    /// Missing fields become empty strings.
    pub fn from_fields(fields: &RecordFields, category: &CategoryConfig) -> Self {
        let lookup = |name: Option<&String>| {
            name.and_then(|n| fields.get(n))
                .map(value_to_text)
                .unwrap_or_default()
        };

        Self {
            body: lookup(Some(&category.body_field)),
            location: lookup(category.location_field.as_ref()),
            timestamp: lookup(category.timestamp_field.as_ref()),
        }
    }
}

fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
