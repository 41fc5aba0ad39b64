use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity record as returned by the server.
///
/// The shape belongs to the remote service, so the record is kept as a raw
/// JSON object and only a few well-known fields get typed accessors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Map<String, Value>);

impl UserProfile {
    /// Server-side identifier, either numeric or string.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.str_field("name")
    }

    pub fn email(&self) -> Option<&str> {
        self.str_field("email")
    }

    pub fn role(&self) -> Option<&str> {
        self.str_field("role")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Shallow merge: every key in `update` replaces the current value.
    pub fn merged(&self, update: &ProfileUpdate) -> Self {
        let mut fields = self.0.clone();
        for (key, value) in update.fields() {
            fields.insert(key.clone(), value.clone());
        }
        Self(fields)
    }

    /// Short human-readable label for status lines.
    pub fn display_name(&self) -> String {
        self.name()
            .or_else(|| self.email())
            .map(str::to_string)
            .or_else(|| self.id().map(|id| format!("user #{}", id)))
            .unwrap_or_else(|| "unknown user".to_string())
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

/// Partial profile sent by `update_profile`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileUpdate(Map<String, Value>);

impl ProfileUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}
