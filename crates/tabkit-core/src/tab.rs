use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key a feature is registered under; tabs point at it through `feature_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureKey(String);

impl FeatureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for FeatureKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl PartialEq<str> for FeatureKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// One open tab: an instance of a feature with its (raw) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub feature_key: FeatureKey,
    pub title: String,
    pub settings: Value,
    /// Session-only marker, never part of the persisted shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dirty: Option<bool>,
}

impl Tab {
    /// New tab with a generated id.
    pub fn new(feature_key: impl Into<FeatureKey>, title: impl Into<String>, settings: Value) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), feature_key, title, settings)
    }

    pub fn with_id(
        id: impl Into<String>,
        feature_key: impl Into<FeatureKey>,
        title: impl Into<String>,
        settings: Value,
    ) -> Self {
        Self {
            id: id.into(),
            feature_key: feature_key.into(),
            title: title.into(),
            settings,
            dirty: None,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.unwrap_or(false)
    }

    pub fn mark_dirty(mut self, dirty: bool) -> Self {
        self.dirty = Some(dirty);
        self
    }
}

/// Load status tracked per tab by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderStatus {
    #[default]
    Idle,
    Loading,
    Error,
    Success,
}

impl LoaderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Error => "error",
            Self::Success => "success",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Error | Self::Success)
    }
}

/// Tab record of the collection surface (`TabCollection`): `{ id, type, state }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub state: Value,
}

impl TabEntry {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, state: Value) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tab_serde_shape() {
        let tab = Tab::with_id("p1", "profile", "Profile", json!({ "userId": "123" }));
        let value = serde_json::to_value(&tab).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "p1",
                "feature_key": "profile",
                "title": "Profile",
                "settings": { "userId": "123" }
            })
        );
        let back: Tab = serde_json::from_value(value).unwrap();
        assert_eq!(back, tab);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Tab::new("profile", "A", Value::Null);
        let b = Tab::new("profile", "B", Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_entry_uses_type_field() {
        let entry: TabEntry =
            serde_json::from_value(json!({ "id": "s1", "type": "settings", "state": {} })).unwrap();
        assert_eq!(entry.kind, "settings");
    }
}
