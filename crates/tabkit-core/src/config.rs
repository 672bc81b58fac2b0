use serde::Deserialize;

/// Library configuration.
///
/// Every section is optional in TOML; missing keys fall back to the embedded defaults.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct TabsConfig {
    pub store: StoreConfig,
    pub router: RouterConfig,
    pub placeholders: PlaceholderConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub on_duplicate: DuplicateTabPolicy,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(default)]
pub struct RouterConfig {
    pub missing_feature: MissingFeaturePolicy,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PlaceholderConfig {
    pub loading_text: String,
    pub error_title: String,
    pub not_found_text: String,
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            loading_text: "Loading…".to_string(),
            error_title: "Something went wrong".to_string(),
            not_found_text: "This tab's feature is not available".to_string(),
        }
    }
}

/// What `add_tab` does when the id is already present.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTabPolicy {
    /// Fail with `StoreError::DuplicateId`.
    #[default]
    Reject,
    /// Replace the record in place, keeping its position and resetting its status.
    Replace,
}

/// How the router treats an active tab whose feature is not registered.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingFeaturePolicy {
    /// Log a warning and render the not-found placeholder.
    #[default]
    Report,
    /// Render nothing.
    Silent,
}

/// Default configuration embedded in the library
pub const DEFAULT_CONFIG: &str = r#"
[store]
on_duplicate = "reject"

[router]
missing_feature = "report"

[placeholders]
loading_text = "Loading…"
error_title = "Something went wrong"
not_found_text = "This tab's feature is not available"
"#;

impl TabsConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: TabsConfig = toml::from_str(contents)?;
        log::debug!("tabs config loaded: {:?}", config);
        Ok(config)
    }

    /// The embedded default configuration.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_loads() {
        let config = TabsConfig::embedded();
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config, TabsConfig::default());
        assert_eq!(config.store.on_duplicate, DuplicateTabPolicy::Reject);
        assert_eq!(config.router.missing_feature, MissingFeaturePolicy::Report);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = TabsConfig::from_toml_str(
            r#"
[store]
on_duplicate = "replace"
"#,
        )
        .unwrap();
        assert_eq!(config.store.on_duplicate, DuplicateTabPolicy::Replace);
        assert_eq!(config.router.missing_feature, MissingFeaturePolicy::Report);
        assert_eq!(config.placeholders.loading_text, "Loading…");
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        assert!(TabsConfig::from_toml_str("[router]\nmissing_feature = \"explode\"\n").is_err());
    }
}
