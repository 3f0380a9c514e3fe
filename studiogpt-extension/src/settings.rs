//! The extension's process-wide configuration.
//!
//! A single explicit struct, owned by the settings store and injected into
//! dependents. Mutation goes through [`SettingsStore::update`] only — the
//! path the host's settings panel drives — and writes are serialized on the
//! host main thread by construction.

use serde::{Deserialize, Serialize};

/// Configuration for the StudioGPT extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioGptSettings {
    /// Optional override for the base URL portion of `api_endpoint`. Leave
    /// empty to use the endpoint as-is.
    pub base_url_override: String,
    /// OpenAI-compatible endpoint URL.
    pub api_endpoint: String,
    /// API key for authentication.
    pub api_key: String,
    /// Default model identifier.
    pub default_model: String,

    // Tool toggles.
    pub enable_script_execution: bool,
    pub enable_viewport_screenshot: bool,
    pub enable_scene_summary: bool,
    pub enable_asset_generation: bool,

    // Asset generation service.
    pub asset_api_url: String,
    pub asset_api_token: String,
    pub asset_image_model: String,
    pub asset_mesh_model: String,
    pub asset_audio_model: String,
    pub asset_video_model: String,

    // Safety limits.
    pub execution_timeout_secs: u64,
    pub max_tool_iterations: u32,

    // Context limits.
    pub max_context_tokens: u32,
    pub scene_summary_page_size: u32,
}

impl Default for StudioGptSettings {
    fn default() -> Self {
        Self {
            base_url_override: String::new(),
            api_endpoint: "https://api.openai.com/v1/responses".into(),
            api_key: String::new(),
            default_model: "gpt-5.1".into(),
            enable_script_execution: true,
            enable_viewport_screenshot: true,
            enable_scene_summary: true,
            enable_asset_generation: false,
            asset_api_url: "https://api.replicate.com/v1/predictions".into(),
            asset_api_token: String::new(),
            asset_image_model: String::new(),
            asset_mesh_model: String::new(),
            asset_audio_model: String::new(),
            asset_video_model: String::new(),
            execution_timeout_secs: 30,
            max_tool_iterations: 25,
            max_context_tokens: 100_000,
            scene_summary_page_size: 100,
        }
    }
}

impl StudioGptSettings {
    /// The endpoint URL with `base_url_override` applied, if set.
    ///
    /// The override replaces everything before the endpoint's path, so
    /// `https://proxy.internal` + `https://api.openai.com/v1/responses`
    /// becomes `https://proxy.internal/v1/responses`.
    pub fn effective_api_url(&self) -> String {
        let base = self.base_url_override.trim().trim_end_matches('/');
        if base.is_empty() {
            return self.api_endpoint.clone();
        }
        match endpoint_path(&self.api_endpoint) {
            Some(path) => format!("{base}{path}"),
            None => base.to_string(),
        }
    }

    /// Whether the configured endpoint speaks the Responses API.
    pub fn uses_responses_api(&self) -> bool {
        self.effective_api_url().ends_with("/responses")
    }
}

/// The path component of a URL, starting at the first `/` after the host.
fn endpoint_path(url: &str) -> Option<&str> {
    let after_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    after_scheme.find('/').map(|idx| &after_scheme[idx..])
}

/// Single source of truth for the settings value.
///
/// Reads hand out references; the only write path is [`SettingsStore::update`].
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    current: StudioGptSettings,
    revision: u64,
}

impl SettingsStore {
    pub fn new(settings: StudioGptSettings) -> Self {
        Self {
            current: settings,
            revision: 0,
        }
    }

    pub fn get(&self) -> &StudioGptSettings {
        &self.current
    }

    /// Snapshot for injection into a dependent that outlives the borrow.
    pub fn snapshot(&self) -> StudioGptSettings {
        self.current.clone()
    }

    /// Monotonic counter, bumped on every applied update.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a mutation through the host settings path.
    pub fn update(&mut self, apply: impl FnOnce(&mut StudioGptSettings)) {
        apply(&mut self.current);
        self.revision += 1;
        tracing::debug!(revision = self.revision, "settings updated");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_configuration() {
        let settings = StudioGptSettings::default();
        assert_eq!(settings.api_endpoint, "https://api.openai.com/v1/responses");
        assert_eq!(settings.default_model, "gpt-5.1");
        assert!(settings.enable_script_execution);
        assert!(!settings.enable_asset_generation);
        assert_eq!(settings.execution_timeout_secs, 30);
        assert_eq!(settings.max_tool_iterations, 25);
        assert_eq!(settings.max_context_tokens, 100_000);
        assert_eq!(settings.scene_summary_page_size, 100);
    }

    #[test]
    fn effective_url_without_override_is_endpoint() {
        let settings = StudioGptSettings::default();
        assert_eq!(
            settings.effective_api_url(),
            "https://api.openai.com/v1/responses"
        );
        assert!(settings.uses_responses_api());
    }

    #[test]
    fn override_replaces_base_url_and_keeps_path() {
        let mut settings = StudioGptSettings::default();
        settings.base_url_override = "https://proxy.internal/".into();
        assert_eq!(
            settings.effective_api_url(),
            "https://proxy.internal/v1/responses"
        );
    }

    #[test]
    fn chat_completions_endpoint_is_not_responses_api() {
        let mut settings = StudioGptSettings::default();
        settings.api_endpoint = "https://api.openai.com/v1/chat/completions".into();
        assert!(!settings.uses_responses_api());
    }

    #[test]
    fn store_update_is_the_only_write_path() {
        let mut store = SettingsStore::default();
        assert_eq!(store.revision(), 0);

        store.update(|s| s.default_model = "gpt-5.1-mini".into());
        assert_eq!(store.get().default_model, "gpt-5.1-mini");
        assert_eq!(store.revision(), 1);

        store.update(|s| s.enable_asset_generation = true);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn snapshot_is_detached_from_store() {
        let mut store = SettingsStore::default();
        let snapshot = store.snapshot();
        store.update(|s| s.api_key = "sk-after".into());
        assert!(snapshot.api_key.is_empty());
        assert_eq!(store.get().api_key, "sk-after");
    }

    #[test]
    fn partial_config_deserializes_over_defaults() {
        let settings: StudioGptSettings =
            serde_json::from_str(r#"{"default_model":"gpt-5.2","max_tool_iterations":10}"#)
                .unwrap();
        assert_eq!(settings.default_model, "gpt-5.2");
        assert_eq!(settings.max_tool_iterations, 10);
        // Untouched fields keep their defaults.
        assert_eq!(settings.api_endpoint, "https://api.openai.com/v1/responses");
    }
}
