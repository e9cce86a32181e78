use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::preview::DEFAULT_PREVIEW_MAX_DIMENSION;

pub const PRODUCTION_API_URL: &str = "https://deepfake-detection-final.onrender.com/api";
pub const DEVELOPMENT_API_URL: &str = "http://localhost:5000/api";
pub const SETTINGS_FILE_NAME: &str = "classifier.toml";
const SETTINGS_DIR_NAME: &str = "deepfake_lens";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentProfile {
    Production,
    Development,
}

impl DeploymentProfile {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "development" | "dev" => Some(Self::Development),
            _ => None,
        }
    }

    /// Release builds talk to the hosted service unless told otherwise.
    pub fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Production
        }
    }

    fn default_api_url(self) -> Option<&'static str> {
        match self {
            Self::Production => Some(PRODUCTION_API_URL),
            Self::Development => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_url_override: Option<String>,
    pub profile: Option<DeploymentProfile>,
    pub request_timeout_secs: Option<u64>,
    pub preview_max_dimension: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url_override: None,
            profile: None,
            request_timeout_secs: None,
            preview_max_dimension: DEFAULT_PREVIEW_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    profile: Option<String>,
    request_timeout_secs: Option<u64>,
    preview_max_dimension: Option<u32>,
}

impl ClientSettings {
    /// Command-line override; takes precedence over file and environment.
    pub fn with_api_url_override(mut self, api_url: Option<String>) -> Self {
        if let Some(api_url) = non_blank(api_url) {
            self.api_url_override = Some(api_url);
        }
        self
    }

    pub fn effective_profile(&self) -> DeploymentProfile {
        self.profile.unwrap_or_else(DeploymentProfile::for_build)
    }

    /// Explicit override, then the profile's default, then the local fallback.
    pub fn resolve_api_base_url(&self) -> String {
        let resolved = non_blank(self.api_url_override.clone())
            .or_else(|| {
                self.effective_profile()
                    .default_api_url()
                    .map(str::to_string)
            })
            .unwrap_or_else(|| DEVELOPMENT_API_URL.to_string());
        resolved.trim_end_matches('/').to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = non_blank(file.api_url) {
            self.api_url_override = Some(v);
        }
        if let Some(v) = non_blank(file.profile) {
            self.apply_profile("profile", &v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = Some(v);
        }
        if let Some(v) = file.preview_max_dimension {
            self.preview_max_dimension = v.max(1);
        }
    }

    fn apply_profile(&mut self, source: &str, raw: &str) {
        match DeploymentProfile::parse(raw) {
            Some(profile) => self.profile = Some(profile),
            None => warn!(source, value = raw, "ignoring unknown deployment profile"),
        }
    }
}

/// `./classifier.toml`, else the per-user config directory.
pub fn settings_file_path() -> Option<PathBuf> {
    let local = PathBuf::from(SETTINGS_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
        .filter(|path| path.is_file())
}

pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from_path(settings_file_path().as_deref(), |name| {
        std::env::var(name).ok()
    })
}

/// Like [`load_settings`], but a broken settings file only drops the file
/// layer. Environment values still apply; the file error is handed back.
pub fn load_settings_lenient() -> (ClientSettings, Option<anyhow::Error>) {
    load_settings_lenient_from_path(settings_file_path().as_deref(), |name| {
        std::env::var(name).ok()
    })
}

pub fn load_settings_lenient_from_path(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> (ClientSettings, Option<anyhow::Error>) {
    match load_settings_from_path(path, &env) {
        Ok(settings) => (settings, None),
        Err(err) => {
            warn!("ignoring settings file: {err:#}");
            let settings = load_settings_from(None, &env).unwrap_or_default();
            (settings, Some(err))
        }
    }
}

pub fn load_settings_from_path(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let raw = match path {
        Some(path) => match fs::read_to_string(path) {
            Ok(raw) => Some(raw),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read settings file '{}'", path.display())
                })
            }
        },
        None => None,
    };
    load_settings_from(raw.as_deref(), env)
}

/// Defaults, then the TOML file contents, then environment variables.
pub fn load_settings_from(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file_contents {
        let file: FileSettings =
            toml::from_str(raw).context("failed to parse classifier settings file")?;
        settings.apply_file(file);
    }

    let env = |name: &str| non_blank(env(name));

    if let Some(v) = env("CLASSIFIER_API_URL") {
        settings.api_url_override = Some(v);
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url_override = Some(v);
    }

    if let Some(v) = env("APP_ENV") {
        settings.apply_profile("APP_ENV", &v);
    }
    if let Some(v) = env("APP__PROFILE") {
        settings.apply_profile("APP__PROFILE", &v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        match v.trim().parse::<u64>() {
            Ok(parsed) => settings.request_timeout_secs = Some(parsed),
            Err(err) => warn!(value = %v, "ignoring APP__REQUEST_TIMEOUT_SECS: {err}"),
        }
    }

    if let Some(v) = env("APP__PREVIEW_MAX_DIMENSION") {
        match v.trim().parse::<u32>() {
            Ok(parsed) => settings.preview_max_dimension = parsed.max(1),
            Err(err) => warn!(value = %v, "ignoring APP__PREVIEW_MAX_DIMENSION: {err}"),
        }
    }

    Ok(settings)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
