use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use client_core::{normalize_base_url, GatewayOptions};
use serde::Deserialize;
use shared::protocol::{PageQuery, RecommendationQuery};

pub const DEFAULT_CONFIG_FILE: &str = "recommender.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub recommendation_limit: u32,
    pub page_limit: u32,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            recommendation_limit: 5,
            page_limit: 100,
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    recommendation_limit: Option<u32>,
    page_limit: Option<u32>,
    request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn gateway_options(&self) -> GatewayOptions {
        GatewayOptions {
            page: PageQuery {
                skip: 0,
                limit: self.page_limit,
            },
            recommendations: RecommendationQuery {
                num_recommendations: self.recommendation_limit,
            },
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Defaults, then the config file (if present), then `API_URL` / `APP__*` env vars.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?,
        Err(err) if config_path.is_some() => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()));
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.recommendation_limit {
        settings.recommendation_limit = v;
    }
    if let Some(v) = file_cfg.page_limit {
        settings.page_limit = v;
    }
    if file_cfg.request_timeout_secs.is_some() {
        settings.request_timeout_secs = file_cfg.request_timeout_secs;
    }
    Ok(())
}

/// Unparsable numbers are ignored and the earlier value is kept.
fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(parsed) = lookup("APP__RECOMMENDATION_LIMIT").and_then(|v| v.parse().ok()) {
        settings.recommendation_limit = parsed;
    }
    if let Some(parsed) = lookup("APP__PAGE_LIMIT").and_then(|v| v.parse().ok()) {
        settings.page_limit = parsed;
    }
    if let Some(parsed) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = Some(parsed);
    }
}

pub fn finalize(mut settings: Settings, server_url: Option<String>) -> anyhow::Result<Settings> {
    if let Some(url) = server_url {
        settings.api_url = url;
    }
    settings.api_url = normalize_base_url(&settings.api_url)?;
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
