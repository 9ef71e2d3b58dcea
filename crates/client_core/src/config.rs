use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;
use shared::domain::{default_variable_defs, VariableDef, DEFAULT_ANGLE_VARIABLES};

use crate::{error::RegistryError, registry::VariableRegistry, transport::validate_ws_url};

pub const DEFAULT_CONFIG_PATH: &str = "panel.toml";
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8765/ws";

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSettings {
    pub server_url: String,
    pub angle_variables: Vec<String>,
    pub variables: Vec<VariableDef>,
}

impl Default for PanelSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            angle_variables: DEFAULT_ANGLE_VARIABLES.iter().map(|s| s.to_string()).collect(),
            variables: default_variable_defs(),
        }
    }
}

impl PanelSettings {
    pub fn build_registry(&self) -> Result<VariableRegistry, RegistryError> {
        VariableRegistry::from_defs(
            &self.variables,
            self.angle_variables.iter().map(String::as_str),
        )
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.server_url {
            self.server_url = v;
        }
        if let Some(v) = file.angle_variables {
            self.angle_variables = v;
        }
        if let Some(v) = file.variables {
            self.variables = v;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    angle_variables: Option<Vec<String>>,
    variables: Option<Vec<VariableDef>>,
}

/// Built-in defaults, overlaid by the TOML file, overlaid by the environment.
///
/// Without an explicit `path`, `panel.toml` in the working directory is read
/// if it exists. An explicit path must exist.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<PanelSettings> {
    let mut settings = PanelSettings::default();

    let (path, required) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    match fs::read_to_string(&path) {
        Ok(raw) => {
            let file = parse_settings_file(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
            settings.apply_file(file);
        }
        Err(err) if !required && err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    validate_ws_url(&settings.server_url).context("invalid server url")?;
    Ok(settings)
}

fn parse_settings_file(raw: &str) -> anyhow::Result<FileSettings> {
    Ok(toml::from_str(raw)?)
}

fn apply_env_overrides(settings: &mut PanelSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PANEL_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
