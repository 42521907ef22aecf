//! Configuration loader for the analogue search CLI
//!
//! Loads and validates the two YAML files of a run:
//! - Search parameters (analogue_config.yaml)
//! - Event catalogue (extreme_events.yaml)
//!
//! Supports environment variable substitution using ${VAR} syntax.

use std::fs;
use std::path::{Path, PathBuf};

use analogue_common::AnalogueError;
use analogue_engine::{validate_events, AnalogueConfig, EventDefinition};
use anyhow::{Context, Result};
use serde::Deserialize;

pub const ANALOGUE_CONFIG_FILE: &str = "analogue_config.yaml";
pub const EXTREME_EVENTS_FILE: &str = "extreme_events.yaml";

/// Top-level shape of extreme_events.yaml.
#[derive(Debug, Clone, Deserialize)]
struct EventsFile {
    events: Vec<EventDefinition>,
}

/// Both configuration files of a run, validated.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: AnalogueConfig,
    pub events: Vec<EventDefinition>,
}

impl LoadedConfig {
    /// Events to process: one by name, or all of them.
    pub fn select_events(
        &self,
        name: Option<&str>,
    ) -> std::result::Result<Vec<EventDefinition>, AnalogueError> {
        match name {
            None => Ok(self.events.clone()),
            Some(name) => self
                .events
                .iter()
                .find(|e| e.name == name)
                .cloned()
                .map(|e| vec![e])
                .ok_or_else(|| {
                    AnalogueError::configuration(format!(
                        "event '{}' is not defined; known events: {}",
                        name,
                        self.events
                            .iter()
                            .map(|e| e.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                }),
        }
    }
}

// ============================================================================
// Loading Functions
// ============================================================================

/// Load and parse analogue_config.yaml with environment variable substitution
pub fn load_analogue_config<P: AsRef<Path>>(path: P) -> Result<AnalogueConfig> {
    let content = read_expanded(path.as_ref())?;

    let config: AnalogueConfig = serde_yaml::from_str(&content)
        .map_err(|e| AnalogueError::configuration(format!("{:?}: {}", path.as_ref(), e)))?;

    config
        .validate()
        .with_context(|| format!("Invalid analogue config {:?}", path.as_ref()))?;

    Ok(config)
}

/// Load and parse extreme_events.yaml with environment variable substitution
pub fn load_events<P: AsRef<Path>>(path: P) -> Result<Vec<EventDefinition>> {
    let content = read_expanded(path.as_ref())?;

    let file: EventsFile = serde_yaml::from_str(&content)
        .map_err(|e| AnalogueError::configuration(format!("{:?}: {}", path.as_ref(), e)))?;

    anyhow::ensure!(
        !file.events.is_empty(),
        AnalogueError::configuration(format!("{:?} defines no events", path.as_ref()))
    );
    validate_events(&file.events)
        .with_context(|| format!("Invalid event catalogue {:?}", path.as_ref()))?;

    Ok(file.events)
}

/// Load both files from a config directory.
pub fn load_all_configs<P: AsRef<Path>>(config_dir: P) -> Result<LoadedConfig> {
    let dir = config_dir.as_ref();
    let config = load_analogue_config(dir.join(ANALOGUE_CONFIG_FILE))?;
    let events = load_events(dir.join(EXTREME_EVENTS_FILE))?;
    Ok(LoadedConfig { config, events })
}

fn read_expanded(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|e| {
        AnalogueError::configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    expand_env_vars(&content).map_err(|e| {
        AnalogueError::configuration(format!("{}: {:#}", path.display(), e)).into()
    })
}

/// Default config directory: `<root>/config`.
pub fn default_config_dir(root: &Path) -> PathBuf {
    root.join("config")
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            result.push(ch);
            continue;
        }
        chars.next(); // consume '{'

        let mut var_expr = String::new();
        loop {
            match chars.next() {
                Some('}') => break,
                Some(c) => var_expr.push(c),
                None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
            }
        }

        result.push_str(&resolve_var_expr(&var_expr)?);
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> Result<String> {
    match expr.split_once(":-") {
        Some((var_name, default)) => match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        },
        None => std::env::var(expr.trim())
            .with_context(|| format!("Environment variable {} not set", expr.trim())),
    }
}

/// Find the `AnalogueError` behind an anyhow chain, if any.
pub fn analogue_error(err: &anyhow::Error) -> Option<&AnalogueError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AnalogueError>())
}
