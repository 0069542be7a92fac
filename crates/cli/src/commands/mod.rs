pub mod config;
pub mod forecast;
pub mod lifecycle;
pub mod stockout;

use std::fs;
use std::path::{Path, PathBuf};

use salescast_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use salescast_core::ApplicationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        tracing::debug!(
            event_name = "cli.command.failed",
            command,
            error_class = error.error_class(),
            "command failed"
        );
        Self::failure(command, error.error_class(), error.to_string(), error.exit_code())
    }
}

pub(crate) fn load_config(
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, ApplicationError> {
    AppConfig::load(LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        overrides,
    })
    .map_err(|error| ApplicationError::Configuration(format!("configuration issue: {error}")))
}

/// Rows of one input file. Elements that do not fit the row shape are
/// counted in `rejected` rather than failing the command.
#[derive(Debug)]
pub(crate) struct LoadedRows<T> {
    pub rows: Vec<T>,
    pub rejected: usize,
}

pub(crate) fn read_rows<T: DeserializeOwned>(
    path: &Path,
) -> Result<LoadedRows<T>, ApplicationError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        ApplicationError::Input(format!("could not read `{}`: {error}", path.display()))
    })?;
    let elements: Vec<Value> = serde_json::from_str(&raw).map_err(|error| {
        ApplicationError::Input(format!(
            "`{}` is not a JSON array of rows: {error}",
            path.display()
        ))
    })?;

    let mut rows = Vec::with_capacity(elements.len());
    let mut rejected = 0;
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value(element) {
            Ok(row) => rows.push(row),
            Err(error) => {
                rejected += 1;
                tracing::debug!(
                    event_name = "cli.input.row_rejected",
                    path = %path.display(),
                    index,
                    error = %error,
                    "input row does not match the expected shape"
                );
            }
        }
    }

    Ok(LoadedRows { rows, rejected })
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
