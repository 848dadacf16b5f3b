//! Prompt Library
//!
//! Editable system prompts and chat parameters kept in two JSON files:
//!
//! ```json
//! // system_prompts.json
//! { "writing_assistant": { "description": "...", "prompts": ["..."] } }
//!
//! // chat_parameters.json
//! { "writing_assistant": { "temperature": 0.7 } }
//! ```
//!
//! Files are read on every lookup so edits apply without a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::templates::WRITING_ASSISTANT;

/// Library key whose first prompt drives the chapter endpoints
pub const WRITING_ASSISTANT_KEY: &str = "writing_assistant";

/// Errors from the prompt library
#[derive(Debug, Error)]
pub enum PromptLibraryError {
    /// A library file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A library file is not the expected JSON
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// No entry of that type
    #[error("Prompt type not found")]
    NotFound(String),
}

#[derive(Debug, Deserialize)]
struct PromptDefinition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    prompts: Vec<String>,
}

/// One library entry as served to clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PromptEntry {
    /// Entry key
    #[serde(rename = "type")]
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Prompt variants, preferred first
    pub prompts: Vec<String>,
    /// Chat parameters for this entry (null when none)
    pub parameters: Value,
}

/// File-backed prompt library
#[derive(Clone, Debug)]
pub struct PromptLibrary {
    system_prompts_file: PathBuf,
    chat_parameters_file: PathBuf,
}

impl PromptLibrary {
    /// Library over the given files
    pub fn new(
        system_prompts_file: impl Into<PathBuf>,
        chat_parameters_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            system_prompts_file: system_prompts_file.into(),
            chat_parameters_file: chat_parameters_file.into(),
        }
    }

    /// Look up an entry with its chat parameters
    ///
    /// # Errors
    ///
    /// [`PromptLibraryError::NotFound`] for an unknown type, or an I/O or
    /// parse error for the library files.
    pub async fn entry(&self, kind: &str) -> Result<PromptEntry, PromptLibraryError> {
        let mut prompts: HashMap<String, PromptDefinition> =
            read_json(&self.system_prompts_file).await?;
        let definition = prompts
            .remove(kind)
            .ok_or_else(|| PromptLibraryError::NotFound(kind.to_string()))?;

        let mut parameters: HashMap<String, Value> =
            read_json(&self.chat_parameters_file).await?;

        Ok(PromptEntry {
            kind: kind.to_string(),
            description: definition.description,
            prompts: definition.prompts,
            parameters: parameters.remove(kind).unwrap_or(Value::Null),
        })
    }

    /// System prompt for the chapter endpoints
    ///
    /// The first `writing_assistant` prompt from the library, or the
    /// built-in one when the library cannot supply it.
    pub async fn writing_assistant(&self) -> String {
        let loaded = read_json::<HashMap<String, PromptDefinition>>(&self.system_prompts_file)
            .await
            .map(|mut prompts| {
                prompts
                    .remove(WRITING_ASSISTANT_KEY)
                    .and_then(|d| d.prompts.into_iter().next())
            });

        match loaded {
            Ok(Some(prompt)) if !prompt.trim().is_empty() => prompt,
            Ok(_) => {
                debug!("No writing_assistant prompt in library, using built-in");
                WRITING_ASSISTANT.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Prompt library unavailable, using built-in writing prompt");
                WRITING_ASSISTANT.to_string()
            }
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PromptLibraryError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PromptLibraryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| PromptLibraryError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
