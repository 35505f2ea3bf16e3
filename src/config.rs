use std::fs;
use std::path::Path;
use anyhow::{Result, Context as AnyhowContext};
use serde::{Serialize, Deserialize};

/// Settings file layout. Every section is optional; missing values fall back to
/// the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub bindings: BindingSettings,
    pub notification: NotificationSettings,
    pub storage: StorageSettings,
}

/// Binding identifiers written into the graph by the delegate binder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BindingSettings {
    pub service_task: String,
    pub send_task: String,
    pub completion_listener: String,
    pub completion_event: String,
}

impl Default for BindingSettings {
    fn default() -> Self {
        Self {
            service_task: "#{defaultCamundaDelegateClass}".to_string(),
            send_task: "${defaultSendMailDelegateClass}".to_string(),
            completion_listener: "com.example.workflow.listener.ProcessCompletionListener".to_string(),
            completion_event: "end".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NotificationSettings {
    pub recipient: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            recipient: "ops@example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// In-memory metadata store and engine when unset.
    pub redis_url: Option<String>,
    pub key_prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            redis_url: None,
            key_prefix: "flowsync".to_string(),
        }
    }
}

impl Settings {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let settings = serde_yaml::from_str(content)
            .context("Failed to deserialize settings")?;
        Ok(settings)
    }

    pub fn load(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read settings from {}", file_path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid settings file {}", file_path.display()))
    }
}
