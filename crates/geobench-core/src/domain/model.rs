//! Model configuration and the agent settings derived from it.

use serde::{Deserialize, Serialize};

fn default_max_iterations() -> u32 {
    15
}

/// One entry of the models file.
///
/// `name` is the display name used for grouping scores; `model_identifier`
/// is what the completion service is asked for (spelled `model_id` on disk).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub name: String,

    #[serde(rename = "model_id", alias = "model_identifier")]
    pub model_identifier: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default)]
    pub enabled: bool,
}

impl ModelConfig {
    /// Create an enabled model config with default temperature and iteration cap.
    pub fn new(name: impl Into<String>, model_identifier: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_identifier: model_identifier.into(),
            temperature: 0.0,
            max_iterations: default_max_iterations(),
            enabled: true,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Agent settings for a single run of this model.
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            model_identifier: self.model_identifier.clone(),
            temperature: self.temperature,
            max_iterations: self.max_iterations,
            enable_memory: false,
        }
    }
}

/// Configuration handed to the agent provider for one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    pub model_identifier: String,
    pub temperature: f32,
    pub max_iterations: u32,
    /// Always `false` for benchmark runs so pairs stay independent.
    pub enable_memory: bool,
}
