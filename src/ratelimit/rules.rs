//! Protected routes and their per-window limits.
//!
//! Limits are read from YAML, either on their own or as the `routes` section
//! of the gate configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

use crate::error::{GateError, Result};

/// A route protected by its own limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    /// Anonymous message submission
    SendMessage,
    /// AI message suggestions for a recipient
    SuggestMessages,
    /// Account registration
    SignUp,
    /// Verification code submission
    VerifyCode,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::SendMessage,
        Route::SuggestMessages,
        Route::SignUp,
        Route::VerifyCode,
    ];

    /// Suffix appended to every limiter key for this route.
    pub fn name(&self) -> &'static str {
        match self {
            Route::SendMessage => "send-message",
            Route::SuggestMessages => "suggest-messages",
            Route::SignUp => "sign-up",
            Route::VerifyCode => "verify-code",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-window limits for every protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLimits {
    #[serde(default = "default_send_message")]
    pub send_message: u32,
    #[serde(default = "default_suggest_messages")]
    pub suggest_messages: u32,
    #[serde(default = "default_sign_up")]
    pub sign_up: u32,
    #[serde(default = "default_verify_code")]
    pub verify_code: u32,
}

fn default_send_message() -> u32 {
    5
}

fn default_suggest_messages() -> u32 {
    4
}

fn default_sign_up() -> u32 {
    5
}

fn default_verify_code() -> u32 {
    4
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self {
            send_message: default_send_message(),
            suggest_messages: default_suggest_messages(),
            sign_up: default_sign_up(),
            verify_code: default_verify_code(),
        }
    }
}

impl RouteLimits {
    /// Load limits from a standalone YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading route limits");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load limits from a YAML string. Routes left out keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let limits: RouteLimits = serde_yaml::from_str(yaml)
            .map_err(|e| GateError::Config(format!("Failed to parse route limits: {}", e)))?;
        limits.validate()?;
        Ok(limits)
    }

    /// Limit configured for `route`.
    pub fn limit_for(&self, route: Route) -> u32 {
        match route {
            Route::SendMessage => self.send_message,
            Route::SuggestMessages => self.suggest_messages,
            Route::SignUp => self.sign_up,
            Route::VerifyCode => self.verify_code,
        }
    }

    /// Reject zero limits.
    pub fn validate(&self) -> Result<()> {
        for route in Route::ALL {
            if self.limit_for(route) == 0 {
                return Err(GateError::Config(format!(
                    "limit for route '{}' must be positive",
                    route
                )));
            }
        }
        Ok(())
    }
}
