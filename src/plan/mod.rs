//! Plan configurations and the definition registry.
//!
//! A plan arrives as a named configuration; its definition knows how to
//! expand it into per-worker tasks and join the task results. The master
//! only ever talks to definitions through [`PlanDefinition`], so new plan
//! types plug in without touching the kernel.

pub mod definition;
pub mod echo;

use serde::{Deserialize, Serialize};

use crate::error::{ForemanError, Result};

pub use definition::{JobServerContext, PlanDefinition, PlanRegistry, TaskAssignment};
pub use echo::EchoPlanDefinition;

/// A named unit of work submitted by a client. Opaque to the master beyond
/// the name; `options` is interpreted by the plan's definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl PlanConfig {
    /// Parses a JSON configuration payload as received on the wire.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ForemanError::InvalidArgument(e.to_string()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}
