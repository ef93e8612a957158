//! Applied-state record
//!
//! The provisioning engine records what it last applied in
//! `.vpcstack/state.json`. The record is only read here, to preview the
//! changes a new synthesis would cause.

use crate::error::{CloudError, Result};
use crate::synth::{ResourceConfig, ResourceSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const STATE_VERSION: u32 = 1;
pub const STATE_DIR: &str = ".vpcstack";
const STATE_FILE: &str = "state.json";

/// Resources the engine last applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedState {
    /// State file version
    pub version: u32,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by type:id
    pub resources: BTreeMap<String, ResourceState>,
}

impl Default for AppliedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

impl AppliedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every resource of `set` as applied
    pub fn from_resource_set(set: &ResourceSet) -> Self {
        let mut state = Self::new();
        for resource in set.iter() {
            state.set_resource(resource.key(), ResourceState::applied(resource));
        }
        state
    }

    /// Add or update a resource
    pub fn set_resource(&mut self, key: String, state: ResourceState) {
        self.resources.insert(key, state);
        self.updated_at = Utc::now();
    }

    /// Get a resource by key
    pub fn get_resource(&self, key: &str) -> Option<&ResourceState> {
        self.resources.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// State of a single applied resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Logical resource identifier
    pub id: String,

    /// Resource type
    pub resource_type: String,

    /// Configuration the engine applied
    pub config: serde_json::Value,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            config: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    /// State for `resource` with its configuration recorded as applied
    pub fn applied(resource: &ResourceConfig) -> Self {
        Self::new(&resource.id, &resource.resource_type).with_config(resource.config.clone())
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Resource key (type:id)
    pub fn key(&self) -> String {
        format!("{}:{}", self.resource_type, self.id)
    }
}

/// Reader for the engine's state file
pub struct StateManager {
    path: PathBuf,
}

impl StateManager {
    /// Manager for `<project_root>/.vpcstack/state.json`
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            path: project_root.as_ref().join(STATE_DIR).join(STATE_FILE),
        }
    }

    /// Manager for an explicit state file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn state_path(&self) -> &Path {
        &self.path
    }

    /// Load the current state. A missing file yields an empty record.
    pub async fn load(&self) -> Result<AppliedState> {
        let path = &self.path;
        if !fs::try_exists(path).await? {
            tracing::debug!("State file not found, returning empty state");
            return Ok(AppliedState::new());
        }

        let content = fs::read_to_string(path).await?;
        let state: AppliedState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        for (key, resource) in &state.resources {
            if *key != resource.key() {
                return Err(CloudError::StateError(format!(
                    "State entry {} does not match resource {}",
                    key,
                    resource.key()
                )));
            }
        }

        tracing::debug!("Loaded state with {} resources", state.resources.len());
        Ok(state)
    }
}
