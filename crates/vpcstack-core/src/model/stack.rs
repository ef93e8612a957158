//! Target environment a graph is built for

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_STACK_NAME: &str = "CdkVpcStack";

/// Stack name plus the provider region/account the graph targets
///
/// Region and account are left to the provisioning engine when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackContext {
    pub stack_name: String,
    pub region: Option<String>,
    pub account: Option<String>,
}

impl StackContext {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            region: None,
            account: None,
        }
    }
}

impl Default for StackContext {
    fn default() -> Self {
        Self::new(DEFAULT_STACK_NAME)
    }
}

/// Contents of a `stack.kdl` settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSettings {
    /// Stack name (default "CdkVpcStack")
    pub stack_name: Option<String>,

    /// Provider region (e.g. "ap-northeast-1")
    pub region: Option<String>,

    /// Provider account id
    pub account: Option<String>,

    /// Key pair attached to both instances
    pub key_pair: Option<String>,

    /// Unrecognised settings, kept verbatim
    pub extra: HashMap<String, String>,
}

impl StackSettings {
    pub fn context(&self) -> StackContext {
        StackContext {
            stack_name: self
                .stack_name
                .clone()
                .unwrap_or_else(|| DEFAULT_STACK_NAME.to_string()),
            region: self.region.clone(),
            account: self.account.clone(),
        }
    }
}
