//! Stack settings parser
//!
//! Reads the optional `stack.kdl` file:
//!
//! ```kdl
//! stack "CdkVpcStack" {
//!     region "ap-northeast-1"
//!     account "123456789012"
//!     key-pair "my-key"
//! }
//! ```

use crate::error::SettingsError;
use crate::model::StackSettings;
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Parse a settings file
pub fn parse_settings_file<P: AsRef<Path>>(path: P) -> Result<StackSettings> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_settings_string(&content)
}

/// Parse settings from a string. An empty document yields the defaults.
pub fn parse_settings_string(content: &str) -> Result<StackSettings> {
    let doc: KdlDocument = content.parse()?;

    let mut settings = StackSettings::default();
    let mut seen_stack = false;

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                if seen_stack {
                    return Err(SettingsError::InvalidConfig(
                        "only one stack node is allowed".to_string(),
                    ));
                }
                seen_stack = true;
                parse_stack(node, &mut settings)?;
            }
            other => {
                tracing::debug!("Skipping unknown top-level node: {}", other);
            }
        }
    }

    Ok(settings)
}

fn parse_stack(node: &KdlNode, settings: &mut StackSettings) -> Result<()> {
    settings.stack_name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string());

    if let Some(name) = &settings.stack_name {
        if name.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "stack name must not be empty".to_string(),
            ));
        }
        // the name becomes the output file name
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(SettingsError::InvalidConfig(format!(
                "stack name {:?} must not contain path separators or \"..\"",
                name
            )));
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "region" => {
                    settings.region = first_string(child);
                }
                "account" => {
                    settings.account = parse_account(child)?;
                }
                "key_pair" | "key-pair" | "key_name" | "key-name" => {
                    settings.key_pair = first_string(child);
                }
                // anything else is kept verbatim
                other => {
                    if let Some(value) = first_string(child) {
                        settings.extra.insert(other.to_string(), value);
                    }
                }
            }
        }
    }

    Ok(())
}

const MAX_ACCOUNT_ID: i128 = 999_999_999_999;

// 12-digit ids are often written unquoted
fn parse_account(node: &KdlNode) -> Result<Option<String>> {
    if let Some(account) = first_string(node) {
        return Ok(Some(account));
    }
    match node.entries().first().and_then(|e| e.value().as_integer()) {
        Some(v) if (0..=MAX_ACCOUNT_ID).contains(&v) => Ok(Some(format!("{:012}", v))),
        Some(v) => Err(SettingsError::InvalidConfig(format!(
            "account {} is not a 12-digit id",
            v
        ))),
        None => Ok(None),
    }
}

fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests;
