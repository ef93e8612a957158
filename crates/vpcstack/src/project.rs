use anyhow::Context;
use colored::Colorize;
use std::path::Path;
use vpcstack_config::ConfigError;
use vpcstack_core::{KeyPairName, StackSettings, Topology};

/// Load stack settings
///
/// An explicit path must exist. Without one, a discovered stack.kdl is used
/// and a missing file falls back to the defaults.
pub fn load_settings(explicit: Option<&Path>) -> anyhow::Result<StackSettings> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match vpcstack_config::find_settings_file() {
            Ok(path) => path,
            Err(ConfigError::SettingsFileNotFound) => {
                tracing::debug!("No settings file, using defaults");
                return Ok(StackSettings::default());
            }
            Err(e) => return Err(e.into()),
        },
    };

    tracing::info!("Loading settings from {}", path.display());
    vpcstack_core::parse_settings_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))
}

/// Key pair by precedence: flag, `key_pair_file_name`, settings file
///
/// A flag that was given is always validated, so a blank `--key-pair` is an
/// error rather than a silent fallback to the environment.
pub fn resolve_key_pair(
    flag: Option<String>,
    settings: &StackSettings,
) -> anyhow::Result<Option<KeyPairName>> {
    let raw = flag
        .or_else(vpcstack_config::key_pair_from_env)
        .or_else(|| settings.key_pair.clone());

    match raw {
        Some(name) => {
            let key = KeyPairName::new(name).context("invalid key pair name")?;
            Ok(Some(key))
        }
        None => Ok(None),
    }
}

/// Build the topology for `settings`
pub fn build(settings: &StackSettings, key_pair: Option<String>) -> anyhow::Result<Topology> {
    let key = resolve_key_pair(key_pair, settings)?;
    let context = settings.context();
    tracing::info!("Building stack {}", context.stack_name);

    let topology = vpcstack_core::build_topology(context, key)?;
    Ok(topology)
}

pub fn print_header(title: &str, stack: &str) {
    println!("{} {}", title.blue().bold(), stack.cyan());
}
