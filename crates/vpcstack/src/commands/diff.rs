use crate::project;
use colored::Colorize;
use std::path::PathBuf;
use vpcstack_cloud::{ActionType, StateManager};
use vpcstack_core::StackSettings;

pub async fn handle(
    settings: &StackSettings,
    key_pair: Option<String>,
    state: Option<PathBuf>,
) -> anyhow::Result<()> {
    let topology = project::build(settings, key_pair)?;
    let graph = &topology.graph;

    let manager = match state {
        Some(path) => StateManager::with_path(path),
        None => StateManager::new(std::env::current_dir()?),
    };
    tracing::info!("Reading applied state from {}", manager.state_path().display());
    let applied = manager.load().await?;

    let desired = vpcstack_cloud::synthesize(graph);
    let plan = vpcstack_cloud::plan(&desired, &applied);

    project::print_header("Plan for", &graph.context().stack_name);
    println!();

    if !plan.has_changes {
        println!("{}", "✓ No changes. Applied state matches.".green().bold());
        return Ok(());
    }

    for action in plan.changes() {
        let line = format!("  {} {}", action.action_type.symbol(), action.description);
        let line = match action.action_type {
            ActionType::Create => line.green(),
            ActionType::Update => line.yellow(),
            ActionType::Delete => line.red(),
            ActionType::NoOp => line.normal(),
        };
        println!("{}", line);

        if let Some(changed) = action.details.get("changed").and_then(|v| v.as_array()) {
            let keys: Vec<&str> = changed.iter().filter_map(|v| v.as_str()).collect();
            println!("      changed: {}", keys.join(", ").dimmed());
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());
    Ok(())
}
