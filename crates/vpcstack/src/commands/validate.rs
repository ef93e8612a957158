use crate::project;
use colored::Colorize;
use vpcstack_core::{Severity, StackSettings, ValidationOptions};

pub fn handle(
    settings: &StackSettings,
    key_pair: Option<String>,
    require_key_pair: bool,
) -> anyhow::Result<()> {
    let topology = project::build(settings, key_pair)?;
    let graph = &topology.graph;
    project::print_header("Validating", &graph.context().stack_name);

    let report = vpcstack_core::validate(graph, &ValidationOptions { require_key_pair });

    for diagnostic in &report.diagnostics {
        let label = match diagnostic.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
        };
        println!(
            "  {}: {}: {}",
            label,
            diagnostic.resource.as_str().cyan(),
            diagnostic.message
        );
    }

    if !report.is_ok() {
        eprintln!();
        eprintln!(
            "{}",
            format!("✗ {} error(s)", report.errors().count()).red().bold()
        );
        std::process::exit(1);
    }

    println!("{}", "✓ Resource graph is valid".green().bold());
    println!();
    println!("Summary:");
    println!("  Resources: {}", graph.len());
    println!("  Edges: {}", graph.edges().len());
    println!("  Warnings: {}", report.warnings().count());
    println!("  Instances: {}", graph.instances().count());
    for instance in graph.instances() {
        let key = instance
            .key_name
            .as_ref()
            .map(|k| k.as_str())
            .unwrap_or("(unset)");
        println!(
            "    - {} ({}, key: {})",
            instance.id.as_str().cyan(),
            instance.instance_type,
            key
        );
    }

    Ok(())
}
