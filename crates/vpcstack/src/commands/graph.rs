use crate::project;
use colored::Colorize;
use vpcstack_core::StackSettings;

pub fn handle(settings: &StackSettings, key_pair: Option<String>, json: bool) -> anyhow::Result<()> {
    let topology = project::build(settings, key_pair)?;
    let graph = &topology.graph;

    if json {
        println!("{}", serde_json::to_string_pretty(graph)?);
        return Ok(());
    }

    project::print_header("Stack", &graph.context().stack_name);
    println!();
    println!("Creation order:");
    for (index, id) in graph.topological_order().iter().enumerate() {
        let kind = graph
            .node(id)
            .map(|r| r.kind().to_string())
            .unwrap_or_default();
        println!("  {:>2}. {} ({})", index + 1, id.as_str().cyan(), kind.dimmed());
    }

    println!();
    println!("Edges:");
    for edge in graph.edges() {
        println!(
            "  {} --{}--> {}",
            edge.from.as_str(),
            edge.kind.to_string().yellow(),
            edge.to.as_str()
        );
    }

    Ok(())
}
