use crate::project;
use colored::Colorize;
use std::path::PathBuf;
use vpcstack_cloud::StackDocument;
use vpcstack_core::{StackSettings, ValidationOptions};

pub async fn handle(
    settings: &StackSettings,
    key_pair: Option<String>,
    out: Option<PathBuf>,
    stdout: bool,
) -> anyhow::Result<()> {
    let topology = project::build(settings, key_pair)?;
    let graph = &topology.graph;

    let report = vpcstack_core::validate(graph, &ValidationOptions::default());
    if !report.is_ok() {
        for diagnostic in report.errors() {
            eprintln!("  {} {}", "✗".red(), diagnostic);
        }
        anyhow::bail!("resource graph failed validation");
    }

    let document = StackDocument::new(graph);

    if stdout {
        println!("{}", document.to_json()?);
        return Ok(());
    }

    let out = match out {
        Some(dir) => dir,
        None => vpcstack_config::output_dir(std::env::current_dir()?),
    };
    let path = document.write_to(&out).await?;

    tracing::info!("Synthesized {} resources", document.resources.len());
    println!(
        "{} {} ({} resources)",
        "✓ Wrote".green().bold(),
        path.display().to_string().cyan(),
        document.resources.len()
    );
    Ok(())
}
