use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use layergraph::events::LAYER_CHANGES_APPLIED;
use layergraph::{NodeId, NodeRegistry, SceneGraph, Stage};
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;

#[derive(Parser)]
#[command(name = "layergraph-cli")]
#[command(about = "Compose layered scene documents through a node graph")]
struct Args {
    /// Settings file (defaults to the per-user settings.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import a document, recompose it and write the composed document
    Compose {
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stage time to compose at
        #[arg(short, long)]
        time: Option<f64>,
    },
    /// Print the node tree imported from a document, with derived paths
    Inspect {
        input: PathBuf,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective settings
    Settings {
        /// Also write them to the per-user settings file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let settings = config::load_settings(args.config.as_deref());

    match args.command {
        Command::Compose {
            input,
            output,
            time,
        } => {
            let mut graph = import(&input, &settings)?;
            graph.set_time(time.unwrap_or(settings.graph.time));
            graph.events_mut().subscribe(LAYER_CHANGES_APPLIED, |_| {
                info!("Composed document ready");
                Ok(())
            });
            let text = graph
                .apply_changes()
                .to_text()
                .context("Failed to serialize composed document")?;
            match output {
                Some(path) => fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", text),
            }
        }
        Command::Inspect { input, json } => {
            let mut graph = import(&input, &settings)?;
            graph.resync_paths();
            if json {
                let tree = summarize(&graph, graph.root());
                let text =
                    serde_json::to_string_pretty(&tree).context("Failed to serialize node tree")?;
                println!("{}", text);
            } else {
                let mut lines = Vec::new();
                describe(&graph, graph.root(), 0, &mut lines);
                println!("{}", lines.join("\n"));
            }
        }
        Command::Settings { save } => {
            let text = toml::to_string_pretty(&settings).context("Failed to serialize settings")?;
            println!("{}", text);
            if save {
                config::save_settings(&settings);
            }
        }
    }
    Ok(())
}

fn import(input: &Path, settings: &config::Settings) -> Result<SceneGraph> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let document = Stage::from_text(&text)
        .with_context(|| format!("Failed to parse {}", input.display()))?;

    let mut registry = NodeRegistry::with_builtins();
    settings.apply_defaults(&mut registry);
    let mut graph = SceneGraph::from_document(Arc::new(registry), document);
    graph.set_live_update(settings.graph.live_update);
    info!("Imported {} nodes from {}", graph.len(), input.display());
    Ok(graph)
}

/// One line per node, children indented under their parent.
fn describe(graph: &SceneGraph, id: NodeId, depth: usize, lines: &mut Vec<String>) {
    let Some(node) = graph.node(id) else {
        return;
    };
    let paths: Vec<String> = node.paths().iter().map(ToString::to_string).collect();
    let mut line = format!(
        "{}{} ({}) {}",
        "  ".repeat(depth),
        node.display_label(),
        node.type_name(),
        paths.join(", ")
    );
    if node.is_disabled() {
        line.push_str(" [disabled]");
    }
    lines.push(line);
    for &child in node.children() {
        describe(graph, child, depth + 1, lines);
    }
}

#[derive(Serialize, Debug, PartialEq)]
struct NodeSummary {
    name: String,
    #[serde(rename = "type")]
    type_name: String,
    label: String,
    paths: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    disabled: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeSummary>,
}

fn summarize(graph: &SceneGraph, id: NodeId) -> Option<NodeSummary> {
    let node = graph.node(id)?;
    Some(NodeSummary {
        name: node.name(),
        type_name: node.type_name().to_string(),
        label: node.display_label().to_string(),
        paths: node.paths().iter().map(ToString::to_string).collect(),
        disabled: node.is_disabled(),
        children: node
            .children()
            .iter()
            .filter_map(|&child| summarize(graph, child))
            .collect(),
    })
}
