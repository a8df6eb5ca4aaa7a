/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bpaf::Bpaf;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use techtree::config::EditorConfig;
use techtree::graph::validator::GraphValidator;
use techtree::graph::{Node, parse_node_list};
use techtree::render::layout_nodes;

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
/// Tech-tree editor tools
struct Cli {
    /// Editor configuration (TOML)
    #[bpaf(long, argument("PATH"))]
    config: Option<PathBuf>,
    #[bpaf(external(command))]
    command: Command,
}

#[derive(Debug, Clone, Bpaf)]
enum Command {
    /// Check every prerequisite reference in a node list
    #[bpaf(command)]
    Validate {
        /// JSON node list or editor snapshot
        #[bpaf(positional("FILE"))]
        file: PathBuf,
    },
    /// Print the tier-grid layout of a node list
    #[bpaf(command)]
    Layout {
        /// JSON node list or editor snapshot
        #[bpaf(positional("FILE"))]
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct PlacedNode<'a> {
    id: &'a str,
    tier: u32,
    x: f32,
    y: f32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli().run();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        },
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Validate { file } => {
            let nodes = read_nodes(&file)?;
            let validator = GraphValidator::new(config.validation.clone());
            let summary = validator.validate_all(&nodes);
            for issue in &summary.issues {
                let target = issue.prerequisite_id.as_deref().unwrap_or("-");
                println!("{:?}\t{}\t{}\t{}", issue.reason, issue.node_id, target, issue.message);
            }
            for group in &summary.cycle_groups {
                println!("Cycle\t{}", group.join(" -> "));
            }
            println!(
                "{} nodes, {} prerequisite pairs, {} errors, {} warnings",
                nodes.len(),
                summary.checked_pairs,
                summary.error_count(),
                summary.warning_count()
            );
            Ok(if summary.error_count() == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        },
        Command::Layout { file } => {
            let nodes = read_nodes(&file)?;
            let virtualizer = &config.virtualizer;
            let laid_out = layout_nodes(
                &nodes,
                virtualizer.spacing,
                virtualizer.node_width,
                virtualizer.node_height,
            );
            let placed: Vec<PlacedNode<'_>> = laid_out
                .iter()
                .map(|v| PlacedNode {
                    id: v.id(),
                    tier: v.node.tier,
                    x: v.x,
                    y: v.y,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&placed)?);
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn read_nodes(path: &Path) -> Result<Vec<Node>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    let nodes = parse_node_list(&text)?;
    log::debug!("loaded {} nodes from {}", nodes.len(), path.display());
    Ok(nodes)
}
