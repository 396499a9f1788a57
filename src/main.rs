use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use projectlens::analysis::{analyze_dependencies, OutputFormat, TreeOptions};
use projectlens::config::{get_config_path, save_config, ServerConfig};
use projectlens::errors::{ContextError, Result};
use projectlens::logging::init_logging;
use projectlens::mcp::McpServer;
use projectlens::project::ProjectContext;
use projectlens::types::{short_hash, ProjectStructureNode};

/// Project context server for AI assistants.
#[derive(Parser)]
#[command(name = "projectlens", version, about = "Project context server for AI assistants")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file for a project
    Init {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Start the MCP server on stdio
    Serve {
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
    },
    /// Print the project overview
    Overview {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Print the project tree
    Structure {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Directory levels to expand
        #[arg(short, long)]
        depth: Option<usize>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Print a dependency report
    Dependencies {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Leave out development dependencies
        #[arg(long)]
        no_dev: bool,
        /// Output format (summary, detailed, or json)
        #[arg(short, long, default_value = "summary")]
        format: String,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, force } => {
            let project_path = resolve_path(path);
            let config_path = get_config_path(&project_path);
            if config_path.exists() && !force {
                println!("Configuration already exists at {}", config_path.display());
                return Ok(());
            }
            let config = ServerConfig {
                root_dir: project_path.to_string_lossy().to_string(),
                ..ServerConfig::default()
            };
            save_config(&project_path, &config)?;
            println!("Wrote {}", config_path.display());
        }
        Commands::Serve { path } => {
            let project_path = resolve_path(path);
            let server = McpServer::new(ProjectContext::open(&project_path)?);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(server.run())?;
        }
        Commands::Overview { path, json } => {
            let project = ProjectContext::open(&resolve_path(path))?;
            let overview = project.overview()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&overview)?);
            } else {
                println!("{} {}", overview.name, overview.version);
                if !overview.description.is_empty() {
                    println!("  {}", overview.description);
                }
                println!("  Language:        {}", overview.language);
                if let Some(fw) = &overview.framework {
                    println!("  Framework:       {}", fw);
                }
                if let Some(pm) = &overview.package_manager {
                    println!("  Package manager: {}", pm);
                }
                println!("  Files:           {}", overview.file_count);
                println!("  Size:            {} bytes", overview.size_in_bytes);
                println!("  Last modified:   {}", overview.last_modified);
                if let Some(git) = overview.git.as_ref().filter(|g| g.is_repository) {
                    println!(
                        "  Git:             {} @ {}",
                        git.branch.as_deref().unwrap_or("(detached)"),
                        git.commit.as_deref().map(short_hash).unwrap_or("?")
                    );
                }
            }
        }
        Commands::Structure { path, depth, json } => {
            let project = ProjectContext::open(&resolve_path(path))?;
            let tree = project.traversal().build_tree(&TreeOptions {
                max_depth: depth,
                ..TreeOptions::default()
            });
            if json {
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                println!("{}/", tree.name);
                print_tree(&tree, 1);
            }
        }
        Commands::Dependencies {
            path,
            no_dev,
            format,
        } => {
            let format = OutputFormat::from_str(&format).ok_or_else(|| {
                ContextError::validation(format!("unknown output format: {}", format))
            })?;
            let project = ProjectContext::open(&resolve_path(path))?;
            let analysis = analyze_dependencies(&project.dependencies(), !no_dev, None);
            println!("{}", projectlens::analysis::report::render(&analysis, format));
        }
    }
    Ok(())
}

fn print_tree(node: &ProjectStructureNode, indent: usize) {
    for child in node.children.iter().flatten() {
        if child.is_dir() {
            println!("{}{}/", "  ".repeat(indent), child.name);
            print_tree(child, indent + 1);
        } else {
            println!("{}{}", "  ".repeat(indent), child.name);
        }
    }
}

fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
