//! # chunkyard CLI
//!
//! Drives the library client from a shell. Chunk stores live in memory, so
//! each project command configures the given root first and then queries it;
//! task commands operate on the shared task database.
//!
//! ```bash
//! chunkyard configure ./my-project
//! chunkyard files ./my-project --type callable --text auth
//! chunkyard files ./my-project --all --path src/
//! chunkyard chunks ./my-project src/auth.py
//! chunkyard chunk ./my-project login_3f2a9c01de
//! chunkyard task add "review the auth module" --priority 2
//! chunkyard task claim
//! chunkyard task complete <TASK_ID> "reviewed" --follow-up low
//! chunkyard task list --status open
//! chunkyard init-config
//! ```

use anyhow::{Context, Result};
use chunkyard::config::TaskBackend;
use chunkyard::paths::PlatformPaths;
use chunkyard::query::FilterTarget;
use chunkyard::tasks::{FollowUp, TaskStatus};
use chunkyard::{
    AddTaskRequest, ChunkType, ChunkyardClient, CompleteTaskRequest, Config,
    ConfigureProjectRequest, GetChunkRequest, ListChunkNamesRequest, ListFilesRequest,
    ListProjectFilesRequest, ListTasksRequest,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ", built ",
        env!("BUILD_TIMESTAMP"),
        ")"
    )
}

#[derive(Parser)]
#[command(
    name = "chunkyard",
    about = "Addressable file chunks and a multi-process-safe task queue",
    version = version()
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, env = "CHUNKYARD_CONFIG")]
    config: Option<PathBuf>,

    /// Task database path (overrides config and environment)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Use a process-local task queue instead of the database
    #[arg(long, global = true)]
    memory_tasks: bool,

    /// Maximum chunk size in characters before a chunk is split
    #[arg(long, global = true)]
    max_chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project and print its statistics
    Configure {
        root: PathBuf,
        /// Explicit project id (derived from the root when omitted)
        #[arg(long)]
        project_id: Option<String>,
    },

    /// List files with chunks matching a type and/or text filter
    Files {
        root: PathBuf,
        /// Chunk type such as callable, section or diff_hunk
        #[arg(long = "type")]
        chunk_type: Option<ChunkType>,
        /// Case-insensitive substring; repeat for any-of matching
        #[arg(long = "text")]
        text: Vec<String>,
        /// Match text against name, content or name_or_content
        #[arg(long, default_value = "name_or_content", value_parser = parse_target)]
        on: FilterTarget,
        /// List every indexed file instead
        #[arg(long, conflicts_with_all = ["chunk_type", "text"])]
        all: bool,
        /// With --all, keep paths containing this substring; repeatable
        #[arg(long = "path", requires = "all")]
        path: Vec<String>,
        /// With --all, print a compact tree grouped by directory
        #[arg(long, requires = "all")]
        tree: bool,
    },

    /// List the chunks of one file
    Chunks { root: PathBuf, file: String },

    /// Print one chunk with its content
    Chunk { root: PathBuf, id: String },

    /// Task queue operations
    #[command(subcommand)]
    Task(TaskCommand),

    /// Write the effective configuration as TOML
    InitConfig {
        /// Destination file (defaults to the platform config path)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Add an open task
    Add {
        description: String,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        priority: i64,
        /// JSON object stored with the task
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Claim the next open task
    Claim,

    /// Complete a claimed task
    Complete {
        task_id: String,
        outcome_note: String,
        #[arg(long)]
        follow_up: Option<FollowUp>,
    },

    /// List tasks
    List {
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Show one task
    Get { task_id: String },
}

fn parse_target(raw: &str) -> std::result::Result<FilterTarget, String> {
    match raw.trim().to_lowercase().replace('-', "_").as_str() {
        "name" => Ok(FilterTarget::Name),
        "content" => Ok(FilterTarget::Content),
        "name_or_content" => Ok(FilterTarget::NameOrContent),
        other => Err(format!(
            "unknown filter target '{}', expected name, content or name_or_content",
            other
        )),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();

    if let Some(db_path) = &cli.db_path {
        config.tasks.db_path = db_path.clone();
    }
    if cli.memory_tasks {
        config.tasks.backend = TaskBackend::Memory;
    }
    if let Some(size) = cli.max_chunk_size {
        config.indexing.max_chunk_size = size;
    }

    config.validate()?;
    Ok(config)
}

fn write_config(config: &Config, path: &std::path::Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }
    config.save(path)?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn configure(client: &ChunkyardClient, root: &std::path::Path) -> Result<String> {
    let response = client
        .configure_project(ConfigureProjectRequest {
            root_path: root.to_string_lossy().to_string(),
            project_id: None,
        })
        .await?;
    Ok(response.project_id)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    if let Commands::InitConfig { path, force } = &cli.command {
        let path = path
            .clone()
            .unwrap_or_else(PlatformPaths::default_config_path);
        write_config(&config, &path, *force)?;
        println!("{}", path.display());
        return Ok(());
    }

    let client = ChunkyardClient::with_config(config)
        .await
        .context("Failed to initialize chunkyard")?;

    match cli.command {
        Commands::Configure { root, project_id } => {
            let response = client
                .configure_project(ConfigureProjectRequest {
                    root_path: root.to_string_lossy().to_string(),
                    project_id,
                })
                .await?;
            print_json(&response)?;
        }
        Commands::Files {
            root,
            chunk_type,
            text,
            on,
            all,
            path,
            tree,
        } => {
            let project_id = configure(&client, &root).await?;
            if all {
                let response = client
                    .list_all_files_in_project(ListProjectFilesRequest {
                        project_id,
                        path_filter: path,
                        compact: tree,
                    })
                    .await?;
                if let Some(tree) = &response.tree {
                    print!("{}", tree);
                } else {
                    print_json(&response)?;
                }
            } else {
                let response = client
                    .list_files_by_chunk_type_and_contents(ListFilesRequest {
                        project_id,
                        chunk_type,
                        text_filter: text,
                        filter_on: on,
                    })
                    .await?;
                print_json(&response)?;
            }
        }
        Commands::Chunks { root, file } => {
            let project_id = configure(&client, &root).await?;
            let response = client
                .list_chunk_names_in_file(ListChunkNamesRequest {
                    project_id,
                    file_path: file,
                })
                .await?;
            print_json(&response)?;
        }
        Commands::Chunk { root, id } => {
            let project_id = configure(&client, &root).await?;
            let response = client
                .get_chunk_details(GetChunkRequest {
                    project_id,
                    chunk_id: id,
                })
                .await?;
            print_json(&response)?;
        }
        Commands::Task(command) => run_task_command(&client, command).await?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

async fn run_task_command(client: &ChunkyardClient, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add {
            description,
            priority,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--metadata must be valid JSON")?;
            let response = client
                .add_task(AddTaskRequest {
                    description,
                    metadata,
                    priority: Some(priority),
                })
                .await?;
            print_json(&response)?;
        }
        TaskCommand::Claim => print_json(&client.claim_next_task().await?)?,
        TaskCommand::Complete {
            task_id,
            outcome_note,
            follow_up,
        } => {
            let task = client
                .complete_task(CompleteTaskRequest {
                    task_id,
                    outcome_note,
                    follow_up,
                })
                .await?;
            print_json(&task)?;
        }
        TaskCommand::List { status } => {
            print_json(&client.list_tasks(ListTasksRequest { status }).await?)?;
        }
        TaskCommand::Get { task_id } => print_json(&client.get_task(&task_id).await?)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_files_all_accepts_path_filter() {
        let cli = Cli::try_parse_from([
            "chunkyard", "files", ".", "--all", "--path", "src", "--path", "docs",
        ])
        .unwrap();
        match cli.command {
            Commands::Files { all, path, text, .. } => {
                assert!(all);
                assert_eq!(path, vec!["src", "docs"]);
                assert!(text.is_empty());
            }
            _ => panic!("expected files command"),
        }
    }

    #[test]
    fn test_write_config_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("conf").join("config.toml");
        let mut config = Config::default();
        config.indexing.max_chunk_size = 3_000;

        write_config(&config, &path, false).unwrap();
        assert_eq!(
            Config::from_file(&path).unwrap().indexing.max_chunk_size,
            3_000
        );

        config.indexing.max_chunk_size = 5_000;
        assert!(write_config(&config, &path, false).is_err());
        write_config(&config, &path, true).unwrap();
        assert_eq!(
            Config::from_file(&path).unwrap().indexing.max_chunk_size,
            5_000
        );
    }

    #[test]
    fn test_files_path_requires_all() {
        assert!(Cli::try_parse_from(["chunkyard", "files", ".", "--path", "src"]).is_err());
        assert!(Cli::try_parse_from(["chunkyard", "files", ".", "--all", "--text", "x"]).is_err());
    }
}
