use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use semgraph_core::{DiffResult, GitHost, PipelineConfig};
use semgraph_graph::InMemoryGraphStore;
use semgraph_justify::HeuristicLlmProvider;
use semgraph_parser::PreparedWorkspace;
use semgraph_vector::LocalHashingVectorSearch;
use semgraph_workflows::{run_full_index, run_incremental_cycle, LocalCacheStore};

#[derive(Parser)]
#[command(name = "semgraph")]
#[command(about = "Semantic code-graph indexing, justification, and incremental-update CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty, table)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full-index pipeline (parse, graph analysis, embed, justify,
    /// aggregate) over a local workspace directory.
    Index {
        /// Path to the workspace root to index
        path: PathBuf,

        #[arg(long, default_value = "default-org")]
        org: String,

        #[arg(long, default_value = "default-repo")]
        repo: String,
    },

    /// Seed a full index, then replay one incremental cycle against an
    /// explicit set of added/modified and removed paths (no real git host
    /// is wired up; this stands in for a push-diff payload).
    Incremental {
        /// Path to the workspace root to index
        path: PathBuf,

        #[arg(long, default_value = "default-org")]
        org: String,

        #[arg(long, default_value = "default-repo")]
        repo: String,

        /// Comma-separated paths, relative to the workspace root, to reindex
        #[arg(long, value_delimiter = ',')]
        added: Vec<String>,

        /// Comma-separated paths to delete from the graph
        #[arg(long, value_delimiter = ',')]
        removed: Vec<String>,
    },

    /// System information and the configured pipeline defaults
    Status,
}

struct ManualDiffGitHost {
    diff: DiffResult,
}

#[async_trait::async_trait]
impl GitHost for ManualDiffGitHost {
    async fn diff_paths(&self, _repo_id: &str, _before_sha: &str, _after_sha: &str) -> semgraph_core::Result<DiffResult> {
        Ok(self.diff.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match execute_command(&cli).await {
        Ok(output) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<serde_json::Value> {
    match &cli.command {
        Commands::Index { path, org, repo } => execute_index_command(path, org, repo).await,
        Commands::Incremental { path, org, repo, added, removed } => {
            execute_incremental_command(path, org, repo, added, removed).await
        }
        Commands::Status => execute_status_command().await,
    }
}

fn local_workspace(path: &std::path::Path) -> PreparedWorkspace {
    PreparedWorkspace {
        root: path.to_path_buf(),
        languages: vec!["rust".to_string()],
        workspace_roots: vec![path.to_path_buf()],
        head_sha: "workdir".to_string(),
    }
}

async fn execute_index_command(path: &std::path::Path, org: &str, repo: &str) -> Result<serde_json::Value> {
    let workspace = local_workspace(path);
    let store = InMemoryGraphStore::new();
    let vector_search = LocalHashingVectorSearch::new(Default::default());
    let llm = HeuristicLlmProvider::new();
    let config = PipelineConfig::default();

    let report = run_full_index(org, repo, "v1", &workspace, &store, &vector_search, &llm, &config)
        .await
        .context("full index failed")?;

    Ok(serde_json::to_value(report)?)
}

async fn execute_incremental_command(
    path: &std::path::Path,
    org: &str,
    repo: &str,
    added: &[String],
    removed: &[String],
) -> Result<serde_json::Value> {
    let workspace = local_workspace(path);
    let store = InMemoryGraphStore::new();
    let vector_search = LocalHashingVectorSearch::new(Default::default());
    let llm = HeuristicLlmProvider::new();
    let cache = LocalCacheStore::new();
    let relational = NoopRelationalStore;
    let config = PipelineConfig::default();

    run_full_index(org, repo, "v1", &workspace, &store, &vector_search, &llm, &config)
        .await
        .context("seed full index failed")?;

    let git_host = ManualDiffGitHost { diff: DiffResult { added_or_modified: added.to_vec(), removed: removed.to_vec() } };
    let workflow_id = semgraph_workflows::workflow_id(org, repo);

    let event = run_incremental_cycle(
        org, repo, "before", "after", None, &workspace, &git_host, &store, &relational, &vector_search, &llm, &cache, &config, &workflow_id,
    )
    .await
    .context("incremental cycle failed")?;

    Ok(serde_json::to_value(event)?)
}

#[derive(Default)]
struct NoopRelationalStore;

#[async_trait::async_trait]
impl semgraph_core::RelationalStore for NoopRelationalStore {
    async fn create_repo(&self, _repo_id: &str, _org_id: &str) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn get_repo_status(&self, _repo_id: &str) -> semgraph_core::Result<Option<semgraph_core::RepoStatus>> {
        Ok(None)
    }
    async fn update_repo_status(
        &self,
        _repo_id: &str,
        _status: semgraph_core::RepoStatus,
        _error_message: Option<String>,
    ) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn get_last_indexed_sha(&self, _repo_id: &str) -> semgraph_core::Result<Option<String>> {
        Ok(None)
    }
    async fn set_last_indexed_sha(&self, _repo_id: &str, _sha: &str) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn delete_repo(&self, _repo_id: &str) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn create_pipeline_run(&self, _run: semgraph_core::PipelineRun) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn update_pipeline_run(&self, _run: semgraph_core::PipelineRun) -> semgraph_core::Result<()> {
        Ok(())
    }
    async fn get_pipeline_run(&self, _id: &str) -> semgraph_core::Result<Option<semgraph_core::PipelineRun>> {
        Ok(None)
    }
}

#[derive(Serialize)]
struct StatusResult {
    quiet_period_ms: u64,
    fallback_threshold_files: usize,
    reindex_batch_size: usize,
    cascade_depth: usize,
    heartbeat_interval_ms: u64,
}

async fn execute_status_command() -> Result<serde_json::Value> {
    let config = PipelineConfig::default();
    let result = StatusResult {
        quiet_period_ms: config.quiet_period_ms,
        fallback_threshold_files: config.fallback_threshold_files,
        reindex_batch_size: config.reindex_batch_size,
        cascade_depth: config.cascade_depth,
        heartbeat_interval_ms: config.heartbeat_interval_ms,
    };
    Ok(serde_json::to_value(result)?)
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
        OutputFormat::Table => {
            print_table(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b { "true".green() } else { "false".red() };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    _ => {
                        println!("{}: {}", key_colored, val);
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                println!("\n{}{}:", "Item ".cyan(), (i + 1).to_string().yellow());
                print_pretty(item)?;
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

fn print_table(value: &serde_json::Value) -> Result<()> {
    // Every command here returns a flat report struct; a real table
    // renderer would need one row type per subcommand, so this falls
    // back to the pretty printer rather than guessing a schema.
    print_pretty(value)
}
