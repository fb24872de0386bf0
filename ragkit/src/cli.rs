use crate::{
    config::{get_config, init_config, AppConfig},
    core::engine::{QueryOptions, QueryResult, RagEngine},
    err,
    error::RagError,
    logging::{self, LogOptions},
    map_err,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    io::{BufRead, Write},
    path::PathBuf,
    sync::Arc,
};
use tracing::{info, warn};

/// Characters of every retrieved document shown in text output.
const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Parser)]
#[command(name = "ragkit", version, about = "Ask questions about your documents", long_about = None)]
pub struct Cli {
    /// JSON configuration file merged over the environment.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable logging.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable logging, same as --quiet.
    #[arg(long, global = true)]
    pub no_log: bool,

    /// Log to the console only.
    #[arg(long, global = true)]
    pub no_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbose: self.verbose,
            quiet: self.quiet || self.no_log,
            no_file: self.no_file,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add files or directories to the knowledge base.
    Add {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Only load the top level of directories.
        #[arg(long)]
        no_recursive: bool,
    },

    /// Ask the knowledge base a question.
    Query {
        question: String,

        /// Amount of documents to retrieve.
        #[arg(long, default_value_t = 5)]
        n_results: usize,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Minimum similarity of retrieved documents, defaults to the configured threshold.
        #[arg(long)]
        min_similarity: Option<f32>,
    },

    /// Show knowledge base and model statistics.
    Stats,

    /// Remove every document from the knowledge base.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,

        /// Also remove cached embeddings.
        #[arg(long)]
        cache: bool,
    },

    /// Inspect or create configuration files.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON.
    Show,

    /// Write the default configuration to a file.
    Init {
        path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Resolve configuration, set up logging and run the parsed command.
pub async fn run(cli: Cli) -> Result<(), RagError> {
    let resolved = init_config(cli.config.as_deref(), &[]);

    let config = match resolved {
        Ok(ref config) => config.clone(),
        Err(_) => get_config(),
    };

    let _guard = match logging::init(&config.logging, cli.log_options()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("warning: unable to initialize logging: {e}");
            None
        }
    };

    if let Err(e) = resolved {
        warn!("Configuration initialization failed, falling back to defaults: {e}");
    }

    let stdin = std::io::stdin();

    // Stdout stays unlocked, blocking tasks log to it.
    execute(cli.command, config, &mut stdin.lock(), &mut std::io::stdout()).await
}

/// Run `command`, reading confirmations from `input` and writing results to `out`.
pub async fn execute(
    command: Command,
    config: Arc<AppConfig>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<(), RagError> {
    match command {
        Command::Add {
            paths,
            no_recursive,
        } => {
            info!("Adding documents: {paths:?}");
            let engine = RagEngine::from_config(config).await?;
            let added = engine.add_documents(&paths, !no_recursive).await?;
            map_err!(writeln!(out, "Added {added} chunk(s)"));
        }

        Command::Query {
            question,
            n_results,
            format,
            min_similarity,
        } => {
            let engine = RagEngine::from_config(config).await?;
            let options = QueryOptions {
                n_results,
                min_similarity,
                ..Default::default()
            };
            let result = engine.query(&question, &options).await?;

            let output = match format {
                OutputFormat::Json => map_err!(serde_json::to_string_pretty(&result)),
                OutputFormat::Text => format_query_result(&result),
            };
            map_err!(writeln!(out, "{output}"));
        }

        Command::Stats => {
            let engine = RagEngine::from_config(config).await?;
            let stats = engine.stats().await?;

            let health = if stats.ollama_health { "ok" } else { "unavailable" };
            let dimension = stats
                .vector_store
                .dimension
                .map_or_else(|| "-".to_string(), |d| d.to_string());

            map_err!(writeln!(out, "Documents:         {}", stats.document_count));
            map_err!(writeln!(out, "Ollama health:     {health}"));
            map_err!(writeln!(out, "Available models:  {}", stats.available_models.join(", ")));
            map_err!(writeln!(out, "Collection:        {}", stats.vector_store.name));
            map_err!(writeln!(out, "Persist directory: {}", stats.vector_store.persist_directory.display()));
            map_err!(writeln!(out, "Dimension:         {dimension}"));
            map_err!(writeln!(out, "Distance:          {}", stats.vector_store.distance));
        }

        Command::Clear { yes, cache } => {
            if !yes {
                map_err!(write!(
                    out,
                    "This deletes every document and vector in the knowledge base, continue? (y/N): "
                ));
                map_err!(out.flush());

                let mut answer = String::new();
                map_err!(input.read_line(&mut answer));

                if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                    map_err!(writeln!(out, "Cancelled"));
                    return Ok(());
                }
            }

            let engine = RagEngine::from_config(config).await?;
            engine.clear().await?;
            map_err!(writeln!(out, "Knowledge base cleared"));

            if cache {
                let removed = engine.clear_cache().await?;
                map_err!(writeln!(out, "Removed {removed} cached embedding(s)"));
            }
        }

        Command::Config(ConfigCommand::Show) => {
            map_err!(writeln!(out, "{}", map_err!(serde_json::to_string_pretty(&*config))));
        }

        Command::Config(ConfigCommand::Init { path, force }) => {
            if path.exists() && !force {
                return err!(
                    AlreadyExists,
                    "'{}', pass --force to overwrite it",
                    path.display()
                );
            }
            AppConfig::default().to_file(&path)?;
            map_err!(writeln!(out, "Wrote default configuration to {}", path.display()));
        }
    }

    Ok(())
}

/// Human readable rendition of a [QueryResult].
pub fn format_query_result(result: &QueryResult) -> String {
    let mut output = format!(
        "Question: {}\n\nAnswer: {}\n",
        result.question, result.answer
    );

    if !result.retrieved_documents.is_empty() {
        output.push_str(&format!(
            "\nSources ({}):\n",
            result.retrieved_documents.len()
        ));

        for (i, doc) in result.retrieved_documents.iter().enumerate() {
            let mut preview: String = doc.content.chars().take(PREVIEW_CHARS).collect();
            if doc.content.chars().count() > PREVIEW_CHARS {
                preview.push_str("...");
            }

            output.push_str(&format!(
                "\n{}. Source: {}\n   Similarity: {:.3}\n   Content: {preview}\n",
                i + 1,
                doc.source.as_deref().unwrap_or("unknown"),
                doc.similarity_score,
            ));
        }
    }

    output.push_str(&format!("\nTime: {:.2}s", result.processing_time));

    output
}
