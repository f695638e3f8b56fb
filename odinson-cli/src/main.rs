//! Command-line client for an Odinson index.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a local document without contacting the server
//! odinson inspect corpus/doc-1.json.gz
//!
//! # Index a batch of documents, capping sentence length
//! odinson --address http://localhost:9000 index corpus/*.json.gz --max-tokens 200
//!
//! # Print every hit of a pattern as JSON lines
//! odinson search '[lemma=eat] []' --metadata-query 'year > 2000'
//! ```
//!
//! `ODINSON_ADDRESS` and `ODINSON_TIMEOUT_SECS` are read from the
//! environment or a `.env` file. Logs go to stderr, filtered by `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use odinson_doc::{ContentHash, Document};
use odinson_rest::{ClientConfig, HttpOdinsonClient, PatternQuery};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "odinson")]
#[command(about = "Index, validate and search documents in an Odinson instance")]
#[command(version)]
struct Cli {
    /// Base address of the Odinson REST API
    #[arg(
        long,
        global = true,
        env = "ODINSON_ADDRESS",
        default_value = odinson_rest::config::DEFAULT_ADDRESS
    )]
    address: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "ODINSON_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a local document and print a summary
    Inspect { file: PathBuf },
    /// Add documents to the index
    Index {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Maximum tokens per sentence
        #[arg(long)]
        max_tokens: Option<usize>,
    },
    /// Replace an indexed document with the contents of a file
    Update {
        file: PathBuf,
        #[arg(long)]
        max_tokens: Option<usize>,
    },
    /// Remove a document from the index
    Delete { id: String },
    /// Ask the server to validate a document without indexing it
    Validate {
        file: PathBuf,
        /// Use the relaxed validator
        #[arg(long)]
        relaxed: bool,
    },
    /// Print every hit of a pattern as JSON lines
    Search {
        pattern: String,
        #[arg(long)]
        metadata_query: Option<String>,
        #[arg(long)]
        label: Option<String>,
        /// Commit results to the index state
        #[arg(long)]
        commit: bool,
        /// Stop after this many hits
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print the sentence count and corpus summary
    Stats,
}

impl Cli {
    fn client(&self) -> anyhow::Result<HttpOdinsonClient> {
        let mut builder = ClientConfig::builder().address(self.address.as_str());
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(HttpOdinsonClient::new(builder.build()?)?)
    }
}

fn load(path: &Path) -> anyhow::Result<Document> {
    Document::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &cli.command {
        Command::Inspect { file } => {
            let doc = load(file)?;
            println!("id:        {}", doc.id());
            println!("hash:      {}", doc.content_hash());
            println!("metadata:  {}", doc.metadata().len());
            println!("sentences: {}", doc.sentences().len());
            println!("tokens:    {}", doc.num_tokens());
            let attributes: Vec<&str> = doc.attributes().keys().map(String::as_str).collect();
            println!("attributes: {}", attributes.join(", "));
        }
        Command::Index { files, max_tokens } => {
            let client = cli.client()?;
            for file in files {
                let doc = load(file)?;
                client
                    .index(&doc, *max_tokens)
                    .await
                    .with_context(|| format!("failed to index {}", file.display()))?;
                info!(document.id = %doc.id(), file = %file.display(), "indexed");
            }
        }
        Command::Update { file, max_tokens } => {
            let doc = load(file)?;
            cli.client()?.update(&doc, *max_tokens).await?;
            info!(document.id = %doc.id(), "updated");
        }
        Command::Delete { id } => {
            cli.client()?.delete(id).await?;
            info!(document.id = %id, "deleted");
        }
        Command::Validate { file, relaxed } => {
            let doc = load(file)?;
            cli.client()?.validate(&doc, !relaxed).await?;
            println!("{}: valid", doc.id());
        }
        Command::Search { pattern, metadata_query, label, commit, limit } => {
            let mut query = PatternQuery::new(pattern.as_str()).with_commit(*commit);
            if let Some(metadata_query) = metadata_query {
                query = query.with_metadata_query(metadata_query.as_str());
            }
            if let Some(label) = label {
                query = query.with_label(label.as_str());
            }

            let hits = cli.client()?.search_all(query).into_stream();
            let mut hits = match limit {
                Some(n) => hits.take(*n).boxed(),
                None => hits.boxed(),
            };
            let mut count = 0usize;
            while let Some(hit) = hits.next().await {
                println!("{}", serde_json::to_string(&hit)?);
                count += 1;
            }
            info!(hits = count, "search finished");
        }
        Command::Stats => {
            let client = cli.client()?;
            let numdocs = client.numdocs().await?;
            let corpus = client.corpus().await?;
            println!("sentences: {numdocs}");
            println!("{}", serde_json::to_string_pretty(&corpus)?);
        }
    }

    Ok(())
}
