//! Operator CLI for the hybrid retriever.
//!
//! Configuration comes from `RAG_*` environment variables; logs go to stderr
//! and results to stdout as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};

use hybrid_rag::rag::{
    ChunkIndexer, HybridRetriever, NO_DOCUMENTS_ANSWER, RagConfig, build_context_block,
    init_tracing, summarize_sources,
};

#[derive(Debug, Parser)]
#[command(version, about = "Hybrid BM25 + vector retrieval with cross-encoder reranking")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Retrieve the best passages for a question.
    Query {
        /// Question text.
        text: String,
        /// Restrict vector search to this workspace.
        #[arg(long)]
        workspace: Option<String>,
        /// Candidates contributed by each retrieval path.
        #[arg(long)]
        n: Option<usize>,
        /// Print the context block for the answer generator instead of JSON.
        #[arg(long)]
        context: bool,
    },
    /// List indexed documents with their chunk counts.
    Sources,
    /// Delete every chunk of a document.
    DeleteSource {
        /// Document path or key as stored in `source`.
        source: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let args = Args::parse();
    let config = RagConfig::from_env().context("reading RAG_* environment")?;
    let retriever = HybridRetriever::from_config(config)
        .await
        .context("initializing retrieval backends")?;

    match args.command {
        Command::Query {
            text,
            workspace,
            n,
            context,
        } => {
            let report = retriever
                .retrieve_with_report(&text, n, workspace.as_deref())
                .await
                .context("retrieval failed")?;
            if context {
                if report.passages.is_empty() {
                    println!("{NO_DOCUMENTS_ANSWER}");
                } else {
                    let passages: Vec<_> = report
                        .passages
                        .into_iter()
                        .map(|scored| scored.candidate.passage)
                        .collect();
                    print!("{}", build_context_block(&text, &passages));
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
        Command::Sources => {
            let index = retriever.index();
            let summaries = summarize_sources(index.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::DeleteSource { source } => {
            let indexer = ChunkIndexer::new(retriever.index(), retriever.embedder());
            let removed = indexer.remove_source(&source).await?;
            println!("{}", serde_json::json!({ "source": source, "removed": removed }));
        }
    }

    Ok(())
}
