use std::time::Instant;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use tracing::{error, info};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::OllamaClient;
use crate::pipeline::RetrievalPipeline;

pub type OllamaPipeline = RetrievalPipeline<OllamaClient, OllamaClient>;

const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

/// Build a pipeline that embeds and answers through the configured Ollama server
#[inline]
pub fn ollama_pipeline(config: Config) -> Result<OllamaPipeline> {
    let client = OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    Ok(RetrievalPipeline::new(config, client.clone(), client).with_progress(true))
}

/// Rebuild the index from scratch
#[inline]
pub fn index_codebase(config: Config) -> Result<()> {
    info!("Indexing {}", config.scan.root.display());
    let pipeline = ollama_pipeline(config)?;

    let started = Instant::now();
    let (store, report) = pipeline
        .index_codebase()
        .context("Indexing failed; no index was written")?;

    println!("Indexing complete in {:.2?}", started.elapsed());
    println!("  Files: {}", report.files);
    println!("  Chunks: {}", report.chunks);
    println!("  Embedded: {}", report.embedded);
    if report.skipped > 0 {
        println!("  Skipped (embedding failed): {}", report.skipped);
    }
    println!("  Stored vectors: {}", store.len());

    Ok(())
}

/// Answer a single question
#[inline]
pub fn ask(config: Config, question: &str) -> Result<()> {
    let pipeline = ollama_pipeline(config)?;
    let store = pipeline
        .open_or_build()
        .context("Failed to open or build the index")?;

    let started = Instant::now();
    let answer = pipeline
        .query(&store, question)
        .context("Failed to answer question")?;

    println!("Answer ({:.2}s):", started.elapsed().as_secs_f64());
    println!("{}", answer);
    Ok(())
}

/// Interactive question loop; a failed question does not end the session
#[inline]
pub fn chat(config: Config) -> Result<()> {
    let pipeline = ollama_pipeline(config)?;
    let store = pipeline
        .open_or_build()
        .context("Failed to open or build the index")?;

    eprintln!(
        "{}",
        style(format!(
            "Index ready with {} chunks. Type 'exit' to quit.",
            store.len()
        ))
        .green()
    );

    loop {
        let question: String = Input::new()
            .with_prompt("Question")
            .allow_empty(true)
            .interact_text()?;
        let question = question.trim();

        if question.is_empty() || EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }

        let started = Instant::now();
        match pipeline.query(&store, question) {
            Ok(answer) => {
                println!();
                println!("Answer ({:.2}s):", started.elapsed().as_secs_f64());
                println!("{}", answer);
                println!();
            }
            Err(e) => {
                error!("Query failed: {}", e);
                eprintln!("{} {}", style("Query failed:").red(), e);
            }
        }
    }

    Ok(())
}

/// Show configuration, index presence, and Ollama health
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Code RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗂️  Source:");
    println!("   Root: {}", config.scan.root.display());
    println!("   Extensions: {}", config.scan.extensions.join(", "));
    println!(
        "   Chunking: {} chars, {} overlap",
        config.chunking.chunk_size, config.chunking.overlap
    );
    println!();

    let dir = config.index_dir();
    let name = &config.index.name;
    println!("🗄️  Index '{}':", name);
    if VectorStore::exists(&dir, name) {
        match VectorStore::load(&dir, name, config.ollama.embedding_dimension) {
            Ok(store) => {
                println!("   ✅ Loaded: {} vectors of dimension {}", store.len(), store.dimension());
                if let Some(created) = VectorStore::created_at(&dir, name) {
                    println!("   Built: {}", created.format("%Y-%m-%d %H:%M:%S"));
                }
            }
            Err(e) => println!("   ❌ Unreadable: {}", e),
        }
    } else {
        println!("   ⚠️  Not built yet (run 'code-rag index')");
    }
    println!("   Location: {}", dir.display());
    println!();

    println!("🤖 Ollama:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => {
            println!("   URL: {}", client.base_url());
            match client.health_check() {
                Ok(()) => println!("   ✅ Reachable, models available"),
                Err(e) => println!("   ❌ {}", e),
            }
        }
        Err(e) => println!("   ❌ Invalid configuration: {}", e),
    }

    Ok(())
}
