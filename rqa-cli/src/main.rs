use std::io;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rqa_chain::RetrievalQAChain;
use rqa_chain::openai::OpenAIChatGenerator;
use rqa_cli::{Args, EditorSource, logging, run_console};
use rqa_rag::openai::OpenAIEmbeddingProvider;
use rqa_rag::{FileSource, InMemoryVectorStore, Indexer, RecursiveCharacterSplitter, TextLoader};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before parsing so flags can fall back to its variables.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    logging::init(args.log_format, "info");

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => debug!("no .env file found"),
        Err(e) => warn!(error = %e, "failed to load .env file"),
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "rqa stopped");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.rag_config().context("invalid retrieval configuration")?;

    // 1. Load and split the corpus
    let splitter = RecursiveCharacterSplitter::from_config(&config)?;
    let source = FileSource::new(args.corpus.clone());
    let chunks = TextLoader::load_and_split(&source, &splitter)
        .await
        .with_context(|| format!("failed to load corpus '{}'", args.corpus.display()))?;

    // 2. Build the index
    let mut embedder =
        OpenAIEmbeddingProvider::new(&args.api_key)?.with_model(&args.embedding_model);
    if let Some(dimensions) = args.embedding_dimensions {
        embedder = embedder.with_dimensions(dimensions);
    }
    if let Some(base_url) = &args.openai_base_url {
        embedder = embedder.with_base_url(base_url);
    }
    let top_k = config.top_k;
    let indexer = Arc::new(
        Indexer::builder()
            .config(config)
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(InMemoryVectorStore::new()))
            .build()?,
    );
    let index = indexer.build(&chunks).await.context("failed to build the index")?;
    info!(collection = index.collection(), documents = index.document_count(), "index ready");

    // 3. Assemble the chain
    let mut generator = OpenAIChatGenerator::new(&args.api_key)?.with_model(&args.chat_model);
    if let Some(base_url) = &args.openai_base_url {
        generator = generator.with_base_url(base_url);
    }
    let chain = RetrievalQAChain::builder()
        .retriever(Arc::new(indexer.retriever(index)))
        .generator(Arc::new(generator))
        .top_k(top_k)
        .return_source_documents(args.show_sources)
        .build()?;

    // 4. Answer questions until the user is done
    let mut input = EditorSource::new().context("failed to open the terminal")?;
    let options = args.console_options();
    run_console(&chain, &mut input, &mut io::stdout(), &options).await?;
    Ok(())
}
