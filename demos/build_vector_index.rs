//! Build the `artigo` and `livro` vector indexes from the sample corpus and persist them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example build_vector_index
//! ```
//!
//! Requires `NVIDIA_API_KEY` for the embeddings.

use crewlab::config::{self, Settings};
use crewlab::rag::samples::{ARTICLE_FILE, BOOK_FILE};
use crewlab::rag::{ensure_sample_corpus, DirectoryReader, SentenceSplitter, VectorStoreIndex};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();
    let embedder = settings.embedder()?;
    let splitter = SentenceSplitter::default();

    ensure_sample_corpus(&settings.data_dir)?;

    for (name, file) in [("artigo", ARTICLE_FILE), ("livro", BOOK_FILE)] {
        let documents = DirectoryReader::from_files([settings.data_dir.join(file)]).load_data()?;
        info!(index = name, documents = documents.len(), "Building index");

        let index = VectorStoreIndex::from_documents(&documents, &embedder, &splitter).await?;
        let dir = settings.storage_dir.join(name);
        index.persist(&dir)?;
        println!("Índice '{}' salvo em {} ({} nós).", name, dir.display(), index.len());
    }

    println!("\nÍndices vetoriais criados e salvos com sucesso.");
    Ok(())
}
