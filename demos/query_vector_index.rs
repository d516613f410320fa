//! Load the persisted indexes and let a function-calling agent query them as tools.
//!
//! Run `build_vector_index` first. Requires `GROQ_API_KEY` and `NVIDIA_API_KEY`.

use crewlab::agents::FunctionCallingAgent;
use crewlab::config::{self, Settings};
use crewlab::llm::LlmTool;
use crewlab::rag::{Embedder, QueryEngineTool, VectorStoreIndex};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();

    let article_dir = settings.storage_dir.join("artigo");
    let book_dir = settings.storage_dir.join("livro");
    if !VectorStoreIndex::exists(&article_dir) || !VectorStoreIndex::exists(&book_dir) {
        eprintln!("A base vetorial não foi encontrada. Execute `cargo run --example build_vector_index` primeiro.");
        return Ok(());
    }

    let embedder: Arc<dyn Embedder> = Arc::new(settings.embedder()?);
    let broker = Arc::new(settings.agent_broker()?);

    let article_engine = Arc::new(VectorStoreIndex::load(&article_dir)?)
        .as_query_engine(Arc::clone(&embedder), Arc::clone(&broker))
        .with_similarity_top_k(3);
    let book_engine = Arc::new(VectorStoreIndex::load(&book_dir)?)
        .as_query_engine(Arc::clone(&embedder), Arc::clone(&broker))
        .with_similarity_top_k(3);

    let tools: Vec<Box<dyn LlmTool>> = vec![
        Box::new(QueryEngineTool::new(
            article_engine,
            "artigo_engine",
            "Fornece informações sobre algoritmos de IA em redes sociais a partir de um artigo.",
        )),
        Box::new(QueryEngineTool::new(
            book_engine,
            "livro_engine",
            "Fornece informações sobre tendências de IA a partir de um livro.",
        )),
    ];

    let mut agent = FunctionCallingAgent::builder(settings.agent_broker()?)
        .tools(tools)
        .verbose(true)
        .build();

    for question in [
        "Quais os principais algoritmos de IA usados nas redes sociais?",
        "Quais as principais tendências de IA que eu deveria estudar?",
    ] {
        println!("\n--- {} ---", question);
        let answer = agent.chat(question).await?;
        println!("Resposta do agente: {}", answer);
    }

    Ok(())
}
