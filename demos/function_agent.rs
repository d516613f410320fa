//! ReAct agent with the engagement calculator and the arXiv search tool.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example function_agent
//! ```
//!
//! # Requirements
//!
//! - `GROQ_API_KEY` in the environment or a `.env` file

use crewlab::agents::ReActAgent;
use crewlab::config::{self, Settings};
use crewlab::llm::tools::arxiv::search_articles_tool;
use crewlab::llm::tools::engagement_tool;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();

    println!("\n{}", "=".repeat(50));
    println!("Agente de funções: engajamento e arXiv");
    println!("{}\n", "=".repeat(50));

    let arxiv = Arc::new(settings.arxiv_client());
    let mut agent = ReActAgent::builder(settings.agent_broker()?)
        .tools(vec![engagement_tool(), search_articles_tool(arxiv)])
        .verbose(true)
        .build();

    println!("\n--- Calculando engajamento ---");
    let answer = agent
        .chat(
            "Qual é o engajamento de uma postagem com 150 curtidas, 35 comentários, \
             20 compartilhamentos e 2000 seguidores?",
        )
        .await?;
    println!("Resposta do agente: {}", answer);

    agent.reset();

    println!("\n--- Consultando artigos no arXiv ---");
    let answer = agent
        .chat("Me retorne artigos sobre o uso da inteligência artificial nas redes sociais")
        .await?;
    println!("Resposta do agente: {}", answer);

    Ok(())
}
