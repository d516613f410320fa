//! Function-calling agent that searches the web through Tavily.
//!
//! Requires `GROQ_API_KEY` and `TAVILY_API_KEY`.

use crewlab::agents::FunctionCallingAgent;
use crewlab::config::{self, ApiKey, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();
    settings.require(&[ApiKey::Groq, ApiKey::Tavily])?;

    let mut agent = FunctionCallingAgent::builder(settings.agent_broker()?)
        .tools(vec![Box::new(settings.web_search_tool()?)])
        .system_prompt("Você é um pesquisador que responde em português citando os links encontrados.")
        .verbose(true)
        .build();

    let answer = agent
        .chat("Busque na web artigos recentes sobre o impacto da IA na privacidade do usuário em redes sociais.")
        .await?;
    println!("\nResposta do agente:\n{}", answer);

    Ok(())
}
