//! ReAct agent answering foreign-trade questions over the comex tools.
//!
//! Requires `GROQ_API_KEY`. Yearly files are cached under `CREWLAB_CACHE_DIR`.

use crewlab::agents::ReActAgent;
use crewlab::comex::{ComexStore, ComexTools, LOAD_DATA_TOOL, LOAD_YEAR_TOOL, SUMMARIZE_TOOL};
use crewlab::config::{self, Settings};
use crewlab::llm::LlmTool;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();

    let comex = ComexTools::new(ComexStore::new(), Arc::new(settings.comex_loader()));
    let tools: Vec<Box<dyn LlmTool>> = comex
        .tools()
        .into_iter()
        .filter(|t| {
            let name = t.descriptor().function.name;
            ![LOAD_DATA_TOOL, LOAD_YEAR_TOOL, SUMMARIZE_TOOL].contains(&name.as_str())
        })
        .collect();

    let mut agent = ReActAgent::builder(settings.agent_broker()?)
        .tools(tools)
        .max_steps(10)
        .context(
            "Use 'SG_UF_MUN' para estados e 'NO_NCM_POR' para produtos. \
             As métricas disponíveis são 'VL_FOB' (valor) e 'KG_LIQUIDO' (peso).",
        )
        .verbose(true)
        .build();

    for question in [
        "Quais foram os principais estados exportadores em abril de 2024? Me dê um insight sobre os dados.",
        "Analise as importações de maio de 2024. Quais os 3 produtos mais comprados pelo Brasil em termos de valor? \
         Some o valor total importado no mês.",
    ] {
        println!("\n--- {} ---", question);
        let answer = agent.chat(question).await?;
        println!("Resposta do agente: {}", answer);

        comex.clear();
        agent.reset();
    }

    Ok(())
}
