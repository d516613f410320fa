//! Sequential crew: one agent searches arXiv, then downloads the first PDF it found.
//!
//! Requires `NVIDIA_API_KEY`.

use crewlab::config::{self, Settings};
use crewlab::crew::{Agent, Crew, Task};
use crewlab::llm::tools::arxiv_tools;
use std::sync::Arc;

const ROLE: &str = "Agente de Pesquisa e Download";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();
    let arxiv = Arc::new(settings.arxiv_client());

    let researcher = Agent::builder(
        ROLE,
        "Encontrar e baixar artigos científicos do arXiv.",
        "Você é um agente eficiente que primeiro localiza artigos e depois baixa seus PDFs.",
        settings.crew_broker()?,
    )
    .tools(arxiv_tools(Arc::clone(&arxiv)))
    .verbose(true)
    .build();

    let search = Task::new(
        "pesquisa",
        "Busque artigos no arXiv sobre 'Large Language Models'.",
        "Uma lista formatada dos artigos e seus links. O resultado também deve ser salvo em disco.",
    )
    .agent(ROLE);

    let download = Task::new(
        "download",
        format!(
            "Leia o arquivo '{}' para obter os links da pesquisa anterior. Baixe o PDF do PRIMEIRO artigo da lista.",
            arxiv.results_path().display()
        ),
        "A confirmação de que o PDF foi salvo, com o nome do arquivo.",
    )
    .agent(ROLE)
    .context(["pesquisa"]);

    let crew = Crew::builder()
        .agents(vec![researcher])
        .tasks(vec![search, download])
        .verbose(true)
        .build();

    let result = crew.kickoff().await?;

    println!("\n###################### RESULTADO CREW SEQUENCIAL ######################");
    println!("{}", result);
    Ok(())
}
