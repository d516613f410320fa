//! A web researcher and a verifier, run first as a sequential crew and then under a manager.
//!
//! Requires `NVIDIA_API_KEY` and `TAVILY_API_KEY`.

use crewlab::config::{self, ApiKey, Settings};
use crewlab::crew::{Agent, Crew, Process, Task};

const RESEARCHER: &str = "Pesquisador Web Especialista";
const VERIFIER: &str = "Verificador de Artigos";

fn team(settings: &Settings) -> anyhow::Result<Vec<Agent>> {
    let researcher = Agent::builder(
        RESEARCHER,
        "Encontrar artigos científicos na web sobre IA na privacidade.",
        "Você é mestre da pesquisa online, focado em fontes confiáveis.",
        settings.crew_broker()?,
    )
    .tools(vec![Box::new(settings.web_search_tool()?)])
    .verbose(true)
    .build();

    let verifier = Agent::builder(
        VERIFIER,
        "Garantir que os links encontrados são de artigos científicos autênticos.",
        "Você tem um olhar crítico para filtrar apenas artigos genuínos.",
        settings.crew_broker()?,
    )
    .tools(vec![Box::new(settings.web_search_tool()?)])
    .verbose(true)
    .build();

    Ok(vec![researcher, verifier])
}

fn tasks() -> Vec<Task> {
    vec![
        Task::new(
            "pesquisa_web",
            "Busque na web por artigos sobre o impacto da IA na privacidade do usuário em redes sociais.",
            "Uma lista de 5 links para artigos encontrados.",
        )
        .agent(RESEARCHER),
        Task::new(
            "verificacao",
            "Verifique a lista de links da tarefa anterior. Retorne a lista final validada.",
            "Uma lista final de links confirmados como artigos científicos.",
        )
        .agent(VERIFIER)
        .context(["pesquisa_web"]),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();
    settings.require(&[ApiKey::Nvidia, ApiKey::Tavily])?;

    println!("\n--- Executando crew de verificação (sequencial) ---");
    let sequential = Crew::builder()
        .agents(team(&settings)?)
        .tasks(tasks())
        .verbose(true)
        .build();
    let result = sequential.kickoff().await?;
    println!("\n###################### RESULTADO CREW VERIFICAÇÃO ######################");
    println!("{}", result);

    println!("\n--- Executando crew com gerente (hierárquico) ---");
    let manager = Agent::builder(
        "Gerente de Pesquisa",
        "Coordenar a equipe para produzir uma lista validada de artigos sobre IA na privacidade.",
        "Você delega a busca e a verificação para garantir um resultado de alta qualidade.",
        settings.crew_broker()?,
    )
    .allow_delegation(true)
    .verbose(true)
    .build();

    let hierarchical = Crew::builder()
        .agents(team(&settings)?)
        .tasks(tasks())
        .process(Process::Hierarchical)
        .manager_agent(manager)
        .verbose(true)
        .build();
    let result = hierarchical.kickoff().await?;
    println!("\n###################### RESULTADO CREW HIERÁRQUICO ######################");
    println!("{}", result);

    Ok(())
}
