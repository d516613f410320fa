//! Warm the local comex cache for 2023 and 2024, exports and imports, concurrently.

use crewlab::comex::TradeFlow;
use crewlab::config::{self, Settings};
use std::time::Instant;

const YEARS: [&str; 2] = ["2023", "2024"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init_tracing();
    let settings = Settings::from_env();
    let loader = settings.comex_loader();

    println!("Pré-aquecendo o cache em {}", settings.cache_dir.display());
    let started = Instant::now();

    let outcomes = loader.precache(&YEARS, &TradeFlow::ALL).await;

    for outcome in &outcomes {
        match &outcome.rows {
            Ok(rows) => println!("  {} {}: {} registros", outcome.flow, outcome.year, rows),
            Err(e) => println!("  {} {}: falhou ({})", outcome.flow, outcome.year, e),
        }
    }
    println!("Pré-aquecimento concluído em {:.2} segundos.", started.elapsed().as_secs_f64());

    Ok(())
}
