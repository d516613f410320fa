//! Comex load/query/clear operations exposed as LLM tools.
//!
//! Every tool answers with text (or JSON) the model can read, including for bad input,
//! so a ReAct loop can recover without the broker's error wrapping.

use crate::comex::catalog::{classify_question, parse_month, TradeFlow};
use crate::comex::loader::ComexLoader;
use crate::comex::store::ComexStore;
use crate::error::Result;
use crate::llm::tools::{FunctionTool, LlmTool};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

pub const LOAD_DATA_TOOL: &str = "load_comex_data";
pub const LOAD_DATA_SMART_TOOL: &str = "load_comex_data_smart";
pub const LOAD_YEAR_TOOL: &str = "load_comex_year";
pub const SUMMARIZE_TOOL: &str = "summarize_comex_data";
pub const TOP_ENTITIES_TOOL: &str = "analyze_top_entities";
pub const STATISTICS_TOOL: &str = "get_general_statistics";
pub const CLEAR_TOOL: &str = "clear_comex_data";

const NOTHING_LOADED: &str = "Nenhum dado carregado. Use 'load_comex_data' primeiro.";
/// State column of the municipality files, then of the NCM files
const STATE_COLUMNS: [&str; 2] = ["SG_UF_MUN", "SG_UF_NCM"];
const NET_WEIGHT_COLUMN: &str = "KG_LIQUIDO";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadDataArgs {
    /// Ano com quatro dígitos, por exemplo "2024"
    pub year: String,
    /// Mês por extenso em português ("abril") ou número ("4")
    pub month: String,
    /// "EXP" para exportação ou "IMP" para importação
    pub operation_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadDataSmartArgs {
    /// Ano com quatro dígitos
    pub year: String,
    /// Mês por extenso em português ou número
    pub month: String,
    /// A pergunta original do usuário
    pub original_question: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LoadYearArgs {
    /// Ano com quatro dígitos
    pub year: String,
    /// A pergunta original do usuário
    pub original_question: String,
    /// Reutilizar o cache local quando existir
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SummarizeArgs {
    /// "média do peso líquido" ou "principais estados"
    pub query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TopEntitiesArgs {
    /// Coluna de categoria, como "SG_UF_MUN" (estados) ou "NO_NCM_POR" (produtos)
    pub category_column: String,
    /// Coluna numérica somada por categoria, como "VL_FOB" ou "KG_LIQUIDO"
    pub metric_column: String,
    /// Quantidade de entidades retornadas
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct StatisticsArgs {
    /// Coluna numérica, como "VL_FOB" ou "KG_LIQUIDO"
    pub column: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArgs {}

fn default_use_cache() -> bool {
    true
}

fn default_top_n() -> usize {
    5
}

/// The comex operations over one shared store and one loader.
#[derive(Clone)]
pub struct ComexTools {
    store: ComexStore,
    loader: Arc<ComexLoader>,
}

impl ComexTools {
    pub fn new(store: ComexStore, loader: Arc<ComexLoader>) -> Self {
        Self { store, loader }
    }

    pub fn store(&self) -> &ComexStore {
        &self.store
    }

    /// Download one month of `operation_type` and make it the active table.
    pub async fn load_data(&self, year: &str, month: &str, operation_type: &str) -> String {
        let Some(month_number) = parse_month(month) else {
            return "Mês inválido.".to_string();
        };
        let Ok(flow) = operation_type.parse::<TradeFlow>() else {
            return "Tipo de operação inválido. Use 'EXP' ou 'IMP'.".to_string();
        };

        match self.loader.fetch_month(flow, year, month_number, true).await {
            Ok(dataset) if dataset.is_empty() => {
                self.store.clear();
                format!("Nenhum dado de {} encontrado para {}/{}.", flow, month, year)
            }
            Ok(dataset) => {
                info!(flow = %flow, year, month = month_number, rows = dataset.num_rows(), "Loaded comex month");
                self.store.load(dataset);
                format!("Dados de {} para {}/{} carregados com sucesso.", flow, month, year)
            }
            Err(e) => {
                warn!(flow = %flow, year, error = %e, "Loading comex month failed");
                format!("Ocorreu um erro ao processar os dados: {}", e)
            }
        }
    }

    /// Like [`load_data`](Self::load_data), deciding EXP or IMP from the user's question.
    pub async fn load_data_smart(&self, year: &str, month: &str, original_question: &str) -> String {
        match classify_question(original_question) {
            Some(flow) => self.load_data(year, month, flow.as_str()).await,
            None => undetermined_flow(),
        }
    }

    pub async fn load_year(&self, year: &str, original_question: &str, use_cache: bool) -> String {
        let Some(flow) = classify_question(original_question) else {
            return undetermined_flow();
        };

        match self.loader.fetch_year(flow, year, use_cache).await {
            Ok(dataset) if dataset.is_empty() => {
                self.store.clear();
                format!("Nenhum dado de {} encontrado para {}.", flow, year)
            }
            Ok(dataset) => {
                let rows = dataset.num_rows();
                self.store.load(dataset);
                format!("Dados de {} para o ano {} carregados com sucesso ({} registros).", flow, year, rows)
            }
            Err(e) => {
                warn!(flow = %flow, year, error = %e, "Loading comex year failed");
                format!("Ocorreu um erro ao processar os dados: {}", e)
            }
        }
    }

    /// Answer one of the two fixed summary queries over the active table.
    pub fn summarize(&self, query: &str) -> Result<String> {
        let Some(dataset) = self.store.current() else {
            return Ok(NOTHING_LOADED.to_string());
        };

        let query = query.to_lowercase();
        if query.contains("média do peso líquido") {
            let mean = dataset.mean(NET_WEIGHT_COLUMN)?.unwrap_or(0.0);
            Ok(format!("A média do peso líquido é de {:.2} kg.", mean))
        } else if query.contains("principais estados") {
            let columns = dataset.column_names();
            let state_column = STATE_COLUMNS
                .into_iter()
                .find(|c| columns.iter().any(|name| name == c))
                .unwrap_or(STATE_COLUMNS[0]);
            let lines: Vec<String> = dataset
                .value_counts(state_column, 5)?
                .into_iter()
                .map(|(state, count)| format!("{}    {}", state, count))
                .collect();
            Ok(format!("Os 5 principais estados são:\n{}", lines.join("\n")))
        } else {
            Ok("Consulta não reconhecida.".to_string())
        }
    }

    /// Top `top_n` categories by summed metric, as a list of `{category: metric}` records.
    pub fn top_entities(&self, category_column: &str, metric_column: &str, top_n: usize) -> Result<Value> {
        let Some(dataset) = self.store.current() else {
            return Ok(json!(NOTHING_LOADED));
        };

        let records: Vec<Value> = dataset
            .top_by(category_column, metric_column, top_n)?
            .into_iter()
            .map(|(category, total)| {
                let mut record = Map::new();
                record.insert(category_column.to_string(), json!(category));
                record.insert(metric_column.to_string(), json!(total));
                Value::Object(record)
            })
            .collect();

        Ok(Value::Array(records))
    }

    pub fn general_statistics(&self, column: &str) -> Result<Value> {
        let Some(dataset) = self.store.current() else {
            return Ok(json!(NOTHING_LOADED));
        };

        let stats = dataset.column_stats(column)?;
        Ok(json!({ "column": column, "statistics": stats }))
    }

    pub fn clear(&self) -> String {
        if self.store.clear() {
            info!("Cleared comex data");
        }
        "Os dados foram removidos da memória.".to_string()
    }

    /// All comex tools, sharing this store and loader.
    pub fn tools(&self) -> Vec<Box<dyn LlmTool>> {
        let load = {
            let this = self.clone();
            FunctionTool::from_fn(
                LOAD_DATA_TOOL,
                "Baixa os dados de comércio exterior (EXP ou IMP) de um mês e ano e os carrega na memória. \
                 Parâmetros: 'year', 'month' e 'operation_type'.",
                move |args: LoadDataArgs| {
                    let this = this.clone();
                    async move { Ok(this.load_data(&args.year, &args.month, &args.operation_type).await) }
                },
            )
        };

        let load_smart = {
            let this = self.clone();
            FunctionTool::from_fn(
                LOAD_DATA_SMART_TOOL,
                "Primeiro passo obrigatório. Baixa os dados de um mês/ano específico. \
                 Esta ferramenta descobre se é exportação ou importação pela pergunta do usuário. \
                 Usa os parâmetros 'year', 'month' e 'original_question'.",
                move |args: LoadDataSmartArgs| {
                    let this = this.clone();
                    async move { Ok(this.load_data_smart(&args.year, &args.month, &args.original_question).await) }
                },
            )
        };

        let load_year = {
            let this = self.clone();
            FunctionTool::from_fn(
                LOAD_YEAR_TOOL,
                "Baixa os dados de um ano inteiro, descobrindo se é exportação ou importação pela pergunta \
                 do usuário. Usa o cache local quando disponível.",
                move |args: LoadYearArgs| {
                    let this = this.clone();
                    async move { Ok(this.load_year(&args.year, &args.original_question, args.use_cache).await) }
                },
            )
        };

        let summarize = {
            let this = self.clone();
            FunctionTool::from_fn(
                SUMMARIZE_TOOL,
                "Executa uma consulta fixa nos dados carregados: 'média do peso líquido' ou 'principais estados'.",
                move |args: SummarizeArgs| {
                    let this = this.clone();
                    async move { this.summarize(&args.query) }
                },
            )
        };

        let top = {
            let this = self.clone();
            FunctionTool::from_fn(
                TOP_ENTITIES_TOOL,
                "Use esta ferramenta APÓS carregar os dados. \
                 Retorna um JSON com os top N de uma categoria (estados, produtos) por valor ('VL_FOB') \
                 ou peso ('KG_LIQUIDO'). Use 'SG_UF_MUN' para estados e 'NO_NCM_POR' para nome do produto.",
                move |args: TopEntitiesArgs| {
                    let this = this.clone();
                    async move { this.top_entities(&args.category_column, &args.metric_column, args.top_n) }
                },
            )
        };

        let statistics = {
            let this = self.clone();
            FunctionTool::from_fn(
                STATISTICS_TOOL,
                "Use esta ferramenta APÓS carregar os dados. \
                 Retorna um JSON com estatísticas gerais (soma, média, etc.) sobre uma coluna numérica.",
                move |args: StatisticsArgs| {
                    let this = this.clone();
                    async move { this.general_statistics(&args.column) }
                },
            )
        };

        let clear = {
            let this = self.clone();
            FunctionTool::from_blocking_fn(
                CLEAR_TOOL,
                "Use esta ferramenta ao final de toda a análise para limpar os dados da memória.",
                move |_: NoArgs| this.clear(),
            )
        };

        vec![
            Box::new(load),
            Box::new(load_smart),
            Box::new(load_year),
            Box::new(summarize),
            Box::new(top),
            Box::new(statistics),
            Box::new(clear),
        ]
    }
}

fn undetermined_flow() -> String {
    "Não foi possível determinar se a pergunta é sobre exportação (EXP) ou importação (IMP). \
     Use 'load_comex_data' informando o tipo de operação."
        .to_string()
}
