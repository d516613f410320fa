//! Brazilian foreign-trade (comex) statistics: download, cache, and query.

mod catalog;
mod dataset;
mod loader;
mod store;
mod tools;

pub use catalog::{classify_question, month_name, parse_month, parse_year, TradeFlow, MONTHS};
pub use dataset::{ColumnStats, ComexDataset, MONTH_COLUMN};
pub use loader::{ComexLoader, ComexSource, Granularity, PrecacheOutcome};
pub use store::ComexStore;
pub use tools::{
    ComexTools, CLEAR_TOOL, LOAD_DATA_SMART_TOOL, LOAD_DATA_TOOL, LOAD_YEAR_TOOL, STATISTICS_TOOL,
    SUMMARIZE_TOOL, TOP_ENTITIES_TOOL,
};

/// Public mirror of the yearly comex files.
pub const COMEX_BASE_URL: &str = "https://balanca.economia.gov.br/balanca/bd/comexstat-bd";
