//! Lookup tables for comex requests: month names, trade flows, and years.

use crate::error::{CrewLabError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MONTHS: [(&str, u32); 12] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
];

const EXPORT_KEYWORDS: [&str; 3] = ["export", "vend", "saída"];
const IMPORT_KEYWORDS: [&str; 4] = ["import", "compra", "comprad", "entrada"];

/// Month number for a Portuguese month name or a numeric string (`"1"` to `"12"`).
pub fn parse_month(month: &str) -> Option<u32> {
    let month = month.trim().to_lowercase();

    if let Ok(number) = month.parse::<u32>() {
        return (1..=12).contains(&number).then_some(number);
    }

    MONTHS.iter().find(|(name, _)| *name == month).map(|(_, number)| *number)
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS.iter().find(|(_, number)| *number == month).map(|(name, _)| *name)
}

/// A year must be exactly four digits.
pub fn parse_year(year: &str) -> Result<&str> {
    let year = year.trim();
    if year.len() == 4 && year.chars().all(|c| c.is_ascii_digit()) {
        Ok(year)
    } else {
        Err(CrewLabError::InvalidArgument(format!(
            "Invalid year '{}': expected four digits",
            year
        )))
    }
}

/// Direction of trade in the comex files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeFlow {
    #[serde(rename = "EXP")]
    Exp,
    #[serde(rename = "IMP")]
    Imp,
}

impl TradeFlow {
    pub const ALL: [TradeFlow; 2] = [TradeFlow::Exp, TradeFlow::Imp];

    pub fn as_str(self) -> &'static str {
        match self {
            TradeFlow::Exp => "EXP",
            TradeFlow::Imp => "IMP",
        }
    }
}

impl fmt::Display for TradeFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeFlow {
    type Err = CrewLabError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "EXP" => Ok(TradeFlow::Exp),
            "IMP" => Ok(TradeFlow::Imp),
            other => Err(CrewLabError::InvalidArgument(format!(
                "Unknown trade flow '{}': expected EXP or IMP",
                other
            ))),
        }
    }
}

/// Guess whether a question is about exports or imports.
///
/// Standalone `exp`/`imp` tokens win; otherwise keywords are matched as substrings.
/// Returns `None` when neither or both directions match.
pub fn classify_question(text: &str) -> Option<TradeFlow> {
    let lower = text.to_lowercase();

    let tokens: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).collect();
    match (tokens.contains(&"exp"), tokens.contains(&"imp")) {
        (true, false) => return Some(TradeFlow::Exp),
        (false, true) => return Some(TradeFlow::Imp),
        _ => {}
    }

    let export = EXPORT_KEYWORDS.iter().any(|k| lower.contains(k));
    let import = IMPORT_KEYWORDS.iter().any(|k| lower.contains(k));
    match (export, import) {
        (true, false) => Some(TradeFlow::Exp),
        (false, true) => Some(TradeFlow::Imp),
        _ => None,
    }
}
