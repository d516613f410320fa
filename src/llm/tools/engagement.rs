use crate::llm::tools::{FunctionTool, LlmTool};
use schemars::JsonSchema;
use serde::Deserialize;

/// Arguments of the engagement tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct EngagementArgs {
    /// Número de curtidas da postagem
    pub likes: i64,
    /// Número de comentários da postagem
    pub comments: i64,
    /// Número de compartilhamentos da postagem
    pub shares: i64,
    /// Número de seguidores do perfil
    pub followers: i64,
}

/// Total engagement of a post and its rate relative to the follower count.
pub fn calculate_engagement(likes: i64, comments: i64, shares: i64, followers: i64) -> String {
    if followers == 0 {
        return "O número de seguidores não pode ser zero.".to_string();
    }

    let total = i128::from(likes) + i128::from(comments) + i128::from(shares);
    let rate = total as f64 / followers as f64 * 100.0;

    format!("O engajamento total é {} e a taxa de engajamento é {:.2}%.", total, rate)
}

pub fn engagement_tool() -> Box<dyn LlmTool> {
    Box::new(FunctionTool::from_blocking_fn(
        "calculate_engagement",
        "Calcula o engajamento total (curtidas + comentários + compartilhamentos) de uma postagem e a taxa de engajamento em relação ao número de seguidores.",
        |a: EngagementArgs| calculate_engagement(a.likes, a.comments, a.shares, a.followers),
    ))
}
