//! Register plain typed functions as LLM tools.
//!
//! The argument type of the function derives [`serde::Deserialize`] and
//! [`schemars::JsonSchema`]; the JSON schema advertised to the model is generated from it,
//! and incoming arguments are validated by deserializing into it.

use crate::error::{CrewLabError, Result};
use crate::llm::tools::{LlmTool, ToolDescriptor};
use async_trait::async_trait;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

type Handler<A> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A tool backed by a function taking a typed argument struct.
///
/// # Examples
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct Args { text: String }
///
/// let tool = FunctionTool::from_blocking_fn("shout", "Upper-cases the text", |a: Args| {
///     a.text.to_uppercase()
/// });
/// ```
pub struct FunctionTool<A> {
    name: String,
    description: String,
    parameters: Value,
    handler: Handler<A>,
}

impl<A> Clone for FunctionTool<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<A> FunctionTool<A>
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
{
    /// Register an async function.
    pub fn from_fn<F, Fut, R>(
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Serialize,
    {
        let handler: Handler<A> = Arc::new(move |args: A| {
            let fut = f(args);
            Box::pin(async move {
                let output = fut.await?;
                Ok(serde_json::to_value(output)?)
            })
        });

        Self::with_handler(name, description, handler)
    }

    /// Register a blocking function; each call is dispatched onto the blocking thread pool.
    pub fn from_blocking_fn<F, R>(
        name: impl Into<String>,
        description: impl Into<String>,
        f: F,
    ) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
        R: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler: Handler<A> = Arc::new(move |args: A| {
            let f = Arc::clone(&f);
            Box::pin(async move {
                let output = tokio::task::spawn_blocking(move || f(args)).await?;
                Ok(serde_json::to_value(output)?)
            })
        });

        Self::with_handler(name, description, handler)
    }

    fn with_handler(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Handler<A>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: parameters_schema::<A>(),
            handler,
        }
    }
}

#[async_trait]
impl<A> LlmTool for FunctionTool<A>
where
    A: DeserializeOwned + JsonSchema + Send + 'static,
{
    async fn run(&self, args: &HashMap<String, Value>) -> Result<Value> {
        let parsed: A = parse_args(args)?;
        (self.handler)(parsed).await
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::function(&self.name, &self.description, self.parameters.clone())
    }

    fn clone_box(&self) -> Box<dyn LlmTool> {
        Box::new(self.clone())
    }
}

/// Deserialize tool-call arguments into a typed struct.
pub fn parse_args<T: DeserializeOwned>(args: &HashMap<String, Value>) -> Result<T> {
    let object: Map<String, Value> = args.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| CrewLabError::InvalidArgument(e.to_string()))
}

/// JSON schema of an argument struct, shaped for the `parameters` field of a tool descriptor.
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({"type": "object"}));

    if let Value::Object(ref mut map) = value {
        map.remove("$schema");
        map.remove("title");
        map.entry("properties").or_insert_with(|| json!({}));
    }

    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArgs {
        /// Text to repeat
        text: String,
        times: Option<usize>,
    }

    fn echo_tool() -> FunctionTool<EchoArgs> {
        FunctionTool::from_blocking_fn("echo", "Repeats text", |a: EchoArgs| {
            a.text.repeat(a.times.unwrap_or(1))
        })
    }

    #[test]
    fn test_descriptor_schema_from_args() {
        let descriptor = echo_tool().descriptor();

        assert_eq!(descriptor.function.name, "echo");
        assert_eq!(descriptor.function.description, "Repeats text");

        let params = descriptor.function.parameters;
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["text"]["type"], "string");
        assert_eq!(params["properties"]["text"]["description"], "Text to repeat");
        assert_eq!(params["required"], json!(["text"]));
        assert!(params.get("$schema").is_none());
        assert!(params.get("title").is_none());
    }

    #[tokio::test]
    async fn test_run_blocking_fn() {
        let mut args = HashMap::new();
        args.insert("text".to_string(), json!("ab"));
        args.insert("times".to_string(), json!(3));

        let result = echo_tool().run(&args).await.unwrap();
        assert_eq!(result, json!("ababab"));
    }

    #[tokio::test]
    async fn test_run_async_fn() {
        let tool = FunctionTool::from_fn("length", "Counts characters", |a: EchoArgs| async move {
            Ok(a.text.chars().count())
        });

        let mut args = HashMap::new();
        args.insert("text".to_string(), json!("ação"));

        assert_eq!(tool.run(&args).await.unwrap(), json!(4));
    }

    #[tokio::test]
    async fn test_run_rejects_missing_argument() {
        let err = echo_tool().run(&HashMap::new()).await.unwrap_err();
        match err {
            CrewLabError::InvalidArgument(message) => assert!(message.contains("text")),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[derive(Deserialize, JsonSchema)]
    struct NoArgs {}

    #[test]
    fn test_schema_for_empty_args_has_properties() {
        let params = parameters_schema::<NoArgs>();
        assert_eq!(params["type"], "object");
        assert!(params["properties"].is_object());
    }

    #[test]
    fn test_clone_box_keeps_name() {
        let tool = echo_tool();
        let cloned = tool.clone_box();
        assert!(cloned.matches("echo"));
    }
}
