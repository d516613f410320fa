//! Error types and result aliases for crewlab.
//!
//! This module defines the core error type [`CrewLabError`] and the [`Result`] type alias
//! used throughout the library. Agent-facing tools turn these errors into readable strings
//! at the tool boundary; everything below that boundary propagates them with `?`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrewLabError {
    #[error("LLM gateway error: {0}")]
    GatewayError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Tool error: {0}")]
    ToolError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Agent error: {0}")]
    AgentError(String),

    #[error("Crew error: {0}")]
    CrewError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),

    #[error("Zip error: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Background task failed: {0}")]
    JoinError(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, CrewLabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_display() {
        let err = CrewLabError::GatewayError("connection failed".to_string());
        assert_eq!(err.to_string(), "LLM gateway error: connection failed");
    }

    #[test]
    fn test_tool_error_display() {
        let err = CrewLabError::ToolError("invalid parameters".to_string());
        assert_eq!(err.to_string(), "Tool error: invalid parameters");
    }

    #[test]
    fn test_config_error_display() {
        let err = CrewLabError::ConfigError("missing API key".to_string());
        assert_eq!(err.to_string(), "Invalid configuration: missing API key");
    }

    #[test]
    fn test_crew_error_display() {
        let err = CrewLabError::CrewError("no tasks".to_string());
        assert_eq!(err.to_string(), "Crew error: no tasks");
    }

    #[test]
    fn test_serialization_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: CrewLabError = json_err.into();

        match err {
            CrewLabError::SerializationError(_) => {}
            _ => panic!("Expected SerializationError"),
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CrewLabError = io_err.into();

        match err {
            CrewLabError::IoError(_) => {}
            _ => panic!("Expected IoError"),
        }
    }

    #[test]
    fn test_arrow_error_conversion() {
        let arrow_err = arrow::error::ArrowError::ComputeError("bad column".to_string());
        let err: CrewLabError = arrow_err.into();
        assert!(err.to_string().starts_with("Arrow error:"));
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert!(matches!(ok_result, Ok(42)));

        let err_result: Result<i32> = Err(CrewLabError::ToolError("test".to_string()));
        assert!(err_result.is_err());
    }
}
