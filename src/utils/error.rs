use crate::utils::output::OutputStyle;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("System error: {0}")]
    System(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Result type alias for consistent error handling across the application
pub type AppResult<T> = Result<T, AppError>;

pub fn report_error(err: &AppError) {
    match err {
        AppError::Network(msg) => {
            println!("🌐 {}", OutputStyle::error(&format!("Network: {}", msg)));
        }
        AppError::Llm(msg) => {
            println!("🤖 {}", OutputStyle::error(&format!("LLM: {}", msg)));
        }
        AppError::Geometry(msg) => {
            eprintln!("❌ {}", OutputStyle::error(&format!("Geometry: {}", msg)));
        }
        AppError::Mesh(msg) => {
            eprintln!("❌ {}", OutputStyle::error(&format!("Mesh: {}", msg)));
        }
        AppError::Solver(msg) => {
            eprintln!("❌ {}", OutputStyle::error(&format!("Solver: {}", msg)));
        }
        AppError::Io(e) => {
            eprintln!("❌ {}", OutputStyle::error(e));
        }
        AppError::System(msg) => {
            eprintln!("❌ {}", OutputStyle::error(msg));
        }
    }
}
