//! CLI library for testing purposes

pub mod cli;
pub mod config;
pub mod llm;
pub mod prompts;
pub mod run;
pub mod validation;

pub use cli::Args;
pub use config::{FileConfig, Settings};
pub use llm::{LlmConfig, LlmTranslator, Provider};
