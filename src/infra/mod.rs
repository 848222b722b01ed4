pub mod llm;
pub mod templates;
