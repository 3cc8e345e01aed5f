pub mod field_extractor;
pub mod llm_service;
pub mod spreadsheet;

pub use field_extractor::FieldExtractor;
pub use llm_service::{LlmService, VisionModel};
