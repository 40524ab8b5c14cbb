// Résumé review: intake pipeline, feedback parsing and the record read path.
// All LLM calls go through llm_client; no direct Anthropic API calls here.

pub mod handlers;
pub mod inference;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod repository;
