// Resume pipeline: PDF extraction, prompt assembly and suggestion export.
// Inference calls go through llm_client; nothing here talks to a provider directly.

pub mod assembler;
pub mod export;
pub mod extract;
pub mod handlers;
pub mod prompts;
