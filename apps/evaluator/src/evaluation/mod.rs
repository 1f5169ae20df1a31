// CV evaluation pipeline.
// All service calls go through llm_client — no direct HTTP here.

pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod scoring;
