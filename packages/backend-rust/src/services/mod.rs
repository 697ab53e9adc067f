pub mod conversation;
pub mod dictionary;
pub mod generator;
pub mod llm_provider;
pub mod prompts;
pub mod reply;
pub mod translation;
pub mod workspace;
