pub mod app_config;
pub mod clock;
pub mod ollama;
pub mod persistence;
pub mod ports;
pub mod resilient_llm;
