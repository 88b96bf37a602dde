//! Salon engine: conversation orchestration over a local Ollama model.
//!
//! Layers follow a ports-and-adapters split: `infrastructure` holds the
//! Ollama client, retry wrapper, persistence and config; `use_cases` holds
//! the conversation logic; `api` exposes the axum routes; `app` wires it
//! all together.

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod prompts;
pub mod schemas;
pub mod use_cases;
