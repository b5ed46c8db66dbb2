// POST /generate: admission, extraction and the three model-backed actions.
pub mod body;
pub mod handlers;
pub mod prompts;
pub mod sanitize;
pub mod service;
