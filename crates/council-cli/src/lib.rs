//! LLM Council command-line front end.
//!
//! - [`gateway`]: `ModelProducer` over an OpenAI-compatible streaming gateway
//! - [`config`]: TOML + environment configuration
//! - [`cli`] / [`commands`] / [`render`]: the `llm-council` binary's surface

pub mod cli;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod render;
