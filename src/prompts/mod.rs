//! Prompt templates for LLM-based operations.

pub mod qualitative;

pub use qualitative::*;
