//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt templates used for affiliation classification.

pub mod company_extraction;

pub use company_extraction::*;
