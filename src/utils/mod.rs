//! Shared utility functions.
//!
//! Currently JSON extraction from LLM responses.

pub mod json_extraction;

pub use json_extraction::{
    analyze_json_structure, extract_json_from_response, find_matching_close,
    try_extract_json_from_response, JsonExtractionError, JsonExtractionResult,
    JsonStructureAnalysis,
};
