use serde_json::{json, Value};

pub const NO_RESULTS: &str = "No results found for your query";
pub const REQUEST_FAILED: &str = "An error occurred while processing your request";
pub const RESULTS_FAILED: &str = "An error occurred while processing the results";
pub const NOT_UNDERSTOOD: &str = "Could not understand your request";
pub const CATALOG_UNAVAILABLE: &str = "An error occurred while accessing the catalog";
pub const NO_SUPPLIERS: &str = "No suppliers found matching your criteria.";

pub fn error(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

pub fn is_error(envelope: &Value) -> bool {
    envelope.get("error").is_some()
}

/// Serialized form of an error envelope. Infallible, so usable at the outermost boundary.
pub fn error_text(message: &str) -> String {
    error(message).to_string()
}
