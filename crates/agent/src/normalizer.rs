use serde_json::Value;

use crate::envelope;

/// Re-emits a well-formed envelope unchanged. Anything that is not a JSON object becomes the
/// results-failure envelope. Applying it twice is the same as applying it once.
pub fn normalize(content: &str) -> String {
    match serde_json::from_str::<Value>(content) {
        Ok(envelope @ Value::Object(_)) => envelope.to_string(),
        Ok(_) => {
            tracing::warn!(
                event_name = "agent.normalizer.not_an_object",
                "dispatch output is not a JSON object"
            );
            envelope::error_text(envelope::RESULTS_FAILED)
        }
        Err(error) => {
            tracing::warn!(
                event_name = "agent.normalizer.unparseable",
                error = %error,
                "dispatch output is not valid JSON"
            );
            envelope::error_text(envelope::RESULTS_FAILED)
        }
    }
}
