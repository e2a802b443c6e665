use std::sync::Arc;

use serde_json::Value;
use sourcely_agent::{AgentRuntime, ChatCompletionsClient, LlmClient, ScriptedLlmClient};
use sourcely_db::repositories::{SqlProductRepository, SqlSupplierRepository};

use crate::commands::{migrated_pool, prepare, CommandResult, StepFailure};

/// Runs one utterance through the query pipeline against the configured catalog.
///
/// With `classification`, that JSON stands in for the model's reply and no LLM is contacted.
pub fn run(utterance: &str, classification: Option<&str>) -> CommandResult {
    if utterance.trim().is_empty() {
        return CommandResult::failure("ask", "invalid_input", "utterance must not be empty", 2);
    }

    let (config, runtime) = match prepare("ask") {
        Ok(prepared) => prepared,
        Err(failure) => return failure,
    };

    let llm: Arc<dyn LlmClient> = match classification {
        Some(reply) => Arc::new(ScriptedLlmClient::replying(reply)),
        None => match ChatCompletionsClient::from_config(&config.llm) {
            Ok(client) => Arc::new(client),
            Err(error) => {
                return CommandResult::failure("ask", "llm_setup", error.to_string(), 2);
            }
        },
    };

    let result = runtime.block_on(async {
        let pool = migrated_pool(&config).await?;
        let agent = AgentRuntime::with_llm(
            llm,
            Arc::new(SqlProductRepository::new(pool.clone())),
            Arc::new(SqlSupplierRepository::new(pool.clone())),
        );

        let answer = agent.process_query(utterance).await;
        pool.close().await;
        Ok::<String, StepFailure>(answer)
    });

    match result {
        Ok(answer) => {
            // The pipeline only ever answers with a JSON object.
            let envelope = serde_json::from_str::<Value>(&answer).unwrap_or(Value::String(answer));
            let message =
                if envelope.get("error").is_some() { "answered with an error" } else { "answered" };
            CommandResult::success_with_data("ask", message, Some(envelope))
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}
