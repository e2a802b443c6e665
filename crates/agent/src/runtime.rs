use std::sync::Arc;

use thiserror::Error;

use sourcely_db::repositories::{ProductRepository, SupplierRepository};

use crate::classifier::{Intent, IntentClassifier, LlmIntentClassifier};
use crate::conversation::ConversationState;
use crate::envelope;
use crate::llm::LlmClient;
use crate::normalizer::normalize;
use crate::planner::{plan_for, Dispatcher};
use crate::tools::ToolRegistry;

#[derive(Debug, Error)]
enum PipelineError {
    #[error("conversation has no user message")]
    MissingUtterance,
    #[error("dispatch reached without a classification")]
    Unclassified,
}

pub struct AgentRuntime {
    classifier: Arc<dyn IntentClassifier>,
    dispatcher: Dispatcher,
}

impl AgentRuntime {
    pub fn new(classifier: Arc<dyn IntentClassifier>, tools: Arc<ToolRegistry>) -> Self {
        Self { classifier, dispatcher: Dispatcher::new(tools) }
    }

    pub fn with_llm(
        llm: Arc<dyn LlmClient>,
        products: Arc<dyn ProductRepository>,
        suppliers: Arc<dyn SupplierRepository>,
    ) -> Self {
        Self::new(
            Arc::new(LlmIntentClassifier::new(llm)),
            Arc::new(ToolRegistry::catalog(products, suppliers)),
        )
    }

    /// Answers `utterance` with a JSON envelope. Never fails.
    pub async fn process_query(&self, utterance: &str) -> String {
        let mut state = ConversationState::new(utterance);

        if let Err(error) = self.run(&mut state).await {
            tracing::error!(
                event_name = "agent.pipeline.failed",
                error = %error,
                "pipeline aborted"
            );
            return envelope::error_text(envelope::REQUEST_FAILED);
        }

        match state.final_answer() {
            Some(answer) => {
                tracing::info!(
                    event_name = "agent.pipeline.completed",
                    query_type = state.intent().map(|intent| intent.query_type.as_str()),
                    "query answered"
                );
                answer.to_string()
            }
            None => {
                tracing::warn!(
                    event_name = "agent.pipeline.incomplete",
                    "pipeline finished without an agent answer"
                );
                envelope::error_text(envelope::NOT_UNDERSTOOD)
            }
        }
    }

    async fn run(&self, state: &mut ConversationState) -> Result<(), PipelineError> {
        self.classify(state).await?;
        self.dispatch(state).await?;
        self.normalize(state);
        Ok(())
    }

    async fn classify(&self, state: &mut ConversationState) -> Result<(), PipelineError> {
        let utterance = state.utterance().ok_or(PipelineError::MissingUtterance)?;

        let intent = match self.classifier.classify(utterance).await {
            Ok(intent) => intent,
            Err(error) => {
                tracing::warn!(
                    event_name = "agent.classifier.fallback",
                    error = %error,
                    "classification failed, falling back to product search"
                );
                Intent::fallback()
            }
        };

        tracing::debug!(
            event_name = "agent.classifier.classified",
            query_type = intent.query_type.as_str(),
            "utterance classified"
        );
        state.set_intent(intent);
        Ok(())
    }

    async fn dispatch(&self, state: &mut ConversationState) -> Result<(), PipelineError> {
        let plan = plan_for(state.intent().ok_or(PipelineError::Unclassified)?);

        let envelope = match self.dispatcher.dispatch(&plan).await {
            Ok(Some(envelope)) => envelope,
            Ok(None) => envelope::error(envelope::NO_RESULTS),
            Err(error) => {
                tracing::error!(
                    event_name = "agent.dispatch.failed",
                    error = %error,
                    "dispatch failed"
                );
                envelope::error(envelope::REQUEST_FAILED)
            }
        };

        state.push_agent(envelope.to_string());
        Ok(())
    }

    fn normalize(&self, state: &mut ConversationState) {
        if let Some(answer) = state.final_answer() {
            let normalized = normalize(answer);
            state.replace_last_agent(normalized);
        }
    }
}
