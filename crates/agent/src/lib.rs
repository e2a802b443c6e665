pub mod classifier;
pub mod conversation;
pub mod envelope;
pub mod llm;
pub mod normalizer;
pub mod planner;
pub mod runtime;
pub mod tools;

pub use classifier::{ClassificationError, Entities, Intent, IntentClassifier, QueryType};
pub use llm::{ChatCompletionsClient, LlmClient, LlmError, ScriptedLlmClient};
pub use runtime::AgentRuntime;
pub use tools::{ToolDefinition, ToolError, ToolRegistry};
