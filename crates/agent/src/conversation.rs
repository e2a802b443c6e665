use crate::classifier::Intent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConversationState {
    messages: Vec<Message>,
    intent: Option<Intent>,
}

impl ConversationState {
    pub fn new(utterance: impl Into<String>) -> Self {
        Self {
            messages: vec![Message { role: Role::User, content: utterance.into() }],
            intent: None,
        }
    }

    pub fn utterance(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }

    pub fn intent(&self) -> Option<&Intent> {
        self.intent.as_ref()
    }

    pub fn set_intent(&mut self, intent: Intent) {
        self.intent = Some(intent);
    }

    #[cfg(test)]
    fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_agent(&mut self, content: impl Into<String>) {
        self.messages.push(Message { role: Role::Agent, content: content.into() });
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Replaces the trailing agent message, or appends one when the last message is the user's.
    pub fn replace_last_agent(&mut self, content: impl Into<String>) {
        match self.messages.last_mut() {
            Some(message) if message.role == Role::Agent => message.content = content.into(),
            _ => self.push_agent(content),
        }
    }

    pub fn final_answer(&self) -> Option<&str> {
        self.last().filter(|message| message.role == Role::Agent).map(|m| m.content.as_str())
    }
}
