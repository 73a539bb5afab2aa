//! Chat transcript and the ask loop.

use serde::{Deserialize, Serialize};

use pharmrep_core::api::ApiClient;
use pharmrep_core::models::{Doctor, DoctorSearchResult};

use crate::query::{parse_query, LookupQuery};
use crate::replies::{render_error, render_reply, EMPTY_QUERY_REPLY, GREETING};
use crate::{LookupError, LookupResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One chat bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// A doctor lookup conversation.
///
/// Every `ask` appends exactly two messages: the user's text and the reply.
pub struct LookupSession {
    transcript: Vec<ChatMessage>,
    last_result: Option<DoctorSearchResult>,
}

impl Default for LookupSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LookupSession {
    /// Session opened with the greeting.
    pub fn new() -> Self {
        Self {
            transcript: vec![ChatMessage::assistant(GREETING)],
            last_result: None,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Raw result behind the most recent successful reply.
    pub fn last_result(&self) -> Option<&DoctorSearchResult> {
        self.last_result.as_ref()
    }

    /// Drop the conversation and start over.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn transcript_json(&self) -> LookupResult<String> {
        Ok(serde_json::to_string(&self.transcript)?)
    }

    /// Handle one user message and return the assistant reply.
    ///
    /// Failures become the reply text; they are never returned.
    pub fn ask(&mut self, client: &ApiClient, text: &str) -> &ChatMessage {
        self.transcript.push(ChatMessage::user(text));

        let query = parse_query(text);
        let reply = match self.lookup(client, &query) {
            Ok(reply) => reply,
            Err(LookupError::EmptyQuery) => EMPTY_QUERY_REPLY.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Doctor lookup failed");
                render_error(&e.user_message())
            }
        };

        self.transcript.push(ChatMessage::assistant(reply));
        &self.transcript[self.transcript.len() - 1]
    }

    fn lookup(&mut self, client: &ApiClient, query: &LookupQuery) -> LookupResult<String> {
        let search_text = query.search_text().ok_or(LookupError::EmptyQuery)?;
        let result = client.search_doctors(&search_text)?;

        let doctors: Vec<&Doctor> = result
            .found_doctors
            .iter()
            .filter(|doctor| query.matches(doctor))
            .collect();
        tracing::info!(
            query = %search_text,
            found = result.found_doctors.len(),
            shown = doctors.len(),
            "Doctor lookup answered"
        );

        let reply = render_reply(query, &result, &doctors);
        self.last_result = Some(result);
        Ok(reply)
    }
}
