//! The turn loop: stream a reply, run any function call it contains, and ask
//! again until the model answers in plain text.

use futures::StreamExt;
use tracing::{debug, instrument, warn};

use crate::error::AssistantError;
use crate::functions::{dispatch_with, Dispatch};
use crate::movies::MovieBackend;
use crate::session::Session;
use crate::traits::{ChatModel, ChatSink};
use crate::types::Message;

pub const DEFAULT_MAX_FUNCTION_CALLS: usize = 8;

pub struct Assistant<M, B> {
    model: M,
    backend: B,
    max_function_calls: usize,
}

impl<M: ChatModel, B: MovieBackend> Assistant<M, B> {
    pub fn new(model: M, backend: B) -> Self {
        Self {
            model,
            backend,
            max_function_calls: DEFAULT_MAX_FUNCTION_CALLS,
        }
    }

    /// Cap on function calls per turn; at least one is always allowed.
    pub fn with_max_function_calls(mut self, limit: usize) -> Self {
        self.max_function_calls = limit.max(1);
        self
    }

    pub fn max_function_calls(&self) -> usize {
        self.max_function_calls
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run one user turn against `session` and return the final reply.
    ///
    /// Every model reply, function calls included, is streamed to `sink`.
    /// On error the session is restored to what it was before `input`.
    #[instrument(skip_all, fields(session = %session.id()))]
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        input: &str,
        sink: &mut dyn ChatSink,
    ) -> Result<String, AssistantError> {
        let checkpoint = session.len();
        session.push(Message::user(input));

        match self.run_turn(session, sink).await {
            Ok(reply) => Ok(reply),
            Err(error) => {
                warn!(%error, "turn failed, rolling back history");
                session.rollback(checkpoint);
                Err(error)
            }
        }
    }

    async fn run_turn(
        &self,
        session: &mut Session,
        sink: &mut dyn ChatSink,
    ) -> Result<String, AssistantError> {
        let limit = self.max_function_calls;
        let mut calls = 0;

        loop {
            let content = self.generate_response(session.history(), sink).await?;
            debug!(response = %content, "model response");

            let outcome = dispatch_with(&content, &self.backend, |_| {
                if calls == limit {
                    Err(AssistantError::ChainLimitExceeded { limit })
                } else {
                    Ok(())
                }
            })?;

            match outcome {
                Dispatch::Invoked(result) => {
                    calls += 1;
                    session.push(result.to_message());
                }
                Dispatch::NotAFunctionCall => {
                    session.push(Message::assistant(content.clone()));
                    return Ok(content);
                }
            }
        }
    }

    /// Stream one completion into `sink`. The sink message is finalized even
    /// when the stream fails part way.
    #[instrument(skip_all, fields(messages = history.len()))]
    async fn generate_response(
        &self,
        history: &[Message],
        sink: &mut dyn ChatSink,
    ) -> Result<String, AssistantError> {
        sink.begin().await.map_err(AssistantError::Ui)?;

        let streamed = self.relay_tokens(history, sink).await;
        let finished = sink.finish().await.map_err(AssistantError::Ui);

        let content = streamed?;
        finished?;
        Ok(content)
    }

    async fn relay_tokens(
        &self,
        history: &[Message],
        sink: &mut dyn ChatSink,
    ) -> Result<String, AssistantError> {
        let mut stream = self
            .model
            .stream_chat(history)
            .await
            .map_err(AssistantError::Transport)?;

        let mut content = String::new();
        while let Some(token) = stream.next().await {
            let token = token.map_err(AssistantError::Transport)?;
            if token.is_empty() {
                continue;
            }
            sink.stream_token(&token).await.map_err(AssistantError::Ui)?;
            content.push_str(&token);
        }
        Ok(content)
    }
}
