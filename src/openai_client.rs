use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::traits::{ChatModel, LLMConfig, TokenStream};
use crate::types::{Message, OpenAIChatCompletionChunk, OpenAIErrorMessage};

#[derive(Debug, Clone)]
pub struct OpenAIClient {
    client: ReqwestClient,
    config: LLMConfig,
    organization: Option<String>,
}

impl OpenAIClient {
    pub fn with_config(config: LLMConfig) -> Self {
        Self {
            client: ReqwestClient::new(),
            config,
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization: &str) -> Self {
        self.organization = Some(organization.to_owned());
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(&self, messages: &[Message]) -> (RequestBuilder, HashMap<&str, Value>) {
        let mut body_map: HashMap<&str, Value> = HashMap::new();

        body_map.insert("model", json!(self.config.model));
        body_map.insert("messages", json!(messages));
        body_map.insert("stream", json!(self.config.streaming));

        if let Some(max_tokens) = self.config.max_tokens {
            body_map.insert("max_tokens", json!(max_tokens));
        }

        if let Some(temperature) = self.config.temperature {
            body_map.insert("temperature", json!(temperature));
        }

        let mut request_builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json");

        if let Some(organization) = &self.organization {
            request_builder = request_builder.header("openai-organization", organization);
        }

        (request_builder, body_map)
    }
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn stream_chat(&self, messages: &[Message]) -> Result<TokenStream> {
        let (request_builder, mut body_map) = self.build_request(messages);
        body_map.insert("stream", json!(true));

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            "requesting chat completion"
        );

        let response = request_builder
            .json(&body_map)
            .send()
            .await
            .context("Failed to send request")?;

        match response.status() {
            StatusCode::OK => Ok(Self::token_stream(response)),
            status => {
                let error_text = response.text().await?;
                Err(anyhow!(
                    "Stream request failed ({}): {}",
                    status,
                    error_text
                ))
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum StreamEvent {
    Token(String),
    Done,
    Skip,
}

/// Accumulates raw body bytes and splits them into complete SSE events.
#[derive(Debug, Default)]
struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some((index, separator)) = Self::find_boundary(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..index + separator).collect();
            let text =
                std::str::from_utf8(&event[..index]).context("Stream event is not valid UTF-8")?;
            events.push(text.to_string());
        }
        Ok(events)
    }

    fn find_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
        let lf = buffer.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
        let crlf = buffer
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .map(|i| (i, 4));

        match (lf, crlf) {
            (Some(lf), Some(crlf)) => Some(if lf.0 <= crlf.0 { lf } else { crlf }),
            (lf, crlf) => lf.or(crlf),
        }
    }
}

// Helper methods implementation
impl OpenAIClient {
    fn token_stream(response: Response) -> TokenStream {
        Box::pin(async_stream::stream! {
            let mut response = response;
            let mut buffer = SseBuffer::default();

            'read: loop {
                let chunk = match response.chunk().await {
                    Ok(Some(chunk)) => chunk,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(anyhow::Error::new(e).context("Failed to read stream chunk"));
                        break;
                    }
                };

                let events = match buffer.push(&chunk) {
                    Ok(events) => events,
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                };

                for event in events {
                    match Self::process_stream_event(&event) {
                        Ok(StreamEvent::Token(token)) => {
                            yield Ok(token);
                        }
                        Ok(StreamEvent::Done) => break 'read,
                        Ok(StreamEvent::Skip) => {}
                        Err(e) => {
                            yield Err(e);
                            break 'read;
                        }
                    }
                }
            }
        })
    }

    fn process_stream_event(event: &str) -> Result<StreamEvent> {
        let data: Vec<&str> = event
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .map(str::trim_start)
            .collect();

        // comments, keep-alives and bare `event:` lines
        if data.is_empty() {
            return Ok(StreamEvent::Skip);
        }

        let payload = data.join("\n");
        if payload == "[DONE]" {
            return Ok(StreamEvent::Done);
        }

        match serde_json::from_str::<OpenAIChatCompletionChunk>(&payload) {
            Ok(chunk) => {
                let token = chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
                    .unwrap_or_default();
                if token.is_empty() {
                    Ok(StreamEvent::Skip)
                } else {
                    Ok(StreamEvent::Token(token))
                }
            }
            Err(_) => {
                if let Ok(error_message) = serde_json::from_str::<OpenAIErrorMessage>(&payload) {
                    return Err(anyhow!(
                        "{}: {}",
                        error_message
                            .error
                            .error_type
                            .as_deref()
                            .unwrap_or("api_error"),
                        error_message.error.message
                    ));
                }

                warn!(
                    payload = %payload,
                    "Couldn't parse OpenAIChatCompletionChunk or OpenAIErrorMessage"
                );
                Ok(StreamEvent::Skip)
            }
        }
    }
}
