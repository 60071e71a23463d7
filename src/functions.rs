//! Function registry and dispatcher.
//!
//! The model asks for a function by replying with nothing but
//! `{"function_name": "...", "parameters": [...]}`. Anything that does not
//! decode to that shape, or names a function outside [`MovieFunction`], is an
//! ordinary reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

use crate::error::AssistantError;
use crate::movies::MovieBackend;
use crate::types::Message;

/// Prefix of the system message that carries a function result back to the model.
pub const RESULT_PREFIX: &str = "Result of a function call: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovieFunction {
    GetNowPlayingMovies,
    GetShowtimes,
    BuyTicket,
    GetReviews,
}

impl MovieFunction {
    pub const ALL: [MovieFunction; 4] = [
        MovieFunction::GetNowPlayingMovies,
        MovieFunction::GetShowtimes,
        MovieFunction::BuyTicket,
        MovieFunction::GetReviews,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|function| function.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            MovieFunction::GetNowPlayingMovies => "get_now_playing_movies",
            MovieFunction::GetShowtimes => "get_showtimes",
            MovieFunction::BuyTicket => "buy_ticket",
            MovieFunction::GetReviews => "get_reviews",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            MovieFunction::GetNowPlayingMovies => 0,
            MovieFunction::GetShowtimes => 2,
            MovieFunction::BuyTicket => 3,
            MovieFunction::GetReviews => 1,
        }
    }

    /// Call the backend with positional `parameters`.
    pub fn invoke(
        self,
        backend: &dyn MovieBackend,
        parameters: &[Value],
    ) -> Result<FunctionResult, AssistantError> {
        if parameters.len() != self.arity() {
            return Err(AssistantError::ArityMismatch {
                function: self.name(),
                expected: self.arity(),
                actual: parameters.len(),
            });
        }

        let args = parameters
            .iter()
            .enumerate()
            .map(|(index, value)| self.text_argument(index, value))
            .collect::<Result<Vec<_>, _>>()?;

        let value = match self {
            MovieFunction::GetNowPlayingMovies => backend.get_now_playing_movies(),
            MovieFunction::GetShowtimes => backend.get_showtimes(&args[0], &args[1]),
            MovieFunction::BuyTicket => backend.buy_ticket(&args[0], &args[1], &args[2]),
            MovieFunction::GetReviews => backend.get_reviews(&args[0]),
        }
        .map_err(|reason| AssistantError::Backend {
            function: self.name(),
            reason,
        })?;

        Ok(FunctionResult {
            function: self,
            value,
        })
    }

    // Models emit ids as bare numbers as often as strings.
    fn text_argument(self, index: usize, value: &Value) -> Result<String, AssistantError> {
        match value {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(AssistantError::InvalidArgument {
                function: self.name(),
                index,
                found: json_kind(other),
            }),
        }
    }
}

impl fmt::Display for MovieFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Wire shape of a function call embedded in model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallRequest {
    pub function_name: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

/// A call whose name resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub function: MovieFunction,
    pub parameters: Vec<Value>,
}

impl ResolvedCall {
    /// Returns `None` when `text` is not a call to a registered function.
    pub fn parse(text: &str) -> Option<Self> {
        // The derived visitor also accepts `[name, parameters]`; only objects are calls.
        let value = match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => {
                debug!("reply is JSON but not an object");
                return None;
            }
            Err(e) => {
                debug!(error = %e, "reply is not a function call");
                return None;
            }
        };

        let request = match serde_json::from_value::<FunctionCallRequest>(value) {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "reply is not a function call");
                return None;
            }
        };

        match MovieFunction::from_name(&request.function_name) {
            Some(function) => Some(Self {
                function,
                parameters: request.parameters,
            }),
            None => {
                warn!(
                    function = %request.function_name,
                    "Function not found, treating reply as text"
                );
                None
            }
        }
    }

    pub fn invoke(&self, backend: &dyn MovieBackend) -> Result<FunctionResult, AssistantError> {
        let result = self.function.invoke(backend, &self.parameters)?;
        info!(function = %self.function, result = %result, "function call result");
        Ok(result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub function: MovieFunction,
    pub value: Value,
}

impl FunctionResult {
    /// The system message that feeds this result back into the conversation.
    pub fn to_message(&self) -> Message {
        Message::system(format!("{RESULT_PREFIX}{self}"))
    }
}

impl fmt::Display for FunctionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Invoked(FunctionResult),
    NotAFunctionCall,
}

/// Parse `text` as a function call and run it.
///
/// Malformed payloads and unknown names come back as
/// [`Dispatch::NotAFunctionCall`]; invocation failures are errors.
pub fn dispatch(text: &str, backend: &dyn MovieBackend) -> Result<Dispatch, AssistantError> {
    dispatch_with(text, backend, |_| Ok(()))
}

/// Like [`dispatch`], but `before_invoke` sees every resolved call first and
/// can refuse it with an error.
pub fn dispatch_with<F>(
    text: &str,
    backend: &dyn MovieBackend,
    before_invoke: F,
) -> Result<Dispatch, AssistantError>
where
    F: FnOnce(&ResolvedCall) -> Result<(), AssistantError>,
{
    match ResolvedCall::parse(text) {
        Some(call) => {
            before_invoke(&call)?;
            call.invoke(backend).map(Dispatch::Invoked)
        }
        None => Ok(Dispatch::NotAFunctionCall),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movies::MockMovieBackend;
    use mockall::predicate::eq;
    use serde_json::json;

    fn silent_backend() -> MockMovieBackend {
        let mut backend = MockMovieBackend::new();
        backend.expect_get_now_playing_movies().times(0);
        backend.expect_get_showtimes().times(0);
        backend.expect_buy_ticket().times(0);
        backend.expect_get_reviews().times(0);
        backend
    }

    #[test]
    fn test_registry_is_closed() {
        for function in MovieFunction::ALL {
            assert_eq!(MovieFunction::from_name(function.name()), Some(function));
        }
        assert_eq!(MovieFunction::from_name("print"), None);
        assert_eq!(MovieFunction::from_name("Get_Reviews"), None);
        assert_eq!(MovieFunction::from_name(""), None);
    }

    #[test]
    fn test_now_playing_invokes_no_argument_stub() -> Result<(), AssistantError> {
        let mut backend = MockMovieBackend::new();
        backend
            .expect_get_now_playing_movies()
            .times(1)
            .returning(|| Ok(json!([{"title": "Dune: Part Two"}])));

        let outcome = dispatch(
            r#"{"function_name": "get_now_playing_movies", "parameters": []}"#,
            &backend,
        )?;

        assert_eq!(
            outcome,
            Dispatch::Invoked(FunctionResult {
                function: MovieFunction::GetNowPlayingMovies,
                value: json!([{"title": "Dune: Part Two"}]),
            })
        );
        Ok(())
    }

    #[test]
    fn test_parameters_default_to_empty() -> Result<(), AssistantError> {
        let mut backend = MockMovieBackend::new();
        backend
            .expect_get_now_playing_movies()
            .times(1)
            .returning(|| Ok(json!([])));

        let outcome = dispatch(r#"{"function_name": "get_now_playing_movies"}"#, &backend)?;
        assert!(matches!(outcome, Dispatch::Invoked(_)));
        Ok(())
    }

    #[test]
    fn test_buy_ticket_passes_arguments_in_order() -> Result<(), AssistantError> {
        let mut backend = MockMovieBackend::new();
        backend
            .expect_buy_ticket()
            .with(eq("AMC 10"), eq("Dune"), eq("7:30pm"))
            .times(1)
            .returning(|_, _, _| Ok(json!({"status": "confirmed"})));

        let outcome = dispatch(
            r#"{"function_name": "buy_ticket", "parameters": ["AMC 10", "Dune", "7:30pm"]}"#,
            &backend,
        )?;

        match outcome {
            Dispatch::Invoked(result) => {
                assert_eq!(result.function, MovieFunction::BuyTicket);
                assert_eq!(result.value["status"], "confirmed");
            }
            Dispatch::NotAFunctionCall => panic!("expected buy_ticket to be invoked"),
        }
        Ok(())
    }

    #[test]
    fn test_numeric_movie_id_is_accepted() -> Result<(), AssistantError> {
        let mut backend = MockMovieBackend::new();
        backend
            .expect_get_reviews()
            .with(eq("693134"))
            .times(1)
            .returning(|_| Ok(json!([])));

        let outcome = dispatch(
            r#"{"function_name": "get_reviews", "parameters": [693134]}"#,
            &backend,
        )?;
        assert!(matches!(outcome, Dispatch::Invoked(_)));
        Ok(())
    }

    #[test]
    fn test_prose_is_not_a_function_call() -> Result<(), AssistantError> {
        let backend = silent_backend();
        let text = "Sure, here are some movies you might like...";

        assert_eq!(dispatch(text, &backend)?, Dispatch::NotAFunctionCall);
        assert_eq!(ResolvedCall::parse(text), None);
        Ok(())
    }

    #[test]
    fn test_structurally_invalid_payloads_are_not_function_calls() -> Result<(), AssistantError> {
        let backend = silent_backend();
        let payloads = [
            "",
            "42",
            r#"["get_now_playing_movies"]"#,
            r#"["get_now_playing_movies", []]"#,
            r#"["buy_ticket", ["AMC 10", "Dune", "7:30pm"]]"#,
            r#"{"parameters": []}"#,
            r#"{"function_name": 7, "parameters": []}"#,
            r#"{"function_name": "get_reviews", "parameters": "693134"}"#,
            r#"{"function_name": "get_now_playing_movies", "parameters": []"#,
            "```json\n{\"function_name\": \"get_now_playing_movies\"}\n```",
        ];

        for payload in payloads {
            assert_eq!(
                dispatch(payload, &backend)?,
                Dispatch::NotAFunctionCall,
                "payload: {payload}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_unknown_function_is_never_invoked() -> Result<(), AssistantError> {
        let backend = silent_backend();

        let outcome = dispatch(
            r#"{"function_name": "delete_all_tickets", "parameters": []}"#,
            &backend,
        )?;
        assert_eq!(outcome, Dispatch::NotAFunctionCall);
        Ok(())
    }

    #[test]
    fn test_refused_call_is_never_invoked() {
        let backend = silent_backend();
        let mut seen = None;

        let error = dispatch_with(
            r#"{"function_name": "get_reviews", "parameters": ["693134"]}"#,
            &backend,
            |call| {
                seen = Some(call.function);
                Err(AssistantError::ChainLimitExceeded { limit: 0 })
            },
        )
        .unwrap_err();

        assert!(matches!(error, AssistantError::ChainLimitExceeded { limit: 0 }));
        assert_eq!(seen, Some(MovieFunction::GetReviews));
    }

    #[test]
    fn test_hook_is_skipped_for_plain_text() -> Result<(), AssistantError> {
        let backend = silent_backend();
        let mut called = false;

        let outcome = dispatch_with("Enjoy the movie!", &backend, |_| {
            called = true;
            Ok(())
        })?;

        assert_eq!(outcome, Dispatch::NotAFunctionCall);
        assert!(!called);
        Ok(())
    }

    #[test]
    fn test_arity_mismatch_is_an_error() {
        let backend = silent_backend();

        let error = dispatch(
            r#"{"function_name": "get_showtimes", "parameters": ["Dune"]}"#,
            &backend,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            AssistantError::ArityMismatch {
                function: "get_showtimes",
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_wrong_argument_type_is_an_error() {
        let backend = silent_backend();

        let error = dispatch(
            r#"{"function_name": "get_showtimes", "parameters": ["Dune", {"city": "Boston"}]}"#,
            &backend,
        )
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "argument 1 of `get_showtimes` must be a string or a number, got an object"
        );
    }

    #[test]
    fn test_backend_failure_is_an_error() {
        let mut backend = MockMovieBackend::new();
        backend
            .expect_get_reviews()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("reviews service down")));

        let error = dispatch(
            r#"{"function_name": "get_reviews", "parameters": ["1"]}"#,
            &backend,
        )
        .unwrap_err();

        assert_eq!(
            error.to_string(),
            "function `get_reviews` failed: reviews service down"
        );
    }

    #[test]
    fn test_result_message_is_compact_json() {
        let result = FunctionResult {
            function: MovieFunction::BuyTicket,
            value: json!({"status": "confirmed"}),
        };

        let message = result.to_message();
        assert_eq!(message, Message::system(r#"Result of a function call: {"status":"confirmed"}"#));
    }
}
