use anyhow::{bail, Context, Result};

use crate::conversation::DEFAULT_MAX_FUNCTION_CALLS;
use crate::traits::{LLMConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub llm: LLMConfig,
    pub max_function_calls: usize,
}

impl AssistantConfig {
    /// Read configuration from the process environment.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("Missing OPENAI_API_KEY")?;

        let mut llm = LLMConfig::new(api_key.trim());
        llm.base_url = lookup("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        llm.model = lookup("MOVIE_ASSISTANT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let max_function_calls = match lookup("MOVIE_ASSISTANT_MAX_FUNCTION_CALLS") {
            Some(raw) => {
                let limit: usize = raw.trim().parse().with_context(|| {
                    format!("Invalid MOVIE_ASSISTANT_MAX_FUNCTION_CALLS: {raw:?}")
                })?;
                if limit == 0 {
                    bail!("MOVIE_ASSISTANT_MAX_FUNCTION_CALLS must be at least 1");
                }
                limit
            }
            None => DEFAULT_MAX_FUNCTION_CALLS,
        };

        Ok(Self {
            llm,
            max_function_calls,
        })
    }
}
