//! Console host for the movie assistant: one session over stdin/stdout.

use anyhow::{Context, Result};
use dotenv::dotenv;
use movie_assistant::{
    Assistant, AssistantConfig, ConsoleSink, OpenAIClient, SessionId, SessionStore,
    StubMovieBackend, SYSTEM_PROMPT,
};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    // Logs go to stderr so they never interleave with the streamed reply
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("movie_assistant=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = AssistantConfig::from_env()?;
    info!(
        model = %config.llm.model,
        max_function_calls = config.max_function_calls,
        "starting movie assistant"
    );

    let assistant = Assistant::new(OpenAIClient::with_config(config.llm), StubMovieBackend::new())
        .with_max_function_calls(config.max_function_calls);

    let mut store = SessionStore::new(SYSTEM_PROMPT);
    let session_id = SessionId::from("console");
    store.open(&session_id);

    let mut sink = ConsoleSink::stdout();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await.context("Failed to read input")? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" => break,
            "/reset" => {
                store.close(&session_id);
                store.open(&session_id);
                info!(session = %session_id, "session reset");
            }
            input => {
                let session = store.open(&session_id);
                if let Err(e) = assistant.handle_turn(session, input, &mut sink).await {
                    error!(error = %e, "turn failed");
                    eprintln!("Error: {}", e);
                }
            }
        }
    }

    store.close(&session_id);
    Ok(())
}
