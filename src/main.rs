//! research-chat - terminal client for a streaming research agent
//!
//! Reads one question per line from stdin, streams the agent's answer from
//! the server, and prints it as it arrives along with the search trail.

mod config;
mod conversation;
mod render;
mod session;
mod stream;
mod transport;
mod turn;

use config::ClientConfig;
use conversation::ConversationStore;
use render::TerminalRenderer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transport::HttpTransport;
use turn::TurnController;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the transcript on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "research_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(server = %config.server, "Starting research chat client");

    let transport = HttpTransport::new(config.connect_timeout)?;
    let store = ConversationStore::with_greeting(&config.greeting);
    let renderer = TerminalRenderer::new(std::io::stdout());
    let mut controller = TurnController::new(config.server.clone(), transport, store, renderer);
    controller.render();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        // Ctrl-C during a turn abandons the answer instead of exiting
        let cancel = CancellationToken::new();
        let interrupt = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });

        match controller.submit_turn_with_cancel(&line, cancel).await {
            Ok(outcome) => tracing::debug!(?outcome, "Turn finished"),
            Err(e) => tracing::error!(error = %e, "Turn failed"),
        }
        interrupt.abort();
    }

    tracing::info!(
        messages = controller.store().messages().len(),
        "Conversation ended"
    );
    Ok(())
}
