//! Token observers and stream collection.
//!
//! A completion is consumed as a [`TokenStream`]. Each token is handed to a
//! [`TokenObserver`] for live display while the full text is assembled; the
//! caller only ever sees the assembled text.

use crate::llm::client::TokenStream;
use crate::types::{AppError, Result};
use futures::StreamExt;
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Receives completion tokens as they arrive.
pub trait TokenObserver: Send + Sync {
    fn on_token(&self, token: &str);

    /// Called once with the assembled text after the stream ends.
    fn on_complete(&self, _text: &str) {}
}

/// Discards every token.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TokenObserver for NoopObserver {
    fn on_token(&self, _token: &str) {}
}

/// Prints tokens to stdout as they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutObserver;

impl TokenObserver for StdoutObserver {
    fn on_token(&self, token: &str) {
        let mut stdout = std::io::stdout().lock();
        // Display only; a closed stdout must not fail the query
        let _ = stdout.write_all(token.as_bytes());
        let _ = stdout.flush();
    }

    fn on_complete(&self, _text: &str) {
        println!();
    }
}

/// Emits every token as a trace-level event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TokenObserver for TracingObserver {
    fn on_token(&self, token: &str) {
        tracing::trace!(token, "completion token");
    }

    fn on_complete(&self, text: &str) {
        tracing::debug!(chars = text.chars().count(), "completion finished");
    }
}

/// Drain `stream` into a string, feeding `observer` on the way.
///
/// # Errors
///
/// - [`AppError::Cancelled`] as soon as `cancel` fires; tokens already
///   observed are not rolled back.
/// - The first error the stream yields.
pub async fn collect_stream(
    mut stream: TokenStream,
    observer: &dyn TokenObserver,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut text = String::new();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            next = stream.next() => match next {
                Some(Ok(token)) => {
                    observer.on_token(&token);
                    text.push_str(&token);
                }
                Some(Err(e)) => return Err(e),
                None => break,
            },
        }
    }

    observer.on_complete(&text);
    Ok(text)
}
