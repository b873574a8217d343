// File: src/fallback.rs
// Ordered "try each provider, keep the first success" combinator

use std::future::Future;

use futures::future::BoxFuture;

/// One step of a fallback chain.
///
/// The wrapped future is not polled until the chain reaches it, so providers
/// after the first success never run.
pub struct Provider<'a, T> {
    name: &'static str,
    fetch: BoxFuture<'a, anyhow::Result<Option<T>>>,
}

impl<'a, T: Send + 'a> Provider<'a, T> {
    pub fn new<F>(name: &'static str, fetch: F) -> Self
    where
        F: Future<Output = anyhow::Result<Option<T>>> + Send + 'a,
    {
        Self {
            name,
            fetch: Box::pin(fetch),
        }
    }

    /// A provider whose answer is already known
    pub fn ready(name: &'static str, value: Option<T>) -> Self {
        Self::new(name, async move { Ok(value) })
    }
}

/// Winning provider and its value
#[derive(Debug, Clone, PartialEq)]
pub struct Success<T> {
    pub provider: &'static str,
    pub value: T,
}

/// Run providers in order and return the first `Ok(Some(_))`.
///
/// Errors and empty answers are logged and skipped; `None` means every
/// provider came up empty.
pub async fn first_success<T: Send>(providers: Vec<Provider<'_, T>>) -> Option<Success<T>> {
    for provider in providers {
        match provider.fetch.await {
            Ok(Some(value)) => {
                return Some(Success {
                    provider: provider.name,
                    value,
                });
            }
            Ok(None) => {
                tracing::debug!(target: "magic_mint::fallback", provider = provider.name, "No value");
            }
            Err(e) => {
                tracing::warn!(target: "magic_mint::fallback", provider = provider.name, error = %e, "Provider failed");
            }
        }
    }
    None
}
