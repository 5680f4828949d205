use thiserror::Error;

/// A candidate fetch against the data store failed.
///
/// Wraps the underlying transport/store error verbatim. Never retried by
/// the engine; retries, if desired, belong to the caller.
#[derive(Debug, Error)]
#[error("candidate fetch failed: {source}")]
pub struct FetchError {
    #[source]
    source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

impl FetchError {
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Self {
            source: source.into(),
        }
    }
}
