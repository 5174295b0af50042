use std::sync::Arc;

use adviser_core::Event;

use crate::{FetchError, ProcessError};

/// Source of inbound events.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Channel-specific context attached to every event this fetcher yields.
    type Meta: Send + 'static;

    /// Returns at most `limit` pending events, possibly none. Must not block
    /// longer than the channel's own polling timeout.
    async fn fetch(&self, limit: usize) -> Result<Vec<Event<Self::Meta>>, FetchError>;
}

/// Performs the side effect for one event.
#[async_trait::async_trait]
pub trait Processor<M: Send + 'static>: Send + Sync {
    async fn process(&self, event: Event<M>) -> Result<(), ProcessError>;
}

#[async_trait::async_trait]
impl<T> Fetcher for Arc<T>
where
    T: Fetcher + ?Sized,
{
    type Meta = T::Meta;

    async fn fetch(&self, limit: usize) -> Result<Vec<Event<Self::Meta>>, FetchError> {
        (**self).fetch(limit).await
    }
}

#[async_trait::async_trait]
impl<M, T> Processor<M> for Arc<T>
where
    M: Send + 'static,
    T: Processor<M> + ?Sized,
{
    async fn process(&self, event: Event<M>) -> Result<(), ProcessError> {
        (**self).process(event).await
    }
}
