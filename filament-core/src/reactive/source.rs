//! Reactive Sources
//!
//! A reactive source is the sole contract the driver requires: a pull-based
//! "produce next" operation yielding values until exhaustion, plus an optional
//! best-effort cancellation hook. Sources are owned exclusively by one driver
//! for its lifetime and never shared.
//!
//! The trait is object-safe so the fragment composer can hold heterogeneous
//! boxed sources. Three adapters cover the common shapes: a wrapper for any
//! `futures` stream, a finite in-memory queue, and a channel-backed source for
//! values pushed from elsewhere.

use std::collections::VecDeque;

use futures_util::future::{self, BoxFuture};
use futures_util::{FutureExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::Error;
use super::value::Value;

/// One produced slot: a value, a produce-step failure, or exhaustion (`None`).
pub type Produced = Option<Result<Value, Error>>;

/// Pull-based asynchronous producer of values.
pub trait ReactiveSource: Send {
    /// Produce the next slot. `None` means the source is exhausted; an `Err`
    /// is a produce-step failure routed through the driver's error handler.
    fn produce(&mut self) -> BoxFuture<'_, Produced>;

    /// Request cancellation. Best-effort and cooperative: an in-flight produce
    /// is allowed to complete and its result is discarded by the caller. The
    /// default does nothing.
    fn cancel(&mut self) {}
}

impl<S: ReactiveSource + ?Sized> ReactiveSource for Box<S> {
    fn produce(&mut self) -> BoxFuture<'_, Produced> {
        (**self).produce()
    }

    fn cancel(&mut self) {
        (**self).cancel()
    }
}

/// Adapter for any stream of produced slots.
pub struct StreamSource<St> {
    stream: St,
    cancelled: bool,
}

impl<St> StreamSource<St>
where
    St: Stream<Item = Result<Value, Error>> + Send + Unpin,
{
    /// Wrap a stream as a reactive source.
    pub fn new(stream: St) -> Self {
        Self {
            stream,
            cancelled: false,
        }
    }
}

impl<St> ReactiveSource for StreamSource<St>
where
    St: Stream<Item = Result<Value, Error>> + Send + Unpin,
{
    fn produce(&mut self) -> BoxFuture<'_, Produced> {
        if self.cancelled {
            return future::ready(None).boxed();
        }
        self.stream.next().boxed()
    }

    fn cancel(&mut self) {
        self.cancelled = true;
    }
}

/// A finite in-memory source yielding queued slots immediately.
#[derive(Default)]
pub struct QueueSource {
    items: VecDeque<Result<Value, Error>>,
}

impl QueueSource {
    /// Build from produced slots, failures included.
    pub fn from_results(items: impl IntoIterator<Item = Result<Value, Error>>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }
}

impl ReactiveSource for QueueSource {
    fn produce(&mut self) -> BoxFuture<'_, Produced> {
        future::ready(self.items.pop_front()).boxed()
    }

    fn cancel(&mut self) {
        self.items.clear();
    }
}

/// Build a source over a finite sequence of plain values.
pub fn from_values(values: impl IntoIterator<Item = Value>) -> QueueSource {
    QueueSource::from_results(values.into_iter().map(Ok))
}

/// Sender half of a [`channel_source`].
#[derive(Clone)]
pub struct SourceSender {
    tx: mpsc::UnboundedSender<Result<Value, Error>>,
}

impl SourceSender {
    /// Push a value. Returns `false` if the source side is gone.
    pub fn send(&self, value: Value) -> bool {
        self.tx.send(Ok(value)).is_ok()
    }

    /// Push a produce-step failure.
    pub fn fail(&self, error: Error) -> bool {
        self.tx.send(Err(error)).is_ok()
    }
}

/// A source fed by a channel. Exhausts once every sender is dropped and the
/// queue drains; cancelling closes the channel.
pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<Value, Error>>,
}

/// Create a channel-backed source plus its sender handle.
pub fn channel_source() -> (SourceSender, ChannelSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SourceSender { tx }, ChannelSource { rx })
}

impl ReactiveSource for ChannelSource {
    fn produce(&mut self) -> BoxFuture<'_, Produced> {
        self.rx.recv().boxed()
    }

    fn cancel(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_source_yields_in_order_then_exhausts() {
        let mut source = from_values([Value::Text("a".into()), Value::Text("b".into())]);

        let first = source.produce().await.unwrap().unwrap();
        assert!(matches!(first, Value::Text(t) if t == "a"));
        let second = source.produce().await.unwrap().unwrap();
        assert!(matches!(second, Value::Text(t) if t == "b"));
        assert!(source.produce().await.is_none());
    }

    #[tokio::test]
    async fn queue_source_cancel_exhausts_immediately() {
        let mut source = from_values([Value::Int(1), Value::Int(2)]);
        source.cancel();
        assert!(source.produce().await.is_none());
    }

    #[tokio::test]
    async fn queue_source_carries_failures() {
        let mut source =
            QueueSource::from_results([Ok(Value::Int(1)), Err(Error::source("boom"))]);
        assert!(source.produce().await.unwrap().is_ok());
        assert!(source.produce().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn stream_source_wraps_a_stream() {
        let stream = futures_util::stream::iter(vec![Ok(Value::Int(1)), Ok(Value::Int(2))]);
        let mut source = StreamSource::new(stream);

        assert!(matches!(
            source.produce().await,
            Some(Ok(Value::Int(1)))
        ));
        source.cancel();
        assert!(source.produce().await.is_none());
    }

    #[tokio::test]
    async fn channel_source_ends_when_senders_drop() {
        let (tx, mut source) = channel_source();
        assert!(tx.send(Value::Bool(true)));
        drop(tx);

        assert!(matches!(source.produce().await, Some(Ok(Value::Bool(true)))));
        assert!(source.produce().await.is_none());
    }

    #[tokio::test]
    async fn channel_source_cancel_closes_the_channel() {
        let (tx, mut source) = channel_source();
        source.cancel();
        assert!(!tx.send(Value::Null));
        assert!(source.produce().await.is_none());
    }
}
