//! Extractor trait for pulling records from a source

use eyre::Result;
use std::future::Future;
use tokio::sync::mpsc;

/// Extractor trait for pulling items from a source one at a time
///
/// Sources are lazy, finite and non-restartable: each call yields the next
/// item until `Ok(None)` marks the end.
///
/// # Example
/// ```no_run
/// use hbase_import::etl::Extractor;
/// use eyre::Result;
///
/// struct Countdown(u32);
///
/// impl Extractor for Countdown {
///     type Item = u32;
///
///     async fn extract_next(&mut self) -> Result<Option<Self::Item>> {
///         if self.0 == 0 {
///             return Ok(None);
///         }
///         self.0 -= 1;
///         Ok(Some(self.0))
///     }
/// }
/// ```
pub trait Extractor: Send {
    /// The type of items extracted
    type Item: Send;

    /// Pull the next item, or `None` once the source is exhausted
    ///
    /// # Errors
    /// Returns an error if extraction fails (I/O, parsing, etc.)
    fn extract_next(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;

    /// Drain the remaining items
    fn extract_all(&mut self) -> impl Future<Output = Result<Vec<Self::Item>>> + Send
    where
        Self: Sized,
    {
        async move {
            let mut items = Vec::new();
            while let Some(item) = self.extract_next().await? {
                items.push(item);
            }
            Ok(items)
        }
    }
}

/// Extractor over items already in memory
pub struct VecExtractor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecExtractor<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }
}

impl<T: Send> Extractor for VecExtractor<T> {
    type Item = T;

    async fn extract_next(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.items.next())
    }
}

/// Extractor fed through a channel; ends when every sender is dropped
///
/// `extract_next` is cancel safe.
pub struct ChannelExtractor<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> ChannelExtractor<T> {
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self { receiver }
    }
}

impl<T: Send> Extractor for ChannelExtractor<T> {
    type Item = T;

    async fn extract_next(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.receiver.recv().await)
    }
}
