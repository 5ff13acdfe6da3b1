//! Operation descriptors accepted by the scheduler.

use std::future::Future;

use futures::stream::{self, Once};
use futures::Stream;

/// A factory that starts one cancellable asynchronous unit of work.
///
/// Invoking [`start`](Operation::start) begins the work and returns a stream.
/// Every `Ok` item is a value produced by the operation, the first `Err` is
/// its terminal failure, and the end of the stream is normal completion.
/// Dropping the stream cancels the work.
///
/// Any `FnOnce() -> impl Stream<Item = Result<T, E>>` is an operation:
///
/// ```rust,ignore
/// use futures::stream;
///
/// let upload = move || stream::iter(vec![Ok::<_, String>(25), Ok(100)]);
/// let handle = scheduler.submit(upload);
/// ```
pub trait Operation: Send + 'static {
    /// Value type emitted while running.
    type Item: Send + 'static;
    /// Terminal error type.
    type Error: Send + 'static;
    /// Stream driven once the operation is admitted.
    type Stream: Stream<Item = Result<Self::Item, Self::Error>> + Send + 'static;

    /// Start the work. Called at most once, at admission time.
    fn start(self) -> Self::Stream;
}

impl<F, St, T, E> Operation for F
where
    F: FnOnce() -> St + Send + 'static,
    St: Stream<Item = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Item = T;
    type Error = E;
    type Stream = St;

    fn start(self) -> Self::Stream {
        self()
    }
}

/// Adapt a future-returning factory into a single-value operation.
pub fn from_future<F, Fut, T, E>(factory: F) -> impl FnOnce() -> Once<Fut> + Send + 'static
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    move || stream::once(factory())
}
