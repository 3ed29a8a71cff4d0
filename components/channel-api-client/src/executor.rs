/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Request execution.
//!
//! A [`RequestExecutor`] accepts a [`RequestDescriptor`] and a completion
//! callback, runs the exchange somewhere else and hands back a
//! [`RequestHandle`] that can later be used to cancel it. The client never
//! blocks on network I/O itself.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::AbortHandle;

use crate::error::MapBackendError;
use crate::{Backend, RequestDescriptor, Response, TransportError};

/// Invoked exactly once when a submitted request finishes, unless the request
/// was cancelled first.
pub type CompletionCallback = Box<dyn FnOnce(Result<Response, TransportError>) + Send + 'static>;

/// Opaque token identifying one submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    /// Allocate a handle that is unique for the life of the process.
    pub fn next() -> Self {
        static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait RequestExecutor: Send + Sync {
    /// Start executing `request` and return immediately.
    ///
    /// `on_complete` may be called on any thread, including the calling one
    /// before `submit` returns.
    fn submit(&self, request: RequestDescriptor, on_complete: CompletionCallback) -> RequestHandle;

    /// Best-effort cancellation. Once this returns, `on_complete` for `handle`
    /// will not be called unless it was already running. Unknown or finished
    /// handles are ignored.
    fn cancel(&self, handle: &RequestHandle);
}

/// Executes requests on a dedicated multi-threaded tokio runtime.
pub struct RuntimeExecutor {
    // Only `None` while dropping.
    runtime: Option<tokio::runtime::Runtime>,
    handle: tokio::runtime::Handle,
    backend: Arc<dyn Backend>,
    tasks: Arc<Mutex<HashMap<RequestHandle, AbortHandle>>>,
}

impl RuntimeExecutor {
    pub fn new(backend: Arc<dyn Backend>) -> Result<Self, TransportError> {
        Self::with_worker_threads(backend, 1)
    }

    pub fn with_worker_threads(
        backend: Arc<dyn Backend>,
        worker_threads: usize,
    ) -> Result<Self, TransportError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("channel-api-executor")
            .enable_all()
            .build()
            .map_backend_error()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
            backend,
            tasks: Arc::default(),
        })
    }

    /// Number of submitted requests that have neither completed nor been cancelled.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

// A panicking backend still has to complete the request, or its caller would
// wait forever.
async fn send_catching_panics(
    backend: &dyn Backend,
    request: RequestDescriptor,
) -> Result<Response, TransportError> {
    AssertUnwindSafe(send_with_timeout(backend, request))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("backend panicked: {}", msg);
            Err(TransportError::new_backend_error(format!(
                "backend panicked: {msg}"
            )))
        })
}

async fn send_with_timeout(
    backend: &dyn Backend,
    request: RequestDescriptor,
) -> Result<Response, TransportError> {
    let timeout_ms = request.settings.timeout_ms;
    let send = backend.send_request(request);
    if timeout_ms == 0 {
        send.await
    } else {
        tokio::time::timeout(Duration::from_millis(timeout_ms.into()), send)
            .await
            .unwrap_or(Err(TransportError::Timeout))
    }
}

impl RequestExecutor for RuntimeExecutor {
    fn submit(&self, request: RequestDescriptor, on_complete: CompletionCallback) -> RequestHandle {
        let handle = RequestHandle::next();
        let backend = Arc::clone(&self.backend);
        let tasks = Arc::clone(&self.tasks);
        // Held across the spawn so the task can't deregister before it's registered.
        let mut registered = self.tasks.lock();
        let task = self.handle.spawn(async move {
            let outcome = send_catching_panics(backend.as_ref(), request).await;
            if tasks.lock().remove(&handle).is_some() {
                on_complete(outcome);
            }
        });
        registered.insert(handle, task.abort_handle());
        handle
    }

    fn cancel(&self, handle: &RequestHandle) {
        if let Some(task) = self.tasks.lock().remove(handle) {
            log::debug!("aborting request {}", handle.id());
            task.abort();
        }
    }
}

impl Drop for RuntimeExecutor {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::Method;
    use std::sync::mpsc;
    use url::Url;

    fn request(timeout_ms: u32) -> RequestDescriptor {
        let mut request = RequestDescriptor::new(
            Method::Post,
            Url::parse("https://example.com/api/channels/").unwrap(),
        );
        request.settings.timeout_ms = timeout_ms;
        request
    }

    fn ok_response(status: u16) -> Response {
        Response {
            url: Url::parse("https://example.com/api/channels/").unwrap(),
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    #[test]
    fn test_handles_are_unique() {
        let a = RequestHandle::next();
        let b = RequestHandle::next();
        assert_ne!(a, b);
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_submit_delivers_backend_response() {
        let mut backend = MockBackend::new();
        backend
            .expect_send_request()
            .withf(|req| req.method == Method::Post)
            .times(1)
            .returning(|_| Ok(ok_response(201)));
        let executor = RuntimeExecutor::new(Arc::new(backend)).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.submit(
            request(0),
            Box::new(move |outcome| tx.send(outcome).unwrap()),
        );
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.unwrap().status, 201);
        // The task deregisters itself before delivering.
        assert_eq!(executor.pending_count(), 0);
    }

    #[test]
    fn test_submit_delivers_backend_error() {
        let mut backend = MockBackend::new();
        backend
            .expect_send_request()
            .returning(|_| Err(TransportError::new_backend_error("connection refused")));
        let executor = RuntimeExecutor::new(Arc::new(backend)).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.submit(
            request(0),
            Box::new(move |outcome| tx.send(outcome).unwrap()),
        );
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            outcome.unwrap_err(),
            TransportError::BackendError {
                msg: "connection refused".into()
            }
        );
    }

    struct StalledBackend;

    #[async_trait::async_trait]
    impl Backend for StalledBackend {
        async fn send_request(
            &self,
            _request: RequestDescriptor,
        ) -> Result<Response, TransportError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ok_response(200))
        }
    }

    #[test]
    fn test_timeout_is_reported() {
        let executor = RuntimeExecutor::new(Arc::new(StalledBackend)).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.submit(
            request(50),
            Box::new(move |outcome| tx.send(outcome).unwrap()),
        );
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(outcome.unwrap_err(), TransportError::Timeout);
    }

    struct PanickingBackend;

    #[async_trait::async_trait]
    impl Backend for PanickingBackend {
        async fn send_request(
            &self,
            _request: RequestDescriptor,
        ) -> Result<Response, TransportError> {
            panic!("connection pool poisoned");
        }
    }

    #[test]
    fn test_backend_panic_is_delivered_as_error() {
        let executor = RuntimeExecutor::new(Arc::new(PanickingBackend)).unwrap();
        let (tx, rx) = mpsc::channel();
        executor.submit(
            request(0),
            Box::new(move |outcome| tx.send(outcome).unwrap()),
        );
        let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        match outcome {
            Err(TransportError::BackendError { msg }) => {
                assert!(msg.contains("connection pool poisoned"), "{msg}")
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(executor.pending_count(), 0);
    }

    #[test]
    fn test_cancel_suppresses_completion() {
        let executor = RuntimeExecutor::new(Arc::new(StalledBackend)).unwrap();
        let (tx, rx) = mpsc::channel::<Result<Response, TransportError>>();
        let handle = executor.submit(
            request(0),
            Box::new(move |outcome| tx.send(outcome).unwrap()),
        );
        assert_eq!(executor.pending_count(), 1);
        executor.cancel(&handle);
        assert_eq!(executor.pending_count(), 0);
        // The aborted task drops the callback, disconnecting the channel.
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(5)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
        // Cancelling again is a no-op.
        executor.cancel(&handle);
    }
}
