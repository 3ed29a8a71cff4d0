/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::descriptor::{build_request, Operation};
use crate::inflight::{Delivery, InFlightRequests};
use crate::{
    Backend, ChannelApiConfig, ChannelApiError, FailedRequest, RequestDescriptor,
    RequestExecutor, Response, Result, RuntimeExecutor, TransportError,
};

/// A backend-assigned channel identifier.
pub type ChannelId = String;

/// Creates and updates channels against the device API.
///
/// Every call returns immediately; its outcome is delivered exactly once to
/// the supplied callback, on whatever thread the executor completes on.
/// Calls may be made concurrently, and nothing orders the callbacks of
/// concurrent calls, even for the same channel. Callers that need a channel
/// id before updating must wait for the create callback.
///
/// Operations removed by [`cancel_all_requests`](Self::cancel_all_requests)
/// never deliver. Dropping the client cancels everything still outstanding.
pub struct ChannelApiClient {
    config: ChannelApiConfig,
    executor: Arc<dyn RequestExecutor>,
    in_flight: Arc<InFlightRequests>,
}

impl ChannelApiClient {
    pub fn new(config: ChannelApiConfig, executor: Arc<dyn RequestExecutor>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            executor,
            in_flight: Arc::default(),
        })
    }

    /// Build a client that runs requests through `backend` on its own runtime.
    pub fn with_backend(config: ChannelApiConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        let executor = RuntimeExecutor::new(backend)?;
        Self::new(config, Arc::new(executor))
    }

    pub fn config(&self) -> &ChannelApiConfig {
        &self.config
    }

    /// Register a new channel. On success the callback receives its id.
    pub fn create_channel<P, F>(&self, payload: &P, on_complete: F)
    where
        P: Serialize + ?Sized,
        F: FnOnce(std::result::Result<ChannelId, FailedRequest>) + Send + 'static,
    {
        self.start(
            Operation::Create,
            payload,
            decode_create_response,
            on_complete,
        )
    }

    pub fn update_channel<P, F>(&self, channel_id: &str, payload: &P, on_complete: F)
    where
        P: Serialize + ?Sized,
        F: FnOnce(std::result::Result<(), FailedRequest>) + Send + 'static,
    {
        self.start(
            Operation::Update(channel_id),
            payload,
            |_: &Response| Ok(()),
            on_complete,
        )
    }

    pub fn create_channel_async<P>(&self, payload: &P) -> PendingResponse<ChannelId>
    where
        P: Serialize + ?Sized,
    {
        let (tx, rx) = oneshot::channel();
        self.create_channel(payload, move |result| {
            // The receiver may have been dropped; nobody is listening then.
            let _ = tx.send(result);
        });
        PendingResponse { receiver: rx }
    }

    pub fn update_channel_async<P>(&self, channel_id: &str, payload: &P) -> PendingResponse<()>
    where
        P: Serialize + ?Sized,
    {
        let (tx, rx) = oneshot::channel();
        self.update_channel(channel_id, payload, move |result| {
            let _ = tx.send(result);
        });
        PendingResponse { receiver: rx }
    }

    /// Blocking form of [`create_channel_async`](Self::create_channel_async).
    ///
    /// Must not be called from a thread the executor completes requests on.
    pub fn create_channel_sync<P>(
        &self,
        payload: &P,
    ) -> std::result::Result<ChannelId, FailedRequest>
    where
        P: Serialize + ?Sized,
    {
        pollster::block_on(self.create_channel_async(payload))
    }

    pub fn update_channel_sync<P>(
        &self,
        channel_id: &str,
        payload: &P,
    ) -> std::result::Result<(), FailedRequest>
    where
        P: Serialize + ?Sized,
    {
        pollster::block_on(self.update_channel_async(channel_id, payload))
    }

    /// Cancel every outstanding operation.
    ///
    /// Returns once local bookkeeping is done; it does not wait for the
    /// executor to tear down network activity. An operation whose completion
    /// has already claimed its entry still delivers; every other one is
    /// silently dropped.
    pub fn cancel_all_requests(&self) {
        let handles = self.in_flight.drain();
        if handles.is_empty() {
            return;
        }
        log::info!("cancelling {} in-flight channel requests", handles.len());
        for handle in &handles {
            self.executor.cancel(handle);
        }
    }

    /// Number of operations submitted but not yet completed or cancelled.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    fn start<P, T, D, F>(&self, operation: Operation<'_>, payload: &P, decode: D, on_complete: F)
    where
        P: Serialize + ?Sized,
        T: Send + 'static,
        D: FnOnce(&Response) -> Result<T> + Send + 'static,
        F: FnOnce(std::result::Result<T, FailedRequest>) + Send + 'static,
    {
        let kind = operation.name();
        let request = match build_request(&self.config, operation, payload) {
            Ok(request) => request,
            Err(error) => {
                log::warn!("channel {} rejected before submission: {}", kind, error);
                on_complete(Err(FailedRequest::before_submit(error)));
                return;
            }
        };
        log::info!("channel {}: {} {}", kind, request.method, request.url);

        let context = request.clone();
        let deliver: Delivery = Box::new(move |outcome| {
            let result = resolve(context, outcome, decode);
            match &result {
                Ok(_) => log::info!("channel {} succeeded", kind),
                Err(failed) => log_failure(kind, failed),
            }
            on_complete(result);
        });
        let id = self.in_flight.register(deliver);

        let in_flight = Arc::downgrade(&self.in_flight);
        let handle = self.executor.submit(
            request,
            Box::new(move |outcome| {
                let Some(in_flight) = in_flight.upgrade() else {
                    return;
                };
                match in_flight.complete(id) {
                    Some(deliver) => deliver(outcome),
                    None => log::debug!("dropping completion of cancelled channel {}", kind),
                }
            }),
        );
        if !self.in_flight.attach_handle(id, handle) {
            // Completed or cancelled before we got the handle back. Cancelling
            // a finished request is a no-op, so no need to tell them apart.
            self.executor.cancel(&handle);
        }
    }
}

impl Drop for ChannelApiClient {
    fn drop(&mut self) {
        self.cancel_all_requests();
    }
}

fn resolve<T, D>(
    request: RequestDescriptor,
    outcome: std::result::Result<Response, TransportError>,
    decode: D,
) -> std::result::Result<T, FailedRequest>
where
    D: FnOnce(&Response) -> Result<T>,
{
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            return Err(FailedRequest {
                request: Some(request),
                response: None,
                error: e.into(),
            })
        }
    };
    let decoded = if response.is_success() {
        decode(&response)
    } else {
        Err(ChannelApiError::UnexpectedStatus {
            status: response.status,
            method: request.method,
            url: request.url.clone(),
        })
    };
    decoded.map_err(|error| FailedRequest {
        request: Some(request),
        response: Some(response),
        error,
    })
}

fn log_failure(kind: &str, failed: &FailedRequest) {
    match &failed.response {
        Some(response) if response.is_server_error() => {
            log::warn!("channel {} hit a server error: {}", kind, failed.error)
        }
        Some(response) if response.is_client_error() => {
            log::error!("channel {} was rejected: {}", kind, failed.error)
        }
        _ => log::warn!("channel {} failed: {}", kind, failed.error),
    }
}

fn decode_create_response(response: &Response) -> Result<ChannelId> {
    #[derive(Deserialize)]
    struct CreateChannelResponse {
        channel_id: String,
    }
    let body: CreateChannelResponse = response
        .json()
        .map_err(|e| ChannelApiError::DecodingError(e.to_string()))?;
    if body.channel_id.is_empty() {
        return Err(ChannelApiError::DecodingError(
            "empty channel_id in response".to_string(),
        ));
    }
    Ok(body.channel_id)
}

/// The eventual outcome of a channel operation.
///
/// Resolves to a [`FailedRequest`] with [`ChannelApiError::Cancelled`] if the
/// operation is cancelled.
#[must_use = "futures do nothing unless polled"]
pub struct PendingResponse<T> {
    receiver: oneshot::Receiver<std::result::Result<T, FailedRequest>>,
}

impl<T> Future for PendingResponse<T> {
    type Output = std::result::Result<T, FailedRequest>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(FailedRequest::cancelled())))
    }
}
