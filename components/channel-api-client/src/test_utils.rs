/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

use crate::{
    ChannelApiConfig, CompletionCallback, FailedRequest, RequestDescriptor, RequestExecutor,
    RequestHandle, Response, TransportError,
};

pub fn test_config() -> ChannelApiConfig {
    ChannelApiConfig::new("https://device-api.example.com/").unwrap()
}

pub fn response(status: u16, body: &str) -> Response {
    Response {
        url: Url::parse("https://device-api.example.com/api/channels/").unwrap(),
        status,
        headers: HashMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

pub struct Submitted {
    pub handle: RequestHandle,
    pub request: RequestDescriptor,
    on_complete: CompletionCallback,
}

impl Submitted {
    pub fn complete(self, outcome: Result<Response, TransportError>) {
        (self.on_complete)(outcome)
    }
}

/// Holds submissions until the test completes them.
///
/// Cancellation is recorded but does not drop the completion, so tests can
/// check that the client suppresses late deliveries on its own.
#[derive(Default)]
pub struct ManualExecutor {
    pending: Mutex<Vec<Submitted>>,
    cancelled: Mutex<Vec<RequestHandle>>,
    submitted: Mutex<usize>,
}

impl ManualExecutor {
    pub fn take_pending(&self) -> Vec<Submitted> {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Complete every pending submission, returning how many there were.
    pub fn complete_all<F>(&self, outcome: F) -> usize
    where
        F: Fn(&RequestDescriptor) -> Result<Response, TransportError>,
    {
        let pending = self.take_pending();
        let count = pending.len();
        for submitted in pending {
            let result = outcome(&submitted.request);
            submitted.complete(result);
        }
        count
    }

    pub fn submitted_count(&self) -> usize {
        *self.submitted.lock()
    }

    pub fn cancelled(&self) -> Vec<RequestHandle> {
        self.cancelled.lock().clone()
    }
}

impl RequestExecutor for ManualExecutor {
    fn submit(&self, request: RequestDescriptor, on_complete: CompletionCallback) -> RequestHandle {
        let handle = RequestHandle::next();
        *self.submitted.lock() += 1;
        self.pending.lock().push(Submitted {
            handle,
            request,
            on_complete,
        });
        handle
    }

    fn cancel(&self, handle: &RequestHandle) {
        self.cancelled.lock().push(*handle);
    }
}

type Responder = dyn Fn(&RequestDescriptor) -> Result<Response, TransportError> + Send + Sync;

/// Completes every request on the calling thread, before `submit` returns.
pub struct ImmediateExecutor {
    responder: Box<Responder>,
    cancelled: Mutex<usize>,
}

impl ImmediateExecutor {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Result<Response, TransportError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            cancelled: Mutex::new(0),
        }
    }

    pub fn cancelled_count(&self) -> usize {
        *self.cancelled.lock()
    }
}

impl RequestExecutor for ImmediateExecutor {
    fn submit(&self, request: RequestDescriptor, on_complete: CompletionCallback) -> RequestHandle {
        on_complete((self.responder)(&request));
        RequestHandle::next()
    }

    fn cancel(&self, _handle: &RequestHandle) {
        *self.cancelled.lock() += 1;
    }
}

/// Collects the outcomes delivered to channel callbacks.
pub struct Outcomes<T> {
    successes: Arc<Mutex<Vec<T>>>,
    unit_successes: Arc<Mutex<usize>>,
    failures: Arc<Mutex<Vec<FailedRequest>>>,
}

impl<T> Default for Outcomes<T> {
    fn default() -> Self {
        Self {
            successes: Arc::default(),
            unit_successes: Arc::default(),
            failures: Arc::default(),
        }
    }
}

impl<T> Clone for Outcomes<T> {
    fn clone(&self) -> Self {
        Self {
            successes: Arc::clone(&self.successes),
            unit_successes: Arc::clone(&self.unit_successes),
            failures: Arc::clone(&self.failures),
        }
    }
}

impl<T: Clone + Send + 'static> Outcomes<T> {
    pub fn recorder(&self) -> impl FnOnce(Result<T, FailedRequest>) + Send + 'static {
        let outcomes = self.clone();
        move |result| match result {
            Ok(value) => outcomes.successes.lock().push(value),
            Err(failed) => outcomes.failures.lock().push(failed),
        }
    }

    /// A recorder for update callbacks sharing these counters.
    pub fn unit_recorder(&self) -> impl FnOnce(Result<(), FailedRequest>) + Send + 'static {
        let outcomes = self.clone();
        move |result| match result {
            Ok(()) => *outcomes.unit_successes.lock() += 1,
            Err(failed) => outcomes.failures.lock().push(failed),
        }
    }

    pub fn successes(&self) -> Vec<T> {
        self.successes.lock().clone()
    }

    pub fn failures(&self) -> Vec<FailedRequest> {
        self.failures.lock().clone()
    }

    /// Total number of callbacks delivered.
    pub fn count(&self) -> usize {
        self.successes.lock().len() + *self.unit_successes.lock() + self.failures.lock().len()
    }
}
