/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{RequestDescriptor, Response, TransportError};

/// Performs a single HTTP exchange.
///
/// Backends own connection handling, TLS and redirects. They do not retry and
/// do not apply the request timeout; the [`RuntimeExecutor`](crate::RuntimeExecutor)
/// driving them does that.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn send_request(&self, request: RequestDescriptor) -> Result<Response, TransportError>;
}
