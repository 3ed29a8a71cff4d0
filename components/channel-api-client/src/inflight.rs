/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Bookkeeping for outstanding channel operations.
//!
//! Each operation is registered *before* it is submitted, together with the
//! closure that delivers its outcome. Whoever removes the entry owns that
//! closure: a completion that removes it delivers, a cancellation that removes
//! it drops it. Removal happens under the lock, so at most one of them wins.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{CompletionCallback, RequestHandle};

pub(crate) type Delivery = CompletionCallback;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OperationId(u64);

struct Entry {
    // `None` until the executor has handed back a handle.
    handle: Option<RequestHandle>,
    deliver: Delivery,
}

#[derive(Default)]
struct State {
    next_id: u64,
    entries: HashMap<OperationId, Entry>,
}

#[derive(Default)]
pub(crate) struct InFlightRequests {
    state: Mutex<State>,
}

impl InFlightRequests {
    pub(crate) fn register(&self, deliver: Delivery) -> OperationId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = OperationId(state.next_id);
        state.entries.insert(
            id,
            Entry {
                handle: None,
                deliver,
            },
        );
        id
    }

    /// Record the executor's handle for `id`.
    ///
    /// Returns false if the operation is no longer tracked, meaning it already
    /// completed or was cancelled while it was being submitted.
    pub(crate) fn attach_handle(&self, id: OperationId, handle: RequestHandle) -> bool {
        match self.state.lock().entries.get_mut(&id) {
            Some(entry) => {
                entry.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    /// Claim the delivery for a finished operation. `None` if it was cancelled.
    pub(crate) fn complete(&self, id: OperationId) -> Option<Delivery> {
        self.state
            .lock()
            .entries
            .remove(&id)
            .map(|entry| entry.deliver)
    }

    /// Forget every tracked operation and return the handles that need cancelling.
    pub(crate) fn drain(&self) -> Vec<RequestHandle> {
        let entries: Vec<Entry> = {
            let mut state = self.state.lock();
            state.entries.drain().map(|(_, entry)| entry).collect()
        };
        // Deliveries are dropped here, outside the lock.
        entries.into_iter().filter_map(|entry| entry.handle).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.state.lock().entries.len()
    }
}
