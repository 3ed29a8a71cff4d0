/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::borrow::Cow;
use std::collections::HashMap;
use url::Url;

/// A response from the server, as reported by a [`Backend`](crate::Backend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// The URL the response came from, after following any redirects.
    pub url: Url,
    pub status: u16,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<'a, T>(&'a self) -> serde_json::Result<T>
    where
        T: serde::Deserialize<'a>,
    {
        serde_json::from_slice(&self.body)
    }
}
