/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::{headers, TransportError};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    // Timeout for the entire request in ms (0 indicates no timeout).
    pub timeout_ms: u32,
    // Maximum amount of redirects to follow (0 means redirects are not allowed)
    pub redirect_limit: u32,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            #[cfg(target_os = "ios")]
            timeout_ms: 7000,
            #[cfg(not(target_os = "ios"))]
            timeout_ms: 10000,
            redirect_limit: 10,
        }
    }
}

/// A fully-described HTTP request, ready to be handed to a
/// [`RequestExecutor`](crate::RequestExecutor).
///
/// Descriptors are built with the builder-style methods below and are owned
/// by whoever is about to submit them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub settings: RequestSettings,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            settings: RequestSettings::default(),
        }
    }

    pub fn settings(mut self, settings: RequestSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Add all the provided headers to this request.
    pub fn headers<'a, I, K, V>(mut self, to_add: I) -> Result<Self, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Cow<'a, str>>,
        V: Into<String>,
    {
        for (name, value) in to_add {
            self = self.header(name, value)?
        }
        Ok(self)
    }

    /// Add the provided header to this request, replacing any existing value.
    ///
    /// The name is lowercased; names that aren't valid header tokens are rejected.
    pub fn header<'a>(
        mut self,
        name: impl Into<Cow<'a, str>>,
        val: impl Into<String>,
    ) -> Result<Self, TransportError> {
        self.headers
            .insert(headers::normalize_request_header(name)?, val.into());
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set body to a json-serialized value and the Content-Type header to "application/json".
    pub fn json(mut self, val: &(impl serde::Serialize + ?Sized)) -> serde_json::Result<Self> {
        self.body = Some(serde_json::to_vec(val)?);
        self.headers.insert(
            headers::CONTENT_TYPE.to_owned(),
            "application/json".to_owned(),
        );
        Ok(self)
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}
