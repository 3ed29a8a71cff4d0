/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use crate::TransportError;
use std::borrow::Cow;

/// Normalize / validate a request header
///
/// This accepts both &str and String. It either returns the lowercase version or
/// `TransportError::InvalidRequestHeader`
pub fn normalize_request_header<'a>(
    name: impl Into<Cow<'a, str>>,
) -> Result<String, TransportError> {
    do_normalize_header(name).map_err(|name| TransportError::InvalidRequestHeader { name })
}

/// Normalize / validate a response header
pub fn normalize_response_header<'a>(
    name: impl Into<Cow<'a, str>>,
) -> Result<String, TransportError> {
    do_normalize_header(name).map_err(|name| TransportError::InvalidResponseHeader { name })
}

// Field names are RFC 7230 tokens: https://tools.ietf.org/html/rfc7230#section-3.2
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn do_normalize_header<'a>(name: impl Into<Cow<'a, str>>) -> Result<String, String> {
    let name = name.into();
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(name.into_owned());
    }
    if name.bytes().any(|b| b.is_ascii_uppercase()) {
        Ok(name.to_ascii_lowercase())
    } else {
        Ok(name.into_owned())
    }
}

pub const ACCEPT: &str = "accept";
pub const AUTHORIZATION: &str = "authorization";
pub const CONTENT_TYPE: &str = "content-type";
pub const LOCATION: &str = "location";
