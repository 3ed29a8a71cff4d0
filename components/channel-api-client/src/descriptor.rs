/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Translates a logical channel operation into a [`RequestDescriptor`].
//!
//! Everything here is pure: no I/O, and the same inputs always produce the
//! same descriptor.

use serde::Serialize;
use url::Url;

use crate::{ChannelApiConfig, ChannelApiError, Method, RequestDescriptor, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Create,
    Update(&'a str),
}

impl Operation<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update(_) => "update",
        }
    }
}

pub fn build_request<P>(
    config: &ChannelApiConfig,
    operation: Operation<'_>,
    payload: &P,
) -> Result<RequestDescriptor>
where
    P: Serialize + ?Sized,
{
    let body = encode_payload(payload)?;
    let (method, url) = match operation {
        Operation::Create => (Method::Post, config.channels_url()?),
        Operation::Update(channel_id) => {
            (config.update_method, channel_url(config, channel_id)?)
        }
    };
    let request = RequestDescriptor::new(method, url)
        .settings(config.settings.clone())
        .headers(config.headers.iter().map(|(k, v)| (k.as_str(), v.clone())))?
        .json(&body)
        .map_err(|e| ChannelApiError::EncodingError(e.to_string()))?;
    Ok(request)
}

/// The URL of a single channel, with `channel_id` escaped as one path segment.
///
/// `.` and `..` are rejected: the URL parser treats them as dot segments and
/// would address the collection (or its parent) instead of a channel.
pub fn channel_url(config: &ChannelApiConfig, channel_id: &str) -> Result<Url> {
    if channel_id.trim().is_empty() || channel_id == "." || channel_id == ".." {
        return Err(ChannelApiError::InvalidChannelId(channel_id.to_string()));
    }
    let mut url = config.channels_url()?;
    url.path_segments_mut()
        .map_err(|_| {
            ChannelApiError::InvalidConfig(format!("{} cannot be a base", config.base_url))
        })?
        .pop_if_empty()
        .push(channel_id);
    Ok(url)
}

// Serializing to a `Value` first lets us reject anything but a non-empty
// attribute object, and reports serialization failures before anything
// reaches the network.
fn encode_payload<P>(payload: &P) -> Result<serde_json::Value>
where
    P: Serialize + ?Sized,
{
    let value = serde_json::to_value(payload)
        .map_err(|e| ChannelApiError::EncodingError(e.to_string()))?;
    match &value {
        serde_json::Value::Object(map) if !map.is_empty() => Ok(value),
        serde_json::Value::Object(_) | serde_json::Value::Null => Err(
            ChannelApiError::EncodingError("payload must not be empty".to_string()),
        ),
        _ => Err(ChannelApiError::EncodingError(format!(
            "payload must be a JSON object, got {value}"
        ))),
    }
}
