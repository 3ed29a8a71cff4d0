/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Configuration for the [`ChannelApiClient`](crate::ChannelApiClient).

use std::collections::HashMap;
use std::time::Duration;

use once_cell::sync::Lazy;
use url::Url;

use crate::{headers, ChannelApiError, Method, RequestSettings, Result};

static DEVICE_API_ENDPOINT_PROD: Lazy<Url> = Lazy::new(|| {
    Url::parse("https://device-api.urbanairship.com/").expect("hardcoded URL must be valid")
});

const DEFAULT_CHANNELS_PATH: &str = "api/channels/";
const DEFAULT_ACCEPT: &str = "application/vnd.urbanairship+json; version=3;";

#[derive(Clone, Debug)]
pub struct ChannelApiConfig {
    /// Root of the device API. Must be https unless it points at a loopback host.
    pub base_url: Url,

    /// Channel collection, relative to `base_url`. Creation posts here and
    /// updates address `{channels_path}{channel_id}`.
    pub channels_path: String,

    /// Method used for channel updates (`PUT` for the production backend).
    pub update_method: Method,

    /// Headers sent with every request (credentials, accept, user agent...).
    pub headers: HashMap<String, String>,

    pub settings: RequestSettings,
}

impl Default for ChannelApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEVICE_API_ENDPOINT_PROD.clone(),
            channels_path: DEFAULT_CHANNELS_PATH.to_string(),
            update_method: Method::Put,
            headers: HashMap::from([(headers::ACCEPT.to_string(), DEFAULT_ACCEPT.to_string())]),
            settings: RequestSettings::default(),
        }
    }
}

impl ChannelApiConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            ..Default::default()
        })
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Result<Self> {
        let name = config_header(name)?;
        self.headers.insert(name, value.into());
        Ok(self)
    }

    pub fn with_channels_path(mut self, path: impl Into<String>) -> Self {
        self.channels_path = path.into();
        self
    }

    pub fn with_update_method(mut self, method: Method) -> Self {
        self.update_method = method;
        self
    }

    /// A zero duration disables the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout_ms = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        self
    }

    /// The URL of the channel collection.
    pub fn channels_url(&self) -> Result<Url> {
        Ok(self.base_url.join(&self.channels_path)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_secure_or_loopback(&self.base_url) {
            return Err(ChannelApiError::InvalidConfig(format!(
                "{} does not use TLS",
                self.base_url
            )));
        }
        if self.base_url.cannot_be_a_base() {
            return Err(ChannelApiError::InvalidConfig(format!(
                "{} cannot be used as a base URL",
                self.base_url
            )));
        }
        for name in self.headers.keys() {
            config_header(name)?;
        }
        self.channels_url()?;
        Ok(())
    }
}

fn config_header(name: &str) -> Result<String> {
    headers::normalize_request_header(name)
        .map_err(|e| ChannelApiError::InvalidConfig(e.to_string()))
}

fn is_secure_or_loopback(url: &Url) -> bool {
    match url.scheme() {
        "https" => true,
        "http" => match url.host() {
            Some(url::Host::Domain(d)) => d == "localhost",
            Some(url::Host::Ipv4(addr)) => addr.is_loopback(),
            Some(url::Host::Ipv6(addr)) => addr.is_loopback(),
            None => false,
        },
        _ => false,
    }
}
