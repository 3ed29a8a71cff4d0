/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! The channel registration body.
//!
//! The client accepts any `Serialize` payload; [`ChannelPayload`] is the shape
//! the device API expects.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub channel: ChannelAttributes,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_hints: Option<IdentityHints>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAttributes {
    pub device_type: String,

    pub opt_in: bool,

    /// Whether the app may receive background pushes.
    pub background: bool,

    /// The platform push token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_address: Option<String>,

    /// When true the server replaces its tags with `tags`; when false `tags` is ignored.
    pub set_tags: bool,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale_country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios: Option<IosAttributes>,
}

impl Default for ChannelAttributes {
    fn default() -> Self {
        Self {
            device_type: "ios".to_string(),
            opt_in: false,
            background: false,
            push_address: None,
            set_tags: false,
            tags: Vec::new(),
            alias: None,
            timezone: None,
            locale_language: None,
            locale_country: None,
            ios: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IosAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_time: Option<QuietTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_time_timezone: Option<String>,
}

/// Quiet time bounds, as "HH:MM" strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietTime {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl ChannelPayload {
    pub fn new(push_address: Option<String>, opt_in: bool) -> Self {
        Self {
            channel: ChannelAttributes {
                push_address,
                opt_in,
                ..Default::default()
            },
            identity_hints: None,
        }
    }

    /// Replace the server-side tags with `tags`.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channel.set_tags = true;
        self.channel.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.channel.alias = Some(alias.into());
        self
    }

    pub fn with_locale(mut self, language: impl Into<String>, country: impl Into<String>) -> Self {
        self.channel.locale_language = Some(language.into());
        self.channel.locale_country = Some(country.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.channel.timezone = Some(timezone.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.identity_hints
            .get_or_insert_with(IdentityHints::default)
            .user_id = Some(user_id.into());
        self
    }
}
