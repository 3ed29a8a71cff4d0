/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! Development backend
//!
//! Plain-HTTP `hyper` client with no TLS support, so it only makes sense
//! against local servers. It runs on whatever tokio runtime polls it, which is
//! the [`RuntimeExecutor`](crate::RuntimeExecutor)'s in practice.

use std::collections::HashMap;

use url::Url;

use crate::error::MapBackendError;
use crate::{headers, Backend, Method, RequestDescriptor, Response, TransportError};

type Client = hyper::client::Client<hyper::client::connect::HttpConnector, hyper::Body>;

pub struct DevBackend {
    client: Client,
}

impl DevBackend {
    pub fn new() -> Self {
        log::info!("initializing dev backend");
        Self {
            client: hyper::Client::new(),
        }
    }
}

impl Default for DevBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Backend for DevBackend {
    async fn send_request(&self, request: RequestDescriptor) -> Result<Response, TransportError> {
        let mut url = request.url.clone();
        let mut resp = self.make_single_request(&request, &url).await?;
        let mut redirect_count = 0;
        while resp.status().is_redirection() {
            redirect_count += 1;
            if redirect_count > request.settings.redirect_limit {
                return Err(TransportError::new_backend_error("Too many redirections"));
            }
            let Some(location) = resp.headers().get(headers::LOCATION) else {
                return Err(TransportError::new_backend_error("location header missing"));
            };
            url = url.join(location.to_str().map_backend_error()?)?;
            log::debug!("following redirect to {}", url);
            resp = self.make_single_request(&request, &url).await?;
        }

        let mut response_headers = HashMap::new();
        for (name, value) in resp.headers() {
            let name = headers::normalize_response_header(name.as_str())?;
            response_headers.insert(name, String::from_utf8_lossy(value.as_bytes()).to_string());
        }
        Ok(Response {
            url,
            status: resp.status().as_u16(),
            headers: response_headers,
            body: resp.into_body(),
        })
    }
}

impl DevBackend {
    async fn make_single_request(
        &self,
        request: &RequestDescriptor,
        url: &Url,
    ) -> Result<hyper::Response<Vec<u8>>, TransportError> {
        let mut builder = hyper::Request::builder()
            .uri(convert_url(url)?)
            .method(match request.method {
                Method::Get => hyper::Method::GET,
                Method::Head => hyper::Method::HEAD,
                Method::Post => hyper::Method::POST,
                Method::Put => hyper::Method::PUT,
                Method::Delete => hyper::Method::DELETE,
                Method::Patch => hyper::Method::PATCH,
            });
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let req = builder
            .body(hyper::Body::from(request.body.clone().unwrap_or_default()))
            .map_backend_error()?;
        let (parts, body) = self
            .client
            .request(req)
            .await
            .map_backend_error()?
            .into_parts();
        let body = hyper::body::to_bytes(body).await.map_backend_error()?;
        Ok(hyper::Response::from_parts(parts, body.to_vec()))
    }
}

fn convert_url(url: &Url) -> Result<hyper::Uri, TransportError> {
    hyper::Uri::builder()
        .scheme(url.scheme())
        .authority(url.authority())
        .path_and_query(match url.query() {
            None => url.path().to_string(),
            Some(query) => format!("{}?{}", url.path(), query),
        })
        .build()
        .map_backend_error()
}
