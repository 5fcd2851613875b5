use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Request};
use serde::Serialize;

use crate::config::Credentials;
use crate::error::ClientError;

/// Assembles authenticated daemon requests. Nothing is sent here.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    credentials: &'a Credentials,
    client_version: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(credentials: &'a Credentials, client_version: &'a str) -> Self {
        Self { credentials, client_version }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.credentials.host, path)
    }

    /// Headers attached to every HTTP request and websocket handshake.
    /// Empty credentials are still sent; the daemon decides what they mean.
    pub fn identity_headers(&self) -> [(&'static str, &'a str); 3] {
        [
            (common::USER_EMAIL_HEADER, self.credentials.email.as_str()),
            (common::ACCESS_TOKEN_HEADER, self.credentials.access_token.as_str()),
            (common::CLIENT_VERSION_HEADER, self.client_version),
        ]
    }

    pub fn build(&self, http: &Client, method: Method, path: &str) -> Result<Request, ClientError> {
        self.assemble(http, method, path, None)
    }

    pub fn build_json<B>(&self, http: &Client, method: Method, path: &str, body: &B) -> Result<Request, ClientError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::Request(format!("cannot serialize body for {}: {}", path, e)))?;
        self.assemble(http, method, path, Some(bytes))
    }

    fn assemble(&self, http: &Client, method: Method, path: &str, body: Option<Vec<u8>>) -> Result<Request, ClientError> {
        let mut builder = http.request(method, self.url(path));
        for (name, value) in self.identity_headers() {
            builder = builder.header(name, value);
        }
        if let Some(bytes) = body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }
        builder.build().map_err(|e| ClientError::Request(e.to_string()))
    }
}
