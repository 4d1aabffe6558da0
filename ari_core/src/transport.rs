//! HTTP transport.
//!
//! The API client talks to the backend through [`Transport`] so the flows can
//! be exercised without a server. [`ReqwestTransport`] is the real thing.

use crate::Result;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// A request ready to go on the wire
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// Status and raw body of a response
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Blocking reqwest transport
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    /// Build a client; `None` disables the request timeout entirely
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        Ok(HttpResponse { status, body })
    }
}

/// Scripted transport for unit tests
///
/// Responses are queued per `(method, path)` and consumed in order; every
/// request is recorded. An unscripted route answers 404.
#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockTransport {
        routes: Mutex<HashMap<(Method, String), VecDeque<HttpResponse>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
            let body = if body.is_null() {
                String::new()
            } else {
                body.to_string()
            };
            self.routes
                .lock()
                .unwrap()
                .entry((method, path.to_string()))
                .or_default()
                .push_back(HttpResponse { status, body });
        }

        pub fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().unwrap().clone()
        }

        /// `"METHOD /path"` for every request, in order
        pub fn calls(&self) -> Vec<String> {
            self.requests()
                .iter()
                .map(|r| format!("{} {}", r.method.as_str(), path_of(&r.url)))
                .collect()
        }
    }

    fn path_of(url: &str) -> String {
        let rest = url.splitn(2, "://").nth(1).unwrap_or(url);
        match rest.find('/') {
            Some(idx) => rest[idx..].to_string(),
            None => "/".to_string(),
        }
    }

    impl Transport for MockTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let key = (request.method, path_of(&request.url));
            let next = self
                .routes
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|queue| queue.pop_front());
            Ok(next.unwrap_or(HttpResponse {
                status: 404,
                body: r#"{"message":"rota não simulada"}"#.into(),
            }))
        }
    }
}
