//! What dispatch needs from the host web framework.
//!
//! Dispatch doesn't know about routing or sockets. It needs a request-scoped
//! key/value store to carry the chosen layout from [`set_layout`] to the
//! render call, and a transport that accepts a finished response.
//!
//! [`MemoryContext`] implements both in memory, for tests and for hosts that
//! build their response after the handler returns.
//!
//! [`set_layout`]: crate::set_layout

use std::collections::HashMap;
use std::io;

use http::StatusCode;

/// Request-scoped key/value store.
pub trait RequestContext {
    fn get_value(&self, key: &str) -> Option<&str>;

    fn set_value(&mut self, key: &str, value: String);
}

/// Response sink for a finished render.
pub trait ResponseTransport {
    fn send(&mut self, status: StatusCode, content_type: &str, body: Vec<u8>) -> io::Result<()>;
}

/// A response captured by [`MemoryContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    /// The body as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// In-memory request context and response transport.
#[derive(Debug, Default)]
pub struct MemoryContext {
    values: HashMap<String, String>,
    response: Option<Response>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The response sent for this request, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl RequestContext for MemoryContext {
    fn get_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    fn set_value(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}

impl ResponseTransport for MemoryContext {
    /// The last response sent wins.
    fn send(&mut self, status: StatusCode, content_type: &str, body: Vec<u8>) -> io::Result<()> {
        self.response = Some(Response {
            status,
            content_type: content_type.to_string(),
            body,
        });
        Ok(())
    }
}
