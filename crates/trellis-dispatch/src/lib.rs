//! Request-scoped layout selection and response dispatch.
//!
//! `trellis-dispatch` is the thin layer a web handler calls. It picks the
//! layout for the current request, renders through a shared
//! [`Engine`](trellis_render::Engine) and hands the bytes to the host.
//!
//! The host supplies two traits, usually on one request type:
//!
//! - [`RequestContext`]: a request-scoped key/value store
//! - [`ResponseTransport`]: accepts status, content type and body
//!
//! # Usage
//!
//! ```rust,ignore
//! use trellis_dispatch::{set_layout, view, render};
//!
//! fn show_user(engine: &Engine, req: &mut MyRequest) -> Result<(), DispatchError> {
//!     set_layout(req, "layouts/admin.html");
//!     view(engine, req, "user/show.html", &user)
//! }
//!
//! fn not_found(engine: &Engine, req: &mut MyRequest) -> Result<(), DispatchError> {
//!     set_layout(req, ""); // bare page, no layout
//!     render(engine, req, StatusCode::NOT_FOUND, "errors/404.html", &())
//! }
//! ```
//!
//! Requests that never call [`set_layout`] use the engine's default layout.

mod dispatch;
mod host;

pub use dispatch::{
    active_layout, render, set_layout, view, DispatchError, HTML_CONTENT_TYPE, LAYOUT_KEY,
};
pub use host::{MemoryContext, RequestContext, Response, ResponseTransport};

pub use http::StatusCode;
