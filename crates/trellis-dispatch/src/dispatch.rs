//! Per-request layout selection and response emission.

use http::StatusCode;
use serde::Serialize;
use trellis_render::{Engine, RenderError};

use crate::host::{RequestContext, ResponseTransport};

/// Request context key holding the layout chosen for the request.
pub const LAYOUT_KEY: &str = "layout";

/// Content type of rendered pages.
pub const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

const ERROR_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Errors from [`render`] and [`view`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The template could not be rendered. A 500 response was attempted; if
    /// the transport rejected it, that failure is logged and this error is
    /// still returned.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The host's transport rejected the response.
    #[error("failed to send response: {0}")]
    Transport(#[from] std::io::Error),
}

/// Chooses the layout for the rest of this request. `""` disables layouts.
pub fn set_layout<C: RequestContext + ?Sized>(ctx: &mut C, layout: impl Into<String>) {
    ctx.set_value(LAYOUT_KEY, layout.into());
}

/// The layout this request renders with: its own choice, else the engine's
/// default.
pub fn active_layout<'a, C: RequestContext + ?Sized>(engine: &'a Engine, ctx: &'a C) -> &'a str {
    ctx.get_value(LAYOUT_KEY)
        .unwrap_or_else(|| engine.default_layout())
}

/// Renders `name` with the request's layout and sends it with `status`.
///
/// On a render failure a `500 Internal Server Error` is sent instead and the
/// render error is returned, even when sending the 500 fails.
pub fn render<C, T>(
    engine: &Engine,
    ctx: &mut C,
    status: StatusCode,
    name: &str,
    data: &T,
) -> Result<(), DispatchError>
where
    C: RequestContext + ResponseTransport + ?Sized,
    T: Serialize + ?Sized,
{
    let layout = active_layout(engine, ctx).to_string();

    match engine.render(name, data, &layout) {
        Ok(page) => {
            ctx.send(status, HTML_CONTENT_TYPE, page.into_bytes())?;
            Ok(())
        }
        Err(err) => {
            tracing::error!(template = name, layout = %layout, error = %err, "render failed");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let body = status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .as_bytes()
                .to_vec();
            if let Err(send_err) = ctx.send(status, ERROR_CONTENT_TYPE, body) {
                tracing::error!(template = name, error = %send_err, "failed to send error response");
            }
            Err(err.into())
        }
    }
}

/// [`render`] with `200 OK`.
pub fn view<C, T>(engine: &Engine, ctx: &mut C, name: &str, data: &T) -> Result<(), DispatchError>
where
    C: RequestContext + ResponseTransport + ?Sized,
    T: Serialize + ?Sized,
{
    render(engine, ctx, StatusCode::OK, name, data)
}
