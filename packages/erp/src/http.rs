//! Single-shot JSON requests against the ERP.
//!
//! ERP calls are never retried inside a chunk: a failed snapshot load
//! aborts the chunk and the caller decides whether to re-invoke it. This
//! module only turns a response into either parsed JSON or an
//! [`ErpError::Upstream`] carrying the status and a body preview.
//!
//! # Usage
//!
//! ```ignore
//! let body = http::send_json(client.get(&url).bearer_auth(&token.0)).await?;
//! ```

use inventory_sync_catalog_models::body_preview;

use crate::ErpError;

/// Sends `request` once and parses a 2xx response body as JSON.
///
/// # Errors
///
/// Returns [`ErpError::Upstream`] for any non-2xx status,
/// [`ErpError::Http`] if the request or body read fails, and
/// [`ErpError::Json`] if the body is not valid JSON.
pub async fn send_json(request: reqwest::RequestBuilder) -> Result<serde_json::Value, ErpError> {
    let response = request.send().await?;
    let url = response.url().to_string();
    let status = response.status();

    // Read the raw body as text first so failures can log what arrived.
    let text = response.text().await?;

    if !status.is_success() {
        let body = body_preview(&text);
        log::error!("ERP request failed\n  url: {url}\n  status: {status}\n  body: {body}");
        return Err(ErpError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        log::error!(
            "ERP response is not JSON\n  url: {url}\n  received: {} bytes\n  parse error: {e}\n  body preview: {}",
            text.len(),
            body_preview(&text),
        );
        ErpError::Json(e)
    })
}
