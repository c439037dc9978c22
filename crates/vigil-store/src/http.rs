//! Response helpers shared by the REST client.

use vigil_core::RemoteError;

/// Return the response unchanged on success; otherwise turn it into
/// [`RemoteError::Rejected`] carrying the status and body.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(RemoteError::Rejected {
        status: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            message
        },
    })
}

/// Classify a transport-level `reqwest` failure.
pub fn transport_error(error: &reqwest::Error) -> RemoteError {
    if error.is_decode() {
        RemoteError::Malformed(error.to_string())
    } else {
        RemoteError::Unavailable(error.to_string())
    }
}
