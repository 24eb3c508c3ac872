//! Response classification.
//!
//! A 2xx response is either decoded into the caller's type ([`decode_json`])
//! or drained ([`drain`]). Anything else becomes an [`ApiError`]. An error
//! body that looks like JSON but fails to parse is a decode failure of the
//! call; a plain-text body only leaves the message empty.

use crate::features::transport::repo::TransportResponse;
use crate::shared::error::{ApiError, MachinesError, MachinesResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

pub fn is_success(status: u16) -> bool {
    (200..=299).contains(&status)
}

fn looks_like_json_object(body: &[u8]) -> bool {
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{')
}

/// Builds the error for a non-2xx response.
pub fn classify_error(response: TransportResponse) -> MachinesError {
    let TransportResponse {
        status,
        headers,
        body,
    } = response;

    let error_message = if looks_like_json_object(&body) {
        match serde_json::from_slice::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error.unwrap_or_default(),
            Err(e) => return MachinesError::Decode(e),
        }
    } else {
        String::new()
    };

    MachinesError::Api(ApiError::new(status, error_message, headers, body))
}

/// Decodes a 2xx body as JSON into `T`.
pub fn decode_json<T: DeserializeOwned>(response: TransportResponse) -> MachinesResult<T> {
    if !is_success(response.status) {
        return Err(classify_error(response));
    }
    serde_json::from_slice(&response.body).map_err(MachinesError::Decode)
}

/// Accepts any 2xx response and discards its body unread.
pub fn drain(response: TransportResponse) -> MachinesResult<()> {
    if !is_success(response.status) {
        return Err(classify_error(response));
    }
    Ok(())
}
