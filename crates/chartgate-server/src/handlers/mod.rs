pub mod install;
pub mod repo;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::ApiError;

/// Decode a JSON request body; any failure is an input error.
pub(crate) fn decode_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::Input(err.to_string()))
}
