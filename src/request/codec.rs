use crate::request::{Record, Request};
use crate::{CodecError, CodecResult};
use sha2::{Digest, Sha256};
use url::Url;

/// Computes the success key for a record
///
/// The key is the hex-encoded SHA-256 of the upper-cased method and the URL,
/// so the same fetch always maps to the same key.
pub fn success_key<R: Record + ?Sized>(record: &R) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.method().to_ascii_uppercase().as_bytes());
    hasher.update(b" ");
    hasher.update(record.url().as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the failure key for a request
///
/// Failure keys carry the whole request so it can be rebuilt for retry.
pub fn failure_key(request: &Request) -> CodecResult<String> {
    Ok(serde_json::to_string(request)?)
}

/// Rebuilds a request from a failure key
///
/// # Returns
///
/// * `Ok(Request)` - The decoded request
/// * `Err(CodecError::Decode)` - The key is not a serialized request
/// * `Err(CodecError::InvalidRequest)` - The request has no spider or a bad URL
pub fn decode_request(key: &str) -> CodecResult<Request> {
    let request: Request = serde_json::from_str(key)?;

    if request.spider.is_empty() {
        return Err(CodecError::InvalidRequest(format!(
            "missing spider name for {}",
            request.url
        )));
    }

    Url::parse(&request.url)
        .map_err(|e| CodecError::InvalidRequest(format!("bad URL '{}': {}", request.url, e)))?;

    Ok(request)
}

/// Name of the spider that owns a request
pub fn spider_name_of(request: &Request) -> &str {
    &request.spider
}
