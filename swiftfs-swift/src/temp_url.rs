//! Swift TempURL signing (HMAC-SHA256 variant).
//!
//! The signed body is `{method}\n{expires}\n{path}` where `path` is the
//! full object path on the proxy, e.g. `/v1/AUTH_acct/container/object`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::store::StoreError;

type HmacSha256 = Hmac<Sha256>;

pub fn signature(key: &str, method: &str, expires: i64, path: &str) -> String {
    let body = format!("{}\n{}\n{}", method, expires, path);
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC key length ok");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Append the TempURL query to an object URL.
///
/// `object_url` must be absolute; its decoded path component is what gets
/// signed.
pub fn sign_url(
    object_url: &str,
    key: &str,
    method: &str,
    expires: i64,
) -> Result<String, StoreError> {
    let url = reqwest::Url::parse(object_url)
        .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", object_url, e)))?;
    // Swift verifies against the decoded request path
    let path = urlencoding::decode(url.path())
        .map_err(|e| StoreError::InvalidUrl(format!("{}: {}", object_url, e)))?;
    let sig = signature(key, method, expires, &path);
    Ok(format!(
        "{}?temp_url_sig={}&temp_url_expires={}",
        object_url, sig, expires
    ))
}
