//! Signed session cookie: `<session-id>.<hex hmac-sha256>`.

use axum::http::{header, HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::SessionConfig;

type HmacSha256 = Hmac<Sha256>;

/// Browsers cap a cookie at roughly this size; anything larger is not ours.
pub const MAX_COOKIE_LEN: usize = 4096;

pub fn sign(secret: &[u8], value: &str) -> anyhow::Result<String> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|_| anyhow::anyhow!("invalid hmac key"))?;
    mac.update(value.as_bytes());
    Ok(format!("{}.{}", value, hex::encode(mac.finalize().into_bytes())))
}

/// Returns the signed value if the signature checks out.
pub fn verify<'a>(secret: &[u8], signed: &'a str) -> Option<&'a str> {
    if signed.len() > MAX_COOKIE_LEN {
        return None;
    }
    let (value, sig) = signed.rsplit_once('.')?;
    let sig = hex::decode(sig).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(value.as_bytes());
    mac.verify_slice(&sig).ok()?;
    Some(value)
}

/// Finds a cookie by name across all `Cookie` headers.
pub fn read<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

pub fn set_cookie(config: &SessionConfig, value: &str) -> Option<HeaderValue> {
    let secure = if config.secure_cookie { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax{}",
        config.cookie_name, value, config.ttl_seconds, secure
    ))
    .ok()
}

pub fn expire_cookie(config: &SessionConfig) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        config.cookie_name
    ))
    .ok()
}
