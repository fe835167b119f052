//! Signed, expiring document download links

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SessionError;

type HmacSha256 = Hmac<Sha256>;

/// Download link lifetime
pub const DOWNLOAD_LINK_TTL_SECS: i64 = 60 * 60;

fn mac(secret: &[u8], document_id: &str, expires: i64) -> Result<HmacSha256, SessionError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .map_err(|e| SessionError::Signing(e.to_string()))?;
    mac.update(format!("{}:{}", document_id, expires).as_bytes());
    Ok(mac)
}

/// Append `expires` and `signature` parameters to `file_url`
pub fn sign_download_url(
    secret: &[u8],
    file_url: &str,
    document_id: &str,
    expires: i64,
) -> Result<String, SessionError> {
    let signature = hex::encode(mac(secret, document_id, expires)?.finalize().into_bytes());
    let separator = if file_url.contains('?') { '&' } else { '?' };
    Ok(format!(
        "{}{}expires={}&signature={}",
        file_url, separator, expires, signature
    ))
}

/// Check a download signature and that `now` is before `expires`.
///
/// Signed links are redeemed by the file host, so only tests call this here.
#[cfg(test)]
pub fn verify_download_signature(
    secret: &[u8],
    document_id: &str,
    expires: i64,
    signature: &str,
    now: i64,
) -> bool {
    if now >= expires {
        return false;
    }
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    mac(secret, document_id, expires)
        .map(|mac| mac.verify_slice(&expected).is_ok())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"download-secret";

    fn signature_of(url: &str) -> &str {
        url.rsplit_once("signature=").unwrap().1
    }

    #[test]
    fn test_sign_and_verify() {
        let url = sign_download_url(SECRET, "https://files.example.com/a.pdf", "d1", 2_000).unwrap();
        assert!(url.starts_with("https://files.example.com/a.pdf?expires=2000&signature="));

        let signature = signature_of(&url);
        assert_eq!(signature.len(), 64);
        assert!(verify_download_signature(SECRET, "d1", 2_000, signature, 1_000));
    }

    #[test]
    fn test_existing_query_is_extended() {
        let url = sign_download_url(SECRET, "https://files/a.pdf?sv=1", "d1", 5).unwrap();
        assert!(url.starts_with("https://files/a.pdf?sv=1&expires=5&signature="));
    }

    #[test]
    fn test_rejects_tampering_and_expiry() {
        let url = sign_download_url(SECRET, "https://files/a.pdf", "d1", 2_000).unwrap();
        let signature = signature_of(&url);

        assert!(!verify_download_signature(SECRET, "d2", 2_000, signature, 1_000));
        assert!(!verify_download_signature(SECRET, "d1", 3_000, signature, 1_000));
        assert!(!verify_download_signature(b"other", "d1", 2_000, signature, 1_000));
        assert!(!verify_download_signature(SECRET, "d1", 2_000, signature, 2_000));
        assert!(!verify_download_signature(SECRET, "d1", 2_000, "zz", 1_000));
    }
}
