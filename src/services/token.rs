use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "v1";

/// Signing context for auth tokens. Keys derived under another context never verify here.
const TOKEN_CONTEXT: &[u8] = b"safetrip.auth-token.v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,
    #[error("Token expired")]
    Expired,
}

/// Stateless bearer tokens binding a user id to an issue time.
///
/// Format: `v1.<user_id>.<issued_at>.<base64url(HMAC-SHA256)>`. There is no
/// revocation list; rotating the secret invalidates every outstanding token.
#[derive(Clone)]
pub struct TokenService {
    key: Vec<u8>,
    max_age: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, max_age: Duration) -> Self {
        Self {
            key: derive_key(secret.as_bytes()),
            max_age,
        }
    }

    pub fn mint(&self, user_id: i64, now: DateTime<Utc>) -> String {
        let issued_at = now.timestamp();
        let signature = self.sign(user_id, issued_at);
        format!(
            "{}.{}.{}.{}",
            TOKEN_VERSION,
            user_id,
            issued_at,
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<i64, TokenError> {
        let mut parts = token.trim().split('.');
        let (Some(version), Some(user_id), Some(issued_at), Some(signature), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        if version != TOKEN_VERSION {
            return Err(TokenError::Malformed);
        }

        let user_id: i64 = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let issued_at: i64 = issued_at.parse().map_err(|_| TokenError::Malformed)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac();
        mac.update(signed_payload(user_id, issued_at).as_bytes());
        mac.verify_slice(&signature).map_err(|_| TokenError::Malformed)?;

        if now.timestamp() - issued_at > self.max_age.num_seconds() {
            return Err(TokenError::Expired);
        }

        Ok(user_id)
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age.num_seconds()
    }

    fn sign(&self, user_id: i64, issued_at: i64) -> Vec<u8> {
        let mut mac = self.mac();
        mac.update(signed_payload(user_id, issued_at).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn mac(&self) -> HmacSha256 {
        <HmacSha256 as Mac>::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }
}

fn derive_key(secret: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(TOKEN_CONTEXT);
    mac.finalize().into_bytes().to_vec()
}

fn signed_payload(user_id: i64, issued_at: i64) -> String {
    format!("{}|{}|{}", TOKEN_VERSION, user_id, issued_at)
}
