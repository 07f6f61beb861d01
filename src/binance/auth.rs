//! Request authentication for Binance futures
//!
//! Signed endpoints take an HMAC-SHA256 signature of the full query
//! string, appended as the `signature` parameter, plus the API key in
//! the `X-MBX-APIKEY` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a query string with the API secret, returning lowercase hex
pub fn sign_query(query: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(query.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// API credentials container
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Credentials {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load from `BINANCE_API_KEY` / `BINANCE_API_SECRET`
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self::new(
            std::env::var("BINANCE_API_KEY")?,
            std::env::var("BINANCE_API_SECRET")?,
        ))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn sign(&self, query: &str) -> String {
        sign_query(query, &self.api_secret)
    }
}
