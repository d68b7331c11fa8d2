//! Anti-forgery token codec.
//!
//! A token is 32 bytes from the OS entropy source, base64url-encoded with
//! padding. Nothing is ever decoded back out of a token except its length;
//! the only operation performed between two tokens is a constant-time
//! equality check.

use crate::error::{AppError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;
use subtle::ConstantTimeEq;

/// Raw token length in bytes
pub const TOKEN_BYTES: usize = 32;

/// Encoded token length (base64 with padding of 32 bytes)
pub const ENCODED_LEN: usize = 44;

/// An anti-forgery token
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a fresh token from the OS entropy source
    ///
    /// # Errors
    ///
    /// Returns [`AppError::RandomSource`] if the entropy source fails. Callers
    /// must fail closed: no cookie is set without a token.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a token from `rng`
    pub fn generate_with(rng: &mut impl RngCore) -> Result<Self> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::RandomSource(e.to_string()))?;
        Ok(Self(URL_SAFE.encode(bytes)))
    }

    /// Accept an existing value only if it is a well-formed token
    pub fn parse(value: &str) -> Option<Self> {
        if value.len() != ENCODED_LEN {
            return None;
        }
        match URL_SAFE.decode(value) {
            Ok(bytes) if bytes.len() == TOKEN_BYTES => Some(Self(value.to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Constant-time comparison against a submitted value
    pub fn matches(&self, submitted: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), submitted.as_bytes())
    }
}

impl fmt::Display for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Keep token values out of debug logs.
impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CsrfToken").field(&"<redacted>").finish()
    }
}

/// Compare two byte strings without branching on their contents.
///
/// The length check is not constant time; token length is public.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
