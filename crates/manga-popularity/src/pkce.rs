//! PKCE verifier/challenge and OAuth `state` generation.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use shared::ChallengeMethod;

/// Shortest verifier allowed by RFC 7636
pub const MIN_VERIFIER_LEN: usize = 43;
/// Longest verifier allowed by RFC 7636
pub const MAX_VERIFIER_LEN: usize = 128;

/// Random bytes behind each verifier (encodes to 134 characters)
const VERIFIER_ENTROPY_BYTES: usize = 100;
const STATE_ENTROPY_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
    pub method: ChallengeMethod,
}

impl PkcePair {
    /// Generate a fresh verifier and derive its challenge
    pub fn generate(method: ChallengeMethod) -> Self {
        Self::from_verifier(generate_code_verifier(), method)
    }

    pub fn from_verifier(code_verifier: String, method: ChallengeMethod) -> Self {
        let code_challenge = match method {
            ChallengeMethod::Plain => code_verifier.clone(),
            ChallengeMethod::S256 => code_challenge_s256(&code_verifier),
        };

        Self {
            code_verifier,
            code_challenge,
            method,
        }
    }
}

/// Generate a URL-safe verifier from the OS random source
pub fn generate_code_verifier() -> String {
    let verifier = random_urlsafe(VERIFIER_ENTROPY_BYTES);
    verifier.chars().take(MAX_VERIFIER_LEN).collect()
}

/// Generate an opaque CSRF `state` value
pub fn generate_state() -> String {
    random_urlsafe(STATE_ENTROPY_BYTES)
}

pub fn code_challenge_s256(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_urlsafe(len: usize) -> String {
    let mut random = vec![0u8; len];
    OsRng.fill_bytes(&mut random);
    URL_SAFE_NO_PAD.encode(random)
}
