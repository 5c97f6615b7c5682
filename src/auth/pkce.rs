//! PKCE (Proof Key for Code Exchange, RFC 7636) material for the B2C login

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind the code verifier (86 base64url characters)
const VERIFIER_BYTES: usize = 64;
/// Random bytes behind the OAuth `state` parameter
const STATE_BYTES: usize = 32;

/// One-shot PKCE challenge, generated per login attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Random URL-safe token echoed back by the identity provider
    pub state: String,
    /// Secret sent only with the token exchange
    pub code_verifier: String,
    /// `base64url(SHA-256(code_verifier))` without padding
    pub code_challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let code_verifier = random_urlsafe_token(VERIFIER_BYTES);
        let code_challenge = code_challenge_for(&code_verifier);
        Self {
            state: random_urlsafe_token(STATE_BYTES),
            code_verifier,
            code_challenge,
        }
    }

    /// Challenge method sent with the authorize request
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

/// Derive the S256 code challenge from a verifier
pub fn code_challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_urlsafe_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc7636_appendix_b_vector() {
        assert_eq!(
            code_challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn generated_challenge_is_consistent_and_unpadded() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.code_verifier.len(), 86);
        assert_eq!(pkce.state.len(), 43);
        assert_eq!(pkce.code_challenge, code_challenge_for(&pkce.code_verifier));
        for s in [&pkce.state, &pkce.code_verifier, &pkce.code_challenge] {
            assert!(!s.contains('='));
            assert!(!s.contains('+'));
            assert!(!s.contains('/'));
        }
        assert_eq!(pkce.challenge_method(), "S256");
    }

    #[test]
    fn each_attempt_gets_fresh_material() {
        let a = PkceChallenge::generate();
        let b = PkceChallenge::generate();
        assert_ne!(a.code_verifier, b.code_verifier);
        assert_ne!(a.state, b.state);
    }
}
