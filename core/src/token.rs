//! Opaque bearer tokens and match codes.
//!
//! Every capability handed to a client (session cookie, action token,
//! queue token, game token, player token) is an unguessable random
//! string, never a structured/encoded value a client could decode or
//! forge. Match codes are the one user-facing exception: short, typed by
//! hand, drawn from an ambiguity-free alphabet.

use base64::Engine;
use rand::Rng;

const MATCH_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MATCH_CODE_LEN: usize = 6;

/// A URL-safe, unguessable bearer token with >=128 bits of entropy.
pub fn opaque_token() -> String {
    let mut bytes = [0u8; 24]; // 192 bits
    rand::thread_rng().fill(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// A 6-character match code from the 32-symbol ambiguity-free alphabet
/// (`A-Z` minus `I`, `O`, union `2-9`).
pub fn match_code() -> String {
    let mut rng = rand::thread_rng();
    (0..MATCH_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..MATCH_CODE_ALPHABET.len());
            MATCH_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn match_code_uses_ambiguity_free_alphabet() {
        for _ in 0..200 {
            let code = match_code();
            assert_eq!(code.len(), MATCH_CODE_LEN);
            for c in code.chars() {
                assert!(!"01IO".contains(c), "ambiguous char {c} in {code}");
            }
        }
    }

    #[test]
    fn opaque_tokens_are_unique_and_long() {
        let mut seen = HashSet::new();
        for _ in 0..500 {
            let t = opaque_token();
            assert!(t.len() >= 24);
            assert!(seen.insert(t), "token collision");
        }
    }
}
