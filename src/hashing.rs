use sha2::{Digest, Sha256};

use crate::error::{NodeError, Result};

/// SHA-256 over the plain concatenation of `parts`, as lowercase hex.
///
/// Callers are responsible for passing fields in their canonical order;
/// no separators are inserted.
pub fn content_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Expand a hex string into its binary digits ("a" -> "1010").
pub fn hex_to_binary(hex: &str) -> Result<String> {
    let mut bits = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let nibble = match c {
            '0'..='9' | 'a'..='f' => c.to_digit(16).unwrap_or_default(),
            _ => {
                return Err(NodeError::structural(format!(
                    "invalid hex digit {c:?} in hash"
                )));
            }
        };
        bits.push_str(&format!("{nibble:04b}"));
    }
    Ok(bits)
}

/// True iff the binary expansion of `hash` starts with `difficulty` zero bits.
/// A hash that is not lowercase hex never satisfies any difficulty.
pub fn hash_satisfies_difficulty(hash: &str, difficulty: u32) -> bool {
    match hex_to_binary(hash) {
        Ok(bits) => {
            let required = difficulty as usize;
            bits.len() >= required && bits.bytes().take(required).all(|b| b == b'0')
        }
        Err(_) => false,
    }
}
