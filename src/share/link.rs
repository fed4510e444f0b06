//! Public link tokens.

use rand::Rng;

/// Characters a link token is drawn from.
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Length of a generated token. 64 symbols of 6 bits each gives 384 bits.
pub const LINK_LENGTH: usize = 64;

/// Generate a fresh link token.
pub fn generate_link() -> String {
    let mut rng = rand::rng();
    (0..LINK_LENGTH)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}
