use rand::Rng;

/// Number of random bytes behind every session and confirmation token.
pub const TOKEN_BYTES: usize = 32;

/// Generate an unguessable, URL-safe opaque token (hex of 32 random bytes).
pub fn generate_random_token() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; TOKEN_BYTES] = rng.gen();
    hex::encode(token_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_random_token();
        assert_eq!(token.len(), TOKEN_BYTES * 2);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_fresh() {
        let tokens: HashSet<String> = (0..256).map(|_| generate_random_token()).collect();
        assert_eq!(tokens.len(), 256);
    }
}
