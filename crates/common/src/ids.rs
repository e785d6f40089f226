//! Identifier and display-code generation
//!
//! Ids are short random base-36 strings. Reward codes are `REWARD<n>` with
//! `n` in `0..10000`. Neither is checked for collisions.

use rand::Rng;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 8;

/// Generate a short opaque identifier
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

/// Generate a reward display code
pub fn reward_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("REWARD{}", n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_short_id_shape() {
        let id = short_id();
        assert_eq!(id.len(), ID_LEN);
        assert!(id.bytes().all(|b| ID_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_short_ids_very_likely_distinct() {
        // 36^8 possible ids; 1000 draws colliding is vanishingly unlikely
        let ids: HashSet<String> = (0..1000).map(|_| short_id()).collect();
        assert!(ids.len() >= 999);
    }

    #[test]
    fn test_reward_code_format() {
        for _ in 0..100 {
            let code = reward_code();
            let n: u32 = code
                .strip_prefix("REWARD")
                .expect("missing prefix")
                .parse()
                .expect("suffix is not a number");
            assert!(n < 10_000);
        }
    }
}
