use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use ring::digest::{Context, SHA256};

use crate::error::{LedgerError, Result};
use data_encoding::HEXLOWER;
use std::time::{SystemTime, UNIX_EPOCH};

// Trial divisors checked before any Miller-Rabin round
const SMALL_PRIMES: [u32; 25] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
];

/// Miller-Rabin rounds used for key generation primes
pub const PRIMALITY_ROUNDS: usize = 40;

pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_millis();

    if duration > i64::MAX as u128 {
        return Err(LedgerError::Crypto("Timestamp overflow".to_string()));
    }

    Ok(duration as i64)
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// SHA-256 of `data` as lowercase hex, two characters per byte
pub fn sha256_hex(data: &[u8]) -> String {
    HEXLOWER.encode(sha256_digest(data).as_slice())
}

/// Probabilistic primality test: trial division by small primes followed by
/// `rounds` Miller-Rabin witnesses drawn uniformly from `[2, n - 1)`.
pub fn is_probable_prime(candidate: &BigUint, rounds: usize) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    if candidate < &two {
        return false;
    }

    for &small in SMALL_PRIMES.iter() {
        let small = BigUint::from(small);
        if *candidate == small {
            return true;
        }
        if (candidate % &small).is_zero() {
            return false;
        }
    }

    // candidate - 1 = d * 2^s with d odd
    let n_minus_one = candidate - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    let mut rng = rand::thread_rng();
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, candidate);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, candidate);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Draw random odd integers with the top bit set until one passes
/// `is_probable_prime`.
pub fn generate_probable_prime(bits: u64) -> Result<BigUint> {
    if bits < 8 {
        return Err(LedgerError::Crypto(format!(
            "Prime size of {bits} bits is too small"
        )));
    }

    let mut rng = rand::thread_rng();
    let top_bit = BigUint::one() << (bits - 1);
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate |= &top_bit;
        candidate |= BigUint::one();
        if is_probable_prime(&candidate, PRIMALITY_ROUNDS) {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha256_hex_is_zero_padded() {
        let hex = sha256_hex(b"00000000");
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_small_primes_and_composites() {
        for p in [2u32, 3, 5, 97, 101, 65537, 7919] {
            assert!(is_probable_prime(&BigUint::from(p), 20), "{p} is prime");
        }
        for c in [0u32, 1, 4, 9, 91, 561, 1105, 65535, 7917] {
            assert!(!is_probable_prime(&BigUint::from(c), 20), "{c} is composite");
        }
    }

    #[test]
    fn test_large_known_prime() {
        // 2^127 - 1 is a Mersenne prime
        let m127 = (BigUint::one() << 127u32) - BigUint::one();
        assert!(is_probable_prime(&m127, PRIMALITY_ROUNDS));
        // 2^128 + 1 is divisible by 59649589127497217
        let f7 = (BigUint::one() << 128u32) + BigUint::one();
        assert!(!is_probable_prime(&f7, PRIMALITY_ROUNDS));
    }

    #[test]
    fn test_generated_prime_has_requested_size() {
        let prime = generate_probable_prime(128).unwrap();
        assert_eq!(prime.bits(), 128);
        assert!(is_probable_prime(&prime, PRIMALITY_ROUNDS));
    }

    #[test]
    fn test_tiny_prime_size_rejected() {
        assert!(generate_probable_prime(4).is_err());
    }

    #[test]
    fn test_current_timestamp_is_positive() {
        assert!(current_timestamp().unwrap() > 0);
    }
}
