use crate::error::{LedgerError, Result};
use crate::utils::{generate_probable_prime, sha256_digest, sha256_hex};
use log::{debug, warn};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;

/// Fixed public exponent
pub const PUBLIC_EXPONENT: u32 = 65537;
/// Size of each of the two primes; the modulus is twice this
pub const PRIME_BITS: u64 = 400;
/// Hex characters kept from the identity digest
pub const CLIENT_ID_LEN: usize = 40;

// The modulus must exceed every SHA-256 digest or signatures stop round-tripping
const DIGEST_BITS: u64 = 256;
const KEYGEN_ATTEMPTS: usize = 5;

/// Textbook RSA keypair bound to a client identity.
///
/// Signatures are the raw SHA-256 digest raised to the private exponent, with
/// no padding. That makes them malleable and existentially forgeable; this is
/// a demonstration primitive, not a production signature scheme.
#[derive(Clone)]
pub struct Wallet {
    public_exponent: BigUint,
    private_exponent: BigUint,
    modulus: BigUint,
}

impl Wallet {
    /// Generate a fresh keypair, drawing new primes when 65537 has no inverse
    pub fn new() -> Result<Wallet> {
        for attempt in 1..=KEYGEN_ATTEMPTS {
            let p = generate_probable_prime(PRIME_BITS)?;
            let q = generate_probable_prime(PRIME_BITS)?;
            if p == q {
                continue;
            }
            match Self::from_primes(&p, &q) {
                Ok(wallet) => {
                    debug!("Generated keypair on attempt {attempt}");
                    return Ok(wallet);
                }
                Err(e) => warn!("Keypair attempt {attempt} failed: {e}"),
            }
        }
        Err(LedgerError::Crypto(format!(
            "Failed to generate a keypair after {KEYGEN_ATTEMPTS} attempts"
        )))
    }

    /// Build a keypair from two primes. Fails when the public exponent is not
    /// invertible modulo the totient.
    pub fn from_primes(p: &BigUint, q: &BigUint) -> Result<Wallet> {
        let one = BigUint::one();
        if p <= &one || q <= &one {
            return Err(LedgerError::Crypto("Primes must be greater than one".to_string()));
        }

        let modulus = p * q;
        let totient = (p - &one) * (q - &one);
        let public_exponent = BigUint::from(PUBLIC_EXPONENT);
        let private_exponent = public_exponent.modinv(&totient).ok_or_else(|| {
            LedgerError::Crypto(format!(
                "Public exponent {PUBLIC_EXPONENT} has no inverse modulo the totient"
            ))
        })?;

        if modulus.bits() <= DIGEST_BITS {
            return Err(LedgerError::Crypto(format!(
                "Modulus of {} bits is too small to sign {DIGEST_BITS}-bit digests",
                modulus.bits()
            )));
        }

        Ok(Wallet {
            public_exponent,
            private_exponent,
            modulus,
        })
    }

    pub fn get_public_key_e(&self) -> String {
        self.public_exponent.to_string()
    }

    pub fn get_public_key_n(&self) -> String {
        self.modulus.to_string()
    }

    pub fn get_client_id(&self) -> String {
        derive_identity(&self.get_public_key_e(), &self.get_public_key_n())
    }

    /// Sign a message: digest^d mod n, as a decimal string
    pub fn sign(&self, message: &str) -> String {
        message_digest(message)
            .modpow(&self.private_exponent, &self.modulus)
            .to_string()
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("public_exponent", &self.public_exponent)
            .field("modulus", &self.modulus)
            .finish_non_exhaustive()
    }
}

/// SHA-256 of the message read as a non-negative big-endian integer
pub fn message_digest(message: &str) -> BigUint {
    BigUint::from_bytes_be(sha256_digest(message.as_bytes()).as_slice())
}

/// Check `signature^e mod n == digest(message)` using only the supplied key.
/// Malformed numbers and a zero modulus simply fail verification.
pub fn verify_signature(message: &str, signature: &str, public_key_e: &str, public_key_n: &str) -> bool {
    let parsed = (
        signature.trim().parse::<BigUint>(),
        public_key_e.trim().parse::<BigUint>(),
        public_key_n.trim().parse::<BigUint>(),
    );
    let (signature, exponent, modulus) = match parsed {
        (Ok(s), Ok(e), Ok(n)) => (s, e, n),
        _ => {
            debug!("Signature or public key is not a decimal integer");
            return false;
        }
    };
    if modulus.is_zero() {
        return false;
    }

    signature.modpow(&exponent, &modulus) == message_digest(message)
}

/// Identity string: hex digest of `e ‖ n` (decimal), truncated
pub fn derive_identity(public_key_e: &str, public_key_n: &str) -> String {
    let mut id = sha256_hex(format!("{public_key_e}{public_key_n}").as_bytes());
    id.truncate(CLIENT_ID_LEN);
    id
}
