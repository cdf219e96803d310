//! Symmetric [`Cipher`] of tokens stored at rest in cookies.

use std::{num::NonZeroU32, sync::Arc};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use derive_more::{AsRef, Debug, Display, Error, From};
use ring::{
    aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN},
    pbkdf2,
    rand::{SecureRandom as _, SystemRandom},
};
use secrecy::{ExposeSecret as _, SecretString};

/// AES-256-GCM cipher keyed by a secret shared across the application
/// instances.
///
/// Output layout is `base64(nonce ‖ tag ‖ ciphertext)`.
#[derive(Clone, Debug)]
pub struct Cipher {
    /// Key derived from the shared secret.
    #[debug(skip)]
    key: Arc<LessSafeKey>,

    /// Source of nonces.
    #[debug(skip)]
    rng: SystemRandom,
}

impl Cipher {
    /// Salt of the key derivation.
    ///
    /// Fixed, so every instance sharing the secret derives the same key.
    const SALT: &'static [u8] = b"auth-secret-salt";

    /// Number of PBKDF2 iterations of the key derivation.
    const ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    /// Length of an AES-256-GCM authentication tag.
    const TAG_LEN: usize = 16;

    /// Derives a new [`Cipher`] from the provided shared `secret` with
    /// PBKDF2-HMAC-SHA256.
    ///
    /// # Errors
    ///
    /// If the `secret` is empty.
    pub fn derive(secret: &SecretString) -> Result<Self, KeyError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(KeyError::EmptySecret);
        }

        let mut key = [0; 32];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            Self::ITERATIONS,
            Self::SALT,
            secret.as_bytes(),
            &mut key,
        );
        let key = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| KeyError::Unspecified)?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(key)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypts the provided `plaintext` with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// If the system random source or the encryption fails.
    pub fn seal(&self, plaintext: &str) -> Result<Sealed, SealError> {
        let mut nonce = [0; NONCE_LEN];
        self.rng.fill(&mut nonce).map_err(|_| SealError::Random)?;

        let mut body = plaintext.as_bytes().to_vec();
        let tag = self
            .key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(nonce),
                Aad::empty(),
                &mut body,
            )
            .map_err(|_| SealError::Encryption)?;

        let mut out =
            Vec::with_capacity(NONCE_LEN + Self::TAG_LEN + body.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(tag.as_ref());
        out.extend_from_slice(&body);
        Ok(Sealed(STANDARD.encode(out)))
    }

    /// Decrypts the provided `sealed` value.
    ///
    /// [`None`] is returned on any format or authentication failure, so
    /// tampered input is never partially trusted.
    #[must_use]
    pub fn open(&self, sealed: impl AsRef<str>) -> Option<String> {
        let raw = STANDARD.decode(sealed.as_ref()).ok()?;
        if raw.len() < NONCE_LEN + Self::TAG_LEN {
            return None;
        }
        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, body) = rest.split_at(Self::TAG_LEN);

        let nonce = Nonce::try_assume_unique_for_key(nonce).ok()?;
        // `ring` expects the tag right after the ciphertext.
        let mut in_out = Vec::with_capacity(body.len() + tag.len());
        in_out.extend_from_slice(body);
        in_out.extend_from_slice(tag);

        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .ok()?;
        String::from_utf8(plaintext.to_vec()).ok()
    }
}

/// Value encrypted by a [`Cipher`], encoded as standard base64.
#[derive(AsRef, Clone, Debug, Display, Eq, From, PartialEq)]
#[as_ref(str)]
pub struct Sealed(String);

impl Sealed {
    /// Returns the encoded representation of this [`Sealed`] value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Error of deriving a [`Cipher`] key.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum KeyError {
    /// Shared secret is empty.
    #[display("Shared secret must not be empty")]
    EmptySecret,

    /// Key derivation failed.
    #[display("Failed to derive an AES-256-GCM key")]
    Unspecified,
}

/// Error of [`Cipher::seal()`]ing a value.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum SealError {
    /// System random source failed to produce a nonce.
    #[display("Failed to generate a nonce")]
    Random,

    /// Encryption failed.
    #[display("Failed to encrypt a value")]
    Encryption,
}

#[cfg(test)]
mod spec {
    use std::sync::LazyLock;

    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use secrecy::SecretString;

    use super::{Cipher, KeyError, Sealed};

    static CIPHER: LazyLock<Cipher> = LazyLock::new(|| {
        Cipher::derive(&SecretString::from("test-secret")).unwrap()
    });

    #[test]
    fn round_trips() {
        for plaintext in ["a", "eyJhbGciOi.eyJzdWIiOi.sig", "ünïcödé ✓"] {
            let sealed = CIPHER.seal(plaintext).unwrap();

            assert_ne!(sealed.as_ref(), plaintext);
            assert_eq!(CIPHER.open(&sealed).as_deref(), Some(plaintext));
        }
    }

    #[test]
    fn uses_fresh_nonces() {
        let a = CIPHER.seal("token").unwrap();
        let b = CIPHER.seal("token").unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn fails_closed_on_any_flipped_bit() {
        let sealed = CIPHER.seal("access-token").unwrap();
        let raw = STANDARD.decode(sealed.as_ref()).unwrap();

        for byte in 0..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;

                assert_eq!(
                    CIPHER.open(STANDARD.encode(&tampered)),
                    None,
                    "flipped bit {bit} of byte {byte} must be detected",
                );
            }
        }
    }

    #[test]
    fn fails_closed_on_malformed_input() {
        assert_eq!(CIPHER.open(""), None);
        assert_eq!(CIPHER.open("not base64!"), None);
        assert_eq!(CIPHER.open(STANDARD.encode([0; 27])), None);
        assert_eq!(CIPHER.open(STANDARD.encode([0; 64])), None);
    }

    #[test]
    fn rejects_values_sealed_with_another_secret() {
        let other = Cipher::derive(&SecretString::from("other")).unwrap();
        let sealed: Sealed = other.seal("token").unwrap();

        assert_eq!(CIPHER.open(&sealed), None);
    }

    #[test]
    fn derives_same_key_from_same_secret() {
        let again = Cipher::derive(&SecretString::from("test-secret")).unwrap();

        assert_eq!(
            again.open(CIPHER.seal("token").unwrap()).as_deref(),
            Some("token"),
        );
    }

    #[test]
    fn requires_secret() {
        assert!(matches!(
            Cipher::derive(&SecretString::from("")),
            Err(KeyError::EmptySecret),
        ));
    }
}
