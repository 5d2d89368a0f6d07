//! Sealing of payloads to an X25519 recipient.
//!
//! Each payload is encrypted under a fresh ephemeral keypair: the ephemeral
//! secret is combined with the recipient's public key, the shared secret is run
//! through HKDF-SHA256 to obtain a one-time key and nonce, and the payload is
//! encrypted with AES-256-GCM-SIV. Only the holder of the matching [`Identity`]
//! can recover the key.

mod envelope;
pub use envelope::SealedFile;

use crate::{Error, X25519PublicKey, X25519Secret};
use aes_gcm_siv::aead::{Aead, Payload};
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hkdf::Hkdf;
use rand::TryRngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use x25519_dalek::SharedSecret;
use zeroize::{Zeroize, Zeroizing};

const IDENTITY_PREFIX: &str = "CHAT-DIGEST-IDENTITY-";
const RECIPIENT_PREFIX: &str = "CHAT-DIGEST-RECIPIENT-";

const FILE_KEY_INFO: &[u8] = b"chat-digest-file-key";
const FILE_NONCE_INFO: &[u8] = b"chat-digest-file-nonce";
const ENVELOPE_AAD: &[u8] = b"chat-digest-sealed-v1";

const NONCE_SIZE: usize = 12;

/// Fills a 32-byte seed from the operating system RNG.
pub fn generate_random_seed() -> Result<[u8; 32], Error> {
    let mut seed = [0u8; 32];
    OsRng.try_fill_bytes(&mut seed).map_err(|_| Error::Random)?;
    Ok(seed)
}

/// The private half of the archive keypair. Decrypts everything sealed to its
/// [`Recipient`].
pub struct Identity {
    secret: X25519Secret,
}

impl Identity {
    /// Generates a fresh identity.
    pub fn generate() -> Result<Self, Error> {
        let seed = generate_random_seed()?;
        Ok(Self {
            secret: X25519Secret::from(seed),
        })
    }

    /// The public half, used for encryption.
    pub fn recipient(&self) -> Recipient {
        Recipient(self.secret.public_key())
    }

    /// Text form of the identity, suitable for an environment variable.
    pub fn to_encoded(&self) -> Zeroizing<String> {
        let mut encoded = Zeroizing::new(String::from(IDENTITY_PREFIX));
        STANDARD.encode_string(self.secret.as_bytes(), &mut encoded);
        encoded
    }

    /// Opens a payload produced by [`Recipient::seal`] for this identity.
    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, Error> {
        let sealed = SealedFile::from_bytes(sealed)?;
        let ephemeral_public = sealed.ephemeral_public()?;
        let recipient_public = self.secret.public_key();

        let shared = self.secret.dh(&ephemeral_public);
        let (key, nonce) = derive_file_key(shared, &ephemeral_public, &recipient_public)?;

        let cipher = Aes256GcmSiv::new_from_slice(key.as_slice())
            .map_err(|err| Error::Crypto(err.to_string()))?;

        let plaintext = cipher.decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &sealed.ciphertext,
                aad: ENVELOPE_AAD,
            },
        )?;

        Ok(plaintext)
    }
}

impl FromStr for Identity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .trim()
            .strip_prefix(IDENTITY_PREFIX)
            .ok_or_else(|| Error::Serde(format!("Identity must start with {IDENTITY_PREFIX}")))?;

        let seed = decode_key(encoded)?;
        Ok(Self {
            secret: X25519Secret::from(seed),
        })
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("recipient", &self.recipient())
            .finish_non_exhaustive()
    }
}

/// The public half of the archive keypair. Anything sealed to it can only be
/// opened by the matching [`Identity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Recipient(X25519PublicKey);

impl Recipient {
    /// The underlying X25519 public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.0
    }

    /// Encrypts `plaintext` so that only the matching identity can read it.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let ephemeral = X25519Secret::from(generate_random_seed()?);
        let ephemeral_public = ephemeral.public_key();

        let shared = ephemeral.dh(&self.0);
        let (key, nonce) = derive_file_key(shared, &ephemeral_public, &self.0)?;

        let cipher = Aes256GcmSiv::new_from_slice(key.as_slice())
            .map_err(|err| Error::Crypto(err.to_string()))?;

        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: ENVELOPE_AAD,
                },
            )
            .map_err(|_| Error::Crypto("Payload encryption failed".to_string()))?;

        Ok(SealedFile::new(ephemeral_public, ciphertext).to_bytes())
    }
}

impl FromStr for Recipient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoded = s
            .trim()
            .strip_prefix(RECIPIENT_PREFIX)
            .ok_or_else(|| Error::Serde(format!("Recipient must start with {RECIPIENT_PREFIX}")))?;

        Ok(Self(X25519PublicKey::from(decode_key(encoded)?)))
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RECIPIENT_PREFIX}{}", STANDARD.encode(self.0.as_bytes()))
    }
}

fn decode_key(encoded: &str) -> Result<[u8; 32], Error> {
    let bytes = Zeroizing::new(
        STANDARD
            .decode(encoded)
            .map_err(|err| Error::Serde(err.to_string()))?,
    );

    bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::Serde(format!("Expected 32 key bytes, got {}", bytes.len())))
}

/// Derives the one-time file key and nonce from an X25519 shared secret.
///
/// Both public keys are bound into the HKDF salt, so a ciphertext cannot be
/// replayed under a different recipient.
fn derive_file_key(
    mut shared: SharedSecret,
    ephemeral_public: &X25519PublicKey,
    recipient_public: &X25519PublicKey,
) -> Result<(Zeroizing<[u8; 32]>, [u8; NONCE_SIZE]), Error> {
    if !shared.was_contributory() {
        return Err(Error::Crypto("Non-contributory key exchange".to_string()));
    }

    let mut salt = [0u8; 64];
    salt[0..32].copy_from_slice(ephemeral_public.as_bytes());
    salt[32..64].copy_from_slice(recipient_public.as_bytes());

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared.as_bytes());
    shared.zeroize();

    let mut key = Zeroizing::new([0u8; 32]);
    hkdf.expand(FILE_KEY_INFO, key.as_mut_slice())
        .map_err(|_| Error::Crypto("HKDF expansion failed for file key".to_string()))?;

    let mut nonce = [0u8; NONCE_SIZE];
    hkdf.expand(FILE_NONCE_INFO, &mut nonce)
        .map_err(|_| Error::Crypto("HKDF expansion failed for file nonce".to_string()))?;

    Ok((key, nonce))
}
