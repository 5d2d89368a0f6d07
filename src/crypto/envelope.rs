use crate::{Error, X25519PublicKey};
use prost::Message;

/// On-disk form of one sealed payload.
///
/// Every file written through the store carries its own ephemeral X25519 public
/// key, so files can be decrypted independently of each other.
#[derive(Clone, PartialEq, Message)]
pub struct SealedFile {
    /// Format version, currently always [`SealedFile::VERSION`].
    #[prost(uint32, tag = "1")]
    pub version: u32,
    /// Ephemeral X25519 public key used for this file only.
    #[prost(bytes = "vec", tag = "2")]
    pub ephemeral_public: Vec<u8>,
    /// AES-256-GCM-SIV ciphertext including the authentication tag.
    #[prost(bytes = "vec", tag = "3")]
    pub ciphertext: Vec<u8>,
}

impl SealedFile {
    /// The only format version this crate reads and writes.
    pub const VERSION: u32 = 1;

    /// Size of the AEAD authentication tag appended to every ciphertext.
    pub const TAG_SIZE: usize = 16;

    pub(crate) fn new(ephemeral_public: X25519PublicKey, ciphertext: Vec<u8>) -> Self {
        Self {
            version: Self::VERSION,
            ephemeral_public: ephemeral_public.to_bytes().to_vec(),
            ciphertext,
        }
    }

    /// Serializes the envelope for storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    /// Deserializes and validates an envelope read from storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let sealed = Self::decode(bytes).map_err(|err| Error::Serde(err.to_string()))?;

        if sealed.version != Self::VERSION {
            return Err(Error::Serde(format!(
                "Unsupported envelope version {}",
                sealed.version
            )));
        }

        if sealed.ephemeral_public.len() != 32 {
            return Err(Error::Serde("Invalid ephemeral key length".to_string()));
        }

        if sealed.ciphertext.len() < Self::TAG_SIZE {
            return Err(Error::Serde("Ciphertext is truncated".to_string()));
        }

        Ok(sealed)
    }

    /// The ephemeral public key of a validated envelope.
    pub fn ephemeral_public(&self) -> Result<X25519PublicKey, Error> {
        let bytes: [u8; 32] = self
            .ephemeral_public
            .as_slice()
            .try_into()
            .map_err(|_| Error::Serde("Invalid ephemeral key length".to_string()))?;

        Ok(X25519PublicKey::from(bytes))
    }
}
