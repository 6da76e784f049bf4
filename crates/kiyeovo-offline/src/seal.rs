//! Translates between [`kiyeovo_crypto::rsa::Sealed`] and the flattened
//! `(message_type, content, encrypted_aes_key, aes_iv)` fields an
//! [`kiyeovo_types::offline_direct::OfflineMessage`] actually stores on the
//! wire (spec §4.3).

use kiyeovo_crypto::rsa::{seal, unseal, Sealed};
use kiyeovo_crypto::{CryptoError, Result};
use kiyeovo_types::offline_direct::OfflineMessageType;
use rsa::{RsaPrivateKey, RsaPublicKey};

pub struct SealedFields {
    pub message_type: OfflineMessageType,
    pub content: Vec<u8>,
    pub encrypted_aes_key: Option<Vec<u8>>,
    pub aes_iv: Option<[u8; 12]>,
}

pub fn seal_content(public_key: &RsaPublicKey, plaintext: &[u8]) -> Result<SealedFields> {
    match seal(public_key, plaintext)? {
        Sealed::Encrypted { ciphertext } => Ok(SealedFields {
            message_type: OfflineMessageType::Encrypted,
            content: ciphertext,
            encrypted_aes_key: None,
            aes_iv: None,
        }),
        Sealed::Hybrid {
            encrypted_aes_key,
            aes_iv,
            ciphertext,
        } => Ok(SealedFields {
            message_type: OfflineMessageType::Hybrid,
            content: ciphertext,
            encrypted_aes_key: Some(encrypted_aes_key),
            aes_iv: Some(aes_iv),
        }),
    }
}

pub fn unseal_content(
    private_key: &RsaPrivateKey,
    message_type: OfflineMessageType,
    content: &[u8],
    encrypted_aes_key: Option<&[u8]>,
    aes_iv: Option<&[u8; 12]>,
) -> Result<Vec<u8>> {
    let sealed = match message_type {
        OfflineMessageType::Encrypted => Sealed::Encrypted {
            ciphertext: content.to_vec(),
        },
        OfflineMessageType::Hybrid => Sealed::Hybrid {
            encrypted_aes_key: encrypted_aes_key
                .ok_or_else(|| CryptoError::InvalidInput("hybrid message missing encrypted_aes_key".into()))?
                .to_vec(),
            aes_iv: *aes_iv.ok_or_else(|| CryptoError::InvalidInput("hybrid message missing aes_iv".into()))?,
            ciphertext: content.to_vec(),
        },
        OfflineMessageType::Plain => {
            return Err(CryptoError::InvalidInput("direct message content is never plain".into()))
        }
    };
    unseal(private_key, &sealed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiyeovo_crypto::rsa::{RsaKeyPair, MAX_OAEP_PLAINTEXT_3072};

    #[test]
    fn test_small_payload_roundtrips_as_encrypted() {
        let kp = RsaKeyPair::generate().expect("keygen");
        let sealed = seal_content(&kp.public_key, b"hi").expect("seal");
        assert_eq!(sealed.message_type, OfflineMessageType::Encrypted);
        let plaintext = unseal_content(
            &kp.private_key,
            sealed.message_type,
            &sealed.content,
            sealed.encrypted_aes_key.as_deref(),
            sealed.aes_iv.as_ref(),
        )
        .expect("unseal");
        assert_eq!(plaintext, b"hi");
    }

    #[test]
    fn test_large_payload_roundtrips_as_hybrid() {
        let kp = RsaKeyPair::generate().expect("keygen");
        let big = vec![0x11u8; MAX_OAEP_PLAINTEXT_3072 + 50];
        let sealed = seal_content(&kp.public_key, &big).expect("seal");
        assert_eq!(sealed.message_type, OfflineMessageType::Hybrid);
        let plaintext = unseal_content(
            &kp.private_key,
            sealed.message_type,
            &sealed.content,
            sealed.encrypted_aes_key.as_deref(),
            sealed.aes_iv.as_ref(),
        )
        .expect("unseal");
        assert_eq!(plaintext, big);
    }
}
