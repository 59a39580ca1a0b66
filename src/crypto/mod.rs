//! Digests and ContentObject signatures.
//!
//! Consumers only ever verify; producers (applications answering filter
//! upcalls, test rigs) also sign. Keys are Ed25519 and digests SHA2-256
//! throughout.

use ed25519_dalek::ed25519::signature::Signer;
use rand::rngs::OsRng;

pub use ed25519_dalek::{Signature, SigningKey, VerifyingKey};

mod error;
pub use error::CryptoError;

use crate::codec::{encode, tag, KeyLocator, ParsedContent};
use crate::definitions::{ContentType, Digest};

/// Calculate the SHA2-256 of a piece of arbitrary data
pub fn sha256(content: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    sha2::Sha256::digest(content).into()
}

/// The digest a publisher is known by: the SHA2-256 of its public key
pub fn key_digest(key: &VerifyingKey) -> Digest {
    sha256(key.as_bytes())
}

/// Generate a fresh signing key
pub fn generate_signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// Build and sign a complete ContentObject.
///
/// `name` must be an encoded Name element. The signature covers everything
/// from the start of the name through the end of the content.
pub fn sign_content(
    signing_key: &SigningKey,
    name: &[u8],
    content_type: ContentType,
    locator: Option<&KeyLocator<'_>>,
    payload: &[u8],
) -> Vec<u8> {
    let publisher = key_digest(&signing_key.verifying_key());

    let mut value = Vec::with_capacity(name.len() + payload.len() + 160);
    value.extend_from_slice(name);

    let mut signed_info = Vec::with_capacity(80);
    encode::write_tlv(&mut signed_info, tag::PUBLISHER_DIGEST, &publisher);
    encode::write_number(&mut signed_info, tag::TYPE, content_type.code());
    if let Some(locator) = locator {
        encode::write_key_locator(&mut signed_info, locator);
    }
    encode::write_tlv(&mut value, tag::SIGNED_INFO, &signed_info);
    encode::write_tlv(&mut value, tag::CONTENT, payload);

    let signature = signing_key.sign(&value);
    encode::write_tlv(&mut value, tag::SIGNATURE, &signature.to_bytes());

    let mut msg = Vec::with_capacity(value.len() + 4);
    encode::write_header(&mut msg, tag::CONTENT_OBJECT, value.len());
    msg.extend_from_slice(&value);
    msg
}

/// Verify a parsed ContentObject against a publisher key
pub fn verify_content(
    msg: &[u8],
    parsed: &ParsedContent,
    key: &VerifyingKey,
) -> Result<(), CryptoError> {
    let raw: &[u8; 64] = msg[parsed.signature.clone()]
        .try_into()
        .map_err(|_| CryptoError::BadKeyMaterial)?;
    let signature = Signature::from_bytes(raw);
    key.verify_strict(&msg[parsed.signed.clone()], &signature)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::{name_from_uri, parse_content};

    #[test]
    fn sign_then_verify() {
        let key = generate_signing_key();
        let msg = sign_content(
            &key,
            &name_from_uri("/a/b"),
            ContentType::Data,
            None,
            b"hello world",
        );
        let parsed = parse_content(&msg).unwrap();
        verify_content(&msg, &parsed, &key.verifying_key()).unwrap();
    }

    #[test]
    fn tampering_breaks_verification() {
        let key = generate_signing_key();
        let mut msg = sign_content(
            &key,
            &name_from_uri("/a/b"),
            ContentType::Data,
            None,
            b"hello world",
        );
        let parsed = parse_content(&msg).unwrap();
        msg[parsed.content.start] ^= 1;
        assert!(verify_content(&msg, &parsed, &key.verifying_key()).is_err());
    }

    #[test]
    fn wrong_key_fails() {
        let key = generate_signing_key();
        let msg = sign_content(&key, &name_from_uri("/a"), ContentType::Data, None, b"x");
        let parsed = parse_content(&msg).unwrap();
        let other = generate_signing_key();
        assert!(verify_content(&msg, &parsed, &other.verifying_key()).is_err());
    }
}
