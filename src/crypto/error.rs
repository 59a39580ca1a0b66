#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("could not verify signature: {0}")]
    Verify(#[from] ed25519_dalek::ed25519::Error),
    #[error("malformed key material")]
    BadKeyMaterial,
}
