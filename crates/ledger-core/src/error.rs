use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// No nonce below the attempt bound produced a hash meeting the difficulty.
    #[error("failed to mine block {index}: nonce space exhausted after {attempts} attempts")]
    NonceSpaceExhausted { index: u64, attempts: u64 },

    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("system clock error: {0}")]
    Clock(String),
}
