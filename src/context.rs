//! Process-wide secp256k1 verification context.
//!
//! Creating a context is expensive, so one is built lazily on first use and
//! shared by every later verification. With `external-secp` the global
//! context of the `secp256k1` crate is borrowed instead.

#[cfg(not(feature = "external-secp"))]
use std::sync::OnceLock;

#[cfg(not(feature = "external-secp"))]
use bitcoin::secp256k1::{Secp256k1, VerifyOnly};

#[cfg(not(feature = "external-secp"))]
pub type VerificationContext = Secp256k1<VerifyOnly>;
#[cfg(feature = "external-secp")]
pub type VerificationContext = secp256k1::Secp256k1<secp256k1::All>;

#[cfg(not(feature = "external-secp"))]
static SECP256K1: OnceLock<VerificationContext> = OnceLock::new();

/// Returns the shared context, initializing it on the first call.
#[cfg(not(feature = "external-secp"))]
pub fn verification_context() -> &'static VerificationContext {
    SECP256K1.get_or_init(|| {
        tracing::debug!("initializing secp256k1 verification context");
        Secp256k1::verification_only()
    })
}

/// Returns the `secp256k1` crate's global context.
#[cfg(feature = "external-secp")]
pub fn verification_context() -> &'static VerificationContext {
    &**secp256k1::global::SECP256K1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_shared() {
        let first = verification_context() as *const VerificationContext;
        let second = verification_context() as *const VerificationContext;
        assert_eq!(first, second);
    }
}
