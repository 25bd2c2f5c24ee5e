//! Script interpreter.
//!
//! Covers legacy, P2SH and segwit v0 evaluation. Every failure carries the
//! [`ScriptError`] that caused it.

mod checker;
mod encoding;
mod error;
mod flags;
mod interpreter;
mod num;
mod ops;
mod sighash;
mod stack;

pub use checker::{NullSignatureChecker, SignatureChecker, TransactionSignatureChecker};
pub use error::ScriptError;
pub use flags::ScriptFlags;
pub use interpreter::{eval_script, verify_script};
pub use stack::Stack;

/// Which signature hashing rules a script runs under.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SigVersion {
    /// Bare scripts and P2SH redeem scripts.
    Base,
    /// BIP141 witness scripts.
    WitnessV0,
}
