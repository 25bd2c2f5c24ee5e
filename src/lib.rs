//! Consensus verification boundary for Bitcoin transactions.
//!
//! Given a serialized transaction, the locking script of the output one of
//! its inputs spends and that output's amount, [`verify_script`] decodes the
//! transaction under strict bounds checking, evaluates the input against the
//! locking script and reports a [`VerifyResult`].
//!
//! Nothing is retained between calls. The only shared state is the lazily
//! created secp256k1 verification context.
//!
//! [`HashNumber`] provides the 256-bit arithmetic used for proof-of-work
//! targets.

mod context;
pub mod decode;
pub mod ffi;
pub mod flags;
pub mod hash_number;
pub mod reader;
pub mod result;
pub mod script;

pub use decode::{decode_transaction, DecodeError};
pub use flags::*;
pub use hash_number::{CompactTargetError, HashNumber};
pub use result::{script_error_code_to_verify_result, script_error_to_verify_result, VerifyResult};
pub use script::ScriptError;

use bitcoin::consensus;

use crate::script::TransactionSignatureChecker;

/// Returns the version of this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Arguments that cannot be verified at all.
///
/// These never overlap with a [`VerifyResult`]; the C ABI reports them as
/// negative codes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum InvalidArgument {
    /// Null transaction buffer with a nonzero length.
    #[error("transaction buffer is null")]
    Transaction,
    /// Null prevout script buffer with a nonzero length.
    #[error("prevout script buffer is null")]
    PrevoutScript,
    /// The spent amount does not fit a signed 64-bit value.
    #[error("prevout value exceeds the signed 64-bit range")]
    Value,
}

impl InvalidArgument {
    pub fn code(self) -> i32 {
        match self {
            InvalidArgument::Transaction => -1,
            InvalidArgument::PrevoutScript => -2,
            InvalidArgument::Value => -3,
        }
    }
}

/// Verifies input `input_index` of `transaction` against the output it
/// spends, described by `prevout_script` and `prevout_value`.
///
/// `flags` is a set of `VERIFY_FLAGS_*` bits; undefined bits are ignored.
/// Every consensus outcome, including a malformed transaction, is reported
/// through `Ok`. `Err` is reserved for unusable arguments.
pub fn verify_script(
    transaction: &[u8],
    prevout_script: &[u8],
    prevout_value: u64,
    input_index: u32,
    flags: u32,
) -> Result<VerifyResult, InvalidArgument> {
    if i64::try_from(prevout_value).is_err() {
        return Err(InvalidArgument::Value);
    }

    let tx = match decode_transaction(transaction) {
        Ok(tx) => tx,
        Err(err) => {
            tracing::debug!(%err, "rejecting undecodable transaction");
            return Ok(VerifyResult::TxInvalid);
        }
    };

    let index = input_index as usize;
    let Some(input) = tx.input.get(index) else {
        tracing::debug!(input_index, inputs = tx.input.len(), "input index out of range");
        return Ok(VerifyResult::TxInputInvalid);
    };

    let canonical_len = consensus::serialize(&tx).len();
    if canonical_len != transaction.len() {
        tracing::debug!(
            canonical_len,
            declared_len = transaction.len(),
            "transaction size mismatch"
        );
        return Ok(VerifyResult::TxSizeInvalid);
    }

    let script_flags = verify_flags_to_script_flags(flags);
    let checker = TransactionSignatureChecker::new(&tx, index, prevout_value);
    let outcome = script::verify_script(
        input.script_sig.as_bytes(),
        prevout_script,
        &input.witness,
        script_flags,
        &checker,
    );

    let error = match outcome {
        Ok(()) => ScriptError::Ok,
        Err(err) => err,
    };
    let result = script_error_to_verify_result(error);
    tracing::trace!(input_index, flags, %result, "script verified");
    Ok(result)
}
