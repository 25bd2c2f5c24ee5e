use bitcoin::{
    absolute::LOCK_TIME_THRESHOLD,
    secp256k1::{ecdsa::Signature, Message, PublicKey},
    Sequence, Transaction,
};

use super::{
    sighash::{legacy_signature_hash, segwit_v0_signature_hash, PrecomputedTransactionData},
    SigVersion,
};
use crate::context::verification_context;

const SEQUENCE_LOCKTIME_DISABLE_FLAG: i64 = 1 << 31;
const SEQUENCE_LOCKTIME_TYPE_FLAG: i64 = 1 << 22;
const SEQUENCE_LOCKTIME_MASK: i64 = 0x0000_ffff;

/// Checks the parts of a script that depend on the spending transaction.
///
/// The default methods reject everything, which is what a script evaluated
/// outside of any transaction should see.
pub trait SignatureChecker {
    /// `signature` still carries its trailing hash-type byte.
    fn check_ecdsa_signature(
        &self,
        _signature: &[u8],
        _pubkey: &[u8],
        _script_code: &[u8],
        _sigversion: SigVersion,
    ) -> bool {
        false
    }

    fn check_lock_time(&self, _lock_time: i64) -> bool {
        false
    }

    fn check_sequence(&self, _sequence: i64) -> bool {
        false
    }
}

/// Checker for a script evaluated outside of any transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSignatureChecker;

impl SignatureChecker for NullSignatureChecker {}

/// Checker bound to one input of a decoded transaction.
pub struct TransactionSignatureChecker<'tx> {
    tx: &'tx Transaction,
    input_index: usize,
    amount: u64,
    precomputed: Option<PrecomputedTransactionData>,
}

impl<'tx> TransactionSignatureChecker<'tx> {
    /// `input_index` must be in range for `tx`.
    pub fn new(tx: &'tx Transaction, input_index: usize, amount: u64) -> Self {
        Self {
            tx,
            input_index,
            amount,
            precomputed: PrecomputedTransactionData::for_witness_inputs(tx),
        }
    }

    fn sequence(&self) -> Sequence {
        self.tx.input[self.input_index].sequence
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_ecdsa_signature(
        &self,
        signature: &[u8],
        pubkey: &[u8],
        script_code: &[u8],
        sigversion: SigVersion,
    ) -> bool {
        let Ok(pubkey) = PublicKey::from_slice(pubkey) else {
            return false;
        };
        let Some((&hash_type, der)) = signature.split_last() else {
            return false;
        };
        let hash_type = u32::from(hash_type);

        let sighash = match sigversion {
            SigVersion::Base => {
                legacy_signature_hash(self.tx, self.input_index, script_code, hash_type)
            }
            SigVersion::WitnessV0 => {
                let Some(precomputed) = self.precomputed.as_ref() else {
                    return false;
                };
                segwit_v0_signature_hash(
                    self.tx,
                    precomputed,
                    self.input_index,
                    script_code,
                    self.amount,
                    hash_type,
                )
            }
        };

        let Ok(mut signature) = Signature::from_der_lax(der) else {
            return false;
        };
        // libsecp256k1 only verifies lower-S signatures
        signature.normalize_s();
        let message = Message::from_digest(sighash);
        verification_context()
            .verify_ecdsa(&message, &signature, &pubkey)
            .is_ok()
    }

    fn check_lock_time(&self, lock_time: i64) -> bool {
        let tx_lock_time = i64::from(self.tx.lock_time.to_consensus_u32());
        let threshold = i64::from(LOCK_TIME_THRESHOLD);

        // Height-based and time-based lock times are not comparable.
        if (tx_lock_time < threshold) != (lock_time < threshold) {
            return false;
        }
        if lock_time > tx_lock_time {
            return false;
        }
        // A final input would let the transaction bypass its lock time.
        self.sequence() != Sequence::MAX
    }

    fn check_sequence(&self, sequence: i64) -> bool {
        let tx_sequence = i64::from(self.sequence().to_consensus_u32());

        // Relative lock times apply from version 2 on (BIP68).
        if (self.tx.version.0 as u32) < 2 {
            return false;
        }
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return false;
        }

        let mask = SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK;
        let tx_masked = tx_sequence & mask;
        let masked = sequence & mask;
        if (tx_masked < SEQUENCE_LOCKTIME_TYPE_FLAG) != (masked < SEQUENCE_LOCKTIME_TYPE_FLAG) {
            return false;
        }
        masked <= tx_masked
    }
}
