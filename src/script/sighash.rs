//! Signature hashing for legacy and segwit v0 (BIP143) inputs.
//!
//! The hash type is kept as the raw byte taken from the signature, so
//! undefined types hash exactly the way Bitcoin Core hashes them.

use bitcoin::{
    consensus::{self, encode::VarInt},
    hashes::{sha256d, Hash, HashEngine},
    Transaction,
};

use super::ops::{count_code_separators, strip_code_separators};

const SIGHASH_NONE: u32 = 0x02;
const SIGHASH_SINGLE: u32 = 0x03;
const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Result of hashing with `SIGHASH_SINGLE` and no matching output.
const UINT256_ONE: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

/// Transaction-wide BIP143 midstate hashes, computed once per verification.
#[derive(Debug, Clone)]
pub struct PrecomputedTransactionData {
    hash_prevouts: sha256d::Hash,
    hash_sequence: sha256d::Hash,
    hash_outputs: sha256d::Hash,
}

impl PrecomputedTransactionData {
    pub fn new(tx: &Transaction) -> Self {
        Self {
            hash_prevouts: hash_serialized(tx.input.iter().map(|input| &input.previous_output)),
            hash_sequence: hash_serialized(tx.input.iter().map(|input| &input.sequence)),
            hash_outputs: hash_serialized(tx.output.iter()),
        }
    }

    /// Only built when some input carries a witness.
    pub fn for_witness_inputs(tx: &Transaction) -> Option<Self> {
        tx.input
            .iter()
            .any(|input| !input.witness.is_empty())
            .then(|| Self::new(tx))
    }
}

/// Legacy (pre-segwit) signature hash of input `input_index`.
pub fn legacy_signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    hash_type: u32,
) -> [u8; 32] {
    let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;
    let hash_single = hash_type & 0x1f == SIGHASH_SINGLE;
    let hash_none = hash_type & 0x1f == SIGHASH_NONE;

    if input_index >= tx.input.len() || (hash_single && input_index >= tx.output.len()) {
        return UINT256_ONE;
    }

    let mut engine = sha256d::Hash::engine();
    engine.input(&consensus::serialize(&tx.version));

    let inputs: Vec<usize> = if anyone_can_pay {
        vec![input_index]
    } else {
        (0..tx.input.len()).collect()
    };
    engine.input(&consensus::serialize(&VarInt(inputs.len() as u64)));
    for idx in inputs {
        let input = &tx.input[idx];
        engine.input(&consensus::serialize(&input.previous_output));
        if idx == input_index {
            // The length prefix counts separators even past a malformed push.
            let declared = script_code.len() - count_code_separators(script_code);
            engine.input(&consensus::serialize(&VarInt(declared as u64)));
            engine.input(&strip_code_separators(script_code));
        } else {
            engine.input(&[0x00]);
        }
        if idx != input_index && (hash_single || hash_none) {
            engine.input(&0u32.to_le_bytes());
        } else {
            engine.input(&consensus::serialize(&input.sequence));
        }
    }

    let output_count = if hash_none {
        0
    } else if hash_single {
        input_index + 1
    } else {
        tx.output.len()
    };
    engine.input(&consensus::serialize(&VarInt(output_count as u64)));
    for (idx, output) in tx.output.iter().take(output_count).enumerate() {
        if hash_single && idx != input_index {
            // null output: value -1 and an empty script
            engine.input(&u64::MAX.to_le_bytes());
            engine.input(&[0x00]);
        } else {
            engine.input(&consensus::serialize(output));
        }
    }

    engine.input(&consensus::serialize(&tx.lock_time));
    engine.input(&hash_type.to_le_bytes());
    sha256d::Hash::from_engine(engine).to_byte_array()
}

/// BIP143 signature hash of input `input_index` spending `amount`.
pub fn segwit_v0_signature_hash(
    tx: &Transaction,
    precomputed: &PrecomputedTransactionData,
    input_index: usize,
    script_code: &[u8],
    amount: u64,
    hash_type: u32,
) -> [u8; 32] {
    let anyone_can_pay = hash_type & SIGHASH_ANYONECANPAY != 0;
    let base = hash_type & 0x1f;
    let zero = sha256d::Hash::all_zeros();

    let hash_prevouts = if anyone_can_pay {
        zero
    } else {
        precomputed.hash_prevouts
    };
    let hash_sequence = if !anyone_can_pay && base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        precomputed.hash_sequence
    } else {
        zero
    };
    let hash_outputs = if base != SIGHASH_SINGLE && base != SIGHASH_NONE {
        precomputed.hash_outputs
    } else if base == SIGHASH_SINGLE && input_index < tx.output.len() {
        sha256d::Hash::hash(&consensus::serialize(&tx.output[input_index]))
    } else {
        zero
    };

    let input = &tx.input[input_index];
    let mut engine = sha256d::Hash::engine();
    engine.input(&consensus::serialize(&tx.version));
    engine.input(hash_prevouts.as_byte_array());
    engine.input(hash_sequence.as_byte_array());
    engine.input(&consensus::serialize(&input.previous_output));
    engine.input(&consensus::serialize(&VarInt(script_code.len() as u64)));
    engine.input(script_code);
    engine.input(&amount.to_le_bytes());
    engine.input(&consensus::serialize(&input.sequence));
    engine.input(hash_outputs.as_byte_array());
    engine.input(&consensus::serialize(&tx.lock_time));
    engine.input(&hash_type.to_le_bytes());
    sha256d::Hash::from_engine(engine).to_byte_array()
}

fn hash_serialized<'a, I, T>(items: I) -> sha256d::Hash
where
    I: IntoIterator<Item = &'a T>,
    T: consensus::Encodable + 'a,
{
    let mut engine = sha256d::Hash::engine();
    for item in items {
        engine.input(&consensus::serialize(item));
    }
    sha256d::Hash::from_engine(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{
        absolute::LockTime, hex::FromHex, sighash::SighashCache, transaction::Version, Amount,
        OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Txid, Witness,
    };

    fn two_in_one_out() -> Transaction {
        Transaction {
            version: Version(1),
            lock_time: LockTime::ZERO,
            input: (0..2u8)
                .map(|n| TxIn {
                    previous_output: OutPoint {
                        txid: Txid::from_byte_array([n; 32]),
                        vout: u32::from(n),
                    },
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence(0xffff_fff0 + u32::from(n)),
                    witness: Witness::new(),
                })
                .collect(),
            output: vec![TxOut {
                value: Amount::from_sat(5_000),
                script_pubkey: ScriptBuf::from_bytes(vec![0x51]),
            }],
        }
    }

    #[test]
    fn legacy_matches_library_for_standard_types() {
        let tx = two_in_one_out();
        let script = ScriptBuf::from_bytes(vec![0x76, 0xa9, 0x88, 0xac]);
        let cache = SighashCache::new(&tx);
        for hash_type in [0x01u32, 0x02, 0x81, 0x82] {
            let ours = legacy_signature_hash(&tx, 1, script.as_bytes(), hash_type);
            let theirs = cache
                .legacy_signature_hash(1, &script, hash_type)
                .unwrap()
                .to_byte_array();
            assert_eq!(ours, theirs, "hash type {hash_type:#x}");
        }
    }

    #[test]
    fn sighash_single_without_output_is_one() {
        let tx = two_in_one_out();
        let hash = legacy_signature_hash(&tx, 1, &[0x51], 0x03);
        assert_eq!(hash, UINT256_ONE);
        let hash = legacy_signature_hash(&tx, 1, &[0x51], 0x83);
        assert_eq!(hash, UINT256_ONE);
        assert_ne!(legacy_signature_hash(&tx, 0, &[0x51], 0x03), UINT256_ONE);
    }

    #[test]
    fn legacy_ignores_code_separators() {
        let tx = two_in_one_out();
        let with = legacy_signature_hash(&tx, 0, &[0x51, 0xab, 0xac], 0x01);
        let without = legacy_signature_hash(&tx, 0, &[0x51, 0xac], 0x01);
        assert_eq!(with, without);
    }

    #[test]
    fn bip143_native_p2wpkh_vector() {
        // BIP143 "Native P2WPKH" example, second input.
        let unsigned = Vec::<u8>::from_hex("0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000").unwrap();
        let tx: Transaction = consensus::deserialize(&unsigned).unwrap();
        let script_code = Vec::<u8>::from_hex("76a9141d0f172a0ecb48aee1be1f2687d2963ae33f71a188ac").unwrap();
        let precomputed = PrecomputedTransactionData::new(&tx);
        let hash = segwit_v0_signature_hash(&tx, &precomputed, 1, &script_code, 600_000_000, 0x01);
        let expected = Vec::<u8>::from_hex("c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670").unwrap();
        assert_eq!(hash.to_vec(), expected);
    }

    #[test]
    fn precompute_only_for_witness_spends() {
        let mut tx = two_in_one_out();
        assert!(PrecomputedTransactionData::for_witness_inputs(&tx).is_none());
        tx.input[1].witness = Witness::from(vec![vec![0x01]]);
        assert!(PrecomputedTransactionData::for_witness_inputs(&tx).is_some());
    }
}
