//! Field-by-field transaction decoding on top of [`TxInputStream`].
//!
//! The layout follows Bitcoin Core's `UnserializeTransaction`, including the
//! extended (witness) format marker. Trailing bytes are left in the stream;
//! callers detect them by comparing the canonical size against the input.

use bitcoin::{
    absolute::LockTime,
    hashes::Hash,
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};

use crate::reader::{ReadError, TxInputStream};

/// Smallest possible serialized input: outpoint, empty script, sequence.
const MIN_TXIN_SIZE: usize = 32 + 4 + 1 + 4;
/// Smallest possible serialized output: value and empty script.
const MIN_TXOUT_SIZE: usize = 8 + 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("superfluous witness record")]
    SuperfluousWitnessRecord,
    #[error("unknown transaction optional data (flags {0:#04x})")]
    UnknownOptionalData(u8),
}

/// Decodes a transaction from `bytes`, ignoring anything after the lock time.
pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, DecodeError> {
    let mut stream = TxInputStream::new(bytes);
    let result = read_transaction(&mut stream);
    if let Err(ref err) = result {
        tracing::trace!(%err, len = bytes.len(), "transaction decode failed");
    }
    result
}

fn read_transaction(stream: &mut TxInputStream<'_>) -> Result<Transaction, DecodeError> {
    let version = Version(stream.read_i32_le()?);

    let mut flags = 0u8;
    let mut input = read_inputs(stream)?;
    let mut output = Vec::new();
    if input.is_empty() {
        flags = stream.read_u8()?;
        if flags != 0 {
            input = read_inputs(stream)?;
            output = read_outputs(stream)?;
        }
    } else {
        output = read_outputs(stream)?;
    }

    if flags & 1 != 0 {
        flags ^= 1;
        for txin in input.iter_mut() {
            txin.witness = read_witness(stream)?;
        }
        if input.iter().all(|txin| txin.witness.is_empty()) {
            return Err(DecodeError::SuperfluousWitnessRecord);
        }
    }
    if flags != 0 {
        return Err(DecodeError::UnknownOptionalData(flags));
    }

    let lock_time = LockTime::from_consensus(stream.read_u32_le()?);

    Ok(Transaction {
        version,
        lock_time,
        input,
        output,
    })
}

fn read_inputs(stream: &mut TxInputStream<'_>) -> Result<Vec<TxIn>, DecodeError> {
    let count = read_count(stream)?;
    let mut input = Vec::with_capacity(count.min(stream.remaining() / MIN_TXIN_SIZE));
    for _ in 0..count {
        let txid = Txid::from_byte_array(stream.read_array()?);
        let vout = stream.read_u32_le()?;
        let script_sig = read_script(stream)?;
        let sequence = Sequence(stream.read_u32_le()?);
        input.push(TxIn {
            previous_output: OutPoint { txid, vout },
            script_sig,
            sequence,
            witness: Witness::new(),
        });
    }
    Ok(input)
}

fn read_outputs(stream: &mut TxInputStream<'_>) -> Result<Vec<TxOut>, DecodeError> {
    let count = read_count(stream)?;
    let mut output = Vec::with_capacity(count.min(stream.remaining() / MIN_TXOUT_SIZE));
    for _ in 0..count {
        let value = Amount::from_sat(stream.read_u64_le()?);
        let script_pubkey = read_script(stream)?;
        output.push(TxOut {
            value,
            script_pubkey,
        });
    }
    Ok(output)
}

fn read_witness(stream: &mut TxInputStream<'_>) -> Result<Witness, DecodeError> {
    let count = read_count(stream)?;
    let mut items = Vec::with_capacity(count.min(stream.remaining()));
    for _ in 0..count {
        items.push(read_var_bytes(stream)?.to_vec());
    }
    Ok(Witness::from(items))
}

fn read_script(stream: &mut TxInputStream<'_>) -> Result<ScriptBuf, DecodeError> {
    Ok(ScriptBuf::from_bytes(read_var_bytes(stream)?.to_vec()))
}

fn read_var_bytes<'a>(stream: &mut TxInputStream<'a>) -> Result<&'a [u8], DecodeError> {
    let len = read_count(stream)?;
    Ok(stream.read_bytes(len)?)
}

fn read_count(stream: &mut TxInputStream<'_>) -> Result<usize, DecodeError> {
    // Bounded by MAX_COMPACT_SIZE, so the conversion is lossless.
    Ok(stream.read_compact_size()? as usize)
}
