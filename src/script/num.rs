//! Script number and boolean encodings.

use super::ScriptError;

/// Default operand size for arithmetic opcodes.
pub const SCRIPTNUM_MAX_LEN: usize = 4;
/// Operand size accepted by CHECKLOCKTIMEVERIFY and CHECKSEQUENCEVERIFY.
pub const SCRIPTNUM_MAX_LEN_EXTENDED: usize = 5;

pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            // negative zero
            return !(i == data.len() - 1 && byte == 0x80);
        }
    }
    false
}

pub fn encode_bool(value: bool) -> Vec<u8> {
    if value {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Little-endian sign-magnitude encoding, minimal length.
pub fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut abs_value = value.unsigned_abs();
    let mut result = Vec::with_capacity(9);
    while abs_value > 0 {
        result.push((abs_value & 0xff) as u8);
        abs_value >>= 8;
    }

    // `result` is non-empty because `value != 0`.
    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }
    result
}

/// Decodes a script number, rejecting operands longer than `max_len` and,
/// when `require_minimal` is set, non-minimal encodings.
pub fn parse_scriptnum(
    bytes: &[u8],
    require_minimal: bool,
    max_len: usize,
) -> Result<i64, ScriptError> {
    if bytes.len() > max_len {
        return Err(ScriptError::Unknown);
    }
    if require_minimal && !is_minimally_encoded(bytes) {
        return Err(ScriptError::Unknown);
    }
    Ok(decode_num(bytes))
}

fn decode_num(bytes: &[u8]) -> i64 {
    let Some(&last) = bytes.last() else {
        return 0;
    };

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= i64::from(byte) << (8 * i);
    }

    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        -(result & mask)
    } else {
        result
    }
}

fn is_minimally_encoded(bytes: &[u8]) -> bool {
    match bytes {
        [] => true,
        [.., last] if last & 0x7f != 0 => true,
        // A trailing sign byte is only needed when the next byte would
        // otherwise carry the sign bit.
        [.., prev, _] => prev & 0x80 != 0,
        [_] => false,
    }
}
