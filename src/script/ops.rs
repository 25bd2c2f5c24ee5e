//! Opcode-level walking of raw script bytes.
//!
//! Cursor handling matches Bitcoin Core's `GetScriptOp`: a failed read still
//! leaves the cursor past the opcode and any length prefix it consumed. The
//! signature-hash serializer depends on that position.

use bitcoin::opcodes::all::{
    OP_CODESEPARATOR, OP_PUSHBYTES_0, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4, OP_PUSHNUM_16,
};

/// A decoded opcode together with its push payload, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Op<'a> {
    pub opcode: u8,
    pub data: &'a [u8],
}

impl Op<'_> {
    pub fn is_push(&self) -> bool {
        self.opcode <= OP_PUSHDATA4.to_u8()
    }
}

/// Reads the opcode at `*pc`, advancing the cursor. Returns `None` at the end
/// of the script or on a truncated push.
pub fn read_op<'a>(script: &'a [u8], pc: &mut usize) -> Option<Op<'a>> {
    let opcode = *script.get(*pc)?;
    *pc += 1;
    if opcode > OP_PUSHDATA4.to_u8() {
        return Some(Op { opcode, data: &[] });
    }

    let size = if opcode < OP_PUSHDATA1.to_u8() {
        usize::from(opcode)
    } else {
        let width = match opcode {
            x if x == OP_PUSHDATA1.to_u8() => 1,
            x if x == OP_PUSHDATA2.to_u8() => 2,
            _ => 4,
        };
        let prefix = script.get(*pc..*pc + width)?;
        *pc += width;
        prefix
            .iter()
            .rev()
            .fold(0usize, |acc, &byte| (acc << 8) | usize::from(byte))
    };

    let data = script.get(*pc..pc.checked_add(size)?)?;
    *pc += size;
    Some(Op { opcode, data })
}

/// Iterates over opcodes, stopping at the first malformed push.
pub fn ops(script: &[u8]) -> impl Iterator<Item = Op<'_>> {
    let mut pc = 0usize;
    core::iter::from_fn(move || read_op(script, &mut pc))
}

/// Whether the whole script parses and contains only pushes (OP_RESERVED
/// counts as a push here, as in Core's `IsPushOnly`).
pub fn is_push_only(script: &[u8]) -> bool {
    let mut pc = 0usize;
    while pc < script.len() {
        match read_op(script, &mut pc) {
            Some(op) if op.opcode <= OP_PUSHNUM_16.to_u8() => {}
            _ => return false,
        }
    }
    true
}

/// `OP_HASH160 <20 bytes> OP_EQUAL`.
pub fn is_p2sh(script: &[u8]) -> bool {
    script.len() == 23 && script[0] == 0xa9 && script[1] == 0x14 && script[22] == 0x87
}

/// Splits a witness program into version and program bytes.
pub fn witness_program(script: &[u8]) -> Option<(u8, &[u8])> {
    if script.len() < 4 || script.len() > 42 {
        return None;
    }
    let version = match script[0] {
        0x00 => 0,
        op @ 0x51..=0x60 => op - 0x50,
        _ => return None,
    };
    if usize::from(script[1]) + 2 != script.len() {
        return None;
    }
    Some((version, &script[2..]))
}

/// Canonical single push of `data`, as Core's `CScript() << data` writes it.
pub fn push_data(data: &[u8]) -> Vec<u8> {
    let len = data.len();
    let mut out = Vec::with_capacity(len + 5);
    if len < usize::from(OP_PUSHDATA1.to_u8()) {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1.to_u8());
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2.to_u8());
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        out.push(OP_PUSHDATA4.to_u8());
        out.extend_from_slice(&(len as u32).to_le_bytes());
    }
    out.extend_from_slice(data);
    out
}

/// Whether `op` pushes its payload with the smallest possible encoding.
pub fn is_minimal_push(op: &Op<'_>) -> bool {
    let data = op.data;
    let opcode = op.opcode;
    if data.is_empty() {
        return opcode == OP_PUSHBYTES_0.to_u8();
    }
    if data.len() == 1 && (1..=16).contains(&data[0]) {
        // should have used OP_1 .. OP_16
        return false;
    }
    if data.len() == 1 && data[0] == 0x81 {
        // should have used OP_1NEGATE
        return false;
    }
    if data.len() <= 75 {
        return usize::from(opcode) == data.len();
    }
    if data.len() <= 0xff {
        return opcode == OP_PUSHDATA1.to_u8();
    }
    if data.len() <= 0xffff {
        return opcode == OP_PUSHDATA2.to_u8();
    }
    true
}

/// Removes every occurrence of `pattern` that starts on an opcode boundary.
/// Returns the rewritten script and the number of removals.
pub fn find_and_delete(script: &[u8], pattern: &[u8]) -> (Vec<u8>, usize) {
    if pattern.is_empty() {
        return (script.to_vec(), 0);
    }

    let mut result = Vec::with_capacity(script.len());
    let mut found = 0usize;
    let mut pc = 0usize;
    let mut copied_to = 0usize;
    loop {
        result.extend_from_slice(&script[copied_to..pc]);
        while script.len() - pc >= pattern.len() && script[pc..].starts_with(pattern) {
            pc += pattern.len();
            found += 1;
        }
        copied_to = pc;
        if read_op(script, &mut pc).is_none() {
            break;
        }
    }

    if found > 0 {
        result.extend_from_slice(&script[copied_to..]);
        (result, found)
    } else {
        (script.to_vec(), 0)
    }
}

/// Serialized form of `script_code` with every OP_CODESEPARATOR dropped,
/// byte for byte what legacy signature hashing commits to.
pub fn strip_code_separators(script_code: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(script_code.len());
    let mut segment_start = 0usize;
    let mut pc = 0usize;
    while let Some(op) = read_op(script_code, &mut pc) {
        if op.opcode == OP_CODESEPARATOR.to_u8() {
            out.extend_from_slice(&script_code[segment_start..pc - 1]);
            segment_start = pc;
        }
    }
    if segment_start != script_code.len() {
        out.extend_from_slice(&script_code[segment_start..pc.min(script_code.len())]);
    }
    out
}

/// Number of OP_CODESEPARATOR opcodes before the first malformed push.
pub fn count_code_separators(script_code: &[u8]) -> usize {
    ops(script_code)
        .filter(|op| op.opcode == OP_CODESEPARATOR.to_u8())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pushes_and_opcodes() {
        let script = [0x02, 0xaa, 0xbb, 0x4c, 0x01, 0xcc, 0x76];
        let collected: Vec<_> = ops(&script).collect();
        assert_eq!(collected.len(), 3);
        assert_eq!(collected[0].data, &[0xaau8, 0xbb][..]);
        assert_eq!(collected[1].opcode, 0x4c);
        assert_eq!(collected[1].data, &[0xccu8][..]);
        assert_eq!(collected[2].opcode, 0x76);
        assert!(!collected[2].is_push());
    }

    #[test]
    fn truncated_push_leaves_cursor_past_prefix() {
        let script = [0x4d, 0x05, 0x00, 0x01];
        let mut pc = 0;
        assert!(read_op(&script, &mut pc).is_none());
        assert_eq!(pc, 3);

        let script = [0x4c];
        let mut pc = 0;
        assert!(read_op(&script, &mut pc).is_none());
        assert_eq!(pc, 1);
    }

    #[test]
    fn push_only_detection() {
        assert!(is_push_only(&[]));
        assert!(is_push_only(&[0x00, 0x51, 0x60, 0x50, 0x01, 0xff]));
        assert!(!is_push_only(&[0x51, 0x61]));
        assert!(!is_push_only(&[0x02, 0x01]));
    }

    #[test]
    fn witness_program_shapes() {
        let mut p2wpkh = vec![0x00, 0x14];
        p2wpkh.extend_from_slice(&[0x11; 20]);
        assert_eq!(witness_program(&p2wpkh), Some((0, &[0x11; 20][..])));

        let mut v1 = vec![0x51, 0x20];
        v1.extend_from_slice(&[0x22; 32]);
        assert_eq!(witness_program(&v1).map(|(v, _)| v), Some(1));

        assert_eq!(witness_program(&[0x00, 0x01, 0xaa]), None);
        assert_eq!(witness_program(&[0x00, 0x03, 0xaa, 0xbb]), None);
        assert_eq!(witness_program(&[0x4f, 0x02, 0xaa, 0xbb]), None);
        let mut too_long = vec![0x00, 0x29];
        too_long.extend_from_slice(&[0u8; 41]);
        assert_eq!(witness_program(&too_long), None);
    }

    #[test]
    fn push_data_encodings() {
        assert_eq!(push_data(&[]), vec![0x00]);
        assert_eq!(push_data(&[0x05]), vec![0x01, 0x05]);
        assert_eq!(&push_data(&[0u8; 76])[..2], &[0x4cu8, 76][..]);
        assert_eq!(&push_data(&[0u8; 256])[..3], &[0x4du8, 0x00, 0x01][..]);
    }

    #[test]
    fn minimal_push_rules() {
        assert!(is_minimal_push(&Op { opcode: 0x00, data: &[] }));
        assert!(!is_minimal_push(&Op { opcode: 0x01, data: &[0x05] }));
        assert!(is_minimal_push(&Op { opcode: 0x01, data: &[0x11] }));
        assert!(!is_minimal_push(&Op { opcode: 0x01, data: &[0x81] }));
        assert!(!is_minimal_push(&Op { opcode: 0x4c, data: &[0x11; 10] }));
        assert!(is_minimal_push(&Op { opcode: 0x4c, data: &[0x11; 80] }));
    }

    #[test]
    fn find_and_delete_matches_whole_pushes() {
        let pattern = push_data(&[0x02, 0x03]);
        let script = [0x02, 0x02, 0x03, 0x93, 0x02, 0x02, 0x03];
        let (stripped, removed) = find_and_delete(&script, &pattern);
        assert_eq!(removed, 2);
        assert_eq!(stripped, vec![0x93]);
    }

    #[test]
    fn find_and_delete_does_not_match_inside_pushes() {
        let pattern = push_data(&[0xaa]);
        // the pattern bytes `01 aa` appear inside the push payload
        let script = [0x03, 0x01, 0xaa, 0xbb];
        let (stripped, removed) = find_and_delete(&script, &pattern);
        assert_eq!(removed, 0);
        assert_eq!(stripped, script.to_vec());
    }

    #[test]
    fn find_and_delete_handles_consecutive_matches() {
        // Core's script_FindAndDelete vectors
        let (out, n) = find_and_delete(&[0x02, 0x03, 0x02, 0x03], &[0x02, 0x03]);
        assert_eq!((out, n), (vec![], 2));
        let (out, n) = find_and_delete(&[0x00, 0x61, 0x61], &[0x61]);
        assert_eq!((out, n), (vec![0x00], 2));
        let script = [0x03, 0x02, 0xff, 0x03, 0x03, 0x02, 0xff, 0x03];
        let (out, n) = find_and_delete(&script, &[0x02]);
        assert_eq!((out, n), (script.to_vec(), 0));
        let (out, n) = find_and_delete(&script, &[0x03, 0x02, 0xff, 0x03]);
        assert_eq!((out, n), (vec![], 2));
        // a truncated push still sits on an opcode boundary
        let (out, n) = find_and_delete(&[0x01, 0x02, 0x02], &[0x02]);
        assert_eq!((out, n), (vec![0x01, 0x02], 1));
    }

    #[test]
    fn strips_code_separators() {
        let script = [0x76, 0xab, 0x01, 0xab, 0xab, 0xac];
        assert_eq!(strip_code_separators(&script), vec![0x76, 0x01, 0xab, 0xac]);
        assert_eq!(count_code_separators(&script), 2);
        assert_eq!(strip_code_separators(&[0xab]), Vec::<u8>::new());
    }
}
