//! Opcode evaluation and the scriptSig / scriptPubKey / witness pipeline.

use bitcoin::{
    hashes::{hash160, ripemd160, sha1, sha256, sha256d, Hash},
    opcodes::{all::*, Opcode},
    Witness,
};

use super::{
    checker::SignatureChecker,
    encoding::{
        is_compressed_or_uncompressed_pubkey, is_compressed_pubkey,
        is_defined_hashtype_signature, is_low_der_signature, is_valid_signature_encoding,
    },
    num::{
        cast_to_bool, encode_bool, encode_num, parse_scriptnum, SCRIPTNUM_MAX_LEN,
        SCRIPTNUM_MAX_LEN_EXTENDED,
    },
    ops::{find_and_delete, is_minimal_push, is_p2sh, is_push_only, push_data, read_op, witness_program},
    stack::{Stack, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE},
    ScriptError, ScriptFlags, SigVersion,
};

/// Maximum script length in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;
/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum number of public keys per multisig.
pub const MAX_PUBKEYS_PER_MULTISIG: i64 = 20;

const WITNESS_V0_KEYHASH_SIZE: usize = 20;
const WITNESS_V0_SCRIPTHASH_SIZE: usize = 32;
const SEQUENCE_LOCKTIME_DISABLE_FLAG: i64 = 1 << 31;

/// Runs `script` on `stack`.
///
/// The stack is left as the script left it, also on failure.
pub fn eval_script<C>(
    stack: &mut Stack,
    script: &[u8],
    flags: ScriptFlags,
    checker: &C,
    sigversion: SigVersion,
) -> Result<(), ScriptError>
where
    C: SignatureChecker + ?Sized,
{
    Interpreter { flags, checker }.eval(stack, script, sigversion)
}

/// Verifies that `script_sig` (and `witness`) satisfy `script_pubkey`.
pub fn verify_script<C>(
    script_sig: &[u8],
    script_pubkey: &[u8],
    witness: &Witness,
    flags: ScriptFlags,
    checker: &C,
) -> Result<(), ScriptError>
where
    C: SignatureChecker + ?Sized,
{
    Interpreter { flags, checker }.verify(script_sig, script_pubkey, witness)
}

struct Interpreter<'c, C: ?Sized> {
    flags: ScriptFlags,
    checker: &'c C,
}

/// Open OP_IF branches.
///
/// Only the depth and the position of the outermost false branch are kept,
/// so checking whether the current opcode runs is constant time.
#[derive(Debug, Default)]
struct ConditionStack {
    depth: usize,
    first_false: Option<usize>,
}

impl ConditionStack {
    fn is_empty(&self) -> bool {
        self.depth == 0
    }

    fn all_true(&self) -> bool {
        self.first_false.is_none()
    }

    fn push(&mut self, value: bool) {
        if !value && self.first_false.is_none() {
            self.first_false = Some(self.depth);
        }
        self.depth += 1;
    }

    fn pop(&mut self) -> Result<(), ScriptError> {
        if self.depth == 0 {
            return Err(ScriptError::UnbalancedConditional);
        }
        self.depth -= 1;
        if self.first_false == Some(self.depth) {
            self.first_false = None;
        }
        Ok(())
    }

    fn toggle_top(&mut self) -> Result<(), ScriptError> {
        if self.depth == 0 {
            return Err(ScriptError::UnbalancedConditional);
        }
        let top = self.depth - 1;
        match self.first_false {
            None => self.first_false = Some(top),
            Some(pos) if pos == top => self.first_false = None,
            // inside an outer false branch, flipping has no effect
            Some(_) => {}
        }
        Ok(())
    }
}

/// State of one script execution.
struct Frame<'s> {
    script: &'s [u8],
    sigversion: SigVersion,
    conditions: ConditionStack,
    altstack: Vec<Vec<u8>>,
    op_count: usize,
    // start of the signed script code, just past the last OP_CODESEPARATOR
    code_separator: usize,
}

impl<'s> Frame<'s> {
    fn new(script: &'s [u8], sigversion: SigVersion) -> Self {
        Self {
            script,
            sigversion,
            conditions: ConditionStack::default(),
            altstack: Vec::new(),
            op_count: 0,
            code_separator: 0,
        }
    }

    fn executing(&self) -> bool {
        self.conditions.all_true()
    }

    fn script_code(&self) -> &'s [u8] {
        &self.script[self.code_separator..]
    }

    fn add_ops(&mut self, count: usize) -> Result<(), ScriptError> {
        self.op_count += count;
        if self.op_count > MAX_OPS_PER_SCRIPT {
            return Err(ScriptError::OpCount);
        }
        Ok(())
    }
}

impl<C> Interpreter<'_, C>
where
    C: SignatureChecker + ?Sized,
{
    fn require_minimal(&self) -> bool {
        self.flags.contains(ScriptFlags::MINIMALDATA)
    }

    fn verify(
        &self,
        script_sig: &[u8],
        script_pubkey: &[u8],
        witness: &Witness,
    ) -> Result<(), ScriptError> {
        if self.flags.contains(ScriptFlags::SIGPUSHONLY) && !is_push_only(script_sig) {
            return Err(ScriptError::SigPushOnly);
        }

        // scriptSig and scriptPubKey run one after the other on a shared stack,
        // never concatenated (CVE-2010-5141).
        let mut stack = Stack::new();
        self.eval(&mut stack, script_sig, SigVersion::Base)?;
        let p2sh_stack = self.flags.contains(ScriptFlags::P2SH).then(|| stack.clone());
        self.eval(&mut stack, script_pubkey, SigVersion::Base)?;
        require_true(&stack)?;

        let mut had_witness = false;
        if self.flags.contains(ScriptFlags::WITNESS) {
            if let Some((version, program)) = witness_program(script_pubkey) {
                had_witness = true;
                if !script_sig.is_empty() {
                    return Err(ScriptError::WitnessMalleated);
                }
                self.verify_witness_program(witness, version, program, false)?;
                // the real stack is not clean for witness spends
                stack.truncate(1);
            }
        }

        if let Some(p2sh_stack) = p2sh_stack.filter(|_| is_p2sh(script_pubkey)) {
            if !is_push_only(script_sig) {
                return Err(ScriptError::SigPushOnly);
            }
            stack = p2sh_stack;
            // hashing an empty stack would already have failed above
            let redeem_script = stack.pop().map_err(|_| ScriptError::EvalFalse)?;
            tracing::trace!(len = redeem_script.len(), "evaluating p2sh redeem script");
            self.eval(&mut stack, &redeem_script, SigVersion::Base)?;
            require_true(&stack)?;

            if self.flags.contains(ScriptFlags::WITNESS) {
                if let Some((version, program)) = witness_program(&redeem_script) {
                    had_witness = true;
                    // exactly one push of the redeem script, anything else is malleable
                    if script_sig != push_data(&redeem_script).as_slice() {
                        return Err(ScriptError::WitnessMalleatedP2SH);
                    }
                    self.verify_witness_program(witness, version, program, true)?;
                    stack.truncate(1);
                }
            }
        }

        if self.flags.contains(ScriptFlags::CLEANSTACK) && stack.len() != 1 {
            return Err(ScriptError::CleanStack);
        }

        if self.flags.contains(ScriptFlags::WITNESS) && !had_witness && !witness.is_empty() {
            return Err(ScriptError::WitnessUnexpected);
        }

        Ok(())
    }

    fn verify_witness_program(
        &self,
        witness: &Witness,
        version: u8,
        program: &[u8],
        is_p2sh: bool,
    ) -> Result<(), ScriptError> {
        if version != 0 {
            tracing::trace!(version, is_p2sh, "upgradable witness program");
            if self.flags.contains(ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                return Err(ScriptError::DiscourageUpgradableWitnessProgram);
            }
            return Ok(());
        }

        let mut items: Vec<Vec<u8>> = witness.iter().map(<[u8]>::to_vec).collect();
        match program.len() {
            WITNESS_V0_SCRIPTHASH_SIZE => {
                let witness_script = items.pop().ok_or(ScriptError::WitnessProgramWitnessEmpty)?;
                if sha256::Hash::hash(&witness_script).as_byte_array()[..] != *program {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                self.execute_witness_script(items, &witness_script)
            }
            WITNESS_V0_KEYHASH_SIZE => {
                if items.len() != 2 {
                    return Err(ScriptError::WitnessProgramMismatch);
                }
                let mut script = Vec::with_capacity(25);
                script.extend_from_slice(&[OP_DUP.to_u8(), OP_HASH160.to_u8()]);
                script.extend_from_slice(&push_data(program));
                script.extend_from_slice(&[OP_EQUALVERIFY.to_u8(), OP_CHECKSIG.to_u8()]);
                self.execute_witness_script(items, &script)
            }
            _ => Err(ScriptError::WitnessProgramWrongLength),
        }
    }

    fn execute_witness_script(&self, items: Vec<Vec<u8>>, script: &[u8]) -> Result<(), ScriptError> {
        if items.iter().any(|item| item.len() > MAX_SCRIPT_ELEMENT_SIZE) {
            return Err(ScriptError::PushSize);
        }
        let mut stack = Stack::from_items(items);
        self.eval(&mut stack, script, SigVersion::WitnessV0)?;
        // witness scripts must leave exactly one element behind
        if stack.len() != 1 {
            return Err(ScriptError::CleanStack);
        }
        require_true(&stack)
    }

    fn eval(&self, stack: &mut Stack, script: &[u8], sigversion: SigVersion) -> Result<(), ScriptError> {
        if script.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        let mut frame = Frame::new(script, sigversion);
        let mut pc = 0usize;
        while pc < script.len() {
            let executing = frame.executing();
            let op = read_op(script, &mut pc).ok_or(ScriptError::BadOpcode)?;
            if op.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Err(ScriptError::PushSize);
            }
            if op.opcode > OP_PUSHNUM_16.to_u8() {
                frame.add_ops(1)?;
            }

            let opcode = Opcode::from(op.opcode);
            if is_disabled(opcode) {
                return Err(ScriptError::DisabledOpcode);
            }
            if opcode == OP_CODESEPARATOR
                && sigversion == SigVersion::Base
                && self.flags.contains(ScriptFlags::CONST_SCRIPTCODE)
            {
                return Err(ScriptError::OpCodeSeparator);
            }

            if executing && op.is_push() {
                if self.require_minimal() && !is_minimal_push(&op) {
                    return Err(ScriptError::MinimalData);
                }
                stack.push(op.data.to_vec());
            } else if executing || is_conditional(opcode) {
                self.execute_opcode(stack, &mut frame, opcode, executing, pc)?;
            }

            if stack.len() + frame.altstack.len() > MAX_STACK_SIZE {
                return Err(ScriptError::StackSize);
            }
        }

        if !frame.conditions.is_empty() {
            return Err(ScriptError::UnbalancedConditional);
        }
        Ok(())
    }

    fn execute_opcode(
        &self,
        stack: &mut Stack,
        frame: &mut Frame<'_>,
        opcode: Opcode,
        executing: bool,
        pc: usize,
    ) -> Result<(), ScriptError> {
        let require_minimal = self.require_minimal();
        let code = opcode.to_u8();

        if (OP_PUSHNUM_1.to_u8()..=OP_PUSHNUM_16.to_u8()).contains(&code) {
            let value = i64::from(code - OP_PUSHNUM_1.to_u8() + 1);
            stack.push(encode_num(value));
            return Ok(());
        }

        match opcode {
            OP_PUSHNUM_NEG1 => stack.push(encode_num(-1)),

            // control
            OP_NOP => {}
            OP_CLTV => {
                if !self.flags.contains(ScriptFlags::CHECKLOCKTIMEVERIFY) {
                    return Ok(());
                }
                // five bytes so times past 2038 still fit
                let lock_time =
                    parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN_EXTENDED)?;
                if lock_time < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                if !self.checker.check_lock_time(lock_time) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }
            OP_CSV => {
                if !self.flags.contains(ScriptFlags::CHECKSEQUENCEVERIFY) {
                    return Ok(());
                }
                let sequence =
                    parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN_EXTENDED)?;
                if sequence < 0 {
                    return Err(ScriptError::NegativeLockTime);
                }
                // disabled relative lock times behave as a NOP
                if sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
                    return Ok(());
                }
                if !self.checker.check_sequence(sequence) {
                    return Err(ScriptError::UnsatisfiedLockTime);
                }
            }
            OP_NOP1 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9 | OP_NOP10 => {
                if self.flags.contains(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                    return Err(ScriptError::DiscourageUpgradableNops);
                }
            }
            OP_IF | OP_NOTIF => {
                let mut value = false;
                if executing {
                    let top = stack.top(1).map_err(|_| ScriptError::UnbalancedConditional)?;
                    if frame.sigversion == SigVersion::WitnessV0
                        && self.flags.contains(ScriptFlags::MINIMALIF)
                        && (top.len() > 1 || (top.len() == 1 && top[0] != 1))
                    {
                        return Err(ScriptError::MinimalIf);
                    }
                    value = cast_to_bool(top) != (opcode == OP_NOTIF);
                    stack.pop()?;
                }
                frame.conditions.push(value);
            }
            OP_ELSE => frame.conditions.toggle_top()?,
            OP_ENDIF => frame.conditions.pop()?,
            OP_VERIFY => {
                if !cast_to_bool(stack.top(1)?) {
                    return Err(ScriptError::Verify);
                }
                stack.pop()?;
            }
            OP_RETURN => return Err(ScriptError::OpReturn),

            // stack ops
            OP_TOALTSTACK => {
                let value = stack.pop()?;
                frame.altstack.push(value);
            }
            OP_FROMALTSTACK => {
                let value = frame
                    .altstack
                    .pop()
                    .ok_or(ScriptError::InvalidAltstackOperation)?;
                stack.push(value);
            }
            OP_2DROP => {
                stack.drain_top(2)?;
            }
            OP_2DUP => {
                stack.require(2)?;
                let first = stack.top(2)?.clone();
                let second = stack.top(1)?.clone();
                stack.push(first);
                stack.push(second);
            }
            OP_3DUP => {
                stack.require(3)?;
                for _ in 0..3 {
                    let value = stack.top(3)?.clone();
                    stack.push(value);
                }
            }
            OP_2OVER => {
                stack.require(4)?;
                for _ in 0..2 {
                    let value = stack.top(4)?.clone();
                    stack.push(value);
                }
            }
            OP_2ROT => {
                stack.require(6)?;
                let first = stack.remove(6)?;
                let second = stack.remove(5)?;
                stack.push(first);
                stack.push(second);
            }
            OP_2SWAP => {
                stack.require(4)?;
                stack.swap(4, 2)?;
                stack.swap(3, 1)?;
            }
            OP_IFDUP => {
                let top = stack.top(1)?;
                if cast_to_bool(top) {
                    let value = top.clone();
                    stack.push(value);
                }
            }
            OP_DEPTH => {
                let depth = encode_num(stack.len() as i64);
                stack.push(depth);
            }
            OP_DROP => {
                stack.pop()?;
            }
            OP_DUP => {
                let value = stack.top(1)?.clone();
                stack.push(value);
            }
            OP_NIP => {
                stack.remove(2)?;
            }
            OP_OVER => {
                let value = stack.top(2)?.clone();
                stack.push(value);
            }
            OP_PICK | OP_ROLL => {
                stack.require(2)?;
                let n = parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                stack.pop()?;
                if n < 0 || n as usize >= stack.len() {
                    return Err(ScriptError::InvalidStackOperation);
                }
                let depth = n as usize + 1;
                let value = if opcode == OP_ROLL {
                    stack.remove(depth)?
                } else {
                    stack.top(depth)?.clone()
                };
                stack.push(value);
            }
            OP_ROT => {
                stack.require(3)?;
                stack.swap(3, 2)?;
                stack.swap(2, 1)?;
            }
            OP_SWAP => {
                stack.require(2)?;
                stack.swap(2, 1)?;
            }
            OP_TUCK => {
                stack.require(2)?;
                let value = stack.top(1)?.clone();
                stack.insert_below(2, value)?;
            }
            OP_SIZE => {
                let size = encode_num(stack.top(1)?.len() as i64);
                stack.push(size);
            }

            // bitwise logic
            OP_EQUAL | OP_EQUALVERIFY => {
                stack.require(2)?;
                let equal = stack.top(2)? == stack.top(1)?;
                stack.drain_top(2)?;
                stack.push(encode_bool(equal));
                if opcode == OP_EQUALVERIFY {
                    if !equal {
                        return Err(ScriptError::EqualVerify);
                    }
                    stack.pop()?;
                }
            }

            // numeric
            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                let n = parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                let result = match opcode {
                    OP_1ADD => n + 1,
                    OP_1SUB => n - 1,
                    OP_NEGATE => -n,
                    OP_ABS => n.abs(),
                    OP_NOT => i64::from(n == 0),
                    _ => i64::from(n != 0),
                };
                stack.pop()?;
                stack.push(encode_num(result));
            }
            OP_ADD | OP_SUB | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL | OP_NUMEQUALVERIFY
            | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN | OP_LESSTHANOREQUAL
            | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => {
                stack.require(2)?;
                let a = parse_scriptnum(stack.top(2)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                let b = parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                let result = match opcode {
                    OP_ADD => a + b,
                    OP_SUB => a - b,
                    OP_BOOLAND => i64::from(a != 0 && b != 0),
                    OP_BOOLOR => i64::from(a != 0 || b != 0),
                    OP_NUMEQUAL | OP_NUMEQUALVERIFY => i64::from(a == b),
                    OP_NUMNOTEQUAL => i64::from(a != b),
                    OP_LESSTHAN => i64::from(a < b),
                    OP_GREATERTHAN => i64::from(a > b),
                    OP_LESSTHANOREQUAL => i64::from(a <= b),
                    OP_GREATERTHANOREQUAL => i64::from(a >= b),
                    OP_MIN => a.min(b),
                    _ => a.max(b),
                };
                stack.drain_top(2)?;
                stack.push(encode_num(result));
                if opcode == OP_NUMEQUALVERIFY {
                    if result == 0 {
                        return Err(ScriptError::NumEqualVerify);
                    }
                    stack.pop()?;
                }
            }
            OP_WITHIN => {
                stack.require(3)?;
                let x = parse_scriptnum(stack.top(3)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                let min = parse_scriptnum(stack.top(2)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                let max = parse_scriptnum(stack.top(1)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
                stack.drain_top(3)?;
                stack.push(encode_bool(min <= x && x < max));
            }

            // crypto
            OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
                let data = stack.pop()?;
                let digest = match opcode {
                    OP_RIPEMD160 => ripemd160::Hash::hash(&data).to_byte_array().to_vec(),
                    OP_SHA1 => sha1::Hash::hash(&data).to_byte_array().to_vec(),
                    OP_SHA256 => sha256::Hash::hash(&data).to_byte_array().to_vec(),
                    OP_HASH160 => hash160::Hash::hash(&data).to_byte_array().to_vec(),
                    _ => sha256d::Hash::hash(&data).to_byte_array().to_vec(),
                };
                stack.push(digest);
            }
            OP_CODESEPARATOR => frame.code_separator = pc,
            OP_CHECKSIG | OP_CHECKSIGVERIFY => {
                stack.require(2)?;
                let success = self.check_sig(stack.top(2)?, stack.top(1)?, frame)?;
                stack.drain_top(2)?;
                stack.push(encode_bool(success));
                if opcode == OP_CHECKSIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckSigVerify);
                    }
                    stack.pop()?;
                }
            }
            OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
                let success = self.check_multisig(stack, frame)?;
                stack.push(encode_bool(success));
                if opcode == OP_CHECKMULTISIGVERIFY {
                    if !success {
                        return Err(ScriptError::CheckMultiSigVerify);
                    }
                    stack.pop()?;
                }
            }

            // OP_VERIF, OP_VERNOTIF, reserved and unassigned opcodes
            _ => return Err(ScriptError::BadOpcode),
        }
        Ok(())
    }

    fn check_sig(&self, signature: &[u8], pubkey: &[u8], frame: &Frame<'_>) -> Result<bool, ScriptError> {
        let script_code = match frame.sigversion {
            SigVersion::Base => {
                let (script_code, found) = find_and_delete(frame.script_code(), &push_data(signature));
                if found > 0 && self.flags.contains(ScriptFlags::CONST_SCRIPTCODE) {
                    return Err(ScriptError::SigFindAndDelete);
                }
                script_code
            }
            SigVersion::WitnessV0 => frame.script_code().to_vec(),
        };

        self.check_signature_encoding(signature)?;
        self.check_pubkey_encoding(pubkey, frame.sigversion)?;

        let success = self
            .checker
            .check_ecdsa_signature(signature, pubkey, &script_code, frame.sigversion);
        if !success && self.flags.contains(ScriptFlags::NULLFAIL) && !signature.is_empty() {
            return Err(ScriptError::NullFail);
        }
        Ok(success)
    }

    fn check_multisig(&self, stack: &mut Stack, frame: &mut Frame<'_>) -> Result<bool, ScriptError> {
        let require_minimal = self.require_minimal();

        // Positions count from the top, starting at 1:
        // [dummy] [sig ...] <sig count> [key ...] <key count>
        let mut i = 1usize;
        let key_count = parse_scriptnum(stack.top(i)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
        if !(0..=MAX_PUBKEYS_PER_MULTISIG).contains(&key_count) {
            return Err(ScriptError::PubkeyCount);
        }
        let mut keys_left = key_count as usize;
        frame.add_ops(keys_left)?;
        i += 1;
        let mut key_pos = i;
        // elements above the signatures; NULLFAIL cleanup starts below them
        let mut cleanup_skip = keys_left + 2;
        i += keys_left;

        let sig_count = parse_scriptnum(stack.top(i)?, require_minimal, SCRIPTNUM_MAX_LEN)?;
        if sig_count < 0 || sig_count as usize > keys_left {
            return Err(ScriptError::SigCount);
        }
        let mut sigs_left = sig_count as usize;
        i += 1;
        let mut sig_pos = i;
        i += sigs_left;
        stack.require(i)?;

        let mut script_code = frame.script_code().to_vec();
        if frame.sigversion == SigVersion::Base {
            for k in 0..sigs_left {
                let (filtered, found) =
                    find_and_delete(&script_code, &push_data(stack.top(sig_pos + k)?));
                if found > 0 && self.flags.contains(ScriptFlags::CONST_SCRIPTCODE) {
                    return Err(ScriptError::SigFindAndDelete);
                }
                script_code = filtered;
            }
        }

        let mut success = true;
        while success && sigs_left > 0 {
            let signature = stack.top(sig_pos)?;
            let pubkey = stack.top(key_pos)?;
            // the encoding checks make evaluation order observable under STRICTENC
            self.check_signature_encoding(signature)?;
            self.check_pubkey_encoding(pubkey, frame.sigversion)?;

            if self
                .checker
                .check_ecdsa_signature(signature, pubkey, &script_code, frame.sigversion)
            {
                sig_pos += 1;
                sigs_left -= 1;
            }
            key_pos += 1;
            keys_left -= 1;

            // more signatures left than keys means failure
            if sigs_left > keys_left {
                success = false;
            }
        }

        while i > 1 {
            i -= 1;
            if !success
                && self.flags.contains(ScriptFlags::NULLFAIL)
                && cleanup_skip == 0
                && !stack.top(1)?.is_empty()
            {
                return Err(ScriptError::NullFail);
            }
            cleanup_skip = cleanup_skip.saturating_sub(1);
            stack.pop()?;
        }

        // Historical off-by-one: one extra element is consumed.
        let dummy = stack.pop()?;
        if self.flags.contains(ScriptFlags::NULLDUMMY) && !dummy.is_empty() {
            return Err(ScriptError::SigNullDummy);
        }
        Ok(success)
    }

    fn check_signature_encoding(&self, signature: &[u8]) -> Result<(), ScriptError> {
        // empty signatures are a compact way to fail a CHECK(MULTI)SIG
        if signature.is_empty() {
            return Ok(());
        }
        let der_required = ScriptFlags::DERSIG | ScriptFlags::LOW_S | ScriptFlags::STRICTENC;
        if self.flags.intersects(der_required) && !is_valid_signature_encoding(signature) {
            return Err(ScriptError::SigDer);
        }
        if self.flags.contains(ScriptFlags::LOW_S) && !is_low_der_signature(signature) {
            return Err(ScriptError::SigHighS);
        }
        if self.flags.contains(ScriptFlags::STRICTENC) && !is_defined_hashtype_signature(signature) {
            return Err(ScriptError::SigHashType);
        }
        Ok(())
    }

    fn check_pubkey_encoding(&self, pubkey: &[u8], sigversion: SigVersion) -> Result<(), ScriptError> {
        if self.flags.contains(ScriptFlags::STRICTENC)
            && !is_compressed_or_uncompressed_pubkey(pubkey)
        {
            return Err(ScriptError::PubkeyType);
        }
        if self.flags.contains(ScriptFlags::WITNESS_PUBKEYTYPE)
            && sigversion == SigVersion::WitnessV0
            && !is_compressed_pubkey(pubkey)
        {
            return Err(ScriptError::WitnessPubkeyType);
        }
        Ok(())
    }
}

fn require_true(stack: &Stack) -> Result<(), ScriptError> {
    match stack.last() {
        Some(top) if cast_to_bool(top) => Ok(()),
        _ => Err(ScriptError::EvalFalse),
    }
}

fn is_conditional(opcode: Opcode) -> bool {
    (OP_IF.to_u8()..=OP_ENDIF.to_u8()).contains(&opcode.to_u8())
}

fn is_disabled(opcode: Opcode) -> bool {
    matches!(
        opcode,
        OP_CAT
            | OP_SUBSTR
            | OP_LEFT
            | OP_RIGHT
            | OP_INVERT
            | OP_AND
            | OP_OR
            | OP_XOR
            | OP_2MUL
            | OP_2DIV
            | OP_MUL
            | OP_DIV
            | OP_MOD
            | OP_LSHIFT
            | OP_RSHIFT
    )
}
