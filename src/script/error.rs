use core::fmt;

/// Evaluator error codes.
///
/// Discriminants follow Bitcoin Core's `ScriptError_t`, so a raw code coming
/// from any Core-compatible evaluator can be converted with `TryFrom<u32>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ScriptError {
    Ok = 0,
    Unknown = 1,
    EvalFalse = 2,
    OpReturn = 3,

    ScriptSize = 4,
    PushSize = 5,
    OpCount = 6,
    StackSize = 7,
    SigCount = 8,
    PubkeyCount = 9,

    Verify = 10,
    EqualVerify = 11,
    CheckMultiSigVerify = 12,
    CheckSigVerify = 13,
    NumEqualVerify = 14,

    BadOpcode = 15,
    DisabledOpcode = 16,
    InvalidStackOperation = 17,
    InvalidAltstackOperation = 18,
    UnbalancedConditional = 19,

    NegativeLockTime = 20,
    UnsatisfiedLockTime = 21,

    SigHashType = 22,
    SigDer = 23,
    MinimalData = 24,
    SigPushOnly = 25,
    SigHighS = 26,
    SigNullDummy = 27,
    PubkeyType = 28,
    CleanStack = 29,
    MinimalIf = 30,
    NullFail = 31,

    DiscourageUpgradableNops = 32,
    DiscourageUpgradableWitnessProgram = 33,

    WitnessProgramWrongLength = 34,
    WitnessProgramWitnessEmpty = 35,
    WitnessProgramMismatch = 36,
    WitnessMalleated = 37,
    WitnessMalleatedP2SH = 38,
    WitnessUnexpected = 39,
    WitnessPubkeyType = 40,

    OpCodeSeparator = 41,
    SigFindAndDelete = 42,
}

impl ScriptError {
    pub const ALL: [ScriptError; 43] = [
        ScriptError::Ok,
        ScriptError::Unknown,
        ScriptError::EvalFalse,
        ScriptError::OpReturn,
        ScriptError::ScriptSize,
        ScriptError::PushSize,
        ScriptError::OpCount,
        ScriptError::StackSize,
        ScriptError::SigCount,
        ScriptError::PubkeyCount,
        ScriptError::Verify,
        ScriptError::EqualVerify,
        ScriptError::CheckMultiSigVerify,
        ScriptError::CheckSigVerify,
        ScriptError::NumEqualVerify,
        ScriptError::BadOpcode,
        ScriptError::DisabledOpcode,
        ScriptError::InvalidStackOperation,
        ScriptError::InvalidAltstackOperation,
        ScriptError::UnbalancedConditional,
        ScriptError::NegativeLockTime,
        ScriptError::UnsatisfiedLockTime,
        ScriptError::SigHashType,
        ScriptError::SigDer,
        ScriptError::MinimalData,
        ScriptError::SigPushOnly,
        ScriptError::SigHighS,
        ScriptError::SigNullDummy,
        ScriptError::PubkeyType,
        ScriptError::CleanStack,
        ScriptError::MinimalIf,
        ScriptError::NullFail,
        ScriptError::DiscourageUpgradableNops,
        ScriptError::DiscourageUpgradableWitnessProgram,
        ScriptError::WitnessProgramWrongLength,
        ScriptError::WitnessProgramWitnessEmpty,
        ScriptError::WitnessProgramMismatch,
        ScriptError::WitnessMalleated,
        ScriptError::WitnessMalleatedP2SH,
        ScriptError::WitnessUnexpected,
        ScriptError::WitnessPubkeyType,
        ScriptError::OpCodeSeparator,
        ScriptError::SigFindAndDelete,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ScriptError {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
            .ok_or(code)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ScriptError::*;

        let description = match *self {
            Ok => "no error",
            Unknown => "unknown error",
            EvalFalse => "script evaluated without error but finished with a false/empty top stack element",
            OpReturn => "OP_RETURN was encountered",
            ScriptSize => "script is too big",
            PushSize => "push value size limit exceeded",
            OpCount => "operation limit exceeded",
            StackSize => "stack size limit exceeded",
            SigCount => "signature count negative or greater than pubkey count",
            PubkeyCount => "pubkey count negative or limit exceeded",
            Verify => "script failed an OP_VERIFY operation",
            EqualVerify => "script failed an OP_EQUALVERIFY operation",
            CheckMultiSigVerify => "script failed an OP_CHECKMULTISIGVERIFY operation",
            CheckSigVerify => "script failed an OP_CHECKSIGVERIFY operation",
            NumEqualVerify => "script failed an OP_NUMEQUALVERIFY operation",
            BadOpcode => "opcode missing or not understood",
            DisabledOpcode => "attempted to use a disabled opcode",
            InvalidStackOperation => "operation not valid with the current stack size",
            InvalidAltstackOperation => "operation not valid with the current altstack size",
            UnbalancedConditional => "invalid OP_IF construction",
            NegativeLockTime => "negative locktime",
            UnsatisfiedLockTime => "locktime requirement not satisfied",
            SigHashType => "signature hash type missing or not understood",
            SigDer => "non-canonical DER signature",
            MinimalData => "data push larger than necessary",
            SigPushOnly => "only push operators allowed in signatures",
            SigHighS => "non-canonical signature: S value is unnecessarily high",
            SigNullDummy => "dummy CHECKMULTISIG argument must be zero",
            PubkeyType => "public key is neither compressed or uncompressed",
            CleanStack => "stack size must be exactly one after execution",
            MinimalIf => "OP_IF/NOTIF argument must be minimal",
            NullFail => "signature must be zero for failed CHECK(MULTI)SIG operation",
            DiscourageUpgradableNops => "NOPx reserved for soft-fork upgrades",
            DiscourageUpgradableWitnessProgram => "witness version reserved for soft-fork upgrades",
            WitnessProgramWrongLength => "witness program has incorrect length",
            WitnessProgramWitnessEmpty => "witness program was passed an empty witness",
            WitnessProgramMismatch => "witness program hash mismatch",
            WitnessMalleated => "witness requires empty scriptSig",
            WitnessMalleatedP2SH => "witness requires only-redeemscript scriptSig",
            WitnessUnexpected => "witness provided for non-witness script",
            WitnessPubkeyType => "using non-compressed keys in segwit",
            OpCodeSeparator => "using OP_CODESEPARATOR in non-witness script",
            SigFindAndDelete => "signature is found in scriptCode",
        };

        f.write_str(description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_sequential() {
        for (idx, err) in ScriptError::ALL.iter().enumerate() {
            assert_eq!(err.code() as usize, idx, "{err:?}");
        }
    }

    #[test]
    fn raw_code_conversion() {
        assert_eq!(ScriptError::try_from(0), Ok(ScriptError::Ok));
        assert_eq!(ScriptError::try_from(11), Ok(ScriptError::EqualVerify));
        assert_eq!(ScriptError::try_from(42), Ok(ScriptError::SigFindAndDelete));
        assert_eq!(ScriptError::try_from(43), Err(43));
        assert_eq!(ScriptError::try_from(u32::MAX), Err(u32::MAX));
    }
}
