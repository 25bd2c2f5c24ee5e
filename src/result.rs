//! Public verification result codes.

use core::fmt;

use crate::script::ScriptError;

/// Outcome of a verification call.
///
/// Discriminants are part of the ABI. New members are only ever appended.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(C)]
pub enum VerifyResult {
    EvalFalse = 0,
    EvalTrue = 1,
    ScriptSize = 2,
    PushSize = 3,
    OpCount = 4,
    StackSize = 5,
    SigCount = 6,
    PubkeyCount = 7,
    Verify = 8,
    EqualVerify = 9,
    CheckMultisigVerify = 10,
    CheckSigVerify = 11,
    NumEqualVerify = 12,
    BadOpcode = 13,
    DisabledOpcode = 14,
    InvalidStackOperation = 15,
    InvalidAltstackOperation = 16,
    UnbalancedConditional = 17,
    SigHashType = 18,
    SigDer = 19,
    MinimalData = 20,
    SigPushOnly = 21,
    SigHighS = 22,
    SigNullDummy = 23,
    PubkeyType = 24,
    CleanStack = 25,
    DiscourageUpgradableNops = 26,
    OpReturn = 27,
    UnknownError = 28,

    /// The transaction could not be deserialized.
    TxInvalid = 29,
    /// The declared length differs from the canonical serialization.
    TxSizeInvalid = 30,
    /// The input index is out of range.
    TxInputInvalid = 31,

    NegativeLocktime = 32,
    UnsatisfiedLocktime = 33,
    MinimalIf = 34,
    NullFail = 35,
    DiscourageUpgradableWitnessProgram = 36,
    WitnessProgramWrongLength = 37,
    WitnessProgramEmptyWitness = 38,
    WitnessProgramMismatch = 39,
    WitnessMalleated = 40,
    WitnessMalleatedP2sh = 41,
    WitnessUnexpected = 42,
    WitnessPubkeyType = 43,
    OpCodeSeparator = 44,
    SigFindAndDelete = 45,
}

impl VerifyResult {
    /// The ABI value of this result.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == VerifyResult::EvalTrue
    }
}

impl From<ScriptError> for VerifyResult {
    fn from(error: ScriptError) -> Self {
        script_error_to_verify_result(error)
    }
}

/// Maps an evaluator outcome to its public result. `Ok` is success.
pub fn script_error_to_verify_result(error: ScriptError) -> VerifyResult {
    match error {
        ScriptError::Ok => VerifyResult::EvalTrue,
        ScriptError::Unknown => VerifyResult::UnknownError,
        ScriptError::EvalFalse => VerifyResult::EvalFalse,
        ScriptError::OpReturn => VerifyResult::OpReturn,

        ScriptError::ScriptSize => VerifyResult::ScriptSize,
        ScriptError::PushSize => VerifyResult::PushSize,
        ScriptError::OpCount => VerifyResult::OpCount,
        ScriptError::StackSize => VerifyResult::StackSize,
        ScriptError::SigCount => VerifyResult::SigCount,
        ScriptError::PubkeyCount => VerifyResult::PubkeyCount,

        ScriptError::Verify => VerifyResult::Verify,
        ScriptError::EqualVerify => VerifyResult::EqualVerify,
        ScriptError::CheckMultiSigVerify => VerifyResult::CheckMultisigVerify,
        ScriptError::CheckSigVerify => VerifyResult::CheckSigVerify,
        ScriptError::NumEqualVerify => VerifyResult::NumEqualVerify,

        ScriptError::BadOpcode => VerifyResult::BadOpcode,
        ScriptError::DisabledOpcode => VerifyResult::DisabledOpcode,
        ScriptError::InvalidStackOperation => VerifyResult::InvalidStackOperation,
        ScriptError::InvalidAltstackOperation => VerifyResult::InvalidAltstackOperation,
        ScriptError::UnbalancedConditional => VerifyResult::UnbalancedConditional,

        ScriptError::NegativeLockTime => VerifyResult::NegativeLocktime,
        ScriptError::UnsatisfiedLockTime => VerifyResult::UnsatisfiedLocktime,

        ScriptError::SigHashType => VerifyResult::SigHashType,
        ScriptError::SigDer => VerifyResult::SigDer,
        ScriptError::MinimalData => VerifyResult::MinimalData,
        ScriptError::SigPushOnly => VerifyResult::SigPushOnly,
        ScriptError::SigHighS => VerifyResult::SigHighS,
        ScriptError::SigNullDummy => VerifyResult::SigNullDummy,
        ScriptError::PubkeyType => VerifyResult::PubkeyType,
        ScriptError::CleanStack => VerifyResult::CleanStack,
        ScriptError::MinimalIf => VerifyResult::MinimalIf,
        ScriptError::NullFail => VerifyResult::NullFail,

        ScriptError::DiscourageUpgradableNops => VerifyResult::DiscourageUpgradableNops,
        ScriptError::DiscourageUpgradableWitnessProgram => {
            VerifyResult::DiscourageUpgradableWitnessProgram
        }

        ScriptError::WitnessProgramWrongLength => VerifyResult::WitnessProgramWrongLength,
        ScriptError::WitnessProgramWitnessEmpty => VerifyResult::WitnessProgramEmptyWitness,
        ScriptError::WitnessProgramMismatch => VerifyResult::WitnessProgramMismatch,
        ScriptError::WitnessMalleated => VerifyResult::WitnessMalleated,
        ScriptError::WitnessMalleatedP2SH => VerifyResult::WitnessMalleatedP2sh,
        ScriptError::WitnessUnexpected => VerifyResult::WitnessUnexpected,
        ScriptError::WitnessPubkeyType => VerifyResult::WitnessPubkeyType,

        ScriptError::OpCodeSeparator => VerifyResult::OpCodeSeparator,
        ScriptError::SigFindAndDelete => VerifyResult::SigFindAndDelete,
    }
}

/// Maps a raw evaluator code. Codes outside the known set are `UnknownError`.
pub fn script_error_code_to_verify_result(code: u32) -> VerifyResult {
    ScriptError::try_from(code).map_or(VerifyResult::UnknownError, script_error_to_verify_result)
}

impl fmt::Display for VerifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use VerifyResult::*;

        let description = match *self {
            EvalFalse => "script evaluated to false",
            EvalTrue => "script evaluated to true",
            ScriptSize => "script is too big",
            PushSize => "push value size limit exceeded",
            OpCount => "operation limit exceeded",
            StackSize => "stack size limit exceeded",
            SigCount => "signature count negative or greater than pubkey count",
            PubkeyCount => "pubkey count negative or limit exceeded",
            Verify => "script failed an OP_VERIFY operation",
            EqualVerify => "script failed an OP_EQUALVERIFY operation",
            CheckMultisigVerify => "script failed an OP_CHECKMULTISIGVERIFY operation",
            CheckSigVerify => "script failed an OP_CHECKSIGVERIFY operation",
            NumEqualVerify => "script failed an OP_NUMEQUALVERIFY operation",
            BadOpcode => "opcode missing or not understood",
            DisabledOpcode => "attempted to use a disabled opcode",
            InvalidStackOperation => "operation not valid with the current stack size",
            InvalidAltstackOperation => "operation not valid with the current altstack size",
            UnbalancedConditional => "invalid OP_IF construction",
            SigHashType => "signature hash type missing or not understood",
            SigDer => "non-canonical DER signature",
            MinimalData => "data push larger than necessary",
            SigPushOnly => "only push operators allowed in signatures",
            SigHighS => "non-canonical signature: S value is unnecessarily high",
            SigNullDummy => "dummy CHECKMULTISIG argument must be zero",
            PubkeyType => "public key is neither compressed or uncompressed",
            CleanStack => "stack size must be exactly one after execution",
            DiscourageUpgradableNops => "NOPx reserved for soft-fork upgrades",
            OpReturn => "OP_RETURN was encountered",
            UnknownError => "unknown error",
            TxInvalid => "transaction could not be deserialized",
            TxSizeInvalid => "transaction length does not match its serialization",
            TxInputInvalid => "input index out of range",
            NegativeLocktime => "negative locktime",
            UnsatisfiedLocktime => "locktime requirement not satisfied",
            MinimalIf => "OP_IF/NOTIF argument must be minimal",
            NullFail => "signature must be zero for failed CHECK(MULTI)SIG operation",
            DiscourageUpgradableWitnessProgram => "witness version reserved for soft-fork upgrades",
            WitnessProgramWrongLength => "witness program has incorrect length",
            WitnessProgramEmptyWitness => "witness program was passed an empty witness",
            WitnessProgramMismatch => "witness program hash mismatch",
            WitnessMalleated => "witness requires empty scriptSig",
            WitnessMalleatedP2sh => "witness requires only-redeemscript scriptSig",
            WitnessUnexpected => "witness provided for non-witness script",
            WitnessPubkeyType => "using non-compressed keys in segwit",
            OpCodeSeparator => "using OP_CODESEPARATOR in non-witness script",
            SigFindAndDelete => "signature is found in scriptCode",
        };

        f.write_str(description)
    }
}
