//! Public verification flags and their translation to the evaluator's layout.
//!
//! The public bit positions are part of the ABI and only ever grow. The
//! evaluator keeps its own [`ScriptFlags`] layout; the two are joined by an
//! explicit table rather than by assuming equal bit values.

use crate::script::ScriptFlags;

/// Do not enable any verification.
pub const VERIFY_FLAGS_NONE: u32 = 0;
/// Evaluate P2SH (BIP16) subscripts.
pub const VERIFY_FLAGS_P2SH: u32 = 1 << 0;
/// Enforce strict ECDSA encoding (BIP62).
pub const VERIFY_FLAGS_STRICTENC: u32 = 1 << 1;
/// Enforce strict DER (BIP66) compliance.
pub const VERIFY_FLAGS_DERSIG: u32 = 1 << 2;
/// Require signatures to use low-S form (BIP62).
pub const VERIFY_FLAGS_LOW_S: u32 = 1 << 3;
/// Enforce NULLDUMMY (BIP147).
pub const VERIFY_FLAGS_NULLDUMMY: u32 = 1 << 4;
/// Require scriptSig to be push only.
pub const VERIFY_FLAGS_SIGPUSHONLY: u32 = 1 << 5;
/// Require minimal data encodings (BIP62).
pub const VERIFY_FLAGS_MINIMALDATA: u32 = 1 << 6;
/// Discourage use of upgradable NOP opcodes.
pub const VERIFY_FLAGS_DISCOURAGE_UPGRADABLE_NOPS: u32 = 1 << 7;
/// Require a clean stack after evaluation.
pub const VERIFY_FLAGS_CLEANSTACK: u32 = 1 << 8;
/// Enable CHECKLOCKTIMEVERIFY (BIP65).
pub const VERIFY_FLAGS_CHECKLOCKTIMEVERIFY: u32 = 1 << 9;
/// Enable CHECKSEQUENCEVERIFY (BIP112).
pub const VERIFY_FLAGS_CHECKSEQUENCEVERIFY: u32 = 1 << 10;
/// Enable WITNESS (BIP141).
pub const VERIFY_FLAGS_WITNESS: u32 = 1 << 11;
/// Discourage unknown witness program versions.
pub const VERIFY_FLAGS_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: u32 = 1 << 12;
/// Require minimal encodings for IF/NOTIF.
pub const VERIFY_FLAGS_MINIMALIF: u32 = 1 << 13;
/// Enforce NULLFAIL behaviour (BIP146).
pub const VERIFY_FLAGS_NULLFAIL: u32 = 1 << 14;
/// Require compressed pubkeys in segwit v0 contexts.
pub const VERIFY_FLAGS_WITNESS_PUBKEYTYPE: u32 = 1 << 15;
/// Fail on OP_CODESEPARATOR and FindAndDelete matches in legacy script.
pub const VERIFY_FLAGS_CONST_SCRIPTCODE: u32 = 1 << 16;

/// Soft-fork flags enforced on mainnet blocks before Taproot.
pub const VERIFY_FLAGS_MANDATORY: u32 = VERIFY_FLAGS_P2SH
    | VERIFY_FLAGS_DERSIG
    | VERIFY_FLAGS_NULLDUMMY
    | VERIFY_FLAGS_CHECKLOCKTIMEVERIFY
    | VERIFY_FLAGS_CHECKSEQUENCEVERIFY
    | VERIFY_FLAGS_WITNESS;

const FLAG_TABLE: [(u32, ScriptFlags); 17] = [
    (VERIFY_FLAGS_P2SH, ScriptFlags::P2SH),
    (VERIFY_FLAGS_STRICTENC, ScriptFlags::STRICTENC),
    (VERIFY_FLAGS_DERSIG, ScriptFlags::DERSIG),
    (VERIFY_FLAGS_LOW_S, ScriptFlags::LOW_S),
    (VERIFY_FLAGS_NULLDUMMY, ScriptFlags::NULLDUMMY),
    (VERIFY_FLAGS_SIGPUSHONLY, ScriptFlags::SIGPUSHONLY),
    (VERIFY_FLAGS_MINIMALDATA, ScriptFlags::MINIMALDATA),
    (VERIFY_FLAGS_DISCOURAGE_UPGRADABLE_NOPS, ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS),
    (VERIFY_FLAGS_CLEANSTACK, ScriptFlags::CLEANSTACK),
    (VERIFY_FLAGS_CHECKLOCKTIMEVERIFY, ScriptFlags::CHECKLOCKTIMEVERIFY),
    (VERIFY_FLAGS_CHECKSEQUENCEVERIFY, ScriptFlags::CHECKSEQUENCEVERIFY),
    (VERIFY_FLAGS_WITNESS, ScriptFlags::WITNESS),
    (
        VERIFY_FLAGS_DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
        ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM,
    ),
    (VERIFY_FLAGS_MINIMALIF, ScriptFlags::MINIMALIF),
    (VERIFY_FLAGS_NULLFAIL, ScriptFlags::NULLFAIL),
    (VERIFY_FLAGS_WITNESS_PUBKEYTYPE, ScriptFlags::WITNESS_PUBKEYTYPE),
    (VERIFY_FLAGS_CONST_SCRIPTCODE, ScriptFlags::CONST_SCRIPTCODE),
];

/// Translates a public flag set into evaluator flags.
///
/// Bits without a public meaning are ignored. No flag implies another.
pub fn verify_flags_to_script_flags(flags: u32) -> ScriptFlags {
    FLAG_TABLE
        .iter()
        .filter(|(public, _)| flags & public != 0)
        .fold(ScriptFlags::NONE, |acc, &(_, internal)| acc | internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_PUBLIC: u32 = (1 << 17) - 1;

    #[test]
    fn zero_translates_to_none() {
        assert_eq!(verify_flags_to_script_flags(VERIFY_FLAGS_NONE), ScriptFlags::NONE);
    }

    #[test]
    fn each_bit_sets_exactly_its_counterpart() {
        for (public, internal) in FLAG_TABLE {
            assert_eq!(public.count_ones(), 1);
            assert_eq!(verify_flags_to_script_flags(public), internal, "bit {public:#x}");
        }
    }

    #[test]
    fn public_bit_positions_are_remapped() {
        // Internal bit 0 is STRICTENC while public bit 0 is P2SH.
        let flags = verify_flags_to_script_flags(1 << 0);
        assert_eq!(flags, ScriptFlags::P2SH);
        assert!(!flags.intersects(ScriptFlags::STRICTENC));

        let flags = verify_flags_to_script_flags(VERIFY_FLAGS_STRICTENC | VERIFY_FLAGS_LOW_S);
        assert_eq!(flags, ScriptFlags::STRICTENC | ScriptFlags::LOW_S);
        assert!(!flags.intersects(ScriptFlags::DERSIG | ScriptFlags::NULLDUMMY));
    }

    #[test]
    fn table_covers_every_public_bit_once() {
        let public = FLAG_TABLE.iter().fold(0u32, |acc, &(bit, _)| {
            assert_eq!(acc & bit, 0, "duplicate bit {bit:#x}");
            acc | bit
        });
        assert_eq!(public, ALL_PUBLIC);

        let internal = FLAG_TABLE
            .iter()
            .fold(ScriptFlags::NONE, |acc, &(_, flag)| {
                assert!(!acc.intersects(flag));
                acc | flag
            });
        assert_eq!(verify_flags_to_script_flags(ALL_PUBLIC), internal);
    }

    #[test]
    fn unknown_bits_are_ignored() {
        assert_eq!(verify_flags_to_script_flags(!ALL_PUBLIC), ScriptFlags::NONE);
        assert_eq!(
            verify_flags_to_script_flags(u32::MAX),
            verify_flags_to_script_flags(ALL_PUBLIC)
        );
    }

    #[test]
    fn mandatory_set() {
        let flags = verify_flags_to_script_flags(VERIFY_FLAGS_MANDATORY);
        assert!(flags.contains(ScriptFlags::P2SH | ScriptFlags::WITNESS));
        assert!(!flags.intersects(ScriptFlags::CLEANSTACK | ScriptFlags::LOW_S));
    }

    proptest! {
        #[test]
        fn translation_is_or_homomorphic(a in any::<u32>(), b in any::<u32>()) {
            prop_assert_eq!(
                verify_flags_to_script_flags(a | b),
                verify_flags_to_script_flags(a) | verify_flags_to_script_flags(b)
            );
        }

        #[test]
        fn translation_is_idempotent(a in any::<u32>()) {
            let once = verify_flags_to_script_flags(a);
            prop_assert_eq!(once, verify_flags_to_script_flags(a));
            prop_assert_eq!(once, verify_flags_to_script_flags(a & ALL_PUBLIC));
        }
    }
}
