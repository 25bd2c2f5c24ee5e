use core::ops::{BitOr, BitOrAssign};

/// Evaluator verification flags.
///
/// This is the evaluator's own bitset. Callers outside the crate speak the
/// public `VERIFY_FLAGS_*` layout, which is translated in [`crate::flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScriptFlags(u32);

impl ScriptFlags {
    pub const NONE: Self = Self(0);

    // Signature and public key encoding.

    /// Passing a non-strict-DER signature or an undefined hashtype fails.
    pub const STRICTENC: Self = Self(1 << 0);
    /// Enforce strict DER (BIP66) compliance.
    pub const DERSIG: Self = Self(1 << 1);
    pub const LOW_S: Self = Self(1 << 2);
    pub const NULLFAIL: Self = Self(1 << 3);
    /// Segwit script only: public keys must be compressed.
    pub const WITNESS_PUBKEYTYPE: Self = Self(1 << 4);

    // Script shape.

    pub const SIGPUSHONLY: Self = Self(1 << 8);
    pub const MINIMALDATA: Self = Self(1 << 9);
    /// Segwit script only: require minimal OP_IF/OP_NOTIF arguments.
    pub const MINIMALIF: Self = Self(1 << 10);
    pub const CLEANSTACK: Self = Self(1 << 11);
    /// Enforce NULLDUMMY (BIP147).
    pub const NULLDUMMY: Self = Self(1 << 12);
    /// Making OP_CODESEPARATOR and FindAndDelete fail in legacy script.
    pub const CONST_SCRIPTCODE: Self = Self(1 << 13);

    // Soft-fork evaluation rules.

    /// Evaluate P2SH (BIP16) subscripts.
    pub const P2SH: Self = Self(1 << 16);
    /// Enable WITNESS (BIP141).
    pub const WITNESS: Self = Self(1 << 17);
    /// Enable CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: Self = Self(1 << 18);
    /// Enable CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: Self = Self(1 << 19);

    // Upgrade hooks.

    pub const DISCOURAGE_UPGRADABLE_NOPS: Self = Self(1 << 24);
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: Self = Self(1 << 25);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any bit of `other` is set.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}
