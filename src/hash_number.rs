//! 256-bit proof-of-work target and work arithmetic.

use core::{
    cmp::Ordering,
    ops::{Add, AddAssign, Div, DivAssign, MulAssign, Not, Shl, ShlAssign},
};

use bitcoin::{hashes::Hash, BlockHash};

const LIMBS: usize = 4;

/// Reasons a compact target encoding is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CompactTargetError {
    #[error("compact target has its sign bit set")]
    Negative,
    #[error("compact target does not fit in 256 bits")]
    Overflow,
}

/// Unsigned 256-bit magnitude for targets and accumulated work.
///
/// Stored as little-endian 64-bit limbs. The compact form is the nBits
/// encoding used in block headers: one size byte followed by a 24-bit
/// mantissa whose top bit is a sign bit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashNumber {
    limbs: [u64; LIMBS],
}

impl HashNumber {
    pub const ZERO: Self = Self { limbs: [0; LIMBS] };
    pub const ONE: Self = Self { limbs: [1, 0, 0, 0] };
    pub const MAX: Self = Self { limbs: [u64::MAX; LIMBS] };

    /// Decodes a compact target.
    pub fn from_compact(compact: u32) -> Result<Self, CompactTargetError> {
        let mut number = Self::ZERO;
        number.set_compact(compact)?;
        Ok(number)
    }

    /// Decodes a compact target in place. On error the value is zero.
    pub fn set_compact(&mut self, compact: u32) -> Result<(), CompactTargetError> {
        let size = compact >> 24;
        let mut word = compact & 0x007f_ffff;

        *self = Self::ZERO;
        if size <= 3 {
            word >>= 8 * (3 - size);
        }
        if word != 0 && compact & 0x0080_0000 != 0 {
            return Err(CompactTargetError::Negative);
        }
        if word != 0 && (size > 34 || (word > 0xff && size > 33) || (word > 0xffff && size > 32)) {
            return Err(CompactTargetError::Overflow);
        }

        *self = Self::from(u64::from(word));
        if size > 3 {
            *self = self.shl_bits(8 * (size - 3));
        }
        Ok(())
    }

    /// Minimal compact encoding. Values wider than the mantissa lose their
    /// low bits.
    pub fn compact(&self) -> u32 {
        let mut size = (self.bits() + 7) / 8;
        let mut compact = if size <= 3 {
            (self.low_u64() << (8 * (3 - size))) as u32
        } else {
            self.shr_bits(8 * (size - 3)).low_u64() as u32
        };
        // the mantissa's top bit is read as a sign
        if compact & 0x0080_0000 != 0 {
            compact >>= 8;
            size += 1;
        }
        compact | (size << 24)
    }

    /// Interprets a digest in its internal (little-endian) byte order.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        let mut number = Self::ZERO;
        number.set_hash(hash);
        number
    }

    pub fn set_hash(&mut self, hash: [u8; 32]) {
        for (limb, chunk) in self.limbs.iter_mut().zip(hash.chunks_exact(8)) {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(chunk);
            *limb = u64::from_le_bytes(bytes);
        }
    }

    pub fn hash(&self) -> [u8; 32] {
        let mut hash = [0u8; 32];
        for (chunk, limb) in hash.chunks_exact_mut(8).zip(self.limbs) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        hash
    }

    /// Expected number of hashes needed to meet `target`.
    pub fn work_from_target(target: &Self) -> Self {
        if target.is_zero() {
            return Self::ZERO;
        }
        match target.checked_add(&Self::ONE) {
            Some(divisor) => (!*target / divisor) + Self::ONE,
            // the largest target: !target is zero
            None => Self::ONE,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|&limb| limb == 0)
    }

    /// Position of the highest set bit plus one; zero for zero.
    pub fn bits(&self) -> u32 {
        for (idx, &limb) in self.limbs.iter().enumerate().rev() {
            if limb != 0 {
                return 64 * idx as u32 + (64 - limb.leading_zeros());
            }
        }
        0
    }

    pub fn low_u64(&self) -> u64 {
        self.limbs[0]
    }

    pub fn checked_mul_u32(&self, rhs: u32) -> Option<Self> {
        let mut out = Self::ZERO;
        let mut carry = 0u128;
        for (dst, &limb) in out.limbs.iter_mut().zip(&self.limbs) {
            let product = u128::from(limb) * u128::from(rhs) + carry;
            *dst = product as u64;
            carry = product >> 64;
        }
        (carry == 0).then_some(out)
    }

    /// `None` when `rhs` is zero.
    pub fn checked_div_u32(&self, rhs: u32) -> Option<Self> {
        if rhs == 0 {
            return None;
        }
        let divisor = u128::from(rhs);
        let mut out = Self::ZERO;
        let mut remainder = 0u128;
        for idx in (0..LIMBS).rev() {
            let current = (remainder << 64) | u128::from(self.limbs[idx]);
            out.limbs[idx] = (current / divisor) as u64;
            remainder = current % divisor;
        }
        Some(out)
    }

    /// Long division; `None` when `rhs` is zero.
    pub fn checked_div(&self, rhs: &Self) -> Option<Self> {
        let divisor_bits = rhs.bits();
        if divisor_bits == 0 {
            return None;
        }
        let numerator_bits = self.bits();
        if divisor_bits > numerator_bits {
            return Some(Self::ZERO);
        }

        let mut remainder = *self;
        let mut shift = numerator_bits - divisor_bits;
        let mut divisor = rhs.shl_bits(shift);
        let mut quotient = Self::ZERO;
        loop {
            if remainder >= divisor {
                remainder = remainder.wrapping_sub(&divisor);
                quotient.limbs[(shift / 64) as usize] |= 1 << (shift % 64);
            }
            if shift == 0 {
                break;
            }
            divisor = divisor.shr_bits(1);
            shift -= 1;
        }
        Some(quotient)
    }

    pub fn checked_add(&self, rhs: &Self) -> Option<Self> {
        let mut out = Self::ZERO;
        let mut carry = false;
        for idx in 0..LIMBS {
            let (sum, first) = self.limbs[idx].overflowing_add(rhs.limbs[idx]);
            let (sum, second) = sum.overflowing_add(u64::from(carry));
            out.limbs[idx] = sum;
            carry = first || second;
        }
        (!carry).then_some(out)
    }

    /// `None` when a set bit would be shifted out.
    pub fn checked_shl(&self, shift: u32) -> Option<Self> {
        if self.is_zero() {
            return Some(Self::ZERO);
        }
        if shift > 256 - self.bits() {
            return None;
        }
        Some(self.shl_bits(shift))
    }

    fn shl_bits(&self, shift: u32) -> Self {
        let mut out = Self::ZERO;
        if shift >= 256 {
            return out;
        }
        let limb_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for idx in (limb_shift..LIMBS).rev() {
            let src = idx - limb_shift;
            out.limbs[idx] = self.limbs[src] << bit_shift;
            if bit_shift != 0 && src > 0 {
                out.limbs[idx] |= self.limbs[src - 1] >> (64 - bit_shift);
            }
        }
        out
    }

    fn shr_bits(&self, shift: u32) -> Self {
        let mut out = Self::ZERO;
        if shift >= 256 {
            return out;
        }
        let limb_shift = (shift / 64) as usize;
        let bit_shift = shift % 64;
        for idx in 0..LIMBS - limb_shift {
            let src = idx + limb_shift;
            out.limbs[idx] = self.limbs[src] >> bit_shift;
            if bit_shift != 0 && src + 1 < LIMBS {
                out.limbs[idx] |= self.limbs[src + 1] << (64 - bit_shift);
            }
        }
        out
    }

    fn wrapping_sub(&self, rhs: &Self) -> Self {
        let mut out = Self::ZERO;
        let mut borrow = false;
        for idx in 0..LIMBS {
            let (diff, first) = self.limbs[idx].overflowing_sub(rhs.limbs[idx]);
            let (diff, second) = diff.overflowing_sub(u64::from(borrow));
            out.limbs[idx] = diff;
            borrow = first || second;
        }
        out
    }
}

impl From<u64> for HashNumber {
    fn from(value: u64) -> Self {
        Self {
            limbs: [value, 0, 0, 0],
        }
    }
}

impl From<BlockHash> for HashNumber {
    fn from(hash: BlockHash) -> Self {
        Self::from_hash(hash.to_byte_array())
    }
}

impl Ord for HashNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.limbs.iter().rev().cmp(other.limbs.iter().rev())
    }
}

impl PartialOrd for HashNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u64> for HashNumber {
    fn eq(&self, other: &u64) -> bool {
        self.limbs[0] == *other && self.limbs[1..].iter().all(|&limb| limb == 0)
    }
}

impl Not for HashNumber {
    type Output = Self;

    fn not(self) -> Self {
        Self {
            limbs: self.limbs.map(|limb| !limb),
        }
    }
}

impl MulAssign<u32> for HashNumber {
    fn mul_assign(&mut self, rhs: u32) {
        *self = self
            .checked_mul_u32(rhs)
            .unwrap_or_else(|| panic!("HashNumber multiplication overflow"));
    }
}

impl DivAssign<u32> for HashNumber {
    fn div_assign(&mut self, rhs: u32) {
        *self = self
            .checked_div_u32(rhs)
            .unwrap_or_else(|| panic!("attempt to divide HashNumber by zero"));
    }
}

impl DivAssign for HashNumber {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl Div for HashNumber {
    type Output = Self;

    fn div(self, rhs: Self) -> Self {
        self.checked_div(&rhs)
            .unwrap_or_else(|| panic!("attempt to divide HashNumber by zero"))
    }
}

impl AddAssign for HashNumber {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Add for HashNumber {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        self.checked_add(&rhs)
            .unwrap_or_else(|| panic!("HashNumber addition overflow"))
    }
}

impl Shl<u32> for HashNumber {
    type Output = Self;

    fn shl(self, shift: u32) -> Self {
        self.checked_shl(shift)
            .unwrap_or_else(|| panic!("HashNumber shift overflow"))
    }
}

impl ShlAssign<u32> for HashNumber {
    fn shl_assign(&mut self, shift: u32) {
        *self = *self << shift;
    }
}
