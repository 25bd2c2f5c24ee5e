//! C ABI entry point.
//!
//! Mirrors [`crate::verify_script`] over raw pointers. The return value is a
//! [`VerifyResult`] discriminant, or the negative [`InvalidArgument`] code
//! when the arguments themselves are unusable.

use core::ffi::c_int;
use core::slice;
use std::panic::{self, AssertUnwindSafe};

use crate::{verify_script, InvalidArgument, VerifyResult};

/// Verifies input `input_index` of a serialized transaction against the
/// output it spends.
///
/// # Safety
///
/// `transaction` must be valid for reads of `transaction_size` bytes and
/// `prevout_script` for reads of `prevout_script_size` bytes, for the whole
/// call. Either pointer may be null only when its size is zero.
#[no_mangle]
pub unsafe extern "C" fn consensus_verify_script(
    transaction: *const u8,
    transaction_size: usize,
    prevout_script: *const u8,
    prevout_script_size: usize,
    prevout_value: u64,
    input_index: u32,
    flags: u32,
) -> c_int {
    let transaction = match borrow_buffer(transaction, transaction_size) {
        Some(bytes) => bytes,
        None => return reject(InvalidArgument::Transaction),
    };
    let prevout_script = match borrow_buffer(prevout_script, prevout_script_size) {
        Some(bytes) => bytes,
        None => return reject(InvalidArgument::PrevoutScript),
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        verify_script(transaction, prevout_script, prevout_value, input_index, flags)
    }));

    match outcome {
        Ok(Ok(result)) => result.code(),
        Ok(Err(err)) => reject(err),
        Err(_) => {
            tracing::debug!("panic contained at the C boundary");
            VerifyResult::UnknownError.code()
        }
    }
}

/// `None` for a null pointer with a nonzero length.
///
/// # Safety
///
/// A non-null `data` must be valid for reads of `len` bytes for `'a`.
unsafe fn borrow_buffer<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        return None;
    }
    // SAFETY: non-null and the caller guarantees `len` readable bytes.
    Some(unsafe { slice::from_raw_parts(data, len) })
}

fn reject(err: InvalidArgument) -> c_int {
    tracing::debug!(%err, "invalid argument at the C boundary");
    err.code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::ptr;

    #[test]
    fn null_buffers_with_length_are_rejected() {
        let script = [0x51u8];
        let code = unsafe {
            consensus_verify_script(ptr::null(), 10, script.as_ptr(), script.len(), 0, 0, 0)
        };
        assert_eq!(code, InvalidArgument::Transaction.code());

        let tx = [0u8; 10];
        let code =
            unsafe { consensus_verify_script(tx.as_ptr(), tx.len(), ptr::null(), 1, 0, 0, 0) };
        assert_eq!(code, InvalidArgument::PrevoutScript.code());
    }

    #[test]
    fn null_buffers_without_length_are_empty() {
        let code = unsafe { consensus_verify_script(ptr::null(), 0, ptr::null(), 0, 0, 0, 0) };
        assert_eq!(code, VerifyResult::TxInvalid.code());
    }

    #[test]
    fn oversized_value_is_rejected() {
        let tx = [0u8; 4];
        let code = unsafe {
            consensus_verify_script(tx.as_ptr(), tx.len(), ptr::null(), 0, u64::MAX, 0, 0)
        };
        assert_eq!(code, -3);
    }
}
