//! Coco runtime library (`libcoco_rt`)
//!
//! Provides the check primitive that instrumented programs call before
//! every checked pointer-arithmetic site.
//!
//! # Build Modes
//!
//! - **rlib**: for Rust consumers and tests
//! - **staticlib**: for linking into instrumented programs (`libcoco_rt.a`)
//!
//! # Safety
//!
//! [`__coco_check_bounds`] uses `#[no_mangle]` and `extern "C"` for FFI
//! compatibility. It takes plain integers, so it is safe to call from Rust.

#![allow(
    unsafe_code,
    reason = "the C-ABI entry point needs an unmangled symbol"
)]

/// An access outside `[0, array_size)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Array access out of bounds. offset: {offset}, array_size: {array_size}")]
pub struct BoundsViolation {
    pub offset: i64,
    pub array_size: i64,
}

/// Check that `offset` is a valid element index for an array of
/// `array_size` elements.
pub fn check(offset: i64, array_size: i64) -> Result<(), BoundsViolation> {
    if offset < 0 || offset >= array_size {
        Err(BoundsViolation { offset, array_size })
    } else {
        Ok(())
    }
}

/// Runtime check emitted by the instrumentor.
///
/// Returns normally for an in-bounds access. Otherwise prints the violation
/// to stderr and terminates the process with status 1.
#[no_mangle]
pub extern "C" fn __coco_check_bounds(offset: i64, array_size: i64) {
    if let Err(violation) = check(offset, array_size) {
        eprintln!("{violation}");
        std::process::exit(1);
    }
}
