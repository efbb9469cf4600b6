//! Hardened memory management utilities.
//!
//! This module contains thin wrappers around Sodium's [secure memory management
//! functions](https://doc.libsodium.org/memory_management), used internally to store hash states
//! and to handle the password-derived intermediate values of the SHA-crypt computation.
//!
//! Memory allocated with [`malloc`] is placed at the end of a page boundary, directly before a
//! guard page, with a canary before the allocated region to detect modifications on free. The
//! region is locked, so it will not be swapped to disk, and it is securely zeroed when freed.
//! Sodium's allocator has much more overhead than the standard system allocator, so it is only
//! used for state that may contain password material, never as a general-purpose allocator.
//!
//! [`eq`] provides the constant-time comparison used to check a recomputed hash string against a
//! stored one, and [`clear`] erases buffers in a way the compiler will not optimise away.

use crate::{require_init, NatronError};
use libsodium_sys as sodium;
use std::alloc::Layout;
use std::ptr::NonNull;

/// Allocate sufficient hardened memory to store a value of type `T`, returning a pointer to the
/// start of the allocated memory.
///
/// # Safety
/// This function returns a pointer to uninitialised memory, allocated outside of Rust's memory
/// management. As such, all the issues associated with manual memory management in languages like C
/// apply: Memory must be initialised before use, it must be freed exactly once, and not used after
/// having been freed. Memory allocated with this function must be freed using the [`free`] function
/// from this module.
pub unsafe fn malloc<T>() -> Result<NonNull<T>, NatronError> {
    // `Layout::new` creates a `Layout` with both the size & alignment requirements of `T`.
    let layout = Layout::new::<T>();
    Ok(malloc_layout(layout)?.cast())
}

/// Allocate a region of hardened memory which meets the size and alignment requirements of
/// `layout`.
///
/// The region of memory allocated may be larger that `layout.size()` if the layout size is not a
/// multiple of the layout alignment.
///
/// # Safety
/// This function returns a pointer to uninitialised memory. The same rules as for [`malloc`]
/// apply.
pub unsafe fn malloc_layout(layout: Layout) -> Result<NonNull<u8>, NatronError> {
    require_init()?;

    // Sodium places the allocated region at the end of a page boundary, so padding the layout
    // until its size is a multiple of the alignment guarantees the region is aligned correctly.
    let layout = layout.pad_to_align();
    let ptr = sodium::sodium_malloc(layout.size()) as *mut u8;

    NonNull::new(ptr).ok_or(NatronError::MemoryManagement)
}

/// Free the memory pointed to by `ptr`, previously allocated using [`malloc`]/[`malloc_layout`].
///
/// # Safety
/// This function should only be called with a pointer to memory previously allocated using
/// [`malloc`] or [`malloc_layout`] from this module. This function will cause the program to exit
/// if a buffer overflow is detected (i.e: the canary placed next to the allocated region has been
/// overwritten). This function must be called exactly once for each memory region allocated, and
/// after the region has been freed, it must not be used again.
pub unsafe fn free<T>(ptr: NonNull<T>) {
    // This function should only ever be called after calling `malloc`, which invokes
    // `require_init`, so we don't need to initialise Sodium again here.

    sodium::sodium_free(ptr.as_ptr() as *mut libc::c_void)
}

/// Constant time test for equality of two slices.
///
/// For the same input size, the time taken to compare the slices is always identical. Returns
/// true if the slices contain the same contents, false otherwise. Always returns false if the
/// slices are not of the same length.
pub fn eq(a: &[u8], b: &[u8]) -> Result<bool, NatronError> {
    require_init()?;

    if a.len() != b.len() {
        return Ok(false);
    }

    let comparison_result = unsafe {
        // SAFETY: This function expects two pointers to regions of memory of the same length,
        // specified by the third parameter. We check above to ensure that a and b are of the same
        // length. We use a.len() to specify the length, so it is correct for these slices. This
        // function will not modify the contents of either slice.
        sodium::sodium_memcmp(
            a.as_ptr() as *const libc::c_void,
            b.as_ptr() as *const libc::c_void,
            a.len(),
        )
    };

    Ok(comparison_result == 0)
}

/// Zero the contents of `buf`.
///
/// Compilers may remove a plain write of zeroes to memory which is never read again. This function
/// zeroes the memory in such a way that the compiler will not remove the operation.
pub fn clear(buf: &mut [u8]) -> Result<(), NatronError> {
    require_init()?;

    unsafe {
        // SAFETY: This function expects a pointer to a region of memory, and a number of bytes to
        // clear starting at that pointer. We pass a pointer to `buf`, and specify `buf.len()`
        // bytes should be cleared, which is exactly the size of `buf`. All zeroes is a valid
        // representation of a u8 slice.
        sodium::sodium_memzero(buf.as_mut_ptr() as *mut libc::c_void, buf.len());
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{clear, eq, free, malloc};
    use crate::{random, NatronError};
    use std::ptr::NonNull;

    #[test]
    fn malloc_allocates_and_free_deallocates() -> Result<(), NatronError> {
        unsafe {
            let mut ptr_a: NonNull<u8> = malloc()?;
            let a = ptr_a.as_mut();
            let mut ptr_b: NonNull<[u8; 1 << 3]> = malloc()?;
            let b = ptr_b.as_mut();
            let mut ptr_c: NonNull<[u64; 1 << 7]> = malloc()?;
            let c = ptr_c.as_mut();

            *a = 0xff;
            random::fill_random(b)?;
            c.fill(u64::MAX);

            free(ptr_a);
            free(ptr_b);
            free(ptr_c);

            Ok(())
        }
    }

    #[test]
    fn eq_tests() -> Result<(), NatronError> {
        let mut buf_a = [0; 1000];
        let mut buf_b = [0; 1000];

        random::fill_random(&mut buf_a)?;
        buf_b.copy_from_slice(&buf_a);

        assert!(eq(&buf_a, &buf_b)?);

        for i in 0..1000 {
            assert!(eq(&buf_a[..i], &buf_b[..i])?);
        }

        assert!(!eq(&buf_a[..500], &buf_b[..501])?);

        buf_b[..500].copy_from_slice(&[0; 500]);

        assert!(!eq(&buf_a, &buf_b)?);
        assert!(!eq(&buf_a[..500], &buf_b[..500])?);
        assert!(eq(&buf_a[500..], &buf_b[500..])?);

        Ok(())
    }

    #[test]
    fn eq_hash_strings() -> Result<(), NatronError> {
        let stored = b"$5$saltstring$5B8vYYiY.CVt1RlTTf8KbXBH3hsxY/GNooZaBBGWEc5";
        let mut recomputed = *stored;
        assert!(eq(stored, &recomputed)?);

        recomputed[recomputed.len() - 1] = b'6';
        assert!(!eq(stored, &recomputed)?);
        assert!(!eq(stored, &stored[..stored.len() - 1])?);

        Ok(())
    }

    #[test]
    fn clear_tests() -> Result<(), NatronError> {
        for _ in 0..1000 {
            let mut buf = vec![0; random::random_u32_in_range(0, 1000)? as usize];
            random::fill_random(&mut buf)?;
            clear(&mut buf)?;
            assert_eq!(&buf, &vec![0; buf.len()]);
        }

        Ok(())
    }
}
