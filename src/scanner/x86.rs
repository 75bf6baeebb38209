// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `x86_64` vectorized implementations.
//!
//! Feature availability is probed once with `is_x86_feature_detected!` and
//! cached in a `OnceLock`, the same pattern `memchr` uses to avoid paying
//! the CPUID cost on every call. [`avx2::get`] returns a zero-sized
//! [`avx2::Finder`] token only when the running CPU actually has AVX2;
//! [`sse2::get`] always returns one since SSE2 is part of the `x86_64`
//! baseline.

use super::fallback;

/// 32-byte-lane AVX2 routines.
pub mod avx2 {
    use std::arch::x86_64::*;
    use std::sync::OnceLock;

    use super::fallback;

    const WIDTH: usize = 32;

    #[derive(Clone, Copy)]
    pub struct Finder(());

    static AVAILABLE: OnceLock<bool> = OnceLock::new();

    #[inline]
    pub fn get() -> Option<Finder> {
        let avail =
            *AVAILABLE.get_or_init(|| is_x86_feature_detected!("avx2"));
        if avail {
            Some(Finder(()))
        } else {
            None
        }
    }

    impl Finder {
        /// # Safety
        ///
        /// Callers must only obtain a `Finder` through [`get`], which
        /// guarantees AVX2 is available on the running CPU.
        #[target_feature(enable = "avx2")]
        pub unsafe fn find_byte(
            &self,
            haystack: &[u8],
            b: u8,
        ) -> Option<usize> {
            let target = _mm256_set1_epi8(b as i8);
            let mut i = 0;
            while i + WIDTH <= haystack.len() {
                let chunk = _mm256_loadu_si256(
                    haystack.as_ptr().add(i) as *const __m256i
                );
                let eq = _mm256_cmpeq_epi8(chunk, target);
                let mask = _mm256_movemask_epi8(eq) as u32;
                if mask != 0 {
                    return Some(i + mask.trailing_zeros() as usize);
                }
                i += WIDTH;
            }
            fallback::find_byte(&haystack[i..], b).map(|p| p + i)
        }

        /// # Safety
        /// See [`Finder::find_byte`].
        #[target_feature(enable = "avx2")]
        pub unsafe fn count_byte(&self, haystack: &[u8], b: u8) -> usize {
            let target = _mm256_set1_epi8(b as i8);
            let mut i = 0;
            let mut total = 0usize;
            while i + WIDTH <= haystack.len() {
                let chunk = _mm256_loadu_si256(
                    haystack.as_ptr().add(i) as *const __m256i
                );
                let eq = _mm256_cmpeq_epi8(chunk, target);
                let mask = _mm256_movemask_epi8(eq) as u32;
                total += mask.count_ones() as usize;
                i += WIDTH;
            }
            total + fallback::count_byte(&haystack[i..], b)
        }

        /// Two-byte fingerprint substring search, see module docs on
        /// [`crate::scanner`].
        ///
        /// # Safety
        /// See [`Finder::find_byte`]. Additionally, `needle.len() >= 2`.
        #[target_feature(enable = "avx2")]
        pub unsafe fn find_substring(
            &self,
            haystack: &[u8],
            needle: &[u8],
        ) -> Option<usize> {
            debug_assert!(needle.len() >= 2);
            let last_offset = needle.len() - 1;
            if needle.len() > haystack.len() {
                return None;
            }
            let v_first = _mm256_set1_epi8(needle[0] as i8);
            let v_last = _mm256_set1_epi8(needle[last_offset] as i8);

            let mut i = 0;
            // Stop once a full chunk starting at `i` plus the needle's
            // trailing byte offset would run past the haystack.
            let last_start = haystack.len() - needle.len();
            while i <= last_start {
                let remaining = haystack.len() - i;
                if remaining < WIDTH + last_offset {
                    break;
                }
                let chunk_first = _mm256_loadu_si256(
                    haystack.as_ptr().add(i) as *const __m256i
                );
                let chunk_last = _mm256_loadu_si256(
                    haystack.as_ptr().add(i + last_offset) as *const __m256i
                );
                let eq_first = _mm256_cmpeq_epi8(chunk_first, v_first);
                let eq_last = _mm256_cmpeq_epi8(chunk_last, v_last);
                let mut mask =
                    (_mm256_movemask_epi8(eq_first)
                        & _mm256_movemask_epi8(eq_last)) as u32;
                while mask != 0 {
                    let bit = mask.trailing_zeros() as usize;
                    let start = i + bit;
                    if start <= last_start
                        && &haystack[start..start + needle.len()] == needle
                    {
                        return Some(start);
                    }
                    mask &= mask - 1;
                }
                i += WIDTH;
            }
            fallback::find_substring(&haystack[i..], needle).map(|p| p + i)
        }
    }
}

/// 16-byte-lane SSE2 routines. SSE2 is guaranteed to be present on every
/// `x86_64` CPU, so [`get`] never returns `None`; it exists for symmetry
/// with [`avx2::get`] and to keep the call site in `scanner::mod` uniform.
pub mod sse2 {
    use std::arch::x86_64::*;

    use super::fallback;

    const WIDTH: usize = 16;

    #[derive(Clone, Copy)]
    pub struct Finder(());

    #[inline]
    pub fn get() -> Option<Finder> {
        Some(Finder(()))
    }

    impl Finder {
        /// # Safety
        /// SSE2 is part of the `x86_64` baseline; always safe to call.
        #[target_feature(enable = "sse2")]
        pub unsafe fn find_byte(
            &self,
            haystack: &[u8],
            b: u8,
        ) -> Option<usize> {
            let target = _mm_set1_epi8(b as i8);
            let mut i = 0;
            while i + WIDTH <= haystack.len() {
                let chunk = _mm_loadu_si128(
                    haystack.as_ptr().add(i) as *const __m128i
                );
                let eq = _mm_cmpeq_epi8(chunk, target);
                let mask = _mm_movemask_epi8(eq) as u32;
                if mask != 0 {
                    return Some(i + mask.trailing_zeros() as usize);
                }
                i += WIDTH;
            }
            fallback::find_byte(&haystack[i..], b).map(|p| p + i)
        }

        /// # Safety
        /// See [`Finder::find_byte`].
        #[target_feature(enable = "sse2")]
        pub unsafe fn count_byte(&self, haystack: &[u8], b: u8) -> usize {
            let target = _mm_set1_epi8(b as i8);
            let mut i = 0;
            let mut total = 0usize;
            while i + WIDTH <= haystack.len() {
                let chunk = _mm_loadu_si128(
                    haystack.as_ptr().add(i) as *const __m128i
                );
                let eq = _mm_cmpeq_epi8(chunk, target);
                let mask = _mm_movemask_epi8(eq) as u32;
                total += mask.count_ones() as usize;
                i += WIDTH;
            }
            total + fallback::count_byte(&haystack[i..], b)
        }

        /// # Safety
        /// See [`Finder::find_byte`]. Additionally, `needle.len() >= 2`.
        #[target_feature(enable = "sse2")]
        pub unsafe fn find_substring(
            &self,
            haystack: &[u8],
            needle: &[u8],
        ) -> Option<usize> {
            debug_assert!(needle.len() >= 2);
            let last_offset = needle.len() - 1;
            if needle.len() > haystack.len() {
                return None;
            }
            let v_first = _mm_set1_epi8(needle[0] as i8);
            let v_last = _mm_set1_epi8(needle[last_offset] as i8);

            let mut i = 0;
            let last_start = haystack.len() - needle.len();
            while i <= last_start {
                let remaining = haystack.len() - i;
                if remaining < WIDTH + last_offset {
                    break;
                }
                let chunk_first = _mm_loadu_si128(
                    haystack.as_ptr().add(i) as *const __m128i
                );
                let chunk_last = _mm_loadu_si128(
                    haystack.as_ptr().add(i + last_offset) as *const __m128i
                );
                let eq_first = _mm_cmpeq_epi8(chunk_first, v_first);
                let eq_last = _mm_cmpeq_epi8(chunk_last, v_last);
                let mut mask =
                    (_mm_movemask_epi8(eq_first)
                        & _mm_movemask_epi8(eq_last)) as u32;
                while mask != 0 {
                    let bit = mask.trailing_zeros() as usize;
                    let start = i + bit;
                    if start <= last_start
                        && &haystack[start..start + needle.len()] == needle
                    {
                        return Some(start);
                    }
                    mask &= mask - 1;
                }
                i += WIDTH;
            }
            fallback::find_substring(&haystack[i..], needle).map(|p| p + i)
        }
    }
}
