//! Growable byte buffers with a pluggable allocator policy.
//!
//! This is the I/O currency type for the rest of the rinoo workspace:
//! sockets, files and the inotify stream all read into and write out of
//! a [`Buffer`] rather than a plain `Vec<u8>`, so the same buffer can be
//! backed by the global heap, a caller-owned fixed region, or a custom
//! allocator class without the call sites changing.
//!
//! Kept dependency-free of `rinoo-driver`/`rinoo-runtime` so a buffer can
//! be built and manipulated with no scheduler in scope.

mod base64;
mod buffer;
mod class;
mod error;
mod hash;
mod parse;

pub use buffer::Buffer;
pub use class::{BufferClass, BufferClassBuilder, DEFAULT as DEFAULT_CLASS, STATIC as STATIC_CLASS};
pub use error::BufferError;

/// Base64 helpers, grounded in `rn_buffer_b64encode`.
pub mod b64 {
    pub use crate::base64::encode;
}

/// Numeric parsing helpers, grounded in `rn_buffer_tolong` and siblings.
pub mod parsing {
    pub use crate::parse::{to_f32, to_f64, to_i64, to_u64};
}

/// Content hashing, grounded in `rinoo/global/murmurhash3.h`.
pub mod hashing {
    pub use crate::hash::murmur3_32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_add_grows_capacity() {
        let mut buf = Buffer::new().unwrap();
        assert_eq!(buf.capacity(), DEFAULT_CLASS.inisize);
        let big = vec![b'x'; DEFAULT_CLASS.inisize * 3];
        buf.add(&big).unwrap();
        assert_eq!(buf.len(), big.len());
        assert!(buf.capacity() >= big.len());
        assert_eq!(buf.as_slice(), &big[..]);
    }

    #[test]
    fn erase_shifts_remaining_bytes() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"hello world").unwrap();
        buf.erase(6);
        assert_eq!(buf.as_slice(), b"world");
    }

    #[test]
    fn erase_zero_clears_the_whole_buffer() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"hello world").unwrap();
        buf.erase(0);
        assert!(buf.is_empty(), "n == 0 must clear, not be a no-op");
    }

    #[test]
    fn erase_past_the_end_clears_the_whole_buffer() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"hello").unwrap();
        buf.erase(100);
        assert!(buf.is_empty());
    }

    #[test]
    fn add_null_is_idempotent() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"hi").unwrap();
        buf.add_null().unwrap();
        assert_eq!(buf.len(), 3);
        buf.add_null().unwrap();
        assert_eq!(buf.len(), 3, "already-terminated buffer must not grow again");
    }

    #[test]
    fn to_str_round_trips_without_growing_logical_size_twice() {
        let mut buf = Buffer::new().unwrap();
        buf.add_str("hello").unwrap();
        assert_eq!(buf.to_str().unwrap(), "hello");
        assert_eq!(buf.len(), 6, "tostr grows size by one for the trailing NUL");
    }

    #[test]
    fn print_grows_buffer_like_a_formatted_write() {
        let mut buf = Buffer::new().unwrap();
        buf.print(format_args!("{} widgets at ${:.2}", 12, 3.5)).unwrap();
        assert_eq!(buf.to_str().unwrap(), "12 widgets at $3.50");
    }

    #[test]
    fn dup_produces_independent_owning_copy() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"abc").unwrap();
        let mut dup = buf.dup().unwrap();
        dup.add(b"def").unwrap();
        assert_eq!(buf.as_slice(), b"abc");
        assert_eq!(dup.as_slice(), b"abcdef");
    }

    #[test]
    fn wrap_reads_static_memory_without_owning_it() {
        let mem: &'static mut [u8] = Box::leak(Box::new(*b"borrowed"));
        let buf = Buffer::wrap(mem);
        assert!(!buf.is_owning());
        assert_eq!(buf.as_slice(), b"borrowed");
        assert_eq!(buf.capacity(), 0);
    }

    #[test]
    fn wrap_growth_fails_with_limit_exceeded() {
        let mem: &'static mut [u8] = Box::leak(Box::new([0u8; 4]));
        let mut buf = Buffer::wrap_mut(mem);
        assert_eq!(buf.add(b"ab").unwrap(), 2);
        assert!(matches!(buf.extend(100), Err(BufferError::LimitExceeded)));
    }

    #[test]
    fn cmp_orders_by_bytes_then_length() {
        let mut a = Buffer::new().unwrap();
        a.add(b"abc").unwrap();
        let mut b = Buffer::new().unwrap();
        b.add(b"abcd").unwrap();
        assert!(a < b);
        assert_eq!(a.strcmp("abc"), std::cmp::Ordering::Equal);
        assert_eq!(a.strcasecmp("ABC"), std::cmp::Ordering::Equal);
    }

    #[test]
    fn parses_numbers_from_owning_and_static_buffers() {
        let mut owning = Buffer::new().unwrap();
        owning.add_str("42 trailing junk").unwrap();
        let (value, consumed) = parsing::to_i64(&mut owning, 10).unwrap();
        assert_eq!(value, 42);
        assert_eq!(consumed, "42".len(), "consumed length must stop at the trailing junk");
        assert_eq!(owning.len(), "42 trailing junk".len(), "parse must not change logical size");

        let mem: &'static mut [u8] = Box::leak(Box::new(*b"-17"));
        let mut wrapped = Buffer::wrap(mem);
        let (value, consumed) = parsing::to_i64(&mut wrapped, 10).unwrap();
        assert_eq!(value, -17);
        assert_eq!(consumed, "-17".len());

        let mut f = Buffer::new().unwrap();
        f.add_str("3.25").unwrap();
        let (value, consumed) = parsing::to_f64(&mut f).unwrap();
        assert!((value - 3.25).abs() < 1e-9);
        assert_eq!(consumed, "3.25".len(), "n == len(print(L, B)) for a clean print/parse round trip");
    }

    #[test]
    fn parse_rolls_back_the_null_terminator_even_if_already_present() {
        // A buffer that already ends in a NUL before the call still has
        // that trailing byte logically dropped afterward, matching the
        // original's unconditional `buffer->size--` on its own buffer
        // rather than only rolling back a NUL this call itself appended.
        let mut buf = Buffer::new().unwrap();
        buf.add_str("7").unwrap();
        buf.add_null().unwrap();
        assert_eq!(buf.len(), 2, "\"7\\0\" is two bytes before the parse");
        let (value, consumed) = parsing::to_i64(&mut buf, 10).unwrap();
        assert_eq!(value, 7);
        assert_eq!(consumed, 1);
        assert_eq!(buf.len(), 1, "the trailing NUL must be dropped regardless of who appended it");
    }

    #[test]
    fn base64_matches_known_vectors() {
        let mut src = Buffer::new().unwrap();
        src.add_str("any carnal pleasure.").unwrap();
        let mut dst = Buffer::new().unwrap();
        b64::encode(&src, &mut dst).unwrap();
        assert_eq!(dst.to_str().unwrap(), "YW55IGNhcm5hbCBwbGVhc3VyZS4=");
    }

    #[test]
    fn base64_pads_short_remainders() {
        let mut src = Buffer::new().unwrap();
        src.add_str("a").unwrap();
        let mut dst = Buffer::new().unwrap();
        b64::encode(&src, &mut dst).unwrap();
        assert_eq!(dst.to_str().unwrap(), "YQ==");
    }

    #[test]
    fn dup_class_rejects_non_owning_target() {
        let mut buf = Buffer::new().unwrap();
        buf.add(b"abc").unwrap();
        assert!(matches!(
            buf.dup_class(&STATIC_CLASS),
            Err(BufferError::InvalidArgument)
        ));
    }
}
