/*
 * zlib_constants.rs
 *
 * Constants from RFC 1950, mirrored from libdeflate's zlib_constants.h.
 */

pub const ZLIB_MIN_HEADER_SIZE: usize = 2;
pub const ZLIB_FOOTER_SIZE: usize = 4;
pub const ZLIB_MIN_OVERHEAD: usize = ZLIB_MIN_HEADER_SIZE + ZLIB_FOOTER_SIZE;

pub const ZLIB_CM_DEFLATE: u8 = 8;
pub const ZLIB_CINFO_32K_WINDOW: u8 = 7;

pub const ZLIB_FASTEST_COMPRESSION: u8 = 0;
pub const ZLIB_FAST_COMPRESSION: u8 = 1;
pub const ZLIB_DEFAULT_COMPRESSION: u8 = 2;
pub const ZLIB_SLOWEST_COMPRESSION: u8 = 3;
