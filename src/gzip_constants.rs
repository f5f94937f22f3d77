/*
 * gzip_constants.rs
 *
 * Constants from RFC 1952, mirrored from libdeflate's gzip_constants.h.
 */

pub const GZIP_MIN_HEADER_SIZE: usize = 10;
pub const GZIP_FOOTER_SIZE: usize = 8;
pub const GZIP_MIN_OVERHEAD: usize = GZIP_MIN_HEADER_SIZE + GZIP_FOOTER_SIZE;

pub const GZIP_ID1: u8 = 0x1F;
pub const GZIP_ID2: u8 = 0x8B;

pub const GZIP_CM_DEFLATE: u8 = 8;

pub const GZIP_FTEXT: u8 = 0x01;
pub const GZIP_FHCRC: u8 = 0x02;
pub const GZIP_FEXTRA: u8 = 0x04;
pub const GZIP_FNAME: u8 = 0x08;
pub const GZIP_FCOMMENT: u8 = 0x10;
pub const GZIP_FRESERVED: u8 = 0xE0;

pub const GZIP_MTIME_UNAVAILABLE: u32 = 0;

pub const GZIP_OS_UNIX: u8 = 3;
pub const GZIP_OS_UNKNOWN: u8 = 0xFF;

pub const GZIP_XFL_SLOWEST_COMPRESSION: u8 = 2;
pub const GZIP_XFL_FASTEST_COMPRESSION: u8 = 4;
