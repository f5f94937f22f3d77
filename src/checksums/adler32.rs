/*
 * adler32.rs
 *
 * Written in 2014-2016 by Eric Biggers <ebiggers3@gmail.com>. Rust port.
 */

/* The Adler-32 divisor, or "base", value. */
const DIVISOR: u32 = 65521;

/*
 * MAX_BYTES_PER_CHUNK is the most bytes that can be processed without the
 * possibility of s2 overflowing when it is represented as an unsigned 32-bit
 * integer, assuming the worst case of every byte being 0xFF and s1/s2
 * starting at the highest possible values modulo the divisor.
 */
const MAX_BYTES_PER_CHUNK: usize = 5552;

/*
 * Update the Adler-32 `state` with the bytes of `buf` and return the new
 * state. The initial state is 1; passing state `0` together with an empty
 * `buf` resets the checksum to the initial state.
 */
pub fn adler32(state: u32, buf: &[u8]) -> u32 {
    if state == 0 && buf.is_empty() {
        return 1;
    }

    let mut s1 = state & 0xFFFF;
    let mut s2 = state >> 16;

    for chunk in buf.chunks(MAX_BYTES_PER_CHUNK) {
        for &byte in chunk {
            s1 += byte as u32;
            s2 += s1;
        }
        s1 %= DIVISOR;
        s2 %= DIVISOR;
    }

    (s2 << 16) | s1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_one() {
        assert_eq!(adler32(1, &[]), 1);
    }

    #[test]
    fn reset_via_zero_state() {
        assert_eq!(adler32(0, &[]), 1);
    }

    #[test]
    fn known_vector() {
        // "Wikipedia" => 0x11E60398 is the commonly cited reference value.
        assert_eq!(adler32(1, b"Wikipedia"), 0x11E60398);
    }

    #[test]
    fn associative_under_split() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let whole = adler32(1, &data);

        for split in [0, 1, 17, 5551, 5552, 5553, 9999, 10_000] {
            let (x, y) = data.split_at(split);
            let combined = adler32(adler32(1, x), y);
            assert_eq!(combined, whole, "split at {split}");
        }
    }
}
