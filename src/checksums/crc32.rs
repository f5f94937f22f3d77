/*
 * crc32.rs
 *
 * CRC-32 (the zlib/gzip polynomial) via `crc32fast`, the same crate the
 * teacher's streaming output driver already links for its footer checksum.
 */

use crc32fast::Hasher;

/*
 * Update the CRC-32 `state` with the bytes of `buf` and return the new
 * state. The initial state is 0; passing state `0` together with an empty
 * `buf` resets the checksum to the initial state.
 */
pub fn crc32(state: u32, buf: &[u8]) -> u32 {
    if buf.is_empty() {
        return state;
    }
    let mut hasher = Hasher::new_with_initial(state);
    hasher.update(buf);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_zero() {
        assert_eq!(crc32(0, &[]), 0);
    }

    #[test]
    fn known_vector() {
        assert_eq!(crc32(0, b"123456789"), 0xCBF43926);
    }

    #[test]
    fn associative_under_split() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let whole = crc32(0, &data);

        for split in [0, 1, 17, 9999, 10_000] {
            let (x, y) = data.split_at(split);
            let combined = crc32(crc32(0, x), y);
            assert_eq!(combined, whole, "split at {split}");
        }
    }
}
