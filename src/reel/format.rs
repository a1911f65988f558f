//! On-disk record envelope for captured frames.
//!
//! A reel file is a bare sequence of length-prefixed frame records:
//!
//! ```text
//! [u32 big-endian payload length][payload bytes] ...
//! ```
//!
//! Records appear strictly in frame sequence order; sequence numbers and
//! timestamps are implicit in record position. There is no header and no
//! trailer - this is the minimal durable envelope, not a playback
//! container.

/// Size of the big-endian length prefix, in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound accepted for a single payload, a corruption guard when
/// reading reels back. 256 MiB is far beyond any encoded screencast
/// frame.
pub const MAX_PAYLOAD_LEN: u32 = 256 * 1024 * 1024;

/// Encode one payload into its length-prefixed record.
pub fn encode_record(payload: &[u8]) -> Vec<u8> {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN as usize);
    let mut record = Vec::with_capacity(encoded_len(payload.len()));
    record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    record.extend_from_slice(payload);
    record
}

/// Size of the encoded record for a payload of `payload_len` bytes.
pub fn encoded_len(payload_len: usize) -> usize {
    LENGTH_PREFIX_SIZE + payload_len
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn record_is_prefix_plus_payload(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let record = encode_record(&payload);

            prop_assert_eq!(record.len(), encoded_len(payload.len()));
            let declared = u32::from_be_bytes(record[..LENGTH_PREFIX_SIZE].try_into().unwrap());
            prop_assert_eq!(declared as usize, payload.len());
            prop_assert_eq!(&record[LENGTH_PREFIX_SIZE..], payload.as_slice());
        }
    }

    #[test]
    fn empty_payload_encodes_to_a_bare_prefix() {
        let record = encode_record(&[]);
        assert_eq!(record, vec![0, 0, 0, 0]);
    }

    #[test]
    fn prefix_is_big_endian() {
        let record = encode_record(&[0xAB; 258]);
        assert_eq!(&record[..LENGTH_PREFIX_SIZE], &[0x00, 0x00, 0x01, 0x02]);
    }
}
