use bytes::{BufMut, Bytes, BytesMut};
use md5::{Digest, Md5};

/// Marks a buffer as a KPL aggregated record.
pub const MAGIC: [u8; 4] = [0xF3, 0x89, 0x9A, 0xC2];

/// Length of the trailing MD5 digest.
pub const DIGEST_LEN: usize = 16;

/// Frame a merged payload as `[magic][payload][md5(payload)]`.
pub fn pack(payload: &[u8]) -> Bytes {
    debug_assert!(!payload.is_empty(), "merged payload always carries a header");

    let digest = Md5::digest(payload);
    let mut buf = BytesMut::with_capacity(MAGIC.len() + payload.len() + DIGEST_LEN);
    buf.put_slice(&MAGIC);
    buf.put_slice(payload);
    buf.put_slice(&digest);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_magic_payload_digest() {
        let payload = b"payload bytes";
        let frame = pack(payload);

        assert_eq!(frame.len(), 4 + payload.len() + 16);
        assert_eq!(&frame[..4], &MAGIC);
        assert_eq!(&frame[4..4 + payload.len()], payload);
        assert_eq!(&frame[4 + payload.len()..], Md5::digest(payload).as_slice());
    }

    #[test]
    fn digest_excludes_magic() {
        let frame = pack(b"abc");
        // RFC 1321 test vector for "abc"
        let expected: [u8; 16] = [
            0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28, 0xe1,
            0x7f, 0x72,
        ];
        assert_eq!(&frame[frame.len() - DIGEST_LEN..], &expected);
    }

    #[test]
    fn packing_is_idempotent() {
        let payload = vec![7u8; 1024];
        assert_eq!(pack(&payload), pack(&payload));
    }
}
