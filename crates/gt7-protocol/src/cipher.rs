//! Salsa20/20 keystream keyed for the GT7 simulator interface.
//!
//! The key is static. The 8-byte nonce changes per packet and is derived from
//! the little-endian word at [`IV_OFFSET`] of the *raw* (still encrypted)
//! datagram: `nonce = le(iv ^ IV_XOR) ++ le(iv)`. Byte order and the XOR
//! constant must be exact or every packet fails the magic check.

/// First 32 bytes of `"Simulator Interface Packet GT7 ver 0.0"`.
pub const KEY: &[u8; 32] = b"Simulator Interface Packet GT7 v";
/// Offset of the plaintext IV seed inside a raw datagram.
pub const IV_OFFSET: usize = 0x40;
/// Constant XOR-ed into the IV seed to form the first nonce word.
pub const IV_XOR: u32 = 0xDEAD_BEAF;

// "expand 32-byte k"
const SIGMA: [u32; 4] = [0x6170_7865, 0x3320_646e, 0x7962_2d32, 0x6b20_6574];

/// Build the 8-byte Salsa20 nonce for a packet whose IV seed is `iv`.
pub fn derive_nonce(iv: u32) -> [u8; 8] {
    let mut nonce = [0u8; 8];
    let (first, second) = nonce.split_at_mut(4);
    first.copy_from_slice(&(iv ^ IV_XOR).to_le_bytes());
    second.copy_from_slice(&iv.to_le_bytes());
    nonce
}

/// XOR `buf` in place with the keystream for `nonce`, starting at block 0.
///
/// Encryption and decryption are the same operation.
pub fn apply_keystream(buf: &mut [u8], nonce: &[u8; 8]) {
    for (counter, chunk) in (0u64..).zip(buf.chunks_mut(64)) {
        let keystream = block(KEY, nonce, counter);
        for (byte, k) in chunk.iter_mut().zip(keystream.iter()) {
            *byte ^= k;
        }
    }
}

/// One 64-byte Salsa20/20 keystream block.
fn block(key: &[u8; 32], nonce: &[u8; 8], counter: u64) -> [u8; 64] {
    let k = le_words::<8>(key);
    let n = le_words::<2>(nonce);
    let [s0, s1, s2, s3] = SIGMA;
    let [c0, c1] = [counter as u32, (counter >> 32) as u32];

    // 0: sigma  1-4: key[0..16]  5: sigma  6-7: nonce  8-9: counter
    // 10: sigma  11-14: key[16..32]  15: sigma
    let state: [u32; 16] = [
        s0, k[0], k[1], k[2], k[3], s1, n[0], n[1], c0, c1, s2, k[4], k[5], k[6], k[7], s3,
    ];

    let mut x = state;
    for _ in 0..10 {
        // column round
        quarter_round(&mut x, 0, 4, 8, 12);
        quarter_round(&mut x, 5, 9, 13, 1);
        quarter_round(&mut x, 10, 14, 2, 6);
        quarter_round(&mut x, 15, 3, 7, 11);
        // row round
        quarter_round(&mut x, 0, 1, 2, 3);
        quarter_round(&mut x, 5, 6, 7, 4);
        quarter_round(&mut x, 10, 11, 8, 9);
        quarter_round(&mut x, 15, 12, 13, 14);
    }

    let mut out = [0u8; 64];
    for ((dst, word), init) in out.chunks_exact_mut(4).zip(x).zip(state) {
        dst.copy_from_slice(&word.wrapping_add(init).to_le_bytes());
    }
    out
}

fn le_words<const N: usize>(bytes: &[u8]) -> [u32; N] {
    let mut words = [0u32; N];
    for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    words
}

#[inline]
fn quarter_round(s: &mut [u32; 16], a: usize, b: usize, c: usize, d: usize) {
    s[b] ^= s[a].wrapping_add(s[d]).rotate_left(7);
    s[c] ^= s[b].wrapping_add(s[a]).rotate_left(9);
    s[d] ^= s[c].wrapping_add(s[b]).rotate_left(13);
    s[a] ^= s[d].wrapping_add(s[c]).rotate_left(18);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_layout_is_xor_word_then_seed() {
        let nonce = derive_nonce(0x0000_0001);
        assert_eq!(nonce, [0xAE, 0xBE, 0xAD, 0xDE, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn nonce_of_zero_seed_is_xor_constant() {
        let nonce = derive_nonce(0);
        assert_eq!(&nonce[..4], &IV_XOR.to_le_bytes());
        assert_eq!(&nonce[4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn key_is_truncated_protocol_string() {
        assert_eq!(&KEY[..], &b"Simulator Interface Packet GT7 ver 0.0"[..32]);
    }

    #[test]
    fn block_is_deterministic() {
        let nonce = derive_nonce(42);
        assert_eq!(block(KEY, &nonce, 0), block(KEY, &nonce, 0));
    }

    #[test]
    fn consecutive_blocks_differ() {
        let nonce = derive_nonce(42);
        assert_ne!(block(KEY, &nonce, 0), block(KEY, &nonce, 1));
    }

    #[test]
    fn keystream_is_an_involution() {
        let nonce = derive_nonce(0x1234_5678);
        let original: Vec<u8> = (0..300u16).map(|i| (i % 251) as u8).collect();
        let mut buf = original.clone();
        apply_keystream(&mut buf, &nonce);
        assert_ne!(buf, original);
        apply_keystream(&mut buf, &nonce);
        assert_eq!(buf, original);
    }

    #[test]
    fn keystream_spans_partial_final_block() {
        let nonce = derive_nonce(7);
        let mut short = [0u8; 10];
        let mut long = [0u8; 70];
        apply_keystream(&mut short, &nonce);
        apply_keystream(&mut long, &nonce);
        assert_eq!(&short[..], &long[..10]);
        assert_eq!(&long[64..], &block(KEY, &nonce, 1)[..6]);
    }
}
