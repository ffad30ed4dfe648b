//! Datagram decryption and validation.

use crate::cipher::{IV_OFFSET, apply_keystream, derive_nonce};
use crate::wire::read_u32;
use crate::{MAGIC, PACKET_SIZE};

/// Why a datagram produced no sample.
///
/// Both variants are routine on a live stream and carry no allocation; the
/// capture path logs them at `trace` and moves on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPacket {
    #[error("datagram too short: {len} bytes, need at least {min}", min = PACKET_SIZE)]
    TooShort { len: usize },
    #[error(
        "magic mismatch after decryption: expected 0x{expected:08X}, got 0x{found:08X}",
        expected = MAGIC
    )]
    BadMagic { found: u32 },
}

/// A decrypted packet that is at least [`PACKET_SIZE`] bytes long and starts
/// with [`MAGIC`].
///
/// The only ways to obtain one are [`decrypt`] and
/// [`DecryptedRecord::from_plaintext`], both of which enforce that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedRecord(Box<[u8]>);

impl DecryptedRecord {
    /// Wrap bytes that are already plaintext (e.g. a decrypted capture file).
    pub fn from_plaintext(bytes: impl Into<Box<[u8]>>) -> Result<Self, InvalidPacket> {
        let bytes = bytes.into();
        validate(&bytes)?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for DecryptedRecord {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn validate(bytes: &[u8]) -> Result<(), InvalidPacket> {
    if bytes.len() < PACKET_SIZE {
        return Err(InvalidPacket::TooShort { len: bytes.len() });
    }
    let found = read_u32(bytes, 0);
    if found != MAGIC {
        return Err(InvalidPacket::BadMagic { found });
    }
    Ok(())
}

/// Decrypt a raw datagram and check its magic word.
///
/// The whole datagram is run through the keystream, so longer packet layouts
/// decrypt too; only the standard-layout prefix is ever decoded.
pub fn decrypt(raw: &[u8]) -> Result<DecryptedRecord, InvalidPacket> {
    if raw.len() < PACKET_SIZE {
        return Err(InvalidPacket::TooShort { len: raw.len() });
    }

    let iv = read_u32(raw, IV_OFFSET);
    let mut buf: Box<[u8]> = raw.into();
    apply_keystream(&mut buf, &derive_nonce(iv));

    let found = read_u32(&buf, 0);
    if found != MAGIC {
        return Err(InvalidPacket::BadMagic { found });
    }
    Ok(DecryptedRecord(buf))
}

/// Produce a datagram the way the console does: encrypt `plaintext` with the
/// nonce for `iv`, then store `iv` in clear at the IV offset.
///
/// The four plaintext bytes at the IV offset do not survive the trip; no
/// decoded field lives there.
pub fn encrypt(plaintext: &[u8], iv: u32) -> Vec<u8> {
    let mut buf = plaintext.to_vec();
    apply_keystream(&mut buf, &derive_nonce(iv));
    if let Some(slot) = buf.get_mut(IV_OFFSET..IV_OFFSET + 4) {
        slot.copy_from_slice(&iv.to_le_bytes());
    }
    buf
}
