//! Shared primitives for keywit.
//!
//! This crate defines the small vocabulary every other keywit crate speaks:
//! the fixed-length [`Hash`] used for labels, digests and links, the
//! [`Uid`] / [`Epoch`] integer aliases, blake3 hashing helpers, and
//! [`Preimage`], the fixed little-endian encoder used to build every byte
//! string that gets hashed or signed.

/// Length in bytes of every hash, label, digest and hashchain link.
pub const HASH_LEN: usize = 32;

/// A blake3 output. Map labels, map digests and hashchain links are all hashes.
pub type Hash = [u8; HASH_LEN];

/// Directory user identifier.
pub type Uid = u64;

/// Epoch number. Epoch 0 is the empty map committed at server start.
pub type Epoch = u64;

/// Hash a single byte string.
pub fn hash(data: &[u8]) -> Hash {
    blake3::hash(data).into()
}

/// Hash the concatenation of several byte strings without allocating.
pub fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Convert a byte slice into a [`Hash`], failing if the length is wrong.
pub fn to_hash(bytes: &[u8]) -> Option<Hash> {
    bytes.try_into().ok()
}

// ---------------------------------------------------------------------------
// Preimage encoding
// ---------------------------------------------------------------------------

/// Builder for the byte strings that get hashed or signed.
///
/// Integers are 8 bytes little-endian and byte strings are written as an
/// 8-byte length followed by the bytes, so two different field sequences
/// can never produce the same preimage.
#[derive(Debug, Default, Clone)]
pub struct Preimage {
    buf: Vec<u8>,
}

impl Preimage {
    /// Start an empty preimage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a preimage with a one-byte domain separation tag.
    pub fn tagged(tag: u8) -> Self {
        Self { buf: vec![tag] }
    }

    /// Append a raw byte.
    pub fn u8(mut self, v: u8) -> Self {
        self.buf.push(v);
        self
    }

    /// Append a little-endian u64.
    pub fn u64(mut self, v: u64) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Append a length-prefixed byte string.
    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.buf.extend_from_slice(&(v.len() as u64).to_le_bytes());
        self.buf.extend_from_slice(v);
        self
    }

    /// Append bytes with no length prefix. Only for fixed-length fields.
    pub fn raw(mut self, v: &[u8]) -> Self {
        self.buf.extend_from_slice(v);
        self
    }

    /// Finish and return the encoded bytes.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Finish and hash the encoded bytes.
    pub fn hash(&self) -> Hash {
        hash(&self.buf)
    }
}

/// Lower-case hex of the first 8 bytes of a hash, for log fields.
pub fn short_hex(h: &Hash) -> String {
    hex::encode(&h[..8])
}
