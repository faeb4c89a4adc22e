// octets.rs - low-level byte utilities shared by the codec and authenticator engine
//
// Keeps the big-endian packing conventions and the MD5 one-shot wrapper in one place
// so call sites never reimplement byte-order handling by hand.

use md5::{Digest, Md5};

/// Compute MD5 over the concatenation of every argument slice.
///
/// Every RADIUS MD5 construction (request authenticator, response authenticator, PAP
/// round) is `MD5(a || b || c || ...)` over several discontiguous byte ranges; accepting
/// a slice of slices avoids callers building an intermediate concatenated `Vec` at each
/// call site.
pub fn md5(chunks: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

/// Pack a u32 as four big-endian bytes.
pub fn pack_u32_be(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

/// Unpack four big-endian bytes into a u32. Panics if `bytes` is shorter than 4.
pub fn unpack_u32_be(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Pack a u16 as two big-endian bytes (the packet length field).
pub fn pack_u16_be(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

/// Unpack two big-endian bytes into a u16. Panics if `bytes` is shorter than 2.
pub fn unpack_u16_be(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}
