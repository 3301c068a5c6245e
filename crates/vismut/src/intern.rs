//! Name and string-literal interning.
//!
//! The tokenizer stores every identifier and string literal once and hands
//! out indices (`NameId`, `StrId`) for storage and comparison. A name's
//! 32-bit MurmurHash3 is computed at intern time and kept beside the text;
//! the scope tables key their slot chains on it, so the hash is never
//! recomputed during resolution.

use ahash::AHashMap;

/// Index into the name interner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameId(u32);

impl NameId {
    /// Returns the raw index value.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the string-literal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(u32);

impl StrId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Seed used for every interned-name hash, matching the scope tables.
pub const NAME_HASH_SEED: u32 = 0;

/// MurmurHash3, 32-bit variant.
///
/// The scope hash tables key their slot chains on this exact function, so it
/// lives in-tree instead of behind a dependency.
#[must_use]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut h1 = seed;
    let mut chunks = data.chunks_exact(4);
    for block in &mut chunks {
        let mut k1 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
        h1 = h1.rotate_left(13);
        h1 = h1.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k1 = 0u32;
        for (i, &byte) in tail.iter().enumerate() {
            k1 ^= u32::from(byte) << (8 * i);
        }
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);
        h1 ^= k1;
    }

    h1 ^= data.len() as u32;
    h1 ^= h1 >> 16;
    h1 = h1.wrapping_mul(0x85eb_ca6b);
    h1 ^= h1 >> 13;
    h1 = h1.wrapping_mul(0xc2b2_ae35);
    h1 ^= h1 >> 16;
    h1
}

/// Interned names and string literals for one compilation.
///
/// Populated by the tokenizer, then read-only for the rest of the pipeline.
#[derive(Debug, Default)]
pub struct Interner {
    names: Vec<NameEntry>,
    name_lookup: AHashMap<Box<str>, NameId>,
    strings: Vec<Box<[u8]>>,
}

#[derive(Debug)]
struct NameEntry {
    text: Box<str>,
    hash: u32,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns an identifier, returning the existing id if seen before.
    pub fn intern_name(&mut self, text: &str) -> NameId {
        if let Some(&id) = self.name_lookup.get(text) {
            return id;
        }
        let id = NameId(u32::try_from(self.names.len()).expect("name table exceeds u32"));
        self.names.push(NameEntry {
            text: text.into(),
            hash: murmur3_32(text.as_bytes(), NAME_HASH_SEED),
        });
        self.name_lookup.insert(text.into(), id);
        id
    }

    /// Stores the unescaped content of a string literal. Literals are not
    /// deduplicated; each occurrence keeps its own copy.
    pub fn intern_str(&mut self, bytes: &[u8]) -> StrId {
        let id = StrId(u32::try_from(self.strings.len()).expect("string table exceeds u32"));
        self.strings.push(bytes.into());
        id
    }

    #[must_use]
    pub fn name(&self, id: NameId) -> &str {
        &self.names[id.index()].text
    }

    /// The MurmurHash3 of the name, computed once at intern time.
    #[must_use]
    pub fn name_hash(&self, id: NameId) -> u32 {
        self.names[id.index()].hash
    }

    #[must_use]
    pub fn str_bytes(&self, id: StrId) -> &[u8] {
        &self.strings[id.index()]
    }

    /// Lossy text view of a string literal, for dumps and diagnostics.
    #[must_use]
    pub fn str_text(&self, id: StrId) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.str_bytes(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates_names() {
        let mut interner = Interner::new();
        let a = interner.intern_name("x");
        let b = interner.intern_name("y");
        let c = interner.intern_name("x");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.name(a), "x");
    }

    #[test]
    fn name_hash_is_stable() {
        let mut interner = Interner::new();
        let a = interner.intern_name("counter");
        assert_eq!(
            interner.name_hash(a),
            murmur3_32(b"counter", NAME_HASH_SEED)
        );
    }

    #[test]
    fn murmur3_reference_vectors() {
        // Published test vectors for MurmurHash3 x86 32-bit.
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_32(b"test", 0x9747_b28c), 0x704b_81dc);
        assert_eq!(murmur3_32(b"Hello, world!", 0x9747_b28c), 0x2488_4cba);
    }

    #[test]
    fn string_literals_keep_their_bytes() {
        let mut interner = Interner::new();
        let id = interner.intern_str(b"a\0b");
        assert_eq!(interner.str_bytes(id), b"a\0b");
    }
}
