use hashbrown::{DefaultHashBuilder, HashTable};
use std::hash::BuildHasher;
use vega_collections::{BufRef, SegmentedBuffer};

/// Unique numeric representation of a name.
///
/// Cheap to compare and to hash; the owning repository resolves it back to
/// the string for display.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Sym(u32);

impl Sym {
    pub fn new(raw: u32) -> Self {
        Sym(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl From<usize> for Sym {
    fn from(i: usize) -> Self {
        Sym(i as u32)
    }
}

impl From<Sym> for usize {
    fn from(s: Sym) -> Self {
        s.0 as usize
    }
}

/// Deduplicating name store: the bytes live in a [`SegmentedBuffer`] (stable
/// for the interner's lifetime), the table maps a candidate string to its
/// [`Sym`] without allocating.
#[derive(Default)]
pub struct StringInterner {
    buffer: SegmentedBuffer,
    refs: Vec<BufRef>,
    table: HashTable<u32>,
    hasher: DefaultHashBuilder,
}

impl StringInterner {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<Sym> {
        let hash = self.hasher.hash_one(name.as_bytes());
        self.table
            .find(hash, |&i| self.buffer.get(self.refs[i as usize]) == name.as_bytes())
            .map(|&i| Sym(i))
    }

    pub fn intern(&mut self, name: &str) -> Sym {
        if let Some(sym) = self.find(name) {
            return sym;
        }
        let r = self.buffer.write(name.as_bytes(), 1);
        let sym = self.refs.len() as u32;
        self.refs.push(r);
        let hash = self.hasher.hash_one(name.as_bytes());
        let buffer = &self.buffer;
        let refs = &self.refs;
        let hasher = &self.hasher;
        self.table
            .insert_unique(hash, sym, |&i| hasher.hash_one(buffer.get(refs[i as usize])));
        Sym(sym)
    }

    pub fn resolve(&self, sym: Sym) -> &str {
        let bytes = self.buffer.get(self.refs[sym.0 as usize]);
        std::str::from_utf8(bytes).expect("interned names are valid utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_deduplicates() {
        let mut interner = StringInterner::new();
        let a = interner.intern("at-robby");
        let b = interner.intern("free");
        let c = interner.intern("at-robby");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(a), "at-robby");
        assert_eq!(interner.resolve(b), "free");
        assert_eq!(interner.find("free"), Some(b));
        assert_eq!(interner.find("carry"), None);
    }
}
