//! Codec name registry. Codecs identify an instruction's structural encoding
//! shape; this core consumes them as opaque classifiers.

use std::num::NonZeroU32;

use ahash::AHashMap;

use crate::loader::TableRow;

/// Dense handle into the [`CodecSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CodecId(NonZeroU32);

impl CodecId {
    fn from_index(index: usize) -> Self {
        let raw = NonZeroU32::new((index as u32) + 1).expect("codec index overflow");
        Self(raw)
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// Interned codec vocabulary from the codecs table (first column per row).
#[derive(Debug, Default)]
pub struct CodecSet {
    names: Vec<String>,
    lookup: AHashMap<String, CodecId>,
}

impl CodecSet {
    pub fn from_rows(rows: &[TableRow]) -> Self {
        let mut set = Self::default();
        for row in rows {
            if let Some(name) = row.tokens.first() {
                set.intern(name);
            }
        }
        set
    }

    fn intern(&mut self, name: &str) -> CodecId {
        if let Some(id) = self.lookup.get(name) {
            return *id;
        }
        let id = CodecId::from_index(self.names.len());
        self.names.push(name.to_owned());
        self.lookup.insert(name.to_owned(), id);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<CodecId> {
        self.lookup.get(name).copied()
    }

    pub fn name(&self, id: CodecId) -> &str {
        &self.names[id.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
