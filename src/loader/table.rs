//! Reads the declarative encoding tables into whitespace-tokenized rows.
//!
//! Each table is a plain-text file named after its contents. `#` starts a line
//! comment and blank lines are skipped; everything else is split on
//! whitespace. The loader also folds the raw bytes of every consumed table
//! into a SHA-256 digest so generated artifacts can record which table
//! revision produced them.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::meta::MetaError;

/// Tables consumed by the compiler, in digest order. The source directory may
/// contain further prose tables (glossary, notation, opcode descriptions);
/// those are left untouched.
pub const CONSUMED_TABLES: [&str; 5] = ["operands", "opcodes", "codecs", "extensions", "csrs"];

/// One non-empty, comment-stripped table line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub tokens: Vec<String>,
    /// 1-indexed source line, kept for error reporting.
    pub line: usize,
}

/// The five consumed tables, tokenized, plus the digest over their raw bytes.
#[derive(Debug)]
pub struct TableSet {
    operands: Vec<TableRow>,
    opcodes: Vec<TableRow>,
    codecs: Vec<TableRow>,
    extensions: Vec<TableRow>,
    csrs: Vec<TableRow>,
    digest: [u8; 32],
}

impl TableSet {
    /// Reads every consumed table from `dir`. A missing table surfaces as the
    /// underlying I/O error.
    pub fn read_dir<P: AsRef<Path>>(dir: P) -> Result<Self, MetaError> {
        let dir = dir.as_ref();
        let mut hasher = Sha256::new();
        let mut parsed: Vec<Vec<TableRow>> = Vec::with_capacity(CONSUMED_TABLES.len());
        for name in CONSUMED_TABLES {
            let raw = fs::read(dir.join(name))?;
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(&raw);
            let text = String::from_utf8_lossy(&raw);
            parsed.push(tokenize(&text));
        }
        let digest = hasher.finalize().into();
        let mut tables = parsed.into_iter();
        Ok(Self {
            operands: tables.next().unwrap_or_default(),
            opcodes: tables.next().unwrap_or_default(),
            codecs: tables.next().unwrap_or_default(),
            extensions: tables.next().unwrap_or_default(),
            csrs: tables.next().unwrap_or_default(),
            digest,
        })
    }

    pub fn operands(&self) -> &[TableRow] {
        &self.operands
    }

    pub fn opcodes(&self) -> &[TableRow] {
        &self.opcodes
    }

    pub fn codecs(&self) -> &[TableRow] {
        &self.codecs
    }

    pub fn extensions(&self) -> &[TableRow] {
        &self.extensions
    }

    pub fn csrs(&self) -> &[TableRow] {
        &self.csrs
    }

    /// SHA-256 over the consumed tables' raw bytes, in [`CONSUMED_TABLES`]
    /// order with each file prefixed by its name and a NUL separator.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Digest rendered as lowercase hex for artifact headers.
    pub fn digest_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.digest {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }
}

fn tokenize(text: &str) -> Vec<TableRow> {
    let mut rows = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        rows.push(TableRow {
            tokens: line.split_whitespace().map(str::to_owned).collect(),
            line: index + 1,
        });
    }
    rows
}
