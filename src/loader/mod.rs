//! Table loading helpers (row tokenizer, table-set reader, source digest).

pub mod table;

pub use table::{CONSUMED_TABLES, TableRow, TableSet};
