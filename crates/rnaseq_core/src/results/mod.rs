//! Loading differential expression output tables.

mod diff_table;

pub use diff_table::{
    load_diff_table, DiffTable, ResultTableError, ResultTableResult, Value, DEFAULT_TABLE,
};
