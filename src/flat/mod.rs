//! Zero-copy flat object encoding
//!
//! Encoded objects contain no pointers. Variable-length fields are stored as
//! an offset relative to the field plus a length, so a buffer written in one
//! process can be read in place by another process that mapped it at a
//! different base address:
//!
//! ```text
//!   head                                   tail
//! ┌───────────┬─────────────────┬────────┬────────────────┐
//! │ scalars   │ d: i64 │ len: u64│ ...    │ field bytes    │
//! └───────────┴────┬────────────┴────────┴────────────────┘
//!                  └──── objectOffset + d ──────▲
//! ```

pub mod buffer;
pub mod decode;
pub mod message;
pub mod variable;

pub use buffer::{
    checked_range, read_i64_at, read_u32_at, read_u64_at, write_i64_at, write_u32_at, write_u64_at,
};
pub use decode::{read_str, read_str_array, read_variable_data, read_wide_string};
pub use message::FlatMessage;
pub use variable::{
    serialize_variable_data, variable_data_size, FlatString, VariableData, WideStr,
    VARIABLE_FIELD_SIZE,
};
