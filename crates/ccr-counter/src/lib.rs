//! ccr-counter
//!
//! Parser for the cash-counting device export ("counter file").
//!
//! The file is semicolon-delimited text with one header line carrying the
//! bill denominations and one data line per counted machine. Each data line
//! is resolved to a machine ID through the reference directory's serial index
//! and totalled into a [`ccr_schemas::CounterRecord`].
//!
//! Pure parsing over in-memory text; [`parse_counter_file`] is the only IO.

mod layout;
mod parser;

pub use layout::{CounterLayout, DEFAULT_DENOMINATIONS, DENOMINATION_SLOTS, MIN_DATA_FIELDS};
pub use parser::{
    parse_counter_file, parse_counter_str, parse_counter_with_index, parse_header, CounterHeader,
    CounterParseError,
};
