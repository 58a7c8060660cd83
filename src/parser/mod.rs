//! Parsing of raw RFC 2822 input: header decoding and unfolding.

pub mod header;
pub mod raw;
