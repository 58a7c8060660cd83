//! MIME message assembly: request in, entity tree out. No I/O happens here.

pub mod attachment;
pub mod message;

pub use message::build;
