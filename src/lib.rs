//! `mailrelay`: a CGI email relay.
//!
//! This crate turns a JSON mail description (or a raw RFC 2822 message) into
//! a MIME message, stamps it with the caller's identity, and relays it over
//! SMTP. The MIME assembly in [`builder`] is pure; everything with I/O lives
//! in [`relay`], [`cgi`] and [`session`].

pub mod builder;
pub mod cgi;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod relay;
pub mod session;
