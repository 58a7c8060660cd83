//! Core data model: the JSON request, the MIME entity tree, and addresses.

pub mod address;
pub mod entity;
pub mod request;
