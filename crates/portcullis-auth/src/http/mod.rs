//! HTTP-facing types.

pub mod admin;
