mod client;

pub use client::{HttpProvider, decode_envelope};
