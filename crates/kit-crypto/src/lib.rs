//! Kit Network crypto primitives.
//!
//! Passwords and bearer tokens are both stored as Argon2id PHC strings.
//! Tokens are minted here and handed to the client once; only their hash
//! is ever persisted.

pub mod secret;
pub mod token;
