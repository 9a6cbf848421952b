//! Serde helpers shared by the wire types.

pub mod nullable;
pub mod time;
