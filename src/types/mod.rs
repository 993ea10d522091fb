//! MessagePack value model and the Rust type mappings.

mod pack;
mod value;

pub use pack::{Pack, Unpack};
pub use value::Value;
