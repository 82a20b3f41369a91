//! Address families, values, and the textual codec.

mod codec;
mod types;

pub use codec::{parse, render};
pub use types::{IpValue, IpVersion};
