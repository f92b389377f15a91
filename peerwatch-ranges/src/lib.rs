//! Address range registry for peerwatch.
//!
//! This crate provides:
//! - `Cidr`, an IPv4 block with membership tests and subnet splitting
//! - `RangeTable`, the ordered (range, institution) table used for attribution
//! - Expansion of coarse scan blocks into sub-ranges sized for upstream queries
//! - The built-in scan blocks and institution table, plus a text-file loader for both

pub mod builtin;
pub mod cidr;
pub mod loader;
pub mod table;

pub use builtin::{default_blocks, default_table};
pub use cidr::{Cidr, CidrError};
pub use loader::{load_blocks, load_range_table, parse_blocks, parse_range_table, RangeLoadError};
pub use table::{expand_blocks, ExpansionPolicy, RangeEntry, RangeTable};
