//! Scan plan: which blocks to query and how to attribute addresses.
//!
//! Files given on the command line override the built-in tables independently.

use std::path::Path;

use peerwatch_fs::Filesystem;
use peerwatch_ranges::{
    default_blocks, default_table, expand_blocks, load_blocks, load_range_table, Cidr,
    ExpansionPolicy, RangeLoadError, RangeTable,
};

/// Blocks to scan (already expanded) and the attribution table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPlan {
    pub blocks: Vec<Cidr>,
    pub table: RangeTable,
}

/// Load blocks and table, falling back to the built-in ones, then expand the blocks.
pub fn load_scan_plan<F: Filesystem>(
    fs: &F,
    blocks_file: Option<&Path>,
    ranges_file: Option<&Path>,
    policy: &ExpansionPolicy,
) -> Result<ScanPlan, RangeLoadError> {
    let blocks = match blocks_file {
        Some(path) => load_blocks(fs, path)?,
        None => default_blocks()?,
    };
    let table = match ranges_file {
        Some(path) => load_range_table(fs, path)?,
        None => default_table()?,
    };

    Ok(ScanPlan {
        blocks: expand_blocks(&blocks, policy),
        table,
    })
}
