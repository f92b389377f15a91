//! Ordered range table and scan-block expansion.

use std::net::Ipv4Addr;

use crate::cidr::Cidr;

/// One row of the range table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub cidr: Cidr,
    pub label: Option<String>,
}

impl RangeEntry {
    pub fn new(cidr: Cidr, label: Option<String>) -> Self {
        Self { cidr, label }
    }
}

/// Ordered table mapping address ranges to institution labels.
///
/// Lookup is a linear scan in declared order and the first range that contains the
/// address wins, even when a later entry is more specific. Reordering the table
/// changes attribution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeTable {
    entries: Vec<RangeEntry>,
}

impl RangeTable {
    /// Create an empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(entries: Vec<RangeEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry after all existing ones.
    pub fn push(&mut self, cidr: Cidr, label: Option<String>) {
        self.entries.push(RangeEntry::new(cidr, label));
    }

    /// Label of the first declared range containing `addr`.
    ///
    /// `None` means either no range matched or the first match carries no label;
    /// both are reported downstream as the default institution.
    pub fn attribute(&self, addr: Ipv4Addr) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.cidr.contains(addr))
            .and_then(|entry| entry.label.as_deref())
    }

    /// Label of the entry declared for exactly `block`, if any.
    pub fn label_for_block(&self, block: &Cidr) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.cidr == *block)
            .and_then(|entry| entry.label.as_deref())
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How coarse scan blocks are split before querying the activity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionPolicy {
    /// Blocks with a prefix shorter than this are split.
    pub split_below: u8,
    /// Blocks of exactly this prefix get the wide tier.
    pub wide_prefix: u8,
    /// Sub-range prefix for wide-tier blocks.
    pub wide_target: u8,
    /// Sub-range prefix for every other block that gets split, including blocks
    /// coarser than `wide_prefix`.
    pub target: u8,
}

impl Default for ExpansionPolicy {
    fn default() -> Self {
        Self {
            split_below: 24,
            wide_prefix: 16,
            wide_target: 18,
            target: 24,
        }
    }
}

impl ExpansionPolicy {
    /// Prefix the given block is split into, or `None` if it passes through.
    pub fn target_for(&self, block: &Cidr) -> Option<u8> {
        let prefix = block.prefix_len();
        if prefix >= self.split_below {
            return None;
        }
        let target = if prefix == self.wide_prefix {
            self.wide_target
        } else {
            self.target
        };
        // Never split into something coarser than the block itself
        Some(target.clamp(prefix, 32))
    }
}

/// Expand scan blocks into sub-ranges.
///
/// Output follows input order; the sub-ranges of one block are ascending.
pub fn expand_blocks(blocks: &[Cidr], policy: &ExpansionPolicy) -> Vec<Cidr> {
    let mut out = Vec::new();
    for block in blocks {
        match policy.target_for(block).map(|prefix| block.subnets(prefix)) {
            Some(Ok(subnets)) => out.extend(subnets),
            _ => out.push(*block),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cidr(s: &str) -> Cidr {
        s.parse().expect("valid cidr")
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().expect("valid ip")
    }

    // ===========================================
    // Attribution
    // ===========================================

    #[test]
    fn test_attribute_first_match_wins_over_more_specific() {
        let mut table = RangeTable::empty();
        table.push(cidr("163.247.0.0/16"), Some("catch-all".to_string()));
        table.push(cidr("163.247.45.0/24"), Some("specific".to_string()));

        assert_eq!(table.attribute(ip("163.247.45.7")), Some("catch-all"));
    }

    #[test]
    fn test_attribute_declared_order_reversed() {
        let mut table = RangeTable::empty();
        table.push(cidr("163.247.45.0/24"), Some("specific".to_string()));
        table.push(cidr("163.247.0.0/16"), Some("catch-all".to_string()));

        assert_eq!(table.attribute(ip("163.247.45.7")), Some("specific"));
        assert_eq!(table.attribute(ip("163.247.46.7")), Some("catch-all"));
    }

    #[test]
    fn test_attribute_no_match() {
        let mut table = RangeTable::empty();
        table.push(cidr("10.0.0.0/8"), Some("ten".to_string()));
        assert_eq!(table.attribute(ip("192.168.1.1")), None);
    }

    #[test]
    fn test_attribute_unlabelled_first_match_shadows_later_label() {
        let mut table = RangeTable::empty();
        table.push(cidr("10.0.0.0/24"), None);
        table.push(cidr("10.0.0.0/16"), Some("later".to_string()));
        assert_eq!(table.attribute(ip("10.0.0.5")), None);
    }

    #[test]
    fn test_attribute_empty_table() {
        assert_eq!(RangeTable::empty().attribute(ip("1.1.1.1")), None);
        assert!(RangeTable::empty().is_empty());
    }

    #[test]
    fn test_label_for_block_exact_only() {
        let mut table = RangeTable::empty();
        table.push(cidr("160.238.212.0/24"), Some("bank".to_string()));

        assert_eq!(table.label_for_block(&cidr("160.238.212.0/24")), Some("bank"));
        assert_eq!(table.label_for_block(&cidr("160.238.212.0/25")), None);
        assert_eq!(table.label_for_block(&cidr("160.238.0.0/16")), None);
    }

    // ===========================================
    // Expansion
    // ===========================================

    #[test]
    fn test_expand_slash16_uses_wide_tier() {
        let blocks = expand_blocks(&[cidr("163.247.0.0/16")], &ExpansionPolicy::default());
        assert_eq!(blocks.len(), 4);
        assert!(blocks.iter().all(|b| b.prefix_len() == 18));
    }

    #[test]
    fn test_expand_slash20_uses_ordinary_tier() {
        let blocks = expand_blocks(&[cidr("10.0.16.0/20")], &ExpansionPolicy::default());
        assert_eq!(blocks.len(), 16);
        assert!(blocks.iter().all(|b| b.prefix_len() == 24));
        assert_eq!(blocks[0].to_string(), "10.0.16.0/24");
        assert_eq!(blocks[15].to_string(), "10.0.31.0/24");
    }

    #[test]
    fn test_expand_coarser_than_slash16_uses_ordinary_tier() {
        let blocks = expand_blocks(&[cidr("172.16.0.0/12")], &ExpansionPolicy::default());
        assert_eq!(blocks.len(), 4096);
        assert!(blocks.iter().all(|b| b.prefix_len() == 24));
        assert_eq!(blocks[0].to_string(), "172.16.0.0/24");
        assert_eq!(blocks[4095].to_string(), "172.31.255.0/24");
    }

    #[test]
    fn test_expand_slash17_uses_ordinary_tier() {
        let blocks = expand_blocks(&[cidr("163.247.128.0/17")], &ExpansionPolicy::default());
        assert_eq!(blocks.len(), 128);
        assert!(blocks.iter().all(|b| b.prefix_len() == 24));
    }

    #[test]
    fn test_expand_passes_fine_blocks_through() {
        let input = vec![cidr("45.229.137.0/24"), cidr("10.0.0.0/28"), cidr("10.0.0.9/32")];
        assert_eq!(expand_blocks(&input, &ExpansionPolicy::default()), input);
    }

    #[test]
    fn test_expand_preserves_input_order() {
        let input = vec![cidr("200.10.251.0/24"), cidr("163.247.0.0/16"), cidr("45.230.22.0/24")];
        let out = expand_blocks(&input, &ExpansionPolicy::default());

        assert_eq!(out.len(), 6);
        assert_eq!(out[0].to_string(), "200.10.251.0/24");
        assert_eq!(out[1].to_string(), "163.247.0.0/18");
        assert_eq!(out[4].to_string(), "163.247.192.0/18");
        assert_eq!(out[5].to_string(), "45.230.22.0/24");
    }

    #[test]
    fn test_expand_empty() {
        assert!(expand_blocks(&[], &ExpansionPolicy::default()).is_empty());
    }

    #[test]
    fn test_target_for_never_coarser_than_block() {
        let policy = ExpansionPolicy {
            split_below: 24,
            wide_prefix: 20,
            wide_target: 18,
            target: 24,
        };
        // /20 is wide under this policy but 18 < 20, so it is not widened
        assert_eq!(policy.target_for(&cidr("10.0.0.0/20")), Some(20));
        assert_eq!(policy.target_for(&cidr("10.0.0.0/24")), None);
    }
}
