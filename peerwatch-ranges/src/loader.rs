//! Range file loaders.
//!
//! Both files share the same line rules:
//! - One entry per line
//! - Lines starting with # are comments
//! - Empty lines are ignored
//! - Leading and trailing whitespace is trimmed
//!
//! Range table lines are `CIDR [label...]`; the label is everything after the first
//! run of whitespace and may itself contain spaces. Blocks files hold a bare CIDR
//! per line.

use std::path::Path;

use peerwatch_fs::{Filesystem, FsError};
use thiserror::Error;

use crate::cidr::{Cidr, CidrError};
use crate::table::RangeTable;

/// Errors from range file loading.
#[derive(Debug, Error)]
pub enum RangeLoadError {
    #[error("failed to read range file: {0}")]
    Read(#[from] FsError),

    #[error("invalid entry on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: CidrError,
    },

    #[error("blocks file lists no blocks")]
    NoBlocks,
}

/// Non-comment, non-empty lines with their 1-based line numbers.
fn entries(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse range table content from a string.
pub fn parse_range_table(content: &str) -> Result<RangeTable, RangeLoadError> {
    let mut table = RangeTable::empty();

    for (line, text) in entries(content) {
        let (cidr_part, label_part) = match text.split_once(char::is_whitespace) {
            Some((cidr, rest)) => (cidr, rest.trim()),
            None => (text, ""),
        };

        let cidr = cidr_part
            .parse::<Cidr>()
            .map_err(|source| RangeLoadError::Parse { line, source })?;
        let label = (!label_part.is_empty()).then(|| label_part.to_string());

        table.push(cidr, label);
    }

    Ok(table)
}

/// Parse blocks content from a string.
pub fn parse_blocks(content: &str) -> Result<Vec<Cidr>, RangeLoadError> {
    let blocks = entries(content)
        .map(|(line, text)| {
            text.parse::<Cidr>()
                .map_err(|source| RangeLoadError::Parse { line, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if blocks.is_empty() {
        return Err(RangeLoadError::NoBlocks);
    }
    Ok(blocks)
}

/// Load a range table from a file.
pub fn load_range_table<F: Filesystem>(fs: &F, path: &Path) -> Result<RangeTable, RangeLoadError> {
    let content = fs.read_file(path)?;
    parse_range_table(&content)
}

/// Load scan blocks from a file.
pub fn load_blocks<F: Filesystem>(fs: &F, path: &Path) -> Result<Vec<Cidr>, RangeLoadError> {
    let content = fs.read_file(path)?;
    parse_blocks(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use peerwatch_fs::MockFilesystem;
    use std::net::Ipv4Addr;
    use std::path::PathBuf;

    // ===========================================
    // Range table parsing
    // ===========================================

    #[test]
    fn test_parse_range_table_empty() {
        assert!(parse_range_table("").expect("parse").is_empty());
    }

    #[test]
    fn test_parse_range_table_comments_and_blank_lines() {
        let content = "# header\n\n   # indented comment\n\t\n";
        assert!(parse_range_table(content).expect("parse").is_empty());
    }

    #[test]
    fn test_parse_range_table_labels() {
        let content = "163.247.45.0/24 @Min_Hacienda\n163.247.80.0/24   Red de Salud @BdoMartorell\n10.0.0.0/8\n";
        let table = parse_range_table(content).expect("parse");

        assert_eq!(table.len(), 3);
        assert_eq!(table.entries()[0].label.as_deref(), Some("@Min_Hacienda"));
        assert_eq!(table.entries()[1].label.as_deref(), Some("Red de Salud @BdoMartorell"));
        assert_eq!(table.entries()[2].label, None);
    }

    #[test]
    fn test_parse_range_table_preserves_declared_order() {
        let content = "10.0.0.0/8 wide\n10.1.0.0/16 narrow\n";
        let table = parse_range_table(content).expect("parse");
        assert_eq!(table.attribute(Ipv4Addr::new(10, 1, 2, 3)), Some("wide"));
    }

    #[test]
    fn test_parse_range_table_tab_separator() {
        let table = parse_range_table("45.229.137.0/24\t@TVN\n").expect("parse");
        assert_eq!(table.entries()[0].label.as_deref(), Some("@TVN"));
    }

    #[test]
    fn test_parse_range_table_invalid_on_line_3() {
        let content = "# comment\n10.0.0.0/8 ok\n10.0.0.0/40 bad\n";
        let err = parse_range_table(content).unwrap_err();
        assert!(matches!(err, RangeLoadError::Parse { line: 3, .. }));
        assert!(err.to_string().contains("line 3"));
    }

    // ===========================================
    // Blocks parsing
    // ===========================================

    #[test]
    fn test_parse_blocks() {
        let blocks = parse_blocks("# scan\n163.247.0.0/16\n200.10.182.0/24\n").expect("parse");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].to_string(), "200.10.182.0/24");
    }

    #[test]
    fn test_parse_blocks_rejects_empty() {
        assert!(matches!(parse_blocks("# nothing\n"), Err(RangeLoadError::NoBlocks)));
    }

    #[test]
    fn test_parse_blocks_rejects_label() {
        let err = parse_blocks("10.0.0.0/8 label\n").unwrap_err();
        assert!(matches!(err, RangeLoadError::Parse { line: 1, .. }));
    }

    // ===========================================
    // File loading
    // ===========================================

    #[test]
    fn test_load_range_table_from_file() {
        let fs = MockFilesystem::new();
        let path = PathBuf::from("/etc/peerwatch/ranges.txt");
        fs.add_file(path.clone(), b"160.238.212.0/24 @bcentralchile\n".to_vec());

        let table = load_range_table(&fs, &path).expect("load");
        assert_eq!(table.attribute(Ipv4Addr::new(160, 238, 212, 9)), Some("@bcentralchile"));
    }

    #[test]
    fn test_load_range_table_file_not_found() {
        let fs = MockFilesystem::new();
        let result = load_range_table(&fs, Path::new("/nonexistent/ranges.txt"));
        assert!(matches!(result, Err(RangeLoadError::Read(_))));
    }

    #[test]
    fn test_load_blocks_from_file() {
        let fs = MockFilesystem::new();
        let path = PathBuf::from("/etc/peerwatch/blocks.txt");
        fs.add_file(path.clone(), b"10.0.0.0/16\n".to_vec());

        assert_eq!(load_blocks(&fs, &path).expect("load").len(), 1);
    }

    #[test]
    fn test_range_load_error_display_read() {
        let err = RangeLoadError::Read(FsError::Path("test".to_string()));
        assert!(err.to_string().contains("failed to read range file"));
    }
}
