//! Read and write settings for physical packages.

/// Maximum allowed *inflated* bytes for a single ZIP member.
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256 MiB

/// Maximum allowed *inflated* bytes across all ZIP members read from one package.
pub const MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024; // 512 MiB

/// Limits enforced while reading a physical package.
///
/// These keep a hostile archive (a ZIP bomb) from being inflated into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum allowed uncompressed bytes for any single member.
    pub max_part_bytes: u64,
    /// Maximum allowed uncompressed bytes across the whole package.
    pub max_total_bytes: u64,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_part_bytes: MAX_PART_BYTES,
            max_total_bytes: MAX_TOTAL_BYTES,
        }
    }
}

/// How members are stored in a written package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

/// Settings for writing a physical package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    pub compression: Compression,
}
