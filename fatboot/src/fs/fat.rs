//! Read-only FAT32 support.
//!
//! Only what is needed to copy a file out of the root directory is implemented:
//! boot sector decoding, cluster chain following and 8.3 directory lookup.

pub mod bs;
pub mod chain;
pub mod dirent;

pub use bs::{BootSector, Geometry, parse_boot_sector};
pub use chain::{FatCache, load_chain};
pub use dirent::{Attributes, DirEntry, InvalidShortName, ShortName, find_entry};

/// Number of FAT32 entries in a FAT sector.
pub const FAT_ENTRIES_PER_SECTOR: u32 = (crate::SECTOR_SIZE / 4) as u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Cluster number.
pub struct Cluster(u32);

impl Cluster {
    /// Only the low 28 bits of a FAT32 entry are significant.
    pub const ENTRY_MASK: u32 = 0x0FFF_FFFF;
    /// Entries at or above this value end a chain.
    pub const END_OF_CHAIN: u32 = 0x0FFF_FFF0;

    #[must_use]
    #[inline]
    pub const fn new(cluster: u32) -> Self {
        Self(cluster)
    }

    #[must_use]
    #[inline]
    /// Builds a cluster from a raw FAT32 table entry.
    pub const fn from_entry(entry: u32) -> Self {
        Self(entry & Self::ENTRY_MASK)
    }

    #[must_use]
    #[inline]
    pub const fn value(&self) -> u32 {
        self.0
    }

    #[must_use]
    #[inline]
    /// Returns true if a chain stops at this link.
    ///
    /// Free and reserved links (0 and 1) end the chain like the end-of-chain markers do.
    pub const fn is_end_of_chain(&self) -> bool {
        self.0 >= Self::END_OF_CHAIN || self.0 <= 1
    }

    #[must_use]
    #[inline]
    /// Returns true if `next` directly follows this cluster on disk.
    pub const fn is_followed_by(&self, next: Self) -> bool {
        next.0 == self.0.wrapping_add(1)
    }

    #[must_use]
    #[inline]
    /// Sector of the FAT holding this cluster's entry, relative to the FAT start.
    pub const fn fat_sector(&self) -> u32 {
        self.0 / FAT_ENTRIES_PER_SECTOR
    }

    #[must_use]
    #[inline]
    /// Index of this cluster's entry in its FAT sector.
    pub const fn fat_index(&self) -> usize {
        (self.0 % FAT_ENTRIES_PER_SECTOR) as usize
    }
}
