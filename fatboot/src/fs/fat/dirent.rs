use super::Cluster;
use thiserror::Error;

/// Size of a directory entry in bytes (always 32 bytes)
pub const DIR_ENTRY_SIZE: usize = 32;

fatboot_core::static_assert!(crate::SECTOR_SIZE % DIR_ENTRY_SIZE == 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Directory entry attributes
pub struct Attributes(u8);

impl Attributes {
    /// Read-only attribute
    pub const READ_ONLY: u8 = 0x01;
    /// Hidden attribute
    pub const HIDDEN: u8 = 0x02;
    /// System attribute
    pub const SYSTEM: u8 = 0x04;
    /// Volume ID attribute
    pub const VOLUME_ID: u8 = 0x08;
    /// Directory attribute
    pub const DIRECTORY: u8 = 0x10;
    /// Archive attribute
    pub const ARCHIVE: u8 = 0x20;

    #[must_use]
    #[inline]
    pub const fn new(attributes: u8) -> Self {
        Self(attributes)
    }

    #[must_use]
    #[inline]
    pub const fn bits(&self) -> u8 {
        self.0
    }

    #[must_use]
    #[inline]
    pub const fn is_read_only(&self) -> bool {
        self.0 & Self::READ_ONLY != 0
    }

    #[must_use]
    #[inline]
    pub const fn is_hidden(&self) -> bool {
        self.0 & Self::HIDDEN != 0
    }

    #[must_use]
    #[inline]
    pub const fn is_volume_id(&self) -> bool {
        self.0 & Self::VOLUME_ID != 0
    }

    #[must_use]
    #[inline]
    pub const fn is_directory(&self) -> bool {
        self.0 & Self::DIRECTORY != 0
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Invalid 8.3 file name")]
pub struct InvalidShortName;

/// Blank-padded 8.3 file name, as stored in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortName([u8; 11]);

impl ShortName {
    const NAME_LEN: usize = 8;
    const EXT_LEN: usize = 3;

    #[must_use]
    #[inline]
    /// Wraps an on-disk name, e.g. `b"KERNEL  BIN"`.
    pub const fn new(raw: &[u8; 11]) -> Self {
        Self(*raw)
    }

    #[must_use]
    #[inline]
    pub const fn as_bytes(&self) -> &[u8; 11] {
        &self.0
    }

    const fn is_valid_char(c: u8) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'('
                    | b')'
                    | b'-'
                    | b'@'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'{'
                    | b'}'
                    | b'~'
            )
    }
}

impl core::str::FromStr for ShortName {
    type Err = InvalidShortName;

    /// Builds a short name from its display form, e.g. `"kernel.bin"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, ext) = s.split_once('.').unwrap_or((s, ""));

        if name.is_empty()
            || name.len() > Self::NAME_LEN
            || ext.len() > Self::EXT_LEN
            || !name.bytes().chain(ext.bytes()).all(Self::is_valid_char)
        {
            return Err(InvalidShortName);
        }

        let mut raw = [b' '; 11];
        for (dst, src) in raw.iter_mut().zip(name.bytes()) {
            *dst = src.to_ascii_uppercase();
        }
        for (dst, src) in raw[Self::NAME_LEN..].iter_mut().zip(ext.bytes()) {
            *dst = src.to_ascii_uppercase();
        }

        Ok(Self(raw))
    }
}

impl core::fmt::Display for ShortName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let (name, ext) = self.0.split_at(Self::NAME_LEN);

        for &c in name.iter().take_while(|&&c| c != b' ') {
            write!(f, "{}", char::from(c))?;
        }
        if ext.iter().any(|&c| c != b' ') {
            write!(f, ".")?;
            for &c in ext.iter().take_while(|&&c| c != b' ') {
                write!(f, "{}", char::from(c))?;
            }
        }
        Ok(())
    }
}

/// FAT directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// 8.3 file name
    name: ShortName,
    /// File attributes
    attr: Attributes,
    /// High word of first cluster number
    first_cluster_high: u16,
    /// Low word of first cluster number
    first_cluster_low: u16,
    /// File size in bytes
    file_size: u32,
}

impl DirEntry {
    /// Deleted entry marker (first byte)
    pub const DELETED_ENTRY: u8 = 0xE5;
    /// End of directory marker (first byte)
    pub const END_OF_ENTRIES: u8 = 0x00;

    const ATTR_OFFSET: usize = 11;
    const CLUSTER_HIGH_OFFSET: usize = 20;
    const CLUSTER_LOW_OFFSET: usize = 26;
    const SIZE_OFFSET: usize = 28;

    #[must_use]
    pub fn parse(raw: &[u8; DIR_ENTRY_SIZE]) -> Self {
        let mut name = [0; 11];
        name.copy_from_slice(&raw[..11]);

        Self {
            name: ShortName(name),
            attr: Attributes::new(raw[Self::ATTR_OFFSET]),
            first_cluster_high: u16::from_le_bytes([
                raw[Self::CLUSTER_HIGH_OFFSET],
                raw[Self::CLUSTER_HIGH_OFFSET + 1],
            ]),
            first_cluster_low: u16::from_le_bytes([
                raw[Self::CLUSTER_LOW_OFFSET],
                raw[Self::CLUSTER_LOW_OFFSET + 1],
            ]),
            file_size: u32::from_le_bytes([
                raw[Self::SIZE_OFFSET],
                raw[Self::SIZE_OFFSET + 1],
                raw[Self::SIZE_OFFSET + 2],
                raw[Self::SIZE_OFFSET + 3],
            ]),
        }
    }

    #[must_use]
    #[inline]
    pub const fn name(&self) -> &ShortName {
        &self.name
    }

    #[must_use]
    #[inline]
    pub const fn attributes(&self) -> Attributes {
        self.attr
    }

    #[must_use]
    #[inline]
    /// Returns true if the entry marks the end of the directory
    pub const fn is_end(&self) -> bool {
        self.name.0[0] == Self::END_OF_ENTRIES
    }

    #[must_use]
    #[inline]
    pub const fn is_deleted(&self) -> bool {
        self.name.0[0] == Self::DELETED_ENTRY
    }

    #[must_use]
    #[inline]
    pub const fn first_cluster(&self) -> Cluster {
        Cluster::new(((self.first_cluster_high as u32) << 16) | self.first_cluster_low as u32)
    }

    #[must_use]
    #[inline]
    pub const fn file_size(&self) -> u32 {
        self.file_size
    }
}

/// Finds a file in a directory loaded in memory.
///
/// `entries` is read as consecutive 32-byte entries up to the end marker or the
/// end of the slice. Volume labels and subdirectories are skipped.
#[must_use]
pub fn find_entry(entries: &[u8], name: &ShortName) -> Option<DirEntry> {
    entries
        .chunks_exact(DIR_ENTRY_SIZE)
        .map(|raw| {
            let mut record = [0; DIR_ENTRY_SIZE];
            record.copy_from_slice(raw);
            DirEntry::parse(&record)
        })
        .take_while(|entry| !entry.is_end())
        .filter(|entry| !entry.attr.is_volume_id() && !entry.attr.is_directory())
        // Deleted entries start with 0xE5 and can never match a valid name.
        .find(|entry| entry.name == *name)
}
