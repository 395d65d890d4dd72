//! Master Boot Record (MBR) partition table.
use crate::{BlockDevice, LoadError, LoadResult, Region, SECTOR_SIZE};
use log::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Entry of the MBR partition table.
pub struct PartitionEntry {
    /// Status byte.
    ///
    /// 0x80 for a bootable partition, 0x00 for an inactive one.
    status: u8,
    /// Partition type byte.
    kind: u8,
    /// LBA of the first sector of the partition.
    lba_start: u32,
    /// Number of sectors in the partition.
    sector_count: u32,
}

impl PartitionEntry {
    pub const SIZE: usize = 16;

    pub const STATUS_INACTIVE: u8 = 0x00;
    pub const STATUS_BOOTABLE: u8 = 0x80;

    const STATUS_OFFSET: usize = 0;
    const KIND_OFFSET: usize = 4;
    const LBA_OFFSET: usize = 8;
    const COUNT_OFFSET: usize = 12;

    #[must_use]
    pub const fn parse(raw: &[u8; Self::SIZE]) -> Self {
        Self {
            status: raw[Self::STATUS_OFFSET],
            kind: raw[Self::KIND_OFFSET],
            lba_start: u32::from_le_bytes([
                raw[Self::LBA_OFFSET],
                raw[Self::LBA_OFFSET + 1],
                raw[Self::LBA_OFFSET + 2],
                raw[Self::LBA_OFFSET + 3],
            ]),
            sector_count: u32::from_le_bytes([
                raw[Self::COUNT_OFFSET],
                raw[Self::COUNT_OFFSET + 1],
                raw[Self::COUNT_OFFSET + 2],
                raw[Self::COUNT_OFFSET + 3],
            ]),
        }
    }

    #[must_use]
    #[inline]
    pub const fn status(&self) -> u8 {
        self.status
    }

    #[must_use]
    #[inline]
    pub const fn kind(&self) -> u8 {
        self.kind
    }

    #[must_use]
    #[inline]
    pub const fn lba_start(&self) -> u32 {
        self.lba_start
    }

    #[must_use]
    #[inline]
    pub const fn sector_count(&self) -> u32 {
        self.sector_count
    }

    #[must_use]
    #[inline]
    /// Returns true if the status byte is one of the two defined values.
    pub const fn has_valid_status(&self) -> bool {
        matches!(self.status, Self::STATUS_INACTIVE | Self::STATUS_BOOTABLE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Decoded MBR, i.e. sector 0 of the device.
pub struct Mbr {
    partitions: [PartitionEntry; 4],
}

impl Mbr {
    pub const SIGNATURE: u16 = 0xAA55;

    const TABLE_OFFSET: usize = 446;
    const SIGNATURE_OFFSET: usize = 510;

    /// Decodes sector 0, checking its boot signature.
    pub fn parse(sector: &[u8; SECTOR_SIZE]) -> LoadResult<Self> {
        let signature = u16::from_le_bytes([
            sector[Self::SIGNATURE_OFFSET],
            sector[Self::SIGNATURE_OFFSET + 1],
        ]);
        if signature != Self::SIGNATURE {
            return Err(LoadError::NoSignature);
        }

        let partitions = core::array::from_fn(|i| {
            let start = Self::TABLE_OFFSET + i * PartitionEntry::SIZE;
            let mut raw = [0; PartitionEntry::SIZE];
            raw.copy_from_slice(&sector[start..start + PartitionEntry::SIZE]);
            PartitionEntry::parse(&raw)
        });

        Ok(Self { partitions })
    }

    #[must_use]
    #[inline]
    pub const fn partitions(&self) -> &[PartitionEntry; 4] {
        &self.partitions
    }

    /// Returns the first partition entry, which must have a valid status byte.
    ///
    /// The other three entries are never consulted.
    pub const fn first_partition(&self) -> LoadResult<&PartitionEntry> {
        let first = &self.partitions[0];
        if first.has_valid_status() {
            Ok(first)
        } else {
            Err(LoadError::BadPartitionStatus(first.status))
        }
    }
}

/// Reads the MBR and returns the starting sector of the first partition.
pub fn locate_first_partition<D: BlockDevice>(device: &mut D) -> LoadResult<u32> {
    let mut sector = [0; SECTOR_SIZE];
    crate::read_sectors(device, &mut sector, 0, Region::PartitionTable)?;

    let lba = Mbr::parse(&sector)
        .and_then(|mbr| mbr.first_partition().map(PartitionEntry::lba_start))
        .inspect_err(|err| {
            error!("{err} (status {:#04x})", u8::from(err.status_code()));
        })?;

    Ok(lba)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbr_with_first_partition(status: u8, lba: u32) -> [u8; SECTOR_SIZE] {
        let mut sector = [0; SECTOR_SIZE];
        sector[446] = status;
        sector[446 + 4] = 0x0C;
        sector[446 + 8..446 + 12].copy_from_slice(&lba.to_le_bytes());
        sector[446 + 12..446 + 16].copy_from_slice(&0x1000_u32.to_le_bytes());
        sector[510] = 0x55;
        sector[511] = 0xAA;
        sector
    }

    #[test]
    fn test_parse_accepts_defined_statuses() {
        for status in [PartitionEntry::STATUS_INACTIVE, PartitionEntry::STATUS_BOOTABLE] {
            let mbr = Mbr::parse(&mbr_with_first_partition(status, 2048)).unwrap();
            let first = mbr.first_partition().unwrap();
            assert_eq!(first.status(), status);
            assert_eq!(first.kind(), 0x0C);
            assert_eq!(first.lba_start(), 2048);
            assert_eq!(first.sector_count(), 0x1000);
        }
    }

    #[test]
    fn test_parse_rejects_bad_status() {
        for status in [0x01, 0x7F, 0x81, 0xFF] {
            let mbr = Mbr::parse(&mbr_with_first_partition(status, 2048)).unwrap();
            assert_eq!(
                mbr.first_partition(),
                Err(LoadError::BadPartitionStatus(status))
            );
        }
    }

    #[test]
    fn test_parse_rejects_bad_signature() {
        let mut sector = mbr_with_first_partition(0x80, 2048);
        sector[510] = 0xAA;
        sector[511] = 0x55;
        assert_eq!(Mbr::parse(&sector), Err(LoadError::NoSignature));

        sector[510] = 0;
        sector[511] = 0;
        assert_eq!(Mbr::parse(&sector), Err(LoadError::NoSignature));
    }

    #[test]
    fn test_only_first_entry_is_checked() {
        let mut sector = mbr_with_first_partition(0x00, 63);
        // Garbage in the second entry.
        sector[446 + 16] = 0x42;
        let mbr = Mbr::parse(&sector).unwrap();
        assert_eq!(mbr.partitions()[1].status(), 0x42);
        assert_eq!(mbr.first_partition().unwrap().lba_start(), 63);
    }
}
