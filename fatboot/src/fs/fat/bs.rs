//! FAT32 boot sector and the volume geometry derived from it.
use crate::{BlockDevice, LoadError, LoadResult, Region, SECTOR_SIZE};
use log::{debug, error, info};

use super::Cluster;

/// FAT32 extended BIOS Parameter Block, the "volume info" that follows the BPB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeInfo {
    /// Logical drive number.
    drive_number: u8,
    /// Extended boot signature.
    ///
    /// 0x29 when the three following fields are present.
    boot_signature: u8,
    /// Volume serial number.
    volume_id: u32,
    /// Volume label, blank padded.
    volume_label: [u8; 11],
    /// File system type, blank padded.
    fs_type: [u8; 8],
}

impl VolumeInfo {
    /// Offset of the structure in the boot sector.
    const OFFSET: usize = 64;

    const DRIVE_NUMBER: usize = Self::OFFSET;
    const BOOT_SIGNATURE: usize = Self::OFFSET + 2;
    const VOLUME_ID: usize = Self::OFFSET + 3;
    const VOLUME_LABEL: usize = Self::OFFSET + 7;
    const FS_TYPE: usize = Self::OFFSET + 18;

    fn parse(sector: &[u8; SECTOR_SIZE]) -> Self {
        let mut volume_label = [0; 11];
        volume_label.copy_from_slice(&sector[Self::VOLUME_LABEL..Self::VOLUME_LABEL + 11]);
        let mut fs_type = [0; 8];
        fs_type.copy_from_slice(&sector[Self::FS_TYPE..Self::FS_TYPE + 8]);

        Self {
            drive_number: sector[Self::DRIVE_NUMBER],
            boot_signature: sector[Self::BOOT_SIGNATURE],
            volume_id: read_u32(sector, Self::VOLUME_ID),
            volume_label,
            fs_type,
        }
    }

    #[must_use]
    #[inline]
    pub const fn drive_number(&self) -> u8 {
        self.drive_number
    }

    #[must_use]
    #[inline]
    pub const fn boot_signature(&self) -> u8 {
        self.boot_signature
    }

    #[must_use]
    #[inline]
    pub const fn volume_id(&self) -> u32 {
        self.volume_id
    }

    #[must_use]
    #[inline]
    pub const fn volume_label(&self) -> &[u8; 11] {
        &self.volume_label
    }

    #[must_use]
    #[inline]
    pub const fn fs_type(&self) -> &[u8; 8] {
        &self.fs_type
    }

    #[must_use]
    #[inline]
    /// Returns true if the file system type tag starts with "FAT32".
    pub fn is_fat32(&self) -> bool {
        self.fs_type.starts_with(b"FAT32")
    }
}

/// FAT32 boot sector fields needed to locate the FAT and the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    /// Bytes per sector.
    ///
    /// The loader always reads 512-byte sectors, this is informational.
    bytes_per_sector: u16,
    /// Sectors per cluster.
    sectors_per_cluster: u8,
    /// Reserved sectors before the first FAT.
    reserved_sectors: u16,
    /// Number of FATs.
    fat_count: u8,
    /// Sectors per FAT.
    sectors_per_fat: u32,
    /// Cluster number of the root directory.
    root_cluster: u32,
    volume_info: VolumeInfo,
}

impl BootSector {
    const BYTES_PER_SECTOR: usize = 11;
    const SECTORS_PER_CLUSTER: usize = 13;
    const RESERVED_SECTORS: usize = 14;
    const FAT_COUNT: usize = 16;
    const SECTORS_PER_FAT: usize = 36;
    const ROOT_CLUSTER: usize = 44;

    /// Decodes a boot sector, checking that it describes a FAT32 volume.
    pub fn parse(sector: &[u8; SECTOR_SIZE]) -> LoadResult<Self> {
        let volume_info = VolumeInfo::parse(sector);
        if !volume_info.is_fat32() {
            return Err(LoadError::UnsupportedFilesystem);
        }

        Ok(Self {
            bytes_per_sector: read_u16(sector, Self::BYTES_PER_SECTOR),
            sectors_per_cluster: sector[Self::SECTORS_PER_CLUSTER],
            reserved_sectors: read_u16(sector, Self::RESERVED_SECTORS),
            fat_count: sector[Self::FAT_COUNT],
            sectors_per_fat: read_u32(sector, Self::SECTORS_PER_FAT),
            root_cluster: read_u32(sector, Self::ROOT_CLUSTER),
            volume_info,
        })
    }

    #[must_use]
    #[inline]
    pub const fn bytes_per_sector(&self) -> u16 {
        self.bytes_per_sector
    }

    #[must_use]
    #[inline]
    pub const fn sectors_per_cluster(&self) -> u8 {
        self.sectors_per_cluster
    }

    #[must_use]
    #[inline]
    pub const fn reserved_sectors(&self) -> u16 {
        self.reserved_sectors
    }

    #[must_use]
    #[inline]
    pub const fn fat_count(&self) -> u8 {
        self.fat_count
    }

    #[must_use]
    #[inline]
    pub const fn sectors_per_fat(&self) -> u32 {
        self.sectors_per_fat
    }

    #[must_use]
    #[inline]
    pub const fn root_cluster(&self) -> u32 {
        self.root_cluster
    }

    #[must_use]
    #[inline]
    pub const fn volume_info(&self) -> &VolumeInfo {
        &self.volume_info
    }

    #[must_use]
    /// Derives the volume geometry for a boot sector found at `partition_start`.
    ///
    /// Values are taken as they are on disk, a corrupt sector yields garbage geometry.
    pub const fn geometry(&self, partition_start: u32) -> Geometry {
        let fat_start = partition_start.wrapping_add(self.reserved_sectors as u32);
        let fat_sectors = self.sectors_per_fat.wrapping_mul(self.fat_count as u32);

        Geometry {
            fat_start,
            data_start: fat_start.wrapping_add(fat_sectors),
            cluster_size: self.sectors_per_cluster,
            root_cluster: Cluster::new(self.root_cluster),
        }
    }
}

/// Location of the FAT and of the data region on the device.
///
/// Computed once per load and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    fat_start: u32,
    data_start: u32,
    cluster_size: u8,
    root_cluster: Cluster,
}

impl Geometry {
    #[must_use]
    #[inline]
    pub const fn new(
        fat_start: u32,
        data_start: u32,
        cluster_size: u8,
        root_cluster: Cluster,
    ) -> Self {
        Self {
            fat_start,
            data_start,
            cluster_size,
            root_cluster,
        }
    }

    #[must_use]
    #[inline]
    /// Sector of the first FAT.
    pub const fn fat_start(&self) -> u32 {
        self.fat_start
    }

    #[must_use]
    #[inline]
    /// Sector of cluster 2.
    pub const fn data_start(&self) -> u32 {
        self.data_start
    }

    #[must_use]
    #[inline]
    /// Sectors per cluster.
    pub const fn cluster_size(&self) -> u8 {
        self.cluster_size
    }

    #[must_use]
    #[inline]
    pub const fn root_cluster(&self) -> Cluster {
        self.root_cluster
    }

    #[must_use]
    #[inline]
    /// First sector of the given cluster.
    pub const fn cluster_sector(&self, cluster: Cluster) -> u32 {
        self.data_start.wrapping_add(
            cluster
                .value()
                .wrapping_sub(2)
                .wrapping_mul(self.cluster_size as u32),
        )
    }

    #[must_use]
    #[inline]
    /// Sector of the FAT holding the entry of the given cluster.
    pub const fn fat_sector(&self, cluster: Cluster) -> u32 {
        self.fat_start.wrapping_add(cluster.fat_sector())
    }
}

/// Reads the boot sector of the partition starting at `partition_start`
/// and derives the volume geometry from it.
pub fn parse_boot_sector<D: BlockDevice>(
    device: &mut D,
    partition_start: u32,
) -> LoadResult<Geometry> {
    let mut sector = [0; SECTOR_SIZE];
    crate::read_sectors(device, &mut sector, partition_start, Region::BootSector)?;

    let bs = BootSector::parse(&sector).inspect_err(|err| {
        error!("{err} (status {:#04x})", u8::from(err.status_code()));
    })?;
    let geometry = bs.geometry(partition_start);

    info!("FAT32 filesystem detected");
    debug!(
        "FAT at sector {}, data at sector {}, {} sectors per cluster, root cluster {}",
        geometry.fat_start(),
        geometry.data_start(),
        geometry.cluster_size(),
        geometry.root_cluster().value()
    );

    Ok(geometry)
}

#[inline]
fn read_u16(sector: &[u8; SECTOR_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([sector[offset], sector[offset + 1]])
}

#[inline]
fn read_u32(sector: &[u8; SECTOR_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        sector[offset],
        sector[offset + 1],
        sector[offset + 2],
        sector[offset + 3],
    ])
}
