//! Cluster chain loading.
//!
//! Every device command has a significant fixed overhead, so runs of consecutive
//! clusters are coalesced into a single multi-sector read.
use crate::{BlockDevice, LoadError, LoadResult, Region, SECTOR_SIZE};
use log::{debug, error, warn};

use super::{Cluster, Geometry};

/// The last FAT sector read from the device.
///
/// FAT32 entries are 4 bytes wide, so consecutive clusters nearly always
/// share a FAT sector and the sector is only read again when that changes.
pub struct FatCache {
    sector: Option<u32>,
    buffer: [u8; SECTOR_SIZE],
}

impl Default for FatCache {
    fn default() -> Self {
        Self::new()
    }
}

impl FatCache {
    #[must_use]
    #[inline]
    pub const fn new() -> Self {
        Self {
            sector: None,
            buffer: [0; SECTOR_SIZE],
        }
    }

    #[must_use]
    #[inline]
    /// Sector currently held by the cache, if any.
    pub const fn sector(&self) -> Option<u32> {
        self.sector
    }

    /// Returns the successor of `cluster` in its chain.
    ///
    /// The FAT sector holding the entry is only read if it is not the cached one.
    pub fn next_cluster<D: BlockDevice>(
        &mut self,
        device: &mut D,
        geometry: &Geometry,
        cluster: Cluster,
    ) -> LoadResult<Cluster> {
        let fat_sector = geometry.fat_sector(cluster);

        if self.sector != Some(fat_sector) {
            // A failed read leaves the buffer in an unknown state.
            self.sector = None;
            crate::read_sectors(device, &mut self.buffer, fat_sector, Region::Fat)?;
            self.sector = Some(fat_sector);
        }

        let offset = cluster.fat_index() * 4;
        let entry = u32::from_le_bytes([
            self.buffer[offset],
            self.buffer[offset + 1],
            self.buffer[offset + 2],
            self.buffer[offset + 3],
        ]);

        Ok(Cluster::from_entry(entry))
    }
}

/// Size in bytes of `sector_count` sectors, if it fits in memory.
fn batch_len(sector_count: u32) -> Option<usize> {
    usize::try_from(sector_count).ok()?.checked_mul(SECTOR_SIZE)
}

/// Copies the cluster chain starting at `start` to the beginning of `dest`.
///
/// Returns the number of bytes written, which is always a whole number of clusters.
/// A free or reserved link ends the chain the same way an end-of-chain marker does.
pub fn load_chain<D: BlockDevice>(
    device: &mut D,
    geometry: &Geometry,
    start: Cluster,
    dest: &mut [u8],
) -> LoadResult<usize> {
    let mut fat = FatCache::new();
    let cluster_size = u32::from(geometry.cluster_size());

    let mut cluster = start;
    let mut written: usize = 0;

    loop {
        let data_sector = geometry.cluster_sector(cluster);
        let mut sector_count = cluster_size;

        // Extend the batch as long as the chain stays contiguous.
        loop {
            let next = fat.next_cluster(device, geometry, cluster)?;
            let contiguous = cluster.is_followed_by(next);
            cluster = next;

            if !contiguous {
                break;
            }
            sector_count = sector_count.saturating_add(cluster_size);
        }

        let len = batch_len(sector_count);
        // Clusters of zero sectors never fill `dest`, so a cyclic chain would never end.
        if len == Some(0) {
            warn!("Clusters are empty, chain at cluster {} not loaded", start.value());
            break;
        }
        let batch = len
            .and_then(|len| written.checked_add(len))
            .and_then(|end| dest.get_mut(written..end))
            .ok_or_else(|| {
                let err = LoadError::DestinationTooSmall;
                error!(
                    "{err}: {sector_count} sectors past byte {written} (status {:#04x})",
                    u8::from(err.status_code())
                );
                err
            })?;
        let len = batch.len();

        debug!("Reading {sector_count} sectors at sector {data_sector}");
        crate::read_sectors(device, batch, data_sector, Region::Data)?;
        written += len;

        if cluster.is_end_of_chain() {
            break;
        }
    }

    Ok(written)
}
