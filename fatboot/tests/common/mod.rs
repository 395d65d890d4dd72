//! Synthetic disk images for the integration tests.
#![allow(dead_code)]

use fatboot::{BlockDevice, BlockDeviceError};

pub const SECTOR_SIZE: usize = 512;

/// Layout of every test image.
pub const PARTITION_START: u32 = 8;
pub const RESERVED_SECTORS: u16 = 4;
pub const FAT_START: u32 = PARTITION_START + RESERVED_SECTORS as u32;
pub const SECTORS_PER_FAT: u32 = 1;
pub const FAT_COUNT: u8 = 2;
pub const DATA_START: u32 = FAT_START + SECTORS_PER_FAT * FAT_COUNT as u32;
pub const CLUSTER_SIZE: u8 = 2;
pub const CLUSTER_BYTES: usize = CLUSTER_SIZE as usize * SECTOR_SIZE;
pub const ROOT_CLUSTER: u32 = 2;

pub const END_OF_CHAIN: u32 = 0x0FFF_FFFF;

/// MBR followed by a FAT32 partition with an empty root directory in cluster 2.
pub struct Image {
    pub bytes: Vec<u8>,
    root_clusters: Vec<u32>,
}

impl Image {
    pub fn new(clusters: u32) -> Self {
        let sectors = DATA_START + clusters * u32::from(CLUSTER_SIZE);
        let mut image = Self {
            bytes: vec![0; sectors as usize * SECTOR_SIZE],
            root_clusters: Vec::new(),
        };

        // MBR
        let mbr = &mut image.bytes[..SECTOR_SIZE];
        mbr[446] = 0x80;
        mbr[446 + 4] = 0x0C;
        mbr[446 + 8..446 + 12].copy_from_slice(&PARTITION_START.to_le_bytes());
        mbr[446 + 12..446 + 16].copy_from_slice(&(sectors - PARTITION_START).to_le_bytes());
        mbr[510] = 0x55;
        mbr[511] = 0xAA;

        // Boot sector
        let start = PARTITION_START as usize * SECTOR_SIZE;
        let bs = &mut image.bytes[start..start + SECTOR_SIZE];
        bs[..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bs[3..11].copy_from_slice(b"MSWIN4.1");
        bs[11..13].copy_from_slice(&512_u16.to_le_bytes());
        bs[13] = CLUSTER_SIZE;
        bs[14..16].copy_from_slice(&RESERVED_SECTORS.to_le_bytes());
        bs[16] = FAT_COUNT;
        bs[36..40].copy_from_slice(&SECTORS_PER_FAT.to_le_bytes());
        bs[44..48].copy_from_slice(&ROOT_CLUSTER.to_le_bytes());
        bs[66] = 0x29;
        bs[71..82].copy_from_slice(b"NO NAME    ");
        bs[82..90].copy_from_slice(b"FAT32   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        // Media descriptor and end-of-chain entries for the reserved clusters.
        image.link(0, 0x0FFF_FFF8);
        image.link(1, END_OF_CHAIN);
        image.set_root_chain(&[ROOT_CLUSTER]);

        image
    }

    pub fn sector(cluster: u32) -> usize {
        (DATA_START + (cluster - 2) * u32::from(CLUSTER_SIZE)) as usize
    }

    /// Writes the FAT entry of `cluster` in every FAT copy.
    pub fn link(&mut self, cluster: u32, next: u32) {
        for fat in 0..u32::from(FAT_COUNT) {
            let offset = (FAT_START + fat * SECTORS_PER_FAT) as usize * SECTOR_SIZE
                + cluster as usize * 4;
            self.bytes[offset..offset + 4].copy_from_slice(&next.to_le_bytes());
        }
    }

    pub fn chain(&mut self, clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.link(pair[0], pair[1]);
        }
        self.link(*clusters.last().unwrap(), END_OF_CHAIN);
    }

    pub fn set_root_chain(&mut self, clusters: &[u32]) {
        self.chain(clusters);
        self.root_clusters = clusters.to_vec();
    }

    pub fn cluster_mut(&mut self, cluster: u32) -> &mut [u8] {
        let start = Self::sector(cluster) * SECTOR_SIZE;
        &mut self.bytes[start..start + CLUSTER_BYTES]
    }

    /// Writes a raw directory entry in the `slot`-th position of the root directory.
    pub fn add_entry(&mut self, slot: usize, name: &[u8; 11], attr: u8, cluster: u32, size: u32) {
        let offset = slot * 32;
        let root_cluster = self.root_clusters[offset / CLUSTER_BYTES];
        let entry = &mut self.cluster_mut(root_cluster)[offset % CLUSTER_BYTES..][..32];

        entry.fill(0);
        entry[..11].copy_from_slice(name);
        entry[11] = attr;
        entry[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        entry[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
        entry[28..32].copy_from_slice(&size.to_le_bytes());
    }

    /// Adds a file made of `clusters`, each filled with `fill`.
    pub fn add_file(&mut self, slot: usize, name: &[u8; 11], clusters: &[u32], fill: u8) {
        self.chain(clusters);
        for &cluster in clusters {
            self.cluster_mut(cluster).fill(fill);
        }
        let size = u32::try_from(clusters.len() * CLUSTER_BYTES).unwrap() - 100;
        self.add_entry(slot, name, 0x20, clusters[0], size);
    }
}

/// Block device over an image, recording every read as `(sector, count)`.
pub struct TracingDisk {
    pub image: Vec<u8>,
    pub reads: Vec<(usize, usize)>,
    /// Reads starting at this sector fail.
    pub fail_at: Option<usize>,
}

impl TracingDisk {
    pub fn new(image: Image) -> Self {
        Self {
            image: image.bytes,
            reads: Vec::new(),
            fail_at: None,
        }
    }

    pub fn failing_at(image: Image, sector: usize) -> Self {
        Self {
            fail_at: Some(sector),
            ..Self::new(image)
        }
    }

    pub fn read_count(&self, read: (usize, usize)) -> usize {
        self.reads.iter().filter(|&&r| r == read).count()
    }
}

impl BlockDevice for TracingDisk {
    const BLOCK_SIZE: usize = SECTOR_SIZE;

    fn read(&mut self, dst: &mut [u8], offset: usize) -> Result<(), BlockDeviceError> {
        if dst.len() % SECTOR_SIZE != 0 {
            return Err(BlockDeviceError::UnalignedAccess);
        }
        self.reads.push((offset, dst.len() / SECTOR_SIZE));

        if self.fail_at == Some(offset) {
            return Err(BlockDeviceError::Io);
        }

        let start = offset * SECTOR_SIZE;
        let src = self
            .image
            .get(start..start + dst.len())
            .ok_or(BlockDeviceError::OutOfBounds)?;
        dst.copy_from_slice(src);
        Ok(())
    }
}
