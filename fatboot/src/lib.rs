//! Read-only FAT32 loader for the next boot stage.
//!
//! Given a block device, the loader finds the first partition of the MBR,
//! checks that it holds a FAT32 volume, and copies one of two well-known files
//! from the root directory into a caller-provided buffer.
//!
//! ```rust,no_run
//! # use fatboot::{boot::{load_kernel, LoaderConfig}, RamDisk};
//! # let image = [0_u8; 0];
//! let mut device = RamDisk::new(&image);
//! let mut dest = [0_u8; 0x10_0000];
//! let kernel = load_kernel(&mut device, &mut dest, &LoaderConfig::default(), false)?;
//! let image = &dest[..kernel.len()];
//! # Ok::<(), fatboot::LoadError>(())
//! ```
#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_errors_doc)]

pub use fatboot_core::storage::{BlockDevice, BlockDeviceError, RamDisk};

pub mod boot;
mod error;
pub mod fs;
pub mod logging;
pub mod partition;

pub use error::{LoadError, LoadResult, Region, StatusCode};

/// Size of a sector in bytes.
///
/// Every device the loader reads from must use this block size.
pub const SECTOR_SIZE: usize = 512;

fatboot_core::static_assert!(RamDisk::SECTOR_SIZE == SECTOR_SIZE);

/// Reads `dst.len() / SECTOR_SIZE` sectors starting at `sector`.
///
/// Failures are logged with their status code and reported as a read error on `region`.
pub(crate) fn read_sectors<D: BlockDevice>(
    device: &mut D,
    dst: &mut [u8],
    sector: u32,
    region: Region,
) -> LoadResult<()> {
    const { assert!(D::BLOCK_SIZE == SECTOR_SIZE, "unsupported block size") };

    device.read(dst, sector as usize).map_err(|err| {
        let error = LoadError::Read(region);
        log::error!(
            "{error} at sector {sector}: {err} (status {:#04x})",
            u8::from(error.status_code())
        );
        error
    })
}
