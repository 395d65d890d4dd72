use thiserror::Error;

#[derive(Debug, Error, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
/// An error that can occur when performing block device operations.
pub enum BlockDeviceError {
    #[error("I/O error")]
    Io,
    #[error("Out of bounds")]
    OutOfBounds,
    #[error("Unaligned access")]
    UnalignedAccess,
}

/// A trait for block devices.
///
/// These are physical devices (such as SD cards and hard drives) that perform
/// read operations in fixed-size blocks.
/// The boot stage never writes, so the trait only exposes reads.
pub trait BlockDevice {
    const BLOCK_SIZE: usize;

    /// Read consecutive blocks from the device into the given buffer.
    ///
    /// The `offset` parameter specifies the block offset from the start of the device.
    /// The number of blocks read is `dst.len() / Self::BLOCK_SIZE`.
    ///
    /// ## Errors
    ///
    /// This function returns an error if the read operation failed
    /// or if `dst.len()` isn't a multiple of `Self::BLOCK_SIZE`.
    fn read(&mut self, dst: &mut [u8], offset: usize) -> Result<(), BlockDeviceError>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    const BLOCK_SIZE: usize = T::BLOCK_SIZE;

    #[inline]
    fn read(&mut self, dst: &mut [u8], offset: usize) -> Result<(), BlockDeviceError> {
        (**self).read(dst, offset)
    }
}

/// A block device backed by a disk image that is already in memory.
///
/// Blocks are 512 bytes long. A trailing partial block of the image is not addressable.
#[derive(Debug, Clone, Copy)]
pub struct RamDisk<'a> {
    image: &'a [u8],
}

impl<'a> RamDisk<'a> {
    /// Size of a block in bytes.
    pub const SECTOR_SIZE: usize = 512;

    #[must_use]
    #[inline]
    pub const fn new(image: &'a [u8]) -> Self {
        Self { image }
    }

    #[must_use]
    #[inline]
    /// Returns the number of addressable blocks.
    pub const fn block_count(&self) -> usize {
        self.image.len() / Self::SECTOR_SIZE
    }
}

impl BlockDevice for RamDisk<'_> {
    const BLOCK_SIZE: usize = Self::SECTOR_SIZE;

    fn read(&mut self, dst: &mut [u8], offset: usize) -> Result<(), BlockDeviceError> {
        if dst.len() % Self::BLOCK_SIZE != 0 {
            return Err(BlockDeviceError::UnalignedAccess);
        }

        let count = dst.len() / Self::BLOCK_SIZE;
        let end = offset
            .checked_add(count)
            .ok_or(BlockDeviceError::OutOfBounds)?;
        if end > self.block_count() {
            return Err(BlockDeviceError::OutOfBounds);
        }

        let start = offset * Self::BLOCK_SIZE;
        dst.copy_from_slice(&self.image[start..start + dst.len()]);
        Ok(())
    }
}
