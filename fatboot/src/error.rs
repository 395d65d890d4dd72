use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Part of the disk a failed read was aimed at.
pub enum Region {
    /// Sector 0 of the device.
    PartitionTable,
    /// First sector of the partition.
    BootSector,
    /// A sector of the first FAT.
    Fat,
    /// Cluster data.
    Data,
}

impl core::fmt::Display for Region {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::PartitionTable => write!(f, "partition table"),
            Self::BootSector => write!(f, "boot sector"),
            Self::Fat => write!(f, "FAT"),
            Self::Data => write!(f, "cluster data"),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
/// Error type for every step of a kernel load.
pub enum LoadError {
    #[error("Unable to read the {0}")]
    Read(Region),
    #[error("No MBR signature")]
    NoSignature,
    #[error("Unexpected partition status {0:#04x}")]
    BadPartitionStatus(u8),
    #[error("Not a FAT32 filesystem")]
    UnsupportedFilesystem,
    #[error("Kernel file not found")]
    NotFound,
    #[error("Destination buffer is too small")]
    DestinationTooSmall,
}

pub type LoadResult<T> = Result<T, LoadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
/// One-byte status reported on the diagnostics channel when a load fails.
pub enum StatusCode {
    PartitionTableRead = 0x00,
    NoSignature = 0x01,
    BadPartition = 0x02,
    DataRead = 0x03,
    FatRead = 0x04,
    UnsupportedFilesystem = 0x05,
    DestinationTooSmall = 0x06,
    NotFound = 0x07,
}

impl LoadError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Read(Region::PartitionTable) => StatusCode::PartitionTableRead,
            Self::Read(Region::BootSector | Region::Data) => StatusCode::DataRead,
            Self::Read(Region::Fat) => StatusCode::FatRead,
            Self::NoSignature => StatusCode::NoSignature,
            Self::BadPartitionStatus(_) => StatusCode::BadPartition,
            Self::UnsupportedFilesystem => StatusCode::UnsupportedFilesystem,
            Self::NotFound => StatusCode::NotFound,
            Self::DestinationTooSmall => StatusCode::DestinationTooSmall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            u8::from(LoadError::Read(Region::PartitionTable).status_code()),
            0x00
        );
        assert_eq!(u8::from(LoadError::NoSignature.status_code()), 0x01);
        assert_eq!(
            u8::from(LoadError::BadPartitionStatus(0x42).status_code()),
            0x02
        );
        assert_eq!(
            u8::from(LoadError::Read(Region::BootSector).status_code()),
            0x03
        );
        assert_eq!(u8::from(LoadError::Read(Region::Data).status_code()), 0x03);
        assert_eq!(u8::from(LoadError::Read(Region::Fat).status_code()), 0x04);
        assert_eq!(
            u8::from(LoadError::UnsupportedFilesystem.status_code()),
            0x05
        );
        assert_eq!(u8::from(LoadError::NotFound.status_code()), 0x07);
    }

    #[test]
    fn test_status_code_from_byte() {
        assert_eq!(StatusCode::try_from(0x04).ok(), Some(StatusCode::FatRead));
        assert!(StatusCode::try_from(0x08_u8).is_err());
    }
}
