//! Loading of the next boot stage.
//!
//! Two well-known files are looked up in the root directory of the first
//! partition. The caller chooses which one is preferred; the other one is
//! tried if the preferred file is missing or cannot be loaded.
use crate::{
    BlockDevice, LoadError, LoadResult,
    fs::fat::{self, Geometry, ShortName},
    partition,
};
use log::{debug, error, info, warn};

/// Names of the two kernel files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub primary: ShortName,
    pub alternate: ShortName,
}

impl LoaderConfig {
    pub const DEFAULT_PRIMARY: ShortName = ShortName::new(b"KERNEL  BIN");
    pub const DEFAULT_ALTERNATE: ShortName = ShortName::new(b"ALTKERN BIN");

    #[must_use]
    #[inline]
    pub const fn new(primary: ShortName, alternate: ShortName) -> Self {
        Self { primary, alternate }
    }

    #[must_use]
    #[inline]
    pub const fn name(&self, variant: KernelVariant) -> &ShortName {
        match variant {
            KernelVariant::Primary => &self.primary,
            KernelVariant::Alternate => &self.alternate,
        }
    }

    #[must_use]
    #[inline]
    /// Returns the variants in the order they are tried.
    pub const fn priority(use_alternate: bool) -> [KernelVariant; 2] {
        if use_alternate {
            [KernelVariant::Alternate, KernelVariant::Primary]
        } else {
            [KernelVariant::Primary, KernelVariant::Alternate]
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PRIMARY, Self::DEFAULT_ALTERNATE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which of the two kernel files was loaded.
pub enum KernelVariant {
    Primary,
    Alternate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A kernel image copied to the start of the destination buffer.
pub struct LoadedKernel {
    variant: KernelVariant,
    name: ShortName,
    len: usize,
    file_size: u32,
}

impl LoadedKernel {
    #[must_use]
    #[inline]
    pub const fn variant(&self) -> KernelVariant {
        self.variant
    }

    #[must_use]
    #[inline]
    pub const fn name(&self) -> &ShortName {
        &self.name
    }

    #[must_use]
    #[inline]
    /// Number of bytes written to the destination.
    ///
    /// This is a whole number of clusters, so it is usually larger than the file.
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    #[inline]
    /// Size of the file as recorded in its directory entry.
    pub const fn file_size(&self) -> u32 {
        self.file_size
    }
}

/// Result of looking for one candidate.
enum Attempt {
    Loaded(LoadedKernel),
    Missing,
    Failed(LoadError),
}

enum State {
    /// Looking for the preferred file.
    SearchingPreferred,
    /// Looking for the other file.
    SearchingFallback { last_error: Option<LoadError> },
    DoneSuccess(LoadedKernel),
    DoneFailure(LoadError),
}

/// Loader state for one call of [`load_kernel`].
struct KernelLoader<'a, D: BlockDevice> {
    device: &'a mut D,
    dest: &'a mut [u8],
    geometry: Geometry,
    /// Length of the root directory at the start of `dest`.
    ///
    /// `None` once a kernel load has overwritten it.
    directory: Option<usize>,
}

impl<D: BlockDevice> KernelLoader<'_, D> {
    fn load_root_directory(&mut self) -> LoadResult<usize> {
        let len = fat::load_chain(
            self.device,
            &self.geometry,
            self.geometry.root_cluster(),
            self.dest,
        )?;
        debug!("Root directory loaded ({len} bytes)");
        self.directory = Some(len);
        Ok(len)
    }

    /// Looks for `name` in the root directory and loads it over the directory.
    ///
    /// Errors returned directly are fatal, `Attempt::Failed` leaves room for another candidate.
    fn attempt(&mut self, variant: KernelVariant, name: &ShortName) -> LoadResult<Attempt> {
        let dir_len = match self.directory {
            Some(len) => len,
            None => self.load_root_directory()?,
        };

        // The entry is copied out, the directory is about to be overwritten.
        let Some(entry) = fat::find_entry(&self.dest[..dir_len], name) else {
            debug!("{name} not found");
            return Ok(Attempt::Missing);
        };

        info!("Loading kernel file {name}...");
        self.directory = None;
        match fat::load_chain(self.device, &self.geometry, entry.first_cluster(), self.dest) {
            Ok(len) => Ok(Attempt::Loaded(LoadedKernel {
                variant,
                name: *name,
                len,
                file_size: entry.file_size(),
            })),
            Err(err) => {
                warn!("Unable to load {name}: {err}");
                Ok(Attempt::Failed(err))
            }
        }
    }
}

/// Loads the kernel from the first partition of `device` into `dest`.
///
/// `dest` is also used as scratch space for the root directory, so it must be
/// able to hold the root directory as well as the kernel.
/// With `use_alternate`, the alternate file is tried first.
pub fn load_kernel<D: BlockDevice>(
    device: &mut D,
    dest: &mut [u8],
    config: &LoaderConfig,
    use_alternate: bool,
) -> LoadResult<LoadedKernel> {
    let partition_start = partition::locate_first_partition(device)?;
    debug!("First partition at sector {partition_start}");

    let geometry = fat::parse_boot_sector(device, partition_start)?;

    let mut loader = KernelLoader {
        device,
        dest,
        geometry,
        directory: None,
    };
    loader.load_root_directory()?;

    let [preferred, fallback] = LoaderConfig::priority(use_alternate);
    let mut state = State::SearchingPreferred;

    loop {
        state = match state {
            State::SearchingPreferred => {
                match loader.attempt(preferred, config.name(preferred))? {
                    Attempt::Loaded(kernel) => State::DoneSuccess(kernel),
                    Attempt::Missing => State::SearchingFallback { last_error: None },
                    Attempt::Failed(err) => State::SearchingFallback {
                        last_error: Some(err),
                    },
                }
            }
            State::SearchingFallback { last_error } => {
                match loader.attempt(fallback, config.name(fallback))? {
                    Attempt::Loaded(kernel) => State::DoneSuccess(kernel),
                    Attempt::Missing => {
                        State::DoneFailure(last_error.unwrap_or(LoadError::NotFound))
                    }
                    Attempt::Failed(err) => State::DoneFailure(err),
                }
            }
            State::DoneSuccess(kernel) => {
                debug!("{} loaded ({} bytes)", kernel.name(), kernel.len());
                return Ok(kernel);
            }
            State::DoneFailure(err) => {
                error!("{err} (status {:#04x})", u8::from(err.status_code()));
                return Err(err);
            }
        };
    }
}
