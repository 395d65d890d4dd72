//! Backend for the `log` crate during the boot stage.
//!
//! Records are formatted and handed to a sink provided by the platform,
//! usually a serial port. The logger itself holds no state, so it can live
//! in a `static` and does not need any lock.
//!
//! ## Examples
//!
//! ```rust
//! # use fatboot::logging::BootLogger;
//! fn uart_write(args: core::fmt::Arguments) {
//!     // Write `args` to the UART.
//! #   let _ = args;
//! }
//!
//! static LOGGER: BootLogger = BootLogger::new(uart_write);
//!
//! fatboot::logging::init(&LOGGER).unwrap();
//! log::info!("Hello from the boot stage");
//! ```
use core::fmt::Arguments;
use log::{LevelFilter, Metadata, Record, SetLoggerError};

/// Function receiving every formatted record, newline included.
pub type Sink = fn(Arguments);

/// Logger forwarding records to a [`Sink`].
pub struct BootLogger {
    sink: Sink,
}

impl BootLogger {
    #[must_use]
    #[inline]
    pub const fn new(sink: Sink) -> Self {
        Self { sink }
    }
}

/// Maximum level that is emitted.
///
/// Debug builds emit everything, release builds stop at `Info`.
#[must_use]
#[inline]
pub const fn max_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    }
}

/// Installs `logger` as the global logger.
///
/// ## Errors
///
/// Fails if a logger was already installed.
pub fn init(logger: &'static BootLogger) -> Result<(), SetLoggerError> {
    log::set_logger(logger)?;
    log::set_max_level(max_level());
    Ok(())
}

impl log::Log for BootLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if cfg!(debug_assertions) {
            (self.sink)(format_args!(
                "[{:5}] {}:{}: {}\n",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            ));
        } else {
            (self.sink)(format_args!("[{:5}] {}\n", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};
    use std::sync::Mutex;

    static OUTPUT: Mutex<String> = Mutex::new(String::new());

    fn capture(args: Arguments) {
        OUTPUT.lock().unwrap().push_str(&args.to_string());
    }

    static LOGGER: BootLogger = BootLogger::new(capture);

    #[test]
    fn test_record_format() {
        LOGGER.log(
            &Record::builder()
                .args(format_args!("FAT32 filesystem detected"))
                .level(Level::Info)
                .file(Some("bs.rs"))
                .line(Some(42))
                .build(),
        );

        let output = OUTPUT.lock().unwrap();
        if cfg!(debug_assertions) {
            assert!(output.contains("[INFO ] bs.rs:42: FAT32 filesystem detected\n"));
        } else {
            assert!(output.contains("[INFO ] FAT32 filesystem detected\n"));
        }
    }

    #[test]
    fn test_levels() {
        let error = Metadata::builder().level(Level::Error).build();
        let trace = Metadata::builder().level(Level::Trace).build();

        assert!(LOGGER.enabled(&error));
        assert_eq!(LOGGER.enabled(&trace), cfg!(debug_assertions));
    }

    #[test]
    fn test_init_once() {
        assert!(init(&LOGGER).is_ok());
        assert!(init(&LOGGER).is_err());
        assert_eq!(log::max_level(), max_level());
    }
}
