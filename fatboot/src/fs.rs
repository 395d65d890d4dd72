//! File systems the loader can read from.

pub mod fat;
