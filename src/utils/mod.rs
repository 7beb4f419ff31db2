//! This module contains various utility modules and helper functions.

pub mod log;
