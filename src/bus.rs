//! Access interface and error taxonomy for the memory-mapped register file.
//!
//! The CLIC is a slave on the system bus. The bus routes a physical address to
//! one of the controller's privilege-scoped windows and hands over the offset
//! within that window together with a byte buffer; values are serialized in
//! little-endian byte order, matching the rest of the system.
//!
//! A failed access ([`AccessError`]) is expected to be surfaced by the bus as
//! a load/store access fault to the execution core. Note that not every access
//! without architectural effect is an error: a store filtered away by the
//! privilege rules of an S- or U-mode window completes successfully and is
//! simply discarded.

use thiserror::Error;

pub type AccessResult = Result<(), AccessError>;

/// Errors that can occur when accessing the memory-mapped register file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The access is wider than the widest supported (doubleword) access.
    #[error("access of {0} bytes exceeds the supported maximum of 8")]
    TooWide(usize),
    /// The address does not fall in any region of the accessed window, or the
    /// accessed window is not present in this configuration.
    #[error("address {0:#06x} is not mapped")]
    Unmapped(u32),
    /// Store to a region that only supports loads (the config placeholder,
    /// reserved ranges, and the custom range).
    #[error("store to read-only region at {0:#06x}")]
    ReadOnly(u32),
}
