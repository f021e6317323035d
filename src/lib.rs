//! Hardware-facing core of a tape-storage server.
//!
//! Drives physical tape transports over the SCSI command protocol (SG_IO
//! pass-through plus the st tape driver) and encodes/decodes the AUL
//! 80-byte label records that mark volumes and files on the medium.
//!
//! Device discovery is someone else's job: a [`DeviceInfo`] arrives from
//! the outside and [`TapeDrive::open`] takes it from there. Everything is
//! synchronous and blocking, one transaction at a time.

pub mod codec;
pub mod device;
pub mod error;
pub mod label;
pub mod scsi;
pub mod sys;

pub use device::{
    CompressionStats, DeviceInfo, DriveFamily, InquiryInfo, PositionInfo, TapeDrive,
};
pub use error::{Result, TapeError};
