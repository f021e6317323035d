//! The drive abstraction.
//!
//! A [`TapeDrive`] owns two open handles to one physical transport: the
//! no-rewind tape device file (block I/O and tape-control operations) and
//! the companion generic-SCSI device file (SCSI transactions). All
//! operations are synchronous and blocking; a failed host call or a
//! non-GOOD SCSI status surfaces immediately as [`TapeError`]. Nothing is
//! retried here.

mod compression;
mod operate;
mod scsi_ops;

pub use compression::CompressionStats;

use std::os::fd::RawFd;
use std::path::PathBuf;

use nix::fcntl::OFlag;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TapeError};
use crate::scsi::sense::{check_status, SenseData};
use crate::scsi::sgio::SgIoHdr;
use crate::sys::mtio::MtOp;
use crate::sys::{HostSystem, System};

/// One physical unit as reported by the discovery collaborator. Immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// SCSI peripheral device type code (tape drives report 1).
    pub device_type: u8,
    /// Generic SCSI device file (`/dev/sgN`).
    pub sg_dev: PathBuf,
    /// Rewind tape device file (`/dev/stN`).
    pub st_dev: PathBuf,
    /// No-rewind tape device file (`/dev/nstN`).
    pub nst_dev: PathBuf,
    pub sg_major_minor: (u32, u32),
    pub st_major_minor: (u32, u32),
    pub nst_major_minor: (u32, u32),
}

/// Identity of the drive as read from INQUIRY, plus the unit serial number
/// from its vital product data page. The vendor and model end up in the
/// user tape labels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InquiryInfo {
    pub vendor: String,
    pub product: String,
    pub product_revision_level: String,
    pub serial_number: String,
}

/// Logical drive position: the address of the next object to read or
/// write, plus what still sits uncommitted in the drive buffer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PositionInfo {
    pub current_position: u32,
    /// Oldest object in the buffer that has not reached the medium yet.
    pub oldest_dirty_object: u32,
    pub dirty_objects_count: u32,
    pub dirty_bytes_count: u32,
}

/// Drive families differ only in how their cumulative compression
/// counters are laid out; everything else is shared logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveFamily {
    Generic,
    T10000,
    Lto,
    Ibm3592,
}

impl DriveFamily {
    /// Classify a drive by its INQUIRY product string.
    pub fn from_product(product: &str) -> Self {
        if product.contains("T10000") {
            Self::T10000
        } else if product.contains("ULT") || product.contains("Ultrium") {
            Self::Lto
        } else if product.contains("03592") {
            Self::Ibm3592
        } else {
            Self::Generic
        }
    }
}

/// An open tape transport.
pub struct TapeDrive<S: System = HostSystem> {
    sys: S,
    info: DeviceInfo,
    family: DriveFamily,
    tape_fd: RawFd,
    sg_fd: RawFd,
}

impl TapeDrive<HostSystem> {
    /// Open the transport described by `info` on the real host.
    pub fn open(info: DeviceInfo) -> Result<Self> {
        Self::open_with(HostSystem, info)
    }
}

impl<S: System> TapeDrive<S> {
    /// Open the transport through an explicit host-call implementation.
    ///
    /// The tape device file is opened non-blocking: a blocking open on a
    /// drive with no medium loaded can hang until a long driver timeout
    /// expires. Every subsequent operation blocks normally, bounded by the
    /// per-transaction timeout. An INQUIRY classifies the drive family.
    pub fn open_with(sys: S, info: DeviceInfo) -> Result<Self> {
        let tape_fd = sys
            .open(&info.nst_dev, OFlag::O_RDWR | OFlag::O_NONBLOCK)
            .map_err(|errno| {
                TapeError::os(
                    format!("Could not open device file {}", info.nst_dev.display()),
                    errno,
                )
            })?;
        let sg_fd = match sys.open(&info.sg_dev, OFlag::O_RDWR) {
            Ok(fd) => fd,
            Err(errno) => {
                let _ = sys.close(tape_fd);
                return Err(TapeError::os(
                    format!("Could not open device file {}", info.sg_dev.display()),
                    errno,
                ));
            }
        };
        let mut drive = Self {
            sys,
            info,
            family: DriveFamily::Generic,
            tape_fd,
            sg_fd,
        };
        let identity = drive.device_info()?;
        drive.family = DriveFamily::from_product(&identity.product);
        Ok(drive)
    }

    pub fn family(&self) -> DriveFamily {
        self.family
    }

    /// Path of the generic SCSI device file, for handing to external tools.
    pub fn generic_scsi_path(&self) -> &std::path::Path {
        &self.info.sg_dev
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.info
    }

    /// Submit one SCSI transaction on the generic-SCSI handle and run the
    /// result through the status/sense interpreter.
    pub(crate) fn sg_transaction(
        &self,
        hdr: &mut SgIoHdr,
        sense: &SenseData,
        context: &str,
    ) -> Result<()> {
        self.sys.sg_io(self.sg_fd, hdr).map_err(|errno| {
            TapeError::os(format!("Failed SG_IO ioctl in {context}"), errno)
        })?;
        check_status(hdr, sense, context)
    }

    /// Issue one tape-control operation on the tape handle.
    pub(crate) fn tape_ctl(&self, op: libc::c_short, count: libc::c_int, context: &str) -> Result<()> {
        let mt_op = MtOp::new(op, count);
        self.sys
            .tape_op(self.tape_fd, &mt_op)
            .map_err(|errno| TapeError::os(format!("Failed ST ioctl in {context}"), errno))
    }

    pub(crate) fn sys(&self) -> &S {
        &self.sys
    }

    pub(crate) fn tape_fd(&self) -> RawFd {
        self.tape_fd
    }
}

impl<S: System> Drop for TapeDrive<S> {
    fn drop(&mut self) {
        if let Err(errno) = self.sys.close(self.tape_fd) {
            warn!(?errno, "closing tape device failed");
        }
        if let Err(errno) = self.sys.close(self.sg_fd) {
            warn!(?errno, "closing generic SCSI device failed");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sys::fake::FakeSystem;

    pub(crate) fn fake_device_info() -> DeviceInfo {
        DeviceInfo {
            device_type: 1,
            sg_dev: PathBuf::from("/dev/sg0"),
            st_dev: PathBuf::from("/dev/st0"),
            nst_dev: PathBuf::from("/dev/nst0"),
            sg_major_minor: (21, 0),
            st_major_minor: (9, 0),
            nst_major_minor: (9, 128),
        }
    }

    #[test]
    fn family_detection_by_product_string() {
        assert_eq!(DriveFamily::from_product("T10000B"), DriveFamily::T10000);
        assert_eq!(DriveFamily::from_product("ULT3580-TD5"), DriveFamily::Lto);
        assert_eq!(DriveFamily::from_product("Ultrium 9-SCSI"), DriveFamily::Lto);
        assert_eq!(DriveFamily::from_product("03592E08"), DriveFamily::Ibm3592);
        assert_eq!(DriveFamily::from_product("VXA-320"), DriveFamily::Generic);
    }

    #[test]
    fn open_classifies_family_and_opens_nonblocking() {
        let sys = FakeSystem::with_product("T10000C");
        let drive = TapeDrive::open_with(sys, fake_device_info()).unwrap();
        assert_eq!(drive.family(), DriveFamily::T10000);
        let opens = drive.sys().opens();
        assert_eq!(opens.len(), 2);
        assert!(opens[0].0.ends_with("nst0"));
        assert!(opens[0].1.contains(OFlag::O_NONBLOCK));
        assert!(opens[1].0.ends_with("sg0"));
        assert!(!opens[1].1.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn drop_closes_both_handles() {
        let sys = FakeSystem::with_product("ULT3580-TD6");
        let probe = sys.clone();
        drop(TapeDrive::open_with(sys, fake_device_info()).unwrap());
        assert_eq!(probe.closed().len(), 2);
    }
}
