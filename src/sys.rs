//! The host-call boundary.
//!
//! Every interaction with the operating system goes through the [`System`]
//! trait: file open/close, raw block read/write, the SG_IO SCSI pass-through
//! ioctl and the MTIOCTOP tape-control ioctl. Production code uses
//! [`HostSystem`]; tests substitute a scripted fake so the drive logic can
//! be exercised without hardware.

pub mod mtio;

#[cfg(test)]
pub(crate) mod fake;

use std::os::fd::RawFd;
use std::path::Path;

use nix::fcntl::OFlag;
use nix::sys::stat::Mode;

use crate::scsi::sgio::{SgIoHdr, SG_IO};
use mtio::MtOp;

/// Host primitives the drive consumes. All calls are synchronous and report
/// failure at errno level; the drive layer attaches context and converts to
/// [`crate::TapeError`].
pub trait System {
    fn open(&self, path: &Path, oflag: OFlag) -> nix::Result<RawFd>;
    fn close(&self, fd: RawFd) -> nix::Result<()>;
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> nix::Result<usize>;
    fn write(&self, fd: RawFd, buf: &[u8]) -> nix::Result<usize>;
    /// One blocking SCSI transaction. On success the kernel has filled the
    /// envelope's status byte, sense length and resid.
    fn sg_io(&self, fd: RawFd, hdr: &mut SgIoHdr) -> nix::Result<()>;
    /// One tape-control operation (MTIOCTOP).
    fn tape_op(&self, fd: RawFd, op: &MtOp) -> nix::Result<()>;
}

mod ioctl_func {
    use super::{MtOp, SgIoHdr, SG_IO};

    nix::ioctl_write_ptr!(mtioctop, b'm', 1u8, MtOp);
    nix::ioctl_readwrite_bad!(sg_io, SG_IO, SgIoHdr);
}

/// The real thing: thin wrappers over nix.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSystem;

impl System for HostSystem {
    fn open(&self, path: &Path, oflag: OFlag) -> nix::Result<RawFd> {
        nix::fcntl::open(path, oflag, Mode::empty())
    }

    fn close(&self, fd: RawFd) -> nix::Result<()> {
        nix::unistd::close(fd)
    }

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> nix::Result<usize> {
        nix::unistd::read(fd, buf)
    }

    fn write(&self, fd: RawFd, buf: &[u8]) -> nix::Result<usize> {
        nix::unistd::write(fd, buf)
    }

    fn sg_io(&self, fd: RawFd, hdr: &mut SgIoHdr) -> nix::Result<()> {
        unsafe { ioctl_func::sg_io(fd, hdr as *mut SgIoHdr) }.map(|_| ())
    }

    fn tape_op(&self, fd: RawFd, op: &MtOp) -> nix::Result<()> {
        unsafe { ioctl_func::mtioctop(fd, op as *const MtOp) }.map(|_| ())
    }
}
