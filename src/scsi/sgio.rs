//! The SG_IO request envelope.
//!
//! One `SgIoHdr` describes one blocking SCSI transaction: a CDB, an optional
//! data buffer, a sense buffer, a transfer direction and a timeout. It is
//! Linux's `sg_io_hdr` laid out byte for byte; construction zeroes it and
//! fills in the mandatory interface id and the default timeout, the caller
//! binds the buffers and submits it through [`crate::sys::System::sg_io`].
//!
//! Envelopes are transaction-scoped: build one on the stack, submit it, drop
//! it. The bound buffers must outlive the submission, which the drive layer
//! guarantees by keeping everything in one function scope.

use crate::scsi::sense::SENSE_BUFF_LEN;

/// Default command timeout: 30 s.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;
/// Positioning is one long, non-interruptible transaction; LOCATE gets 180 s.
pub const LOCATE_TIMEOUT_MS: u32 = 180_000;

/// Transfer direction of the data phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDirection {
    /// No data phase.
    None,
    /// Host to device (e.g. MODE SELECT parameter list).
    ToDevice,
    /// Device to host (e.g. INQUIRY reply).
    FromDevice,
}

impl DataDirection {
    fn dxfer_direction(self) -> libc::c_int {
        match self {
            DataDirection::None => SG_DXFER_NONE,
            DataDirection::ToDevice => SG_DXFER_TO_DEV,
            DataDirection::FromDevice => SG_DXFER_FROM_DEV,
        }
    }
}

pub const SG_DXFER_NONE: libc::c_int = -1;
pub const SG_DXFER_TO_DEV: libc::c_int = -2;
pub const SG_DXFER_FROM_DEV: libc::c_int = -3;

/// The SG_IO ioctl request number.
pub const SG_IO: libc::c_ulong = 0x2285;

/// Linux `sg_io_hdr`, interface id 'S'.
#[repr(C)]
#[derive(Debug)]
pub struct SgIoHdr {
    pub interface_id: libc::c_int,
    pub dxfer_direction: libc::c_int,
    pub cmd_len: libc::c_uchar,
    pub mx_sb_len: libc::c_uchar,
    pub iovec_count: libc::c_ushort,
    pub dxfer_len: libc::c_uint,
    pub dxferp: *mut libc::c_void,
    pub cmdp: *mut libc::c_uchar,
    pub sbp: *mut libc::c_uchar,
    pub timeout: libc::c_uint,
    pub flags: libc::c_uint,
    pub pack_id: libc::c_int,
    pub usr_ptr: *mut libc::c_void,
    pub status: libc::c_uchar,
    pub masked_status: libc::c_uchar,
    pub msg_status: libc::c_uchar,
    pub sb_len_wr: libc::c_uchar,
    pub host_status: libc::c_ushort,
    pub driver_status: libc::c_ushort,
    pub resid: libc::c_int,
    pub duration: libc::c_uint,
    pub info: libc::c_uint,
}

impl SgIoHdr {
    pub fn new() -> Self {
        let mut hdr: SgIoHdr = unsafe { std::mem::zeroed() };
        hdr.interface_id = 'S' as libc::c_int;
        hdr.dxfer_direction = SG_DXFER_NONE;
        hdr.timeout = DEFAULT_TIMEOUT_MS;
        hdr
    }

    /// Bind the command descriptor block.
    pub fn set_cdb(&mut self, cdb: &mut [u8]) {
        self.cmdp = cdb.as_mut_ptr();
        self.cmd_len = cdb.len() as libc::c_uchar;
    }

    /// Bind the data buffer and set the transfer direction.
    pub fn set_data(&mut self, data: &mut [u8], direction: DataDirection) {
        self.dxferp = data.as_mut_ptr() as *mut libc::c_void;
        self.dxfer_len = data.len() as libc::c_uint;
        self.dxfer_direction = direction.dxfer_direction();
    }

    /// Bind the sense buffer the device fills on CHECK CONDITION.
    pub fn set_sense(&mut self, sense: &mut [u8; SENSE_BUFF_LEN]) {
        self.sbp = sense.as_mut_ptr();
        self.mx_sb_len = SENSE_BUFF_LEN as libc::c_uchar;
    }

    pub fn set_timeout(&mut self, millis: u32) {
        self.timeout = millis;
    }
}

impl Default for SgIoHdr {
    fn default() -> Self {
        Self::new()
    }
}

/// View a `#[repr(C)]` wire record, built exclusively from `u8` fields and
/// arrays, as raw bytes.
///
/// Safety: callers only instantiate this for the padding-free byte records
/// in `scsi::cdb` and `label`.
pub(crate) fn record_bytes<T>(record: &T) -> &[u8] {
    unsafe { std::slice::from_raw_parts(record as *const T as *const u8, std::mem::size_of::<T>()) }
}

pub(crate) fn record_bytes_mut<T>(record: &mut T) -> &mut [u8] {
    unsafe {
        std::slice::from_raw_parts_mut(record as *mut T as *mut u8, std::mem::size_of::<T>())
    }
}
