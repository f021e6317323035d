//! Tape-control operations and raw block I/O on the tape device handle.
//!
//! These go through the st driver (MTIOCTOP) and plain read/write rather
//! than SCSI pass-through. The st driver takes a signed 24-bit count, so
//! long moves are issued in chunks.

use nix::errno::Errno;
use tracing::debug;

use crate::error::{Result, TapeError};
use crate::sys::mtio::{
    MT_BSF, MT_BSR, MT_EOM, MT_FSF, MT_FSR, MT_MAX_COUNT, MT_REW, MT_SETDRVBUFFER, MT_UNLOAD,
    MT_WEOF, MT_WEOFI, MT_ST_BUFFER_WRITES, MT_ST_CLEARBOOLEANS, MT_ST_FAST_MTEOM,
    MT_ST_SETBOOLEANS,
};
use crate::sys::System;

use super::TapeDrive;

impl<S: System> TapeDrive<S> {
    fn space(&self, op: libc::c_short, count: usize, context: &str) -> Result<()> {
        let mut to_skip = count;
        while to_skip > 0 {
            let chunk = to_skip.min(MT_MAX_COUNT);
            self.tape_ctl(op, chunk as libc::c_int, context)?;
            to_skip -= chunk;
        }
        Ok(())
    }

    /// Rewind to beginning of tape.
    pub fn rewind(&self) -> Result<()> {
        debug!("rewind");
        self.tape_ctl(MT_REW, 1, "rewind (MTREW)")
    }

    pub fn space_file_marks_forward(&self, count: usize) -> Result<()> {
        debug!(count, "space file marks forward");
        self.space(MT_FSF, count, "space file marks forward (MTFSF)")
    }

    pub fn space_file_marks_backwards(&self, count: usize) -> Result<()> {
        debug!(count, "space file marks backwards");
        self.space(MT_BSF, count, "space file marks backwards (MTBSF)")
    }

    pub fn space_blocks_forward(&self, count: usize) -> Result<()> {
        self.space(MT_FSR, count, "space blocks forward (MTFSR)")
    }

    pub fn space_blocks_backwards(&self, count: usize) -> Result<()> {
        self.space(MT_BSR, count, "space blocks backwards (MTBSR)")
    }

    /// Unload the tape from the drive.
    pub fn unload_tape(&self) -> Result<()> {
        debug!("unload");
        self.tape_ctl(MT_UNLOAD, 1, "unload (MTUNLOAD)")
    }

    /// Flush the drive write buffer to medium. Does not return before the
    /// data is committed: a zero-count synchronous filemark write is the
    /// documented synchronize operation (SSC-3, note on WRITE FILEMARKS
    /// with count 0).
    pub fn sync(&self) -> Result<()> {
        self.tape_ctl(MT_WEOF, 0, "flush (MTWEOF 0)")
    }

    /// Write `count` filemarks; blocks until they are on the medium.
    pub fn write_sync_file_marks(&self, count: usize) -> Result<()> {
        self.tape_ctl(MT_WEOF, count as libc::c_int, "write file marks (MTWEOF)")
    }

    /// Write `count` filemarks buffered; returns as soon as they are in the
    /// drive buffer.
    pub fn write_immediate_file_marks(&self, count: usize) -> Result<()> {
        self.tape_ctl(MT_WEOFI, count as libc::c_int, "write immediate file marks (MTWEOFI)")
    }

    /// Toggle buffered writes in the st driver.
    pub fn set_st_buffer_write(&self, buffer_write: bool) -> Result<()> {
        let count = if buffer_write {
            MT_ST_SETBOOLEANS | MT_ST_BUFFER_WRITES
        } else {
            MT_ST_CLEARBOOLEANS | MT_ST_BUFFER_WRITES
        };
        self.tape_ctl(MT_SETDRVBUFFER, count, "set buffer write (MTSETDRVBUFFER)")
    }

    /// Toggle the st driver's fast end-of-media optimisation.
    pub fn set_st_fast_mteom(&self, fast: bool) -> Result<()> {
        let count = if fast {
            MT_ST_SETBOOLEANS | MT_ST_FAST_MTEOM
        } else {
            MT_ST_CLEARBOOLEANS | MT_ST_FAST_MTEOM
        };
        self.tape_ctl(MT_SETDRVBUFFER, count, "set fast MTEOM (MTSETDRVBUFFER)")
    }

    /// Space to end of recorded media with the fast optimisation disabled,
    /// forcing a full tape directory (MIR) rebuild on the way.
    pub fn space_to_eom(&self) -> Result<()> {
        debug!("space to EOM, slow path");
        self.set_st_fast_mteom(false)?;
        self.tape_ctl(MT_EOM, 1, "space to EOM (MTEOM)")
    }

    /// Space to end of recorded media using the drive's directory.
    pub fn fast_space_to_eom(&self) -> Result<()> {
        debug!("space to EOM, fast path");
        self.set_st_fast_mteom(true)?;
        self.tape_ctl(MT_EOM, 1, "fast space to EOM (MTEOM)")
    }

    /// Write one data block through the tape handle.
    pub fn write_block(&self, data: &[u8]) -> Result<usize> {
        self.sys()
            .write(self.tape_fd(), data)
            .map_err(|errno| TapeError::os("Failed ST write in write_block", errno))
    }

    /// Read one data block through the tape handle. A zero return means a
    /// filemark was crossed.
    pub fn read_block(&self, data: &mut [u8]) -> Result<usize> {
        self.sys()
            .read(self.tape_fd(), data)
            .map_err(|errno| TapeError::os("Failed ST read in read_block", errno))
    }

    /// Read a block that must be exactly `data.len()` bytes long; label
    /// processing depends on this strictness.
    pub fn read_exact_block(&self, data: &mut [u8], context: &str) -> Result<()> {
        match self.sys().read(self.tape_fd(), data) {
            // ENOSPC: the tape block was larger than the buffer.
            Err(Errno::ENOSPC) => Err(TapeError::decode(format!(
                "{context}: block larger than expected {} bytes",
                data.len()
            ))),
            Err(errno) => Err(TapeError::os(
                format!("{context}: Failed ST read in read_exact_block"),
                errno,
            )),
            Ok(n) if n != data.len() => Err(TapeError::decode(format!(
                "{context}: expected a {} byte block, read {n}",
                data.len()
            ))),
            Ok(_) => Ok(()),
        }
    }

    /// Read over a filemark; anything else at the current position is an
    /// error.
    pub fn read_file_mark(&self, context: &str) -> Result<()> {
        // Some virtual drives misbehave on zero-length reads, so ask for a
        // few bytes.
        let mut buf = [0u8; 4];
        match self.sys().read(self.tape_fd(), &mut buf) {
            Err(Errno::ENOSPC) => Err(TapeError::decode(format!(
                "{context}: expected a file mark, found a large block"
            ))),
            Err(errno) => Err(TapeError::os(
                format!("{context}: Failed ST read in read_file_mark"),
                errno,
            )),
            Ok(0) => Ok(()),
            Ok(n) => Err(TapeError::decode(format!(
                "{context}: expected a file mark, read a {n} byte block"
            ))),
        }
    }
}
