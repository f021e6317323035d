//! Status byte and sense data interpretation.
//!
//! A transaction that completes at the host level still carries a SCSI
//! status byte. Anything other than GOOD is an error; CHECK CONDITION
//! additionally fills the sense buffer, which comes in two mutually
//! exclusive layouts selected by its response code. This module turns all
//! of that into diagnostics and into [`TapeError::Scsi`] values.

use strum::{Display, FromRepr};

use crate::error::{Result, TapeError};
use crate::scsi::sgio::SgIoHdr;

/// Size of the sense buffer bound to every transaction. Large enough for
/// the fixed and descriptor forms all three drive families emit.
pub const SENSE_BUFF_LEN: usize = 64;

/// The status codes defined by SAM-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u8)]
pub enum ScsiStatus {
    #[strum(serialize = "GOOD")]
    Good = 0x00,
    #[strum(serialize = "CHECK CONDITION")]
    CheckCondition = 0x02,
    #[strum(serialize = "CONDITION MET")]
    ConditionMet = 0x04,
    #[strum(serialize = "BUSY")]
    Busy = 0x08,
    #[strum(serialize = "RESERVATION CONFLICT")]
    ReservationConflict = 0x18,
    #[strum(serialize = "TASK SET FULL")]
    TaskSetFull = 0x28,
    #[strum(serialize = "ACA ACTIVE")]
    AcaActive = 0x30,
    #[strum(serialize = "TASK ABORTED")]
    TaskAborted = 0x40,
}

pub fn status_to_string(status: u8) -> String {
    match ScsiStatus::from_repr(status) {
        Some(s) => s.to_string(),
        None => format!("Reserved or obsolete code {status:#04x}"),
    }
}

/// Sense key names, SPC-4 table 54.
const SENSE_KEY_TEXT: [&str; 16] = [
    "No Sense",
    "Recovered Error",
    "Not Ready",
    "Medium Error",
    "Hardware Error",
    "Illegal Request",
    "Unit Attention",
    "Data Protect",
    "Blank Check",
    "Vendor Specific",
    "Copy Aborted",
    "Aborted Command",
    "Equal",
    "Volume Overflow",
    "Miscompare",
    "Completed",
];

pub mod sense_keys {
    pub const NOT_READY: u8 = 0x2;
    pub const UNIT_ATTENTION: u8 = 0x6;
}

/// Sense buffer, interpreted as SPC-4 fixed format (response code
/// 0x70/0x71) or descriptor format (0x72/0x73). Any other response code is
/// a hard decoding error surfaced by the field accessors.
#[derive(Debug, Clone, Copy)]
pub struct SenseData {
    pub buf: [u8; SENSE_BUFF_LEN],
}

impl Default for SenseData {
    fn default() -> Self {
        Self { buf: [0; SENSE_BUFF_LEN] }
    }
}

impl SenseData {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut sense = Self::default();
        let n = bytes.len().min(SENSE_BUFF_LEN);
        sense.buf[..n].copy_from_slice(&bytes[..n]);
        sense
    }

    pub fn response_code(&self) -> u8 {
        self.buf[0] & 0x7F
    }

    pub fn is_fixed_format(&self) -> bool {
        matches!(self.response_code(), 0x70 | 0x71)
    }

    pub fn is_descriptor_format(&self) -> bool {
        matches!(self.response_code(), 0x72 | 0x73)
    }

    pub fn is_current(&self) -> bool {
        matches!(self.response_code(), 0x70 | 0x72)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.response_code(), 0x71 | 0x73)
    }

    fn unsupported(&self, what: &str) -> TapeError {
        TapeError::decode(format!(
            "no {what} for sense response code {:#04x}",
            self.response_code()
        ))
    }

    pub fn sense_key(&self) -> Result<u8> {
        if self.is_fixed_format() {
            Ok(self.buf[2] & 0x0F)
        } else if self.is_descriptor_format() {
            Ok(self.buf[1] & 0x0F)
        } else {
            Err(self.unsupported("sense key"))
        }
    }

    pub fn asc(&self) -> Result<u8> {
        if self.is_fixed_format() {
            Ok(self.buf[12])
        } else if self.is_descriptor_format() {
            Ok(self.buf[2])
        } else {
            Err(self.unsupported("ASC"))
        }
    }

    pub fn ascq(&self) -> Result<u8> {
        if self.is_fixed_format() {
            Ok(self.buf[13])
        } else if self.is_descriptor_format() {
            Ok(self.buf[3])
        } else {
            Err(self.unsupported("ASCQ"))
        }
    }

    pub fn sense_key_string(&self) -> Result<&'static str> {
        Ok(SENSE_KEY_TEXT[self.sense_key()? as usize])
    }

    /// The human diagnostic for the additional sense code pair.
    pub fn acs_string(&self) -> Result<String> {
        Ok(asc_to_string(self.asc()?, self.ascq()?))
    }
}

/// ASC/ASCQ to text, following the T10 additional sense code assignments.
/// Pairs outside the table fall back to the numeric form.
pub fn asc_to_string(asc: u8, ascq: u8) -> String {
    let code = ((asc as u16) << 8) | ascq as u16;
    if let Some(&(_, text)) = ASC_STRINGS.iter().find(|&&(c, _)| c == code) {
        return text.to_string();
    }
    match (asc, ascq) {
        (0x40, 0x80..=0xFF) => format!("Diagnostic failure on component ({ascq:02x})"),
        (0x4D, _) => format!("Tagged overlapped commands (task tag {ascq:02x})"),
        (0x70, _) => format!("Decompression exception short algorithm id of {ascq:02x}"),
        _ => format!("Unknown ASC/ASCQ:{asc:02x}/{ascq:02x}"),
    }
}

/// Subset of the T10 assignments covering the codes stream devices raise.
const ASC_STRINGS: &[(u16, &str)] = &[
    (0x0000, "No additional sense information"),
    (0x0001, "Filemark detected"),
    (0x0002, "End-of-partition/medium detected"),
    (0x0003, "Setmark detected"),
    (0x0004, "Beginning-of-partition/medium detected"),
    (0x0005, "End-of-data detected"),
    (0x0006, "I/O process terminated"),
    (0x0007, "Programmable early warning detected"),
    (0x0016, "Operation in progress"),
    (0x0017, "Cleaning requested"),
    (0x0400, "Logical unit not ready, cause not reportable"),
    (0x0401, "Logical unit is in process of becoming ready"),
    (0x0402, "Logical unit not ready, initializing command required"),
    (0x0403, "Logical unit not ready, manual intervention required"),
    (0x0404, "Logical unit not ready, format in progress"),
    (0x0407, "Logical unit not ready, operation in progress"),
    (0x0409, "Logical unit not ready, self-test in progress"),
    (0x040C, "Logical unit not accessible, target port in unavailable state"),
    (0x0500, "Logical unit does not respond to selection"),
    (0x0600, "No reference position found"),
    (0x0800, "Logical unit communication failure"),
    (0x0801, "Logical unit communication time-out"),
    (0x0802, "Logical unit communication parity error"),
    (0x0900, "Track following error"),
    (0x0A00, "Error log overflow"),
    (0x0B00, "Warning"),
    (0x0B01, "Warning - specified temperature exceeded"),
    (0x0B02, "Warning - enclosure degraded"),
    (0x0B03, "Warning - background self-test failed"),
    (0x0B08, "Warning - power loss expected"),
    (0x0C00, "Write error"),
    (0x0C04, "Compression check miscompare error"),
    (0x0C05, "Data expansion occurred during compression"),
    (0x0C06, "Block not compressible"),
    (0x1001, "Logical block guard check failed"),
    (0x1100, "Unrecovered read error"),
    (0x1101, "Read retries exhausted"),
    (0x1102, "Error too long to correct"),
    (0x1108, "Incomplete block read"),
    (0x1109, "No gap found"),
    (0x110A, "Miscorrected error"),
    (0x1400, "Recorded entity not found"),
    (0x1401, "Record not found"),
    (0x1402, "Filemark or setmark not found"),
    (0x1403, "End-of-data not found"),
    (0x1404, "Block sequence error"),
    (0x1500, "Random positioning error"),
    (0x1501, "Mechanical positioning error"),
    (0x1502, "Positioning error detected by read of medium"),
    (0x1700, "Recovered data with no error correction applied"),
    (0x1800, "Recovered data with error correction applied"),
    (0x1A00, "Parameter list length error"),
    (0x1B00, "Synchronous data transfer error"),
    (0x2000, "Invalid command operation code"),
    (0x2100, "Logical block address out of range"),
    (0x2400, "Invalid field in cdb"),
    (0x2500, "Logical unit not supported"),
    (0x2600, "Invalid field in parameter list"),
    (0x2601, "Parameter not supported"),
    (0x2602, "Parameter value invalid"),
    (0x2603, "Threshold parameters not supported"),
    (0x2700, "Write protected"),
    (0x2701, "Hardware write protected"),
    (0x2702, "Logical unit software write protected"),
    (0x2703, "Associated write protect"),
    (0x2704, "Persistent write protect"),
    (0x2705, "Permanent write protect"),
    (0x2800, "Not ready to ready change, medium may have changed"),
    (0x2801, "Import or export element accessed"),
    (0x2900, "Power on, reset, or bus device reset occurred"),
    (0x2901, "Power on occurred"),
    (0x2902, "Scsi bus reset occurred"),
    (0x2903, "Bus device reset function occurred"),
    (0x2A01, "Mode parameters changed"),
    (0x2A02, "Log parameters changed"),
    (0x3000, "Incompatible medium installed"),
    (0x3001, "Cannot read medium - unknown format"),
    (0x3002, "Cannot read medium - incompatible format"),
    (0x3003, "Cleaning cartridge installed"),
    (0x3004, "Cannot write medium - unknown format"),
    (0x3005, "Cannot write medium - incompatible format"),
    (0x3007, "Cleaning failure"),
    (0x3100, "Medium format corrupted"),
    (0x3300, "Tape length error"),
    (0x3700, "Rounded parameter"),
    (0x3A00, "Medium not present"),
    (0x3A01, "Medium not present - tray closed"),
    (0x3A04, "Medium not present - medium auxiliary memory accessible"),
    (0x3B00, "Sequential positioning error"),
    (0x3B01, "Tape position error at beginning-of-medium"),
    (0x3B02, "Tape position error at end-of-medium"),
    (0x3B08, "Reposition error"),
    (0x3B0C, "Position past beginning of medium"),
    (0x3D00, "Invalid bits in identify message"),
    (0x3E00, "Logical unit has not self-configured yet"),
    (0x3E01, "Logical unit failure"),
    (0x3E02, "Timeout on logical unit"),
    (0x4000, "Ram failure (should use 40 nn)"),
    (0x4300, "Message error"),
    (0x4400, "Internal target failure"),
    (0x4500, "Select or reselect failure"),
    (0x4700, "Scsi parity error"),
    (0x4800, "Initiator detected error message received"),
    (0x4900, "Invalid message error"),
    (0x4A00, "Command phase error"),
    (0x4B00, "Data phase error"),
    (0x4E00, "Overlapped commands attempted"),
    (0x5000, "Write append error"),
    (0x5001, "Write append position error"),
    (0x5002, "Position error related to timing"),
    (0x5100, "Erase failure"),
    (0x5200, "Cartridge fault"),
    (0x5300, "Media load or eject failed"),
    (0x5301, "Unload tape failure"),
    (0x5302, "Medium removal prevented"),
    (0x5A00, "Operator request or state change input"),
    (0x5A01, "Operator medium removal request"),
    (0x5B00, "Log exception"),
    (0x5B01, "Threshold condition met"),
    (0x5B02, "Log counter at maximum"),
    (0x5B03, "Log list codes exhausted"),
    (0x5D00, "Failure prediction threshold exceeded"),
    (0x5DFF, "Failure prediction threshold exceeded (false)"),
    (0x5E00, "Low power condition on"),
    (0x6500, "Voltage fault"),
];

/// TapeAlert parameter code to text, SSC-3/SSC-4 section on the TapeAlert
/// application client interface.
pub fn tape_alert_to_string(parameter_code: u16) -> String {
    if !(1..=64).contains(&parameter_code) {
        return format!("Unexpected tapeAlert code: {parameter_code:#x}");
    }
    if (0x28..=0x2E).contains(&parameter_code) {
        return format!("Obsolete tapeAlert code: {parameter_code:#x}");
    }
    let text = match parameter_code {
        0x01 => "Read warning",
        0x02 => "Write warning",
        0x03 => "Hard error",
        0x04 => "Medium",
        0x05 => "Read failure",
        0x06 => "Write failure",
        0x07 => "Medium life",
        0x08 => "Not data grade",
        0x09 => "Write protect",
        0x0A => "Volume removal prevented",
        0x0B => "Cleaning volume",
        0x0C => "Unsupported format",
        0x0D => "Recoverable mechanical cartridge failure",
        0x0E => "Unrecoverable mechanical cartridge failure",
        0x0F => "Memory chip in cartridge failure",
        0x10 => "Forced eject",
        0x11 => "Read only format",
        0x12 => "Tape directory corrupted on load",
        0x13 => "Nearing medium life",
        0x14 => "Cleaning required",
        0x15 => "Cleaning requested",
        0x16 => "Expired cleaning volume",
        0x17 => "Invalid cleaning volume",
        0x18 => "Retension requested",
        0x19 => "Multi-port interface error on a primary port",
        0x1A => "Cooling fan failure",
        0x1B => "Power supply failure",
        0x1C => "Power consumption",
        0x1D => "Drive preventive maintenance required",
        0x1E => "Hardware A",
        0x1F => "Hardware B",
        0x20 => "Primary interface",
        0x21 => "Eject volume",
        0x22 => "Microcode update fail",
        0x23 => "Drive humidity",
        0x24 => "Drive temperature",
        0x25 => "Drive voltage",
        0x26 => "Predictive failure",
        0x27 => "Diagnostics required",
        0x2F => "External data encryption control - communication failure",
        0x30 => "External data encryption control - key manager returned an error",
        0x31 => "Diminished native capacity",
        0x32 => "Lost statistics",
        0x33 => "Tape directory invalid at unload",
        0x34 => "Tape system area write failure",
        0x35 => "Tape system area read failure",
        0x36 => "No start of data",
        0x37 => "Loading or threading failure",
        0x38 => "Unrecoverable unload failure",
        0x39 => "Automation interface failure",
        0x3A => "Microcode failure",
        0x3B => "WORM volume - integrity check failed",
        0x3C => "WORM volume - overwrite attempted",
        _ => return format!("Reserved tapeAlert code: {parameter_code:#x}"),
    };
    text.to_string()
}

/// The error launcher: turn a completed transaction with status != GOOD
/// into a [`TapeError::Scsi`].
///
/// For CHECK CONDITION the sense buffer is decoded into the diagnostic; if
/// decoding itself fails the error still carries the original status, with
/// a best-effort note instead of the sense text.
pub fn check_status(hdr: &SgIoHdr, sense: &SenseData, context: &str) -> Result<()> {
    let status = hdr.status;
    if status == ScsiStatus::Good as u8 {
        return Ok(());
    }
    let sense_text = if status == ScsiStatus::CheckCondition as u8 {
        match sense.acs_string() {
            Ok(text) => Some(text),
            Err(_) => Some("failed to decode sense".to_string()),
        }
    } else {
        None
    };
    Err(TapeError::Scsi {
        context: context.to_string(),
        status,
        status_text: status_to_string(status),
        sense_text,
    })
}
