//! SCSI protocol layer: constants, command blocks, the SG_IO envelope and
//! the status/sense interpreter.
//!
//! Byte and bit layouts follow SPC-4 (primary commands) and SSC-3/SSC-4
//! (stream commands), with the vendor log pages taken from the T10000, LTO
//! Ultrium and IBM 3592 SCSI reference manuals.

pub mod cdb;
pub mod logsense;
pub mod sense;
pub mod sgio;

/// SCSI operation codes used by this crate.
pub mod commands {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const INQUIRY: u8 = 0x12;
    pub const MODE_SELECT_6: u8 = 0x15;
    pub const MODE_SENSE_6: u8 = 0x1A;
    pub const LOCATE_10: u8 = 0x2B;
    pub const READ_POSITION: u8 = 0x34;
    pub const LOG_SELECT: u8 = 0x4C;
    pub const LOG_SENSE: u8 = 0x4D;
}

/// SCSI peripheral device types (INQUIRY byte 0).
pub mod types {
    pub const DISK: u8 = 0x00;
    pub const TAPE: u8 = 0x01;
    pub const MEDIUM_CHANGER: u8 = 0x08;
}

/// LOG SENSE / LOG SELECT page codes.
pub mod log_pages {
    /// Sequential-access device page (SSC; T10000 byte counters live here).
    pub const SEQUENTIAL_ACCESS_DEVICE: u8 = 0x0C;
    /// TapeAlert page (SSC-3 8.2.3).
    pub const TAPE_ALERT: u8 = 0x2E;
    /// LTO/SDLT data compression page.
    pub const DATA_COMPRESSION_32H: u8 = 0x32;
    /// IBM 3592 block/bytes transferred page. Reset on cartridge load.
    pub const BLOCK_BYTES_TRANSFERRED: u8 = 0x38;
}

/// MODE SENSE / MODE SELECT page codes.
pub mod mode_pages {
    pub const DEVICE_CONFIGURATION: u8 = 0x10;
}

/// INQUIRY vital product data pages.
pub mod vpd_pages {
    pub const UNIT_SERIAL_NUMBER: u8 = 0x80;
}

/// Parameter codes of the sequential-access device page
/// (Sun StorageTek T10000 Fibre Channel Interface Reference Manual).
pub mod sequential_access_page {
    pub const RECEIVED_FROM_INITIATOR: u16 = 0x0000;
    pub const WRITTEN_ON_TAPE: u16 = 0x0001;
    pub const READ_FROM_TAPE: u16 = 0x0002;
    pub const READ_BY_INITIATOR: u16 = 0x0003;
}

/// Parameter codes of the LTO data compression page (32h)
/// (IBM TotalStorage LTO Ultrium Tape Drive SCSI Reference).
pub mod data_compression_32h {
    pub const MB_TRANSFERRED_TO_SERVER: u16 = 0x0002;
    /// Signed remainder on top of the megabyte counter; may be negative.
    pub const BYTES_TRANSFERRED_TO_SERVER: u16 = 0x0003;
    pub const MB_READ_FROM_TAPE: u16 = 0x0004;
    pub const BYTES_READ_FROM_TAPE: u16 = 0x0005;
    pub const MB_TRANSFERRED_FROM_SERVER: u16 = 0x0006;
    pub const BYTES_TRANSFERRED_FROM_SERVER: u16 = 0x0007;
    pub const MB_WRITTEN_TO_TAPE: u16 = 0x0008;
    pub const BYTES_WRITTEN_TO_TAPE: u16 = 0x0009;
}

/// Parameter codes of the IBM 3592 block/bytes transferred page (38h)
/// (IBM System Storage Tape Drive 3592 SCSI Reference). Values are KiB.
pub mod block_bytes_transferred {
    pub const HOST_WRITE_KIB_PROCESSED: u16 = 0x0001;
    pub const HOST_READ_KIB_PROCESSED: u16 = 0x0003;
    pub const DEVICE_WRITE_KIB_PROCESSED: u16 = 0x0005;
    pub const DEVICE_READ_KIB_PROCESSED: u16 = 0x0007;
}
