//! Command descriptor blocks and their reply records.
//!
//! Each CDB is a `#[repr(C)]` record built only from `u8` and `[u8; N]`
//! fields, so its in-memory form is its wire form on every host. Bit-packed
//! flags are reached through mask/shift accessors instead of bitfields;
//! multi-byte fields stay as big-endian byte arrays that callers fill with
//! the helpers in [`crate::codec`]. `Default` zero-fills the block and sets
//! its operation code; everything else is up to the caller.

use crate::scsi::commands;

macro_rules! assert_wire_size {
    ($t:ty, $n:expr) => {
        const _: () = assert!(std::mem::size_of::<$t>() == $n);
    };
}

/// INQUIRY, SPC-4. 6 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InquiryCdb {
    pub op_code: u8,
    /// Bit 0: EVPD (vital product data requested).
    pub flags: u8,
    pub page_code: u8,
    pub allocation_length: [u8; 2],
    pub control: u8,
}
assert_wire_size!(InquiryCdb, 6);

impl Default for InquiryCdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::INQUIRY;
        cdb
    }
}

impl InquiryCdb {
    pub fn set_evpd(&mut self, evpd: bool) {
        if evpd {
            self.flags |= 0x01;
        } else {
            self.flags &= !0x01;
        }
    }
}

/// LOG SELECT, SPC-4. 10 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LogSelectCdb {
    pub op_code: u8,
    /// Bit 0: SP (save parameters), bit 1: PCR (parameter code reset).
    pub flags: u8,
    /// Bits 0-5: page code, bits 6-7: page control.
    pub page: u8,
    pub subpage_code: u8,
    pub reserved: [u8; 3],
    pub parameter_list_length: [u8; 2],
    pub control: u8,
}
assert_wire_size!(LogSelectCdb, 10);

impl Default for LogSelectCdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::LOG_SELECT;
        cdb
    }
}

impl LogSelectCdb {
    pub fn set_pcr(&mut self, pcr: bool) {
        if pcr {
            self.flags |= 0x02;
        } else {
            self.flags &= !0x02;
        }
    }

    pub fn set_page_code(&mut self, code: u8) {
        self.page = (self.page & 0xC0) | (code & 0x3F);
    }

    pub fn set_page_control(&mut self, pc: u8) {
        self.page = (self.page & 0x3F) | (pc << 6);
    }
}

/// LOG SENSE, SPC-4. 10 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct LogSenseCdb {
    pub op_code: u8,
    /// Bit 0: SP, bit 1: PPC.
    pub flags: u8,
    /// Bits 0-5: page code, bits 6-7: page control.
    pub page: u8,
    pub subpage_code: u8,
    pub reserved: u8,
    pub parameter_pointer: [u8; 2],
    pub allocation_length: [u8; 2],
    pub control: u8,
}
assert_wire_size!(LogSenseCdb, 10);

impl Default for LogSenseCdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::LOG_SENSE;
        cdb
    }
}

/// Page control: current cumulative values.
pub const PC_CURRENT_CUMULATIVE: u8 = 0x01;
/// Page control 11b: default values; with PCR this resets the counters.
pub const PC_DEFAULT_VALUES: u8 = 0x03;

impl LogSenseCdb {
    pub fn set_page_code(&mut self, code: u8) {
        self.page = (self.page & 0xC0) | (code & 0x3F);
    }

    pub fn page_code(&self) -> u8 {
        self.page & 0x3F
    }

    pub fn set_page_control(&mut self, pc: u8) {
        self.page = (self.page & 0x3F) | (pc << 6);
    }
}

/// MODE SENSE(6), SPC-4. 6 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModeSense6Cdb {
    pub op_code: u8,
    /// Bit 3: DBD (disable block descriptors).
    pub flags: u8,
    /// Bits 0-5: page code, bits 6-7: page control.
    pub page: u8,
    pub subpage_code: u8,
    pub allocation_length: u8,
    pub control: u8,
}
assert_wire_size!(ModeSense6Cdb, 6);

impl Default for ModeSense6Cdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::MODE_SENSE_6;
        cdb
    }
}

impl ModeSense6Cdb {
    pub fn set_page_code(&mut self, code: u8) {
        self.page = (self.page & 0xC0) | (code & 0x3F);
    }

    pub fn page_code(&self) -> u8 {
        self.page & 0x3F
    }
}

/// MODE SELECT(6), SPC-4. 6 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModeSelect6Cdb {
    pub op_code: u8,
    /// Bit 0: SP (save pages), bit 4: PF (page format).
    pub flags: u8,
    pub reserved: [u8; 2],
    pub param_list_length: u8,
    pub control: u8,
}
assert_wire_size!(ModeSelect6Cdb, 6);

impl Default for ModeSelect6Cdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::MODE_SELECT_6;
        cdb
    }
}

impl ModeSelect6Cdb {
    pub fn set_page_format(&mut self, pf: bool) {
        if pf {
            self.flags |= 0x10;
        } else {
            self.flags &= !0x10;
        }
    }
}

/// LOCATE(10), SSC-3. 10 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Locate10Cdb {
    pub op_code: u8,
    /// Bit 0: IMMED, bit 1: CP (change partition), bit 2: BT (block type).
    pub flags: u8,
    pub reserved2: u8,
    /// Logical object identifier (block address), big-endian.
    pub logical_object_id: [u8; 4],
    pub reserved7: u8,
    pub partition: u8,
    pub control: u8,
}
assert_wire_size!(Locate10Cdb, 10);

impl Default for Locate10Cdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::LOCATE_10;
        cdb
    }
}

impl Locate10Cdb {
    pub fn set_immediate(&mut self, immed: bool) {
        if immed {
            self.flags |= 0x01;
        } else {
            self.flags &= !0x01;
        }
    }

    pub fn set_change_partition(&mut self, cp: bool) {
        if cp {
            self.flags |= 0x02;
        } else {
            self.flags &= !0x02;
        }
    }
}

/// READ POSITION, SSC-3. 10 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReadPositionCdb {
    pub op_code: u8,
    /// Bits 0-4: service action (00h = short form block id).
    pub flags: u8,
    pub reserved: [u8; 5],
    /// Only used by the extended forms; zero for the short form, which some
    /// drives insist on.
    pub allocation_length: [u8; 2],
    pub control: u8,
}
assert_wire_size!(ReadPositionCdb, 10);

impl Default for ReadPositionCdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::READ_POSITION;
        cdb
    }
}

impl ReadPositionCdb {
    pub fn set_service_action(&mut self, action: u8) {
        self.flags = (self.flags & 0xE0) | (action & 0x1F);
    }
}

/// TEST UNIT READY, SPC-4. 6 bytes, all zero but the control byte.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TestUnitReadyCdb {
    pub op_code: u8,
    pub reserved: [u8; 4],
    pub control: u8,
}
assert_wire_size!(TestUnitReadyCdb, 6);

impl Default for TestUnitReadyCdb {
    fn default() -> Self {
        let mut cdb: Self = unsafe { std::mem::zeroed() };
        cdb.op_code = commands::TEST_UNIT_READY;
        cdb
    }
}

/// Standard INQUIRY data, SPC-4. The compulsory 36 bytes plus the version
/// descriptors, 96 in total.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InquiryData {
    /// Bits 0-4: peripheral device type, bits 5-7: qualifier.
    pub peripheral: u8,
    pub rmb: u8,
    pub version: u8,
    pub response_data_format: u8,
    pub additional_length: u8,
    pub flags: [u8; 3],
    pub vendor: [u8; 8],
    pub product: [u8; 16],
    pub product_revision_level: [u8; 4],
    pub vendor_specific: [u8; 20],
    pub flags2: [u8; 2],
    pub version_descriptors: [[u8; 2]; 8],
    pub reserved: [u8; 22],
}
assert_wire_size!(InquiryData, 96);

impl Default for InquiryData {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl InquiryData {
    pub fn peripheral_device_type(&self) -> u8 {
        self.peripheral & 0x1F
    }
}

/// Unit serial number VPD page, SPC-4. 12 serial bytes cover every family
/// (T10000 and 3592 use all 12, LTO uses 10).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InquiryUnitSerialNumberData {
    pub peripheral: u8,
    pub page_code: u8,
    pub reserved: u8,
    pub page_length: u8,
    pub product_serial_number: [u8; 12],
}
assert_wire_size!(InquiryUnitSerialNumberData, 16);

impl Default for InquiryUnitSerialNumberData {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl InquiryUnitSerialNumberData {
    /// Right-aligned vendor-assigned serial, sized by the page length.
    pub fn serial_number(&self) -> String {
        let len = (self.page_length as usize).min(self.product_serial_number.len());
        String::from_utf8_lossy(&self.product_serial_number[..len])
            .trim()
            .to_string()
    }
}

/// READ POSITION short-form reply, SSC-3. 20 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ReadPositionDataShortForm {
    /// Bit 0: BPEW, bit 1: PERR, bit 2: LOLU, bit 4: BYCU, bit 5: LOCU,
    /// bit 6: EOP, bit 7: BOP.
    pub flags: u8,
    pub partition_number: u8,
    pub reserved: [u8; 2],
    pub first_block_location: [u8; 4],
    pub last_block_location: [u8; 4],
    pub reserved12: u8,
    pub blocks_in_buffer: [u8; 3],
    pub bytes_in_buffer: [u8; 4],
}
assert_wire_size!(ReadPositionDataShortForm, 20);

impl Default for ReadPositionDataShortForm {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

impl ReadPositionDataShortForm {
    /// Position error: at least one returned field has overflowed and the
    /// location data must not be trusted.
    pub fn position_error(&self) -> bool {
        self.flags & 0x02 != 0
    }
}

/// MODE SENSE(6)/MODE SELECT(6) parameter header, SPC-4.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModeParameterHeader6 {
    /// Must be reset to zero before MODE SELECT on IBM and LTO drives.
    pub mode_data_length: u8,
    pub medium_type: u8,
    /// Bits 0-3: speed, bits 4-6: buffered mode, bit 7: write protect.
    pub device_specific: u8,
    pub block_descriptor_length: u8,
}
assert_wire_size!(ModeParameterHeader6, 4);

impl ModeParameterHeader6 {
    pub fn write_protect(&self) -> bool {
        self.device_specific & 0x80 != 0
    }
}

/// Mode parameter block descriptor, SPC-4.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModeParameterBlockDescriptor {
    pub density_code: u8,
    pub number_of_blocks: [u8; 3],
    pub reserved: u8,
    pub block_length: [u8; 3],
}
assert_wire_size!(ModeParameterBlockDescriptor, 8);

/// Device Configuration mode page (10h). Not in SPC-4/SSC-3; the layout is
/// common to the T10000, LTO and 3592 reference manuals.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModePageDeviceConfiguration {
    /// Bits 0-5: page code (10h), bit 6: SPF, bit 7: PS.
    pub page: u8,
    pub page_length: u8,
    pub active_format: u8,
    pub active_partition: u8,
    pub write_buffer_full_ratio: u8,
    pub read_buffer_empty_ratio: u8,
    pub write_delay_time: [u8; 2],
    pub flags8: u8,
    pub gap_size: u8,
    pub flags10: u8,
    pub buf_size_at_early_warning: [u8; 3],
    /// 0 disables compression, 1 selects the default algorithm.
    pub select_data_compression_algorithm: u8,
    pub flags15: u8,
}
assert_wire_size!(ModePageDeviceConfiguration, 16);

/// The full MODE SENSE(6)/MODE SELECT(6) transfer for page 10h.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModeSenseDeviceConfiguration {
    pub header: ModeParameterHeader6,
    pub block_descriptor: ModeParameterBlockDescriptor,
    pub mode_page: ModePageDeviceConfiguration,
}
assert_wire_size!(ModeSenseDeviceConfiguration, 28);

impl Default for ModeSenseDeviceConfiguration {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}
