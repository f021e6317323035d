//! SCSI operations: identity, positioning, alerts and drive configuration.
//!
//! Every operation builds its CDB, data buffer and sense buffer on the
//! stack, binds them into one SG_IO envelope and submits it; nothing
//! survives the call. Multi-byte CDB fields are converted explicitly with
//! the codec helpers, the records themselves never byte-swap.

use tracing::debug;

use crate::codec;
use crate::error::{Result, TapeError};
use crate::scsi::cdb::{
    InquiryCdb, InquiryData, InquiryUnitSerialNumberData, Locate10Cdb, LogSelectCdb, LogSenseCdb,
    ModeSelect6Cdb, ModeSense6Cdb, ReadPositionCdb, ReadPositionDataShortForm, TestUnitReadyCdb,
    PC_CURRENT_CUMULATIVE, PC_DEFAULT_VALUES,
};
use crate::scsi::logsense::active_tape_alerts;
use crate::scsi::sense::{tape_alert_to_string, SenseData};
use crate::scsi::sgio::{record_bytes_mut, DataDirection, SgIoHdr, LOCATE_TIMEOUT_MS};
use crate::scsi::{log_pages, mode_pages, types, vpd_pages};
use crate::sys::System;

use super::{InquiryInfo, PositionInfo, TapeDrive};

/// Room for 100 TapeAlert parameters (4-byte header + 1 flag byte each)
/// behind the 4-byte page header.
const TAPE_ALERT_BUFF_LEN: usize = 4 + 100 * 5;

impl<S: System> TapeDrive<S> {
    /// Identity of the drive: INQUIRY for vendor/product/revision, then the
    /// unit-serial-number vital product data page for the serial.
    pub fn device_info(&self) -> Result<InquiryInfo> {
        let mut cdb = InquiryCdb::default();
        let mut data = InquiryData::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        codec::set_u16(
            &mut cdb.allocation_length,
            std::mem::size_of::<InquiryData>() as u16,
        );

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(record_bytes_mut(&mut data), DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "device_info")?;

        if data.peripheral_device_type() != types::TAPE {
            return Err(TapeError::decode(format!(
                "not a tape drive: peripheral device type {:#04x}",
                data.peripheral_device_type()
            )));
        }

        let info = InquiryInfo {
            vendor: codec::to_string(&data.vendor),
            product: codec::to_string(&data.product),
            product_revision_level: codec::to_string(&data.product_revision_level),
            serial_number: self.serial_number()?,
        };
        debug!(?info, "inquiry");
        Ok(info)
    }

    /// Vendor-assigned serial number from the unit serial number VPD page.
    pub fn serial_number(&self) -> Result<String> {
        let mut cdb = InquiryCdb::default();
        let mut data = InquiryUnitSerialNumberData::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_evpd(true);
        cdb.page_code = vpd_pages::UNIT_SERIAL_NUMBER;
        codec::set_u16(
            &mut cdb.allocation_length,
            std::mem::size_of::<InquiryUnitSerialNumberData>() as u16,
        );

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(record_bytes_mut(&mut data), DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "serial_number")?;

        Ok(data.serial_number())
    }

    /// Readiness probe: TEST UNIT READY, GOOD status or error.
    pub fn test_unit_ready(&self) -> Result<()> {
        let mut cdb = TestUnitReadyCdb::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "test_unit_ready")
    }

    /// Position to an absolute logical object (block address).
    ///
    /// Blocking: the immediate bit stays clear and the device server does
    /// not return status until the medium is positioned, so this transaction
    /// runs under the long positioning timeout.
    pub fn position_to_logical_object(&self, block_id: u32) -> Result<()> {
        debug!(block_id, "locate");
        let mut cdb = Locate10Cdb::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        codec::set_u32(&mut cdb.logical_object_id, block_id);

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_sense(&mut sense.buf);
        sgh.set_timeout(LOCATE_TIMEOUT_MS);
        self.sg_transaction(&mut sgh, &sense, "position_to_logical_object")
    }

    /// Logical position of the drive, short form READ POSITION.
    ///
    /// The short form is the one all supported families implement; the
    /// allocation length must stay zero or some drives complain. An
    /// overflow reported by the drive (PERR) is a hard error: there is no
    /// long-form fallback, and partial position data must not escape.
    pub fn position_info(&self) -> Result<PositionInfo> {
        let mut cdb = ReadPositionCdb::default();
        let mut data = ReadPositionDataShortForm::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(record_bytes_mut(&mut data), DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "position_info")?;

        if data.position_error() {
            return Err(TapeError::decode(
                "position fields overflowed in READ POSITION short form",
            ));
        }
        Ok(PositionInfo {
            current_position: codec::to_u32(&data.first_block_location),
            oldest_dirty_object: codec::to_u32(&data.last_block_location),
            dirty_objects_count: codec::to_u32_3(&data.blocks_in_buffer),
            dirty_bytes_count: codec::to_u32(&data.bytes_in_buffer),
        })
    }

    /// Active TapeAlert parameter codes, current cumulative values.
    pub fn tape_alert_codes(&self) -> Result<Vec<u16>> {
        let mut cdb = LogSenseCdb::default();
        let mut data = [0u8; TAPE_ALERT_BUFF_LEN];
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_page_code(log_pages::TAPE_ALERT);
        cdb.set_page_control(PC_CURRENT_CUMULATIVE);
        codec::set_u16(&mut cdb.allocation_length, data.len() as u16);

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(&mut data, DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "tape_alert_codes")?;

        active_tape_alerts(&data)
    }

    /// Active TapeAlerts decoded to their SSC description strings.
    pub fn tape_alerts(&self) -> Result<Vec<String>> {
        Ok(self
            .tape_alert_codes()?
            .into_iter()
            .map(tape_alert_to_string)
            .collect())
    }

    /// Set tape density and compression through the Device Configuration
    /// mode page: MODE SENSE(6) fetches the current settings, only the
    /// density code (when non-zero) and the compression algorithm selector
    /// are touched, MODE SELECT(6) writes the page back.
    ///
    /// A zero `density_code` keeps whatever density the drive detected.
    pub fn set_density_and_compression(&self, compression: bool, density_code: u8) -> Result<()> {
        debug!(compression, density_code, "set density and compression");
        let mut config = self.read_device_configuration()?;

        let mut cdb = ModeSelect6Cdb::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_page_format(true); // ignored by the drives we speak to
        cdb.param_list_length = std::mem::size_of_val(&config) as u8;

        // Must be zero on the way back in for IBM and LTO.
        config.header.mode_data_length = 0;
        if density_code != 0 {
            config.block_descriptor.density_code = density_code;
        }
        config.mode_page.select_data_compression_algorithm = u8::from(compression);

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(record_bytes_mut(&mut config), DataDirection::ToDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "set_density_and_compression")
    }

    pub(crate) fn read_device_configuration(
        &self,
    ) -> Result<crate::scsi::cdb::ModeSenseDeviceConfiguration> {
        let mut cdb = ModeSense6Cdb::default();
        let mut config = crate::scsi::cdb::ModeSenseDeviceConfiguration::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_page_code(mode_pages::DEVICE_CONFIGURATION);
        cdb.allocation_length = std::mem::size_of_val(&config) as u8;

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(record_bytes_mut(&mut config), DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "read_device_configuration")?;
        Ok(config)
    }

    /// Reset the drive's cumulative log counters to their defaults:
    /// LOG SELECT with the parameter code reset bit and page control 11b.
    pub fn clear_compression_stats(&self) -> Result<()> {
        debug!("clear compression statistics");
        let mut cdb = LogSelectCdb::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_pcr(true);
        cdb.set_page_control(PC_DEFAULT_VALUES);

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, "clear_compression_stats")
    }

    /// Run one LOG SENSE for `page_code` with current cumulative values
    /// into `data`.
    pub(crate) fn log_sense_page(&self, page_code: u8, data: &mut [u8], context: &str) -> Result<()> {
        let mut cdb = LogSenseCdb::default();
        let mut sense = SenseData::default();
        let mut sgh = SgIoHdr::new();

        cdb.set_page_code(page_code);
        cdb.set_page_control(PC_CURRENT_CUMULATIVE);
        codec::set_u16(&mut cdb.allocation_length, data.len() as u16);

        sgh.set_cdb(record_bytes_mut(&mut cdb));
        sgh.set_data(data, DataDirection::FromDevice);
        sgh.set_sense(&mut sense.buf);
        self.sg_transaction(&mut sgh, &sense, context)
    }
}

#[cfg(test)]
mod tests {
    use crate::device::tests::fake_device_info;
    use crate::device::TapeDrive;
    use crate::scsi::sense::ScsiStatus;
    use crate::sys::fake::FakeSystem;

    fn drive(product: &str) -> TapeDrive<FakeSystem> {
        TapeDrive::open_with(FakeSystem::with_product(product), fake_device_info()).unwrap()
    }

    #[test]
    fn device_info_reads_identity_and_serial() {
        let sys = FakeSystem::with_product("T10000C");
        sys.set_identity("STK", "T10000C", "5.30", "HU1234567890");
        let d = TapeDrive::open_with(sys, fake_device_info()).unwrap();
        let info = d.device_info().unwrap();
        assert_eq!(info.vendor, "STK");
        assert_eq!(info.product, "T10000C");
        assert_eq!(info.product_revision_level, "5.30");
        assert_eq!(info.serial_number, "HU1234567890");
    }

    #[test]
    fn open_rejects_non_tape_peripherals() {
        let sys = FakeSystem::with_product("SomeDisk");
        sys.set_peripheral_type(0x00);
        assert!(TapeDrive::open_with(sys, fake_device_info()).is_err());
    }

    #[test]
    fn locate_is_big_endian_and_long_timeout() {
        let d = drive("ULT3580-TD5");
        d.position_to_logical_object(0x00C0FFEE).unwrap();
        let locates = d.sys().locate_requests();
        assert_eq!(locates, vec![(0x00C0FFEE, 180_000)]);
        // The raw CDB carried the address big-endian.
        let cdb = d.sys().last_cdb();
        assert_eq!(cdb[0], 0x2B);
        assert_eq!(&cdb[3..7], &[0x00, 0xC0, 0xFF, 0xEE]);
    }

    #[test]
    fn position_info_decodes_short_form() {
        let d = drive("ULT3580-TD5");
        d.sys().set_position(1000, 950, 50, 0x0001_0000);
        let pos = d.position_info().unwrap();
        assert_eq!(pos.current_position, 1000);
        assert_eq!(pos.oldest_dirty_object, 950);
        assert_eq!(pos.dirty_objects_count, 50);
        assert_eq!(pos.dirty_bytes_count, 0x0001_0000);
    }

    #[test]
    fn position_overflow_is_an_error_not_partial_data() {
        let d = drive("ULT3580-TD5");
        d.sys().set_position(1000, 950, 50, 64);
        d.sys().set_position_overflow(true);
        let err = d.position_info().unwrap_err();
        assert!(err.to_string().contains("overflow"), "{err}");
    }

    #[test]
    fn tape_alerts_report_only_raised_flags() {
        let d = drive("03592E08");
        d.sys().raise_tape_alert(0x14);
        d.sys().raise_tape_alert(0x3C);
        assert_eq!(d.tape_alert_codes().unwrap(), vec![0x14, 0x3C]);
        assert_eq!(
            d.tape_alerts().unwrap(),
            vec![
                "Cleaning required".to_string(),
                "WORM volume - overwrite attempted".to_string(),
            ]
        );
    }

    #[test]
    fn density_and_compression_read_modify_write() {
        let d = drive("T10000C");
        d.sys().set_drive_config(0x58, 0);
        d.set_density_and_compression(true, 0).unwrap();
        // Density untouched (zero requested), compression selected.
        assert_eq!(d.sys().drive_config(), (0x58, 1));

        d.set_density_and_compression(false, 0x5A).unwrap();
        assert_eq!(d.sys().drive_config(), (0x5A, 0));
    }

    #[test]
    fn scsi_failure_carries_status_and_sense_text() {
        let d = drive("ULT3580-TD5");
        let mut sense = vec![0u8; 18];
        sense[0] = 0x70;
        sense[12] = 0x3A; // Medium not present
        d.sys()
            .inject_failure(ScsiStatus::CheckCondition as u8, sense);
        let err = d.test_unit_ready().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CHECK CONDITION"), "{msg}");
        assert!(msg.contains("Medium not present"), "{msg}");
    }
}
