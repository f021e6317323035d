//! A scripted tape transport behind the [`System`] trait.
//!
//! Serves the handful of SCSI commands and tape-control calls the drive
//! layer issues, from plain in-memory state, so the drive logic can be
//! tested end to end without hardware. Cloning shares the state, which
//! lets a test keep a probe handle after the drive takes ownership.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nix::errno::Errno;
use nix::fcntl::OFlag;

use crate::codec;
use crate::scsi::cdb::{
    InquiryData, InquiryUnitSerialNumberData, ModeSenseDeviceConfiguration,
    ReadPositionDataShortForm,
};
use crate::scsi::logsense::LogPageBuilder;
use crate::scsi::sgio::{record_bytes, SgIoHdr};
use crate::scsi::{
    block_bytes_transferred as ibm, commands, data_compression_32h as lto, log_pages,
    sequential_access_page as t10k,
};
use crate::sys::mtio::MtOp;
use crate::sys::System;

#[derive(Default)]
struct FakeState {
    next_fd: RawFd,
    opens: Vec<(PathBuf, OFlag)>,
    closed: Vec<RawFd>,

    peripheral_type: u8,
    vendor: String,
    product: String,
    revision: String,
    serial: String,

    // write path / read path cumulative counters
    from_host: u64,
    to_tape: u64,
    from_tape: u64,
    to_host: u64,

    position: (u32, u32, u32, u32),
    position_overflow: bool,

    raised_alerts: Vec<u16>,

    density_code: u8,
    compression_alg: u8,

    locate_requests: Vec<(u32, u32)>,
    last_cdb: Vec<u8>,
    mode_selects: Vec<Vec<u8>>,
    mt_ops: Vec<(libc::c_short, libc::c_int)>,

    written_blocks: Vec<Vec<u8>>,
    read_queue: VecDeque<Vec<u8>>,

    fail_next: Option<(u8, Vec<u8>)>,
}

#[derive(Clone)]
pub(crate) struct FakeSystem {
    state: Rc<RefCell<FakeState>>,
}

impl FakeSystem {
    pub fn with_product(product: &str) -> Self {
        let state = FakeState {
            next_fd: 3,
            peripheral_type: 0x01,
            vendor: "FAKE".into(),
            product: product.into(),
            revision: "0001".into(),
            serial: "FK0000000001".into(),
            ..FakeState::default()
        };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    pub fn set_identity(&self, vendor: &str, product: &str, revision: &str, serial: &str) {
        let mut s = self.state.borrow_mut();
        s.vendor = vendor.into();
        s.product = product.into();
        s.revision = revision.into();
        s.serial = serial.into();
    }

    pub fn set_peripheral_type(&self, device_type: u8) {
        self.state.borrow_mut().peripheral_type = device_type;
    }

    pub fn set_compression_counters(&self, from_host: u64, to_tape: u64, from_tape: u64, to_host: u64) {
        let mut s = self.state.borrow_mut();
        s.from_host = from_host;
        s.to_tape = to_tape;
        s.from_tape = from_tape;
        s.to_host = to_host;
    }

    pub fn set_position(&self, current: u32, oldest_dirty: u32, dirty_objects: u32, dirty_bytes: u32) {
        self.state.borrow_mut().position = (current, oldest_dirty, dirty_objects, dirty_bytes);
    }

    pub fn set_position_overflow(&self, overflow: bool) {
        self.state.borrow_mut().position_overflow = overflow;
    }

    pub fn raise_tape_alert(&self, code: u16) {
        self.state.borrow_mut().raised_alerts.push(code);
    }

    pub fn set_drive_config(&self, density_code: u8, compression_alg: u8) {
        let mut s = self.state.borrow_mut();
        s.density_code = density_code;
        s.compression_alg = compression_alg;
    }

    pub fn drive_config(&self) -> (u8, u8) {
        let s = self.state.borrow();
        (s.density_code, s.compression_alg)
    }

    /// Fail the next SCSI transaction with this status byte and sense data.
    pub fn inject_failure(&self, status: u8, sense: Vec<u8>) {
        self.state.borrow_mut().fail_next = Some((status, sense));
    }

    pub fn queue_read_block(&self, block: Vec<u8>) {
        self.state.borrow_mut().read_queue.push_back(block);
    }

    pub fn opens(&self) -> Vec<(PathBuf, OFlag)> {
        self.state.borrow().opens.clone()
    }

    pub fn closed(&self) -> Vec<RawFd> {
        self.state.borrow().closed.clone()
    }

    pub fn mt_ops(&self) -> Vec<(libc::c_short, libc::c_int)> {
        self.state.borrow().mt_ops.clone()
    }

    pub fn clear_mt_ops(&self) {
        self.state.borrow_mut().mt_ops.clear();
    }

    pub fn locate_requests(&self) -> Vec<(u32, u32)> {
        self.state.borrow().locate_requests.clone()
    }

    pub fn last_cdb(&self) -> Vec<u8> {
        self.state.borrow().last_cdb.clone()
    }

    pub fn written_blocks(&self) -> Vec<Vec<u8>> {
        self.state.borrow().written_blocks.clone()
    }

    fn serve(&self, hdr: &mut SgIoHdr, cdb: &[u8]) {
        let mut s = self.state.borrow_mut();
        match cdb[0] {
            commands::TEST_UNIT_READY => {}
            commands::INQUIRY => {
                if cdb[1] & 0x01 != 0 {
                    let mut page = InquiryUnitSerialNumberData::default();
                    page.peripheral = s.peripheral_type;
                    page.page_code = cdb[2];
                    page.page_length = s.serial.len().min(12) as u8;
                    codec::set_string(&mut page.product_serial_number, &s.serial);
                    fill_data(hdr, record_bytes(&page));
                } else {
                    let mut data = InquiryData::default();
                    data.peripheral = s.peripheral_type;
                    codec::set_string(&mut data.vendor, &s.vendor);
                    codec::set_string(&mut data.product, &s.product);
                    codec::set_string(&mut data.product_revision_level, &s.revision);
                    fill_data(hdr, record_bytes(&data));
                }
            }
            commands::LOCATE_10 => {
                let block = codec::to_u32(&[cdb[3], cdb[4], cdb[5], cdb[6]]);
                let timeout = hdr.timeout;
                s.locate_requests.push((block, timeout));
            }
            commands::READ_POSITION => {
                let mut data = ReadPositionDataShortForm::default();
                if s.position_overflow {
                    data.flags |= 0x02;
                }
                codec::set_u32(&mut data.first_block_location, s.position.0);
                codec::set_u32(&mut data.last_block_location, s.position.1);
                let blocks = s.position.2.to_be_bytes();
                data.blocks_in_buffer.copy_from_slice(&blocks[1..4]);
                codec::set_u32(&mut data.bytes_in_buffer, s.position.3);
                fill_data(hdr, record_bytes(&data));
            }
            commands::LOG_SENSE => {
                let page_code = cdb[2] & 0x3F;
                let page = s.build_log_page(page_code);
                fill_data(hdr, &page);
            }
            commands::LOG_SELECT => {
                if cdb[1] & 0x02 != 0 {
                    s.from_host = 0;
                    s.to_tape = 0;
                    s.from_tape = 0;
                    s.to_host = 0;
                }
            }
            commands::MODE_SENSE_6 => {
                let mut config = ModeSenseDeviceConfiguration::default();
                config.header.mode_data_length = 0x1A;
                config.header.block_descriptor_length = 8;
                config.block_descriptor.density_code = s.density_code;
                config.mode_page.page = 0x10;
                config.mode_page.page_length = 0x0E;
                config.mode_page.select_data_compression_algorithm = s.compression_alg;
                fill_data(hdr, record_bytes(&config));
            }
            commands::MODE_SELECT_6 => {
                let buf = data_buffer(hdr);
                assert!(buf.len() >= 28, "short MODE SELECT parameter list");
                assert_eq!(buf[0], 0, "mode data length must be reset to zero");
                s.density_code = buf[4];
                s.compression_alg = buf[26];
                s.mode_selects.push(buf);
            }
            other => panic!("fake drive got unexpected CDB opcode {other:#04x}"),
        }
    }
}

impl FakeState {
    fn build_log_page(&self, page_code: u8) -> Vec<u8> {
        match page_code {
            log_pages::SEQUENTIAL_ACCESS_DEVICE => LogPageBuilder::new(page_code)
                .parameter(t10k::RECEIVED_FROM_INITIATOR, &self.from_host.to_be_bytes())
                .parameter(t10k::WRITTEN_ON_TAPE, &self.to_tape.to_be_bytes())
                .parameter(t10k::READ_FROM_TAPE, &self.from_tape.to_be_bytes())
                .parameter(t10k::READ_BY_INITIATOR, &self.to_host.to_be_bytes())
                .build(),
            log_pages::DATA_COMPRESSION_32H => {
                const MB: u64 = 1_000_000;
                let split = |v: u64| ((v / MB) as u32, (v % MB) as u32);
                let (fh_mb, fh_b) = split(self.from_host);
                let (tt_mb, tt_b) = split(self.to_tape);
                let (ft_mb, ft_b) = split(self.from_tape);
                let (th_mb, th_b) = split(self.to_host);
                LogPageBuilder::new(page_code)
                    .parameter(lto::MB_TRANSFERRED_FROM_SERVER, &fh_mb.to_be_bytes())
                    .parameter(lto::BYTES_TRANSFERRED_FROM_SERVER, &fh_b.to_be_bytes())
                    .parameter(lto::MB_WRITTEN_TO_TAPE, &tt_mb.to_be_bytes())
                    .parameter(lto::BYTES_WRITTEN_TO_TAPE, &tt_b.to_be_bytes())
                    .parameter(lto::MB_READ_FROM_TAPE, &ft_mb.to_be_bytes())
                    .parameter(lto::BYTES_READ_FROM_TAPE, &ft_b.to_be_bytes())
                    .parameter(lto::MB_TRANSFERRED_TO_SERVER, &th_mb.to_be_bytes())
                    .parameter(lto::BYTES_TRANSFERRED_TO_SERVER, &th_b.to_be_bytes())
                    .build()
            }
            log_pages::BLOCK_BYTES_TRANSFERRED => LogPageBuilder::new(page_code)
                .parameter(ibm::HOST_WRITE_KIB_PROCESSED, &((self.from_host >> 10) as u32).to_be_bytes())
                .parameter(ibm::DEVICE_WRITE_KIB_PROCESSED, &((self.to_tape >> 10) as u32).to_be_bytes())
                .parameter(ibm::DEVICE_READ_KIB_PROCESSED, &((self.from_tape >> 10) as u32).to_be_bytes())
                .parameter(ibm::HOST_READ_KIB_PROCESSED, &((self.to_host >> 10) as u32).to_be_bytes())
                .build(),
            log_pages::TAPE_ALERT => {
                let mut builder = LogPageBuilder::new(page_code);
                for code in 1..=64u16 {
                    let flag = u8::from(self.raised_alerts.contains(&code));
                    builder = builder.parameter(code, &[flag]);
                }
                builder.build()
            }
            other => panic!("fake drive has no log page {other:#04x}"),
        }
    }
}

fn fill_data(hdr: &mut SgIoHdr, bytes: &[u8]) {
    let n = (hdr.dxfer_len as usize).min(bytes.len());
    assert!(!hdr.dxferp.is_null(), "SCSI command needs a data buffer");
    let out = unsafe { std::slice::from_raw_parts_mut(hdr.dxferp as *mut u8, n) };
    out.copy_from_slice(&bytes[..n]);
}

fn data_buffer(hdr: &SgIoHdr) -> Vec<u8> {
    if hdr.dxferp.is_null() {
        return Vec::new();
    }
    unsafe { std::slice::from_raw_parts(hdr.dxferp as *const u8, hdr.dxfer_len as usize) }.to_vec()
}

impl System for FakeSystem {
    fn open(&self, path: &Path, oflag: OFlag) -> nix::Result<RawFd> {
        let mut s = self.state.borrow_mut();
        s.opens.push((path.to_path_buf(), oflag));
        let fd = s.next_fd;
        s.next_fd += 1;
        Ok(fd)
    }

    fn close(&self, fd: RawFd) -> nix::Result<()> {
        self.state.borrow_mut().closed.push(fd);
        Ok(())
    }

    fn read(&self, _fd: RawFd, buf: &mut [u8]) -> nix::Result<usize> {
        let mut s = self.state.borrow_mut();
        match s.read_queue.pop_front() {
            None => Ok(0),
            Some(block) if block.len() > buf.len() => Err(Errno::ENOSPC),
            Some(block) => {
                buf[..block.len()].copy_from_slice(&block);
                Ok(block.len())
            }
        }
    }

    fn write(&self, _fd: RawFd, buf: &[u8]) -> nix::Result<usize> {
        self.state.borrow_mut().written_blocks.push(buf.to_vec());
        Ok(buf.len())
    }

    fn sg_io(&self, _fd: RawFd, hdr: &mut SgIoHdr) -> nix::Result<()> {
        let cdb = unsafe {
            std::slice::from_raw_parts(hdr.cmdp as *const u8, hdr.cmd_len as usize)
        }
        .to_vec();
        self.state.borrow_mut().last_cdb = cdb.clone();

        if let Some((status, sense)) = self.state.borrow_mut().fail_next.take() {
            hdr.status = status;
            if !hdr.sbp.is_null() {
                let n = (hdr.mx_sb_len as usize).min(sense.len());
                let out = unsafe { std::slice::from_raw_parts_mut(hdr.sbp, n) };
                out.copy_from_slice(&sense[..n]);
                hdr.sb_len_wr = n as u8;
            }
            return Ok(());
        }

        hdr.status = 0;
        self.serve(hdr, &cdb);
        Ok(())
    }

    fn tape_op(&self, _fd: RawFd, op: &MtOp) -> nix::Result<()> {
        self.state.borrow_mut().mt_ops.push((op.mt_op, op.mt_count));
        Ok(())
    }
}
