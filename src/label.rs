//! AUL tape labels: fixed 80-byte, space-padded ASCII records.
//!
//! A labeled tape starts with a VOL1 record; every file is bracketed by a
//! header group (HDR1, HDR2, UHL1) and a trailer group (EOF1, EOF2, UTL1),
//! with filemarks between groups. HDR1 and EOF1 share one layout, as do
//! HDR2/EOF2 and UHL1/UTL1; a freshly labeled tape carries a prelabel
//! (an HDR1 whose file identifier is the literal `PRELABEL`).
//!
//! `fill` is the writer side and sets only the record's defined fields over
//! the space-filled background; `verify` is the reader side and checks
//! every defined field and every reserved byte, failing on the first
//! non-conforming field with its name and content. The two are symmetric:
//! whatever `fill` produced, `verify` accepts.

use chrono::{Datelike, Local, NaiveDate};

use crate::codec::{cmp_string, set_int, set_string, to_string};
use crate::device::{InquiryInfo, TapeDrive};
use crate::error::{Result, TapeError};
use crate::sys::System;

/// Every AUL record is exactly this long.
pub const LABEL_SIZE: usize = 80;

/// The system code written into HDR1/EOF1.
const SYS_CODE: &str = concat!("TAPEDRIVE ", env!("CARGO_PKG_VERSION"));

macro_rules! assert_label_size {
    ($t:ty) => {
        const _: () = assert!(std::mem::size_of::<$t>() == LABEL_SIZE);
    };
}

fn space_filled<T>() -> T {
    // All label records are 80 plain bytes; start from all-spaces.
    assert_eq!(std::mem::size_of::<T>(), LABEL_SIZE);
    unsafe { std::mem::transmute_copy(&[b' '; LABEL_SIZE]) }
}

fn label_bytes<T>(record: &T) -> &[u8; LABEL_SIZE] {
    unsafe { &*(record as *const T as *const [u8; LABEL_SIZE]) }
}

fn label_from_bytes<T>(bytes: &[u8; LABEL_SIZE]) -> T {
    assert_eq!(std::mem::size_of::<T>(), LABEL_SIZE);
    unsafe { std::mem::transmute_copy(bytes) }
}

/// Creation/expiration date in cyyddd form: a century flag (space for 19xx,
/// '0' for 20xx), two year digits, three day-of-year digits.
fn set_date(field: &mut [u8; 6], date: NaiveDate) {
    field[0] = if date.year() >= 2000 { b'0' } else { b' ' };
    let mut tail = [0u8; 5];
    set_int(&mut tail[..2], (date.year() % 100) as u64);
    set_int(&mut tail[2..], date.ordinal() as u64);
    field[1..].copy_from_slice(&tail);
}

fn check_literal(field: &[u8], expected: &str, name: &'static str) -> Result<()> {
    if cmp_string(field, expected) {
        Ok(())
    } else {
        Err(TapeError::label(name, field))
    }
}

fn check_blank(field: &[u8], name: &'static str) -> Result<()> {
    if field.iter().all(|&b| b == b' ') {
        Ok(())
    } else {
        Err(TapeError::label(name, field))
    }
}

fn check_non_blank(field: &[u8], name: &'static str) -> Result<()> {
    if field.iter().any(|&b| b != b' ') {
        Ok(())
    } else {
        Err(TapeError::label(name, field))
    }
}

fn check_digits(field: &[u8], name: &'static str) -> Result<()> {
    if field.iter().all(u8::is_ascii_digit) {
        Ok(())
    } else {
        Err(TapeError::label(name, field))
    }
}

fn check_date(field: &[u8; 6], name: &'static str) -> Result<()> {
    if matches!(field[0], b' ' | b'0') && field[1..].iter().all(u8::is_ascii_digit) {
        Ok(())
    } else {
        Err(TapeError::label(name, field))
    }
}

/// Volume label.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Vol1 {
    label: [u8; 4],
    vsn: [u8; 6],
    accessibility: [u8; 1],
    reserved1: [u8; 13],
    impl_id: [u8; 13],
    owner_id: [u8; 14],
    reserved2: [u8; 28],
    label_standard: [u8; 1],
}
assert_label_size!(Vol1);

impl Default for Vol1 {
    fn default() -> Self {
        space_filled()
    }
}

impl Vol1 {
    pub fn fill(&mut self, vsn: &str) {
        set_string(&mut self.label, "VOL1");
        set_string(&mut self.vsn, vsn);
        set_string(&mut self.label_standard, "3");
    }

    pub fn verify(&self) -> Result<()> {
        check_literal(&self.label, "VOL1", "label")?;
        check_non_blank(&self.vsn, "vsn")?;
        check_literal(&self.accessibility, " ", "accessibility")?;
        check_blank(&self.reserved1, "reserved1")?;
        check_blank(&self.impl_id, "impl_id")?;
        check_blank(&self.owner_id, "owner_id")?;
        check_blank(&self.reserved2, "reserved2")?;
        check_literal(&self.label_standard, "3", "label_standard")
    }

    pub fn vsn(&self) -> String {
        to_string(&self.vsn)
    }

    pub fn as_bytes(&self) -> &[u8; LABEL_SIZE] {
        label_bytes(self)
    }

    pub fn from_bytes(bytes: &[u8; LABEL_SIZE]) -> Self {
        label_from_bytes(bytes)
    }
}

/// Shared layout of HDR1, EOF1 and the prelabel.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileSetLabel {
    label: [u8; 4],
    file_id: [u8; 17],
    vsn: [u8; 6],
    f_sec: [u8; 4],
    f_seq: [u8; 4],
    gen_num: [u8; 4],
    gen_ver: [u8; 2],
    creation_date: [u8; 6],
    expiration_date: [u8; 6],
    accessibility: [u8; 1],
    block_count: [u8; 6],
    sys_code: [u8; 13],
    reserved: [u8; 7],
}
assert_label_size!(FileSetLabel);

impl Default for FileSetLabel {
    fn default() -> Self {
        space_filled()
    }
}

impl FileSetLabel {
    fn fill(&mut self, label_id: &str, file_id: &str, vsn: &str, f_seq: u64, block_count: u64) {
        let today = Local::now().date_naive();
        set_string(&mut self.label, label_id);
        set_string(&mut self.file_id, file_id);
        set_string(&mut self.vsn, vsn);
        set_string(&mut self.f_sec, "0001");
        // The four-digit field wraps; the real sequence number lives in
        // UHL1/UTL1.
        set_int(&mut self.f_seq, f_seq);
        set_string(&mut self.gen_num, "0001");
        set_string(&mut self.gen_ver, "00");
        set_date(&mut self.creation_date, today);
        set_date(&mut self.expiration_date, today);
        set_int(&mut self.block_count, block_count);
        set_string(&mut self.sys_code, SYS_CODE);
    }

    fn verify(&self, expected_label: &str, zero_block_count: bool) -> Result<()> {
        check_literal(&self.label, expected_label, "label")?;
        check_non_blank(&self.file_id, "file_id")?;
        check_non_blank(&self.vsn, "vsn")?;
        check_literal(&self.f_sec, "0001", "f_sec")?;
        check_digits(&self.f_seq, "f_seq")?;
        check_literal(&self.gen_num, "0001", "gen_num")?;
        check_literal(&self.gen_ver, "00", "gen_ver")?;
        check_date(&self.creation_date, "creation_date")?;
        check_date(&self.expiration_date, "expiration_date")?;
        check_literal(&self.accessibility, " ", "accessibility")?;
        if zero_block_count {
            check_literal(&self.block_count, "000000", "block_count")?;
        } else {
            check_digits(&self.block_count, "block_count")?;
        }
        check_non_blank(&self.sys_code, "sys_code")?;
        check_blank(&self.reserved, "reserved")
    }

    pub fn file_id(&self) -> String {
        to_string(&self.file_id)
    }

    pub fn vsn(&self) -> String {
        to_string(&self.vsn)
    }

    pub fn f_seq(&self) -> String {
        to_string(&self.f_seq)
    }

    pub fn block_count(&self) -> String {
        to_string(&self.block_count)
    }
}

macro_rules! wrap_label {
    ($name:ident, $inner:ty) => {
        #[repr(transparent)]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name($inner);
        assert_label_size!($name);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; LABEL_SIZE] {
                label_bytes(self)
            }

            pub fn from_bytes(bytes: &[u8; LABEL_SIZE]) -> Self {
                label_from_bytes(bytes)
            }

            pub fn inner(&self) -> &$inner {
                &self.0
            }
        }
    };
}

wrap_label!(Hdr1, FileSetLabel);
wrap_label!(Eof1, FileSetLabel);
wrap_label!(Hdr1Prelabel, FileSetLabel);
wrap_label!(Hdr2, FileSectionLabel);
wrap_label!(Eof2, FileSectionLabel);
wrap_label!(Uhl1, UserLabel);
wrap_label!(Utl1, UserLabel);

impl Hdr1 {
    /// Header: the block count is by definition still zero.
    pub fn fill(&mut self, file_id: &str, vsn: &str, f_seq: u64) {
        self.0.fill("HDR1", file_id, vsn, f_seq, 0);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("HDR1", true)
    }
}

impl Eof1 {
    /// Trailer: carries the number of data blocks of the file just written.
    pub fn fill(&mut self, file_id: &str, vsn: &str, f_seq: u64, block_count: u64) {
        self.0.fill("EOF1", file_id, vsn, f_seq, block_count);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("EOF1", false)
    }
}

impl Hdr1Prelabel {
    /// The prelabel written right after VOL1 when a tape is labeled.
    pub fn fill(&mut self, vsn: &str) {
        self.0.fill("HDR1", "PRELABEL", vsn, 1, 0);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("HDR1", true)?;
        check_literal(&self.0.file_id, "PRELABEL", "file_id")
    }
}

/// Shared layout of HDR2 and EOF2.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileSectionLabel {
    label: [u8; 4],
    record_format: [u8; 1],
    block_length: [u8; 5],
    record_length: [u8; 5],
    reserved1: [u8; 19],
    /// "P " when the drive wrote with compression enabled.
    rec_technique: [u8; 2],
    reserved2: [u8; 44],
}
assert_label_size!(FileSectionLabel);

impl Default for FileSectionLabel {
    fn default() -> Self {
        space_filled()
    }
}

impl FileSectionLabel {
    fn fill(&mut self, label_id: &str, block_length: u64, record_length: u64, compression: bool) {
        set_string(&mut self.label, label_id);
        set_string(&mut self.record_format, "F");
        // Five digits only: larger sizes are recorded as zero and the true
        // value travels in the user label.
        set_int(&mut self.block_length, if block_length > 99_999 { 0 } else { block_length });
        set_int(
            &mut self.record_length,
            if record_length > 99_999 { 0 } else { record_length },
        );
        if compression {
            set_string(&mut self.rec_technique, "P ");
        }
    }

    fn verify(&self, expected_label: &str) -> Result<()> {
        check_literal(&self.label, expected_label, "label")?;
        check_literal(&self.record_format, "F", "record_format")?;
        check_digits(&self.block_length, "block_length")?;
        check_digits(&self.record_length, "record_length")?;
        check_blank(&self.reserved1, "reserved1")?;
        if !cmp_string(&self.rec_technique, "P") && !cmp_string(&self.rec_technique, "") {
            return Err(TapeError::label("rec_technique", &self.rec_technique));
        }
        check_blank(&self.reserved2, "reserved2")
    }

    pub fn block_length(&self) -> String {
        to_string(&self.block_length)
    }
}

impl Hdr2 {
    pub fn fill(&mut self, block_length: u64, record_length: u64, compression: bool) {
        self.0.fill("HDR2", block_length, record_length, compression);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("HDR2")
    }
}

impl Eof2 {
    pub fn fill(&mut self, block_length: u64, record_length: u64, compression: bool) {
        self.0.fill("EOF2", block_length, record_length, compression);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("EOF2")
    }
}

/// Shared layout of the user labels UHL1 and UTL1. These carry the values
/// the standard fields are too narrow for: the unwrapped file sequence
/// number and the real block size, plus the writing site, host and drive.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct UserLabel {
    label: [u8; 4],
    f_seq: [u8; 10],
    block_size: [u8; 10],
    record_length: [u8; 10],
    site: [u8; 8],
    host: [u8; 10],
    drive_vendor: [u8; 8],
    drive_model: [u8; 8],
    drive_serial: [u8; 12],
}
assert_label_size!(UserLabel);

impl Default for UserLabel {
    fn default() -> Self {
        space_filled()
    }
}

impl UserLabel {
    fn fill(
        &mut self,
        label_id: &str,
        f_seq: u64,
        block_size: u64,
        record_length: u64,
        site: &str,
        host: &str,
        drive: &InquiryInfo,
    ) {
        set_string(&mut self.label, label_id);
        set_int(&mut self.f_seq, f_seq);
        set_int(&mut self.block_size, block_size);
        set_int(&mut self.record_length, record_length);
        set_string(&mut self.site, site);
        set_string(&mut self.host, host);
        set_string(&mut self.drive_vendor, &drive.vendor);
        set_string(&mut self.drive_model, &drive.product);
        set_string(&mut self.drive_serial, &drive.serial_number);
    }

    fn verify(&self, expected_label: &str) -> Result<()> {
        check_literal(&self.label, expected_label, "label")?;
        check_digits(&self.f_seq, "f_seq")?;
        check_digits(&self.block_size, "block_size")?;
        check_digits(&self.record_length, "record_length")?;
        check_non_blank(&self.site, "site")?;
        check_non_blank(&self.host, "host")?;
        check_non_blank(&self.drive_vendor, "drive_vendor")?;
        check_non_blank(&self.drive_model, "drive_model")?;
        check_non_blank(&self.drive_serial, "drive_serial")
    }

    pub fn f_seq(&self) -> String {
        to_string(&self.f_seq)
    }

    pub fn block_size(&self) -> String {
        to_string(&self.block_size)
    }
}

impl Uhl1 {
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &mut self,
        f_seq: u64,
        block_size: u64,
        record_length: u64,
        site: &str,
        host: &str,
        drive: &InquiryInfo,
    ) {
        self.0.fill("UHL1", f_seq, block_size, record_length, site, host, drive);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("UHL1")
    }
}

impl Utl1 {
    #[allow(clippy::too_many_arguments)]
    pub fn fill(
        &mut self,
        f_seq: u64,
        block_size: u64,
        record_length: u64,
        site: &str,
        host: &str,
        drive: &InquiryInfo,
    ) {
        self.0.fill("UTL1", f_seq, block_size, record_length, site, host, drive);
    }

    pub fn verify(&self) -> Result<()> {
        self.0.verify("UTL1")
    }
}

/// Write the label set of a fresh volume: VOL1, a prelabel, one committed
/// filemark. The tape must already be positioned at beginning of tape.
pub fn label_tape<S: System>(drive: &TapeDrive<S>, vsn: &str) -> Result<()> {
    let mut vol1 = Vol1::default();
    vol1.fill(vsn);
    drive.write_block(vol1.as_bytes())?;
    let mut prelabel = Hdr1Prelabel::default();
    prelabel.fill(vsn);
    drive.write_block(prelabel.as_bytes())?;
    drive.write_sync_file_marks(1)?;
    Ok(())
}

/// Read and verify the VOL1 record at the current position.
pub fn read_vol1<S: System>(drive: &TapeDrive<S>) -> Result<Vol1> {
    let mut bytes = [0u8; LABEL_SIZE];
    drive.read_exact_block(&mut bytes, "reading VOL1")?;
    let vol1 = Vol1::from_bytes(&bytes);
    vol1.verify()?;
    Ok(vol1)
}
