//! Cumulative compression counters, one decoding per drive family.
//!
//! All families answer the same question - how many bytes moved between
//! host, drive and medium - but each puts the counters on a different log
//! page with a different scaling:
//!
//! * T10000: sequential-access device page (0Ch), four plain byte counters;
//! * LTO: data compression page (32h), megabyte counters plus signed byte
//!   remainders that have to be added on top;
//! * IBM 3592: block/bytes transferred page (38h), KiB counters.
//!
//! The query itself and the parameter walk are shared; only the mapping
//! from parameter code to field differs. Unknown parameter codes are
//! skipped without comment, the pages carry plenty we do not need.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::scsi::logsense::LogPage;
use crate::scsi::{
    block_bytes_transferred as ibm, data_compression_32h as lto, log_pages,
    sequential_access_page as t10k,
};
use crate::sys::System;

use super::{DriveFamily, TapeDrive};

/// Cumulative byte counters since they were last cleared. `from_host` and
/// `to_tape` describe the write path, `from_tape` and `to_host` the read
/// path; comparing the two sides of each pair gives the compression ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Bytes received from the initiator.
    pub from_host: u64,
    /// Bytes written to the medium.
    pub to_tape: u64,
    /// Bytes read from the medium.
    pub from_tape: u64,
    /// Bytes returned to the initiator.
    pub to_host: u64,
}

impl DriveFamily {
    /// The log page carrying this family's compression counters. Generic
    /// drives get the SSC-standard sequential-access device page.
    pub(crate) fn compression_page(self) -> u8 {
        match self {
            DriveFamily::Generic | DriveFamily::T10000 => log_pages::SEQUENTIAL_ACCESS_DEVICE,
            DriveFamily::Lto => log_pages::DATA_COMPRESSION_32H,
            DriveFamily::Ibm3592 => log_pages::BLOCK_BYTES_TRANSFERRED,
        }
    }
}

impl<S: System> TapeDrive<S> {
    /// Query the drive's cumulative compression counters.
    ///
    /// The counters are produced fresh on every call; clearing them is a
    /// separate operation ([`TapeDrive::clear_compression_stats`]) that
    /// resets the drive's internal log parameters, not this structure.
    pub fn compression_stats(&self) -> Result<CompressionStats> {
        let mut data = [0u8; 1024];
        self.log_sense_page(self.family().compression_page(), &mut data, "compression_stats")?;
        let stats = decode_compression_page(self.family(), &data)?;
        debug!(?stats, family = ?self.family(), "compression counters");
        Ok(stats)
    }
}

/// Decode one family's compression log page.
pub(crate) fn decode_compression_page(
    family: DriveFamily,
    data: &[u8],
) -> Result<CompressionStats> {
    let page = LogPage::parse(data)?;
    let mut stats = CompressionStats::default();
    match family {
        DriveFamily::Generic | DriveFamily::T10000 => {
            for param in page.parameters() {
                match param.code {
                    t10k::RECEIVED_FROM_INITIATOR => stats.from_host = param.u64_value(),
                    t10k::WRITTEN_ON_TAPE => stats.to_tape = param.u64_value(),
                    t10k::READ_FROM_TAPE => stats.from_tape = param.u64_value(),
                    t10k::READ_BY_INITIATOR => stats.to_host = param.u64_value(),
                    _ => {}
                }
            }
        }
        DriveFamily::Lto => {
            // Megabyte counters are powers of ten; the byte parameters are
            // signed remainders on top of them.
            const MB: u64 = 1_000_000;
            for param in page.parameters() {
                match param.code {
                    lto::MB_TRANSFERRED_FROM_SERVER => stats.from_host = param.u64_value() * MB,
                    lto::BYTES_TRANSFERRED_FROM_SERVER => {
                        stats.from_host = stats.from_host.wrapping_add_signed(param.s64_value())
                    }
                    lto::MB_WRITTEN_TO_TAPE => stats.to_tape = param.u64_value() * MB,
                    lto::BYTES_WRITTEN_TO_TAPE => {
                        stats.to_tape = stats.to_tape.wrapping_add_signed(param.s64_value())
                    }
                    lto::MB_READ_FROM_TAPE => stats.from_tape = param.u64_value() * MB,
                    lto::BYTES_READ_FROM_TAPE => {
                        stats.from_tape = stats.from_tape.wrapping_add_signed(param.s64_value())
                    }
                    lto::MB_TRANSFERRED_TO_SERVER => stats.to_host = param.u64_value() * MB,
                    lto::BYTES_TRANSFERRED_TO_SERVER => {
                        stats.to_host = stats.to_host.wrapping_add_signed(param.s64_value())
                    }
                    _ => {}
                }
            }
        }
        DriveFamily::Ibm3592 => {
            // KiB processed counters; shift up to bytes.
            for param in page.parameters() {
                match param.code {
                    ibm::HOST_WRITE_KIB_PROCESSED => stats.from_host = param.u64_value() << 10,
                    ibm::DEVICE_WRITE_KIB_PROCESSED => stats.to_tape = param.u64_value() << 10,
                    ibm::DEVICE_READ_KIB_PROCESSED => stats.from_tape = param.u64_value() << 10,
                    ibm::HOST_READ_KIB_PROCESSED => stats.to_host = param.u64_value() << 10,
                    _ => {}
                }
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::fake_device_info;
    use crate::scsi::logsense::LogPageBuilder;
    use crate::sys::fake::FakeSystem;

    fn be8(v: u64) -> [u8; 8] {
        v.to_be_bytes()
    }

    fn be4(v: u32) -> [u8; 4] {
        v.to_be_bytes()
    }

    #[test]
    fn t10000_counters_are_plain_bytes() {
        let page = LogPageBuilder::new(0x0C)
            .parameter(t10k::RECEIVED_FROM_INITIATOR, &be8(1_000))
            .parameter(t10k::WRITTEN_ON_TAPE, &be8(800))
            .parameter(t10k::READ_FROM_TAPE, &be8(600))
            .parameter(t10k::READ_BY_INITIATOR, &be8(750))
            .parameter(0x0100, &be8(0)) // cleaning, skipped
            .build();
        let stats = decode_compression_page(DriveFamily::T10000, &page).unwrap();
        assert_eq!(
            stats,
            CompressionStats { from_host: 1_000, to_tape: 800, from_tape: 600, to_host: 750 }
        );
    }

    #[test]
    fn lto_counters_combine_megabytes_and_signed_remainders() {
        let page = LogPageBuilder::new(0x32)
            .parameter(lto::MB_TRANSFERRED_FROM_SERVER, &be4(3))
            .parameter(lto::BYTES_TRANSFERRED_FROM_SERVER, &be4(0x0000_0200))
            .parameter(lto::MB_WRITTEN_TO_TAPE, &be4(2))
            // Negative remainder: the MB counter was rounded up.
            .parameter(lto::BYTES_WRITTEN_TO_TAPE, &(-512i32).to_be_bytes())
            .parameter(lto::MB_READ_FROM_TAPE, &be4(0))
            .parameter(lto::BYTES_READ_FROM_TAPE, &be4(100))
            .parameter(lto::MB_TRANSFERRED_TO_SERVER, &be4(0))
            .parameter(lto::BYTES_TRANSFERRED_TO_SERVER, &be4(100))
            .build();
        let stats = decode_compression_page(DriveFamily::Lto, &page).unwrap();
        assert_eq!(stats.from_host, 3_000_512);
        assert_eq!(stats.to_tape, 1_999_488);
        assert_eq!(stats.from_tape, 100);
        assert_eq!(stats.to_host, 100);
    }

    #[test]
    fn ibm3592_counters_scale_from_kib() {
        let page = LogPageBuilder::new(0x38)
            .parameter(ibm::HOST_WRITE_KIB_PROCESSED, &be4(4))
            .parameter(ibm::DEVICE_WRITE_KIB_PROCESSED, &be4(3))
            .parameter(ibm::DEVICE_READ_KIB_PROCESSED, &be4(2))
            .parameter(ibm::HOST_READ_KIB_PROCESSED, &be4(1))
            .parameter(0x000C, &be4(999)) // partition capacity, skipped
            .build();
        let stats = decode_compression_page(DriveFamily::Ibm3592, &page).unwrap();
        assert_eq!(
            stats,
            CompressionStats {
                from_host: 4 << 10,
                to_tape: 3 << 10,
                from_tape: 2 << 10,
                to_host: 1 << 10,
            }
        );
    }

    #[test]
    fn query_clear_query_returns_zeroed_counters() {
        for product in ["T10000C", "ULT3580-TD5", "03592E08", "GENERIC"] {
            let sys = FakeSystem::with_product(product);
            sys.set_compression_counters(2_048_000, 1_024_000, 512_000, 256_000);
            let drive = crate::device::TapeDrive::open_with(sys, fake_device_info()).unwrap();

            let before = drive.compression_stats().unwrap();
            assert_eq!(before.from_host, 2_048_000, "{product}");
            assert_eq!(before.to_tape, 1_024_000, "{product}");
            assert_eq!(before.from_tape, 512_000, "{product}");
            assert_eq!(before.to_host, 256_000, "{product}");

            drive.clear_compression_stats().unwrap();
            let after = drive.compression_stats().unwrap();
            assert_eq!(after, CompressionStats::default(), "{product}");
        }
    }
}
