//! USB HID transport for physical Ledger devices.
//!
//! Ledger devices expose a HID interface carrying APDUs in 64-byte
//! reports. Each report starts with a five-byte header of channel (2),
//! tag (1) and sequence number (2), and the first report of a message
//! additionally carries the total payload length as a big-endian `u16`.
//! Responses are reassembled from the same framing.
//!
//! Reads block until the device answers, which for signing means until the
//! user acts on the device; the timeout below is deliberately generous.
//!
//! # Example
//!
//! ```ignore
//! use ic_identity_ledger::{DerivationPath, HidTransport, LedgerIdentity};
//!
//! let transport = HidTransport::open()?;
//! let identity =
//!     LedgerIdentity::create(Box::new(transport), DerivationPath::default()).await?;
//! ```

use core::fmt;

use byteorder::{BigEndian, ByteOrder};
use hidapi::{HidApi, HidDevice};

use async_trait::async_trait;

use crate::apdu::{Apdu, ApduResponse};
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Ledger USB vendor ID.
const LEDGER_VENDOR_ID: u16 = 0x2c97;

/// HID usage page of the Ledger APDU interface.
const LEDGER_USAGE_PAGE: u16 = 0xFFA0;

/// Communication channel identifier.
const CHANNEL: u16 = 0x0101;

/// Report tag for APDU traffic.
const TAG_APDU: u8 = 0x05;

/// HID report size in bytes.
const REPORT_SIZE: usize = 64;

/// Bytes of each report taken by the channel/tag/sequence header.
const HEADER_LEN: usize = 5;

/// Read timeout per report. Signing waits on a human pressing a button,
/// so this is minutes, not milliseconds.
const READ_TIMEOUT_MS: i32 = 300_000;

/// A USB HID transport to a Ledger device.
pub struct HidTransport {
    /// The open HID device handle.
    device: HidDevice,
}

impl fmt::Debug for HidTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HidTransport").finish_non_exhaustive()
    }
}

impl HidTransport {
    /// Opens the first connected Ledger device.
    ///
    /// # Errors
    ///
    /// - [`Error::DeviceNotFound`] if no Ledger is plugged in
    /// - [`Error::ConnectionFailed`] if the HID backend fails or the
    ///   device cannot be opened (commonly a permissions problem)
    pub fn open() -> Result<Self> {
        let api = HidApi::new().map_err(|e| {
            Error::ConnectionFailed(format!("failed to initialize HID backend: {e}"))
        })?;

        let info = api
            .device_list()
            .filter(|d| d.vendor_id() == LEDGER_VENDOR_ID)
            .find(|d| d.usage_page() == LEDGER_USAGE_PAGE || d.interface_number() == 0)
            .ok_or(Error::DeviceNotFound)?;

        let device = info
            .open_device(&api)
            .map_err(|e| Error::ConnectionFailed(format!("failed to open Ledger device: {e}")))?;

        tracing::debug!(
            target: "icp::ledger",
            product = info.product_string().unwrap_or("unknown"),
            "opened HID transport"
        );

        Ok(Self { device })
    }

    /// Lists connected Ledger devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionFailed`] if the HID backend cannot be
    /// initialized.
    pub fn list_devices() -> Result<Vec<String>> {
        let api = HidApi::new().map_err(|e| {
            Error::ConnectionFailed(format!("failed to initialize HID backend: {e}"))
        })?;

        Ok(api
            .device_list()
            .filter(|d| d.vendor_id() == LEDGER_VENDOR_ID)
            .map(|d| {
                format!(
                    "{} {}",
                    d.manufacturer_string().unwrap_or("Ledger"),
                    d.product_string().unwrap_or("device"),
                )
            })
            .collect())
    }
}

#[async_trait]
impl Transport for HidTransport {
    async fn exchange(&mut self, apdu: &Apdu) -> Result<ApduResponse> {
        let command = apdu.to_bytes();

        for report in frame_reports(&command) {
            // hidapi expects a leading report ID byte.
            let mut buf = [0u8; REPORT_SIZE + 1];
            buf[1..].copy_from_slice(&report);
            self.device
                .write(&buf)
                .map_err(|e| Error::Transport(format!("HID write failed: {e}")))?;
        }

        let mut assembler = ReportAssembler::new();
        while !assembler.is_complete() {
            let mut report = [0u8; REPORT_SIZE];
            let read = self
                .device
                .read_timeout(&mut report, READ_TIMEOUT_MS)
                .map_err(|e| Error::Transport(format!("HID read failed: {e}")))?;

            if read == 0 {
                return Err(Error::Transport(
                    "timed out waiting for device response".to_string(),
                ));
            }

            assembler.push(&report[..read])?;
        }

        let payload = assembler.into_payload();
        if payload.len() < 2 {
            return Err(Error::MalformedResponse(
                "response shorter than a status word".to_string(),
            ));
        }

        Ok(ApduResponse::new(payload))
    }
}

/// Splits an APDU into framed 64-byte HID reports.
fn frame_reports(payload: &[u8]) -> Vec<[u8; REPORT_SIZE]> {
    // The framed message is the payload preceded by its length.
    let mut message = Vec::with_capacity(2 + payload.len());
    let mut length = [0u8; 2];
    BigEndian::write_u16(&mut length, payload.len() as u16);
    message.extend_from_slice(&length);
    message.extend_from_slice(payload);

    let mut reports = Vec::new();
    for (sequence, part) in message.chunks(REPORT_SIZE - HEADER_LEN).enumerate() {
        let mut report = [0u8; REPORT_SIZE];
        BigEndian::write_u16(&mut report[0..2], CHANNEL);
        report[2] = TAG_APDU;
        BigEndian::write_u16(&mut report[3..5], sequence as u16);
        report[HEADER_LEN..HEADER_LEN + part.len()].copy_from_slice(part);
        reports.push(report);
    }
    reports
}

/// Reassembles a framed response from a sequence of HID reports.
struct ReportAssembler {
    expected_len: Option<usize>,
    buffer: Vec<u8>,
    next_sequence: u16,
}

impl ReportAssembler {
    const fn new() -> Self {
        Self {
            expected_len: None,
            buffer: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Consumes one report, validating its header.
    fn push(&mut self, report: &[u8]) -> Result<()> {
        let header_len = if self.next_sequence == 0 {
            HEADER_LEN + 2
        } else {
            HEADER_LEN
        };
        if report.len() < header_len {
            return Err(Error::MalformedResponse("HID report too short".to_string()));
        }

        if BigEndian::read_u16(&report[0..2]) != CHANNEL {
            return Err(Error::MalformedResponse(
                "HID report on unexpected channel".to_string(),
            ));
        }
        if report[2] != TAG_APDU {
            return Err(Error::MalformedResponse(
                "HID report with unexpected tag".to_string(),
            ));
        }

        let sequence = BigEndian::read_u16(&report[3..5]);
        if sequence != self.next_sequence {
            return Err(Error::MalformedResponse(format!(
                "HID report out of order: expected {}, got {sequence}",
                self.next_sequence
            )));
        }

        if sequence == 0 {
            self.expected_len = Some(BigEndian::read_u16(&report[5..7]) as usize);
            self.buffer.extend_from_slice(&report[7..]);
        } else {
            self.buffer.extend_from_slice(&report[HEADER_LEN..]);
        }

        self.next_sequence += 1;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.expected_len
            .is_some_and(|len| self.buffer.len() >= len)
    }

    /// Returns the reassembled payload, trimmed of report padding.
    fn into_payload(mut self) -> Vec<u8> {
        if let Some(len) = self.expected_len {
            self.buffer.truncate(len);
        }
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_single_report() {
        let reports = frame_reports(&[0x11, 0x00, 0x00, 0x00, 0x00]);

        assert_eq!(reports.len(), 1);
        let report = reports[0];
        assert_eq!(&report[0..2], &[0x01, 0x01]); // channel
        assert_eq!(report[2], TAG_APDU);
        assert_eq!(&report[3..5], &[0x00, 0x00]); // sequence 0
        assert_eq!(&report[5..7], &[0x00, 0x05]); // payload length
        assert_eq!(&report[7..12], &[0x11, 0x00, 0x00, 0x00, 0x00]);
        assert!(report[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn frame_spans_reports_at_57_bytes() {
        // First report holds 59 message bytes = 2 length bytes + 57 payload
        // bytes, so 58 payload bytes need a second report.
        assert_eq!(frame_reports(&vec![0u8; 57]).len(), 1);

        let reports = frame_reports(&vec![0xEEu8; 58]);
        assert_eq!(reports.len(), 2);
        assert_eq!(&reports[1][3..5], &[0x00, 0x01]); // sequence 1
        assert_eq!(reports[1][5], 0xEE);
    }

    #[test]
    fn assembler_round_trips_framing() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(300).collect();

        let mut assembler = ReportAssembler::new();
        for report in frame_reports(&payload) {
            assert!(!assembler.is_complete());
            assembler.push(&report).unwrap();
        }

        assert!(assembler.is_complete());
        assert_eq!(assembler.into_payload(), payload);
    }

    #[test]
    fn assembler_rejects_wrong_channel() {
        let mut report = frame_reports(&[0x90, 0x00])[0];
        report[0] = 0xFF;

        let mut assembler = ReportAssembler::new();
        let err = assembler.push(&report).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[test]
    fn assembler_rejects_out_of_order_sequence() {
        let payload = vec![0u8; 120]; // two reports
        let reports = frame_reports(&payload);

        let mut assembler = ReportAssembler::new();
        let err = assembler.push(&reports[1]).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }
}
