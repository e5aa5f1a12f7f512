//! APDU (Application Protocol Data Unit) command and response types.
//!
//! Ledger apps speak ISO 7816-4 APDUs over whatever transport carries them.
//!
//! # APDU Command Structure
//!
//! ```text
//! | CLA | INS | P1 | P2 | Lc | Data |
//! |-----|-----|----|----|----|------|
//! | 1B  | 1B  | 1B | 1B | 1B | Var  |
//! ```
//!
//! - **CLA**: Class byte (identifies the app)
//! - **INS**: Instruction byte
//! - **P1, P2**: Parameter bytes (chunk markers, display flags)
//! - **Lc**: Length of command data; always present, `0x00` for no data
//!
//! # APDU Response Structure
//!
//! ```text
//! | Data | SW1 | SW2 |
//! |------|-----|-----|
//! | Var  | 1B  | 1B  |
//! ```
//!
//! The two-byte status word is `0x9000` on success; anything else is a
//! failure the caller maps into the library's error taxonomy.
//!
//! # Example
//!
//! ```
//! use ic_identity_ledger::apdu::{Apdu, ApduResponse};
//!
//! let apdu = Apdu::new(0x11, 0x00, 0x00, 0x00, vec![]);
//! assert_eq!(apdu.to_bytes(), vec![0x11, 0x00, 0x00, 0x00, 0x00]);
//!
//! let response = ApduResponse::new(vec![0x01, 0x90, 0x00]);
//! assert!(response.is_success());
//! ```

use crate::error::{Error, Result};

/// Well-known Ledger status words.
pub mod sw {
    /// Success.
    pub const OK: u16 = 0x9000;

    /// Execution error inside the app.
    pub const EXECUTION_ERROR: u16 = 0x6400;

    /// Wrong command data length.
    pub const WRONG_LENGTH: u16 = 0x6700;

    /// The app has no data buffered for this command.
    pub const EMPTY_BUFFER: u16 = 0x6982;

    /// The response does not fit the output buffer.
    pub const OUTPUT_BUFFER_TOO_SMALL: u16 = 0x6983;

    /// The command data failed the app's validation.
    pub const DATA_INVALID: u16 = 0x6984;

    /// The user rejected the operation on the device.
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;

    /// The command is not allowed in the app's current state.
    pub const COMMAND_NOT_ALLOWED: u16 = 0x6986;

    /// Invalid P1 or P2 parameter.
    pub const INVALID_P1_P2: u16 = 0x6b00;

    /// The instruction byte is not supported.
    pub const INS_NOT_SUPPORTED: u16 = 0x6d00;

    /// The class byte is not supported; usually the app is not open.
    pub const CLA_NOT_SUPPORTED: u16 = 0x6e00;

    /// Unspecified failure.
    pub const UNKNOWN: u16 = 0x6f00;
}

/// Describes a status word for error reporting.
#[must_use]
pub const fn describe(status_word: u16) -> &'static str {
    match status_word {
        sw::OK => "success",
        sw::EXECUTION_ERROR => "execution error",
        sw::WRONG_LENGTH => "wrong length",
        sw::EMPTY_BUFFER => "empty buffer",
        sw::OUTPUT_BUFFER_TOO_SMALL => "output buffer too small",
        sw::DATA_INVALID => "data is invalid",
        sw::CONDITIONS_NOT_SATISFIED => "conditions not satisfied (user declined on device)",
        sw::COMMAND_NOT_ALLOWED => "command not allowed",
        sw::INVALID_P1_P2 => "invalid P1 or P2",
        sw::INS_NOT_SUPPORTED => "instruction not supported",
        sw::CLA_NOT_SUPPORTED => "class not supported (is the app open?)",
        sw::UNKNOWN => "unknown error",
        _ => "unexpected status word",
    }
}

/// An APDU command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apdu {
    /// Class byte.
    cla: u8,

    /// Instruction byte.
    ins: u8,

    /// Parameter 1.
    p1: u8,

    /// Parameter 2.
    p2: u8,

    /// Command data.
    data: Vec<u8>,
}

impl Apdu {
    /// Maximum short APDU data length.
    pub const MAX_DATA: usize = 255;

    /// Creates a new APDU command.
    ///
    /// # Panics
    ///
    /// Panics if `data` exceeds [`Self::MAX_DATA`] bytes; callers chunk
    /// larger payloads across commands.
    #[must_use]
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        assert!(data.len() <= Self::MAX_DATA, "APDU data exceeds 255 bytes");
        Self {
            cla,
            ins,
            p1,
            p2,
            data,
        }
    }

    /// Returns the class byte.
    #[must_use]
    pub const fn cla(&self) -> u8 {
        self.cla
    }

    /// Returns the instruction byte.
    #[must_use]
    pub const fn ins(&self) -> u8 {
        self.ins
    }

    /// Returns parameter 1.
    #[must_use]
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Returns parameter 2.
    #[must_use]
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Returns the command data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Serializes the APDU to bytes: header, Lc, data.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(5 + self.data.len());
        bytes.push(self.cla);
        bytes.push(self.ins);
        bytes.push(self.p1);
        bytes.push(self.p2);
        bytes.push(self.data.len() as u8);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// An APDU response from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data.
    data: Vec<u8>,

    /// Status word 1.
    sw1: u8,

    /// Status word 2.
    sw2: u8,
}

impl ApduResponse {
    /// Creates a response from raw bytes (data followed by SW1, SW2).
    ///
    /// # Panics
    ///
    /// Panics if the response is less than 2 bytes; transports validate the
    /// length before constructing a response.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        assert!(bytes.len() >= 2, "APDU response must be at least 2 bytes");

        let len = bytes.len();
        let sw1 = bytes[len - 2];
        let sw2 = bytes[len - 1];
        let mut data = bytes;
        data.truncate(len - 2);

        Self { data, sw1, sw2 }
    }

    /// Returns the response data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the response and returns the data.
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the full status word.
    #[must_use]
    pub const fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Checks if the response indicates success (`SW = 0x9000`).
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_word() == sw::OK
    }

    /// Describes the status word for error reporting.
    #[must_use]
    pub const fn error_description(&self) -> &'static str {
        describe(self.status_word())
    }

    /// Checks the status word and maps failures into the error taxonomy.
    ///
    /// # Errors
    ///
    /// - [`Error::UserRejected`] for `0x6985`
    /// - [`Error::DeviceCommunication`] for any other failure status
    pub fn check(&self) -> Result<()> {
        match self.status_word() {
            sw::OK => Ok(()),
            sw::CONDITIONS_NOT_SATISFIED => Err(Error::UserRejected),
            code => Err(Error::DeviceCommunication {
                code,
                message: describe(code).to_string(),
            }),
        }
    }
}
