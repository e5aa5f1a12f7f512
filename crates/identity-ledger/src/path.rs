//! BIP44 derivation paths for the Internet Computer Ledger app.
//!
//! The Internet Computer registers coin type `223`, so keys live under
//! `m/44'/223'/account'/change/index`. The device expects exactly five
//! components, the first three hardened, serialized as little-endian `u32`s
//! with the hardened bit (`0x8000_0000`) applied.
//!
//! # Example
//!
//! ```
//! use ic_identity_ledger::DerivationPath;
//!
//! let path = DerivationPath::default();
//! assert_eq!(path.to_string(), "m/44'/223'/0'/0/0");
//! assert_eq!(path.serialize().len(), 20);
//! ```

use core::fmt;
use core::str::FromStr;

use byteorder::{LittleEndian, WriteBytesExt};

use crate::error::{Error, Result};

/// The hardened-derivation marker bit.
const HARDENED: u32 = 0x8000_0000;

/// A five-component BIP44 derivation path.
///
/// Fixed at identity construction and never mutated afterwards. The device
/// derives a fresh key pair from it on every request; nothing is cached
/// across processes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    /// Components with the hardened bit already applied.
    components: [u32; Self::COMPONENTS],
}

impl DerivationPath {
    /// Number of path components the device expects.
    pub const COMPONENTS: usize = 5;

    /// The default derivation path, `m/44'/223'/0'/0/0`.
    pub const DEFAULT_PATH: &'static str = "m/44'/223'/0'/0/0";

    /// Serialized length in bytes.
    pub const SERIALIZED_LEN: usize = Self::COMPONENTS * 4;

    /// Parses a path from its textual form.
    ///
    /// # Arguments
    ///
    /// * `path` - A string such as `m/44'/223'/0'/0/0`; `h` is accepted as
    ///   an alternative hardened marker
    ///
    /// # Returns
    ///
    /// A [`Result`] containing the parsed path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDerivationPath`] if the path does not have
    /// exactly five components, a component is out of range, or one of the
    /// first three components is not hardened.
    ///
    /// # Example
    ///
    /// ```
    /// use ic_identity_ledger::DerivationPath;
    ///
    /// let path = DerivationPath::parse("m/44'/223'/1'/0/7").unwrap();
    /// assert_eq!(path.to_string(), "m/44'/223'/1'/0/7");
    /// ```
    pub fn parse(path: &str) -> Result<Self> {
        let mut parts = path.split('/');

        if parts.next() != Some("m") {
            return Err(Error::InvalidDerivationPath(format!(
                "path must start with 'm/': {path}"
            )));
        }

        let mut components = [0u32; Self::COMPONENTS];
        let mut count = 0;

        for part in parts {
            if count == Self::COMPONENTS {
                return Err(Error::InvalidDerivationPath(format!(
                    "expected {} components: {path}",
                    Self::COMPONENTS
                )));
            }

            let (digits, hardened) = match part.strip_suffix('\'').or_else(|| part.strip_suffix('h'))
            {
                Some(digits) => (digits, true),
                None => (part, false),
            };

            let value: u32 = digits.parse().map_err(|_| {
                Error::InvalidDerivationPath(format!("invalid component '{part}': {path}"))
            })?;

            if value >= HARDENED {
                return Err(Error::InvalidDerivationPath(format!(
                    "component '{part}' out of range: {path}"
                )));
            }

            components[count] = if hardened { value | HARDENED } else { value };
            count += 1;
        }

        if count != Self::COMPONENTS {
            return Err(Error::InvalidDerivationPath(format!(
                "expected {} components, got {count}: {path}",
                Self::COMPONENTS
            )));
        }

        // The device only derives below hardened purpose/coin/account nodes.
        for component in &components[..3] {
            if component & HARDENED == 0 {
                return Err(Error::InvalidDerivationPath(format!(
                    "purpose, coin type and account must be hardened: {path}"
                )));
            }
        }

        Ok(Self { components })
    }

    /// Returns the components with the hardened bit applied.
    #[must_use]
    pub const fn components(&self) -> &[u32; Self::COMPONENTS] {
        &self.components
    }

    /// Serializes the path in the format the device app expects.
    ///
    /// # Returns
    ///
    /// Twenty bytes: five little-endian `u32`s with the hardened bit set on
    /// hardened components.
    ///
    /// # Example
    ///
    /// ```
    /// use ic_identity_ledger::DerivationPath;
    ///
    /// let bytes = DerivationPath::default().serialize();
    /// assert_eq!(hex::encode(&bytes[..4]), "2c000080");
    /// ```
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SERIALIZED_LEN);
        for component in self.components {
            // Writing to a Vec cannot fail.
            out.write_u32::<LittleEndian>(component).unwrap();
        }
        out
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        // The constant is a valid path, so this cannot fail.
        Self::parse(Self::DEFAULT_PATH).unwrap()
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for component in self.components {
            let index = component & !HARDENED;
            let marker = if component & HARDENED != 0 { "'" } else { "" };
            write!(f, "/{index}{marker}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_default_path() {
        let path = DerivationPath::parse("m/44'/223'/0'/0/0").unwrap();
        assert_eq!(
            path.components(),
            &[44 | HARDENED, 223 | HARDENED, HARDENED, 0, 0]
        );
    }

    #[test]
    fn default_matches_constant() {
        assert_eq!(
            DerivationPath::default(),
            DerivationPath::parse(DerivationPath::DEFAULT_PATH).unwrap()
        );
    }

    #[test]
    fn serialize_little_endian() {
        let path = DerivationPath::default();
        let serialized = path.serialize();
        assert_eq!(serialized.len(), DerivationPath::SERIALIZED_LEN);
        assert_eq!(
            hex::encode(&serialized),
            "2c000080df000080000000800000000000000000"
        );
    }

    #[test]
    fn serialize_nontrivial_indices() {
        let path = DerivationPath::parse("m/44'/223'/2'/1/7").unwrap();
        assert_eq!(
            hex::encode(path.serialize()),
            "2c000080df000080020000800100000007000000"
        );
    }

    #[test]
    fn display_round_trip() {
        let text = "m/44'/223'/3'/1/9";
        let path = DerivationPath::parse(text).unwrap();
        assert_eq!(path.to_string(), text);
        assert_eq!(text.parse::<DerivationPath>().unwrap(), path);
    }

    #[test]
    fn hardened_h_suffix() {
        let path = DerivationPath::parse("m/44h/223h/0h/0/0").unwrap();
        assert_eq!(path, DerivationPath::default());
    }

    #[test]
    fn reject_missing_prefix() {
        let result = DerivationPath::parse("44'/223'/0'/0/0");
        assert!(matches!(result, Err(Error::InvalidDerivationPath(_))));
    }

    #[test]
    fn reject_wrong_component_count() {
        assert!(DerivationPath::parse("m/44'/223'/0'/0").is_err());
        assert!(DerivationPath::parse("m/44'/223'/0'/0/0/0").is_err());
    }

    #[test]
    fn reject_soft_account() {
        let result = DerivationPath::parse("m/44'/223'/0/0/0");
        assert!(matches!(result, Err(Error::InvalidDerivationPath(_))));
    }

    #[test]
    fn reject_out_of_range_component() {
        let result = DerivationPath::parse("m/44'/223'/2147483648'/0/0");
        assert!(matches!(result, Err(Error::InvalidDerivationPath(_))));
    }
}
