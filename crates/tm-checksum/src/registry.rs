use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::algorithms::{Checksum, Crc8, Crc16CcittFalse, Crc16Modbus, Crc32, Fletcher16, NoChecksum, Sum8, Xor8};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChecksumError {
    #[error("unknown checksum name: {0}")]
    UnknownName(String),
}

static REGISTRY: Lazy<HashMap<&'static str, &'static dyn Checksum>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static dyn Checksum> = HashMap::new();
    m.insert("none", &NoChecksum);
    m.insert("crc-8", &Crc8);
    m.insert("crc-16/ccitt-false", &Crc16CcittFalse);
    m.insert("crc-16/modbus", &Crc16Modbus);
    m.insert("crc-32", &Crc32);
    m.insert("xor-8", &Xor8);
    m.insert("sum-8", &Sum8);
    m.insert("fletcher-16", &Fletcher16);
    m
});

/// Looks up a checksum algorithm by name, case-insensitively.
pub fn lookup(name: &str) -> Result<&'static dyn Checksum, ChecksumError> {
    REGISTRY
        .get(name.to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| ChecksumError::UnknownName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert!(lookup("CRC-32").is_ok());
        assert!(lookup("crc-32").is_ok());
        assert!(lookup("Crc-32").is_ok());
    }

    #[test]
    fn unknown_name_errors() {
        assert!(matches!(lookup("crc-99"), Err(ChecksumError::UnknownName(_))));
    }

    #[test]
    fn none_digest_len_is_zero() {
        assert_eq!(lookup("none").unwrap().digest_len(), 0);
    }
}
