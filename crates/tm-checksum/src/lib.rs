mod algorithms;
mod registry;

pub use algorithms::{Checksum, Crc8, Crc16CcittFalse, Crc16Modbus, Crc32, Fletcher16, NoChecksum, Sum8, Xor8};
pub use registry::{ChecksumError, lookup};
