//! TMC driver register interface and error types.
//!
//! This module defines:
//! - `TmcDriver` trait - Register access consumed by the autotuner
//! - `FieldDescriptor` - Location and bit layout of one logical field
//! - `DriverError` enum - Error types for register operations
//!
//! Field encoding follows the Trinamic convention: a field is a contiguous
//! bit mask inside a 32-bit register; signed fields are stored
//! two's-complement within the mask.

use thiserror::Error;

/// Error types for driver register operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The driver variant has no such field.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// The driver variant has no such register.
    #[error("Register not found: {0}")]
    RegisterNotFound(String),

    /// Transport-level failure while writing.
    #[error("Driver communication error: {0}")]
    Communication(String),
}

/// Location and bit layout of one named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name (e.g. `"tpwmthrs"`).
    pub field: &'static str,
    /// Backing register name (e.g. `"TPWMTHRS"`).
    pub register: &'static str,
    /// Register address.
    pub address: u8,
    /// Bit mask of the field inside the register.
    pub mask: u32,
    /// Two's-complement field.
    pub signed: bool,
}

impl FieldDescriptor {
    /// Bit position of the field's least significant bit.
    pub fn shift(&self) -> u32 {
        self.mask.trailing_zeros()
    }

    /// Largest raw value the field can hold.
    pub fn max_value(&self) -> u32 {
        self.mask.checked_shr(self.shift()).unwrap_or(0)
    }

    /// Replace this field inside `register_value` with `value`.
    pub fn encode(&self, register_value: u32, value: i64) -> u32 {
        // Truncation to the field width is intended; signed values keep
        // their two's-complement low bits.
        let bits = (value as u32).checked_shl(self.shift()).unwrap_or(0);
        (register_value & !self.mask) | (bits & self.mask)
    }

    /// Extract this field from `register_value`, sign-extending signed fields.
    pub fn decode(&self, register_value: u32) -> i64 {
        let raw = (register_value & self.mask).checked_shr(self.shift()).unwrap_or(0) as i64;
        let width = self.mask.count_ones();
        if self.signed && width > 0 && raw & (1 << (width - 1)) != 0 {
            raw - (1i64 << width)
        } else {
            raw
        }
    }
}

/// Register access of one concrete driver instance.
///
/// A field missing from [`lookup_register`](TmcDriver::lookup_register) is
/// a normal outcome: variants of the family expose different register sets.
pub trait TmcDriver: Send {
    /// Variant identifier (e.g. `"tmc2209"`).
    fn variant(&self) -> &'static str;

    /// Find the register backing `field`, if this variant has it.
    fn lookup_register(&self, field: &str) -> Option<FieldDescriptor>;

    /// Encode `value` into the shadow copy of the field's register and
    /// return the complete new register value.
    ///
    /// # Errors
    /// Returns `DriverError::FieldNotFound` if the variant lacks `field`.
    fn encode_field(&mut self, field: &str, value: i64) -> Result<u32, DriverError>;

    /// Write a complete register value to the chip.
    ///
    /// # Errors
    /// Returns `DriverError::Communication` if the transport fails.
    fn write_register(&mut self, descriptor: &FieldDescriptor, raw: u32) -> Result<(), DriverError>;

    /// Current shadow value of `field`.
    fn get_field(&self, field: &str) -> Option<i64>;

    /// Driver clock frequency (Hz), if known.
    fn clock_frequency(&self) -> Option<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const SGT: FieldDescriptor = FieldDescriptor {
        field: "sgt",
        register: "COOLCONF",
        address: 0x6d,
        mask: 0x7f << 16,
        signed: true,
    };

    const TPWMTHRS: FieldDescriptor = FieldDescriptor {
        field: "tpwmthrs",
        register: "TPWMTHRS",
        address: 0x13,
        mask: 0xfffff,
        signed: false,
    };

    #[test]
    fn test_max_value() {
        assert_eq!(TPWMTHRS.max_value(), 0xfffff);
        assert_eq!(SGT.max_value(), 0x7f);
    }

    #[test]
    fn test_encode_preserves_other_fields() {
        let reg = 0x0000_00ff;
        let encoded = SGT.encode(reg, 5);
        assert_eq!(encoded, 0x0005_00ff);
        assert_eq!(SGT.decode(encoded), 5);
    }

    #[test]
    fn test_signed_round_trip() {
        let encoded = SGT.encode(0, -64);
        assert_eq!(encoded, 0x40 << 16);
        assert_eq!(SGT.decode(encoded), -64);
        assert_eq!(SGT.decode(SGT.encode(0, -1)), -1);
    }

    #[test]
    fn test_encode_truncates_to_width() {
        let encoded = TPWMTHRS.encode(0, 0x1f_ffff);
        assert_eq!(encoded, 0xfffff);
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::FieldNotFound("sg4_thrs".to_string());
        assert!(err.to_string().contains("sg4_thrs"));
    }
}
