//! Static register tables.
//!
//! Each driver variant describes its registers as a slice of
//! [`RegisterSpec`]; only the fields the autotuner reads or writes are
//! listed, plus a few needed for driver initialization.

use autotune_common::driver::FieldDescriptor;
use std::collections::HashMap;

/// One field inside a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Bit mask inside the register.
    pub mask: u32,
    /// Two's-complement field.
    pub signed: bool,
}

/// Unsigned field.
pub const fn field(name: &'static str, mask: u32) -> FieldSpec {
    FieldSpec { name, mask, signed: false }
}

/// Signed (two's-complement) field.
pub const fn signed(name: &'static str, mask: u32) -> FieldSpec {
    FieldSpec { name, mask, signed: true }
}

/// One register with its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSpec {
    /// Register name.
    pub name: &'static str,
    /// Register address.
    pub address: u8,
    /// Fields of this register.
    pub fields: &'static [FieldSpec],
}

/// Field lookup index built from a register table.
#[derive(Debug, Clone)]
pub struct FieldIndex {
    fields: HashMap<&'static str, FieldDescriptor>,
}

impl FieldIndex {
    /// Index every field of `registers`.
    pub fn new(registers: &'static [RegisterSpec]) -> Self {
        let fields = registers
            .iter()
            .flat_map(|reg| {
                reg.fields.iter().map(move |f| {
                    (
                        f.name,
                        FieldDescriptor {
                            field: f.name,
                            register: reg.name,
                            address: reg.address,
                            mask: f.mask,
                            signed: f.signed,
                        },
                    )
                })
            })
            .collect();
        Self { fields }
    }

    /// Descriptor of `field`, if present.
    pub fn get(&self, field: &str) -> Option<FieldDescriptor> {
        self.fields.get(field).copied()
    }
}
