//! Trap cause shadow registers in their CLIC layout.

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::{PrivilegeLevel, RawPrivilegeLevel};

/// Bit set in a cause value when the trap is an interrupt rather than a
/// synchronous exception.
pub const INTERRUPT_BIT: u32 = 0x8000_0000;

/// Width mask of the exception-code field.
pub const EXCCODE_MASK: u32 = 0x0000_0FFF;

/// Trap cause register (mcause, scause, ucause) with the CLIC field layout.
///
/// On top of the interrupt bit and the exception code, the CLIC variant of the
/// cause register banks part of the preempted context:
///
/// | bits    | field                                         |
/// |---------|-----------------------------------------------|
/// | 31      | interrupt                                     |
/// | 30      | inhv (vectored-fetch in progress)             |
/// | 29..28  | previous privilege (M; one bit used for S)    |
/// | 27      | previous interrupt enable                     |
/// | 23..16  | previous interrupt level                      |
/// | 11..0   | exception code                                |
#[derive(Debug, Clone)]
pub struct Cause(u32);

/// Bit indices into a CLIC-layout cause register.
mod idx {
    pub const EXCCODE: usize = 0; // 12 bits
    pub const PIL: usize = 16; // 8 bits
    pub const PIE: usize = 27;
    pub const PP: usize = 28; // 2 bits
    #[allow(dead_code)]
    pub const INHV: usize = 30;
    pub const INTERRUPT: usize = 31;
}

impl Default for Cause {
    fn default() -> Self {
        Self::new()
    }
}

impl Cause {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = self.0 & !mask | value & mask;
    }

    /// Returns `true` if the recorded cause is an interrupt.
    pub fn is_interrupt(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::INTERRUPT]
    }

    pub fn set_interrupt(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::INTERRUPT, value);
    }

    /// Returns the exception code; for CLIC interrupts this is the interrupt
    /// id.
    pub fn code(&self) -> u16 {
        self.0.view_bits::<Lsb0>()[idx::EXCCODE..idx::EXCCODE + 12].load_le()
    }

    pub fn set_code(&mut self, code: u16) {
        self.0.view_bits_mut::<Lsb0>()[idx::EXCCODE..idx::EXCCODE + 12].store_le(code);
    }

    /// Returns the previous interrupt level (xpil) field.
    pub fn previous_level(&self) -> u8 {
        self.0.view_bits::<Lsb0>()[idx::PIL..idx::PIL + 8].load_le()
    }

    pub fn set_previous_level(&mut self, level: u8) {
        self.0.view_bits_mut::<Lsb0>()[idx::PIL..idx::PIL + 8].store_le(level);
    }

    /// Returns the previous interrupt-enable (xpie) bit.
    pub fn previous_ie(&self) -> bool {
        self.0.view_bits::<Lsb0>()[idx::PIE]
    }

    pub fn set_previous_ie(&mut self, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(idx::PIE, value);
    }

    /// Returns the previous privilege (xpp) field.
    pub fn previous_privilege(&self) -> RawPrivilegeLevel {
        RawPrivilegeLevel::from_u2(self.0.view_bits::<Lsb0>()[idx::PP..idx::PP + 2].load_le())
    }

    pub fn set_previous_privilege(&mut self, level: PrivilegeLevel) {
        self.0.view_bits_mut::<Lsb0>()[idx::PP..idx::PP + 2].store_le(level as u8);
    }
}
