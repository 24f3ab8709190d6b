//! Status, interrupt-status, and interrupt-threshold shadow registers.

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::PrivilegeLevel;

// Masks limiting which status bits are reachable through the restricted
// S-mode and U-mode views of the register.
const SSTATUS_MASK: u32 = 0b1_0011_0011;
const USTATUS_MASK: u32 = 0b0_0001_0001;

/// The interrupt-enable portion of the hart's status register (mstatus with
/// its sstatus/ustatus views), as consumed and produced by trap delivery.
///
/// Only the per-mode current/previous interrupt-enable bits and the previous
/// privilege fields are modeled; the remaining mstatus state belongs to the
/// execution core.
#[derive(Debug, Clone)]
pub struct Status(u32);

/// Bit indices into the status register.
mod idx {
    pub const UIE: usize = 0;
    pub const SIE: usize = 1;
    pub const MIE: usize = 3;
    pub const UPIE: usize = 4;
    pub const SPIE: usize = 5;
    pub const MPIE: usize = 7;
    pub const SPP: usize = 8;
    pub const MPP: usize = 11; // 2 bits
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}

impl Status {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = self.0 & !mask | value & mask;
    }

    /// Returns the global interrupt-enable bit of `mode` (MIE/SIE/UIE).
    pub fn ie(&self, mode: PrivilegeLevel) -> bool {
        self.0.view_bits::<Lsb0>()[ie_idx(mode)]
    }

    pub fn set_ie(&mut self, mode: PrivilegeLevel, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(ie_idx(mode), value);
    }

    /// Returns the previous interrupt-enable bit of `mode` (MPIE/SPIE/UPIE).
    pub fn previous_ie(&self, mode: PrivilegeLevel) -> bool {
        self.0.view_bits::<Lsb0>()[pie_idx(mode)]
    }

    pub fn set_previous_ie(&mut self, mode: PrivilegeLevel, value: bool) {
        self.0.view_bits_mut::<Lsb0>().set(pie_idx(mode), value);
    }

    /// Returns the privilege level encoded by the MPP field.
    pub fn mpp(&self) -> u8 {
        self.0.view_bits::<Lsb0>()[idx::MPP..idx::MPP + 2].load_le()
    }

    pub fn set_mpp(&mut self, value: PrivilegeLevel) {
        self.0.view_bits_mut::<Lsb0>()[idx::MPP..idx::MPP + 2].store_le(value as u8);
    }

    /// Returns the privilege level encoded by the SPP field.
    pub fn spp(&self) -> u8 {
        self.0.view_bits::<Lsb0>()[idx::SPP] as u8
    }

    pub fn set_spp(&mut self, value: PrivilegeLevel) {
        // SPP is a single bit; only U and S can be banked here.
        self.0
            .view_bits_mut::<Lsb0>()
            .set(idx::SPP, value == PrivilegeLevel::Supervisor);
    }

    /// ORs `value`'s low five bits into `mode`'s view of the status register.
    ///
    /// This is the set-bits side effect of a fast-redispatch CSR write; bits
    /// outside the mode's restricted view are dropped.
    pub fn or_low_bits(&mut self, mode: PrivilegeLevel, value: u32) {
        let mask = match mode {
            PrivilegeLevel::Machine => 0x1F,
            PrivilegeLevel::Supervisor => 0x1F & SSTATUS_MASK,
            PrivilegeLevel::User => 0x1F & USTATUS_MASK,
        };
        self.0 |= value & mask;
    }
}

fn ie_idx(mode: PrivilegeLevel) -> usize {
    match mode {
        PrivilegeLevel::User => idx::UIE,
        PrivilegeLevel::Supervisor => idx::SIE,
        PrivilegeLevel::Machine => idx::MIE,
    }
}

fn pie_idx(mode: PrivilegeLevel) -> usize {
    match mode {
        PrivilegeLevel::User => idx::UPIE,
        PrivilegeLevel::Supervisor => idx::SPIE,
        PrivilegeLevel::Machine => idx::MPIE,
    }
}

/// The interrupt-status register (mintstatus), holding the current interrupt
/// level of every privilege mode.
///
/// | bits    | field |
/// |---------|-------|
/// | 31..24  | mil   |
/// | 15..8   | sil   |
/// | 7..0    | uil   |
#[derive(Debug, Clone)]
pub struct IntStatus(u32);

impl Default for IntStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl IntStatus {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    /// The register is read-only from guest software; its fields are written
    /// by trap entry and fast redispatch only.
    pub fn read(&self) -> u32 {
        self.0
    }

    /// Returns the current interrupt level (xil) of `mode`.
    pub fn level(&self, mode: PrivilegeLevel) -> u8 {
        let lsb = il_lsb(mode);
        self.0.view_bits::<Lsb0>()[lsb..lsb + 8].load_le()
    }

    pub fn set_level(&mut self, mode: PrivilegeLevel, level: u8) {
        let lsb = il_lsb(mode);
        self.0.view_bits_mut::<Lsb0>()[lsb..lsb + 8].store_le(level);
    }
}

fn il_lsb(mode: PrivilegeLevel) -> usize {
    match mode {
        PrivilegeLevel::User => 0,
        PrivilegeLevel::Supervisor => 8,
        PrivilegeLevel::Machine => 24,
    }
}

/// Per-mode interrupt-level threshold register (xintthresh).
///
/// Interrupts of the mode below this level are never presented, independent
/// of their own configured level. All eight threshold bits are implemented.
#[derive(Debug, Clone)]
pub struct IntThresh(u8);

impl Default for IntThresh {
    fn default() -> Self {
        Self::new()
    }
}

impl IntThresh {
    pub fn new() -> Self {
        Self(0x00)
    }

    pub fn read(&self) -> u32 {
        self.0 as u32
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = (self.read() & !mask | value & mask) as u8;
    }

    pub fn threshold(&self) -> u8 {
        self.0
    }
}
