//! Memory-mapped CLIC register file.
//!
//! Per-hart storage for the interrupt table (pending/enable/attr/ctl, four
//! parallel byte arrays indexed by interrupt id) and the interrupt trigger
//! table, exposed through up to three privilege-scoped windows that alias the
//! same underlying state.
//!
//! Window layout (offsets within a window):
//!
//! | offset            | contents                                        |
//! |-------------------|-------------------------------------------------|
//! | `0x0000`          | smclicconfig placeholder (loads 0, stores fail) |
//! | `0x0004`–`0x003F` | reserved                                        |
//! | `0x0040`–`0x00BF` | `clicinttrig[0..32]`, one word each (M only)    |
//! | `0x00C0`–`0x07FF` | reserved                                        |
//! | `0x0800`–`0x0FFF` | custom (treated as reserved)                    |
//! | `0x1000`–`0x4FFF` | interrupt table, 4 bytes per interrupt          |
//!
//! Within an interrupt's 4-byte group, byte 0 is `pending`, byte 1 `enable`,
//! byte 2 `attr`, and byte 3 `ctl`. The S and U windows hide interrupts whose
//! owning mode outranks the window.

use bitvec::{field::BitField, order::Lsb0, view::BitView};

use crate::bus::{AccessError, AccessResult};
use crate::{PrivilegeLevel, RawPrivilegeLevel};

use super::Config;

pub const CONFIG_ADDR: u32 = 0x0000;
pub const TRIGGER_BASE_ADDR: u32 = 0x0040;
pub const TRIGGER_LAST_ADDR: u32 = 0x00BF;
pub const CUSTOM_BASE_ADDR: u32 = 0x0800;
pub const TABLE_BASE_ADDR: u32 = 0x1000;
pub const TABLE_LAST_ADDR: u32 = 0x4FFF;

/// Largest number of interrupt inputs the window layout can address.
pub const MAX_INTERRUPTS: usize = 4096;
/// Largest number of trigger entries the window layout can address.
pub const MAX_TRIGGERS: usize = 32;

const_assert!(TRIGGER_BASE_ADDR + 4 * MAX_TRIGGERS as u32 == TRIGGER_LAST_ADDR + 1);
const_assert!(TABLE_BASE_ADDR + 4 * MAX_INTERRUPTS as u32 == TABLE_LAST_ADDR + 1);

/// Bit positions within an interrupt attribute (`attr`) byte.
///
/// Bits 3 to 5 are reserved, as is the polarity bit for now.
mod attr {
    /// Selective hardware vectoring opt-in for this interrupt.
    pub const SHV: usize = 0;
    /// Trigger type: edge (`1`) or level (`0`).
    pub const TRIG_EDGE: usize = 1;
    /// Trigger polarity (reserved).
    #[allow(dead_code)]
    pub const TRIG_POLARITY: usize = 2;
    /// Owning privilege mode (2 bits).
    pub const MODE: usize = 6;
}

/// Returns `true` if the attribute byte opts in to selective hardware
/// vectoring.
pub fn attr_shv(byte: u8) -> bool {
    byte.view_bits::<Lsb0>()[attr::SHV]
}

/// Returns `true` if the attribute byte marks the interrupt edge-triggered.
pub fn attr_edge_triggered(byte: u8) -> bool {
    byte.view_bits::<Lsb0>()[attr::TRIG_EDGE]
}

/// Returns the owning privilege mode encoded in the attribute byte.
///
/// This is a raw 2-bit field; guest software can store the reserved level `2`.
pub fn attr_mode(byte: u8) -> RawPrivilegeLevel {
    RawPrivilegeLevel::from_u2(byte.view_bits::<Lsb0>()[attr::MODE..].load_le())
}

/// Bit ranges within a trigger (`clicinttrig`) word.
mod trig {
    pub const INTERRUPT_NUMBER: core::ops::Range<usize> = 0..13;
    // Bits 13..31 are reserved.
    pub const ENABLE: usize = 31;
}

/// Returns the interrupt number routed by a trigger word.
#[allow(dead_code)] // Trigger routing is a board-level concern; kept for diagnostics.
pub fn trigger_interrupt_number(word: u32) -> u16 {
    word.view_bits::<Lsb0>()[trig::INTERRUPT_NUMBER].load_le()
}

/// Returns `true` if the trigger word is enabled.
#[allow(dead_code)] // Trigger routing is a board-level concern; kept for diagnostics.
pub fn trigger_enabled(word: u32) -> bool {
    word.view_bits::<Lsb0>()[trig::ENABLE]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// The smclicconfig placeholder and the custom range share the reserved
    /// range's policy: loads return zero, stores fail.
    Reserved,
    /// Trigger table; payload is the byte offset from the trigger base.
    Trigger(u32),
    /// Interrupt table; payload is the byte offset from the table base.
    Table(u32),
}

impl Region {
    fn from_address(address: u32) -> Option<Self> {
        #[allow(clippy::match_overlapping_arm)]
        match address {
            TRIGGER_BASE_ADDR..=TRIGGER_LAST_ADDR => {
                Some(Self::Trigger(address - TRIGGER_BASE_ADDR))
            }
            TABLE_BASE_ADDR..=TABLE_LAST_ADDR => Some(Self::Table(address - TABLE_BASE_ADDR)),
            CONFIG_ADDR..=TABLE_LAST_ADDR => Some(Self::Reserved),
            _ => None,
        }
    }
}

/// The byte-addressable register state behind the CLIC's MMIO windows.
#[derive(Debug, Clone)]
pub struct RegisterFile {
    pending: Box<[u8]>,
    enable: Box<[u8]>,
    attr: Box<[u8]>,
    ctl: Box<[u8]>,
    triggers: Box<[u32]>,
    supervisor: bool,
    user: bool,
    selective_vectoring: bool,
}

impl RegisterFile {
    pub fn new(config: &Config) -> Self {
        let n = config.interrupt_count;
        Self {
            pending: vec![0; n].into_boxed_slice(),
            enable: vec![0; n].into_boxed_slice(),
            attr: vec![0; n].into_boxed_slice(),
            ctl: vec![0; n].into_boxed_slice(),
            triggers: vec![0; config.trigger_count].into_boxed_slice(),
            supervisor: config.supervisor,
            user: config.user,
            selective_vectoring: config.selective_vectoring,
        }
    }

    pub fn interrupt_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self, id: u16) -> u8 {
        self.pending[id as usize]
    }

    /// Auto-acknowledge for edge-triggered delivery.
    pub fn clear_pending(&mut self, id: u16) {
        self.pending[id as usize] = 0;
    }

    pub fn enable(&self, id: u16) -> u8 {
        self.enable[id as usize]
    }

    pub fn attr(&self, id: u16) -> u8 {
        self.attr[id as usize]
    }

    pub fn ctl(&self, id: u16) -> u8 {
        self.ctl[id as usize]
    }

    /// Invoke a load through the window of privilege level `window` for
    /// `address` with size `buf.len()`, writing the result to `buf`.
    ///
    /// Doubleword accesses are decomposed into a pair of word accesses; either
    /// sub-access failing fails the whole access. Table bytes past the last
    /// implemented interrupt are legally addressable but unpopulated: the load
    /// succeeds without touching `buf`.
    pub fn load(&self, window: PrivilegeLevel, address: u32, buf: &mut [u8]) -> AccessResult {
        self.check_window(window, address)?;
        if buf.len() > 8 {
            return Err(AccessError::TooWide(buf.len()));
        }
        if buf.len() == 8 {
            let (lo, hi) = buf.split_at_mut(4);
            self.load(window, address, lo)?;
            return self.load(window, address + 4, hi);
        }
        match Region::from_address(address) {
            Some(Region::Reserved) => {
                buf.fill(0);
                Ok(())
            }
            Some(Region::Trigger(_)) if window != PrivilegeLevel::Machine => {
                // Trigger control is machine-privileged; lower windows see a
                // reserved range here.
                buf.fill(0);
                Ok(())
            }
            Some(Region::Trigger(offset)) => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    let offset = offset + i as u32;
                    let (entry, lane) = (offset / 4, offset % 4);
                    *byte = match self.triggers.get(entry as usize) {
                        Some(word) => (word >> (8 * lane)) as u8,
                        None => 0,
                    };
                }
                Ok(())
            }
            Some(Region::Table(offset)) => {
                for (i, byte) in buf.iter_mut().enumerate() {
                    let offset = offset + i as u32;
                    let id = (offset / 4) as usize;
                    if id >= self.pending.len() {
                        // Unpopulated: the load succeeds without producing a
                        // value.
                        continue;
                    }
                    if !self.visible(window, id) {
                        *byte = 0;
                        continue;
                    }
                    *byte = match offset % 4 {
                        0 => self.pending[id],
                        1 => self.enable[id],
                        2 => self.attr[id],
                        _ => self.ctl[id],
                    };
                }
                Ok(())
            }
            None => Err(AccessError::Unmapped(address)),
        }
    }

    /// Invoke a store through the window of privilege level `window` for
    /// `address` with size `buf.len()`, reading the data from `buf`.
    ///
    /// Stores to reserved ranges fail; stores to unpopulated table bytes and
    /// stores filtered by window privilege succeed without effect.
    pub fn store(&mut self, window: PrivilegeLevel, address: u32, buf: &[u8]) -> AccessResult {
        self.check_window(window, address)?;
        if buf.len() > 8 {
            return Err(AccessError::TooWide(buf.len()));
        }
        if buf.len() == 8 {
            let (lo, hi) = buf.split_at(4);
            self.store(window, address, lo)?;
            return self.store(window, address + 4, hi);
        }
        match Region::from_address(address) {
            Some(Region::Reserved) => Err(AccessError::ReadOnly(address)),
            Some(Region::Trigger(_)) if window != PrivilegeLevel::Machine => {
                Err(AccessError::ReadOnly(address))
            }
            Some(Region::Trigger(offset)) => {
                for (i, byte) in buf.iter().enumerate() {
                    let offset = offset + i as u32;
                    let (entry, lane) = (offset / 4, offset % 4);
                    if let Some(word) = self.triggers.get_mut(entry as usize) {
                        *word = *word & !(0xFF << (8 * lane)) | (*byte as u32) << (8 * lane);
                    }
                }
                Ok(())
            }
            Some(Region::Table(offset)) => {
                for (i, byte) in buf.iter().enumerate() {
                    let offset = offset + i as u32;
                    let id = (offset / 4) as usize;
                    if id >= self.pending.len() || !self.visible(window, id) {
                        // Unpopulated or hidden from this window: the store
                        // completes but is discarded.
                        continue;
                    }
                    match offset % 4 {
                        0 => self.pending[id] = *byte,
                        1 => self.enable[id] = *byte,
                        2 => {
                            let mask = if self.selective_vectoring {
                                0xFF
                            } else {
                                !(1u8 << attr::SHV)
                            };
                            self.attr[id] = byte & mask;
                        }
                        _ => self.ctl[id] = *byte,
                    }
                }
                Ok(())
            }
            None => Err(AccessError::Unmapped(address)),
        }
    }

    fn check_window(&self, window: PrivilegeLevel, address: u32) -> AccessResult {
        let present = match window {
            PrivilegeLevel::Machine => true,
            PrivilegeLevel::Supervisor => self.supervisor,
            PrivilegeLevel::User => self.user,
        };
        match present {
            true => Ok(()),
            false => Err(AccessError::Unmapped(address)),
        }
    }

    /// An interrupt is visible through a window only if its owning mode does
    /// not outrank the window's privilege level.
    fn visible(&self, window: PrivilegeLevel, id: usize) -> bool {
        window == PrivilegeLevel::Machine || attr_mode(self.attr[id]) <= window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            interrupt_count: 64,
            trigger_count: 16,
            supervisor: true,
            user: true,
            selective_vectoring: false,
        }
    }

    fn regfile() -> RegisterFile {
        RegisterFile::new(&config())
    }

    fn table_addr(id: u32, byte: u32) -> u32 {
        TABLE_BASE_ADDR + 4 * id + byte
    }

    #[test]
    fn config_register_loads_zero_but_rejects_stores() {
        let mut regfile = regfile();
        let mut buf = [0xAA; 4];
        regfile
            .load(PrivilegeLevel::Machine, CONFIG_ADDR, &mut buf)
            .unwrap();
        assert_eq!([0, 0, 0, 0], buf);
        assert_eq!(
            Err(AccessError::ReadOnly(CONFIG_ADDR)),
            regfile.store(PrivilegeLevel::Machine, CONFIG_ADDR, &[1, 2, 3, 4])
        );
    }

    #[test]
    fn reserved_and_custom_ranges_follow_config_policy() {
        let mut regfile = regfile();
        for address in [0x0004, 0x00C0, CUSTOM_BASE_ADDR] {
            let mut buf = [0xFF; 2];
            regfile
                .load(PrivilegeLevel::Machine, address, &mut buf)
                .unwrap();
            assert_eq!([0, 0], buf);
            assert_eq!(
                Err(AccessError::ReadOnly(address)),
                regfile.store(PrivilegeLevel::Machine, address, &[0])
            );
        }
    }

    #[test]
    fn out_of_window_and_too_wide_accesses_fail() {
        let mut regfile = regfile();
        let mut buf = [0; 4];
        assert_eq!(
            Err(AccessError::Unmapped(0x5000)),
            regfile.load(PrivilegeLevel::Machine, 0x5000, &mut buf)
        );
        let mut wide = [0; 16];
        assert_eq!(
            Err(AccessError::TooWide(16)),
            regfile.load(PrivilegeLevel::Machine, TABLE_BASE_ADDR, &mut wide)
        );
        assert_eq!(
            Err(AccessError::TooWide(16)),
            regfile.store(PrivilegeLevel::Machine, TABLE_BASE_ADDR, &wide)
        );
    }

    #[test]
    fn table_bytes_round_trip_per_field() {
        let mut regfile = regfile();
        regfile
            .store(PrivilegeLevel::Machine, table_addr(5, 0), &[0x81])
            .unwrap();
        regfile
            .store(PrivilegeLevel::Machine, table_addr(5, 1), &[0x01])
            .unwrap();
        regfile
            .store(PrivilegeLevel::Machine, table_addr(5, 3), &[0x80])
            .unwrap();
        assert_eq!(0x81, regfile.pending(5));
        assert_eq!(0x01, regfile.enable(5));
        assert_eq!(0x80, regfile.ctl(5));
        let mut buf = [0; 4];
        regfile
            .load(PrivilegeLevel::Machine, table_addr(5, 0), &mut buf)
            .unwrap();
        assert_eq!([0x81, 0x01, 0x00, 0x80], buf);
    }

    #[test]
    fn attr_store_masks_shv_bit_without_selective_vectoring() {
        let mut regfile = regfile();
        regfile
            .store(PrivilegeLevel::Machine, table_addr(3, 2), &[0xC3])
            .unwrap();
        // Bit 0 (SHV) is masked off; the rest is kept.
        assert_eq!(0xC2, regfile.attr(3));

        let mut shv_config = config();
        shv_config.selective_vectoring = true;
        let mut regfile = RegisterFile::new(&shv_config);
        regfile
            .store(PrivilegeLevel::Machine, table_addr(3, 2), &[0xC3])
            .unwrap();
        assert_eq!(0xC3, regfile.attr(3));
    }

    #[test]
    fn doubleword_access_matches_two_word_accesses() {
        let mut regfile = regfile();
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        regfile
            .store(PrivilegeLevel::Machine, table_addr(8, 0), &bytes)
            .unwrap();

        let mut word_for_word = RegisterFile::new(&config());
        word_for_word
            .store(PrivilegeLevel::Machine, table_addr(8, 0), &bytes[..4])
            .unwrap();
        word_for_word
            .store(PrivilegeLevel::Machine, table_addr(9, 0), &bytes[4..])
            .unwrap();

        for id in [8, 9] {
            assert_eq!(word_for_word.pending(id), regfile.pending(id));
            assert_eq!(word_for_word.enable(id), regfile.enable(id));
            assert_eq!(word_for_word.attr(id), regfile.attr(id));
            assert_eq!(word_for_word.ctl(id), regfile.ctl(id));
        }

        let mut doubleword = [0; 8];
        regfile
            .load(PrivilegeLevel::Machine, table_addr(8, 0), &mut doubleword)
            .unwrap();
        let mut words = [0; 8];
        regfile
            .load(PrivilegeLevel::Machine, table_addr(8, 0), &mut words[..4])
            .unwrap();
        regfile
            .load(PrivilegeLevel::Machine, table_addr(9, 0), &mut words[4..])
            .unwrap();
        assert_eq!(words, doubleword);
    }

    #[test]
    fn unaligned_access_crosses_group_boundary() {
        let mut regfile = regfile();
        // Starts at ctl of interrupt 2, continues into pending of interrupt 3.
        regfile
            .store(PrivilegeLevel::Machine, table_addr(2, 3), &[0x40, 0x01])
            .unwrap();
        assert_eq!(0x40, regfile.ctl(2));
        assert_eq!(0x01, regfile.pending(3));
    }

    #[test]
    fn unpopulated_table_range_is_a_no_op() {
        let mut regfile = regfile();
        // Interrupt 64 is past the last implemented one, but still in range.
        let address = table_addr(64, 0);
        let mut buf = [0xAB; 4];
        regfile
            .load(PrivilegeLevel::Machine, address, &mut buf)
            .unwrap();
        assert_eq!([0xAB; 4], buf);
        regfile
            .store(PrivilegeLevel::Machine, address, &[1, 1, 1, 1])
            .unwrap();
        let mut readback = [0xCD; 4];
        regfile
            .load(PrivilegeLevel::Machine, address, &mut readback)
            .unwrap();
        assert_eq!([0xCD; 4], readback);
    }

    #[test]
    fn lower_window_cannot_see_or_write_machine_interrupts() {
        let mut regfile = regfile();
        // Interrupt 20 is owned by M-mode.
        regfile
            .store(PrivilegeLevel::Machine, table_addr(20, 2), &[0xC0])
            .unwrap();
        regfile
            .store(PrivilegeLevel::Machine, table_addr(20, 1), &[0x01])
            .unwrap();

        // The S-mode window reads zero and its writes are discarded, while
        // still completing successfully.
        let mut buf = [0xFF];
        regfile
            .load(PrivilegeLevel::Supervisor, table_addr(20, 1), &mut buf)
            .unwrap();
        assert_eq!([0], buf);
        regfile
            .store(PrivilegeLevel::Supervisor, table_addr(20, 1), &[0x00])
            .unwrap();
        assert_eq!(0x01, regfile.enable(20));

        // The M-mode window writes through.
        regfile
            .store(PrivilegeLevel::Machine, table_addr(20, 1), &[0x00])
            .unwrap();
        assert_eq!(0x00, regfile.enable(20));
    }

    #[test]
    fn supervisor_window_sees_supervisor_and_user_interrupts() {
        let mut regfile = regfile();
        // Interrupt 7 owned by S-mode, interrupt 9 by U-mode.
        regfile
            .store(PrivilegeLevel::Machine, table_addr(7, 2), &[0x40])
            .unwrap();
        regfile
            .store(PrivilegeLevel::Supervisor, table_addr(7, 1), &[0x01])
            .unwrap();
        regfile
            .store(PrivilegeLevel::Supervisor, table_addr(9, 1), &[0x01])
            .unwrap();
        assert_eq!(0x01, regfile.enable(7));
        assert_eq!(0x01, regfile.enable(9));

        // The U-mode window only reaches the U-mode interrupt.
        regfile
            .store(PrivilegeLevel::User, table_addr(7, 1), &[0x00])
            .unwrap();
        regfile
            .store(PrivilegeLevel::User, table_addr(9, 1), &[0x00])
            .unwrap();
        assert_eq!(0x01, regfile.enable(7));
        assert_eq!(0x00, regfile.enable(9));
    }

    #[test]
    fn absent_window_fails_every_access() {
        let mut config = config();
        config.supervisor = false;
        config.user = false;
        let regfile = RegisterFile::new(&config);
        let mut buf = [0; 1];
        assert!(matches!(
            regfile.load(PrivilegeLevel::Supervisor, TABLE_BASE_ADDR, &mut buf),
            Err(AccessError::Unmapped(_))
        ));
        assert!(matches!(
            regfile.load(PrivilegeLevel::User, TABLE_BASE_ADDR, &mut buf),
            Err(AccessError::Unmapped(_))
        ));
    }

    #[test]
    fn trigger_words_round_trip_in_machine_window_only() {
        let mut regfile = regfile();
        let address = TRIGGER_BASE_ADDR + 4; // clicinttrig[1]
        regfile
            .store(PrivilegeLevel::Machine, address, &[0x0D, 0x00, 0x00, 0x80])
            .unwrap();
        let mut buf = [0; 4];
        regfile
            .load(PrivilegeLevel::Machine, address, &mut buf)
            .unwrap();
        assert_eq!([0x0D, 0x00, 0x00, 0x80], buf);
        assert_eq!(13, trigger_interrupt_number(0x8000_000D));
        assert!(trigger_enabled(0x8000_000D));

        // Machine-privileged: the S window treats the range as reserved.
        let mut buf = [0xFF; 4];
        regfile
            .load(PrivilegeLevel::Supervisor, address, &mut buf)
            .unwrap();
        assert_eq!([0; 4], buf);
        assert_eq!(
            Err(AccessError::ReadOnly(address)),
            regfile.store(PrivilegeLevel::Supervisor, address, &[1, 0, 0, 0])
        );
    }

    #[test]
    fn unimplemented_trigger_entries_read_zero_and_drop_stores() {
        let mut regfile = regfile();
        // Entry 16 is past trigger_count but inside the trigger range.
        let address = TRIGGER_BASE_ADDR + 4 * 16;
        regfile
            .store(PrivilegeLevel::Machine, address, &[1, 2, 3, 4])
            .unwrap();
        let mut buf = [0xFF; 4];
        regfile
            .load(PrivilegeLevel::Machine, address, &mut buf)
            .unwrap();
        assert_eq!([0; 4], buf);
    }
}
