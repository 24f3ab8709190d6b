//! Arbitration over the interrupt table.
//!
//! > To select an interrupt to present to the core, the CLIC hardware
//! > combines the valid bits in clicintattr.mode and clicintctl to form an
//! > unsigned integer, then picks the global maximum across all
//! > pending-and-enabled interrupts based on this value.

use crate::PrivilegeLevel;

use super::regfile::{attr_mode, RegisterFile};

/// The highest-ranked pending-and-enabled interrupt, as last computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Target privilege mode of the winning interrupt.
    pub privilege: PrivilegeLevel,
    /// Interrupt level (the winner's `ctl` byte).
    pub level: u8,
    pub id: u16,
}

impl Selection {
    /// The empty selection. A level of zero means nothing is selected; `id`
    /// must not be acted on without checking for it.
    pub const NONE: Selection = Selection {
        privilege: PrivilegeLevel::User,
        level: 0,
        id: 0,
    };

    pub fn is_none(&self) -> bool {
        self.level == 0
    }
}

/// Scans the interrupt table for the highest-ranked pending-and-enabled
/// interrupt.
///
/// The rank of an interrupt is `(mode << 8) | ctl`, so a higher owning mode
/// always outranks a higher level. The scan keeps a candidate on a
/// greater-or-equal rank, which resolves ties in favor of the higher id.
/// Disabled interrupts never rank, no matter their level; interrupts whose
/// owning mode is the reserved level are not deliverable and never rank
/// either.
pub fn select(regfile: &RegisterFile) -> Selection {
    let mut best_rank = 0u16;
    let mut selection = Selection::NONE;
    for id in 0..regfile.interrupt_count() as u16 {
        if regfile.pending(id) == 0 || regfile.enable(id) == 0 {
            continue;
        }
        let Ok(mode) = PrivilegeLevel::try_from(attr_mode(regfile.attr(id))) else {
            continue;
        };
        let ctl = regfile.ctl(id);
        let rank = (mode as u16) << 8 | ctl as u16;
        if rank >= best_rank {
            best_rank = rank;
            selection = Selection {
                privilege: mode,
                level: ctl,
                id,
            };
        }
    }
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clic::regfile::TABLE_BASE_ADDR;
    use crate::clic::Config;

    fn regfile() -> RegisterFile {
        RegisterFile::new(&Config::default())
    }

    fn set_interrupt(
        regfile: &mut RegisterFile,
        id: u32,
        pending: u8,
        enable: u8,
        attr: u8,
        ctl: u8,
    ) {
        regfile
            .store(
                PrivilegeLevel::Machine,
                TABLE_BASE_ADDR + 4 * id,
                &[pending, enable, attr, ctl],
            )
            .unwrap();
    }

    #[test]
    fn empty_table_selects_nothing() {
        let selection = select(&regfile());
        assert!(selection.is_none());
        assert_eq!(Selection::NONE, selection);
    }

    #[test]
    fn highest_level_wins() {
        let mut regfile = regfile();
        set_interrupt(&mut regfile, 5, 0x81, 0x01, 0xC0, 0x80);
        set_interrupt(&mut regfile, 10, 0x01, 0x01, 0xC0, 0x40);
        let selection = select(&regfile);
        assert_eq!(5, selection.id);
        assert_eq!(PrivilegeLevel::Machine, selection.privilege);
        assert_eq!(0x80, selection.level);
    }

    #[test]
    fn equal_ranks_resolve_to_the_higher_id() {
        let mut regfile = regfile();
        set_interrupt(&mut regfile, 5, 0x81, 0x01, 0xC0, 0x80);
        set_interrupt(&mut regfile, 10, 0x01, 0x01, 0xC0, 0x40);
        set_interrupt(&mut regfile, 7, 0x01, 0x01, 0xC0, 0x80);
        let selection = select(&regfile);
        assert_eq!(7, selection.id);
        assert_eq!(0x80, selection.level);
    }

    #[test]
    fn owning_mode_outranks_level() {
        let mut regfile = regfile();
        set_interrupt(&mut regfile, 3, 0x01, 0x01, 0x40, 0xFF); // S-mode, max level
        set_interrupt(&mut regfile, 4, 0x01, 0x01, 0xC0, 0x01); // M-mode, low level
        let selection = select(&regfile);
        assert_eq!(4, selection.id);
        assert_eq!(PrivilegeLevel::Machine, selection.privilege);
        assert_eq!(0x01, selection.level);
    }

    #[test]
    fn disabled_interrupts_never_rank() {
        let mut regfile = regfile();
        set_interrupt(&mut regfile, 5, 0x01, 0x00, 0xC0, 0xFF); // disabled, high ctl
        set_interrupt(&mut regfile, 10, 0x01, 0x01, 0xC0, 0x10);
        let selection = select(&regfile);
        assert_eq!(10, selection.id);
        assert_eq!(0x10, selection.level);

        set_interrupt(&mut regfile, 10, 0x01, 0x00, 0xC0, 0x10);
        assert!(select(&regfile).is_none());
    }

    #[test]
    fn reserved_owning_mode_never_ranks() {
        let mut regfile = regfile();
        set_interrupt(&mut regfile, 5, 0x01, 0x01, 0x80, 0xFF); // mode bits 0b10
        assert!(select(&regfile).is_none());
    }
}
