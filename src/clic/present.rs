//! Interrupt presentation.
//!
//! Decides whether the winning interrupt of the last arbitration pass
//! preempts what the hart is currently running, and synthesizes the trap the
//! execution core should take if it does.

use log::trace;

use crate::PrivilegeLevel;

use super::cause::INTERRUPT_BIT;
use super::{Clic, Hart};

/// How a presented interrupt preempts the running context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preemption {
    /// The interrupt targets a higher privilege mode than the hart runs in.
    Vertical,
    /// The interrupt targets the hart's current privilege mode at a higher
    /// interrupt level.
    Horizontal,
}

/// An interrupt trap ready to be taken.
///
/// The execution core is expected to pass `cause` back into
/// [`Clic::enter_trap`] together with the pc to return to afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptTrap {
    /// Trap cause value: the interrupt bit ORed with the interrupt id.
    pub cause: u32,
    pub kind: Preemption,
}

impl Clic {
    /// Decide whether an interrupt preempts the hart right now.
    ///
    /// Re-arbitrates over the interrupt table, then compares the winner
    /// against the hart's current privilege mode, interrupt level, and global
    /// interrupt-enable bit. The comparison context is latched so that a
    /// following [`Clic::enter_trap`] banks exactly the state this decision
    /// was made against.
    ///
    /// A pending-and-enabled interrupt releases a wait-for-interrupt hold
    /// even when it does not preempt.
    pub fn take_interrupt(&mut self, hart: &mut impl Hart) -> Option<InterruptTrap> {
        let selection = self.update_selection();
        if selection.is_none() {
            return None;
        }

        let privilege = hart.privilege_level();
        self.curr_priv = privilege;
        self.curr_ie = self.status.ie(privilege);
        self.curr_level = self.effective_level(privilege);

        if privilege == PrivilegeLevel::User {
            // TODO: present interrupts to a hart running in U-mode once
            // user-level trap entry is wired up.
            return None;
        }

        hart.clear_wfi();

        let kind = if selection.privilege > privilege {
            Preemption::Vertical
        } else if selection.privilege == privilege && self.curr_level < selection.level {
            Preemption::Horizontal
        } else {
            // Interrupts owned by a lower privilege mode, or not above the
            // current level, stay pending.
            return None;
        };
        if !self.curr_ie {
            trace!(
                id = selection.id,
                privilege = selection.privilege as u8;
                "interrupt ranked but globally disabled in {}",
                privilege
            );
            return None;
        }

        trace!(
            id = selection.id,
            level = selection.level,
            vertical = (kind == Preemption::Vertical);
            "presenting interrupt to {}",
            selection.privilege
        );
        Some(InterruptTrap {
            cause: INTERRUPT_BIT | selection.id as u32,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clic::regfile::TABLE_BASE_ADDR;
    use crate::clic::testing::TestHart;
    use crate::clic::Config;

    fn clic() -> Clic {
        Clic::new(Config::default())
    }

    fn set_interrupt(clic: &mut Clic, id: u32, pending: u8, enable: u8, attr: u8, ctl: u8) {
        clic.store(
            PrivilegeLevel::Machine,
            TABLE_BASE_ADDR + 4 * id,
            &[pending, enable, attr, ctl],
        )
        .unwrap();
    }

    fn enable_machine_interrupts(clic: &mut Clic) {
        clic.write_status(0b1000, 0b1000); // mie
    }

    #[test]
    fn nothing_pending_presents_nothing() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        enable_machine_interrupts(&mut clic);
        assert_eq!(None, clic.take_interrupt(&mut hart));
    }

    #[test]
    fn machine_interrupt_preempts_machine_mode_horizontally() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        enable_machine_interrupts(&mut clic);
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x80);
        let trap = clic.take_interrupt(&mut hart).unwrap();
        assert_eq!(0x8000_0005, trap.cause);
        assert_eq!(Preemption::Horizontal, trap.kind);
    }

    #[test]
    fn disabled_global_ie_blocks_presentation() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x80);
        // mstatus.mie is still clear.
        assert_eq!(None, clic.take_interrupt(&mut hart));
    }

    #[test]
    fn machine_interrupt_preempts_supervisor_mode_vertically() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Supervisor);
        clic.write_status(0b0010, 0b0010); // sie
        set_interrupt(&mut clic, 12, 0x01, 0x01, 0xC0, 0x01);
        let trap = clic.take_interrupt(&mut hart).unwrap();
        assert_eq!(0x8000_000C, trap.cause);
        assert_eq!(Preemption::Vertical, trap.kind);
    }

    #[test]
    fn interrupt_at_or_below_current_level_stays_pending() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        enable_machine_interrupts(&mut clic);
        clic.intstatus.set_level(PrivilegeLevel::Machine, 0x80);
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x80);
        assert_eq!(None, clic.take_interrupt(&mut hart));
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x81);
        assert!(clic.take_interrupt(&mut hart).is_some());
    }

    #[test]
    fn threshold_clamps_the_current_level() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        enable_machine_interrupts(&mut clic);
        clic.write_intthresh(PrivilegeLevel::Machine, 0x80, 0xFF);
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x40);
        assert_eq!(None, clic.take_interrupt(&mut hart));
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x81);
        assert!(clic.take_interrupt(&mut hart).is_some());
    }

    #[test]
    fn user_mode_is_never_presented_to() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::User);
        clic.write_status(0b1011, 0b1011); // every xie bit
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0xFF);
        assert_eq!(None, clic.take_interrupt(&mut hart));
    }

    #[test]
    fn ranked_interrupt_releases_wfi_even_when_blocked() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        hart.wfi = true;
        // Globally disabled, so nothing is presented.
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x80);
        assert_eq!(None, clic.take_interrupt(&mut hart));
        assert!(!hart.wfi);

        // With nothing pending the hold stays.
        hart.wfi = true;
        set_interrupt(&mut clic, 5, 0x00, 0x01, 0xC0, 0x80);
        assert_eq!(None, clic.take_interrupt(&mut hart));
        assert!(hart.wfi);
    }

    #[test]
    fn presentation_latches_the_preempted_context() {
        let mut clic = clic();
        let mut hart = TestHart::new(PrivilegeLevel::Machine);
        enable_machine_interrupts(&mut clic);
        clic.intstatus.set_level(PrivilegeLevel::Machine, 0x10);
        set_interrupt(&mut clic, 5, 0x01, 0x01, 0xC0, 0x80);
        assert!(clic.take_interrupt(&mut hart).is_some());
        assert_eq!(PrivilegeLevel::Machine, clic.curr_priv);
        assert!(clic.curr_ie);
        assert_eq!(0x10, clic.curr_level);
    }
}
