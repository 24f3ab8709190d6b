//! CSR-side surface of the controller.
//!
//! The execution core's CSR decode table forwards reads and writes of the
//! controller-owned registers here. On top of the plain registers this file
//! implements the fast-redispatch (xnxti) and scratch-swap (xscratchcsw,
//! xscratchcswl) CSRs, whose accesses have arbitration side effects.

use std::mem;

use log::trace;

use crate::PrivilegeLevel;

use super::regfile::{attr_edge_triggered, attr_shv};
use super::Clic;

impl Clic {
    /// Access the mode's fast-redispatch CSR (mnxti, snxti, unxti).
    ///
    /// Re-runs arbitration, then checks whether the winner can be redispatched
    /// to directly: it must target `mode`, be above both the level preempted
    /// by the running handler and the mode's threshold, and not be selectively
    /// vectored. Returns the address of the winner's vector-table entry, or 0
    /// if nothing qualifies.
    ///
    /// A write first ORs the low five bits of `value` into the mode's view of
    /// the status register. A write of a nonzero low-bit pattern additionally
    /// commits the redispatch: the mode's interrupt level and cause are
    /// updated, and an edge-triggered winner is acknowledged.
    pub fn access_nxti(&mut self, mode: PrivilegeLevel, value: u32, write: bool) -> u32 {
        let selection = self.update_selection();
        if write {
            self.status.or_low_bits(mode, value);
        }

        let qualified = !selection.is_none()
            && selection.privilege == mode
            && selection.level > self.mode(mode).cause.previous_level()
            && selection.level > self.mode(mode).intthresh.threshold()
            && !attr_shv(self.regfile.attr(selection.id));
        if !qualified {
            return 0;
        }

        if write && value & 0x1F != 0 {
            if attr_edge_triggered(self.regfile.attr(selection.id)) {
                self.regfile.clear_pending(selection.id);
            }
            self.intstatus.set_level(mode, selection.level);
            let cause = &mut self.mode_mut(mode).cause;
            cause.set_code(selection.id);
            cause.set_interrupt(true);
            trace!(
                id = selection.id,
                level = selection.level;
                "redispatching interrupt in {}",
                mode
            );
        }
        self.mode(mode).tvt.entry_address(selection.id)
    }

    /// Access the mode's context-switch scratch-swap CSR (xscratchcsw).
    ///
    /// Swaps `value` with the mode's scratch register iff the trap came from
    /// a different privilege mode than the hart currently runs in, i.e. the
    /// status register's previous-privilege field differs from
    /// `hart_privilege`. Otherwise `value` passes through unswapped.
    pub fn swap_scratch(
        &mut self,
        mode: PrivilegeLevel,
        hart_privilege: PrivilegeLevel,
        value: u32,
    ) -> u32 {
        let banked = match mode {
            PrivilegeLevel::Machine => self.status.mpp(),
            PrivilegeLevel::Supervisor => self.status.spp(),
            // No previous-privilege field below S: a U-mode trap can only
            // come from U, so the swap condition never holds.
            PrivilegeLevel::User => return value,
        };
        match hart_privilege as u8 != banked {
            true => mem::replace(&mut self.mode_mut(mode).scratch, value),
            false => value,
        }
    }

    /// Access the mode's level-aware scratch-swap CSR (xscratchcswl).
    ///
    /// Swaps `value` with the mode's scratch register iff exactly one of the
    /// preempted interrupt level (cause xpil) and the current interrupt level
    /// (intstatus xil) is zero, i.e. the trap crossed between application
    /// code and interrupt handler.
    pub fn swap_scratch_level(&mut self, mode: PrivilegeLevel, value: u32) -> u32 {
        let from_application = self.mode(mode).cause.previous_level() == 0;
        let in_application = self.intstatus.level(mode) == 0;
        match from_application != in_application {
            true => mem::replace(&mut self.mode_mut(mode).scratch, value),
            false => value,
        }
    }

    pub fn read_status(&self) -> u32 {
        self.status.read()
    }

    pub fn write_status(&mut self, value: u32, mask: u32) {
        self.status.write(value, mask);
    }

    /// The interrupt-status register is read-only from software.
    pub fn read_intstatus(&self) -> u32 {
        self.intstatus.read()
    }

    pub fn read_intthresh(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).intthresh.read()
    }

    pub fn write_intthresh(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        self.mode_mut(mode).intthresh.write(value, mask);
    }

    pub fn read_cause(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).cause.read()
    }

    pub fn write_cause(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        self.mode_mut(mode).cause.write(value, mask);
    }

    pub fn read_epc(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).epc
    }

    pub fn write_epc(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        let epc = &mut self.mode_mut(mode).epc;
        // Bit 0 of a return address is never architecturally visible.
        *epc = (*epc & !mask | value & mask) & !1;
    }

    pub fn read_tvec(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).tvec.read()
    }

    pub fn write_tvec(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        self.mode_mut(mode).tvec.write(value, mask);
    }

    pub fn read_tvt(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).tvt.read()
    }

    pub fn write_tvt(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        self.mode_mut(mode).tvt.write(value, mask);
    }

    pub fn read_scratch(&self, mode: PrivilegeLevel) -> u32 {
        self.mode(mode).scratch
    }

    pub fn write_scratch(&mut self, mode: PrivilegeLevel, value: u32, mask: u32) {
        let scratch = &mut self.mode_mut(mode).scratch;
        *scratch = *scratch & !mask | value & mask;
    }
}
