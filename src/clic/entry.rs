//! Interrupt trap entry.
//!
//! Commits a presented interrupt trap: banks the preempted context into the
//! target mode's CSR shadows, raises the target mode's interrupt level, and
//! resolves the handler address the hart must jump to.

use log::debug;

use crate::PrivilegeLevel;

use super::cause::{EXCCODE_MASK, INTERRUPT_BIT};
use super::regfile::{attr_edge_triggered, attr_shv};
use super::{Clic, Hart, MemoryError, VectorMemory};

/// Outcome of [`Clic::enter_trap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapEntry {
    /// The cause was a synchronous exception; the controller took no part in
    /// it and the caller should run its ordinary delegation path.
    Synchronous,
    /// The interrupt trap was entered; resume execution at `pc`.
    Taken { pc: u32 },
}

impl Clic {
    /// Enter the trap for `cause`, saving `epc` as the pc to return to.
    ///
    /// The target mode is the one the last arbitration pass selected, so this
    /// must follow a [`Clic::take_interrupt`] that returned the same cause.
    ///
    /// For a selectively hardware-vectored interrupt the handler pointer is
    /// fetched through `memory` before anything else; a [`MemoryError`]
    /// aborts the entry with no state committed, and the caller is expected
    /// to raise the corresponding fetch fault instead.
    pub fn enter_trap(
        &mut self,
        hart: &mut impl Hart,
        memory: &mut impl VectorMemory,
        cause: u32,
        epc: u32,
    ) -> Result<TrapEntry, MemoryError> {
        if cause & INTERRUPT_BIT == 0 {
            return Ok(TrapEntry::Synchronous);
        }

        let selection = self.selection;
        let target = selection.privilege;
        let id = (cause & EXCCODE_MASK) as u16;
        // A cause naming an unimplemented interrupt can only come from a
        // caller that skipped presentation; deliver it non-vectored instead
        // of indexing out of the table.
        let attr = match (id as usize) < self.regfile.interrupt_count() {
            true => self.regfile.attr(id),
            false => 0,
        };

        let vectored = self.config.selective_vectoring && attr_shv(attr);
        let handler = match vectored {
            true => memory.load_u32(self.mode(target).tvt.entry_address(id))?,
            false => self.mode(target).tvec.handler_base(),
        };

        // The fetch resolved; everything below commits.
        if vectored && attr_edge_triggered(attr) {
            self.regfile.clear_pending(id);
        }

        self.prev_priv = self.curr_priv;
        self.prev_ie = self.curr_ie;
        self.prev_level = self.curr_level;
        let (prev_priv, prev_ie, prev_level) = (self.prev_priv, self.prev_ie, self.prev_level);

        let csrs = self.mode_mut(target);
        csrs.epc = epc & !1;
        csrs.cause.write(cause, u32::MAX);
        csrs.cause.set_previous_level(prev_level);
        csrs.cause.set_previous_ie(prev_ie);
        csrs.cause.set_previous_privilege(prev_priv);

        self.intstatus.set_level(target, selection.level);
        self.status.set_previous_ie(target, prev_ie);
        match target {
            PrivilegeLevel::Machine => self.status.set_mpp(prev_priv),
            PrivilegeLevel::Supervisor => self.status.set_spp(prev_priv),
            // There is no previous-privilege field below S.
            PrivilegeLevel::User => {}
        }
        self.status.set_ie(target, false);

        hart.set_privilege_level(target);
        self.curr_priv = target;
        self.curr_ie = false;
        self.curr_level = selection.level;

        debug!(
            id = id,
            level = selection.level,
            vectored = vectored,
            pc = handler;
            "entering interrupt trap in {}",
            target
        );

        // A pending NMI would override the handler address here; without NMI
        // modeling this always resolves to the handler itself.
        Ok(TrapEntry::Taken { pc: handler })
    }
}
