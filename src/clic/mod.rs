//! Per-hart Core-Local Interrupt Controller.
//!
//! One [`Clic`] instance belongs to exactly one simulated hart; a multi-hart
//! system instantiates one controller per hart with no shared state between
//! them. All operations are synchronous: a register access, an arbitration
//! pass, or a trap entry either completes or fails deterministically within
//! the call. The interrupt tables may be exposed read-only to diagnostic
//! components, as long as writes stay serialized through [`Clic::store`].

mod arbiter;
mod cause;
mod csr;
mod entry;
mod present;
pub mod regfile;
mod status;
mod vectors;

use thiserror::Error;

use crate::PrivilegeLevel;

pub use arbiter::Selection;
pub use cause::{Cause, EXCCODE_MASK, INTERRUPT_BIT};
pub use entry::TrapEntry;
pub use present::{InterruptTrap, Preemption};
pub use status::{IntStatus, IntThresh, Status};
pub use vectors::{Tvec, Tvt};

use regfile::{RegisterFile, MAX_INTERRUPTS, MAX_TRIGGERS};

/// Build-time shape of the controller. Fixed at construction.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of interrupt inputs (2 to 4096).
    pub interrupt_count: usize,
    /// Number of interrupt trigger entries (0 to 32).
    pub trigger_count: usize,
    /// Whether the S-mode window, CSRs, and threshold exist.
    pub supervisor: bool,
    /// Whether the U-mode window, CSRs, and threshold exist.
    pub user: bool,
    /// Whether selective hardware vectoring (per-interrupt vector-table
    /// dispatch) is supported. When off, the `shv` attribute bit is
    /// write-masked and every interrupt enters at the fixed trap vector.
    pub selective_vectoring: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interrupt_count: 64,
            trigger_count: 16,
            supervisor: true,
            user: true,
            selective_vectoring: false,
        }
    }
}

/// The execution-core collaborator, as seen from the controller.
///
/// Supplies the hart's current privilege level and accepts the side effects
/// of interrupt delivery. The core is also expected to feed synthesized
/// [`InterruptTrap`]s back into [`Clic::enter_trap`] together with the saved
/// return pc.
pub trait Hart {
    fn privilege_level(&self) -> PrivilegeLevel;

    fn set_privilege_level(&mut self, level: PrivilegeLevel);

    /// Release a wait-for-interrupt hold, if the hart is in one.
    fn clear_wfi(&mut self);
}

/// Address-translating memory collaborator, used only to fetch handler
/// pointers from the trap vector table for selectively vectored interrupts.
pub trait VectorMemory {
    fn load_u32(&mut self, address: u32) -> Result<u32, MemoryError>;
}

/// Errors a [`VectorMemory`] fetch can produce.
///
/// These propagate out of [`Clic::enter_trap`] untouched; the caller turns
/// them into its own access-fault trap and may restart the entry sequence
/// later.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("misaligned memory access")]
    MisalignedAccess,
    #[error("memory access fault")]
    AccessFault,
    #[error("memory page fault")]
    PageFault,
}

/// The CSR shadows banked per privilege mode.
#[derive(Debug, Clone, Default)]
struct ModeCsrs {
    cause: Cause,
    epc: u32,
    tvec: Tvec,
    tvt: Tvt,
    intthresh: IntThresh,
    scratch: u32,
}

/// Interrupt-arbitration and trap-delivery core of one hart's CLIC.
#[derive(Debug, Clone)]
pub struct Clic {
    config: Config,
    regfile: RegisterFile,
    status: Status,
    intstatus: IntStatus,
    m: ModeCsrs,
    s: ModeCsrs,
    u: ModeCsrs,

    // Interrupt context of the running handler (current) and of the context
    // it preempted (previous). The previous values are banked at trap entry;
    // restoring them on trap return is the execution core's business.
    curr_priv: PrivilegeLevel,
    curr_ie: bool,
    curr_level: u8,
    prev_priv: PrivilegeLevel,
    prev_ie: bool,
    prev_level: u8,

    // Result of the last arbitration pass. Trap entry re-uses this rather
    // than re-scanning, so presentation and entry agree on the winner.
    selection: Selection,
}

impl Clic {
    /// Create a new controller in reset state.
    ///
    /// # Panics
    ///
    /// Panics if `config.interrupt_count` or `config.trigger_count` is out of
    /// range for the window layout.
    pub fn new(config: Config) -> Self {
        assert!(
            (2..=MAX_INTERRUPTS).contains(&config.interrupt_count),
            "interrupt count must be in 2..=4096"
        );
        assert!(
            config.trigger_count <= MAX_TRIGGERS,
            "trigger count must be at most 32"
        );
        let regfile = RegisterFile::new(&config);
        let mut clic = Self {
            config,
            regfile,
            status: Status::new(),
            intstatus: IntStatus::new(),
            m: ModeCsrs::default(),
            s: ModeCsrs::default(),
            u: ModeCsrs::default(),
            curr_priv: PrivilegeLevel::User,
            curr_ie: false,
            curr_level: 0,
            prev_priv: PrivilegeLevel::User,
            prev_ie: false,
            prev_level: 0,
            selection: Selection::NONE,
        };
        clic.reset();
        clic
    }

    /// Force the controller back to its reset state.
    ///
    /// Clears the interrupt context and the level bookkeeping in the cause
    /// and interrupt-status shadows. The interrupt tables, vector bases, and
    /// scratch registers are left alone, as on a real hart reset line.
    pub fn reset(&mut self) {
        self.curr_priv = PrivilegeLevel::User;
        self.curr_ie = false;
        self.curr_level = 0;
        self.prev_priv = PrivilegeLevel::User;
        self.prev_ie = false;
        self.prev_level = 0;
        self.selection = Selection::NONE;
        for mode in self.implemented_modes() {
            self.intstatus.set_level(mode, 0);
            self.mode_mut(mode).cause.set_previous_level(0);
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The result of the last arbitration pass.
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Re-scan the interrupt table for the highest-ranked pending-and-enabled
    /// interrupt and cache the result for the following trap entry.
    pub fn update_selection(&mut self) -> Selection {
        self.selection = arbiter::select(&self.regfile);
        self.selection
    }

    /// Load from the register-file window of privilege level `window`.
    /// See [`regfile::RegisterFile::load`].
    pub fn load(
        &self,
        window: PrivilegeLevel,
        address: u32,
        buf: &mut [u8],
    ) -> crate::bus::AccessResult {
        self.regfile.load(window, address, buf)
    }

    /// Store to the register-file window of privilege level `window`.
    /// See [`regfile::RegisterFile::store`].
    pub fn store(
        &mut self,
        window: PrivilegeLevel,
        address: u32,
        buf: &[u8],
    ) -> crate::bus::AccessResult {
        self.regfile.store(window, address, buf)
    }

    /// Read-only view of the register file for diagnostic/trace components.
    pub fn regfile(&self) -> &RegisterFile {
        &self.regfile
    }

    fn mode(&self, mode: PrivilegeLevel) -> &ModeCsrs {
        match mode {
            PrivilegeLevel::Machine => &self.m,
            PrivilegeLevel::Supervisor => &self.s,
            PrivilegeLevel::User => &self.u,
        }
    }

    fn mode_mut(&mut self, mode: PrivilegeLevel) -> &mut ModeCsrs {
        match mode {
            PrivilegeLevel::Machine => &mut self.m,
            PrivilegeLevel::Supervisor => &mut self.s,
            PrivilegeLevel::User => &mut self.u,
        }
    }

    fn implemented_modes(&self) -> impl Iterator<Item = PrivilegeLevel> {
        let supervisor = self.config.supervisor;
        let user = self.config.user;
        [
            Some(PrivilegeLevel::Machine),
            supervisor.then_some(PrivilegeLevel::Supervisor),
            user.then_some(PrivilegeLevel::User),
        ]
        .into_iter()
        .flatten()
    }

    /// Whether `mode`'s threshold register takes part in level clamping.
    fn threshold_implemented(&self, mode: PrivilegeLevel) -> bool {
        match mode {
            PrivilegeLevel::Machine => true,
            PrivilegeLevel::Supervisor => self.config.supervisor,
            PrivilegeLevel::User => self.config.user,
        }
    }

    /// The mode's current interrupt level, clamped up to its threshold.
    fn effective_level(&self, mode: PrivilegeLevel) -> u8 {
        let level = self.intstatus.level(mode);
        match self.threshold_implemented(mode) {
            true => level.max(self.mode(mode).intthresh.threshold()),
            false => level,
        }
    }
}
