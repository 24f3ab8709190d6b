//! Trap-vector base registers (xtvec and xtvt).

/// Alignment mask for both trap-vector bases: the low six bits are ignored
/// when forming a handler address.
const ALIGN_MASK: u32 = !0x3F;

/// Trap vector base register (mtvec, stvec, utvec).
///
/// In CLIC operation all interrupts of a mode enter at a single fixed base;
/// the per-cause vectoring of the original CLINT-mode register does not
/// apply. The raw value round-trips on read/write, only the handler address
/// is masked.
#[derive(Debug, Clone)]
pub struct Tvec(u32);

impl Default for Tvec {
    fn default() -> Self {
        Self::new()
    }
}

impl Tvec {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = self.0 & !mask | value & mask;
    }

    /// Non-vectored entry point for every interrupt of this mode.
    pub fn handler_base(&self) -> u32 {
        self.0 & ALIGN_MASK
    }
}

/// Trap vector table base register (mtvt, stvt, utvt).
///
/// Holds the base of the table of handler pointers consulted for selectively
/// hardware-vectored interrupts and by the fast-redispatch CSRs.
#[derive(Debug, Clone)]
pub struct Tvt(u32);

impl Default for Tvt {
    fn default() -> Self {
        Self::new()
    }
}

impl Tvt {
    pub fn new() -> Self {
        Self(0x0000_0000)
    }

    pub fn read(&self) -> u32 {
        self.0
    }

    pub fn write(&mut self, value: u32, mask: u32) {
        self.0 = self.0 & !mask | value & mask;
    }

    /// Address of the handler pointer for interrupt `id`: one machine word
    /// per interrupt, starting at the aligned table base.
    pub fn entry_address(&self, id: u16) -> u32 {
        (self.0 & ALIGN_MASK) + 4 * id as u32
    }
}
