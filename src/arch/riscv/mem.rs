//! The translation CSR and TLB maintenance. The walker itself lives in
//! `crate::mem`; this module only flips the hardware state, in the order
//! the lifecycle code dictates.

#[cfg(target_arch = "riscv64")]
mod satp_layout {
    pub const SATP_MODE: usize = 8 << 60; // Sv39
    pub const ASID_SHIFT: usize = 44;
}

#[cfg(target_arch = "riscv32")]
mod satp_layout {
    pub const SATP_MODE: usize = 1 << 31; // Sv32
    pub const ASID_SHIFT: usize = 22;
}

use satp_layout::*;

pub fn satp_encode(asid: usize, root: usize) -> usize {
    SATP_MODE | (asid << ASID_SHIFT) | (root >> crate::mem::PAGE_SHIFT)
}

/// Install a new translation root. Takes effect at the next fence or
/// privilege transition.
pub fn activate(satp: usize) {
    unsafe { core::arch::asm!("csrw satp, {0}", in(reg) satp) };
}

/// Drop to bare translation. Must precede any teardown of the tables the
/// MMU was walking.
pub fn set_bare() {
    unsafe { core::arch::asm!("csrw satp, zero") };
}

pub fn read() -> usize {
    let satp: usize;
    unsafe { core::arch::asm!("csrr {0}, satp", out(reg) satp) };
    satp
}

/// Invalidate every translation tagged with `asid`.
pub fn sfence_asid(asid: usize) {
    unsafe { core::arch::asm!("sfence.vma x0, {0}", in(reg) asid) };
}

/// Full TLB barrier.
pub fn sfence_all() {
    unsafe { core::arch::asm!("sfence.vma x0, x0") };
}
