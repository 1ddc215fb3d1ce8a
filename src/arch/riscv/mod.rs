pub mod irq;
pub mod mem;
pub mod process;
pub mod sbi;
pub mod trap;

use crate::mem::{KSTACKTOP, VIRTIO_MMIO_BASE};

// The firmware drops us here in supervisor mode with translation off.
// Nothing below KSTACKTOP is allocatable, so the boot stack can simply
// start at the top of the reserved region.
core::arch::global_asm!(
    r#"
    .section .text.entry
    .globl _start
    .align 2
_start:
    li sp, {kstack}
    j kinit
"#,
    kstack = const KSTACKTOP,
);

pub fn init() {
    // Traps that arrive before the first environment runs still need a
    // vector; dispatch rewrites stvec from the saved frame on every return.
    unsafe {
        core::arch::asm!("csrw stvec, {0}", in(reg) process::trap_entry());
    }
}

/// Probe the remapped VirtIO window. The transport is managed elsewhere;
/// boot only confirms the device is where the template maps it.
pub fn platform_init() {
    let magic = unsafe { (VIRTIO_MMIO_BASE as *const u32).read_volatile() };
    if magic == 0x7472_6976 {
        klog!("virtio: mmio window live at {:#x}", VIRTIO_MMIO_BASE);
    }
}

/// Park the hart until the next interrupt.
pub fn idle() {
    unsafe { riscv::asm::wfi() };
}
