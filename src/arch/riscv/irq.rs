use riscv::register::sstatus;

/// Clear SSTATUS.SIE. The return to user mode re-enables interrupts
/// through SPIE, so this only affects the remaining kernel path.
pub fn disable_supervisor_interrupts() {
    unsafe { sstatus::clear_sie() };
}

/// Arm the firmware timer. Returns the SBI status code (0 on success).
pub fn set_timer(deadline: u64) -> isize {
    super::sbi::set_timer(deadline)
}
