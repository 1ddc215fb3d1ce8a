use std::cell::Cell;

// The simulated layout mirrors Sv39; hosted builds always run the
// 64-bit constants.
pub const SATP_MODE: usize = 8 << 60;
const ASID_SHIFT: usize = 44;

std::thread_local! {
    static SATP: Cell<usize> = Cell::new(0);
    static FENCES: Cell<usize> = Cell::new(0);
}

pub fn satp_encode(asid: usize, root: usize) -> usize {
    SATP_MODE | (asid << ASID_SHIFT) | (root >> crate::mem::PAGE_SHIFT)
}

pub fn activate(satp: usize) {
    SATP.with(|s| s.set(satp));
}

pub fn set_bare() {
    activate(0);
}

pub fn read() -> usize {
    SATP.with(|s| s.get())
}

pub fn sfence_asid(_asid: usize) {
    FENCES.with(|f| f.set(f.get() + 1));
}

pub fn sfence_all() {
    FENCES.with(|f| f.set(f.get() + 1));
}

/// Number of TLB fences issued on this thread. Test observability only.
pub fn fence_count() -> usize {
    FENCES.with(|f| f.get())
}
