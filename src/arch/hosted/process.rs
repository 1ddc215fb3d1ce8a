use std::cell::{Cell, RefCell};

/// Same layout as the hardware build so environment state is identical
/// under test.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct TrapFrame {
    pub regs: [usize; 32],
    pub sstatus: usize,
    pub sepc: usize,
    pub sie: usize,
    pub sscratch: usize,
    pub stvec: usize,
}

impl TrapFrame {
    pub const fn zeroed() -> Self {
        TrapFrame { regs: [0; 32], sstatus: 0, sepc: 0, sie: 0, sscratch: 0, stvec: 0 }
    }
}

pub const SSTATUS_SPIE: usize = 1 << 5;
pub const SIE_STIE: usize = 1 << 5;

/// Where `stvec` points on hardware. Any distinct value works for the
/// simulation; dispatch only copies it into saved frames.
const TRAP_ENTRY: usize = 0xffff_f000;

std::thread_local! {
    static TRAP_STACK: RefCell<TrapFrame> = RefCell::new(TrapFrame::zeroed());
    static SEPC: Cell<usize> = Cell::new(0);
}

pub fn trap_entry() -> usize {
    TRAP_ENTRY
}

/// The simulated frame slot below KSTACKTOP. Tests poke outgoing state
/// in here before a dispatch and read it back afterwards.
pub fn trap_frame_top() -> *mut TrapFrame {
    TRAP_STACK.with(|t| t.as_ptr())
}

pub fn load_sepc(sepc: usize) {
    SEPC.with(|s| s.set(sepc));
}

pub fn loaded_sepc() -> usize {
    SEPC.with(|s| s.get())
}

pub unsafe fn resume(_frame: *const TrapFrame) -> ! {
    unreachable!("user-mode resume on a hosted build");
}
