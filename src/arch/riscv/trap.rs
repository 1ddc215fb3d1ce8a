use core::fmt;

use riscv::register::{scause, stval};

use super::process::TrapFrame;

/// Decoded scause, paired with the trapping pc and stval.
#[derive(PartialEq, Debug)]
pub enum Trap {
    SupervisorSoftware(usize),
    SupervisorTimer(usize),
    SupervisorExternal(usize),
    InstructionMisaligned(usize, usize),
    InstructionAccessFault(usize, usize),
    IllegalInstruction(usize, usize),
    Breakpoint(usize),
    LoadMisaligned(usize, usize),
    LoadAccessFault(usize, usize),
    StoreMisaligned(usize, usize),
    StoreAccessFault(usize, usize),
    UserCall(usize),
    SupervisorCall(usize),
    InstructionPageFault(usize, usize),
    LoadPageFault(usize, usize),
    StorePageFault(usize, usize),
    Unknown(usize, usize, usize),
}

impl Trap {
    pub fn from_regs(cause: usize, epc: usize, tval: usize) -> Trap {
        use Trap::*;
        const INTERRUPT: usize = 1 << (usize::BITS as usize - 1);
        if cause & INTERRUPT != 0 {
            return match cause & !INTERRUPT {
                1 => SupervisorSoftware(epc),
                5 => SupervisorTimer(epc),
                9 => SupervisorExternal(epc),
                _ => Unknown(cause, epc, tval),
            };
        }
        match cause {
            0 => InstructionMisaligned(epc, tval),
            1 => InstructionAccessFault(epc, tval),
            2 => IllegalInstruction(epc, tval),
            3 => Breakpoint(epc),
            4 => LoadMisaligned(epc, tval),
            5 => LoadAccessFault(epc, tval),
            6 => StoreMisaligned(epc, tval),
            7 => StoreAccessFault(epc, tval),
            8 => UserCall(epc),
            9 => SupervisorCall(epc),
            12 => InstructionPageFault(epc, tval),
            13 => LoadPageFault(epc, tval),
            15 => StorePageFault(epc, tval),
            _ => Unknown(cause, epc, tval),
        }
    }
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        use Trap::*;
        match *self {
            SupervisorSoftware(epc) => write!(f, "supervisor software interrupt at {:#x}", epc),
            SupervisorTimer(epc) => write!(f, "supervisor timer interrupt at {:#x}", epc),
            SupervisorExternal(epc) => write!(f, "supervisor external interrupt at {:#x}", epc),
            InstructionMisaligned(epc, a) => write!(f, "misaligned fetch of {:#x} at {:#x}", a, epc),
            InstructionAccessFault(epc, a) => write!(f, "fetch fault of {:#x} at {:#x}", a, epc),
            IllegalInstruction(epc, i) => write!(f, "illegal instruction {:#x} at {:#x}", i, epc),
            Breakpoint(epc) => write!(f, "breakpoint at {:#x}", epc),
            LoadMisaligned(epc, a) => write!(f, "misaligned load of {:#x} at {:#x}", a, epc),
            LoadAccessFault(epc, a) => write!(f, "load fault of {:#x} at {:#x}", a, epc),
            StoreMisaligned(epc, a) => write!(f, "misaligned store to {:#x} at {:#x}", a, epc),
            StoreAccessFault(epc, a) => write!(f, "store fault to {:#x} at {:#x}", a, epc),
            UserCall(epc) => write!(f, "environment call from U-mode at {:#x}", epc),
            SupervisorCall(epc) => write!(f, "environment call from S-mode at {:#x}", epc),
            InstructionPageFault(epc, a) => write!(f, "fetch page fault of {:#x} at {:#x}", a, epc),
            LoadPageFault(epc, a) => write!(f, "load page fault of {:#x} at {:#x}", a, epc),
            StorePageFault(epc, a) => write!(f, "store page fault of {:#x} at {:#x}", a, epc),
            Unknown(c, epc, a) => {
                write!(f, "unknown trap cause {:#x} (tval {:#x}) at {:#x}", c, a, epc)
            }
        }
    }
}

/// All traps funnel here from `exc_gen_entry` with a0 pointing at the
/// frame just pushed below KSTACKTOP. The timer tick re-enters the
/// scheduler; everything else is fatal until a syscall layer claims it.
#[no_mangle]
pub extern "C" fn kernel_trap_handler(frame: &mut TrapFrame) -> ! {
    let trap = Trap::from_regs(scause::read().bits(), frame.sepc, stval::read());
    match trap {
        Trap::SupervisorTimer(_) => crate::sched::schedule(false),
        Trap::UserCall(_) => {
            // No syscall layer is wired up yet; an environment call means
            // the caller is done.
            let cur = crate::env::EnvTable::with(|t| t.cur())
                .unwrap_or_else(|| panic!("ecall from user with no current env"));
            crate::env::env_destroy(cur);
            crate::sched::schedule(true)
        }
        other => panic!("unhandled trap: {}", other),
    }
}
