use std::cell::Cell;

std::thread_local! {
    static ARMED_TIMER: Cell<Option<u64>> = Cell::new(None);
    static SIE_CLEARED: Cell<bool> = Cell::new(false);
}

pub fn disable_supervisor_interrupts() {
    SIE_CLEARED.with(|c| c.set(true));
}

pub fn set_timer(deadline: u64) -> isize {
    ARMED_TIMER.with(|t| t.set(Some(deadline)));
    0
}

/// Most recent deadline handed to the simulated firmware timer.
pub fn armed_timer() -> Option<u64> {
    ARMED_TIMER.with(|t| t.get())
}

pub fn supervisor_interrupts_disabled() -> bool {
    SIE_CLEARED.with(|c| c.get())
}
