use crate::env::{self, EnvStatus, EnvTable};

/// Round-robin over the run queue with per-environment budgets. The
/// current environment keeps the CPU until it yields, stops being
/// runnable, or exhausts a budget equal to its priority; then the queue
/// head takes over and the old holder rotates to the tail.
pub fn schedule(yield_now: bool) -> ! {
    let pick = EnvTable::with_mut(|table| {
        let cur = table.cur();
        let cur_runnable =
            cur.map(|c| table.env(c).status == EnvStatus::Runnable).unwrap_or(false);

        let pick = if yield_now || table.sched_budget == 0 || !cur_runnable {
            if let Some(c) = cur {
                if cur_runnable {
                    table.sched_rotate(c);
                }
            }
            let next = table
                .sched_first()
                .unwrap_or_else(|| panic!("schedule: no runnable envs"));
            table.sched_budget = table.env(next).priority;
            next
        } else {
            cur.unwrap()
        };
        table.sched_budget = table.sched_budget.saturating_sub(1);
        pick
    });
    env::env_run(pick)
}
