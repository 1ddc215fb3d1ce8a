#![cfg_attr(baremetal, no_main)]
#![cfg_attr(baremetal, no_std)]

#[macro_use]
extern crate bitflags;

#[macro_use]
mod debug;

#[cfg(all(test, not(baremetal)))]
mod test;

mod arch;
mod elf;
mod env;
mod error;
mod mem;
mod sched;

#[cfg(baremetal)]
use core::panic::PanicInfo;
#[cfg(baremetal)]
#[panic_handler]
fn handle_panic(arg: &PanicInfo) -> ! {
    println!("KERNEL PANIC!");
    println!("Details: {}", arg);
    loop {
        arch::idle();
    }
}

#[cfg(all(baremetal, feature = "init-image"))]
extern "C" {
    static _user_init_start: u8;
    static _user_init_end: u8;
}

/// Baremetal boot, entered from `_start` with the kernel stack live and
/// translation off. Order matters: frames first, then the process table
/// (which builds the template and turns paging on), then the first
/// environments, then the scheduler, which never comes back.
#[cfg(baremetal)]
#[no_mangle]
pub extern "C" fn kinit() -> ! {
    println!("tern: supervisor mode up");
    arch::init();
    mem::MemoryManager::with_mut(|mm| mm.init());
    env::EnvTable::with_mut(|table| table.init());

    #[cfg(feature = "debug-print")]
    env::debug_env();

    #[cfg(feature = "init-image")]
    {
        let image = unsafe {
            let start = &_user_init_start as *const u8;
            let len = &_user_init_end as *const u8 as usize - start as usize;
            core::slice::from_raw_parts(start, len)
        };
        #[cfg(feature = "debug-print")]
        elf::debug_elf(image);
        env::EnvTable::with_mut(|table| table.create(image, 1));
    }

    sched::schedule(true);
}

/// Hosted builds exist for the test suite; running the binary just brings
/// the tables up and reports.
#[cfg(not(baremetal))]
fn main() {
    arch::init();
    mem::MemoryManager::with_mut(|mm| mm.init());
    env::EnvTable::with_mut(|table| table.init());
    println!(
        "tern (hosted): {} environment slots, {} frames free",
        env::NENV,
        mem::MemoryManager::with(|mm| mm.frames_free())
    );
}
