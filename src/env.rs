//! The process table. Each environment is a fixed slot carrying an id, an
//! ASID, a page-directory root, and a saved trap frame. Slots thread two
//! intrusive lists at once (the free list and the run queue), linked by
//! index so nothing allocates on the lifecycle fast path.

use core::mem;
use core::ptr;

use crate::arch;
use crate::arch::process::{TrapFrame, SIE_STIE, SSTATUS_SPIE};
use crate::elf;
use crate::error::{KernelError, Result};
use crate::mem::{
    MemoryManager, PteFlags, ENVS, KERNBASE, KERN_INDEX, MEMORY_SIZE, PAGES, PAGE_SIZE,
    PAGE_TABLE, PENVS, PN_SHIFT, USTACKTOP, VIRTIO_MMIO_BASE, VIRTIO_MMIO_PHYS,
    VIRTIO_MMIO_SIZE,
};

pub const LOG2NENV: usize = 11;
pub const NENV: usize = 1 << LOG2NENV;

// Hardware address-space tags. The bitmap wants a multiple of 32.
pub const NASID: usize = 64;

/// Absolute deadline of the first tick and the spacing of every tick
/// after it, in timebase units.
const INIT_TIME: u64 = 20_000_000;
const DELTA_TIME: u64 = 30_000;

#[cfg(feature = "sched-trace")]
const DISPATCH_CAP: u32 = 10_000;

/// List terminator for the intrusive index links.
const NIL: u32 = u32::MAX;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum EnvStatus {
    Free = 0,
    Runnable,
    NotRunnable,
}

/// One process slot. The whole array is mapped read-only into user space
/// at `ENVS`, so the layout is fixed and everything here is public.
#[repr(C)]
pub struct Env {
    pub id: u32,
    pub parent_id: u32,
    pub status: EnvStatus,
    pub asid: u32,
    pub priority: u32,
    pub runs: u32,
    /// Physical address of this environment's root directory; zero until
    /// the address space is built.
    pub pgdir: usize,
    /// User-level page-fault upcall, zero when unset.
    pub user_tlb_mod_entry: usize,
    pub tf: TrapFrame,
    link: u32,
    sched_prev: u32,
    sched_next: u32,
}

impl Env {
    const fn vacant() -> Env {
        Env {
            id: 0,
            parent_id: 0,
            status: EnvStatus::Free,
            asid: 0,
            priority: 0,
            runs: 0,
            pgdir: 0,
            user_tlb_mod_entry: 0,
            tf: TrapFrame::zeroed(),
            link: NIL,
            sched_prev: NIL,
            sched_next: NIL,
        }
    }
}

#[repr(align(4096))]
struct EnvArray([Env; NENV]);

/// Kernel-wide process state: the slot array, both lists, the ASID
/// bitmap, the template directory, and the dispatch bookkeeping. Single
/// hart, interrupts off in the kernel, so access is uncontended by
/// construction; the accessor gates only make the ownership explicit.
pub struct EnvTable {
    envs: EnvArray,
    pub(crate) free_head: u32,
    sched_head: u32,
    sched_tail: u32,
    id_counter: u32,
    asid_bitmap: [u32; NASID / 32],
    cur: u32,
    pub cur_pgdir: usize,
    base_pgdir: usize,
    pub(crate) sched_budget: u32,
    time: u64,
    #[cfg(feature = "sched-trace")]
    dispatches: u32,
}

#[cfg(not(baremetal))]
std::thread_local!(static ENV_TABLE: core::cell::RefCell<EnvTable> = core::cell::RefCell::new(EnvTable::default_hack()));

#[cfg(baremetal)]
static mut ENV_TABLE: EnvTable = EnvTable::default_hack();

impl EnvTable {
    const fn default_hack() -> Self {
        const VACANT: Env = Env::vacant();
        EnvTable {
            envs: EnvArray([VACANT; NENV]),
            free_head: NIL,
            sched_head: NIL,
            sched_tail: NIL,
            id_counter: 0,
            asid_bitmap: [0; NASID / 32],
            cur: NIL,
            cur_pgdir: 0,
            base_pgdir: 0,
            sched_budget: 0,
            time: INIT_TIME,
            #[cfg(feature = "sched-trace")]
            dispatches: 0,
        }
    }

    pub fn with_mut<F, R>(f: F) -> R
    where
        F: FnOnce(&mut EnvTable) -> R,
    {
        #[cfg(baremetal)]
        unsafe {
            f(&mut *core::ptr::addr_of_mut!(ENV_TABLE))
        }

        #[cfg(not(baremetal))]
        ENV_TABLE.with(|t| f(&mut t.borrow_mut()))
    }

    pub fn with<F, R>(f: F) -> R
    where
        F: FnOnce(&EnvTable) -> R,
    {
        #[cfg(baremetal)]
        unsafe {
            f(&*core::ptr::addr_of!(ENV_TABLE))
        }

        #[cfg(not(baremetal))]
        ENV_TABLE.with(|t| f(&t.borrow()))
    }

    pub fn env(&self, idx: usize) -> &Env {
        &self.envs.0[idx]
    }

    pub fn env_mut(&mut self, idx: usize) -> &mut Env {
        &mut self.envs.0[idx]
    }

    pub fn cur(&self) -> Option<usize> {
        if self.cur == NIL { None } else { Some(self.cur as usize) }
    }

    pub fn base_pgdir(&self) -> usize {
        self.base_pgdir
    }

    /// Physical address and mapped extent of the slot array, as seen
    /// through the `ENVS` window.
    pub fn envs_base(&self) -> usize {
        ptr::addr_of!(self.envs) as usize
    }

    pub fn envs_bytes(&self) -> usize {
        mem::size_of::<EnvArray>()
    }

    // ---- ASID allocator -------------------------------------------------

    /// Lowest clear bit wins, so tags are handed out deterministically.
    fn asid_alloc(&mut self) -> Result<u32> {
        for i in 0..NASID {
            let index = i >> 5;
            let inner = i & 31;
            if self.asid_bitmap[index] & (1 << inner) == 0 {
                self.asid_bitmap[index] |= 1 << inner;
                return Ok(i as u32);
            }
        }
        Err(KernelError::NoFreeAsid)
    }

    fn asid_free(&mut self, asid: u32) {
        let index = (asid >> 5) as usize;
        let inner = asid & 31;
        self.asid_bitmap[index] &= !(1 << inner);
    }

    pub fn asid_live(&self, asid: u32) -> bool {
        self.asid_bitmap[(asid >> 5) as usize] & (1 << (asid & 31)) != 0
    }

    // ---- identifiers ----------------------------------------------------

    /// Ids pack a never-reused counter above the slot index, so a stale id
    /// for a recycled slot fails the match in `envid2env`.
    fn mkenvid(&mut self, idx: usize) -> u32 {
        self.id_counter += 1;
        (self.id_counter << (1 + LOG2NENV)) | idx as u32
    }

    /// Resolve an environment id. Id zero names the current environment.
    /// When `check_perm` is a caller's id, the target must be that caller
    /// itself or one of its direct children.
    pub fn envid2env(&self, envid: u32, check_perm: u32) -> Result<usize> {
        if envid == 0 {
            return self.cur().ok_or(KernelError::BadEnv);
        }
        let idx = (envid as usize) & (NENV - 1);
        let e = &self.envs.0[idx];
        if e.status == EnvStatus::Free || e.id != envid {
            return Err(KernelError::BadEnv);
        }
        if check_perm != 0 && e.id != check_perm && e.parent_id != check_perm {
            return Err(KernelError::BadEnv);
        }
        Ok(idx)
    }

    // ---- boot -----------------------------------------------------------

    /// Reset the table, build the template directory, and switch the
    /// kernel itself onto it. Every mapping the template carries is shared
    /// verbatim with each environment created later.
    pub fn init(&mut self) {
        // Seed the free list in reverse so the first alloc hands out slot 0.
        self.free_head = NIL;
        for i in (0..NENV).rev() {
            let e = &mut self.envs.0[i];
            *e = Env::vacant();
            e.link = self.free_head;
            self.free_head = i as u32;
        }
        self.sched_head = NIL;
        self.sched_tail = NIL;
        self.id_counter = 0;
        self.cur = NIL;
        self.cur_pgdir = 0;
        self.sched_budget = 0;
        self.time = INIT_TIME;
        #[cfg(feature = "sched-trace")]
        {
            self.dispatches = 0;
        }

        // Tag zero belongs to the kernel and the template.
        self.asid_bitmap = [0; NASID / 32];
        self.asid_bitmap[0] |= 1;

        let envs_pa = ptr::addr_of!(self.envs) as usize;
        let envs_bytes = round_page(mem::size_of::<EnvArray>());
        let mut base = 0usize;
        MemoryManager::with_mut(|mm| -> Result<()> {
            let pages_pa = mm.pages_base();
            let pages_bytes = round_page(mm.pages_size());
            // User-readable windows onto the kernel's bookkeeping arrays.
            mm.map_pages(&mut base, 0, pages_pa, PAGES, pages_bytes, PteFlags::R | PteFlags::G | PteFlags::U)?;
            mm.map_pages(&mut base, 0, envs_pa, ENVS, envs_bytes, PteFlags::R | PteFlags::G | PteFlags::U)?;
            // All of DRAM, identity, so the kernel keeps running once satp
            // flips on.
            mm.map_pages(&mut base, 0, KERNBASE, KERNBASE, MEMORY_SIZE, PteFlags::R | PteFlags::W | PteFlags::X)?;
            // The VirtIO window, remapped from its bus address.
            mm.map_pages(&mut base, 0, VIRTIO_MMIO_PHYS, VIRTIO_MMIO_BASE, VIRTIO_MMIO_SIZE, PteFlags::R | PteFlags::W)?;
            Ok(())
        })
        .unwrap_or_else(|e| panic!("env table init: {}", e));
        self.base_pgdir = base;

        arch::mem::activate(arch::mem::satp_encode(0, base));
        arch::mem::sfence_all();
        klog!("paging live, template root {:#x}", base);

        arch::platform_init();
    }

    // ---- address-space builder ------------------------------------------

    /// Give a fresh slot the mappings it needs before any user page
    /// exists: the self-map and the shared pages/envs window. The kernel
    /// window proper is stitched in `create`/`prepare_run`.
    fn setup_vm(&mut self, asid: u32) -> Result<usize> {
        let base = self.base_pgdir;
        MemoryManager::with_mut(|mm| {
            let mut root = 0usize;
            mm.alloc_pgdir(&mut root)?;
            let root_pa = root;
            // The directory appears inside its own page-table window,
            // readable but never writable from user mode.
            let self_va = PAGE_TABLE + (PAGE_TABLE >> PN_SHIFT) + (PAGE_TABLE >> (2 * PN_SHIFT));
            if let Err(e) = mm.map_page(&mut root, asid as usize, self_va, root_pa, PteFlags::R | PteFlags::U) {
                mm.destroy_pgdir(&mut root, asid as usize);
                return Err(e);
            }
            // Share the pages/envs window by copying the template's root
            // entries, re-asserting V.
            #[cfg(target_pointer_width = "64")]
            {
                let pte = mm.root_entry(base, PENVS) | PteFlags::V.bits();
                mm.set_root_entry(root, PENVS, pte);
            }
            #[cfg(target_pointer_width = "32")]
            {
                for idx in PENVS..=PENVS + 1 {
                    let pte = mm.root_entry(base, idx) | PteFlags::V.bits();
                    mm.set_root_entry(root, idx, pte);
                }
            }
            Ok(root)
        })
    }

    fn stitch_kernel_window(mm: &mut MemoryManager, base: usize, root: usize) {
        #[cfg(target_pointer_width = "64")]
        {
            let pte = mm.root_entry(base, KERN_INDEX);
            mm.set_root_entry(root, KERN_INDEX, pte);
        }
        #[cfg(target_pointer_width = "32")]
        {
            for idx in KERN_INDEX..0x400 {
                let pte = mm.root_entry(base, idx);
                mm.set_root_entry(root, idx, pte);
            }
        }
    }

    fn stitch_penvs_window(mm: &mut MemoryManager, base: usize, root: usize) {
        #[cfg(target_pointer_width = "64")]
        {
            let pte = mm.root_entry(base, PENVS) | PteFlags::V.bits();
            mm.set_root_entry(root, PENVS, pte);
        }
        #[cfg(target_pointer_width = "32")]
        {
            for idx in PENVS..=PENVS + 1 {
                let pte = mm.root_entry(base, idx) | PteFlags::V.bits();
                mm.set_root_entry(root, idx, pte);
            }
        }
    }

    // ---- lifecycle ------------------------------------------------------

    /// Take a slot off the free list and build its identity, tag, and
    /// address space. The slot comes back `NotRunnable`; the caller
    /// decides when it may be scheduled.
    pub fn alloc(&mut self, parent_id: u32) -> Result<usize> {
        if self.free_head == NIL {
            return Err(KernelError::NoFreeEnv);
        }
        let idx = self.free_head as usize;

        let id = self.mkenvid(idx);
        let asid = self.asid_alloc()?;
        let root = match self.setup_vm(asid) {
            Ok(root) => root,
            Err(e) => {
                self.asid_free(asid);
                return Err(e);
            }
        };

        let next_free = self.envs.0[idx].link;
        let e = &mut self.envs.0[idx];
        e.id = id;
        e.parent_id = parent_id;
        e.asid = asid;
        e.pgdir = root;
        e.runs = 0;
        e.user_tlb_mod_entry = 0;
        e.status = EnvStatus::NotRunnable;

        e.tf = TrapFrame::zeroed();
        // Leave room above the stack pointer for argc and argv.
        let sp = USTACKTOP - mem::size_of::<i32>() - mem::size_of::<usize>();
        e.tf.regs[2] = sp;
        e.tf.sscratch = sp;
        e.tf.sstatus = SSTATUS_SPIE;
        e.tf.sie = SIE_STIE;

        e.link = NIL;
        self.free_head = next_free;
        Ok(idx)
    }

    /// Build a runnable environment from an ELF image held in kernel
    /// memory. Only used while booting, so any failure is fatal.
    pub fn create(&mut self, binary: &[u8], priority: u32) -> usize {
        let idx = self
            .alloc(0)
            .unwrap_or_else(|e| panic!("env create: {}", e));
        self.envs.0[idx].priority = priority;
        self.envs.0[idx].status = EnvStatus::Runnable;

        self.load_icode(idx, binary);

        let base = self.base_pgdir;
        let root = self.envs.0[idx].pgdir;
        MemoryManager::with_mut(|mm| Self::stitch_kernel_window(mm, base, root));

        self.sched_insert_head(idx);
        idx
    }

    fn load_icode(&mut self, idx: usize, binary: &[u8]) {
        let ehdr = elf::from_bytes(binary)
            .unwrap_or_else(|| panic!("bad elf at {:p}", binary.as_ptr()));
        for ph in elf::program_headers(&ehdr, binary) {
            if ph.p_type == elf::PT_LOAD {
                let payload = &binary[ph.p_offset as usize..];
                elf::load_seg(&ph, payload, |va, offset, perm, src| {
                    self.load_icode_mapper(idx, va, offset, perm, src)
                })
                .unwrap_or_else(|e| panic!("load segment at {:#x}: {}", ph.p_vaddr, e));
            }
        }
        self.envs.0[idx].tf.sepc = ehdr.e_entry as usize;
    }

    /// Per-page callback for the segment loader: make sure the page at
    /// `va` exists in this environment, then land the file bytes in the
    /// backing frame.
    fn load_icode_mapper(
        &mut self,
        idx: usize,
        va: usize,
        offset: usize,
        perm: PteFlags,
        src: Option<&[u8]>,
    ) -> Result<()> {
        let asid = self.envs.0[idx].asid as usize;
        let mut root = self.envs.0[idx].pgdir;
        MemoryManager::with_mut(|mm| -> Result<()> {
            if !mm.is_mapped_page(root, va) {
                mm.alloc_page_user(&mut root, asid, va, perm)?;
            }
            if let Some(src) = src {
                debug_assert!(offset + src.len() <= PAGE_SIZE);
                let pa = mm
                    .get_pa(root, va)
                    .unwrap_or_else(|| panic!("mapper: {:#x} vanished after mapping", va));
                unsafe {
                    ptr::copy_nonoverlapping(src.as_ptr(), mm.phys_ptr(pa + offset), src.len())
                };
            }
            Ok(())
        })?;
        self.envs.0[idx].pgdir = root;
        Ok(())
    }

    /// Release everything a slot owns. The translation CSR drops to bare
    /// and the dying ASID is flushed *before* the directory is torn down;
    /// the MMU must never walk tables that are being freed.
    pub fn free(&mut self, idx: usize) {
        let _cur_id = self.cur().map(|c| self.envs.0[c].id).unwrap_or(0);
        klog!("[{:08x}] free env {:08x}", _cur_id, self.envs.0[idx].id);

        let asid = self.envs.0[idx].asid;
        let was_runnable = self.envs.0[idx].status == EnvStatus::Runnable;

        arch::mem::set_bare();
        arch::mem::sfence_asid(asid as usize);

        let mut root = self.envs.0[idx].pgdir;
        MemoryManager::with_mut(|mm| mm.destroy_pgdir(&mut root, asid as usize));
        self.envs.0[idx].pgdir = root;

        self.asid_free(asid);
        self.envs.0[idx].status = EnvStatus::Free;
        self.envs.0[idx].link = self.free_head;
        self.free_head = idx as u32;
        if was_runnable {
            self.sched_remove(idx);
        }
    }

    /// Free a slot; reports whether the caller just destroyed the current
    /// environment and must re-enter the scheduler.
    pub fn destroy(&mut self, idx: usize) -> bool {
        self.free(idx);
        if self.cur == idx as u32 {
            self.cur = NIL;
            klog!("i am killed ...");
            true
        } else {
            false
        }
    }

    // ---- dispatch -------------------------------------------------------

    #[cfg(feature = "sched-trace")]
    fn trace_dispatch(&mut self, idx: usize) {
        if self.dispatches > DISPATCH_CAP {
            println!("{:4}: dispatch count exceeded the limit {}", self.dispatches, DISPATCH_CAP);
            panic!("dispatch cap reached");
        }
        println!("{:4}: {:08x}", self.dispatches, self.envs.0[idx].id);
        self.dispatches += 1;
    }

    /// Steps 1 through 9 of a context switch: everything except the final
    /// register restore. Returns the frame `ret_from_exception` must pop.
    pub fn prepare_run(&mut self, idx: usize) -> *const TrapFrame {
        assert_eq!(
            self.envs.0[idx].status,
            EnvStatus::Runnable,
            "env {:08x} is not runnable",
            self.envs.0[idx].id
        );
        #[cfg(feature = "sched-trace")]
        self.trace_dispatch(idx);

        // Whatever was executing before this trap still owns the frame on
        // the trap stack; bank it before repointing cur.
        if let Some(cur) = self.cur() {
            self.envs.0[cur].tf = unsafe { *arch::process::trap_frame_top() };
        }

        self.cur = idx as u32;
        self.envs.0[idx].runs += 1;
        self.cur_pgdir = self.envs.0[idx].pgdir;

        arch::process::load_sepc(self.envs.0[idx].tf.sepc);
        // Interrupts stay off for the rest of the kernel path; sret turns
        // them back on through SPIE.
        arch::irq::disable_supervisor_interrupts();

        let base = self.base_pgdir;
        let root = self.envs.0[idx].pgdir;
        let asid = self.envs.0[idx].asid as usize;
        MemoryManager::with_mut(|mm| {
            // A slot freed on this root's watch may have left the next
            // directory without its kernel window; restore it before the
            // switch, then the shared pages/envs entry after.
            Self::stitch_kernel_window(mm, base, root);
            arch::mem::activate(arch::mem::satp_encode(asid, root));
            arch::mem::sfence_all();
            Self::stitch_penvs_window(mm, base, root);
        });

        self.envs.0[idx].tf.stvec = arch::process::trap_entry();

        let status = arch::irq::set_timer(self.time);
        assert_eq!(status, 0, "firmware timer rejected the deadline");
        self.time += DELTA_TIME;

        let e = &mut self.envs.0[idx];
        e.tf.sie |= SIE_STIE;
        e.tf.sstatus |= SSTATUS_SPIE;
        &e.tf as *const TrapFrame
    }

    // ---- run queue ------------------------------------------------------

    pub fn sched_first(&self) -> Option<usize> {
        if self.sched_head == NIL { None } else { Some(self.sched_head as usize) }
    }

    fn sched_insert_head(&mut self, idx: usize) {
        let e = &mut self.envs.0[idx];
        e.sched_prev = NIL;
        e.sched_next = self.sched_head;
        if self.sched_head != NIL {
            let head = self.sched_head as usize;
            self.envs.0[head].sched_prev = idx as u32;
        } else {
            self.sched_tail = idx as u32;
        }
        self.sched_head = idx as u32;
    }

    fn sched_insert_tail(&mut self, idx: usize) {
        let e = &mut self.envs.0[idx];
        e.sched_next = NIL;
        e.sched_prev = self.sched_tail;
        if self.sched_tail != NIL {
            let tail = self.sched_tail as usize;
            self.envs.0[tail].sched_next = idx as u32;
        } else {
            self.sched_head = idx as u32;
        }
        self.sched_tail = idx as u32;
    }

    fn sched_remove(&mut self, idx: usize) {
        let (prev, next) = {
            let e = &self.envs.0[idx];
            (e.sched_prev, e.sched_next)
        };
        if prev != NIL {
            self.envs.0[prev as usize].sched_next = next;
        } else {
            self.sched_head = next;
        }
        if next != NIL {
            self.envs.0[next as usize].sched_prev = prev;
        } else {
            self.sched_tail = prev;
        }
        let e = &mut self.envs.0[idx];
        e.sched_prev = NIL;
        e.sched_next = NIL;
    }

    /// Move a slot to the back of the queue when its budget runs out.
    pub(crate) fn sched_rotate(&mut self, idx: usize) {
        self.sched_remove(idx);
        self.sched_insert_tail(idx);
    }

    // ---- diagnostics ----------------------------------------------------

    #[cfg(all(test, not(baremetal)))]
    pub(crate) fn free_link(&self, idx: usize) -> u32 {
        self.envs.0[idx].link
    }

    #[cfg(all(test, not(baremetal)))]
    pub(crate) fn id_counter_value(&self) -> u32 {
        self.id_counter
    }

    pub fn free_list_len(&self) -> usize {
        let mut n = 0;
        let mut cursor = self.free_head;
        while cursor != NIL {
            n += 1;
            cursor = self.envs.0[cursor as usize].link;
        }
        n
    }

    pub fn sched_len(&self) -> usize {
        let mut n = 0;
        let mut cursor = self.sched_head;
        while cursor != NIL {
            n += 1;
            cursor = self.envs.0[cursor as usize].sched_next;
        }
        n
    }

    fn dump_row(&self, e: &Env) {
        let status = match e.status {
            EnvStatus::Free => "free        ",
            EnvStatus::Runnable => "runnable    ",
            EnvStatus::NotRunnable => "not runnable",
        };
        let marker = if self.cur().map(|c| ptr::eq(&self.envs.0[c], e)).unwrap_or(false) {
            '*'
        } else {
            ' '
        };
        println!(
            "|{}{:08x}  {}  {:08x}  {:08x}  {:016x}  {:<8x}|",
            marker, e.id, status, e.parent_id, e.asid, e.pgdir, e.priority
        );
    }

    pub fn dump(&self) {
        println!("---------------------------------env---------------------------------");
        println!("| id        status        parent    asid      pgdir           pri   |");
        for e in self.envs.0.iter() {
            if e.id != 0 {
                self.dump_row(e);
            }
        }
        println!("--------------------------------------------------------------------");
    }

    pub fn dump_sched(&self) {
        println!("--------------------------------sched--------------------------------");
        println!("| id        status        parent    asid      pgdir           pri   |");
        let mut cursor = self.sched_head;
        while cursor != NIL {
            let e = &self.envs.0[cursor as usize];
            self.dump_row(e);
            cursor = e.sched_next;
        }
        println!("--------------------------------------------------------------------");
    }
}

fn round_page(n: usize) -> usize {
    (n + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// Render the whole table on the console.
pub fn debug_env() {
    EnvTable::with(|t| t.dump());
}

#[allow(dead_code)]
pub fn debug_sched() {
    EnvTable::with(|t| t.dump_sched());
}

/// Switch to environment `idx` and enter user mode. Never returns.
pub fn env_run(idx: usize) -> ! {
    let tf = EnvTable::with_mut(|t| t.prepare_run(idx));
    unsafe { arch::process::resume(tf) }
}

/// Destroy an environment; if it was the current one, hand the CPU back
/// to the scheduler.
pub fn env_destroy(idx: usize) {
    if EnvTable::with_mut(|t| t.destroy(idx)) {
        crate::sched::schedule(true);
    }
}
