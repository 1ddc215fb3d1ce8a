//! Hosted integration tests for the environment subsystem. Each test
//! rebuilds the kernel singletons from scratch, so the suite is
//! independent of test ordering and threading.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::arch;
use crate::elf::{self, Elf64Phdr};
use crate::env::{EnvStatus, EnvTable, LOG2NENV, NENV};
use crate::error::KernelError;
use crate::mem::{
    MemoryManager, ENVS, KERNBASE, PAGES, PAGE_SIZE, PAGE_TABLE, PN_SHIFT, USTACKTOP,
};

fn setup() {
    MemoryManager::with_mut(|mm| mm.init());
    EnvTable::with_mut(|table| table.init());
}

fn free_list_snapshot() -> Vec<usize> {
    EnvTable::with(|t| {
        let mut order = Vec::new();
        let mut cursor = t.free_head;
        while cursor != u32::MAX {
            order.push(cursor as usize);
            cursor = t.free_link(cursor as usize);
        }
        order
    })
}

fn asid_snapshot() -> Vec<bool> {
    EnvTable::with(|t| (0..crate::env::NASID as u32).map(|a| t.asid_live(a)).collect())
}

// ---- scenario: triple alloc --------------------------------------------

#[test]
fn triple_alloc_ids_and_asids() {
    setup();
    let (a, b, c) = EnvTable::with_mut(|t| {
        let a = t.alloc(0).unwrap();
        let b = t.alloc(0).unwrap();
        let c = t.alloc(0).unwrap();
        (a, b, c)
    });
    assert_eq!((a, b, c), (0, 1, 2));
    EnvTable::with(|t| {
        assert_eq!(t.env(a).id, (1 << (LOG2NENV + 1)) as u32);
        assert_eq!(t.env(b).id, (2 << (LOG2NENV + 1)) as u32 | 1);
        assert_eq!(t.env(c).id, (3 << (LOG2NENV + 1)) as u32 | 2);
        let asids = [t.env(a).asid, t.env(b).asid, t.env(c).asid];
        assert!(asids[0] != asids[1] && asids[1] != asids[2] && asids[0] != asids[2]);
        for asid in asids {
            assert!(t.asid_live(asid));
        }
        assert_eq!(t.free_list_len(), NENV - 3);
        assert_eq!(t.sched_len(), 0);
        for idx in [a, b, c] {
            assert_eq!(t.env(idx).status, EnvStatus::NotRunnable);
            assert_eq!(t.env(idx).runs, 0);
            assert_eq!(
                t.env(idx).tf.regs[2],
                USTACKTOP - core::mem::size_of::<i32>() - core::mem::size_of::<usize>()
            );
        }
    });
}

// ---- scenario: exhaustion ----------------------------------------------

#[test]
fn alloc_with_stolen_free_list_fails_cleanly() {
    setup();
    EnvTable::with_mut(|t| {
        let saved = t.free_head;
        let saved_ids = t.id_counter_value();
        t.free_head = u32::MAX;
        assert_eq!(t.alloc(0), Err(KernelError::NoFreeEnv));
        assert_eq!(t.id_counter_value(), saved_ids);
        t.free_head = saved;
        assert!(t.alloc(0).is_ok());
    });
}

#[test]
fn asid_pool_exhaustion_surfaces() {
    setup();
    EnvTable::with_mut(|t| {
        // Tag zero is the kernel's, so exactly NASID - 1 allocs can win.
        for _ in 0..crate::env::NASID - 1 {
            t.alloc(0).unwrap();
        }
        let before = t.free_list_len();
        assert_eq!(t.alloc(0), Err(KernelError::NoFreeAsid));
        assert_eq!(t.free_list_len(), before);
    });
}

// ---- scenario: template mirroring --------------------------------------

#[test]
fn template_maps_pages_and_envs_windows() {
    setup();
    let base = EnvTable::with(|t| t.base_pgdir());
    MemoryManager::with(|mm| {
        let pages_pa = mm.pages_base();
        let mut off = 0;
        while off < mm.pages_size() {
            assert_eq!(mm.get_pa(base, PAGES + off), Some(pages_pa + off));
            off += PAGE_SIZE;
        }
    });
    let (envs_pa, envs_bytes) = EnvTable::with(|t| (t.envs_base(), t.envs_bytes()));
    MemoryManager::with(|mm| {
        let mut off = 0;
        while off < envs_bytes {
            assert_eq!(mm.get_pa(base, ENVS + off), Some(envs_pa + off));
            off += PAGE_SIZE;
        }
        // The kernel window translates identically too.
        assert_eq!(mm.get_pa(base, KERNBASE), Some(KERNBASE));
        assert_eq!(mm.get_pa(base, KERNBASE + 0x123456), Some(KERNBASE + 0x123456));
    });
}

#[test]
fn self_map_resolves_to_own_directory() {
    setup();
    let idx = EnvTable::with_mut(|t| t.alloc(0).unwrap());
    let root = EnvTable::with(|t| t.env(idx).pgdir);
    let self_va = PAGE_TABLE + (PAGE_TABLE >> PN_SHIFT) + (PAGE_TABLE >> (2 * PN_SHIFT));
    MemoryManager::with(|mm| {
        assert_eq!(mm.get_pa(root, self_va), Some(root));
    });
}

// ---- scenario: permission checks ---------------------------------------

#[test]
fn envid2env_checks_parentage() {
    setup();
    EnvTable::with_mut(|t| {
        let parent = t.alloc(0).unwrap();
        let parent_id = t.env(parent).id;
        let child = t.alloc(parent_id).unwrap();
        let child_id = t.env(child).id;
        let stranger = t.alloc(0).unwrap();
        let stranger_id = t.env(stranger).id;

        assert_eq!(t.envid2env(child_id, 0), Ok(child));
        assert_eq!(t.envid2env(child_id, parent_id), Ok(child));
        assert_eq!(t.envid2env(parent_id, parent_id), Ok(parent));
        assert_eq!(t.envid2env(child_id, stranger_id), Err(KernelError::BadEnv));
        assert_eq!(t.envid2env(stranger_id, parent_id), Err(KernelError::BadEnv));
    });
}

#[test]
fn envid2env_rejects_stale_ids() {
    setup();
    EnvTable::with_mut(|t| {
        let idx = t.alloc(0).unwrap();
        let old_id = t.env(idx).id;
        assert_eq!(t.envid2env(old_id, 0), Ok(idx));
        t.free(idx);
        assert_eq!(t.envid2env(old_id, 0), Err(KernelError::BadEnv));
        // The slot is recycled with fresh counter bits; the stale id keeps
        // failing even though the index matches.
        let again = t.alloc(0).unwrap();
        assert_eq!(again, idx);
        assert_ne!(t.env(again).id, old_id);
        assert_eq!(t.envid2env(old_id, 0), Err(KernelError::BadEnv));
    });
}

// ---- laws ---------------------------------------------------------------

#[test]
fn alloc_free_pair_restores_table_state() {
    setup();
    let free_before = free_list_snapshot();
    let asids_before = asid_snapshot();
    EnvTable::with_mut(|t| {
        let idx = t.alloc(0).unwrap();
        t.free(idx);
    });
    assert_eq!(free_list_snapshot(), free_before);
    assert_eq!(asid_snapshot(), asids_before);
}

#[test]
fn reverse_order_frees_preserve_list_order() {
    setup();
    let before = free_list_snapshot();
    EnvTable::with_mut(|t| {
        let a = t.alloc(0).unwrap();
        let b = t.alloc(0).unwrap();
        t.free(b);
        t.free(a);
    });
    assert_eq!(free_list_snapshot(), before);
}

// ---- scenario: free under the live root --------------------------------

#[test]
fn destroying_the_running_env_switches_to_bare_first() {
    setup();
    let idx = EnvTable::with_mut(|t| {
        let idx = t.alloc(0).unwrap();
        t.env_mut(idx).status = EnvStatus::Runnable;
        idx
    });
    let (root, asid) = EnvTable::with(|t| (t.env(idx).pgdir, t.env(idx).asid));

    let _tf = EnvTable::with_mut(|t| t.prepare_run(idx));
    // The dispatch installed this environment's root and tag.
    assert_eq!(arch::mem::read(), arch::mem::satp_encode(asid as usize, root));
    assert!(arch::irq::supervisor_interrupts_disabled());

    let must_yield = EnvTable::with_mut(|t| t.destroy(idx));
    assert!(must_yield);
    // Teardown dropped translation to bare before freeing the tables.
    assert_eq!(arch::mem::read(), 0);
    EnvTable::with(|t| {
        assert_eq!(t.cur(), None);
        assert!(!t.asid_live(asid));
        assert_eq!(t.env(idx).status, EnvStatus::Free);
        assert_eq!(t.env(idx).pgdir, 0);
    });
    // The tag is immediately reusable, lowest-first.
    EnvTable::with_mut(|t| {
        let next = t.alloc(0).unwrap();
        assert_eq!(t.env(next).asid, asid);
    });
}

#[test]
fn destroying_a_bystander_keeps_current() {
    setup();
    EnvTable::with_mut(|t| {
        let a = t.alloc(0).unwrap();
        let b = t.alloc(0).unwrap();
        t.env_mut(a).status = EnvStatus::Runnable;
        t.prepare_run(a);
        assert!(!t.destroy(b));
        assert_eq!(t.cur(), Some(a));
    });
}

// ---- dispatch ----------------------------------------------------------

#[test]
fn dispatch_programs_timer_and_frame_bits() {
    setup();
    let idx = EnvTable::with_mut(|t| {
        let idx = t.alloc(0).unwrap();
        t.env_mut(idx).status = EnvStatus::Runnable;
        idx
    });
    EnvTable::with_mut(|t| t.prepare_run(idx));
    assert_eq!(arch::irq::armed_timer(), Some(20_000_000));
    EnvTable::with(|t| {
        let e = t.env(idx);
        assert_eq!(e.runs, 1);
        assert_eq!(t.cur(), Some(idx));
        assert_eq!(t.cur_pgdir, e.pgdir);
        assert_eq!(e.tf.stvec, arch::process::trap_entry());
        assert_ne!(e.tf.sie & arch::process::SIE_STIE, 0);
        assert_ne!(e.tf.sstatus & arch::process::SSTATUS_SPIE, 0);
        assert_eq!(arch::process::loaded_sepc(), e.tf.sepc);
    });

    // Each dispatch advances the deadline by one tick.
    EnvTable::with_mut(|t| t.prepare_run(idx));
    assert_eq!(arch::irq::armed_timer(), Some(20_030_000));
}

#[test]
fn dispatch_banks_the_outgoing_frame() {
    setup();
    let (a, b) = EnvTable::with_mut(|t| {
        let a = t.alloc(0).unwrap();
        let b = t.alloc(0).unwrap();
        t.env_mut(a).status = EnvStatus::Runnable;
        t.env_mut(b).status = EnvStatus::Runnable;
        (a, b)
    });
    EnvTable::with_mut(|t| t.prepare_run(a));
    // Simulate the trap that suspended `a`: scribble recognizable state
    // into the frame at the top of the trap stack.
    unsafe {
        let frame = &mut *arch::process::trap_frame_top();
        frame.regs[10] = 0xdead_beef;
        frame.sepc = 0x40_1234;
    }
    EnvTable::with_mut(|t| t.prepare_run(b));
    EnvTable::with(|t| {
        assert_eq!(t.env(a).tf.regs[10], 0xdead_beef);
        assert_eq!(t.env(a).tf.sepc, 0x40_1234);
        assert_eq!(t.cur(), Some(b));
    });
}

// ---- scenario: ELF round trip ------------------------------------------

#[test]
fn env_create_loads_a_segment_byte_for_byte() {
    setup();
    let payload: Vec<u8> = (0..0x1234u32).map(|i| (i * 7 + 3) as u8).collect();
    let phoff = core::mem::size_of::<elf::Elf64Ehdr>()
        + core::mem::size_of::<Elf64Phdr>();
    let ph = Elf64Phdr {
        p_type: elf::PT_LOAD,
        p_flags: 0x5, // R + X
        p_offset: phoff as u64,
        p_vaddr: 0x40_0000,
        p_paddr: 0,
        p_filesz: payload.len() as u64,
        p_memsz: payload.len() as u64,
        p_align: PAGE_SIZE as u64,
    };
    let image = elf::test_image(0x40_0000, &[ph], &payload);

    let idx = EnvTable::with_mut(|t| t.create(&image, 1));
    let root = EnvTable::with(|t| t.env(idx).pgdir);
    MemoryManager::with(|mm| {
        for (i, byte) in payload.iter().enumerate() {
            let pa = mm.get_pa(root, 0x40_0000 + i).expect("segment page missing");
            let got = unsafe { *mm.phys_ptr(pa) };
            assert_eq!(got, *byte, "byte {:#x} differs", i);
        }
        // One page past the segment stays unmapped.
        assert!(!mm.is_mapped_page(root, 0x40_2000));
    });
    EnvTable::with(|t| {
        let e = t.env(idx);
        assert_eq!(e.tf.sepc, 0x40_0000);
        assert_eq!(e.status, EnvStatus::Runnable);
        assert_eq!(t.sched_first(), Some(idx));
        assert_eq!(t.sched_len(), 1);
    });
}

#[test]
fn env_create_without_load_segments_yields_empty_space() {
    setup();
    let image = elf::test_image(0x7654_3210, &[], &[]);
    let idx = EnvTable::with_mut(|t| t.create(&image, 1));
    EnvTable::with(|t| {
        assert_eq!(t.env(idx).tf.sepc, 0x7654_3210);
    });
    let root = EnvTable::with(|t| t.env(idx).pgdir);
    MemoryManager::with(|mm| {
        assert!(!mm.is_mapped_page(root, 0x40_0000));
        assert!(!mm.is_mapped_page(root, USTACKTOP - PAGE_SIZE));
    });
}

#[test]
fn created_env_shares_the_kernel_window() {
    setup();
    let image = elf::test_image(0x40_0000, &[], &[]);
    let (root, base) = EnvTable::with_mut(|t| {
        let idx = t.create(&image, 1);
        (t.env(idx).pgdir, t.base_pgdir())
    });
    MemoryManager::with(|mm| {
        for probe in [0usize, 0x1000, 0x20_0000, 0x3f_f000] {
            assert_eq!(mm.get_pa(root, KERNBASE + probe), mm.get_pa(base, KERNBASE + probe));
        }
        assert_eq!(mm.get_pa(root, PAGES), mm.get_pa(base, PAGES));
        assert_eq!(mm.get_pa(root, ENVS), mm.get_pa(base, ENVS));
    });
}

#[test]
fn head_insertion_orders_the_run_queue() {
    setup();
    let image = elf::test_image(0x40_0000, &[], &[]);
    let (first, second) = EnvTable::with_mut(|t| {
        let first = t.create(&image, 1);
        let second = t.create(&image, 2);
        (first, second)
    });
    EnvTable::with(|t| {
        assert_eq!(t.sched_first(), Some(second));
        assert_eq!(t.sched_len(), 2);
        let _ = first;
    });
}

// ---- randomized interleaving -------------------------------------------

#[test]
fn random_alloc_free_interleaving_holds_invariants() {
    setup();
    let mut rng = StdRng::seed_from_u64(0x7e51);
    let mut live: Vec<usize> = Vec::new();

    for _ in 0..400 {
        let do_alloc = live.is_empty() || rng.gen_bool(0.6);
        if do_alloc {
            let r = EnvTable::with_mut(|t| t.alloc(0));
            match r {
                Ok(idx) => live.push(idx),
                Err(KernelError::NoFreeAsid) => {
                    assert_eq!(live.len(), crate::env::NASID - 1)
                }
                Err(e) => panic!("unexpected alloc failure: {}", e),
            }
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            EnvTable::with_mut(|t| t.free(victim));
        }

        EnvTable::with(|t| {
            assert_eq!(t.free_list_len(), NENV - live.len());
            let mut seen_asids = std::collections::HashSet::new();
            for &idx in &live {
                let e = t.env(idx);
                assert_ne!(e.status, EnvStatus::Free);
                assert!(t.asid_live(e.asid));
                assert!(seen_asids.insert(e.asid), "duplicate asid {}", e.asid);
                assert_eq!(t.envid2env(e.id, 0), Ok(idx));
                assert_eq!((e.id as usize) & (NENV - 1), idx);
            }
        });
    }
}
