//! Just enough ELF to get a statically linked image into a fresh address
//! space: header validation, program-header iteration, and a segment
//! loader that feeds one callback per touched page.

use core::mem;
use core::ptr;

use crate::error::Result;
use crate::mem::{PteFlags, PAGE_SIZE};

pub const PT_LOAD: u32 = 1;

const PF_X: u32 = 1 << 0;
const PF_W: u32 = 1 << 1;
const PF_R: u32 = 1 << 2;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELF_CLASS_32: u8 = 1;
const ELF_CLASS_64: u8 = 2;
const ELF_LITTLE_ENDIAN: u8 = 1;

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Ehdr {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf64Phdr {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf32Ehdr {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Elf32Phdr {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

#[cfg(target_pointer_width = "64")]
pub type Ehdr = Elf64Ehdr;
#[cfg(target_pointer_width = "64")]
pub type Phdr = Elf64Phdr;
#[cfg(target_pointer_width = "64")]
const ELF_CLASS: u8 = ELF_CLASS_64;

#[cfg(target_pointer_width = "32")]
pub type Ehdr = Elf32Ehdr;
#[cfg(target_pointer_width = "32")]
pub type Phdr = Elf32Phdr;
#[cfg(target_pointer_width = "32")]
const ELF_CLASS: u8 = ELF_CLASS_32;

/// Validate and copy out the header, or `None` if the image is not a
/// little-endian ELF of the native class.
pub fn from_bytes(data: &[u8]) -> Option<Ehdr> {
    if data.len() < mem::size_of::<Ehdr>() {
        return None;
    }
    let ehdr: Ehdr = unsafe { ptr::read_unaligned(data.as_ptr().cast()) };
    if ehdr.e_ident[..4] != ELF_MAGIC
        || ehdr.e_ident[4] != ELF_CLASS
        || ehdr.e_ident[5] != ELF_LITTLE_ENDIAN
    {
        return None;
    }
    Some(ehdr)
}

/// Iterate the program-header table. A table that runs off the end of the
/// image is a corrupt input and panics, matching the loader's fatal
/// handling of bad images.
pub fn program_headers<'a>(ehdr: &'a Ehdr, data: &'a [u8]) -> impl Iterator<Item = Phdr> + 'a {
    let entsize = ehdr.e_phentsize as usize;
    (0..ehdr.e_phnum as usize).map(move |i| {
        let off = ehdr.e_phoff as usize + i * entsize;
        if off + mem::size_of::<Phdr>() > data.len() {
            panic!("elf: truncated program header table");
        }
        unsafe { ptr::read_unaligned(data.as_ptr().add(off).cast()) }
    })
}

fn seg_perm(p_flags: u32) -> PteFlags {
    let mut perm = PteFlags::U;
    if p_flags & PF_R != 0 {
        perm |= PteFlags::R;
    }
    if p_flags & PF_W != 0 {
        perm |= PteFlags::W;
    }
    if p_flags & PF_X != 0 {
        perm |= PteFlags::X;
    }
    perm
}

/// Walk one PT_LOAD segment page by page. `map_page(va, offset, perm, src)`
/// is invoked once per covered page with `va` aligned, `offset` the byte
/// offset within that page, and `src` the file bytes destined there
/// (`None` past `p_filesz`; those pages arrive zeroed). `payload` points
/// at the segment's file bytes, i.e. the image at `p_offset`.
pub fn load_seg<F>(ph: &Phdr, payload: &[u8], mut map_page: F) -> Result<()>
where
    F: FnMut(usize, usize, PteFlags, Option<&[u8]>) -> Result<()>,
{
    let va = ph.p_vaddr as usize;
    let bin_size = ph.p_filesz as usize;
    let sg_size = ph.p_memsz as usize;
    assert!(payload.len() >= bin_size, "elf: segment data truncated");
    assert!(bin_size <= sg_size, "elf: p_filesz exceeds p_memsz");
    let perm = seg_perm(ph.p_flags);

    let offset = va & (PAGE_SIZE - 1);
    let mut i = 0;
    if offset != 0 {
        let n = bin_size.min(PAGE_SIZE - offset);
        map_page(va - offset, offset, perm, Some(&payload[..n]))?;
        i = n;
    }

    // Remaining file-backed pages.
    while i < bin_size {
        let n = (bin_size - i).min(PAGE_SIZE);
        map_page(va + i, 0, perm, Some(&payload[i..i + n]))?;
        i += PAGE_SIZE;
    }

    // Pages mapped but not present in the file. The frames come back
    // zeroed, which also covers the bss tail of the last file page.
    while i < sg_size {
        let abs = va + i;
        map_page(abs & !(PAGE_SIZE - 1), abs & (PAGE_SIZE - 1), perm, None)?;
        i += PAGE_SIZE;
    }
    Ok(())
}

/// Print an image's program-header table on the console.
#[allow(dead_code)]
pub fn debug_elf(binary: &[u8]) {
    let ehdr = match from_bytes(binary) {
        Some(ehdr) => ehdr,
        None => {
            println!("not an elf image");
            return;
        }
    };
    println!("type      offset    vaddr     filesz    memsz     flags");
    for ph in program_headers(&ehdr, binary) {
        let name = match ph.p_type {
            0 => "null   ",
            1 => "load   ",
            2 => "dynamic",
            3 => "interp ",
            4 => "note   ",
            6 => "phdr   ",
            _ => "other  ",
        };
        println!(
            "{}   {:08x}  {:08x}  {:08x}  {:08x}  {:08x}",
            name, ph.p_offset, ph.p_vaddr, ph.p_filesz, ph.p_memsz, ph.p_flags
        );
    }
}

/// Assemble a minimal ELF64 image in memory: header, program headers,
/// then the raw payload. Segment `p_offset` fields are the caller's to
/// aim into that payload region.
#[cfg(all(test, not(baremetal)))]
pub(crate) fn test_image(entry: u64, phdrs: &[Elf64Phdr], payload: &[u8]) -> Vec<u8> {
    let mut ehdr = Elf64Ehdr {
        e_ident: [0; 16],
        e_type: 2,
        e_machine: 0xf3,
        e_version: 1,
        e_entry: entry,
        e_phoff: mem::size_of::<Elf64Ehdr>() as u64,
        e_shoff: 0,
        e_flags: 0,
        e_ehsize: mem::size_of::<Elf64Ehdr>() as u16,
        e_phentsize: mem::size_of::<Elf64Phdr>() as u16,
        e_phnum: phdrs.len() as u16,
        e_shentsize: 0,
        e_shnum: 0,
        e_shstrndx: 0,
    };
    ehdr.e_ident[..4].copy_from_slice(&ELF_MAGIC);
    ehdr.e_ident[4] = ELF_CLASS_64;
    ehdr.e_ident[5] = ELF_LITTLE_ENDIAN;
    ehdr.e_ident[6] = 1;

    let mut out = Vec::new();
    out.extend_from_slice(unsafe {
        core::slice::from_raw_parts(
            (&ehdr as *const Elf64Ehdr).cast::<u8>(),
            mem::size_of::<Elf64Ehdr>(),
        )
    });
    for ph in phdrs {
        out.extend_from_slice(unsafe {
            core::slice::from_raw_parts(
                (ph as *const Elf64Phdr).cast::<u8>(),
                mem::size_of::<Elf64Phdr>(),
            )
        });
    }
    out.extend_from_slice(payload);
    out
}

#[cfg(all(test, not(baremetal)))]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_magic() {
        assert!(from_bytes(&[0u8; 64]).is_none());
        assert!(from_bytes(b"\x7fELD").is_none());
    }

    #[test]
    fn parses_header_and_phdrs() {
        let ph = Elf64Phdr {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_X,
            p_offset: 0x80,
            p_vaddr: 0x40_0000,
            p_paddr: 0,
            p_filesz: 0x10,
            p_memsz: 0x10,
            p_align: 0x1000,
        };
        let img = test_image(0x40_0000, &[ph], &[0xaa; 0x10]);
        let ehdr = from_bytes(&img).unwrap();
        assert_eq!(ehdr.e_entry, 0x40_0000);
        let phdrs: Vec<Phdr> = program_headers(&ehdr, &img).collect();
        assert_eq!(phdrs.len(), 1);
        assert_eq!(phdrs[0].p_vaddr, 0x40_0000);
    }

    #[test]
    fn load_seg_visits_every_page_once() {
        let ph = Elf64Phdr {
            p_type: PT_LOAD,
            p_flags: PF_R | PF_W,
            p_offset: 0,
            p_vaddr: 0x40_0000,
            p_paddr: 0,
            p_filesz: 0x1234,
            p_memsz: 0x3100,
            p_align: 0x1000,
        };
        let payload = vec![0x5a; 0x1234];
        let mut calls = Vec::new();
        load_seg(&ph, &payload, |va, off, perm, src| {
            assert!(perm.contains(PteFlags::U | PteFlags::R | PteFlags::W));
            calls.push((va, off, src.map(|s| s.len())));
            Ok(())
        })
        .unwrap();
        assert_eq!(
            calls,
            vec![
                (0x40_0000, 0, Some(0x1000)),
                (0x40_1000, 0, Some(0x234)),
                (0x40_2000, 0, None),
                (0x40_3000, 0, None),
            ]
        );
    }

    #[test]
    fn load_seg_handles_unaligned_start() {
        let ph = Elf64Phdr {
            p_type: PT_LOAD,
            p_flags: PF_R,
            p_offset: 0,
            p_vaddr: 0x40_0e00,
            p_paddr: 0,
            p_filesz: 0x400,
            p_memsz: 0x400,
            p_align: 0x1000,
        };
        let payload = vec![1u8; 0x400];
        let mut calls = Vec::new();
        load_seg(&ph, &payload, |va, off, _perm, src| {
            calls.push((va, off, src.map(|s| s.len())));
            Ok(())
        })
        .unwrap();
        assert_eq!(calls, vec![(0x40_0000, 0xe00, Some(0x200)), (0x40_1000, 0, Some(0x200))]);
    }
}
