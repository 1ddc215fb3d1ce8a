use core::fmt;

/// Errors surfaced by the environment and memory subsystems. Anything not
/// representable here (a corrupt ELF image, a broken table invariant) is a
/// kernel bug and panics instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// The environment free list is empty.
    NoFreeEnv,
    /// Every hardware address-space tag is in use.
    NoFreeAsid,
    /// An environment id did not resolve to a live slot, or the caller
    /// lacked permission to touch it.
    BadEnv,
    /// A page frame could not be allocated.
    OutOfMemory,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            KernelError::NoFreeEnv => write!(f, "no free environment slot"),
            KernelError::NoFreeAsid => write!(f, "no free ASID"),
            KernelError::BadEnv => write!(f, "bad environment id"),
            KernelError::OutOfMemory => write!(f, "out of physical memory"),
        }
    }
}

pub type Result<T> = core::result::Result<T, KernelError>;
