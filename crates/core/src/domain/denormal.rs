//! Scoped flush-to-zero for the audio thread
//!
//! Decaying IIR history eventually reaches subnormal values, which are
//! dramatically slower on most FPUs. Rather than checking every sample, the
//! engine flips the CPU into flush-to-zero mode for the duration of a block
//! and restores the previous mode afterwards.

/// RAII guard that enables flush-to-zero (and denormals-are-zero on x86_64)
///
/// The mode is per-thread CPU state. The previous control word is restored
/// on drop, so nesting guards is harmless.
pub struct ScopedNoDenormals {
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    previous: usize,
}

#[cfg(target_arch = "x86_64")]
mod arch {
    // DAZ (bit 6) and FTZ (bit 15) of MXCSR
    pub const MASK: usize = 0x8040;

    #[allow(deprecated)]
    pub fn read() -> usize {
        // SAFETY: reading MXCSR has no side effects
        unsafe { std::arch::x86_64::_mm_getcsr() as usize }
    }

    #[allow(deprecated)]
    pub fn write(value: usize) {
        // SAFETY: only floating-point rounding/denormal behaviour changes
        unsafe { std::arch::x86_64::_mm_setcsr(value as u32) }
    }
}

#[cfg(target_arch = "aarch64")]
mod arch {
    // FZ (bit 24) of FPCR
    pub const MASK: usize = 1 << 24;

    pub fn read() -> usize {
        let value: usize;
        // SAFETY: reading FPCR has no side effects
        unsafe { std::arch::asm!("mrs {}, fpcr", out(reg) value) };
        value
    }

    pub fn write(value: usize) {
        // SAFETY: only floating-point rounding/denormal behaviour changes
        unsafe { std::arch::asm!("msr fpcr, {}", in(reg) value) };
    }
}

impl ScopedNoDenormals {
    #[inline]
    pub fn new() -> Self {
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        {
            let previous = arch::read();
            arch::write(previous | arch::MASK);
            Self { previous }
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            Self {}
        }
    }

    /// Whether flush-to-zero is currently active on this thread
    pub fn is_active() -> bool {
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        {
            arch::read() & arch::MASK == arch::MASK
        }

        #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
        {
            false
        }
    }
}

impl Default for ScopedNoDenormals {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedNoDenormals {
    #[inline]
    fn drop(&mut self) {
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        arch::write(self.previous);
    }
}
