// src/cpu.rs
//! Runtime CPU capability detection
//!
//! A vector tier is only usable when the processor implements the
//! instructions *and* the operating system saves the matching register state
//! on context switch. On x86_64 the first half comes from `cpuid`, the second
//! from the XCR0 register read with `xgetbv`; executing AVX code while the OS
//! has not enabled YMM state faults, so both are checked.
//!
//! ```text
//! Vec256 : cpuid.1:ecx.AVX  && cpuid.7:ebx.AVX2    && XCR0[2:1] == 0b11
//! Vec512 : cpuid.7:ebx.AVX512F                     && XCR0[7:5] == 0b111 && XCR0[2:1] == 0b11
//! VecNeon: aarch64 with the `neon` feature
//! ```
//!
//! Absence of support is never an error, it is simply an empty flag.

use crate::tier::SimdTier;
use bitflags::bitflags;
use once_cell::sync::Lazy;
use tracing::debug;

bitflags! {
    /// Instruction-set and OS-state flags of the executing host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CpuCapabilities: u32 {
        const SSE2    = 1 << 0;
        const AVX     = 1 << 1;
        const AVX2    = 1 << 2;
        const AVX512F = 1 << 3;
        /// OS saves XMM and YMM state (XCR0 bits 1 and 2).
        const OS_YMM  = 1 << 4;
        /// OS saves opmask, ZMM_Hi256 and Hi16_ZMM state (XCR0 bits 5..7).
        const OS_ZMM  = 1 << 5;
        const NEON    = 1 << 6;
    }
}

/// Raw register values needed to derive x86 capabilities.
///
/// Split out of [`detect`] so the gating rules can be tested without the
/// matching hardware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct X86Registers {
    pub max_leaf: u32,
    pub leaf1_ecx: u32,
    pub leaf1_edx: u32,
    pub leaf7_ebx: u32,
    /// XCR0, or 0 when OSXSAVE is not set.
    pub xcr0: u64,
}

const LEAF1_EDX_SSE2: u32 = 1 << 26;
const LEAF1_ECX_OSXSAVE: u32 = 1 << 27;
const LEAF1_ECX_AVX: u32 = 1 << 28;
const LEAF7_EBX_AVX2: u32 = 1 << 5;
const LEAF7_EBX_AVX512F: u32 = 1 << 16;
const XCR0_XMM_YMM: u64 = 0x6;
const XCR0_OPMASK_ZMM: u64 = 0xE0;

impl CpuCapabilities {
    /// Derive capability flags from raw `cpuid`/`xgetbv` results.
    pub fn from_x86_registers(regs: X86Registers) -> Self {
        let mut caps = CpuCapabilities::empty();
        if regs.max_leaf < 1 {
            return caps;
        }

        if regs.leaf1_edx & LEAF1_EDX_SSE2 != 0 {
            caps |= CpuCapabilities::SSE2;
        }

        let osxsave = regs.leaf1_ecx & LEAF1_ECX_OSXSAVE != 0;
        let xcr0 = if osxsave { regs.xcr0 } else { 0 };
        let os_ymm = xcr0 & XCR0_XMM_YMM == XCR0_XMM_YMM;
        let os_zmm = os_ymm && xcr0 & XCR0_OPMASK_ZMM == XCR0_OPMASK_ZMM;

        if os_ymm {
            caps |= CpuCapabilities::OS_YMM;
        }
        if os_zmm {
            caps |= CpuCapabilities::OS_ZMM;
        }

        if regs.leaf1_ecx & LEAF1_ECX_AVX != 0 {
            caps |= CpuCapabilities::AVX;
        }

        if regs.max_leaf >= 7 {
            if regs.leaf7_ebx & LEAF7_EBX_AVX2 != 0 {
                caps |= CpuCapabilities::AVX2;
            }
            if regs.leaf7_ebx & LEAF7_EBX_AVX512F != 0 {
                caps |= CpuCapabilities::AVX512F;
            }
        }

        caps
    }

    /// Whether code for `tier` may be executed on this host.
    pub fn supports(self, tier: SimdTier) -> bool {
        match tier {
            SimdTier::Scalar => true,
            SimdTier::Vec256 => self.contains(
                CpuCapabilities::AVX | CpuCapabilities::AVX2 | CpuCapabilities::OS_YMM,
            ),
            SimdTier::Vec512 => {
                self.contains(CpuCapabilities::AVX512F | CpuCapabilities::OS_YMM | CpuCapabilities::OS_ZMM)
            }
            SimdTier::VecNeon => self.contains(CpuCapabilities::NEON),
        }
    }

    /// Every tier usable on this host, best first.
    pub fn available_tiers(self) -> Vec<SimdTier> {
        SimdTier::PREFERENCE
            .iter()
            .copied()
            .filter(|&tier| self.supports(tier))
            .collect()
    }
}

/// Query the host CPU. Pure and repeatable; see [`capabilities`] for the
/// cached variant.
pub fn detect() -> CpuCapabilities {
    #[cfg(target_arch = "x86_64")]
    {
        CpuCapabilities::from_x86_registers(x86::read_registers())
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            CpuCapabilities::NEON
        } else {
            CpuCapabilities::empty()
        }
    }

    #[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
    {
        CpuCapabilities::empty()
    }
}

static CAPABILITIES: Lazy<CpuCapabilities> = Lazy::new(|| {
    let caps = detect();
    debug!(?caps, "detected cpu capabilities");
    caps
});

/// Capabilities of the host, detected once per process.
pub fn capabilities() -> CpuCapabilities {
    *CAPABILITIES
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::{X86Registers, LEAF1_ECX_OSXSAVE};
    use std::arch::x86_64::{__cpuid_count, _xgetbv};

    #[allow(unused_unsafe)]
    pub(super) fn read_registers() -> X86Registers {
        // SAFETY: `cpuid` exists on every x86_64 processor.
        let leaf0 = unsafe { __cpuid_count(0, 0) };
        let max_leaf = leaf0.eax;
        if max_leaf < 1 {
            return X86Registers::default();
        }

        // SAFETY: leaf 1 is below `max_leaf`.
        let leaf1 = unsafe { __cpuid_count(1, 0) };
        let leaf7_ebx = if max_leaf >= 7 {
            // SAFETY: leaf 7 is below `max_leaf`.
            unsafe { __cpuid_count(7, 0) }.ebx
        } else {
            0
        };

        let xcr0 = if leaf1.ecx & LEAF1_ECX_OSXSAVE != 0 {
            // SAFETY: OSXSAVE set means `xgetbv` is enabled by the OS.
            unsafe { read_xcr0() }
        } else {
            0
        };

        X86Registers {
            max_leaf,
            leaf1_ecx: leaf1.ecx,
            leaf1_edx: leaf1.edx,
            leaf7_ebx,
            xcr0,
        }
    }

    #[target_feature(enable = "xsave")]
    unsafe fn read_xcr0() -> u64 {
        _xgetbv(0)
    }
}
