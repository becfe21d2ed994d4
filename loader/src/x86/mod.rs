// SPDX-License-Identifier: MPL-2.0

//! The irreversible protected-mode-to-real-mode handoff.
//!
//! All protocol decisions are made before this point; this module only
//! reproduces the processor state the real-mode kernel entry expects and
//! transfers control. It is compiled for the 32-bit firmware target only;
//! the planner stays host-buildable.

use core::arch::{asm, global_asm};

use crate::{BootRequest, PlacementPlan};

global_asm!(include_str!("handoff.S"), options(att_syntax));

/// Enters the kernel's real-mode entry point. Never returns.
///
/// Copies the patched header over the planned setup region, then drops to
/// real mode with:
/// - BX: real-mode segment of the setup data block (`setup_addr >> 4`),
/// - DX: initial SP, `cmdline_addr - setup_addr - 16`.
///
/// # Safety
///
/// `plan` must come from [`crate::plan_bzimage`] over the same `request`,
/// and the kernel, command line and initrd must already sit at the planned
/// addresses. There is no failure path and no way back once this runs.
pub unsafe fn handoff(request: &BootRequest, plan: &PlacementPlan) -> ! {
    // SAFETY: the setup region is free conventional memory per the
    // caller's staging contract.
    unsafe {
        core::ptr::copy_nonoverlapping(
            request.header.as_ptr(),
            plan.setup_addr as usize as *mut u8,
            request.header.len(),
        );
    }

    // SAFETY: one-way trip; the stub consumes the register state set up
    // here and never comes back.
    unsafe {
        asm!(
            "mov %eax, %ebx",
            "mov %ecx, %edx",
            // Selector 0x18 is the firmware's 16-bit code segment; the
            // stub is linked into the BIOS F segment.
            "ljmp $0x18, $rm16_linux_entry - 0xf0000",
            in("eax") plan.setup_addr >> 4,
            in("ecx") plan.cmdline_addr - plan.setup_addr - 16,
            options(att_syntax, noreturn),
        )
    }
}
