// SPDX-License-Identifier: MPL-2.0

//! BIOS-side loader for the Linux/x86 boot protocol.
//!
//! The surrounding firmware stages the kernel image, the optional initrd
//! and the command-line string in memory, then calls [`plan_bzimage`] to
//! pick the protocol-mandated placement and patch the setup header, and
//! finally [`x86::handoff`] to enter the kernel's real-mode entry point.
//! The staging I/O and the firmware's panic path live elsewhere.

#![cfg_attr(not(test), no_std)]

mod bzimage;
mod multiboot;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "x86")] {
        pub mod x86;
    }
}

pub use self::bzimage::{plan_bzimage, BootRequest, PlacementPlan, HEADER_BUF_LEN};
