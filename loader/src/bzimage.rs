// SPDX-License-Identifier: MPL-2.0

//! Placement planning for bzImage boots.

use linux_boot_header::{
    LoadFlags, SetupHeader, CL_MAGIC, LINUX_BOOT_HEADER_MAGIC, LOADER_TYPE,
};

use crate::multiboot;

/// Bytes of the kernel image staged for header inspection and patching.
pub const HEADER_BUF_LEN: usize = 8192;

/// One boot attempt, as staged by the surrounding firmware.
///
/// The firmware constructs this once per attempt; [`plan_bzimage`] patches
/// the header in place and the handoff consumes the result without ever
/// returning, so there is no teardown.
pub struct BootRequest {
    /// First [`HEADER_BUF_LEN`] bytes of the kernel image.
    pub header: [u8; HEADER_BUF_LEN],
    /// Total size of the kernel image.
    pub vmlinuz_size: u32,
    /// Size of the initrd blob, 0 if none was staged.
    pub initrd_size: u32,
    /// Size of the command-line string, terminator included.
    pub cmdline_size: u32,
}

/// Where the pieces of the kernel go, per the boot protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPlan {
    /// Real-mode setup code and data block.
    pub setup_addr: u32,
    /// Protected-mode part of the kernel.
    pub kernel_addr: u32,
    /// Command-line string.
    pub cmdline_addr: u32,
    /// Initrd image, 0 if none.
    pub initrd_addr: u32,
    /// Byte length of the real-mode setup portion.
    pub setup_size: u32,
    /// Byte length of the protected-mode portion.
    pub kernel_size: u32,
}

/// Image flavors the firmware can recognize.
enum ImageKind {
    /// An image speaking the versioned Linux boot protocol. Version 0
    /// stands for a legacy zImage without the extended header.
    Linux { protocol: u16 },
    /// A multiboot image. Recognized so that declining it is explicit;
    /// the multiboot handoff itself is not implemented.
    Multiboot,
}

fn classify(hdr: &SetupHeader) -> ImageKind {
    if hdr.header_magic() == LINUX_BOOT_HEADER_MAGIC {
        ImageKind::Linux {
            protocol: hdr.version(),
        }
    } else if multiboot::probe(hdr.as_bytes()) {
        ImageKind::Multiboot
    } else {
        ImageKind::Linux { protocol: 0 }
    }
}

/// Computes the placement for a staged kernel image and patches its setup
/// header accordingly.
///
/// Per the boot protocol this never fails: an unrecognized header is
/// booted as a legacy (version 0) zImage with the most conservative
/// placement. Whether the chosen regions fit the staged blobs is the
/// caller's contract, as it is for every firmware speaking this protocol.
pub fn plan_bzimage(request: &mut BootRequest) -> PlacementPlan {
    let mut hdr = SetupHeader::new(&mut request.header);

    let protocol = match classify(&hdr) {
        ImageKind::Linux { protocol } => protocol,
        // A multiboot image still goes down the legacy path: protocol 0
        // treats it as a zImage, which is all this firmware offers.
        ImageKind::Multiboot => 0,
    };

    let (real_addr, cmdline_addr, prot_addr) =
        if protocol < 0x200 || !hdr.loadflags().contains(LoadFlags::LOADED_HIGH) {
            // Low zImage: everything lives under 640 KiB.
            (0x90000, (0x9a000 - request.cmdline_size) & !15, 0x10000)
        } else if protocol < 0x202 {
            // High but ancient kernel: loads at 1 MiB, still steered
            // from the 0x90000 real-mode segment.
            (0x90000, (0x9a000 - request.cmdline_size) & !15, 0x100000)
        } else {
            // High and recent kernel.
            (0x10000, 0x20000, 0x100000)
        };

    let initrd_max = if protocol >= 0x203 {
        hdr.initrd_addr_max()
    } else {
        0x37ffffff
    };

    if protocol >= 0x202 {
        hdr.set_cmd_line_ptr(cmdline_addr);
    } else if protocol >= 0x200 {
        // 2.00 and 2.01 kernels locate the command line through the
        // marker and displacement next to the boot sector.
        hdr.set_cl_magic(CL_MAGIC);
        hdr.set_cl_offset((cmdline_addr - real_addr) as u16);
    }

    if protocol >= 0x200 {
        hdr.set_type_of_loader(LOADER_TYPE);
    }

    if protocol >= 0x201 {
        hdr.insert_loadflags(LoadFlags::CAN_USE_HEAP);
        hdr.set_heap_end_ptr((cmdline_addr - real_addr - 0x200) as u16);
    }

    let initrd_addr = if request.initrd_size != 0 {
        // Page-aligned, as high as the ceiling allows.
        (initrd_max - request.initrd_size) & !4095
    } else {
        0
    };
    // Written unconditionally; kernels below 2.00 ignore these fields.
    hdr.set_ramdisk_image(initrd_addr);
    hdr.set_ramdisk_size(request.initrd_size);

    let setup_sects = match hdr.setup_sects() {
        // Ancient images leave the field zeroed and mean four sectors.
        0 => 4,
        n => n,
    };
    // One extra sector for the boot sector itself, which the field does
    // not count.
    let setup_size = (u32::from(setup_sects) + 1) * 512;

    let plan = PlacementPlan {
        setup_addr: real_addr,
        kernel_addr: prot_addr,
        cmdline_addr,
        initrd_addr,
        setup_size,
        kernel_size: request.vmlinuz_size - setup_size,
    };
    log::debug!(
        "bzImage protocol {:#x}: setup at {:#x}, kernel at {:#x}, cmdline at {:#x}, initrd at {:#x}",
        protocol,
        plan.setup_addr,
        plan.kernel_addr,
        plan.cmdline_addr,
        plan.initrd_addr,
    );
    plan
}
