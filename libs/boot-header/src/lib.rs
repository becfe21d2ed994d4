// SPDX-License-Identifier: MPL-2.0

//! Accessors for the Linux/x86 boot protocol setup header.
//!
//! The header stays as the raw bytes of the staged kernel image and is
//! accessed through little-endian loads and stores at the documented
//! offsets, so the on-wire encoding is preserved on any host. Field names
//! follow the kernel's `setup_header` struct, originally defined in
//! `linux/arch/x86/include/uapi/asm/bootparam.h`.

#![cfg_attr(not(test), no_std)]

use bitflags::bitflags;

/// Magic stored in the boot protocol header ("HdrS").
pub const LINUX_BOOT_HEADER_MAGIC: u32 = 0x53726448;

/// Marker announcing the pre-2.02 command-line fields.
pub const CL_MAGIC: u16 = 0xA33F;

/// `type_of_loader` written by this firmware.
///
/// The high nibble is the QEMU-style firmware loader ID; bump the low
/// nibble when the placement policy changes substantially.
pub const LOADER_TYPE: u8 = 0xB0;

/// End of the protocol fields this crate touches. Staged buffers must
/// cover at least this many bytes.
pub const SETUP_END: usize = 0x230;

bitflags! {
    /// The header's `loadflags` byte.
    pub struct LoadFlags: u8 {
        /// The protected-mode part of the kernel loads at 0x100000.
        const LOADED_HIGH = 1 << 0;
        /// The kernel may use the heap area above the real-mode stack.
        const CAN_USE_HEAP = 1 << 7;
    }
}

/// Byte offsets of the protocol fields within the image.
pub mod offset {
    /// Pre-2.02 command-line marker (`cl_magic` of `screen_info`).
    pub const CL_MAGIC: usize = 0x20;
    /// Pre-2.02 command-line offset from the real-mode segment.
    pub const CL_OFFSET: usize = 0x22;
    /// Size of the setup in 512-byte sectors, boot sector not counted.
    pub const SETUP_SECTS: usize = 0x1f1;
    /// The `HdrS` magic.
    pub const HEADER: usize = 0x202;
    /// Boot protocol version.
    pub const VERSION: usize = 0x206;
    /// Loader identification byte.
    pub const TYPE_OF_LOADER: usize = 0x210;
    /// [`LoadFlags`](super::LoadFlags).
    pub const LOADFLAGS: usize = 0x211;
    /// Physical load address of the initrd.
    pub const RAMDISK_IMAGE: usize = 0x218;
    /// Size of the initrd.
    pub const RAMDISK_SIZE: usize = 0x21c;
    /// End of the setup heap, relative to the real-mode segment.
    pub const HEAP_END_PTR: usize = 0x224;
    /// Physical address of the command line (2.02+).
    pub const CMD_LINE_PTR: usize = 0x228;
    /// Highest address the initrd may end at (2.03+).
    pub const INITRD_ADDR_MAX: usize = 0x22c;
}

/// A view over the staged image bytes exposing the setup header fields.
pub struct SetupHeader<'a> {
    bytes: &'a mut [u8],
}

impl<'a> SetupHeader<'a> {
    /// Wraps the staged image bytes.
    ///
    /// # Panics
    ///
    /// Panics if the buffer does not cover all protocol fields up to
    /// [`SETUP_END`]. Staging at least that much is the image loader's
    /// contract; a shorter buffer is a firmware bug, not bad input.
    pub fn new(bytes: &'a mut [u8]) -> Self {
        assert!(bytes.len() >= SETUP_END);
        Self { bytes }
    }

    /// The raw staged bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn setup_sects(&self) -> u8 {
        self.bytes[offset::SETUP_SECTS]
    }

    pub fn header_magic(&self) -> u32 {
        self.read_u32(offset::HEADER)
    }

    pub fn version(&self) -> u16 {
        self.read_u16(offset::VERSION)
    }

    /// The known bits of `loadflags`; unknown bits are left in place but
    /// not reported.
    pub fn loadflags(&self) -> LoadFlags {
        LoadFlags::from_bits_truncate(self.bytes[offset::LOADFLAGS])
    }

    pub fn initrd_addr_max(&self) -> u32 {
        self.read_u32(offset::INITRD_ADDR_MAX)
    }

    pub fn set_cl_magic(&mut self, val: u16) {
        self.write_u16(offset::CL_MAGIC, val);
    }

    pub fn set_cl_offset(&mut self, val: u16) {
        self.write_u16(offset::CL_OFFSET, val);
    }

    pub fn set_type_of_loader(&mut self, val: u8) {
        self.bytes[offset::TYPE_OF_LOADER] = val;
    }

    /// Sets the given `loadflags` bits, leaving all others untouched.
    pub fn insert_loadflags(&mut self, flags: LoadFlags) {
        self.bytes[offset::LOADFLAGS] |= flags.bits();
    }

    pub fn set_ramdisk_image(&mut self, val: u32) {
        self.write_u32(offset::RAMDISK_IMAGE, val);
    }

    pub fn set_ramdisk_size(&mut self, val: u32) {
        self.write_u32(offset::RAMDISK_SIZE, val);
    }

    pub fn set_heap_end_ptr(&mut self, val: u16) {
        self.write_u16(offset::HEAP_END_PTR, val);
    }

    pub fn set_cmd_line_ptr(&mut self, val: u32) {
        self.write_u32(offset::CMD_LINE_PTR, val);
    }

    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.bytes[offset], self.bytes[offset + 1]])
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.bytes[offset],
            self.bytes[offset + 1],
            self.bytes[offset + 2],
            self.bytes[offset + 3],
        ])
    }

    fn write_u16(&mut self, offset: usize, val: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&val.to_le_bytes());
    }

    fn write_u32(&mut self, offset: usize, val: u32) {
        self.bytes[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_little_endian() {
        let mut bytes = [0u8; SETUP_END];
        bytes[offset::HEADER..][..4].copy_from_slice(&[0x48, 0x64, 0x72, 0x53]);
        bytes[offset::VERSION..][..2].copy_from_slice(&[0x05, 0x02]);
        bytes[offset::INITRD_ADDR_MAX..][..4].copy_from_slice(&[0xff, 0xff, 0xff, 0x37]);
        bytes[offset::SETUP_SECTS] = 15;

        let hdr = SetupHeader::new(&mut bytes);
        assert_eq!(hdr.header_magic(), LINUX_BOOT_HEADER_MAGIC);
        assert_eq!(hdr.version(), 0x205);
        assert_eq!(hdr.initrd_addr_max(), 0x37ffffff);
        assert_eq!(hdr.setup_sects(), 15);
    }

    #[test]
    fn writes_are_little_endian_at_documented_offsets() {
        let mut bytes = [0u8; SETUP_END];
        {
            let mut hdr = SetupHeader::new(&mut bytes);
            hdr.set_cmd_line_ptr(0x12345678);
            hdr.set_heap_end_ptr(0xabcd);
            hdr.set_ramdisk_image(0x0789a000);
            hdr.set_ramdisk_size(0x00c0ffee);
            hdr.set_cl_magic(CL_MAGIC);
            hdr.set_cl_offset(0x9000);
            hdr.set_type_of_loader(LOADER_TYPE);
        }
        assert_eq!(bytes[offset::CMD_LINE_PTR..][..4], [0x78, 0x56, 0x34, 0x12]);
        assert_eq!(bytes[offset::HEAP_END_PTR..][..2], [0xcd, 0xab]);
        assert_eq!(bytes[offset::RAMDISK_IMAGE..][..4], [0x00, 0xa0, 0x89, 0x07]);
        assert_eq!(bytes[offset::RAMDISK_SIZE..][..4], [0xee, 0xff, 0xc0, 0x00]);
        assert_eq!(bytes[offset::CL_MAGIC..][..2], [0x3f, 0xa3]);
        assert_eq!(bytes[offset::CL_OFFSET..][..2], [0x00, 0x90]);
        assert_eq!(bytes[offset::TYPE_OF_LOADER], 0xb0);
    }

    #[test]
    fn insert_loadflags_preserves_other_bits() {
        let mut bytes = [0u8; SETUP_END];
        bytes[offset::LOADFLAGS] = 0x21;

        let mut hdr = SetupHeader::new(&mut bytes);
        hdr.insert_loadflags(LoadFlags::CAN_USE_HEAP);
        assert!(hdr.loadflags().contains(LoadFlags::LOADED_HIGH));
        assert!(hdr.loadflags().contains(LoadFlags::CAN_USE_HEAP));
        assert_eq!(bytes[offset::LOADFLAGS], 0xa1);
    }

    #[test]
    #[should_panic]
    fn short_buffer_is_rejected() {
        let mut bytes = [0u8; SETUP_END - 1];
        SetupHeader::new(&mut bytes);
    }
}
