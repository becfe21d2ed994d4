// SPDX-License-Identifier: MPL-2.0

//! Multiboot image recognition.
//!
//! The firmware recognizes multiboot images only to decline them: the
//! multiboot handoff is not implemented, and such images go down the
//! legacy zImage path instead.

/// Magic a multiboot header starts with.
const MULTIBOOT_MAGIC: u32 = 0x1badb002;

/// Bytes of the image the multiboot header must fall within.
const MULTIBOOT_SEARCH: usize = 8192;

/// Returns whether the staged image carries a multiboot header.
///
/// The magic must sit on a 4-byte boundary within the first 8 KiB of the
/// image.
pub fn probe(header: &[u8]) -> bool {
    let limit = header.len().min(MULTIBOOT_SEARCH);
    let found = header[..limit]
        .chunks_exact(4)
        .any(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]) == MULTIBOOT_MAGIC);
    if found {
        log::warn!("multiboot image detected; multiboot handoff is not implemented");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_an_aligned_magic() {
        let mut image = [0u8; 256];
        image[64..68].copy_from_slice(&MULTIBOOT_MAGIC.to_le_bytes());
        assert!(probe(&image));
    }

    #[test]
    fn ignores_an_unaligned_magic() {
        let mut image = [0u8; 256];
        image[66..70].copy_from_slice(&MULTIBOOT_MAGIC.to_le_bytes());
        assert!(!probe(&image));
    }

    #[test]
    fn ignores_a_magic_past_the_search_window() {
        let mut image = [0u8; MULTIBOOT_SEARCH + 64];
        image[MULTIBOOT_SEARCH..][..4].copy_from_slice(&MULTIBOOT_MAGIC.to_le_bytes());
        assert!(!probe(&image));
    }

    #[test]
    fn plain_images_have_no_header() {
        assert!(!probe(&[0u8; 256]));
        assert!(!probe(&[]));
    }
}
