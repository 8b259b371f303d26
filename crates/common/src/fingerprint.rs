//! Human-comparable verification fingerprint.
//!
//! During channel negotiation both sides derive the same fingerprint from the
//! shared-secret hash and display it; the user compares the two grids
//! out-of-band before confirming. An interposed attacker would produce two
//! different secrets and therefore two different grids.
//!
//! The rendering is a fixed 4x4 grid of glyphs from a 32-symbol alphabet:
//! 5 bits per cell, 16 cells, consuming the first 80 bits of the hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Glyph alphabet. 32 visually distinct symbols, no look-alike pairs.
const GLYPHS: [char; 32] = [
    '◆', '●', '▲', '■', '★', '✚', '♠', '♣', '♥', '♦', '☾', '☀', '⚑', '⚓', '✈', '☂', '♞', '♜',
    '✿', '❄', '☘', '⚡', '♨', '☄', '✦', '❖', '⬟', '⬢', '⌘', '♪', '☍', '⚙',
];

/// Grid side length.
const GRID: usize = 4;

/// Number of glyph cells.
const CELLS: usize = GRID * GRID;

/// A derived verification fingerprint: a 4x4 grid of glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    cells: [char; CELLS],
}

impl Fingerprint {
    /// Derive the fingerprint from a 32-byte shared-secret hash.
    ///
    /// Pure and deterministic: both channel endpoints call this on the same
    /// hash and must render identical grids.
    pub fn derive(hash: &[u8; 32]) -> Self {
        let mut cells = ['\0'; CELLS];
        for (i, cell) in cells.iter_mut().enumerate() {
            let bit_offset = i * 5;
            let byte = bit_offset / 8;
            let shift = bit_offset % 8;
            // Read 5 bits spanning at most two bytes.
            let window = (hash[byte] as u16) << 8 | hash[byte + 1] as u16;
            let index = ((window >> (11 - shift)) & 0x1f) as usize;
            *cell = GLYPHS[index];
        }
        Self { cells }
    }

    /// Hash arbitrary secret material first, then derive.
    pub fn from_secret(secret: &[u8]) -> Self {
        let digest: [u8; 32] = Sha256::digest(secret).into();
        Self::derive(&digest)
    }

    /// The glyphs in row-major order.
    pub fn glyphs(&self) -> &[char] {
        &self.cells
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in 0..GRID {
            if row > 0 {
                writeln!(f)?;
            }
            for col in 0..GRID {
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", self.cells[row * GRID + col])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let hash = [0x5a; 32];
        assert_eq!(Fingerprint::derive(&hash), Fingerprint::derive(&hash));
    }

    #[test]
    fn test_distinct_hashes_distinct_grids() {
        let a = Fingerprint::derive(&[0x00; 32]);
        let b = Fingerprint::derive(&[0xff; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_single_bit_flip_changes_grid() {
        let mut hash = [0u8; 32];
        let a = Fingerprint::derive(&hash);
        hash[0] ^= 0x80;
        let b = Fingerprint::derive(&hash);
        assert_ne!(a, b);
    }

    #[test]
    fn test_all_glyphs_from_alphabet() {
        let fp = Fingerprint::from_secret(b"some shared secret");
        for glyph in fp.glyphs() {
            assert!(GLYPHS.contains(glyph), "glyph {} not in alphabet", glyph);
        }
    }

    #[test]
    fn test_display_is_four_rows() {
        let fp = Fingerprint::derive(&[0x17; 32]);
        let rendered = fp.to_string();
        assert_eq!(rendered.lines().count(), 4);
        for line in rendered.lines() {
            assert_eq!(line.chars().filter(|c| !c.is_whitespace()).count(), 4);
        }
    }

    #[test]
    fn test_known_vector() {
        // All-zero hash selects glyph 0 for every cell.
        let fp = Fingerprint::derive(&[0u8; 32]);
        assert!(fp.glyphs().iter().all(|g| *g == GLYPHS[0]));
    }
}
