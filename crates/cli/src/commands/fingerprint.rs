//! Render a verification fingerprint from a shared-secret hash.

use anyhow::{bail, Context, Result};

use common::Fingerprint;

/// Decode a hex-encoded 32-byte hash and print its 4x4 glyph grid.
pub fn show_fingerprint(hash_hex: &str) -> Result<()> {
    let bytes = hex::decode(hash_hex.trim()).context("hash must be hex encoded")?;
    let hash: [u8; 32] = match bytes.as_slice().try_into() {
        Ok(hash) => hash,
        Err(_) => bail!("expected a 32-byte hash, got {} bytes", bytes.len()),
    };
    println!("{}", Fingerprint::derive(&hash));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_input() {
        assert!(show_fingerprint("deadbeef").is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(show_fingerprint("zz").is_err());
    }

    #[test]
    fn test_accepts_full_hash() {
        let hash = "42".repeat(32);
        assert!(show_fingerprint(&hash).is_ok());
    }
}
