//! SHA-256 incremental y comparación de digests.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Longitud en hex de un digest sha256.
pub const DIGEST_HEX_LEN: usize = 64;

/// Acumulador incremental: se alimenta chunk a chunk mientras se escribe el
/// staging, sin tener el artifact completo en memoria.
#[derive(Debug, Default, Clone)]
pub struct DigestAccumulator {
    hasher: Sha256,
    bytes: u64,
}

impl DigestAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.hasher.update(chunk);
        self.bytes += chunk.len() as u64;
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Digest en hex minúsculas.
    pub fn finalize(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Calcula el sha256 de un archivo existente.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut acc = DigestAccumulator::new();
    let mut buffer = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        acc.update(&buffer[..n]);
    }
    Ok(acc.finalize())
}

/// Comparación sin distinguir mayúsculas. Un digest declarado mal formado
/// (longitud o caracteres) simplemente no coincide.
pub fn digests_match(declared: &str, computed: &str) -> bool {
    let declared = declared.trim();
    declared.len() == DIGEST_HEX_LEN && declared.eq_ignore_ascii_case(computed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn empty_input_has_a_deterministic_digest() {
        assert_eq!(DigestAccumulator::new().finalize(), EMPTY_SHA256);
    }

    #[test]
    fn chunked_updates_equal_one_shot() {
        let mut a = DigestAccumulator::new();
        a.update(b"hello ");
        a.update(b"world");
        assert_eq!(a.bytes(), 11);
        assert_eq!(a.finalize(), hex::encode(Sha256::digest(b"hello world")));
    }

    #[test]
    fn match_is_case_insensitive_and_strict_on_length() {
        assert!(digests_match(&EMPTY_SHA256.to_uppercase(), EMPTY_SHA256));
        assert!(digests_match(&format!(" {EMPTY_SHA256}\n"), EMPTY_SHA256));
        assert!(!digests_match(&EMPTY_SHA256[..63], EMPTY_SHA256));
        assert!(!digests_match("", EMPTY_SHA256));
    }
}
