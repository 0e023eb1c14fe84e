//! Pure synchronous hashing for deterministic addressing
//!
//! Every derived identity in the system (deployment salts, resource
//! addresses, derived principals) goes through this module so the algorithm
//! is chosen in exactly one place.
//!
//! Current algorithm: **SHA-256** (32-byte output)
//!
//! ```
//! use vibestream_core::hash::{hash, hasher};
//!
//! let mut h = hasher();
//! h.update(b"vibe");
//! h.update(b"stream");
//! assert_eq!(h.finalize(), hash(b"vibestream"));
//! ```

use sha2::{Digest, Sha256};

/// Incremental hasher for multi-part input
#[derive(Debug, Clone, Default)]
pub struct Hasher(Sha256);

impl Hasher {
    /// Feed more bytes into the digest
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Consume the hasher and return the 32-byte digest
    pub fn finalize(self) -> [u8; 32] {
        let result = self.0.finalize();
        let mut output = [0u8; 32];
        output.copy_from_slice(&result);
        output
    }
}

/// Create an incremental hasher
pub fn hasher() -> Hasher {
    Hasher::default()
}

/// Hash arbitrary bytes to a 32-byte digest
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut h = hasher();
    h.update(data);
    h.finalize()
}
