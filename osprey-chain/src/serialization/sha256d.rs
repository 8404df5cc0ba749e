//! SHA256d, the double SHA-256 used for Bitcoin identifiers.

use std::io;

use sha2::{Digest, Sha256};

/// A type that lets you write out SHA256d (double SHA-256) digests.
#[derive(Default)]
pub struct Writer {
    hash: Sha256,
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hash.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    /// Consume the Writer and produce the hash result.
    pub fn finish(self) -> [u8; 32] {
        let first = self.hash.finalize();
        let second = Sha256::digest(&first);
        let mut result = [0u8; 32];
        result.copy_from_slice(second.as_slice());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn double_hash_of_empty_input() {
        osprey_test::init();

        let mut writer = Writer::default();
        writer.write_all(b"").unwrap();

        assert_eq!(
            hex::encode(writer.finish()),
            "5df6e0e2761359d30a8275058e299fcc0381534545f55cf43e41983f5d4c9456"
        );
    }
}
