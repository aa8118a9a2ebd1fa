//! Synthetic payload shared by download streams and upload requests.

use bytes::Bytes;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// A fixed-size, read-only buffer of random bytes.
///
/// The buffer is allocated once; [`ChunkSource::chunk`] hands out reference
/// counted views of the same allocation, so streaming a chunk never copies.
#[derive(Debug, Clone)]
pub struct ChunkSource {
    chunk: Bytes,
}

impl ChunkSource {
    /// Allocate a chunk of `size` bytes filled with random data.
    pub fn new(size: usize) -> Self {
        let mut rng = StdRng::from_os_rng();
        let mut buf = vec![0u8; size];
        rng.fill_bytes(&mut buf);
        ChunkSource {
            chunk: Bytes::from(buf),
        }
    }

    /// The shared chunk.
    pub fn chunk(&self) -> Bytes {
        self.chunk.clone()
    }

    /// Size of the chunk in bytes.
    pub fn size(&self) -> usize {
        self.chunk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_is_shared() {
        let source = ChunkSource::new(1024);
        let a = source.chunk();
        let b = source.chunk();

        assert_eq!(a.len(), 1024);
        assert_eq!(source.size(), 1024);
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn clones_share_allocation() {
        let source = ChunkSource::new(64);
        let copy = source.clone();
        assert_eq!(source.chunk().as_ptr(), copy.chunk().as_ptr());
    }
}
