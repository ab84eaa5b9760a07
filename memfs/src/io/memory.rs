use crate::io::{BlockNumber, BlockStorage};
use std::io::ErrorKind;

/// Emulates block storage in memory using one contiguous arena of
/// `block_size * block_count` bytes. Nothing survives the value being dropped.
pub struct MemoryDevice {
    arena: Vec<u8>,
    block_size: usize,
    /// The total number of blocks available in the arena.
    block_count: usize,
}

impl MemoryDevice {
    /// Allocates a zeroed arena for `block_count` blocks of `block_size` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::OutOfMemory` if the arena size overflows or the
    /// allocation is refused.
    pub fn new(block_size: usize, block_count: usize) -> std::io::Result<Self> {
        let len = block_size
            .checked_mul(block_count)
            .ok_or_else(|| std::io::Error::new(ErrorKind::OutOfMemory, "arena size overflows"))?;

        let mut arena = Vec::new();
        arena
            .try_reserve_exact(len)
            .map_err(|e| std::io::Error::new(ErrorKind::OutOfMemory, e))?;
        arena.resize(len, 0x00);

        Ok(MemoryDevice {
            arena,
            block_size,
            block_count,
        })
    }

    fn block_range(&self, blocknr: BlockNumber) -> std::io::Result<std::ops::Range<usize>> {
        if blocknr >= self.block_count {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "block out of range",
            ));
        }
        let start = blocknr * self.block_size;
        Ok(start..start + self.block_size)
    }
}

impl BlockStorage for MemoryDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<usize> {
        let block = &self.arena[self.block_range(blocknr)?];
        let max = buf.len().min(self.block_size);
        buf[..max].copy_from_slice(&block[..max]);
        Ok(max)
    }

    /// This method truncates writes that exceed the total block size.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<usize> {
        let range = self.block_range(blocknr)?;
        let block = &mut self.arena[range];
        let max = buf.len().min(self.block_size);
        block[..max].copy_from_slice(&buf[..max]);
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_device_allocates_correct_num_bytes() {
        let dev = MemoryDevice::new(64, 4).expect("failed to allocate arena");
        assert_eq!(dev.arena.len(), 4 * 64);
        assert_eq!(dev.block_count(), 4);
        assert_eq!(dev.block_size(), 64);
    }

    #[test]
    fn can_read_and_write_blocks() {
        let mut dev = MemoryDevice::new(64, 4).unwrap();

        // Fill a block with a non-zero character.
        let block = vec![0x55; 64];
        assert_eq!(dev.write_block(2, &block).unwrap(), 64);

        // Read a different block.
        let mut read_block = vec![0x00; 64];
        dev.read_block(3, &mut read_block).unwrap();
        assert_eq!(read_block, vec![0x00; 64]);

        // Read the block with data.
        let mut filled_block = vec![0x00; 64];
        dev.read_block(2, &mut filled_block).unwrap();
        assert_eq!(filled_block, vec![0x55; 64]);
    }

    #[test]
    fn can_read_and_write_start_and_end_blocks() {
        let mut dev = MemoryDevice::new(64, 2).unwrap();

        dev.write_block(0, &[0x11; 64]).unwrap();
        dev.write_block(1, &[0x22; 64]).unwrap();

        let mut read_block = vec![0x00; 64];
        dev.read_block(0, &mut read_block).unwrap();
        assert_eq!(read_block, vec![0x11; 64]);
        dev.read_block(1, &mut read_block).unwrap();
        assert_eq!(read_block, vec![0x22; 64]);
    }

    #[test]
    fn access_beyond_range_returns_error() {
        let mut dev = MemoryDevice::new(64, 1).unwrap();

        let err = dev.write_block(1, &[0x55; 64]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut buf = vec![0; 64];
        assert!(dev.read_block(1, &mut buf).is_err());
    }

    #[test]
    fn oversized_writes_are_truncated_to_one_block() {
        let mut dev = MemoryDevice::new(8, 2).unwrap();

        assert_eq!(dev.write_block(0, &[0xAA; 20]).unwrap(), 8);

        // The neighbouring block is untouched.
        let mut buf = vec![0xFF; 8];
        dev.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, vec![0x00; 8]);
    }

    #[test]
    fn partial_reads_copy_only_requested_prefix() {
        let mut dev = MemoryDevice::new(8, 1).unwrap();
        dev.write_block(0, b"abcdefgh").unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(dev.read_block(0, &mut buf).unwrap(), 3);
        assert_eq!(&buf, b"abc");
    }

    #[test]
    fn overflowing_arena_reports_out_of_memory() {
        let err = MemoryDevice::new(usize::MAX, 2).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::OutOfMemory);
    }
}
