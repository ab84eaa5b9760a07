use log::debug;

use crate::alloc::Allocator;
use crate::fs::FsError;
use crate::io::{BlockNumber, BlockStorage};

/// Data region of the file system: a block device whose blocks are handed out by a
/// first-fit allocator. A block returned by `allocate` belongs to the caller until it
/// is passed back to `release`.
pub struct BlockStore<T: BlockStorage> {
    dev: T,
    alloc: Allocator,
}

impl<T: BlockStorage> BlockStore<T> {
    pub fn new(dev: T) -> Self {
        let alloc = Allocator::new(dev.block_count());
        Self { dev, alloc }
    }

    /// Returns ownership of the underlying device to the caller.
    pub fn into_device(self) -> T {
        self.dev
    }

    /// Claims the lowest free block.
    pub fn allocate(&mut self) -> Result<BlockNumber, FsError> {
        let blocknr = self.alloc.allocate().ok_or(FsError::OutOfSpace)?;
        debug!("Claimed block {}, {} remaining.", blocknr, self.alloc.free());
        Ok(blocknr)
    }

    /// Returns a block to the free pool. Panics if the block is not allocated.
    pub fn release(&mut self, blocknr: BlockNumber) {
        self.alloc.release(blocknr);
        debug!("Released block {}, {} remaining.", blocknr, self.alloc.free());
    }

    pub fn write(&mut self, blocknr: BlockNumber, buf: &[u8]) -> Result<usize, FsError> {
        Ok(self.dev.write_block(blocknr, buf)?)
    }

    pub fn read(&self, blocknr: BlockNumber, buf: &mut [u8]) -> Result<usize, FsError> {
        Ok(self.dev.read_block(blocknr, buf)?)
    }

    pub fn is_used(&self, blocknr: BlockNumber) -> bool {
        self.alloc.is_used(blocknr)
    }

    pub fn total_blocks(&self) -> usize {
        self.alloc.capacity()
    }

    pub fn free_blocks(&self) -> usize {
        self.alloc.free()
    }

    pub fn bitmap_bytes(&self) -> &[u8] {
        self.alloc.bitmap().serialize()
    }
}
