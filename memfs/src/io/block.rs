/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available.
pub type BlockNumber = usize;

/// Raw access to a fixed number of fixed-size blocks. The engine only ever talks to
/// storage through this trait, allocation and ownership are tracked above it.
pub trait BlockStorage {
    /// The capacity of a single block in bytes.
    fn block_size(&self) -> usize;
    /// The total number of blocks available on the device.
    fn block_count(&self) -> usize;
    /// Reads the leading bytes of a block into the provided buffer, filling at most
    /// one block worth of bytes. Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range will return an error.
    fn read_block(&self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<usize>;
    /// Writes provided buffer into the start of the specified block. Buffers longer
    /// than a block are truncated. Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range will return an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<usize>;
}
