use zerocopy::AsBytes;

#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

/// Occupancy bitmap packing one bit per unit into `u64` words. Bits past `cap` in the
/// last word are never set.
#[derive(Debug, Clone)]
pub struct Bitmap {
    bitmap: Vec<u64>,
    cap: usize,
}

impl Bitmap {
    pub fn new(cap: usize) -> Self {
        Self {
            bitmap: vec![0; (cap + 63) / 64],
            cap,
        }
    }

    /// Raw view of the bitmap words in native byte order.
    pub fn serialize(&self) -> &[u8] {
        self.bitmap.as_slice().as_bytes()
    }

    pub fn get(&self, nr: usize) -> State {
        assert!(nr < self.cap, "unit {} outside bitmap of {}", nr, self.cap);
        // Grab the u64 containing the significant bit.
        let word = self.bitmap[nr / 64];

        let inner_offset = nr % 64;
        match (word >> inner_offset) & 0b01 {
            0 => State::Free,
            _ => State::Used,
        }
    }

    pub fn set_reserved(&mut self, nr: usize) {
        assert!(nr < self.cap, "unit {} outside bitmap of {}", nr, self.cap);
        self.bitmap[nr / 64] |= 0b01_u64 << (nr % 64);
    }

    pub fn set_free(&mut self, nr: usize) {
        assert!(nr < self.cap, "unit {} outside bitmap of {}", nr, self.cap);
        self.bitmap[nr / 64] &= !(0b01_u64 << (nr % 64));
    }

    /// Returns the lowest free unit, if any.
    pub fn first_free(&self) -> Option<usize> {
        self.bitmap
            .iter()
            .enumerate()
            .find(|(_, word)| **word != u64::MAX)
            .map(|(pos, word)| pos * 64 + word.trailing_ones() as usize)
            .filter(|&nr| nr < self.cap)
    }
}

/// Implements a first-fit allocation policy over a bitmap: every claim returns the
/// lowest-numbered free unit. Used for both data blocks and inode slots.
///
/// ## Other Allocation Policies
///
/// 1. Allocation that attempts to find enough contiguous available blocks so data can be allocated
///    close together (speed ups through sequential reads).
/// 2. Allocation that attempts to spread randomly over blocks to prevent wear of physical devices
///    in the front section (that may be rewritten many times before allocating to the back).
#[derive(Debug, Clone)]
pub struct Allocator {
    /// A simple bitmap tracking which units are allocated and which are free.
    bitmap: Bitmap,
    /// Always equal to the number of free bits in `bitmap`.
    free: usize,
}

impl Allocator {
    pub fn new(cap: usize) -> Self {
        Self {
            bitmap: Bitmap::new(cap),
            free: cap,
        }
    }

    /// Claims the lowest free unit. Runs in O(cap / 64).
    pub fn allocate(&mut self) -> Option<usize> {
        let nr = self.bitmap.first_free()?;
        self.bitmap.set_reserved(nr);
        self.free -= 1;
        Some(nr)
    }

    /// Returns a unit to the free pool.
    ///
    /// # Panics
    ///
    /// Releasing a unit that is not currently allocated is a caller bug and panics
    /// rather than corrupting the free count.
    pub fn release(&mut self, nr: usize) {
        assert_eq!(
            self.bitmap.get(nr),
            State::Used,
            "release of unallocated unit {}",
            nr
        );
        self.bitmap.set_free(nr);
        self.free += 1;
    }

    pub fn is_used(&self, nr: usize) -> bool {
        nr < self.bitmap.cap && self.bitmap.get(nr) == State::Used
    }

    pub fn free(&self) -> usize {
        self.free
    }

    pub fn capacity(&self) -> usize {
        self.bitmap.cap
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_and_write_values_to_bitmap() {
        let mut bmp = Bitmap::new(128);

        bmp.set_reserved(2);

        assert_eq!(bmp.get(0), State::Free);
        assert_eq!(bmp.get(2), State::Used);
    }

    #[test]
    fn can_set_values_at_ends_of_bitmap() {
        let mut bmp = Bitmap::new(4096);

        bmp.set_reserved(0);
        bmp.set_reserved(4095);

        assert_eq!(bmp.get(0), State::Used);
        assert_eq!(bmp.get(4095), State::Used);
    }

    #[test]
    fn can_toggle_block_between_free_and_used() {
        let mut bmp = Bitmap::new(64);
        bmp.set_reserved(9);
        bmp.set_reserved(10);
        assert_eq!(bmp.get(10), State::Used);

        bmp.set_free(10);
        assert_eq!(bmp.get(10), State::Free);
        // Neighbouring bits survive.
        assert_eq!(bmp.get(9), State::Used);
    }

    #[test]
    #[should_panic]
    fn access_past_capacity_panics() {
        let bmp = Bitmap::new(10);
        bmp.get(10);
    }

    #[test]
    fn serialized_bitmap_exposes_word_bytes() {
        let mut bmp = Bitmap::new(70);
        bmp.set_reserved(0);
        bmp.set_reserved(64);

        let bytes = bmp.serialize();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[0..8], &1u64.to_ne_bytes());
        assert_eq!(&bytes[8..16], &1u64.to_ne_bytes());
    }

    #[test]
    fn first_free_ignores_bits_past_capacity() {
        let mut bmp = Bitmap::new(3);
        bmp.set_reserved(0);
        bmp.set_reserved(1);
        assert_eq!(bmp.first_free(), Some(2));
        bmp.set_reserved(2);
        assert_eq!(bmp.first_free(), None);
    }

    #[test]
    fn allocator_is_first_fit() {
        let mut alloc = Allocator::new(4);
        assert_eq!(alloc.allocate(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        assert_eq!(alloc.allocate(), Some(2));

        alloc.release(1);
        assert_eq!(alloc.allocate(), Some(1));
        assert_eq!(alloc.allocate(), Some(3));
        assert_eq!(alloc.allocate(), None);
    }

    #[test]
    fn free_count_tracks_claims_and_releases() {
        let mut alloc = Allocator::new(130);
        let claimed: Vec<usize> = (0..100).filter_map(|_| alloc.allocate()).collect();
        assert_eq!(claimed.len(), 100);
        assert_eq!(alloc.free(), 30);

        for nr in claimed.into_iter().step_by(2) {
            alloc.release(nr);
        }
        assert_eq!(alloc.free(), 80);
        let used = (0..alloc.capacity()).filter(|&nr| alloc.is_used(nr)).count();
        assert_eq!(alloc.free() + used, alloc.capacity());
    }

    #[test]
    #[should_panic(expected = "release of unallocated unit")]
    fn double_release_panics() {
        let mut alloc = Allocator::new(4);
        let nr = alloc.allocate().unwrap();
        alloc.release(nr);
        alloc.release(nr);
    }
}
