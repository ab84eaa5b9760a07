use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::alloc::Allocator;
use crate::fs::FsError;
use crate::io::BlockNumber;

/// Index of a slot in the inode table.
pub type InodeNumber = usize;

/// Metadata record describing one named file. An empty (default) record is what
/// free slots hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Inode {
    /// Unique among occupied slots.
    pub(crate) name: String,
    /// The total size of the file in bytes.
    pub(crate) size: usize,
    /// Data blocks owned by the file in logical order, exactly
    /// `ceil(size / block_size)` of them.
    pub(crate) blocks: Vec<BlockNumber>,
    /// Set once when the file is created.
    pub(crate) create_time: SystemTime,
    /// Updated on every write.
    pub(crate) update_time: SystemTime,
    pub(crate) is_directory: bool,
}

impl Inode {
    pub fn new(name: &str, is_directory: bool, now: SystemTime) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            blocks: Vec::new(),
            create_time: now,
            update_time: now,
            is_directory,
        }
    }
}

impl Default for Inode {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            blocks: Vec::new(),
            create_time: UNIX_EPOCH,
            update_time: UNIX_EPOCH,
            is_directory: false,
        }
    }
}

/// Fixed-capacity inode table. Slots are claimed first-fit and names are indexed
/// so lookups don't scan the table.
pub struct InodeGroup {
    nodes: Vec<Inode>,
    alloc_tracker: Allocator,
    names: HashMap<String, InodeNumber>,
}

impl InodeGroup {
    /// Builds a table of `count` empty slots.
    ///
    /// # Errors
    ///
    /// Returns `FsError::OutOfMemory` if the slot array cannot be allocated.
    pub fn new(count: usize) -> Result<Self, FsError> {
        let mut nodes = Vec::new();
        nodes
            .try_reserve_exact(count)
            .map_err(|_| FsError::OutOfMemory)?;
        nodes.resize_with(count, Inode::default);

        Ok(Self {
            nodes,
            alloc_tracker: Allocator::new(count),
            names: HashMap::new(),
        })
    }

    /// Claims the lowest free slot and stores `node` in it. Name uniqueness is the
    /// caller's responsibility.
    pub fn allocate_slot(&mut self, node: Inode) -> Result<InodeNumber, FsError> {
        let inum = self.alloc_tracker.allocate().ok_or(FsError::OutOfInodes)?;
        self.names.insert(node.name.clone(), inum);
        self.nodes[inum] = node;
        Ok(inum)
    }

    /// Frees a slot and resets its record so nothing leaks into the next occupant.
    /// Panics if the slot is not occupied.
    pub fn release_slot(&mut self, inum: InodeNumber) {
        self.alloc_tracker.release(inum);
        let node = std::mem::take(&mut self.nodes[inum]);
        self.names.remove(&node.name);
    }

    pub fn find_by_name(&self, name: &str) -> Option<InodeNumber> {
        self.names.get(name).copied()
    }

    pub fn get(&self, inum: InodeNumber) -> Option<&Inode> {
        if self.alloc_tracker.is_used(inum) {
            return Some(&self.nodes[inum]);
        }
        None
    }

    pub fn get_mut(&mut self, inum: InodeNumber) -> Option<&mut Inode> {
        if self.alloc_tracker.is_used(inum) {
            return Some(&mut self.nodes[inum]);
        }
        None
    }

    /// Occupied slots in table order.
    pub fn iter(&self) -> impl Iterator<Item = (InodeNumber, &Inode)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(inum, _)| self.alloc_tracker.is_used(*inum))
    }

    pub fn total_nodes(&self) -> usize {
        self.alloc_tracker.capacity()
    }

    pub fn free_nodes(&self) -> usize {
        self.alloc_tracker.free()
    }

    pub fn bitmap_bytes(&self) -> &[u8] {
        self.alloc_tracker.bitmap().serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> Inode {
        Inode::new(name, false, SystemTime::now())
    }

    #[test]
    fn slots_are_claimed_first_fit() {
        let mut group = InodeGroup::new(3).unwrap();
        assert_eq!(group.allocate_slot(node("a")).unwrap(), 0);
        assert_eq!(group.allocate_slot(node("b")).unwrap(), 1);
        group.release_slot(0);
        assert_eq!(group.allocate_slot(node("c")).unwrap(), 0);
        assert_eq!(group.free_nodes(), 1);
    }

    #[test]
    fn full_table_returns_out_of_inodes() {
        let mut group = InodeGroup::new(1).unwrap();
        group.allocate_slot(node("a")).unwrap();
        assert!(matches!(
            group.allocate_slot(node("b")),
            Err(FsError::OutOfInodes)
        ));
        assert_eq!(group.find_by_name("b"), None);
    }

    #[test]
    fn released_slot_is_reset() {
        let mut group = InodeGroup::new(2).unwrap();
        let inum = group.allocate_slot(node("stale")).unwrap();
        {
            let record = group.get_mut(inum).unwrap();
            record.size = 10;
            record.blocks.push(4);
        }

        group.release_slot(inum);

        assert!(group.get(inum).is_none());
        assert_eq!(group.nodes[inum], Inode::default());
        assert_eq!(group.find_by_name("stale"), None);
    }

    #[test]
    fn find_by_name_only_sees_occupied_slots() {
        let mut group = InodeGroup::new(4).unwrap();
        group.allocate_slot(node("first")).unwrap();
        let second = group.allocate_slot(node("second")).unwrap();

        assert_eq!(group.find_by_name("second"), Some(second));
        assert_eq!(group.find_by_name("third"), None);

        group.release_slot(second);
        assert_eq!(group.find_by_name("second"), None);
    }

    #[test]
    fn iter_walks_occupied_slots_in_table_order() {
        let mut group = InodeGroup::new(4).unwrap();
        for name in &["a", "b", "c"] {
            group.allocate_slot(node(name)).unwrap();
        }
        group.release_slot(1);
        group.allocate_slot(node("d")).unwrap();

        let names: Vec<&str> = group.iter().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, vec!["a", "d", "c"]);
    }
}
