/// Gain-indexed bucket list: one doubly linked list of cell ids per gain
/// value, with the links kept in arrays indexed by cell id. Gains in
/// `[-max_pin_count, +max_pin_count]` map to slots `gain + max_pin_count`.
///
/// A cell must be appended and removed at the gain it currently holds; a gain
/// change is always remove-then-append.
pub(crate) struct BucketList {
    heads: Vec<Option<u32>>,
    prev: Vec<Option<u32>>,
    next: Vec<Option<u32>>,
    offset: i32,
    len: usize,
}

impl BucketList {
    pub fn new(max_pin_count: usize, cell_count: usize) -> Self {
        Self {
            heads: vec![None; 2 * max_pin_count + 1],
            prev: vec![None; cell_count],
            next: vec![None; cell_count],
            offset: max_pin_count as i32,
            len: 0,
        }
    }

    fn slot(&self, gain: i32) -> usize {
        debug_assert!(gain.abs() <= self.offset, "gain {gain} out of range");
        (gain + self.offset) as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn append(&mut self, cell: u32, gain: i32) {
        let slot = self.slot(gain);
        let head = self.heads[slot];
        self.prev[cell as usize] = None;
        self.next[cell as usize] = head;
        if let Some(head) = head {
            self.prev[head as usize] = Some(cell);
        }
        self.heads[slot] = Some(cell);
        self.len += 1;
    }

    pub fn remove(&mut self, cell: u32, gain: i32) {
        let slot = self.slot(gain);
        let prev = self.prev[cell as usize];
        let next = self.next[cell as usize];
        match prev {
            Some(prev) => self.next[prev as usize] = next,
            None => {
                debug_assert_eq!(self.heads[slot], Some(cell), "cell not at its tracked gain");
                self.heads[slot] = next;
            }
        }
        if let Some(next) = next {
            self.prev[next as usize] = prev;
        }
        self.prev[cell as usize] = None;
        self.next[cell as usize] = None;
        self.len -= 1;
    }

    /// Head cell of the highest non-empty gain slot, scanning downward from
    /// `+max_pin_count`. The head is the most recently appended cell.
    pub fn top(&self) -> Option<(u32, i32)> {
        for gain in (-self.offset..=self.offset).rev() {
            if let Some(cell) = self.heads[self.slot(gain)] {
                return Some((cell, gain));
            }
        }
        None
    }

    pub fn clear(&mut self) {
        self.heads.iter_mut().for_each(|head| *head = None);
        self.prev.iter_mut().for_each(|link| *link = None);
        self.next.iter_mut().for_each(|link| *link = None);
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_is_lifo_within_a_slot() {
        let mut list = BucketList::new(3, 4);
        list.append(0, 2);
        list.append(1, 2);
        list.append(2, 2);
        assert_eq!(list.len(), 3);
        assert_eq!(list.top(), Some((2, 2)));
    }

    #[test]
    fn remove_from_any_position() {
        let mut list = BucketList::new(3, 4);
        list.append(0, 2);
        list.append(1, 2);
        list.append(2, 2);
        // middle
        list.remove(1, 2);
        assert_eq!(list.top(), Some((2, 2)));
        // head
        list.remove(2, 2);
        assert_eq!(list.top(), Some((0, 2)));
        list.remove(0, 2);
        assert_eq!(list.top(), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn top_scans_downward_across_gains() {
        let mut list = BucketList::new(3, 4);
        list.append(0, -1);
        list.append(1, 3);
        assert_eq!(list.top(), Some((1, 3)));
        list.remove(1, 3);
        assert_eq!(list.top(), Some((0, -1)));
    }

    #[test]
    fn negative_gains_have_their_own_slots() {
        let mut list = BucketList::new(2, 2);
        list.append(0, -2);
        list.append(1, 0);
        assert_eq!(list.top(), Some((1, 0)));
        list.remove(1, 0);
        assert_eq!(list.top(), Some((0, -2)));
    }

    #[test]
    fn clear_resets_everything() {
        let mut list = BucketList::new(2, 3);
        list.append(0, 1);
        list.append(1, -1);
        list.clear();
        assert_eq!(list.len(), 0);
        assert_eq!(list.top(), None);
        // reusable after clear
        list.append(2, 0);
        assert_eq!(list.top(), Some((2, 0)));
    }
}
