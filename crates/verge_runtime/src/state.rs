//! State blocks: layout and accessors.
//!
//! A state is one fixed-size arena block laid out as:
//!
//! ```text
//! [ liveness words ][ packed data bytes ][ auxiliary metadata bits ]
//! ```
//!
//! - **Liveness words**: one bit per liveness property, `u64`-aligned so
//!   they can be accumulated atomically after the state is published.
//! - **Data**: the bit-packed model variables, `STATE_SIZE_BITS` wide.
//!   Equality, ordering, and hashing consider only this region.
//! - **Auxiliary metadata**: `bound` (expansion depth), `previous` (the
//!   predecessor pointer, omitted entirely when neither counterexample
//!   traces nor liveness need it), `rule_taken` (the 1-based linearized id
//!   of the transition that produced this state), and the symmetry
//!   `schedules`. In packed mode each field occupies exactly the bits its
//!   maximal value needs; otherwise each is a 64-bit slot.
//!
//! All layout arithmetic lives in [`StateLayout`], computed once per run.
//! A [`StateRef`] is a copyable pointer to a block; accessors take the
//! layout explicitly. Mutating accessors are `unsafe`: the caller must be
//! the block's sole owner, which is true exactly until the state is
//! inserted into the seen set (liveness words, which stay writable after
//! publication, are atomic and safe).

use crate::config::Config;
use crate::handle::{read_raw, write_raw};
use crate::hash::murmur64a;
use std::ptr::NonNull;
use std::sync::atomic::AtomicU64;

/// Bits needed to store values `0..=max`.
pub fn bits_for(max: u64) -> usize {
    if max == 0 {
        0
    } else {
        64 - max.leading_zeros() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    /// Bit offset within the auxiliary region.
    offset: usize,
    /// Bit width; zero when the field is not stored at all.
    width: usize,
}

/// Where everything lives inside a state block.
#[derive(Debug, Clone)]
pub struct StateLayout {
    pub liveness_count: usize,
    pub liveness_words: usize,
    pub data_bits: usize,
    pub data_bytes: usize,
    bound: Field,
    previous: Field,
    rule_taken: Field,
    schedules: Vec<Field>,
    aux_bytes: usize,
    /// Whole block size in 64-bit words.
    pub total_words: usize,
}

impl StateLayout {
    /// Computes the layout for a model with `data_bits` of state,
    /// `liveness_count` liveness properties, transition ids up to
    /// `rule_id_bound`, and the given per-scalarset schedule widths (in
    /// bits; empty when schedules are disabled).
    pub fn new(
        cfg: &Config,
        data_bits: usize,
        liveness_count: usize,
        rule_id_bound: u64,
        schedule_widths: &[usize],
    ) -> Self {
        let pack = cfg.pack_state;
        let slot = |bits: usize| if pack { bits } else { bits.div_ceil(64) * 64 };

        let bound_width = if cfg.bound > 0 {
            slot(bits_for(cfg.bound))
        } else {
            slot(64)
        };
        let previous_width = if cfg.wants_previous(liveness_count) {
            slot(64)
        } else {
            0
        };
        let rule_width = slot(bits_for(rule_id_bound));

        let mut offset = 0;
        let mut field = |width: usize| {
            let f = Field { offset, width };
            offset += width;
            f
        };
        let bound = field(bound_width);
        let previous = field(previous_width);
        let rule_taken = field(rule_width);
        let schedules: Vec<Field> = schedule_widths.iter().map(|w| field(slot(*w))).collect();

        let aux_bytes = offset.div_ceil(8);
        let liveness_words = liveness_count.div_ceil(64);
        let data_bytes = data_bits.div_ceil(8);
        let total_bytes = liveness_words * 8 + data_bytes + aux_bytes;

        Self {
            liveness_count,
            liveness_words,
            data_bits,
            data_bytes,
            bound,
            previous,
            rule_taken,
            schedules,
            aux_bytes,
            total_words: total_bytes.div_ceil(8).max(1),
        }
    }

    fn data_start(&self) -> usize {
        self.liveness_words * 8
    }

    fn aux_start(&self) -> usize {
        self.data_start() + self.data_bytes
    }

    /// Whether states carry a predecessor pointer.
    pub fn has_previous(&self) -> bool {
        self.previous.width != 0
    }

    /// Number of scalarset schedule fields.
    pub fn schedule_count(&self) -> usize {
        self.schedules.len()
    }

    /// Bytes of one state block.
    pub fn block_bytes(&self) -> usize {
        self.total_words * 8
    }
}

/// A pointer to a state block. Copyable; all structure comes from the
/// layout passed to each accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateRef(NonNull<u64>);

// State blocks are shared across worker threads through the queue and the
// seen set; the mutable-access discipline is documented per accessor.
unsafe impl Send for StateRef {}
unsafe impl Sync for StateRef {}

impl StateRef {
    /// Wraps a block pointer. The block must be a zero-initialized
    /// allocation of `layout.total_words` words.
    pub fn from_block(block: NonNull<u64>) -> Self {
        Self(block)
    }

    pub fn as_block(self) -> NonNull<u64> {
        self.0
    }

    /// The block address, used as a set slot value.
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Reconstructs a reference from a set slot value.
    ///
    /// # Safety
    /// `addr` must have come from [`StateRef::addr`] of a live block.
    pub unsafe fn from_addr(addr: usize) -> Self {
        Self(NonNull::new_unchecked(addr as *mut u64))
    }

    fn bytes(self, layout: &StateLayout) -> &'static [u8] {
        unsafe {
            std::slice::from_raw_parts(self.0.as_ptr() as *const u8, layout.block_bytes())
        }
    }

    /// # Safety
    /// The caller must be the block's sole owner (pre-publication).
    #[allow(clippy::mut_from_ref)]
    unsafe fn bytes_mut(self, layout: &StateLayout) -> &'static mut [u8] {
        std::slice::from_raw_parts_mut(self.0.as_ptr() as *mut u8, layout.block_bytes())
    }

    /// The packed data region.
    pub fn data(self, layout: &StateLayout) -> &'static [u8] {
        &self.bytes(layout)[layout.data_start()..layout.data_start() + layout.data_bytes]
    }

    /// Mutable packed data region.
    ///
    /// # Safety
    /// The caller must be the block's sole owner (pre-publication).
    pub unsafe fn data_mut(self, layout: &StateLayout) -> &'static mut [u8] {
        let start = layout.data_start();
        &mut self.bytes_mut(layout)[start..start + layout.data_bytes]
    }

    fn aux(self, layout: &StateLayout) -> &'static [u8] {
        &self.bytes(layout)[layout.aux_start()..layout.aux_start() + layout.aux_bytes]
    }

    /// # Safety
    /// The caller must be the block's sole owner (pre-publication).
    unsafe fn aux_mut(self, layout: &StateLayout) -> &'static mut [u8] {
        let start = layout.aux_start();
        &mut self.bytes_mut(layout)[start..start + layout.aux_bytes]
    }

    fn read_field(self, layout: &StateLayout, f: Field) -> u64 {
        if f.width == 0 {
            return 0;
        }
        debug_assert!(f.width <= 64, "scalar metadata field wider than 64 bits");
        read_raw(self.aux(layout), f.offset, f.width)
    }

    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    unsafe fn write_field(self, layout: &StateLayout, f: Field, v: u64) {
        if f.width == 0 {
            return;
        }
        debug_assert!(f.width >= 64 || v < (1u64 << f.width), "metadata field overflow");
        write_raw(self.aux_mut(layout), f.offset, f.width, v);
    }

    pub fn bound(self, layout: &StateLayout) -> u64 {
        self.read_field(layout, layout.bound)
    }

    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    pub unsafe fn set_bound(self, layout: &StateLayout, bound: u64) {
        self.write_field(layout, layout.bound, bound);
    }

    pub fn previous(self, layout: &StateLayout) -> Option<StateRef> {
        if !layout.has_previous() {
            return None;
        }
        let addr = self.read_field(layout, layout.previous);
        if addr == 0 {
            None
        } else {
            Some(unsafe { StateRef::from_addr(addr as usize) })
        }
    }

    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    pub unsafe fn set_previous(self, layout: &StateLayout, previous: StateRef) {
        self.write_field(layout, layout.previous, previous.addr() as u64);
    }

    pub fn rule_taken(self, layout: &StateLayout) -> u64 {
        self.read_field(layout, layout.rule_taken)
    }

    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    pub unsafe fn set_rule_taken(self, layout: &StateLayout, rule: u64) {
        self.write_field(layout, layout.rule_taken, rule);
    }

    /// One element of the recorded canonicalization schedule of scalarset
    /// `i`. Schedule regions can exceed 64 bits, so access is per element.
    pub fn schedule_elem(
        self,
        layout: &StateLayout,
        i: usize,
        elem: usize,
        elem_bits: usize,
    ) -> u64 {
        let f = layout.schedules[i];
        debug_assert!((elem + 1) * elem_bits <= f.width, "schedule element out of range");
        read_raw(self.aux(layout), f.offset + elem * elem_bits, elem_bits)
    }

    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    pub unsafe fn set_schedule_elem(
        self,
        layout: &StateLayout,
        i: usize,
        elem: usize,
        elem_bits: usize,
        v: u64,
    ) {
        let f = layout.schedules[i];
        debug_assert!((elem + 1) * elem_bits <= f.width, "schedule element out of range");
        write_raw(self.aux_mut(layout), f.offset + elem * elem_bits, elem_bits, v);
    }

    /// One word of the liveness bitset. Safe after publication: the words
    /// are only ever accumulated with atomic or.
    pub fn liveness_word(self, layout: &StateLayout, word: usize) -> &'static AtomicU64 {
        debug_assert!(word < layout.liveness_words);
        unsafe { &*(self.0.as_ptr().add(word) as *const AtomicU64) }
    }

    /// Initializes this block as a duplicate of `parent`: copies the data
    /// and schedules, links `previous`, increments the depth bound, and
    /// leaves the liveness bits clear (the block must come zeroed from the
    /// allocator).
    ///
    /// # Safety
    /// Sole-owner rule as for [`StateRef::data_mut`].
    pub unsafe fn init_duplicate(self, layout: &StateLayout, parent: StateRef) {
        self.data_mut(layout).copy_from_slice(parent.data(layout));
        for &f in &layout.schedules {
            crate::handle::copy_bits(
                self.aux_mut(layout),
                f.offset,
                parent.aux(layout),
                f.offset,
                f.width,
            );
        }
        if layout.has_previous() {
            self.set_previous(layout, parent);
        }
        self.set_bound(layout, parent.bound(layout) + 1);
    }

    /// Byte-wise equality of the data regions.
    pub fn data_eq(self, other: StateRef, layout: &StateLayout) -> bool {
        self.data(layout) == other.data(layout)
    }

    /// Lexicographic ordering of the data regions.
    pub fn data_cmp(self, other: StateRef, layout: &StateLayout) -> std::cmp::Ordering {
        self.data(layout).cmp(other.data(layout))
    }

    /// Hash of the data region.
    pub fn hash(self, layout: &StateLayout) -> u64 {
        murmur64a(self.data(layout))
    }

    /// Walks `previous` links to count this state's depth (number of
    /// states in its trace, itself included).
    pub fn depth(self, layout: &StateLayout) -> usize {
        let mut depth = 0;
        let mut current = Some(self);
        while let Some(s) = current {
            depth += 1;
            current = s.previous(layout);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::StateAllocator;

    fn test_config(pack: bool) -> Config {
        Config {
            pack_state: pack,
            bound: 10,
            ..Config::default()
        }
    }

    fn alloc_state(arena: &mut StateAllocator) -> StateRef {
        StateRef::from_block(arena.alloc())
    }

    #[test]
    fn bits_for_maxima() {
        assert_eq!(bits_for(0), 0);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(2), 2);
        assert_eq!(bits_for(3), 2);
        assert_eq!(bits_for(4), 3);
        assert_eq!(bits_for(u64::MAX), 64);
    }

    #[test]
    fn packed_layout_is_smaller() {
        let cfg_packed = test_config(true);
        let cfg_plain = test_config(false);
        let packed = StateLayout::new(&cfg_packed, 17, 1, 5, &[6]);
        let plain = StateLayout::new(&cfg_plain, 17, 1, 5, &[6]);
        assert!(packed.block_bytes() <= plain.block_bytes());
        assert_eq!(packed.data_bytes, 3);
        assert_eq!(packed.liveness_words, 1);
    }

    #[test]
    fn metadata_roundtrips_in_both_modes() {
        for pack in [false, true] {
            let cfg = test_config(pack);
            let layout = StateLayout::new(&cfg, 9, 0, 7, &[4]);
            let mut arena = StateAllocator::new(layout.total_words);
            let s = alloc_state(&mut arena);
            unsafe {
                s.set_bound(&layout, 9);
                s.set_rule_taken(&layout, 5);
                s.set_schedule_elem(&layout, 0, 0, 2, 0b10);
                s.set_schedule_elem(&layout, 0, 1, 2, 0b01);
            }
            assert_eq!(s.bound(&layout), 9);
            assert_eq!(s.rule_taken(&layout), 5);
            assert_eq!(s.schedule_elem(&layout, 0, 0, 2), 0b10);
            assert_eq!(s.schedule_elem(&layout, 0, 1, 2), 0b01);
        }
    }

    #[test]
    fn previous_links_and_depth() {
        let cfg = Config::default(); // cex diff => previous stored
        let layout = StateLayout::new(&cfg, 8, 0, 3, &[]);
        assert!(layout.has_previous());
        let mut arena = StateAllocator::new(layout.total_words);
        let root = alloc_state(&mut arena);
        let child = alloc_state(&mut arena);
        unsafe {
            child.init_duplicate(&layout, root);
        }
        assert_eq!(child.previous(&layout), Some(root));
        assert_eq!(root.previous(&layout), None);
        assert_eq!(child.bound(&layout), 1);
        assert_eq!(child.depth(&layout), 2);
    }

    #[test]
    fn previous_omitted_when_unneeded() {
        let cfg = Config {
            counterexample_trace: crate::config::CounterexampleTrace::Off,
            ..Config::default()
        };
        let layout = StateLayout::new(&cfg, 8, 0, 3, &[]);
        assert!(!layout.has_previous());
    }

    #[test]
    fn duplicate_copies_data_but_not_liveness() {
        let cfg = Config::default();
        let layout = StateLayout::new(&cfg, 16, 3, 3, &[]);
        let mut arena = StateAllocator::new(layout.total_words);
        let parent = alloc_state(&mut arena);
        unsafe {
            parent.data_mut(&layout)[0] = 0xab;
        }
        parent
            .liveness_word(&layout, 0)
            .fetch_or(0b101, std::sync::atomic::Ordering::SeqCst);

        let child = alloc_state(&mut arena);
        unsafe {
            child.init_duplicate(&layout, parent);
        }
        assert_eq!(child.data(&layout)[0], 0xab);
        assert!(parent.data_eq(child, &layout));
        assert_eq!(
            child
                .liveness_word(&layout, 0)
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }

    #[test]
    fn data_hash_ignores_metadata() {
        let cfg = Config::default();
        let layout = StateLayout::new(&cfg, 16, 0, 3, &[]);
        let mut arena = StateAllocator::new(layout.total_words);
        let a = alloc_state(&mut arena);
        let b = alloc_state(&mut arena);
        unsafe {
            a.set_rule_taken(&layout, 1);
            b.set_rule_taken(&layout, 2);
        }
        assert_eq!(a.hash(&layout), b.hash(&layout));
        assert!(a.data_eq(b, &layout));
    }
}
