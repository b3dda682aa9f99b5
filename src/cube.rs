//! Crate `cube` provides [`Cube`], [`TCube`], and the proof-obligation record
//! [`Pobl`] built on top of it (`spec.md` §3 "Cube", "TCube", "Proof
//! obligation").
use std::cmp::Ordering;
use std::rc::Rc;

use crate::netlist::GateRef;

/// A sorted, duplicate-free sequence of signed gate references, all of whose
/// referents are flops. Backed by an `Rc<[GateRef]>` so a cube can be passed
/// and cloned cheaply (`spec.md` §3, §9 "Reference-counted cubes").
#[derive(Clone)]
pub struct Cube(Rc<[GateRef]>);

impl Cube {
    /// Build a cube from arbitrary literals, sorting and deduplicating.
    pub fn new(mut lits: Vec<GateRef>) -> Cube {
        lits.sort_unstable();
        lits.dedup();
        Cube(Rc::from(lits))
    }

    /// The cube with zero literals — the predicate `true`. Distinct from
    /// "no cube at all"; see [`crate::cube::TCube`] for the latter, which is
    /// represented with `Frame::Null` rather than as a special `Cube` value
    /// (`spec.md` §3 "Null-cube is the distinguished absent value" becomes,
    /// idiomatically, `Option<Cube>`/`Frame::Null` rather than a sentinel
    /// slice — see `DESIGN.md`).
    pub fn tru() -> Cube {
        Cube(Rc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GateRef> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[GateRef] {
        &self.0
    }

    pub fn contains(&self, lit: GateRef) -> bool {
        self.0.binary_search(&lit).is_ok()
    }

    /// Does every literal of `self` appear in `other`? (i.e. does `self`
    /// logically imply `other`'s negation is no weaker — `self` is the more
    /// general, `other` the more specific cube.)
    pub fn subsumes(&self, other: &Cube) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let mut j = 0;
        for lit in self.iter() {
            while j < other.len() && other.0[j] < *lit {
                j += 1;
            }
            if j >= other.len() || other.0[j] != *lit {
                return false;
            }
        }
        true
    }

    /// The clause `¬c`, i.e. the literal-wise negation of this cube's
    /// literals, as used for the blocking clause emitted by
    /// [`crate::frame_trace::FrameTrace::add_cube`].
    pub fn negate_to_clause(&self) -> Vec<GateRef> {
        self.iter().map(|l| l.negate()).collect()
    }

    /// Build a new cube keeping only the literals at the given indices, used
    /// by [`crate::generalize`] when dropping literals from a candidate.
    pub fn retain_indices(&self, keep: &[bool]) -> Cube {
        debug_assert_eq!(keep.len(), self.len());
        let lits: Vec<GateRef> = self
            .iter()
            .zip(keep.iter())
            .filter_map(|(l, k)| if *k { Some(*l) } else { None })
            .collect();
        Cube(Rc::from(lits))
    }
}

impl PartialEq for Cube {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_ref() == other.0.as_ref()
    }
}
impl Eq for Cube {}

impl std::hash::Hash for Cube {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl PartialOrd for Cube {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cube {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_ref().cmp(other.0.as_ref())
    }
}

impl std::fmt::Debug for Cube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, l) in self.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            write!(f, "{}{}", if l.inv { "!" } else { "" }, l.id)?;
        }
        write!(f, "]")
    }
}

/// A frame index, or one of the two sentinels `spec.md` §3 names. `At(0)` is
/// the special frame that *is* the initial-state predicate rather than a
/// stored cube set (see [`crate::frame_trace::FrameTrace`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Frame {
    At(u32),
    /// Holds globally — the cube sits in `F[∞]`.
    Inf,
    /// Untimed / absent.
    Null,
}

impl Frame {
    pub fn succ(self) -> Frame {
        match self {
            Frame::At(k) => Frame::At(k + 1),
            other => other,
        }
    }

    pub fn pred(self) -> Frame {
        match self {
            Frame::At(k) if k > 0 => Frame::At(k - 1),
            other => other,
        }
    }

    pub fn index(self) -> Option<u32> {
        match self {
            Frame::At(k) => Some(k),
            _ => None,
        }
    }
}

/// A `(Cube, frame)` pair (`spec.md` §3 "TCube"). `is_valid` replaces the
/// source's truthiness coercion on `FRAME_NULL` — Rust has no implicit bool
/// conversion, so the check becomes an explicit method.
#[derive(Clone, Debug)]
pub struct TCube {
    pub cube: Cube,
    pub frame: Frame,
}

impl TCube {
    pub fn new(cube: Cube, frame: Frame) -> TCube {
        TCube { cube, frame }
    }

    pub fn null() -> TCube {
        TCube { cube: Cube::tru(), frame: Frame::Null }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self.frame, Frame::Null)
    }
}

/// A reference-counted proof obligation: `{tcube, priority, parent}`
/// (`spec.md` §3). The `parent` chain is a tree (no cycles can form, since
/// every obligation is created strictly after its parent), so plain `Rc` is
/// enough — `spec.md` §9 explicitly notes no weak references are required.
#[derive(Debug)]
pub struct Pobl {
    pub tcube: TCube,
    pub priority: u64,
    pub parent: Option<Rc<Pobl>>,
    /// Secondary sort key used ahead of `priority` when `Config::sort_pob_size`
    /// is enabled (`spec.md` §6 `sort_pob_size`): the obligation's cube size,
    /// or `0` when the flag is off, in which case this key never breaks a
    /// tie and `priority` alone decides order as before. Decided by the
    /// caller (`crate::pdr::PdrEngine`) at construction time rather than
    /// looked up from a config reference here, so `Pobl` itself stays a
    /// plain data record.
    pub size_key: u32,
}

impl Pobl {
    pub fn root(tcube: TCube, priority: u64, size_key: u32) -> Rc<Pobl> {
        Rc::new(Pobl { tcube, priority, parent: None, size_key })
    }

    pub fn child(tcube: TCube, priority: u64, size_key: u32, parent: &Rc<Pobl>) -> Rc<Pobl> {
        Rc::new(Pobl { tcube, priority, parent: Some(Rc::clone(parent)), size_key })
    }

    pub fn frame_index(&self) -> u32 {
        self.tcube.frame.index().unwrap_or(0)
    }
}

/// Ordering for the proof-obligation queue (`spec.md` §5 "Ordering
/// guarantees"): smaller frame first, then (when `sort_pob_size` populated
/// `size_key`) smaller cube first, then smaller priority first. Wrapped so a
/// `BinaryHeap` (a max-heap) pops the *least* element first — the same
/// inversion the teacher's decision-variable heap applies in
/// `assign/select.rs`.
#[derive(Debug)]
pub struct PoblOrd(pub Rc<Pobl>);

impl PartialEq for PoblOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.frame_index() == other.0.frame_index()
            && self.0.size_key == other.0.size_key
            && self.0.priority == other.0.priority
    }
}
impl Eq for PoblOrd {}

impl PartialOrd for PoblOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PoblOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap::pop` returns smallest-frame /
        // smallest-size / smallest-priority first.
        other
            .0
            .frame_index()
            .cmp(&self.0.frame_index())
            .then_with(|| other.0.size_key.cmp(&self.0.size_key))
            .then_with(|| other.0.priority.cmp(&self.0.priority))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(id: u32, inv: bool) -> GateRef {
        GateRef { id, inv }
    }

    #[test]
    fn subsumption_is_subset_on_sorted_literals() {
        let small = Cube::new(vec![lit(2, false), lit(5, true)]);
        let big = Cube::new(vec![lit(1, false), lit(2, false), lit(5, true), lit(9, false)]);
        assert!(small.subsumes(&big));
        assert!(!big.subsumes(&small));
    }

    #[test]
    fn empty_cube_subsumes_everything() {
        let tru = Cube::tru();
        let any = Cube::new(vec![lit(3, false)]);
        assert!(tru.subsumes(&any));
        assert!(!any.subsumes(&tru));
    }

    #[test]
    fn dedup_and_sort_on_construction() {
        let c = Cube::new(vec![lit(3, false), lit(1, true), lit(3, false)]);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn tcube_null_is_invalid() {
        assert!(!TCube::null().is_valid());
        assert!(TCube::new(Cube::tru(), Frame::At(0)).is_valid());
    }

    #[test]
    fn obligation_queue_orders_by_frame_then_priority() {
        use std::collections::BinaryHeap;
        let mut heap = BinaryHeap::new();
        let a = Pobl::root(TCube::new(Cube::tru(), Frame::At(3)), 5, 0);
        let b = Pobl::root(TCube::new(Cube::tru(), Frame::At(1)), 9, 0);
        let c = Pobl::root(TCube::new(Cube::tru(), Frame::At(1)), 2, 0);
        heap.push(PoblOrd(a));
        heap.push(PoblOrd(b));
        heap.push(PoblOrd(c));
        let first = heap.pop().unwrap().0;
        assert_eq!(first.frame_index(), 1);
        assert_eq!(first.priority, 2);
    }

    // `spec.md` §8 item 1 ("cube subsumption monotonicity") is stated over
    // the frame trace, but the subsumption relation itself is the piece
    // worth property-testing directly: it must be reflexive and antisymmetric
    // over the sorted/deduped representation `Cube::new` normalizes to,
    // regardless of what order or duplication the caller handed in. The
    // pack's own closest-fit repos for algebraic-invariant testing
    // (`logannye-tinyzkp`, the FRI/AIR examples under `other_examples/`)
    // reach for `proptest` instead of hand-picked example cases for exactly
    // this shape of property.
    mod subsumption_properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_lits(max_id: u32, max_len: usize) -> impl Strategy<Value = Vec<GateRef>> {
            proptest::collection::vec((0..max_id, any::<bool>()), 0..max_len)
                .prop_map(|v| v.into_iter().map(|(id, inv)| lit(id, inv)).collect())
        }

        proptest! {
            #[test]
            fn construction_is_sorted_and_deduped(raw in arb_lits(12, 10)) {
                let cube = Cube::new(raw);
                let lits: Vec<GateRef> = cube.iter().copied().collect();
                let mut sorted = lits.clone();
                sorted.sort_unstable();
                sorted.dedup();
                prop_assert_eq!(lits, sorted);
            }

            #[test]
            fn subsumption_is_reflexive(raw in arb_lits(12, 10)) {
                let cube = Cube::new(raw);
                prop_assert!(cube.subsumes(&cube));
            }

            #[test]
            fn mutual_subsumption_implies_equality(a in arb_lits(8, 8), b in arb_lits(8, 8)) {
                let ca = Cube::new(a);
                let cb = Cube::new(b);
                if ca.subsumes(&cb) && cb.subsumes(&ca) {
                    prop_assert_eq!(ca, cb);
                }
            }

            #[test]
            fn subset_of_literals_always_subsumes(raw in arb_lits(12, 10), drop_every_other in any::<bool>()) {
                let full = Cube::new(raw);
                let kept: Vec<bool> = (0..full.len())
                    .map(|i| if drop_every_other { i % 2 == 0 } else { true })
                    .collect();
                let subset = full.retain_indices(&kept);
                prop_assert!(subset.subsumes(&full));
            }
        }
    }
}
