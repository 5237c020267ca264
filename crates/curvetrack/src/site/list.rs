//! Ordered site container with stable handles.
//!
//! Sites live in an arena of slots linked both ways, so head/tail insertion,
//! insertion next to a known site and removal at a cursor are all O(1), and a
//! [`SiteId`] stays valid until its own site is removed. List order is the
//! curve-parameter order; nothing here enforces it, callers insert at the end
//! that matches the curve.

use serde::{Serialize, Serializer};

use super::Site;
use crate::geometry::ImagePoint;

/// Stable handle to a site in a [`SiteList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SiteId {
    slot: usize,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Node {
    site: Site,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Ordered sequence of sites.
#[derive(Debug, Clone, Default)]
pub struct SiteList {
    slots: Vec<Slot>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl SiteList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Remove every site. Outstanding handles become stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free.push(i);
        }
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn front(&self) -> Option<&Site> {
        self.head.and_then(|i| self.node(i)).map(|n| &n.site)
    }

    pub fn back(&self) -> Option<&Site> {
        self.tail.and_then(|i| self.node(i)).map(|n| &n.site)
    }

    pub fn front_id(&self) -> Option<SiteId> {
        self.head.map(|i| self.id_of(i))
    }

    pub fn back_id(&self) -> Option<SiteId> {
        self.tail.map(|i| self.id_of(i))
    }

    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.resolve(id).and_then(|i| self.node(i)).map(|n| &n.site)
    }

    pub fn get_mut(&mut self, id: SiteId) -> Option<&mut Site> {
        let i = self.resolve(id)?;
        self.node_mut(i).map(|n| &mut n.site)
    }

    pub fn push_front(&mut self, site: Site) -> SiteId {
        let i = self.alloc(site, None, self.head);
        match self.head {
            Some(h) => self.set_prev(h, Some(i)),
            None => self.tail = Some(i),
        }
        self.head = Some(i);
        self.id_of(i)
    }

    pub fn push_back(&mut self, site: Site) -> SiteId {
        let i = self.alloc(site, self.tail, None);
        match self.tail {
            Some(t) => self.set_next(t, Some(i)),
            None => self.head = Some(i),
        }
        self.tail = Some(i);
        self.id_of(i)
    }

    pub fn pop_front(&mut self) -> Option<Site> {
        let h = self.head?;
        self.unlink(h)
    }

    pub fn pop_back(&mut self) -> Option<Site> {
        let t = self.tail?;
        self.unlink(t)
    }

    /// Insert `site` right after `id`; `None` if `id` is stale.
    pub fn insert_after(&mut self, id: SiteId, site: Site) -> Option<SiteId> {
        let at = self.resolve(id)?;
        let i = self.link_after(at, site);
        Some(self.id_of(i))
    }

    /// Insert `site` right before `id`; `None` if `id` is stale.
    pub fn insert_before(&mut self, id: SiteId, site: Site) -> Option<SiteId> {
        let at = self.resolve(id)?;
        let i = self.link_before(at, site);
        Some(self.id_of(i))
    }

    pub fn remove(&mut self, id: SiteId) -> Option<Site> {
        let i = self.resolve(id)?;
        self.unlink(i)
    }

    /// Keep only the sites for which `keep` returns `true`; returns how many were removed.
    pub fn retain<F: FnMut(&Site) -> bool>(&mut self, mut keep: F) -> usize {
        let mut removed = 0;
        let mut cur = self.head;
        while let Some(i) = cur {
            let (next, drop) = match self.node(i) {
                Some(n) => (n.next, !keep(&n.site)),
                None => break,
            };
            if drop {
                self.unlink(i);
                removed += 1;
            }
            cur = next;
        }
        removed
    }

    /// Visit every site mutably, in list order.
    pub fn for_each_mut<F: FnMut(&mut Site)>(&mut self, mut f: F) {
        let mut cur = self.head;
        while let Some(i) = cur {
            match self.node_mut(i) {
                Some(n) => {
                    f(&mut n.site);
                    cur = n.next;
                }
                None => break,
            }
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            front: self.head,
            back: self.tail,
            remaining: self.len,
        }
    }

    pub fn positions(&self) -> Vec<ImagePoint> {
        self.iter().map(Site::position).collect()
    }

    /// Cursor on the first site (or on the ghost position when empty).
    pub fn cursor_front_mut(&mut self) -> CursorMut<'_> {
        let current = self.head;
        CursorMut {
            list: self,
            current,
        }
    }

    /// Cursor on the last site (or on the ghost position when empty).
    pub fn cursor_back_mut(&mut self) -> CursorMut<'_> {
        let current = self.tail;
        CursorMut {
            list: self,
            current,
        }
    }

    // ── internals ──────────────────────────────────────────────────────

    fn node(&self, i: usize) -> Option<&Node> {
        self.slots.get(i).and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, i: usize) -> Option<&mut Node> {
        self.slots.get_mut(i).and_then(|s| s.node.as_mut())
    }

    fn id_of(&self, i: usize) -> SiteId {
        SiteId {
            slot: i,
            generation: self.slots[i].generation,
        }
    }

    fn resolve(&self, id: SiteId) -> Option<usize> {
        let slot = self.slots.get(id.slot)?;
        (slot.generation == id.generation && slot.node.is_some()).then_some(id.slot)
    }

    fn set_prev(&mut self, i: usize, prev: Option<usize>) {
        if let Some(n) = self.node_mut(i) {
            n.prev = prev;
        }
    }

    fn set_next(&mut self, i: usize, next: Option<usize>) {
        if let Some(n) = self.node_mut(i) {
            n.next = next;
        }
    }

    fn alloc(&mut self, site: Site, prev: Option<usize>, next: Option<usize>) -> usize {
        let node = Node { site, prev, next };
        self.len += 1;
        match self.free.pop() {
            Some(i) => {
                self.slots[i].node = Some(node);
                i
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    fn link_after(&mut self, at: usize, site: Site) -> usize {
        let next = self.node(at).and_then(|n| n.next);
        let i = self.alloc(site, Some(at), next);
        self.set_next(at, Some(i));
        match next {
            Some(nx) => self.set_prev(nx, Some(i)),
            None => self.tail = Some(i),
        }
        i
    }

    fn link_before(&mut self, at: usize, site: Site) -> usize {
        let prev = self.node(at).and_then(|n| n.prev);
        let i = self.alloc(site, prev, Some(at));
        self.set_prev(at, Some(i));
        match prev {
            Some(pv) => self.set_next(pv, Some(i)),
            None => self.head = Some(i),
        }
        i
    }

    fn unlink(&mut self, i: usize) -> Option<Site> {
        let slot = self.slots.get_mut(i)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        match node.prev {
            Some(pv) => self.set_next(pv, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(nx) => self.set_prev(nx, node.prev),
            None => self.tail = node.prev,
        }
        self.free.push(i);
        self.len -= 1;
        Some(node.site)
    }
}

impl FromIterator<Site> for SiteList {
    fn from_iter<I: IntoIterator<Item = Site>>(iter: I) -> Self {
        let mut list = SiteList::new();
        list.extend(iter);
        list
    }
}

impl Extend<Site> for SiteList {
    fn extend<I: IntoIterator<Item = Site>>(&mut self, iter: I) {
        for site in iter {
            self.push_back(site);
        }
    }
}

impl<'a> IntoIterator for &'a SiteList {
    type Item = &'a Site;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl Serialize for SiteList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// Front-to-back iterator over a [`SiteList`].
pub struct Iter<'a> {
    list: &'a SiteList,
    front: Option<usize>,
    back: Option<usize>,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Site;

    fn next(&mut self) -> Option<&'a Site> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.front?)?;
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.site)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<&'a Site> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.back?)?;
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.site)
    }
}

impl ExactSizeIterator for Iter<'_> {}

/// Explicit editing position inside a [`SiteList`].
///
/// The cursor either points at a site or at the "ghost" position between the
/// back and the front of the list; moving past either end lands on the ghost,
/// and moving from the ghost wraps to the opposite end.
pub struct CursorMut<'a> {
    list: &'a mut SiteList,
    current: Option<usize>,
}

impl<'a> CursorMut<'a> {
    pub fn current(&self) -> Option<&Site> {
        self.current
            .and_then(|i| self.list.node(i))
            .map(|n| &n.site)
    }

    pub fn current_mut(&mut self) -> Option<&mut Site> {
        let i = self.current?;
        self.list.node_mut(i).map(|n| &mut n.site)
    }

    pub fn current_id(&self) -> Option<SiteId> {
        self.current.map(|i| self.list.id_of(i))
    }

    pub fn peek_next(&self) -> Option<&Site> {
        let next = match self.current {
            Some(i) => self.list.node(i)?.next,
            None => self.list.head,
        };
        next.and_then(|i| self.list.node(i)).map(|n| &n.site)
    }

    pub fn peek_prev(&self) -> Option<&Site> {
        let prev = match self.current {
            Some(i) => self.list.node(i)?.prev,
            None => self.list.tail,
        };
        prev.and_then(|i| self.list.node(i)).map(|n| &n.site)
    }

    pub fn move_next(&mut self) {
        self.current = match self.current {
            Some(i) => self.list.node(i).and_then(|n| n.next),
            None => self.list.head,
        };
    }

    pub fn move_prev(&mut self) {
        self.current = match self.current {
            Some(i) => self.list.node(i).and_then(|n| n.prev),
            None => self.list.tail,
        };
    }

    /// Remove the current site; the cursor moves to its successor.
    pub fn remove_current(&mut self) -> Option<Site> {
        let i = self.current?;
        self.current = self.list.node(i).and_then(|n| n.next);
        self.list.unlink(i)
    }

    /// Insert after the current site (at the front when on the ghost).
    /// The cursor does not move.
    pub fn insert_after(&mut self, site: Site) -> SiteId {
        match self.current {
            Some(i) => {
                let j = self.list.link_after(i, site);
                self.list.id_of(j)
            }
            None => self.list.push_front(site),
        }
    }

    /// Insert before the current site (at the back when on the ghost).
    /// The cursor does not move.
    pub fn insert_before(&mut self, site: Site) -> SiteId {
        match self.current {
            Some(i) => {
                let j = self.list.link_before(i, site);
                self.list.id_of(j)
            }
            None => self.list.push_back(site),
        }
    }
}
