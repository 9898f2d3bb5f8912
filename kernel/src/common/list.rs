//! An intrusive singly-linked list: nodes carry their own `next` link, so
//! the list itself never allocates. Used for the scheduler's ready queue and
//! for the per-process heap-region list, both made of zone-allocated nodes
//! that must not pull in `alloc`.

use core::cell::Cell;

pub struct ListLink<'a, T: ?Sized>(Cell<Option<&'a T>>);

impl<'a, T: ?Sized> ListLink<'a, T> {
    pub const fn empty() -> ListLink<'a, T> {
        ListLink(Cell::new(None))
    }
}

pub trait ListNode<'a, T: ?Sized> {
    fn next(&'a self) -> &'a ListLink<'a, T>;
}

pub struct List<'a, T: 'a + ?Sized + ListNode<'a, T>> {
    head: ListLink<'a, T>,
}

pub struct ListIterator<'a, T: 'a + ?Sized + ListNode<'a, T>> {
    cur: Option<&'a T>,
}

impl<'a, T: ?Sized + ListNode<'a, T>> Iterator for ListIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let cur = self.cur;
        self.cur = match cur {
            Some(node) => node.next().0.get(),
            None => None,
        };
        cur
    }
}

impl<'a, T: ?Sized + ListNode<'a, T>> List<'a, T> {
    pub const fn new() -> List<'a, T> {
        List {
            head: ListLink::empty(),
        }
    }

    pub fn head(&self) -> Option<&'a T> {
        self.head.0.get()
    }

    pub fn is_empty(&self) -> bool {
        self.head.0.get().is_none()
    }

    pub fn iter(&self) -> ListIterator<'a, T> {
        ListIterator {
            cur: self.head.0.get(),
        }
    }

    /// Pushes `node` onto the front of the list.
    pub fn push_head(&self, node: &'a T) {
        node.next().0.set(self.head.0.get());
        self.head.0.set(Some(node));
    }

    /// Appends `node` to the end of the list.
    pub fn push_tail(&self, node: &'a T) {
        node.next().0.set(None);
        match self.iter().last() {
            Some(last) => last.next().0.set(Some(node)),
            None => self.head.0.set(Some(node)),
        }
    }

    /// Removes and returns the head of the list.
    pub fn pop_head(&self) -> Option<&'a T> {
        let head = self.head.0.get();
        if let Some(node) = head {
            self.head.0.set(node.next().0.get());
            node.next().0.set(None);
        }
        head
    }
}
