use std::{marker::PhantomData, ptr::NonNull};


/// Non-null pointer to `T`.
pub(crate) type Link<T> = Option<NonNull<T>>;

/// Implemented by structures that carry their own list link. The list never
/// allocates, nodes live wherever the caller wrote them (for the heap, inside
/// the arena itself).
pub(crate) trait Linked: Sized {
    fn next(&self) -> Link<Self>;

    fn set_next(&mut self, next: Link<Self>);
}

/// Intrusive singly linked list.
///
/// ```text
///  head
///   |
/// +-v----+      +------+      +------+
/// | node | ---> | node | ---> | node | ---> None
/// +------+      +------+      +------+
/// ```
///
/// Removing a node needs its predecessor, which the caller gets from the
/// same [`Iter`] pass that found the node.
pub(crate) struct List<T: Linked> {
    head: Link<T>,
    len: usize,
    marker: PhantomData<T>,
}

/// A node together with the node that precedes it in the list (`None` for
/// the head).
pub(crate) struct Cursor<T> {
    pub node: NonNull<T>,
    pub prev: Link<T>,
}

// Derived impls would require `T: Copy`.
impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Cursor<T> {}

pub(crate) struct Iter<'a, T: Linked> {
    current: Link<T>,
    prev: Link<T>,
    remaining: usize,
    marker: PhantomData<&'a T>,
}

impl<T: Linked> List<T> {
    pub const fn new() -> Self {
        Self {
            head: None,
            len: 0,
            marker: PhantomData,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forgets every node. The nodes themselves are left untouched.
    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }

    /// Links `node` in front of the current head.
    ///
    /// **SAFETY**: `node` must point to a valid `T` that is not already in
    /// this list and stays valid while it is linked.
    pub unsafe fn push_front(&mut self, mut node: NonNull<T>) {
        unsafe {
            node.as_mut().set_next(self.head);
        }

        self.head = Some(node);
        self.len += 1;
    }

    /// Unlinks `node`, redirecting `prev` (or the head when `prev` is `None`)
    /// to the node that followed it.
    ///
    /// **SAFETY**: `node` must be linked in this list and `prev` must be its
    /// actual predecessor.
    pub unsafe fn remove(&mut self, mut node: NonNull<T>, prev: Link<T>) {
        unsafe {
            let next = node.as_ref().next();

            match prev {
                Some(mut prev) => prev.as_mut().set_next(next),
                None => self.head = next,
            }

            node.as_mut().set_next(None);
        }

        self.len -= 1;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            current: self.head,
            prev: None,
            remaining: self.len,
            marker: PhantomData,
        }
    }
}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = Cursor<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        let cursor = Cursor { node, prev: self.prev };

        unsafe {
            self.current = node.as_ref().next();
        }

        self.prev = Some(node);
        self.remaining -= 1;

        Some(cursor)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T: Linked> IntoIterator for &'a List<T> {
    type Item = Cursor<T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
