//! Doubly-linked lists with pluggable node allocators.
//!
//! [`List`] allocates every element in its own node through an [`Alloc`], rebound to the node
//! type. With the default [`Heap`] allocator every push is a heap allocation; with a
//! [`StackAllocator`](stackarena::StackAllocator) nodes are bumped off a stack arena, and popping
//! from the back hands the space straight back:
//!
//! ```
//! use arenalist::List;
//! use stackarena::{StackArena, StackAllocator};
//!
//! let arena = StackArena::<4096>::new();
//! let mut list = List::new_in(StackAllocator::<u32, 4096>::new(&arena));
//!
//! for i in 0 .. 10 {
//!     list.push_back(i);
//! }
//! assert!(arena.used() > 0);
//!
//! while list.pop_back().is_some() {}
//! assert_eq!(arena.used(), 0);
//! ```

use core::fmt;
use core::iter::FromIterator;
use core::marker::PhantomData;
use core::ptr::NonNull;

use std::alloc::handle_alloc_error;

use stackarena::{Alloc, ArenaError, Heap};

struct Node<T> {
    prev: Option<NonNull<Node<T>>>,
    next: Option<NonNull<Node<T>>>,
    value: T,
}

type Link<T> = Option<NonNull<Node<T>>>;

/// A doubly-linked list, allocating its nodes with `A`.
pub struct List<T, A: Alloc<Value = T> = Heap<T>> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,

    alloc: A,
    nodes: A::Rebind<Node<T>>,

    marker: PhantomData<T>,
}

impl<T> List<T> {
    /// Creates an empty list on the heap.
    #[inline]
    pub fn new() -> Self {
        Self::new_in(Heap::new())
    }
}

impl<T, A: Alloc<Value = T>> List<T, A> {
    /// Creates an empty list, allocating nodes with `alloc`.
    pub fn new_in(alloc: A) -> Self {
        let nodes = alloc.rebind::<Node<T>>();
        Self {
            head: None,
            tail: None,
            len: 0,
            alloc,
            nodes,
            marker: PhantomData,
        }
    }

    /// The allocator this list was created with.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends an element, returning an error if no node could be allocated for it.
    ///
    /// On failure `value` is dropped.
    pub fn try_push_back(&mut self, value: T) -> Result<(), ArenaError> {
        let node = self.new_node(value)?;
        unsafe {
            (*node.as_ptr()).prev = self.tail;
            match self.tail {
                Some(tail) => (*tail.as_ptr()).next = Some(node),
                None => self.head = Some(node),
            }
        }
        self.tail = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Prepends an element, returning an error if no node could be allocated for it.
    ///
    /// On failure `value` is dropped.
    pub fn try_push_front(&mut self, value: T) -> Result<(), ArenaError> {
        let node = self.new_node(value)?;
        unsafe {
            (*node.as_ptr()).next = self.head;
            match self.head {
                Some(head) => (*head.as_ptr()).prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.head = Some(node);
        self.len += 1;
        Ok(())
    }

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the heap is exhausted.
    #[inline]
    pub fn push_back(&mut self, value: T) {
        if let Err(err) = self.try_push_back(value) {
            alloc_failed(err)
        }
    }

    /// Prepends an element.
    ///
    /// # Panics
    ///
    /// Aborts through [`handle_alloc_error`] if the heap is exhausted.
    #[inline]
    pub fn push_front(&mut self, value: T) {
        if let Err(err) = self.try_push_front(value) {
            alloc_failed(err)
        }
    }

    /// Removes the last element.
    pub fn pop_back(&mut self) -> Option<T> {
        let node = self.tail?;
        unsafe {
            self.tail = (*node.as_ptr()).prev;
            match self.tail {
                Some(tail) => (*tail.as_ptr()).next = None,
                None => self.head = None,
            }
            self.len -= 1;
            Some(self.free_node(node))
        }
    }

    /// Removes the first element.
    pub fn pop_front(&mut self) -> Option<T> {
        let node = self.head?;
        unsafe {
            self.head = (*node.as_ptr()).next;
            match self.head {
                Some(head) => (*head.as_ptr()).prev = None,
                None => self.tail = None,
            }
            self.len -= 1;
            Some(self.free_node(node))
        }
    }

    #[inline]
    pub fn front(&self) -> Option<&T> {
        self.head.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    #[inline]
    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.head.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    #[inline]
    pub fn back(&self) -> Option<&T> {
        self.tail.map(|node| unsafe { &(*node.as_ptr()).value })
    }

    #[inline]
    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.tail.map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Returns the element at `idx`, walking from the front.
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.iter().nth(idx)
    }

    /// Returns the element at `idx` mutably, walking from the front.
    pub fn get_mut(&mut self, idx: usize) -> Option<&mut T> {
        self.iter_mut().nth(idx)
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            head: self.head,
            tail: self.tail,
            len: self.len,
            marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            head: self.head,
            tail: self.tail,
            len: self.len,
            marker: PhantomData,
        }
    }

    /// Removes every element.
    ///
    /// Elements are released from the back. A stack allocator only reclaims a node's space when it
    /// is the most recently allocated one still live, so a list built with `push_back` gets all of
    /// it back, while anything else is retained until the arena is reset.
    pub fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// Moves every element of `other` to the end of this list, leaving `other` empty.
    ///
    /// If both lists' allocators are equal the nodes are simply relinked. Otherwise each element
    /// is moved into a freshly allocated node.
    pub fn append(&mut self, other: &mut Self) {
        if self.nodes == other.nodes {
            let (head, tail) = match (other.head.take(), other.tail.take()) {
                (Some(head), Some(tail)) => (head, tail),
                _ => return,
            };

            unsafe {
                (*head.as_ptr()).prev = self.tail;
                match self.tail {
                    Some(old_tail) => (*old_tail.as_ptr()).next = Some(head),
                    None => self.head = Some(head),
                }
            }
            self.tail = Some(tail);
            self.len += other.len;
            other.len = 0;
        } else {
            while let Some(value) = other.pop_front() {
                self.push_back(value);
            }
        }
    }

    fn new_node(&self, value: T) -> Result<NonNull<Node<T>>, ArenaError> {
        let node = self.nodes.allocate(1)?;
        unsafe {
            node.as_ptr().write(Node {
                prev: None,
                next: None,
                value,
            });
        }
        Ok(node)
    }

    /// Moves the value out of an unlinked node, and releases the node.
    unsafe fn free_node(&self, node: NonNull<Node<T>>) -> T {
        let Node { value, .. } = node.as_ptr().read();
        self.nodes.deallocate(node, 1);
        value
    }
}

#[cold]
fn alloc_failed(err: ArenaError) -> ! {
    match err {
        ArenaError::HeapExhausted { layout } => handle_alloc_error(layout),
        err => panic!("failed to allocate list node: {}", err),
    }
}

impl<T, A: Alloc<Value = T>> Drop for List<T, A> {
    fn drop(&mut self) {
        self.clear()
    }
}

impl<T> Default for List<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, A: Alloc<Value = T>> fmt::Debug for List<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, U, A, B> PartialEq<List<U, B>> for List<T, A>
where T: PartialEq<U>,
      A: Alloc<Value = T>,
      B: Alloc<Value = U>,
{
    fn eq(&self, other: &List<U, B>) -> bool {
        self.len == other.len && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<T, A: Alloc<Value = T>> Extend<T> for List<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.push_back(value);
        }
    }
}

impl<T, A: Alloc<Value = T> + Default> FromIterator<T> for List<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new_in(A::default());
        list.extend(iter);
        list
    }
}

impl<T, A: Alloc<Value = T>> IntoIterator for List<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    #[inline]
    fn into_iter(self) -> IntoIter<T, A> {
        IntoIter { list: self }
    }
}

impl<'a, T, A: Alloc<Value = T>> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

impl<'a, T, A: Alloc<Value = T>> IntoIterator for &'a mut List<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> IterMut<'a, T> {
        self.iter_mut()
    }
}

/// Borrowing iterator over a [`List`].
pub struct Iter<'a, T> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    marker: PhantomData<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            let node = &*node.as_ptr();
            self.len -= 1;
            self.head = node.next;
            &node.value
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            let node = &*node.as_ptr();
            self.len -= 1;
            self.tail = node.prev;
            &node.value
        })
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

/// Mutably borrowing iterator over a [`List`].
pub struct IterMut<'a, T> {
    head: Link<T>,
    tail: Link<T>,
    len: usize,
    marker: PhantomData<&'a mut Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.head.map(|node| unsafe {
            let node = &mut *node.as_ptr();
            self.len -= 1;
            self.head = node.next;
            &mut node.value
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.len == 0 {
            return None;
        }
        self.tail.map(|node| unsafe {
            let node = &mut *node.as_ptr();
            self.len -= 1;
            self.tail = node.prev;
            &mut node.value
        })
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

/// Owning iterator over a [`List`].
pub struct IntoIter<T, A: Alloc<Value = T> = Heap<T>> {
    list: List<T, A>,
}

impl<T, A: Alloc<Value = T>> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.list.pop_front()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.list.len, Some(self.list.len))
    }
}

impl<T, A: Alloc<Value = T>> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.list.pop_back()
    }
}

impl<T, A: Alloc<Value = T>> ExactSizeIterator for IntoIter<T, A> {}
