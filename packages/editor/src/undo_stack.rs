//! # Undo/Redo Stack
//!
//! Bounded history of reversible edits.
//!
//! ## Design
//!
//! - Each entry pairs an `apply` action with the `revert` that undoes it
//! - Undo runs `revert` and moves the entry to the redo stack
//! - Redo runs `apply` again
//! - New entries clear the redo stack
//! - Pushing past the depth limit evicts the oldest entry
//!
//! Entries are opaque to the stack. Closures work directly through
//! [`Action`]; callers whose actions must be awaited use
//! [`UndoStack::undo_entry`] / [`UndoStack::redo_entry`] and execute the
//! returned action themselves.
//!
//! ## Example
//!
//! ```rust
//! use markup_editor::UndoStack;
//! use std::{cell::Cell, rc::Rc};
//!
//! let value = Rc::new(Cell::new(0));
//! let mut stack: UndoStack<Box<dyn FnMut()>> = UndoStack::new();
//!
//! let (a, b) = (value.clone(), value.clone());
//! stack.do_action(Box::new(move || a.set(1)), Box::new(move || b.set(0)));
//! assert_eq!(value.get(), 1);
//!
//! stack.undo();
//! assert_eq!(value.get(), 0);
//! ```

use std::collections::VecDeque;

/// Default number of undo levels
pub const DEFAULT_UNDO_DEPTH: usize = 50;

/// Something the stack can run synchronously
pub trait Action {
    fn run(&mut self);
}

impl<F: FnMut()> Action for F {
    fn run(&mut self) {
        self()
    }
}

/// An `apply`/`revert` pair
#[derive(Debug, Clone)]
pub struct UndoEntry<A> {
    pub apply: A,
    pub revert: A,

    /// Optional description of this entry
    pub description: Option<String>,
}

impl<A> UndoEntry<A> {
    pub fn new(apply: A, revert: A) -> Self {
        Self {
            apply,
            revert,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug)]
pub struct UndoStack<A> {
    /// Applied entries (most recent last)
    undo_stack: VecDeque<UndoEntry<A>>,

    /// Undone entries (most recent last)
    redo_stack: Vec<UndoEntry<A>>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,
}

impl<A> UndoStack<A> {
    pub fn new() -> Self {
        Self::with_max_levels(DEFAULT_UNDO_DEPTH)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Record an edit that has already been applied
    pub fn push(&mut self, apply: A, revert: A) {
        self.push_entry(UndoEntry::new(apply, revert));
    }

    pub fn push_described(&mut self, apply: A, revert: A, description: impl Into<String>) {
        self.push_entry(UndoEntry::new(apply, revert).with_description(description));
    }

    pub fn push_entry(&mut self, entry: UndoEntry<A>) {
        self.undo_stack.push_back(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.pop_front();
        }

        self.redo_stack.clear();
    }

    /// Move the most recent entry to the redo stack and return it so the
    /// caller can run its `revert`
    pub fn undo_entry(&mut self) -> Option<&UndoEntry<A>> {
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push(entry);
        self.redo_stack.last()
    }

    /// Move the most recently undone entry back and return it so the
    /// caller can run its `apply`
    pub fn redo_entry(&mut self) -> Option<&UndoEntry<A>> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push_back(entry);
        self.undo_stack.back()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .back()
            .and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl<A: Action> UndoStack<A> {
    /// Run `apply` and record it
    pub fn do_action(&mut self, mut apply: A, revert: A) {
        apply.run();
        self.push(apply, revert);
    }

    /// Revert the most recent entry. Returns false when there is nothing
    /// to undo.
    pub fn undo(&mut self) -> bool {
        let Some(mut entry) = self.undo_stack.pop_back() else {
            return false;
        };
        entry.revert.run();
        self.redo_stack.push(entry);
        true
    }

    /// Re-apply the most recently undone entry. Returns false when there is
    /// nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(mut entry) = self.redo_stack.pop() else {
            return false;
        };
        entry.apply.run();
        self.undo_stack.push_back(entry);
        true
    }
}

impl<A> Default for UndoStack<A> {
    fn default() -> Self {
        Self::new()
    }
}
