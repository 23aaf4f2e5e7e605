//! Pending contexts awaiting a flush.

use crate::context::Context;

struct Entry {
    context: Context,
    bytes: usize,
}

/// Insertion-ordered queue that tracks the serialised size of its contents.
#[derive(Default)]
pub(crate) struct ContextQueue {
    entries: Vec<Entry>,
    bytes: usize,
}

impl ContextQueue {
    pub(crate) fn push(&mut self, context: Context, bytes: usize) {
        self.bytes += bytes;
        self.entries.push(Entry { context, bytes });
    }

    /// Remove the most recently pushed context.
    pub(crate) fn pop_last(&mut self) -> Option<Context> {
        let entry = self.entries.pop()?;
        self.bytes -= entry.bytes;
        Some(entry.context)
    }

    /// Take every context in insertion order, leaving the queue empty.
    pub(crate) fn drain(&mut self) -> Vec<Context> {
        self.bytes = 0;
        self.entries.drain(..).map(|e| e.context).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }
}
