//! Transaction assembly.
//!
//! Changes recorded during a transaction arrive in arbitrary order. They are
//! folded into a run-length encoded picture of the row sequence:
//!
//! ```text
//!   rows:  [ kept x3 ][ inserted x2 ][ deleted x1 ][ updated x1 ][ kept ... ]
//! ```
//!
//! Deleted runs are tombstones: they occupy no current position. Walking the
//! runs left to right yields the canonical, non-decreasing change list.

use tracing::trace;

use super::{EventError, ListChange, ListEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Kept,
    Inserted,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    kind: RunKind,
    len: usize,
}

impl Run {
    /// Rows this run occupies in the current sequence.
    fn current_len(&self) -> usize {
        match self.kind {
            RunKind::Deleted => 0,
            _ => self.len,
        }
    }
}

/// Collects row changes between `begin` and the outermost `commit`.
#[derive(Debug, Default)]
pub struct EventAssembler {
    depth: usize,
    runs: Vec<Run>,
}

impl EventAssembler {
    /// Create an idle assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a (possibly nested) transaction.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Close a transaction. Returns the assembled batch when the outermost
    /// transaction closes and something changed.
    pub fn commit(&mut self) -> Result<Option<ListEvent>, EventError> {
        if self.depth == 0 {
            return Err(EventError::NoTransaction);
        }
        self.depth -= 1;
        if self.depth > 0 {
            return Ok(None);
        }
        let changes = self.drain();
        Ok((!changes.is_empty()).then(|| ListEvent::new(changes)))
    }

    /// Whether a transaction is open.
    pub fn in_transaction(&self) -> bool {
        self.depth > 0
    }

    /// Transaction nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Record a row inserted at `index` of the current sequence.
    pub fn insert(&mut self, index: usize) {
        trace!(index, "assemble insert");
        let at = self.split_at(index);
        self.runs.insert(
            at,
            Run {
                kind: RunKind::Inserted,
                len: 1,
            },
        );
        self.normalize();
    }

    /// Record the row at `index` changing in place.
    pub fn update(&mut self, index: usize) {
        trace!(index, "assemble update");
        let at = self.split_row(index);
        if self.runs[at].kind == RunKind::Kept {
            self.runs[at].kind = RunKind::Updated;
        }
        self.normalize();
    }

    /// Record the row at `index` going away.
    pub fn delete(&mut self, index: usize) {
        trace!(index, "assemble delete");
        let at = self.split_row(index);
        match self.runs[at].kind {
            RunKind::Inserted => {
                self.runs.remove(at);
            }
            _ => self.runs[at].kind = RunKind::Deleted,
        }
        self.normalize();
    }

    /// Discard everything recorded so far without publishing.
    pub fn discard(&mut self) {
        self.runs.clear();
    }

    fn drain(&mut self) -> Vec<ListChange> {
        let mut changes = Vec::new();
        let mut position = 0;
        for run in self.runs.drain(..) {
            match run.kind {
                RunKind::Kept => position += run.len,
                RunKind::Inserted => {
                    changes.extend((position..position + run.len).map(ListChange::insert));
                    position += run.len;
                }
                RunKind::Updated => {
                    changes.extend((position..position + run.len).map(ListChange::update));
                    position += run.len;
                }
                RunKind::Deleted => {
                    changes.extend(std::iter::repeat(ListChange::delete(position)).take(run.len));
                }
            }
        }
        changes
    }

    /// Make a run boundary at current position `index`; returns the index
    /// of the first run starting there.
    fn split_at(&mut self, index: usize) -> usize {
        let mut position = 0;
        for at in 0..self.runs.len() {
            if position == index {
                return at;
            }
            let run = self.runs[at];
            let len = run.current_len();
            if index < position + len {
                let offset = index - position;
                self.runs[at].len = offset;
                self.runs.insert(
                    at + 1,
                    Run {
                        kind: run.kind,
                        len: run.len - offset,
                    },
                );
                return at + 1;
            }
            position += len;
        }
        if index > position {
            self.runs.push(Run {
                kind: RunKind::Kept,
                len: index - position,
            });
        }
        self.runs.len()
    }

    /// Isolate the row at `index` into its own run and return that run.
    fn split_row(&mut self, index: usize) -> usize {
        self.split_at(index + 1);
        let mut at = self.split_at(index);
        while self.runs[at].kind == RunKind::Deleted {
            at += 1;
        }
        at
    }

    fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.len == 0 {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.kind == run.kind => last.len += run.len,
                _ => merged.push(run),
            }
        }
        while merged.last().is_some_and(|run| run.kind == RunKind::Kept) {
            merged.pop();
        }
        self.runs = merged;
    }
}
