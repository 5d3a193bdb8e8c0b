//! derive
//!
//! Memoized, replayable derivations.
//!
//! # Design
//!
//! A [`Derivation`] is a named single-producer sequence: it is defined
//! once, dormant, and materialized by the first [`Derivation::force`]
//! call, which runs a thunk and stores the produced elements. Every
//! later read replays the stored elements in order. Transformations
//! over upstream derivations are written as ordinary iterator
//! pipelines inside the thunk; [`distinct_by`] provides the first-wins
//! deduplication those pipelines share.
//!
//! # Invariants
//!
//! - Re-reading a materialized derivation yields an equal sequence.
//! - A thunk must not pull its own derivation: reentrant forcing is a
//!   definition bug and fails fast with [`ForceError::Cycle`].
//! - A failed thunk leaves the derivation dormant; the failure is not
//!   cached.
//!
//! The resolver is single-threaded and drives derivations with
//! depth-first pulls, so plain `RefCell` state is sufficient.

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;
use std::rc::Rc;

/// Failure mode of [`Derivation::force`].
#[derive(Debug)]
pub enum ForceError<E> {
    /// The thunk transitively pulled its own derivation.
    Cycle(&'static str),
    /// The thunk itself failed.
    Thunk(E),
}

enum State<T> {
    Dormant,
    Materializing,
    Ready(Rc<[T]>),
}

/// A named, memoized, replayable sequence.
pub struct Derivation<T> {
    name: &'static str,
    state: RefCell<State<T>>,
}

impl<T> Derivation<T> {
    /// Define a dormant derivation. The name is debug metadata only.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RefCell::new(State::Dormant),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the derivation has materialized.
    pub fn is_ready(&self) -> bool {
        matches!(*self.state.borrow(), State::Ready(_))
    }

    /// Materialize on first call, replay on later calls.
    ///
    /// The thunk runs at most once per process (unless it fails, in
    /// which case the derivation returns to dormancy and a later call
    /// may retry).
    pub fn force<E>(
        &self,
        thunk: impl FnOnce() -> Result<Vec<T>, E>,
    ) -> Result<Rc<[T]>, ForceError<E>> {
        {
            let mut state = self.state.borrow_mut();
            match &*state {
                State::Ready(items) => return Ok(Rc::clone(items)),
                State::Materializing => return Err(ForceError::Cycle(self.name)),
                State::Dormant => *state = State::Materializing,
            }
        }
        // The borrow is released while the thunk runs so it can force
        // other derivations.
        match thunk() {
            Ok(items) => {
                let items: Rc<[T]> = items.into();
                *self.state.borrow_mut() = State::Ready(Rc::clone(&items));
                Ok(items)
            }
            Err(e) => {
                *self.state.borrow_mut() = State::Dormant;
                Err(ForceError::Thunk(e))
            }
        }
    }
}

impl<T> std::fmt::Debug for Derivation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match *self.state.borrow() {
            State::Dormant => "dormant",
            State::Materializing => "materializing",
            State::Ready(_) => "ready",
        };
        write!(f, "Derivation({}, {state})", self.name)
    }
}

/// First-wins deduplication by an arbitrary key, preserving order.
pub fn distinct_by<T, K, I>(items: I, mut key: impl FnMut(&T) -> K) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    K: Eq + Hash,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(key(&item)) {
            out.push(item);
        }
    }
    out
}

/// First-wins deduplication of directly hashable items.
pub fn distinct<T: Clone + Eq + Hash>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    distinct_by(items, |item| item.clone())
}
