//! Typed navigation handles
//!
//! A handle names a navigation declared in the parent's metadata and knows
//! where the related value lives on the parent, so the loader can assign
//! results without reflection.

use std::fmt;

/// Collection navigation from `P` to many `C`.
///
/// The slot is `None` until loaded; loading always leaves `Some`, empty when
/// no related rows exist.
pub struct HasMany<P, C> {
    name: &'static str,
    slot: fn(&mut P) -> &mut Option<Vec<C>>,
}

impl<P, C> HasMany<P, C> {
    pub const fn new(name: &'static str, slot: fn(&mut P) -> &mut Option<Vec<C>>) -> Self {
        Self { name, slot }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn slot<'p>(&self, parent: &'p mut P) -> &'p mut Option<Vec<C>> {
        (self.slot)(parent)
    }
}

/// Single-valued navigation from `P` to `C`, filled by the caller's query
pub struct HasOne<P, C> {
    name: &'static str,
    slot: fn(&mut P) -> Option<&mut C>,
}

impl<P, C> HasOne<P, C> {
    pub const fn new(name: &'static str, slot: fn(&mut P) -> Option<&mut C>) -> Self {
        Self { name, slot }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get<'p>(&self, parent: &'p mut P) -> Option<&'p mut C> {
        (self.slot)(parent)
    }
}

impl<P, C> Clone for HasMany<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for HasMany<P, C> {}

impl<P, C> Clone for HasOne<P, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P, C> Copy for HasOne<P, C> {}

impl<P, C> fmt::Debug for HasMany<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasMany").field("name", &self.name).finish()
    }
}

impl<P, C> fmt::Debug for HasOne<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HasOne").field("name", &self.name).finish()
    }
}
