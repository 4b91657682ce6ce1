//! Chained lexical environments.
//!
//! An environment is an immutable chain of frames mapping names to thunks.
//! Extension allocates one frame; lookup walks the chain, so shadowing is
//! free — the evaluator relies on this to rebind `self` and `super` when
//! objects compose. Frames allow insertion after creation so that a
//! recursive binding group can close over its own frame.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::value::Thunk;

#[derive(Debug, Clone)]
pub(crate) struct Env(Rc<EnvFrame>);

#[derive(Debug)]
struct EnvFrame {
    bindings: RefCell<AHashMap<Rc<str>, Thunk>>,
    parent: Option<Env>,
}

impl Env {
    /// An empty environment with no parent.
    pub fn root() -> Self {
        Self(Rc::new(EnvFrame {
            bindings: RefCell::new(AHashMap::new()),
            parent: None,
        }))
    }

    /// A fresh empty frame chained onto `self`.
    pub fn child(&self) -> Self {
        Self(Rc::new(EnvFrame {
            bindings: RefCell::new(AHashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Inserts a binding into this frame.
    ///
    /// Thunks created for a recursive `let` capture the frame itself, so
    /// insertion happens after the frame exists; this is the only mutation
    /// environments ever see.
    pub fn bind(&self, name: Rc<str>, thunk: Thunk) {
        self.0.bindings.borrow_mut().insert(name, thunk);
    }

    /// Returns a child frame holding a single binding.
    pub fn extend_one(&self, name: Rc<str>, thunk: Thunk) -> Self {
        let child = self.child();
        child.bind(name, thunk);
        child
    }

    pub fn lookup(&self, name: &str) -> Option<Thunk> {
        let mut frame = self;
        loop {
            if let Some(thunk) = frame.0.bindings.borrow().get(name) {
                return Some(thunk.clone());
            }
            match &frame.0.parent {
                Some(parent) => frame = parent,
                None => return None,
            }
        }
    }
}
