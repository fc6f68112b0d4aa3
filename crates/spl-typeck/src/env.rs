//! Name environment with a scope stack.
//!
//! Maps names to the declarations that introduce them. Entering a function,
//! a let body or a literal pushes a frame; lookups search innermost-first, so
//! shadowing resolves to the nearest declaration.

use rustc_hash::FxHashMap;
use spl_ast::DeclId;

pub struct ScopeStack {
    /// Index 0 is the global scope.
    scopes: Vec<FxHashMap<String, DeclId>>,
}

impl ScopeStack {
    /// One empty global scope.
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![FxHashMap::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// # Panics
    ///
    /// Panics if only the global scope remains.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Bind `name` in the innermost scope. Returns the declaration it
    /// replaced in that same scope, if any.
    pub fn insert(&mut self, name: String, decl: DeclId) -> Option<DeclId> {
        self.scopes
            .last_mut()
            .expect("scope stack should never be empty")
            .insert(name, decl)
    }

    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_in_outer_scope() {
        let mut env = ScopeStack::new();
        env.insert("x".into(), DeclId::new(0));
        env.push_scope();
        assert_eq!(env.lookup("x"), Some(DeclId::new(0)));
        assert_eq!(env.lookup("y"), None);
    }

    #[test]
    fn shadowing() {
        let mut env = ScopeStack::new();
        env.insert("x".into(), DeclId::new(0));
        env.push_scope();
        env.insert("x".into(), DeclId::new(1));
        assert_eq!(env.lookup("x"), Some(DeclId::new(1)));
        env.pop_scope();
        assert_eq!(env.lookup("x"), Some(DeclId::new(0)));
    }

    #[test]
    fn insert_reports_same_scope_duplicate() {
        let mut env = ScopeStack::new();
        assert_eq!(env.insert("f".into(), DeclId::new(3)), None);
        assert_eq!(env.insert("f".into(), DeclId::new(4)), Some(DeclId::new(3)));
    }

    #[test]
    #[should_panic(expected = "cannot pop the global scope")]
    fn pop_global_panics() {
        let mut env = ScopeStack::new();
        env.pop_scope();
    }
}
