use crate::word::Word;

/// An insertion-ordered variable map. Lookup is a single linear probe; there
/// is no chaining to any outer scope.
#[derive(Default, Debug)]
pub struct Scope {
    vars: Vec<(String, Word)>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    /// Binds `name` to a null pointer unless it already exists.
    pub fn declare(&mut self, name: &str) {
        if !self.contains(name) {
            self.vars.push((name.to_owned(), Word::null()));
        }
    }

    /// Inserts or replaces, taking ownership of the value.
    pub fn set(&mut self, name: &str, value: Word) {
        match self.vars.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => *slot = value,
            None => self.vars.push((name.to_owned(), value)),
        }
    }

    /// Deep copy of the stored value.
    pub fn get(&self, name: &str) -> Option<Word> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, w)| w.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// One global scope plus a stack of local frames. The current scope is the
/// innermost local frame, or the global scope when none is active.
#[derive(Default, Debug)]
pub struct ScopeStack {
    global: Scope,
    locals: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> ScopeStack {
        ScopeStack::default()
    }

    pub fn current(&self) -> &Scope {
        self.locals.last().unwrap_or(&self.global)
    }

    pub fn current_mut(&mut self) -> &mut Scope {
        match self.locals.last_mut() {
            Some(local) => local,
            None => &mut self.global,
        }
    }

    pub fn global(&self) -> &Scope {
        &self.global
    }

    pub fn global_mut(&mut self) -> &mut Scope {
        &mut self.global
    }

    pub fn enter_local(&mut self) {
        self.locals.push(Scope::new());
    }

    pub fn leave_local(&mut self) {
        self.locals.pop();
    }

    /// Enters a fresh local frame when none is active, otherwise leaves the
    /// innermost one. Never both.
    pub fn toggle_local(&mut self) {
        if self.locals.is_empty() {
            self.enter_local();
        } else {
            self.leave_local();
        }
    }

    pub fn in_local(&self) -> bool {
        !self.locals.is_empty()
    }
}
