//! Register matching warm-up shown on the first module.

use std::collections::BTreeMap;

use shared::catalog::RegisterPair;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameClick {
    Role(String),
    Register(String),
}

#[derive(Debug, Clone, Default)]
pub struct RegisterMatchGame {
    pairs: Vec<RegisterPair>,
    selected_role: Option<String>,
    /// register -> role placed on it
    placed: BTreeMap<String, String>,
}

impl RegisterMatchGame {
    pub fn new(pairs: &[RegisterPair]) -> Self {
        Self {
            pairs: pairs.to_vec(),
            selected_role: None,
            placed: BTreeMap::new(),
        }
    }

    pub fn pairs(&self) -> &[RegisterPair] {
        &self.pairs
    }

    pub fn selected_role(&self) -> Option<&str> {
        self.selected_role.as_deref()
    }

    pub fn placed(&self) -> &BTreeMap<String, String> {
        &self.placed
    }

    fn role_placed(&self, role: &str) -> bool {
        self.placed.values().any(|r| r == role)
    }

    /// Applies a click; returns whether anything changed.
    pub fn click(&mut self, click: GameClick) -> bool {
        match click {
            GameClick::Role(role) => {
                if self.role_placed(&role) || !self.pairs.iter().any(|p| p.role == role) {
                    return false;
                }
                if self.selected_role.as_deref() == Some(role.as_str()) {
                    self.selected_role = None;
                } else {
                    self.selected_role = Some(role);
                }
                true
            }
            GameClick::Register(register) => {
                if self.placed.contains_key(&register)
                    || !self.pairs.iter().any(|p| p.register == register)
                {
                    return false;
                }
                let Some(role) = self.selected_role.take() else {
                    return false;
                };
                self.placed.insert(register, role);
                true
            }
        }
    }

    /// Whether the role placed on `register` is its own.
    pub fn is_correct(&self, register: &str) -> Option<bool> {
        let placed = self.placed.get(register)?;
        Some(
            self.pairs
                .iter()
                .any(|p| p.register == register && &p.role == placed),
        )
    }

    pub fn is_done(&self) -> bool {
        !self.pairs.is_empty()
            && self
                .pairs
                .iter()
                .all(|p| self.placed.get(&p.register) == Some(&p.role))
    }

    pub fn reset(&mut self) {
        self.selected_role = None;
        self.placed.clear();
    }
}

#[cfg(test)]
#[path = "tests/minigame_tests.rs"]
mod tests;
