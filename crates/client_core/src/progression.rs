//! Authoritative progress record plus everything derived from it.

use std::{collections::BTreeSet, sync::Arc};

use shared::{
    catalog::{Catalog, Module, UnlockRule},
    domain::{AchievementId, ChallengeId, ModuleId, ProgressRecord},
};
use storage::ProgressStore;
use tracing::{debug, info, warn};

pub const XP_PER_LEVEL: u64 = 500;

pub fn compute_level(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}

/// Share of the current level already earned, in `[0, 1)`.
pub fn xp_progress_fraction(xp: u64) -> f64 {
    (xp % XP_PER_LEVEL) as f64 / XP_PER_LEVEL as f64
}

pub fn xp_to_next_level(xp: u64) -> u64 {
    XP_PER_LEVEL - xp % XP_PER_LEVEL
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    XpGained { amount: u64, total: u64 },
    LevelUp { level: u64 },
    ChallengeCompleted { challenge_id: ChallengeId, module_id: ModuleId },
    ModuleCompleted { module_id: ModuleId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub xp: u64,
    pub level: u64,
    pub xp_to_next_level: u64,
    pub modules_completed: usize,
    pub modules_total: usize,
    pub challenges_completed: usize,
    pub streak: u32,
}

/// Copy of the record taken for a write that runs after the caller lets go
/// of the engine.
pub struct PendingSave {
    store: Arc<dyn ProgressStore>,
    record: ProgressRecord,
}

impl PendingSave {
    /// A failed write leaves the in-memory record authoritative.
    pub async fn write(self) {
        match self.store.save(&self.record).await {
            Ok(()) => debug!(xp = self.record.xp, "progress saved"),
            Err(err) => warn!(error = %err, "failed to save progress; continuing in memory"),
        }
    }
}

pub struct ProgressionEngine {
    catalog: Arc<Catalog>,
    store: Arc<dyn ProgressStore>,
    record: ProgressRecord,
}

impl ProgressionEngine {
    /// Loads the saved record once. A missing, unreadable or unreachable save
    /// starts a fresh record.
    pub async fn restore(catalog: Arc<Catalog>, store: Arc<dyn ProgressStore>) -> Self {
        let record = match store.load().await {
            Ok(Some(record)) => {
                info!(
                    xp = record.xp,
                    modules = record.completed_modules.len(),
                    challenges = record.completed_challenges.len(),
                    "restored saved progress"
                );
                record
            }
            Ok(None) => {
                info!("no saved progress; starting fresh");
                ProgressRecord::default()
            }
            Err(err) => {
                warn!(error = %err, "failed to load saved progress; starting fresh");
                ProgressRecord::default()
            }
        };
        Self::with_record(catalog, store, record)
    }

    pub fn with_record(
        catalog: Arc<Catalog>,
        store: Arc<dyn ProgressStore>,
        record: ProgressRecord,
    ) -> Self {
        Self {
            catalog,
            store,
            record,
        }
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_unlocked(&self, module_id: ModuleId) -> bool {
        match module_id.0 {
            0 => false,
            1 => true,
            _ => module_id
                .predecessor()
                .is_some_and(|prev| self.record.completed_modules.contains(&prev)),
        }
    }

    pub fn is_completed(&self, module_id: ModuleId) -> bool {
        self.record.completed_modules.contains(&module_id)
    }

    pub fn is_challenge_completed(&self, challenge_id: &ChallengeId) -> bool {
        self.record.completed_challenges.contains(challenge_id)
    }

    /// Records a passed challenge and awards `xp_awarded`, then writes the
    /// record through to the store.
    ///
    /// Completion bookkeeping is idempotent; XP is not, so callers must only
    /// report the first pass of a challenge. Calls naming an unknown
    /// challenge, a challenge outside `module_id`, or a locked module change
    /// nothing.
    pub async fn record_challenge_pass(
        &mut self,
        challenge_id: &ChallengeId,
        module_id: ModuleId,
        xp_awarded: u64,
    ) -> Vec<ProgressEvent> {
        let events = self.apply_challenge_pass(challenge_id, module_id, xp_awarded);
        if !events.is_empty() {
            self.pending_save().write().await;
        }
        events
    }

    /// In-memory half of [`Self::record_challenge_pass`]. Nothing is written;
    /// when events come back the caller owes a [`Self::pending_save`].
    pub fn apply_challenge_pass(
        &mut self,
        challenge_id: &ChallengeId,
        module_id: ModuleId,
        xp_awarded: u64,
    ) -> Vec<ProgressEvent> {
        let Some(challenge) = self.catalog.challenge(challenge_id) else {
            warn!(challenge = %challenge_id, "ignoring pass for unknown challenge");
            return Vec::new();
        };
        if challenge.module_id != module_id {
            warn!(
                challenge = %challenge_id,
                module = %module_id,
                owner = %challenge.module_id,
                "ignoring pass reported against the wrong module"
            );
            return Vec::new();
        }
        if !self.is_unlocked(module_id) {
            warn!(module = %module_id, "ignoring pass for a locked module");
            return Vec::new();
        }

        let mut events = Vec::new();
        if self.record.completed_challenges.insert(challenge_id.clone()) {
            events.push(ProgressEvent::ChallengeCompleted {
                challenge_id: challenge_id.clone(),
                module_id,
            });
        }

        let module_done = self
            .catalog
            .challenges(module_id)
            .iter()
            .all(|c| self.record.completed_challenges.contains(&c.id));
        if module_done && self.record.completed_modules.insert(module_id) {
            info!(module = %module_id, "module completed");
            events.push(ProgressEvent::ModuleCompleted { module_id });
        }

        self.apply_xp(xp_awarded, &mut events);
        events
    }

    pub fn pending_save(&self) -> PendingSave {
        PendingSave {
            store: self.store.clone(),
            record: self.record.clone(),
        }
    }

    pub async fn add_xp(&mut self, amount: u64) -> Vec<ProgressEvent> {
        let mut events = Vec::new();
        self.apply_xp(amount, &mut events);
        if !events.is_empty() {
            self.pending_save().write().await;
        }
        events
    }

    fn apply_xp(&mut self, amount: u64, events: &mut Vec<ProgressEvent>) {
        if amount == 0 {
            return;
        }
        let level_before = self.level();
        self.record.xp = self.record.xp.saturating_add(amount);
        events.push(ProgressEvent::XpGained {
            amount,
            total: self.record.xp,
        });
        let level_after = self.level();
        if level_after > level_before {
            events.push(ProgressEvent::LevelUp { level: level_after });
        }
    }

    pub fn level(&self) -> u64 {
        compute_level(self.record.xp)
    }

    pub fn xp_progress_fraction(&self) -> f64 {
        xp_progress_fraction(self.record.xp)
    }

    pub fn xp_to_next_level(&self) -> u64 {
        xp_to_next_level(self.record.xp)
    }

    /// Recomputed on every call. Manual achievements are never derived.
    pub fn earned_achievements(&self) -> BTreeSet<AchievementId> {
        self.catalog
            .achievements()
            .iter()
            .filter(|a| match a.unlock {
                UnlockRule::ModuleCompleted(id) => self.record.completed_modules.contains(&id),
                UnlockRule::XpThreshold(xp) => self.record.xp >= xp,
                UnlockRule::Manual(_) => false,
            })
            .map(|a| a.id.clone())
            .collect()
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats {
            xp: self.record.xp,
            level: self.level(),
            xp_to_next_level: self.xp_to_next_level(),
            modules_completed: self.record.completed_modules.len(),
            modules_total: self.catalog.modules().len(),
            challenges_completed: self.record.completed_challenges.len(),
            streak: self.record.streak,
        }
    }

    /// First unlocked module not yet completed.
    pub fn next_module_to_study(&self) -> Option<&Module> {
        self.catalog
            .modules()
            .iter()
            .find(|m| self.is_unlocked(m.id) && !self.is_completed(m.id))
    }
}

#[cfg(test)]
#[path = "tests/progression_tests.rs"]
mod tests;
