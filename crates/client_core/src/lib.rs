use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};
use shared::{
    catalog::{Catalog, Challenge, ConceptPage},
    domain::{AchievementId, AgentId, ChallengeId, ChatMessage, ModuleId},
};
use storage::ProgressStore;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub mod challenge;
pub mod gateway;
pub mod minigame;
pub mod normalize;
pub mod progression;
pub mod tutor;

use challenge::{ChallengePhase, ChallengeSession, EvaluationOutcome, SubmitRejected};
use gateway::AgentGateway;
use minigame::{GameClick, RegisterMatchGame};
use progression::{DashboardStats, ProgressEvent, ProgressionEngine};
use tutor::{SendRejected, TutorConversation};

pub const DEFAULT_TUTOR_AGENT_ID: &str = "6997f9b4203926f2a9800b9e";
pub const DEFAULT_EVALUATOR_AGENT_ID: &str = "6997f9b42ec22406b8d061f1";

/// Module whose concept screen hosts the register warm-up.
const GAME_MODULE: ModuleId = ModuleId(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIds {
    pub tutor: AgentId,
    pub evaluator: AgentId,
}

impl Default for AgentIds {
    fn default() -> Self {
        Self {
            tutor: AgentId::new(DEFAULT_TUTOR_AGENT_ID),
            evaluator: AgentId::new(DEFAULT_EVALUATOR_AGENT_ID),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Dashboard,
    Module,
    Challenge,
    Achievements,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("unknown module {0}")]
    UnknownModule(ModuleId),
    #[error("module {0} is locked")]
    Locked(ModuleId),
    #[error("module {module_id} has no challenge #{index}")]
    UnknownChallenge { module_id: ModuleId, index: usize },
    #[error("the current challenge has not been passed")]
    NotPassed,
    #[error("every module is already completed")]
    CourseComplete,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Progress(ProgressEvent),
    EvaluationResolved {
        challenge_id: ChallengeId,
        passed: bool,
        score: f64,
        displayed: bool,
    },
    TutorReplied(ChatMessage),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleView {
    pub id: ModuleId,
    pub title: String,
    pub unlocked: bool,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ChallengeView {
    pub challenge: Challenge,
    pub index: usize,
    pub total: usize,
    pub draft: String,
    pub phase: ChallengePhase,
    pub busy: bool,
    pub hints_shown: usize,
    pub visible_hints: Vec<String>,
    pub already_completed: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub screen: Screen,
    pub stats: DashboardStats,
    pub xp_progress: f64,
    pub modules: Vec<ModuleView>,
    pub current_module: ModuleId,
    pub concept_index: usize,
    pub concept: Option<ConceptPage>,
    pub earned_achievements: BTreeSet<AchievementId>,
    pub challenge: Option<ChallengeView>,
    pub transcript: Vec<ChatMessage>,
    pub tutor_busy: bool,
    pub tutor_open: bool,
    pub game: RegisterMatchGame,
    pub game_done: bool,
}

struct SessionState {
    engine: ProgressionEngine,
    challenge: ChallengeSession,
    tutor: TutorConversation,
    game: RegisterMatchGame,
    screen: Screen,
    current_module: ModuleId,
    concept_index: usize,
    challenge_index: usize,
}

pub struct LearningSession {
    catalog: Arc<Catalog>,
    gateway: Arc<dyn AgentGateway>,
    agents: AgentIds,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl LearningSession {
    /// Restores saved progress once and opens on the dashboard.
    pub async fn start(
        catalog: Arc<Catalog>,
        store: Arc<dyn ProgressStore>,
        gateway: Arc<dyn AgentGateway>,
        agents: AgentIds,
    ) -> Arc<Self> {
        let engine = ProgressionEngine::restore(catalog.clone(), store).await;
        let (events, _) = broadcast::channel(256);
        info!(level = engine.level(), xp = engine.record().xp, "learning session started");
        Arc::new(Self {
            inner: Mutex::new(SessionState {
                engine,
                challenge: ChallengeSession::new(),
                tutor: TutorConversation::new(),
                game: RegisterMatchGame::new(catalog.register_pairs()),
                screen: Screen::Dashboard,
                current_module: GAME_MODULE,
                concept_index: 0,
                challenge_index: 0,
            }),
            catalog,
            gateway,
            agents,
            events,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn show_dashboard(&self) {
        self.inner.lock().await.screen = Screen::Dashboard;
    }

    pub async fn show_achievements(&self) {
        self.inner.lock().await.screen = Screen::Achievements;
    }

    /// Opens a module's concept pages. Locked modules are refused.
    pub async fn open_module(&self, module_id: ModuleId) -> Result<(), NavigationError> {
        let mut guard = self.inner.lock().await;
        self.open_module_locked(&mut guard, module_id)
    }

    fn open_module_locked(
        &self,
        state: &mut SessionState,
        module_id: ModuleId,
    ) -> Result<(), NavigationError> {
        if self.catalog.module(module_id).is_none() {
            return Err(NavigationError::UnknownModule(module_id));
        }
        if !state.engine.is_unlocked(module_id) {
            return Err(NavigationError::Locked(module_id));
        }
        state.current_module = module_id;
        state.concept_index = 0;
        state.game.reset();
        state.screen = Screen::Module;
        debug!(module = %module_id, "module opened");
        Ok(())
    }

    /// Opens the first unlocked module that is not completed yet.
    pub async fn continue_learning(&self) -> Result<ModuleId, NavigationError> {
        let mut guard = self.inner.lock().await;
        let next = guard
            .engine
            .next_module_to_study()
            .map(|m| m.id)
            .ok_or(NavigationError::CourseComplete)?;
        self.open_module_locked(&mut guard, next)?;
        Ok(next)
    }

    pub async fn next_concept(&self) -> bool {
        let mut guard = self.inner.lock().await;
        let pages = self.catalog.concepts(guard.current_module).len();
        if guard.concept_index + 1 < pages {
            guard.concept_index += 1;
            true
        } else {
            false
        }
    }

    pub async fn previous_concept(&self) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.concept_index > 0 {
            guard.concept_index -= 1;
            true
        } else {
            false
        }
    }

    /// Starts a fresh attempt at the `index`-th challenge of a module.
    pub async fn open_challenge(
        &self,
        module_id: ModuleId,
        index: usize,
    ) -> Result<(), NavigationError> {
        let mut guard = self.inner.lock().await;
        self.open_challenge_locked(&mut guard, module_id, index)
    }

    fn open_challenge_locked(
        &self,
        state: &mut SessionState,
        module_id: ModuleId,
        index: usize,
    ) -> Result<(), NavigationError> {
        if self.catalog.module(module_id).is_none() {
            return Err(NavigationError::UnknownModule(module_id));
        }
        if !state.engine.is_unlocked(module_id) {
            return Err(NavigationError::Locked(module_id));
        }
        let challenge = self
            .catalog
            .challenges(module_id)
            .get(index)
            .map(|c| (*c).clone())
            .ok_or(NavigationError::UnknownChallenge { module_id, index })?;

        state.current_module = module_id;
        state.challenge_index = index;
        state.challenge.select(challenge);
        state.screen = Screen::Challenge;
        Ok(())
    }

    /// After a pass, moves to the module's next challenge or, after the last
    /// one, back to the dashboard.
    pub async fn advance_after_pass(&self) -> Result<Screen, NavigationError> {
        let mut guard = self.inner.lock().await;
        let passed = guard.challenge.result().is_some_and(|r| r.passed());
        if !passed {
            return Err(NavigationError::NotPassed);
        }

        let module_id = guard.current_module;
        let next = guard.challenge_index + 1;
        if next < self.catalog.challenges(module_id).len() {
            self.open_challenge_locked(&mut guard, module_id, next)?;
        } else {
            guard.challenge.clear();
            guard.screen = Screen::Dashboard;
        }
        Ok(guard.screen)
    }

    pub async fn set_draft(&self, code: impl Into<String>) {
        self.inner.lock().await.challenge.set_draft(code);
    }

    /// Sends the draft to the evaluator and applies the verdict.
    ///
    /// The session lock is released while the evaluator runs and while the
    /// record is saved, so a second submission in the meantime is rejected by
    /// the busy flag.
    pub async fn submit_code(&self) -> Result<EvaluationOutcome, SubmitRejected> {
        let pending = {
            let mut guard = self.inner.lock().await;
            guard.challenge.begin_submission()
        };
        let pending = match pending {
            Ok(pending) => pending,
            Err(rejected) => {
                let _ = self.events.send(SessionEvent::Rejected(rejected.to_string()));
                return Err(rejected);
            }
        };

        let reply = self
            .gateway
            .invoke(&pending.prompt, &self.agents.evaluator)
            .await;

        let (outcome, save) = {
            let mut guard = self.inner.lock().await;
            let outcome = guard.challenge.resolve(pending, reply);
            let mut save = None;

            if let Some(xp) = outcome.xp_to_award {
                let challenge = &outcome.challenge;
                if guard.engine.is_challenge_completed(&challenge.id) {
                    debug!(challenge = %challenge.id, "challenge already completed; no xp awarded");
                } else {
                    let progress = guard.engine.apply_challenge_pass(
                        &challenge.id,
                        challenge.module_id,
                        xp,
                    );
                    if !progress.is_empty() {
                        save = Some(guard.engine.pending_save());
                    }
                    for event in progress {
                        let _ = self.events.send(SessionEvent::Progress(event));
                    }
                }
            }
            (outcome, save)
        };

        if let Some(save) = save {
            save.write().await;
        }

        let _ = self.events.send(SessionEvent::EvaluationResolved {
            challenge_id: outcome.challenge.id.clone(),
            passed: outcome.result.passed(),
            score: outcome.result.score,
            displayed: outcome.displayed,
        });
        Ok(outcome)
    }

    pub async fn reveal_hint(&self) -> bool {
        self.inner.lock().await.challenge.reveal_hint()
    }

    pub async fn retry(&self) -> bool {
        self.inner.lock().await.challenge.retry()
    }

    pub async fn open_tutor(&self) {
        self.inner.lock().await.tutor.open();
    }

    pub async fn close_tutor(&self) {
        self.inner.lock().await.tutor.close();
    }

    /// Runs one tutor turn in the context of the current module.
    pub async fn send_tutor_message(&self, text: &str) -> Result<ChatMessage, SendRejected> {
        let pending = {
            let mut guard = self.inner.lock().await;
            let title = self
                .catalog
                .module(guard.current_module)
                .map(|m| m.title.clone())
                .unwrap_or_default();
            guard.tutor.begin_send(text, &title)
        };
        let pending = match pending {
            Ok(pending) => pending,
            Err(rejected) => {
                let _ = self.events.send(SessionEvent::Rejected(rejected.to_string()));
                return Err(rejected);
            }
        };

        let reply = self.gateway.invoke(&pending.prompt, &self.agents.tutor).await;

        let message = self.inner.lock().await.tutor.complete(pending, reply);
        let _ = self.events.send(SessionEvent::TutorReplied(message.clone()));
        Ok(message)
    }

    /// Sends a suggested follow-up question as if it had been typed.
    pub async fn ask_follow_up(
        &self,
        message_index: usize,
        question_index: usize,
    ) -> Result<ChatMessage, SendRejected> {
        let question = self
            .inner
            .lock()
            .await
            .tutor
            .follow_up(message_index, question_index)?;
        self.send_tutor_message(&question).await
    }

    /// Register warm-up clicks; only live on the first module's screen.
    pub async fn game_click(&self, click: GameClick) -> bool {
        let mut guard = self.inner.lock().await;
        if guard.screen != Screen::Module || guard.current_module != GAME_MODULE {
            return false;
        }
        let changed = guard.game.click(click);
        if changed && guard.game.is_done() {
            info!("register warm-up completed");
        }
        changed
    }

    pub async fn game_reset(&self) {
        self.inner.lock().await.game.reset();
    }

    pub async fn snapshot(&self) -> SessionView {
        let guard = self.inner.lock().await;
        let engine = &guard.engine;

        let modules = self
            .catalog
            .modules()
            .iter()
            .map(|m| ModuleView {
                id: m.id,
                title: m.title.clone(),
                unlocked: engine.is_unlocked(m.id),
                completed: engine.is_completed(m.id),
            })
            .collect();

        let challenge = guard.challenge.active().map(|c| ChallengeView {
            challenge: c.clone(),
            index: guard.challenge_index,
            total: self.catalog.challenges(c.module_id).len(),
            draft: guard.challenge.draft().to_string(),
            phase: guard.challenge.phase().clone(),
            busy: guard.challenge.is_busy(),
            hints_shown: guard.challenge.hints_shown(),
            visible_hints: guard.challenge.visible_hints().to_vec(),
            already_completed: engine.is_challenge_completed(&c.id),
        });

        SessionView {
            screen: guard.screen,
            stats: engine.stats(),
            xp_progress: engine.xp_progress_fraction(),
            modules,
            current_module: guard.current_module,
            concept_index: guard.concept_index,
            concept: self
                .catalog
                .concepts(guard.current_module)
                .get(guard.concept_index)
                .cloned(),
            earned_achievements: engine.earned_achievements(),
            challenge,
            transcript: guard.tutor.transcript().to_vec(),
            tutor_busy: guard.tutor.is_busy(),
            tutor_open: guard.tutor.is_open(),
            game: guard.game.clone(),
            game_done: guard.game.is_done(),
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
