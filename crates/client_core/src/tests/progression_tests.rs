use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use anyhow::anyhow;
use async_trait::async_trait;
use storage::MemoryStore;

struct FailingStore {
    saves: AtomicUsize,
}

#[async_trait]
impl ProgressStore for FailingStore {
    async fn load(&self) -> anyhow::Result<Option<ProgressRecord>> {
        Err(anyhow!("disk unplugged"))
    }

    async fn save(&self, _record: &ProgressRecord) -> anyhow::Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("disk unplugged"))
    }
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::assembly_quest())
}

fn id(raw: &str) -> ChallengeId {
    ChallengeId::new(raw)
}

fn engine_with(record: ProgressRecord) -> (ProgressionEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = ProgressionEngine::with_record(catalog(), store.clone(), record);
    (engine, store)
}

#[test]
fn level_math_at_boundaries() {
    assert_eq!(compute_level(0), 1);
    assert_eq!(compute_level(499), 1);
    assert_eq!(compute_level(500), 2);
    assert_eq!(compute_level(999), 2);
    assert_eq!(compute_level(1000), 3);

    assert_eq!(xp_to_next_level(0), 500);
    assert_eq!(xp_to_next_level(499), 1);
    assert_eq!(xp_to_next_level(500), 500);

    assert_eq!(xp_progress_fraction(0), 0.0);
    assert_eq!(xp_progress_fraction(250), 0.5);
    assert_eq!(xp_progress_fraction(750), 0.5);
}

#[test]
fn module_one_is_always_unlocked_and_zero_never_is() {
    let (engine, _) = engine_with(ProgressRecord::default());
    assert!(engine.is_unlocked(ModuleId(1)));
    assert!(!engine.is_unlocked(ModuleId(0)));
    assert!(!engine.is_unlocked(ModuleId(2)));
}

#[test]
fn unlock_follows_predecessor_completion() {
    let mut record = ProgressRecord::default();
    record.completed_modules.insert(ModuleId(3));
    let (engine, _) = engine_with(record);

    for n in 1..=10u32 {
        let expected = n == 1 || engine.is_completed(ModuleId(n - 1));
        assert_eq!(engine.is_unlocked(ModuleId(n)), expected, "module {n}");
    }
    assert!(engine.is_unlocked(ModuleId(4)));
    assert!(!engine.is_unlocked(ModuleId(5)));
}

#[tokio::test]
async fn module_completes_only_after_every_challenge() {
    let (mut engine, store) = engine_with(ProgressRecord::default());

    let events = engine.record_challenge_pass(&id("c1_1"), ModuleId(1), 50).await;
    assert_eq!(
        events,
        vec![
            ProgressEvent::ChallengeCompleted {
                challenge_id: id("c1_1"),
                module_id: ModuleId(1),
            },
            ProgressEvent::XpGained {
                amount: 50,
                total: 50
            },
        ]
    );
    assert!(!engine.is_completed(ModuleId(1)));
    assert!(!engine.is_unlocked(ModuleId(2)));

    let events = engine.record_challenge_pass(&id("c1_2"), ModuleId(1), 50).await;
    assert!(events.contains(&ProgressEvent::ModuleCompleted {
        module_id: ModuleId(1)
    }));
    assert!(engine.is_completed(ModuleId(1)));
    assert!(engine.is_unlocked(ModuleId(2)));
    assert_eq!(engine.record().xp, 100);

    let earned = engine.earned_achievements();
    assert!(earned.contains(&AchievementId::new("first_step")));
    assert!(earned.contains(&AchievementId::new("register_master")));

    let saved = store.load().await.expect("load").expect("saved record");
    assert_eq!(&saved, engine.record());
}

#[tokio::test]
async fn repeated_pass_keeps_sets_stable() {
    let (mut engine, _) = engine_with(ProgressRecord::default());
    engine.record_challenge_pass(&id("c1_1"), ModuleId(1), 50).await;
    engine.record_challenge_pass(&id("c1_2"), ModuleId(1), 50).await;
    let modules = engine.record().completed_modules.clone();
    let challenges = engine.record().completed_challenges.clone();

    let events = engine.record_challenge_pass(&id("c1_2"), ModuleId(1), 0).await;
    assert!(events.is_empty());
    assert_eq!(engine.record().completed_modules, modules);
    assert_eq!(engine.record().completed_challenges, challenges);
    assert_eq!(engine.record().xp, 100);
}

#[tokio::test]
async fn passes_against_locked_or_mismatched_modules_are_ignored() {
    let (mut engine, store) = engine_with(ProgressRecord::default());

    assert!(engine
        .record_challenge_pass(&id("c2_1"), ModuleId(2), 75)
        .await
        .is_empty());
    assert!(engine
        .record_challenge_pass(&id("c1_1"), ModuleId(2), 50)
        .await
        .is_empty());
    assert!(engine
        .record_challenge_pass(&id("nope"), ModuleId(1), 50)
        .await
        .is_empty());

    assert_eq!(engine.record(), &ProgressRecord::default());
    assert!(store.raw_payload().await.is_none());
}

#[tokio::test]
async fn crossing_500_xp_levels_up_and_earns_rising_star() {
    let mut record = ProgressRecord::default();
    record.xp = 480;
    let (mut engine, _) = engine_with(record);
    assert!(!engine.earned_achievements().contains(&AchievementId::new("xp500")));

    let events = engine.add_xp(20).await;
    assert_eq!(
        events,
        vec![
            ProgressEvent::XpGained {
                amount: 20,
                total: 500
            },
            ProgressEvent::LevelUp { level: 2 },
        ]
    );
    assert_eq!(engine.level(), 2);
    assert!(engine.earned_achievements().contains(&AchievementId::new("xp500")));
}

#[tokio::test]
async fn zero_xp_changes_nothing() {
    let (mut engine, store) = engine_with(ProgressRecord::default());
    assert!(engine.add_xp(0).await.is_empty());
    assert!(store.raw_payload().await.is_none());
}

#[tokio::test]
async fn perfect_score_achievement_is_never_derived() {
    let mut record = ProgressRecord::default();
    record.xp = 5_000;
    record.completed_modules = (1..=10).map(ModuleId).collect();
    let (engine, _) = engine_with(record);

    let earned = engine.earned_achievements();
    assert_eq!(earned.len(), engine.catalog().achievements().len() - 1);
    assert!(!earned.contains(&AchievementId::new("perfect")));
}

#[tokio::test]
async fn failing_store_keeps_memory_authoritative() {
    let store = Arc::new(FailingStore {
        saves: AtomicUsize::new(0),
    });
    let mut engine = ProgressionEngine::restore(catalog(), store.clone()).await;
    assert_eq!(engine.record(), &ProgressRecord::default());

    engine.record_challenge_pass(&id("c1_1"), ModuleId(1), 50).await;
    engine.record_challenge_pass(&id("c1_2"), ModuleId(1), 50).await;

    assert_eq!(store.saves.load(Ordering::SeqCst), 2);
    assert_eq!(engine.record().xp, 100);
    assert!(engine.is_unlocked(ModuleId(2)));
}

#[tokio::test]
async fn applied_pass_is_written_only_by_its_pending_save() {
    let store = Arc::new(FailingStore {
        saves: AtomicUsize::new(0),
    });
    let mut engine =
        ProgressionEngine::with_record(catalog(), store.clone(), ProgressRecord::default());

    let events = engine.apply_challenge_pass(&id("c1_1"), ModuleId(1), 50);
    assert!(!events.is_empty());
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);

    let save = engine.pending_save();
    engine.apply_challenge_pass(&id("c1_2"), ModuleId(1), 50);
    save.write().await;
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(engine.record().xp, 100);
}

#[tokio::test]
async fn restore_reads_existing_save() {
    let store = Arc::new(MemoryStore::with_payload(
        r#"{"xp":620,"doneMods":[1],"doneCh":["c1_1","c1_2"],"streak":3}"#,
    ));
    let engine = ProgressionEngine::restore(catalog(), store).await;
    assert_eq!(engine.record().xp, 620);
    assert_eq!(engine.record().streak, 3);
    assert_eq!(engine.level(), 2);
    assert!(engine.is_unlocked(ModuleId(2)));
}

#[tokio::test]
async fn restore_with_garbage_starts_fresh() {
    let store = Arc::new(MemoryStore::with_payload("not json at all"));
    let engine = ProgressionEngine::restore(catalog(), store).await;
    assert_eq!(engine.record(), &ProgressRecord::default());
}

#[test]
fn stats_and_next_module() {
    let mut record = ProgressRecord::default();
    record.xp = 730;
    record.completed_modules.insert(ModuleId(1));
    record.completed_challenges.insert(id("c1_1"));
    record.completed_challenges.insert(id("c1_2"));
    let (engine, _) = engine_with(record);

    assert_eq!(
        engine.stats(),
        DashboardStats {
            xp: 730,
            level: 2,
            xp_to_next_level: 270,
            modules_completed: 1,
            modules_total: 10,
            challenges_completed: 2,
            streak: 1,
        }
    );
    assert_eq!(engine.next_module_to_study().map(|m| m.id), Some(ModuleId(2)));
}

#[test]
fn next_module_is_none_when_everything_is_done() {
    let mut record = ProgressRecord::default();
    record.completed_modules = (1..=10).map(ModuleId).collect();
    let (engine, _) = engine_with(record);
    assert!(engine.next_module_to_study().is_none());
}
