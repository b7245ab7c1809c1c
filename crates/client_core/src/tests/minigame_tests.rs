use super::*;
use shared::catalog::Catalog;

fn game() -> RegisterMatchGame {
    RegisterMatchGame::new(Catalog::assembly_quest().register_pairs())
}

fn role(name: &str) -> GameClick {
    GameClick::Role(name.to_string())
}

fn register(name: &str) -> GameClick {
    GameClick::Register(name.to_string())
}

#[test]
fn register_click_without_role_does_nothing() {
    let mut game = game();
    assert!(!game.click(register("EAX")));
    assert!(game.placed().is_empty());
}

#[test]
fn placing_all_roles_correctly_finishes_the_game() {
    let mut game = game();
    let pairs = game.pairs().to_vec();
    for pair in &pairs {
        assert!(game.click(role(&pair.role)));
        assert!(game.click(register(&pair.register)));
        assert_eq!(game.is_correct(&pair.register), Some(true));
    }
    assert!(game.is_done());
}

#[test]
fn wrong_placement_sticks_until_reset() {
    let mut game = game();
    game.click(role("Counter"));
    game.click(register("EAX"));
    assert_eq!(game.is_correct("EAX"), Some(false));
    assert_eq!(game.is_correct("EBX"), None);

    // Filled registers and placed roles ignore further clicks.
    assert!(!game.click(role("Counter")));
    game.click(role("Accumulator"));
    assert!(!game.click(register("EAX")));
    assert_eq!(game.selected_role(), Some("Accumulator"));
    assert!(!game.is_done());

    game.reset();
    assert!(game.placed().is_empty());
    assert!(game.selected_role().is_none());
    assert!(game.click(role("Counter")));
    assert!(game.click(register("ECX")));
    assert_eq!(game.is_correct("ECX"), Some(true));
}

#[test]
fn selecting_another_role_moves_the_selection() {
    let mut game = game();
    game.click(role("Base"));
    game.click(role("Data"));
    assert_eq!(game.selected_role(), Some("Data"));
    assert!(!game.click(role("Nonsense")));
    assert_eq!(game.selected_role(), Some("Data"));
}

#[test]
fn clicking_the_selected_role_again_deselects_it() {
    let mut game = game();
    assert!(game.click(role("Base")));
    assert!(game.click(role("Base")));
    assert!(game.selected_role().is_none());
    assert!(!game.click(register("EBX")));
    assert!(game.placed().is_empty());

    assert!(game.click(role("Base")));
    assert_eq!(game.selected_role(), Some("Base"));
}
