use tokio::time::advance;

use super::*;
use crate::memory::RecordingNavigator;

const COOLDOWN: Duration = Duration::from_secs(2);

fn loaded_state() -> CoordinatorState {
    let state = CoordinatorState::new(COOLDOWN);
    state.finish_loading();
    state
}

// =============================================================================
// lifecycle flags
// =============================================================================

#[test]
fn starts_loading_and_not_run() {
    let state = CoordinatorState::new(COOLDOWN);
    assert!(state.is_loading());
    assert!(!state.has_run_once());
}

#[test]
fn finish_loading_reports_only_the_first_flip() {
    let state = CoordinatorState::new(COOLDOWN);
    assert!(state.finish_loading());
    assert!(!state.finish_loading());
    assert!(!state.is_loading());
}

#[test]
fn first_run_is_claimed_once() {
    let state = CoordinatorState::new(COOLDOWN);
    assert!(state.claim_first_run());
    assert!(!state.claim_first_run());
    assert!(state.has_run_once());
}

// =============================================================================
// cooldown policy
// =============================================================================

#[tokio::test(start_paused = true)]
async fn no_redirect_while_loading() {
    let state = CoordinatorState::new(COOLDOWN);
    assert!(!state.can_redirect());
    assert!(!state.try_claim_redirect());
}

#[tokio::test(start_paused = true)]
async fn first_redirect_is_allowed() {
    let state = loaded_state();
    assert!(state.can_redirect());
    assert!(state.try_claim_redirect());
}

#[tokio::test(start_paused = true)]
async fn second_redirect_within_cooldown_is_blocked() {
    let state = loaded_state();
    assert!(state.try_claim_redirect());
    advance(Duration::from_millis(1_999)).await;
    assert!(!state.can_redirect());
    assert!(!state.try_claim_redirect());
}

#[tokio::test(start_paused = true)]
async fn cooldown_boundary_is_exclusive() {
    let state = loaded_state();
    assert!(state.try_claim_redirect());
    advance(COOLDOWN).await;
    assert!(!state.can_redirect());
    advance(Duration::from_millis(1)).await;
    assert!(state.can_redirect());
}

#[tokio::test(start_paused = true)]
async fn record_redirect_starts_a_cooldown() {
    let state = loaded_state();
    state.record_redirect();
    assert!(!state.can_redirect());
}

// =============================================================================
// redirect
// =============================================================================

#[tokio::test(start_paused = true)]
async fn near_simultaneous_redirects_navigate_once() {
    let state = loaded_state();
    let navigator = RecordingNavigator::new("/login");

    assert!(state.redirect(&navigator, "/admin"));
    advance(Duration::from_millis(100)).await;
    assert!(!state.redirect(&navigator, "/user"));

    assert_eq!(navigator.navigations(), vec!["/admin".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn redirect_fires_again_after_cooldown() {
    let state = loaded_state();
    let navigator = RecordingNavigator::new("/user");

    assert!(state.redirect(&navigator, "/login"));
    advance(Duration::from_millis(2_001)).await;
    assert!(state.redirect(&navigator, "/login"));
    assert_eq!(navigator.navigations().len(), 2);
}
