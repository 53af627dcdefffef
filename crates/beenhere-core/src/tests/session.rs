use beenhere_types::MatchState;

use crate::testutil::memory_tracker;

#[test]
fn first_navigation_reports_none_and_stores_the_visit() {
    let tracker = memory_tracker();
    let state = tracker.navigation(1, "https://a.com/p").unwrap();
    assert_eq!(state, MatchState::None);

    let stats = tracker.stats().unwrap();
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.recent[0].visit_count, 1);
}

#[test]
fn reload_in_same_tab_does_not_double_count() {
    let tracker = memory_tracker();
    tracker.navigation(1, "https://a.com/p").unwrap();
    let state = tracker.navigation(1, "https://a.com/p").unwrap();

    // Still "none": the tab that created the record keeps seeing its
    // first visit, and the reload did not bump the counter.
    assert_eq!(state, MatchState::None);
    assert_eq!(tracker.stats().unwrap().recent[0].visit_count, 1);
}

#[test]
fn other_tab_sees_full_match_and_counts_a_visit() {
    let tracker = memory_tracker();
    tracker.navigation(1, "https://a.com/p").unwrap();
    let state = tracker.navigation(2, "https://a.com/p").unwrap();
    assert_eq!(state, MatchState::Full);
    assert_eq!(tracker.stats().unwrap().recent[0].visit_count, 2);
}

#[test]
fn tab_removal_clears_transient_state() {
    let tracker = memory_tracker();
    tracker.navigation(1, "https://a.com/p").unwrap();
    tracker.tab_removed(1);

    // With its session gone the tab behaves like a new one: the record
    // exists, so the same navigation is now a full match and counts.
    let state = tracker.navigation(1, "https://a.com/p").unwrap();
    assert_eq!(state, MatchState::Full);
    assert_eq!(tracker.stats().unwrap().recent[0].visit_count, 2);
}

#[test]
fn visit_summary_reports_previous_visit_time_for_the_tab() {
    let tracker = memory_tracker();
    let first = tracker.record_visit("https://a.com/p").unwrap().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(2));

    // A navigation in tab 3 refreshes lastVisited, but the tab keeps the
    // pre-navigation time so the UI can answer "when was I here before".
    let state = tracker.navigation(3, "https://a.com/p").unwrap();
    assert_eq!(state, MatchState::Full);

    let with_tab = tracker
        .visit_summary("https://a.com/p", Some(3))
        .unwrap();
    assert_eq!(with_tab.last_visited, Some(first.last_visited));
    assert_eq!(with_tab.visit_count, 2);

    let without_tab = tracker.visit_summary("https://a.com/p", None).unwrap();
    assert!(without_tab.last_visited.unwrap() > first.last_visited);
}

#[test]
fn untrackable_url_reports_none_without_touching_sessions() {
    let tracker = memory_tracker();
    tracker.navigation(1, "https://a.com/p").unwrap();
    let state = tracker.navigation(1, "about:blank").unwrap();
    assert_eq!(state, MatchState::None);
    // The tab's previous session entry is still intact.
    let state = tracker.navigation(1, "https://a.com/p").unwrap();
    assert_eq!(state, MatchState::None);
}
