//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use unitap_core::{
  context::{Context, ContextBody, ContextKind, Lecture, TimeWindow},
  device::{Device, DeviceMode},
  ledger,
  store::{LeaderboardPeriod, NewContext, NewUser, TapStore},
  tap::{TapAction, TapEvent, TapEventQuery},
  user::{Role, User, UserStats},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
}

async fn add_user(s: &SqliteStore, name: &str) -> User {
  s.add_user(NewUser {
    name:       name.into(),
    email:      format!("{}@example.edu", name.to_lowercase()),
    university: "Example University".into(),
    role:       Role::Student,
  })
  .await
  .unwrap()
}

async fn add_reader(s: &SqliteStore, device_id: &str) -> Device {
  let device = Device {
    device_id: device_id.into(),
    name:      "Hall A reader".into(),
    location:  "Hall A".into(),
    mode:      DeviceMode::Attendance,
    last_seen: None,
  };
  s.add_device(device.clone()).await.unwrap();
  device
}

fn lecture_body(start: DateTime<Utc>) -> ContextBody {
  ContextBody::Lecture(Lecture {
    name:           "Distributed Systems".into(),
    professor:      "Prof. Moreau".into(),
    room:           "Hall A".into(),
    expected_count: 30,
    checked_in:     BTreeSet::new(),
    window:         TimeWindow {
      start,
      end: start + Duration::hours(2),
    },
  })
}

async fn add_lecture(s: &SqliteStore, device_id: &str) -> Context {
  s.add_context(NewContext {
    device_id: device_id.into(),
    body:      lecture_body(t0()),
  })
  .await
  .unwrap()
}

/// Build and commit one attendance tap, returning the event and the
/// stats produced by the ledger fold.
async fn commit_attendance(
  s:       &SqliteStore,
  user:    &User,
  context: &mut Context,
  at:      DateTime<Utc>,
  first:   bool,
) -> (TapEvent, UserStats) {
  if let ContextBody::Lecture(l) = &mut context.body {
    l.checked_in.insert(user.user_id);
  }
  let event = TapEvent {
    tap_id:           Uuid::new_v4(),
    user_id:          user.user_id,
    user_name:        user.name.clone(),
    device_id:        context.device_id.clone(),
    action:           TapAction::Attendance,
    context_id:       context.context_id,
    context_label:    context.label(),
    timestamp:        at,
    is_first_arrival: first,
  };
  let before = s.user_stats(user.user_id).await.unwrap();
  let (stats, entry) = ledger::apply(&before, &event);
  let applied = s.commit_tap(context, &event, &stats, &entry).await.unwrap();
  assert!(applied);
  (event, stats)
}

// ─── Users & cards ───────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_user() {
  let s = store().await;

  let user = add_user(&s, "Alice").await;
  assert_eq!(user.role, Role::Student);
  assert!(user.card_uid.is_none());

  let fetched = s.get_user(user.user_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user.user_id);
  assert_eq!(fetched.name, "Alice");
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn link_card_then_resolve() {
  let s = store().await;
  let user = add_user(&s, "Alice").await;

  let linked = s.link_card(user.user_id, "04A1B2C3").await.unwrap();
  assert_eq!(linked.card_uid.as_deref(), Some("04A1B2C3"));

  let resolved = s.resolve_card("04A1B2C3").await.unwrap().unwrap();
  assert_eq!(resolved.user_id, user.user_id);

  assert!(s.resolve_card("DEADBEEF").await.unwrap().is_none());
}

#[tokio::test]
async fn relink_revokes_prior_holder() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;

  s.link_card(alice.user_id, "04A1B2C3").await.unwrap();
  s.link_card(bob.user_id, "04A1B2C3").await.unwrap();

  let resolved = s.resolve_card("04A1B2C3").await.unwrap().unwrap();
  assert_eq!(resolved.user_id, bob.user_id);

  let alice_now = s.get_user(alice.user_id).await.unwrap().unwrap();
  assert!(alice_now.card_uid.is_none());
}

#[tokio::test]
async fn link_card_unknown_user_fails() {
  let s = store().await;
  let result = s.link_card(Uuid::new_v4(), "04A1B2C3").await;
  assert!(result.is_err());
  // The revoke inside the failed transaction must have rolled back.
  let user = add_user(&s, "Alice").await;
  s.link_card(user.user_id, "04A1B2C3").await.unwrap();
  assert!(s.resolve_card("04A1B2C3").await.unwrap().is_some());
}

#[tokio::test]
async fn stats_default_for_fresh_user() {
  let s = store().await;
  let user = add_user(&s, "Alice").await;
  let stats = s.user_stats(user.user_id).await.unwrap();
  assert_eq!(stats, UserStats::default());
}

// ─── Devices ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_get_and_touch_device() {
  let s = store().await;
  add_reader(&s, "reader-1").await;

  let fetched = s.get_device("reader-1").await.unwrap().unwrap();
  assert_eq!(fetched.mode, DeviceMode::Attendance);
  assert!(fetched.last_seen.is_none());

  s.touch_device("reader-1", t0()).await.unwrap();
  let touched = s.get_device("reader-1").await.unwrap().unwrap();
  assert_eq!(touched.last_seen, Some(t0()));

  assert!(s.get_device("reader-9").await.unwrap().is_none());
}

// ─── Contexts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn context_round_trips_through_json_body() {
  let s = store().await;
  add_reader(&s, "reader-1").await;
  let context = add_lecture(&s, "reader-1").await;

  let fetched = s.get_context(context.context_id).await.unwrap().unwrap();
  assert_eq!(fetched.device_id, "reader-1");
  match &fetched.body {
    ContextBody::Lecture(l) => {
      assert_eq!(l.name, "Distributed Systems");
      assert_eq!(l.expected_count, 30);
      assert_eq!(l.window.start, t0());
    }
    other => panic!("expected lecture, got {other:?}"),
  }
}

#[tokio::test]
async fn list_contexts_filters_by_kind() {
  let s = store().await;
  add_reader(&s, "reader-1").await;
  add_lecture(&s, "reader-1").await;
  add_lecture(&s, "reader-1").await;

  let all = s.list_contexts(None).await.unwrap();
  assert_eq!(all.len(), 2);

  let lectures = s.list_contexts(Some(ContextKind::Lecture)).await.unwrap();
  assert_eq!(lectures.len(), 2);

  let equipment = s.list_contexts(Some(ContextKind::Equipment)).await.unwrap();
  assert!(equipment.is_empty());
}

#[tokio::test]
async fn contexts_for_device_scopes_by_reader() {
  let s = store().await;
  add_reader(&s, "reader-1").await;
  add_reader(&s, "reader-2").await;
  add_lecture(&s, "reader-1").await;

  assert_eq!(s.contexts_for_device("reader-1").await.unwrap().len(), 1);
  assert!(s.contexts_for_device("reader-2").await.unwrap().is_empty());
}

#[tokio::test]
async fn put_context_overwrites_body() {
  let s = store().await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  let attendee = Uuid::new_v4();
  if let ContextBody::Lecture(l) = &mut context.body {
    l.checked_in.insert(attendee);
  }
  s.put_context(&context).await.unwrap();

  let fetched = s.get_context(context.context_id).await.unwrap().unwrap();
  match &fetched.body {
    ContextBody::Lecture(l) => assert!(l.checked_in.contains(&attendee)),
    other => panic!("expected lecture, got {other:?}"),
  }
}

#[tokio::test]
async fn put_context_unknown_id_fails() {
  let s = store().await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;
  context.context_id = Uuid::new_v4();
  assert!(s.put_context(&context).await.is_err());
}

// ─── Tap commit ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn commit_tap_persists_everything_together() {
  let s = store().await;
  let user = add_user(&s, "Alice").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  let (event, stats) =
    commit_attendance(&s, &user, &mut context, t0(), true).await;

  // Event is in the log.
  let history = s.tap_events_for_user(user.user_id).await.unwrap();
  assert_eq!(history.len(), 1);
  assert_eq!(history[0].tap_id, event.tap_id);
  assert!(history[0].is_first_arrival);

  // Aggregate was folded in the same transaction.
  let persisted = s.user_stats(user.user_id).await.unwrap();
  assert_eq!(persisted, stats);
  assert_eq!(persisted.points, 25);

  // Context body was updated too.
  let fetched = s.get_context(context.context_id).await.unwrap().unwrap();
  match &fetched.body {
    ContextBody::Lecture(l) => assert!(l.checked_in.contains(&user.user_id)),
    other => panic!("expected lecture, got {other:?}"),
  }
}

#[tokio::test]
async fn commit_tap_same_id_twice_is_a_no_op() {
  let s = store().await;
  let user = add_user(&s, "Alice").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  let (event, stats) =
    commit_attendance(&s, &user, &mut context, t0(), true).await;

  // Replay the same tap id with inflated stats; nothing may change.
  let mut inflated = stats.clone();
  inflated.points += 1000;
  let (_, entry) = ledger::apply(&stats, &event);
  let applied = s
    .commit_tap(&context, &event, &inflated, &entry)
    .await
    .unwrap();
  assert!(!applied);

  let persisted = s.user_stats(user.user_id).await.unwrap();
  assert_eq!(persisted, stats);
  assert_eq!(s.tap_events_for_user(user.user_id).await.unwrap().len(), 1);
}

// ─── Event queries ───────────────────────────────────────────────────────────

#[tokio::test]
async fn tap_events_newest_first_with_limit_and_filters() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  commit_attendance(&s, &alice, &mut context, t0(), true).await;
  commit_attendance(&s, &bob, &mut context, t0() + Duration::minutes(5), false)
    .await;

  let recent = s.tap_events(&TapEventQuery::default()).await.unwrap();
  assert_eq!(recent.len(), 2);
  assert_eq!(recent[0].user_id, bob.user_id); // newest first

  let limited = s
    .tap_events(&TapEventQuery { limit: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(limited.len(), 1);
  assert_eq!(limited[0].user_id, bob.user_id);

  let alices = s
    .tap_events(&TapEventQuery {
      user_id: Some(alice.user_id),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(alices.len(), 1);
  assert_eq!(alices[0].user_id, alice.user_id);

  let attendance = s
    .tap_events(&TapEventQuery {
      action: Some(TapAction::Attendance),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(attendance.len(), 2);
}

#[tokio::test]
async fn user_history_is_oldest_first() {
  let s = store().await;
  let user = add_user(&s, "Alice").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  commit_attendance(&s, &user, &mut context, t0(), true).await;
  commit_attendance(&s, &user, &mut context, t0() + Duration::days(1), false)
    .await;

  let history = s.tap_events_for_user(user.user_id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert!(history[0].timestamp < history[1].timestamp);
}

// ─── Leaderboard ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn leaderboard_all_time_ranks_by_points() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;
  add_user(&s, "Carol").await; // never taps, stays off the board
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  // Alice: first arrival (25). Bob: plain attendance (10).
  commit_attendance(&s, &alice, &mut context, t0(), true).await;
  commit_attendance(&s, &bob, &mut context, t0() + Duration::minutes(5), false)
    .await;

  let board = s
    .leaderboard(LeaderboardPeriod::All, 10, t0() + Duration::hours(1))
    .await
    .unwrap();
  assert_eq!(board.len(), 2);
  assert_eq!(board[0].user_id, alice.user_id);
  assert_eq!(board[0].points, 25);
  assert_eq!(board[0].rank, 1);
  assert_eq!(board[1].user_id, bob.user_id);
  assert_eq!(board[1].rank, 2);
}

#[tokio::test]
async fn weekly_leaderboard_ignores_old_awards() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  // Alice earned long ago; Bob earned this week.
  commit_attendance(&s, &alice, &mut context, t0() - Duration::days(30), true)
    .await;
  commit_attendance(&s, &bob, &mut context, t0(), false).await;

  let board = s
    .leaderboard(LeaderboardPeriod::Week, 10, t0() + Duration::hours(1))
    .await
    .unwrap();
  assert_eq!(board.len(), 1);
  assert_eq!(board[0].user_id, bob.user_id);
  assert_eq!(board[0].points, 10);
}

#[tokio::test]
async fn standing_reports_rank_among_all_users() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  commit_attendance(&s, &alice, &mut context, t0(), true).await;
  commit_attendance(&s, &bob, &mut context, t0() + Duration::minutes(5), false)
    .await;

  let standing = s
    .standing(bob.user_id, LeaderboardPeriod::All, t0())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(standing.entry.rank, 2);
  assert_eq!(standing.entry.points, 10);
  assert_eq!(standing.total_users, 2);

  assert!(
    s.standing(Uuid::new_v4(), LeaderboardPeriod::All, t0())
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Dashboard stats ─────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_counts_todays_activity() {
  let s = store().await;
  let alice = add_user(&s, "Alice").await;
  let bob = add_user(&s, "Bob").await;
  add_reader(&s, "reader-1").await;
  let mut context = add_lecture(&s, "reader-1").await;

  commit_attendance(&s, &alice, &mut context, t0(), true).await;
  commit_attendance(&s, &bob, &mut context, t0() + Duration::minutes(5), false)
    .await;
  // Yesterday's tap must not count towards today.
  commit_attendance(&s, &alice, &mut context, t0() - Duration::days(1), false)
    .await;

  let snapshot = s.stats_snapshot(t0() + Duration::hours(1)).await.unwrap();
  assert_eq!(snapshot.taps_today, 2);
  assert_eq!(snapshot.active_students, 2);
  // Two of thirty expected seats are filled in today's lecture.
  assert_eq!(snapshot.attendance_rate, 7);
  assert_eq!(snapshot.active_queues, 0);
  assert_eq!(snapshot.events_this_week, 0);
}
