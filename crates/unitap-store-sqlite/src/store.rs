//! [`SqliteStore`] — the SQLite implementation of [`TapStore`].

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use unitap_core::{
  context::{Context, ContextBody, ContextKind},
  device::Device,
  ledger::LedgerEntry,
  store::{
    LeaderboardEntry, LeaderboardPeriod, NewContext, NewUser, Standing,
    StatsSnapshot, TapStore,
  },
  tap::{TapEvent, TapEventQuery},
  user::{User, UserStats},
};

use crate::{
  Error, Result,
  encode::{
    RawContext, RawDevice, RawStats, RawTapEvent, RawUser, decode_badges,
    decode_uuid, encode_badges, encode_bonuses, encode_date, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A UniTap store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// access funnels through one connection thread, and the tap commit runs
/// as one SQL transaction, so a partially applied tap is never visible.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

const USER_COLUMNS: &str =
  "user_id, name, email, university, role, card_uid, created_at";

const TAP_COLUMNS: &str = "tap_id, user_id, user_name, device_id, action, \
   context_id, context_label, timestamp, is_first_arrival";

fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:    row.get(0)?,
    name:       row.get(1)?,
    email:      row.get(2)?,
    university: row.get(3)?,
    role:       row.get(4)?,
    card_uid:   row.get(5)?,
    created_at: row.get(6)?,
  })
}

fn tap_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawTapEvent> {
  Ok(RawTapEvent {
    tap_id:           row.get(0)?,
    user_id:          row.get(1)?,
    user_name:        row.get(2)?,
    device_id:        row.get(3)?,
    action:           row.get(4)?,
    context_id:       row.get(5)?,
    context_label:    row.get(6)?,
    timestamp:        row.get(7)?,
    is_first_arrival: row.get(8)?,
  })
}

fn context_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawContext> {
  Ok(RawContext {
    context_id: row.get(0)?,
    device_id:  row.get(1)?,
    kind:       row.get(2)?,
    body_json:  row.get(3)?,
  })
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Stats upsert values, shared by `commit_tap`.
  fn stats_params(
    user_id: Uuid,
    stats:   &UserStats,
  ) -> Result<(String, i64, u32, u32, u32, u32, Option<String>, String, String)>
  {
    Ok((
      encode_uuid(user_id),
      stats.points,
      stats.current_streak,
      stats.best_streak,
      stats.first_arrivals,
      stats.event_checkins,
      stats.last_qualifying_date.map(encode_date),
      encode_bonuses(&stats.streak_bonuses_awarded)?,
      encode_badges(&stats.badges)?,
    ))
  }
}

// ─── TapStore impl ───────────────────────────────────────────────────────────

impl TapStore for SqliteStore {
  type Error = Error;

  // ── Users & cards ─────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      university: input.university,
      role:       input.role,
      card_uid:   None,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.name.clone();
    let email    = user.email.clone();
    let uni      = user.university.clone();
    let role_str = user.role.to_string();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, name, email, university, role, card_uid, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)",
          rusqlite::params![id_str, name, email, uni, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
              rusqlite::params![id_str],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn resolve_card(&self, card_uid: &str) -> Result<Option<User>> {
    let uid = card_uid.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE card_uid = ?1"),
              rusqlite::params![uid],
              user_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn link_card(&self, user_id: Uuid, card_uid: &str) -> Result<User> {
    let id_str = encode_uuid(user_id);
    let uid    = card_uid.to_owned();

    // Revoke-then-link in one transaction: a UID maps to at most one user
    // at any instant, even mid-relink.
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE users SET card_uid = NULL WHERE card_uid = ?1",
          rusqlite::params![uid],
        )?;
        let changed = tx.execute(
          "UPDATE users SET card_uid = ?1 WHERE user_id = ?2",
          rusqlite::params![uid, id_str],
        )?;
        if changed == 0 {
          // No such user; roll back the revoke too.
          return Ok(None);
        }
        let raw = tx.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
          rusqlite::params![id_str],
          user_from_row,
        )?;
        tx.commit()?;
        Ok(Some(raw))
      })
      .await?;

    match raw {
      Some(raw) => raw.into_user(),
      None => Err(Error::UserNotFound(user_id)),
    }
  }

  async fn user_stats(&self, user_id: Uuid) -> Result<UserStats> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawStats> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT points, current_streak, best_streak, first_arrivals,
                      event_checkins, last_qualifying_date, bonuses_json, badges_json
               FROM user_stats WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawStats {
                  points:               row.get(0)?,
                  current_streak:       row.get(1)?,
                  best_streak:          row.get(2)?,
                  first_arrivals:       row.get(3)?,
                  event_checkins:       row.get(4)?,
                  last_qualifying_date: row.get(5)?,
                  bonuses_json:         row.get(6)?,
                  badges_json:          row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_stats(),
      None => Ok(UserStats::default()),
    }
  }

  // ── Devices ───────────────────────────────────────────────────────────

  async fn add_device(&self, device: Device) -> Result<()> {
    let last_seen = device.last_seen.map(encode_dt);
    let mode_str  = device.mode.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO devices (device_id, name, location, mode, last_seen)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            device.device_id,
            device.name,
            device.location,
            mode_str,
            last_seen,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_device(&self, device_id: &str) -> Result<Option<Device>> {
    let id = device_id.to_owned();

    let raw: Option<RawDevice> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT device_id, name, location, mode, last_seen
               FROM devices WHERE device_id = ?1",
              rusqlite::params![id],
              |row| {
                Ok(RawDevice {
                  device_id: row.get(0)?,
                  name:      row.get(1)?,
                  location:  row.get(2)?,
                  mode:      row.get(3)?,
                  last_seen: row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDevice::into_device).transpose()
  }

  async fn touch_device(
    &self,
    device_id: &str,
    now:       DateTime<Utc>,
  ) -> Result<()> {
    let id     = device_id.to_owned();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE devices SET last_seen = ?1 WHERE device_id = ?2",
          rusqlite::params![at_str, id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Contexts ──────────────────────────────────────────────────────────

  async fn add_context(&self, input: NewContext) -> Result<Context> {
    let context = Context {
      context_id: Uuid::new_v4(),
      device_id:  input.device_id,
      body:       input.body,
    };

    let id_str    = encode_uuid(context.context_id);
    let device_id = context.device_id.clone();
    let kind_str  = context.body.kind().to_string();
    let body_str  = context.body.to_json().map_err(Error::Core)?.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO contexts (context_id, device_id, kind, body_json)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, device_id, kind_str, body_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(context)
  }

  async fn get_context(&self, id: Uuid) -> Result<Option<Context>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawContext> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT context_id, device_id, kind, body_json
               FROM contexts WHERE context_id = ?1",
              rusqlite::params![id_str],
              context_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContext::into_context).transpose()
  }

  async fn contexts_for_device(&self, device_id: &str) -> Result<Vec<Context>> {
    let id = device_id.to_owned();

    let raws: Vec<RawContext> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT context_id, device_id, kind, body_json
           FROM contexts WHERE device_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id], context_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContext::into_context).collect()
  }

  async fn list_contexts(&self, kind: Option<ContextKind>) -> Result<Vec<Context>> {
    let kind_str = kind.map(|k| k.to_string());

    let raws: Vec<RawContext> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(k) = kind_str {
          let mut stmt = conn.prepare(
            "SELECT context_id, device_id, kind, body_json
             FROM contexts WHERE kind = ?1",
          )?;
          stmt
            .query_map(rusqlite::params![k], context_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT context_id, device_id, kind, body_json FROM contexts",
          )?;
          stmt
            .query_map([], context_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContext::into_context).collect()
  }

  async fn put_context(&self, context: &Context) -> Result<()> {
    let id_str   = encode_uuid(context.context_id);
    let kind_str = context.body.kind().to_string();
    let body_str = context.body.to_json().map_err(Error::Core)?.to_string();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE contexts SET kind = ?1, body_json = ?2 WHERE context_id = ?3",
          rusqlite::params![kind_str, body_str, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::ContextNotFound(context.context_id));
    }
    Ok(())
  }

  // ── Tap commit ────────────────────────────────────────────────────────

  async fn commit_tap(
    &self,
    context: &Context,
    event:   &TapEvent,
    stats:   &UserStats,
    entry:   &LedgerEntry,
  ) -> Result<bool> {
    let ctx_id_str = encode_uuid(context.context_id);
    let kind_str   = context.body.kind().to_string();
    let body_str   = context.body.to_json().map_err(Error::Core)?.to_string();

    let tap_id_str  = encode_uuid(event.tap_id);
    let user_id_str = encode_uuid(event.user_id);
    let user_name   = event.user_name.clone();
    let device_id   = event.device_id.clone();
    let action_str  = event.action.to_string();
    let label       = event.context_label.clone();
    let ts_str      = encode_dt(event.timestamp);
    let first       = event.is_first_arrival;

    let points_awarded = entry.points_awarded;
    let streak_after   = entry.streak_after;
    let recorded_str   = encode_dt(entry.recorded_at);

    let sp = Self::stats_params(event.user_id, stats)?;

    let applied: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Idempotency gate: the tap id is the dedup key. A retry that
        // raced a successful commit writes nothing.
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM tap_events WHERE tap_id = ?1",
            rusqlite::params![tap_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if exists {
          return Ok(false);
        }

        tx.execute(
          "UPDATE contexts SET kind = ?1, body_json = ?2 WHERE context_id = ?3",
          rusqlite::params![kind_str, body_str, ctx_id_str],
        )?;

        tx.execute(
          &format!(
            "INSERT INTO tap_events ({TAP_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
          ),
          rusqlite::params![
            tap_id_str,
            user_id_str,
            user_name,
            device_id,
            action_str,
            ctx_id_str,
            label,
            ts_str,
            first,
          ],
        )?;

        tx.execute(
          "INSERT INTO ledger_entries (tap_id, user_id, points_awarded, streak_after, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            tap_id_str,
            user_id_str,
            points_awarded,
            streak_after,
            recorded_str,
          ],
        )?;

        let (uid, points, cur, best, firsts, checkins, last_date, bonuses, badges) = sp;
        tx.execute(
          "INSERT OR REPLACE INTO user_stats
             (user_id, points, current_streak, best_streak, first_arrivals,
              event_checkins, last_qualifying_date, bonuses_json, badges_json)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            uid, points, cur, best, firsts, checkins, last_date, bonuses, badges,
          ],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(applied)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  async fn tap_events(&self, query: &TapEventQuery) -> Result<Vec<TapEvent>> {
    let user_str   = query.user_id.map(encode_uuid);
    let action_str = query.action.map(|a| a.to_string());
    let limit_val  = query.limit.unwrap_or(50) as i64;

    let raws: Vec<RawTapEvent> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; parameter slots stay fixed.
        let mut conds: Vec<&'static str> = vec![];
        if user_str.is_some() {
          conds.push("user_id = ?1");
        }
        if action_str.is_some() {
          conds.push("action = ?2");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {TAP_COLUMNS} FROM tap_events
           {where_clause}
           ORDER BY timestamp DESC, tap_id DESC
           LIMIT ?3"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str.as_deref(), action_str.as_deref(), limit_val],
            tap_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTapEvent::into_event).collect()
  }

  async fn tap_events_for_user(&self, user_id: Uuid) -> Result<Vec<TapEvent>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawTapEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TAP_COLUMNS} FROM tap_events
           WHERE user_id = ?1
           ORDER BY timestamp ASC, tap_id ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], tap_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTapEvent::into_event).collect()
  }

  async fn leaderboard(
    &self,
    period: LeaderboardPeriod,
    limit:  usize,
    now:    DateTime<Utc>,
  ) -> Result<Vec<LeaderboardEntry>> {
    let limit_val = limit as i64;

    let rows: Vec<(String, String, String, i64, u32, u32, u32, String)> =
      match period {
        LeaderboardPeriod::All => {
          self
            .conn
            .call(move |conn| {
              let mut stmt = conn.prepare(
                "SELECT u.user_id, u.name, u.university,
                        COALESCE(s.points, 0),
                        COALESCE(s.current_streak, 0),
                        COALESCE(s.best_streak, 0),
                        COALESCE(s.first_arrivals, 0),
                        COALESCE(s.badges_json, '[]')
                 FROM users u
                 LEFT JOIN user_stats s ON s.user_id = u.user_id
                 WHERE COALESCE(s.points, 0) > 0
                 ORDER BY COALESCE(s.points, 0) DESC, u.name ASC
                 LIMIT ?1",
              )?;
              let rows = stmt
                .query_map(rusqlite::params![limit_val], board_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
              Ok(rows)
            })
            .await?
        }
        LeaderboardPeriod::Week => {
          let since = encode_dt(now - Duration::days(7));
          self
            .conn
            .call(move |conn| {
              let mut stmt = conn.prepare(
                "SELECT u.user_id, u.name, u.university,
                        w.pts,
                        COALESCE(s.current_streak, 0),
                        COALESCE(s.best_streak, 0),
                        COALESCE(s.first_arrivals, 0),
                        COALESCE(s.badges_json, '[]')
                 FROM (SELECT user_id, SUM(points_awarded) AS pts
                       FROM ledger_entries
                       WHERE recorded_at >= ?1
                       GROUP BY user_id) w
                 JOIN users u ON u.user_id = w.user_id
                 LEFT JOIN user_stats s ON s.user_id = u.user_id
                 WHERE w.pts > 0
                 ORDER BY w.pts DESC, u.name ASC
                 LIMIT ?2",
              )?;
              let rows = stmt
                .query_map(rusqlite::params![since, limit_val], board_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
              Ok(rows)
            })
            .await?
        }
      };

    rows
      .into_iter()
      .enumerate()
      .map(|(i, row)| board_entry(row, i + 1))
      .collect()
  }

  async fn standing(
    &self,
    user_id: Uuid,
    period:  LeaderboardPeriod,
    now:     DateTime<Utc>,
  ) -> Result<Option<Standing>> {
    let Some(user) = self.get_user(user_id).await? else {
      return Ok(None);
    };
    let stats = self.user_stats(user_id).await?;

    let id_str = encode_uuid(user_id);
    let (points, ahead, total): (i64, i64, i64) = match period {
      LeaderboardPeriod::All => {
        self
          .conn
          .call(move |conn| {
            let points: i64 = conn
              .query_row(
                "SELECT points FROM user_stats WHERE user_id = ?1",
                rusqlite::params![id_str],
                |r| r.get(0),
              )
              .optional()?
              .unwrap_or(0);
            let ahead: i64 = conn.query_row(
              "SELECT COUNT(*) FROM user_stats WHERE points > ?1",
              rusqlite::params![points],
              |r| r.get(0),
            )?;
            let total: i64 =
              conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok((points, ahead, total))
          })
          .await?
      }
      LeaderboardPeriod::Week => {
        let since = encode_dt(now - Duration::days(7));
        self
          .conn
          .call(move |conn| {
            let points: i64 = conn.query_row(
              "SELECT COALESCE(SUM(points_awarded), 0) FROM ledger_entries
               WHERE user_id = ?1 AND recorded_at >= ?2",
              rusqlite::params![id_str, since],
              |r| r.get(0),
            )?;
            let ahead: i64 = conn.query_row(
              "SELECT COUNT(*) FROM
                 (SELECT SUM(points_awarded) AS pts FROM ledger_entries
                  WHERE recorded_at >= ?1 GROUP BY user_id)
               WHERE pts > ?2",
              rusqlite::params![since, points],
              |r| r.get(0),
            )?;
            let total: i64 =
              conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            Ok((points, ahead, total))
          })
          .await?
      }
    };

    Ok(Some(Standing {
      entry: LeaderboardEntry {
        user_id,
        name:           user.name,
        university:     user.university,
        points,
        current_streak: stats.current_streak,
        best_streak:    stats.best_streak,
        first_arrivals: stats.first_arrivals,
        badges:         stats.badges.into_iter().collect(),
        rank:           (ahead + 1) as usize,
      },
      total_users: total as usize,
    }))
  }

  async fn stats_snapshot(&self, now: DateTime<Utc>) -> Result<StatsSnapshot> {
    let today = now
      .date_naive()
      .and_hms_opt(0, 0, 0)
      .map(|dt| dt.and_utc())
      .unwrap_or(now);
    let tomorrow  = today + Duration::days(1);
    let next_week = today + Duration::days(7);

    let today_str    = encode_dt(today);
    let tomorrow_str = encode_dt(tomorrow);

    let (taps_today, active_students): (i64, i64) = self
      .conn
      .call(move |conn| {
        let taps: i64 = conn.query_row(
          "SELECT COUNT(*) FROM tap_events WHERE timestamp >= ?1 AND timestamp < ?2",
          rusqlite::params![today_str, tomorrow_str],
          |r| r.get(0),
        )?;
        let students: i64 = conn.query_row(
          "SELECT COUNT(DISTINCT user_id) FROM tap_events
           WHERE timestamp >= ?1 AND timestamp < ?2",
          rusqlite::params![today_str, tomorrow_str],
          |r| r.get(0),
        )?;
        Ok((taps, students))
      })
      .await?;

    // Context-derived counters: small row counts, folded in Rust rather
    // than stretching SQL over JSON columns.
    let contexts = self.list_contexts(None).await?;

    let mut todays_lectures: Vec<(u64, u64)> = vec![]; // (checked, expected)
    let mut all_lectures:    Vec<(u64, u64)> = vec![];
    let mut active_queues   = 0u64;
    let mut queue_students  = 0u64;
    let mut events_this_week = 0u64;

    for context in &contexts {
      match &context.body {
        ContextBody::Lecture(l) => {
          let pair = (l.checked_in.len() as u64, u64::from(l.expected_count));
          if l.window.start >= today && l.window.start < tomorrow {
            todays_lectures.push(pair);
          }
          all_lectures.push(pair);
        }
        ContextBody::Equipment(e) => {
          if !e.queue.is_empty() {
            active_queues += 1;
            queue_students += e.queue.len() as u64;
          }
        }
        ContextBody::Event(e) => {
          if e.window.start >= today && e.window.start < next_week {
            events_this_week += 1;
          }
        }
      }
    }

    // Attendance rate scoped to today's lectures; all-time when none.
    let source = if todays_lectures.is_empty() {
      &all_lectures
    } else {
      &todays_lectures
    };
    let checked:  u64 = source.iter().map(|(c, _)| c).sum();
    let expected: u64 = source.iter().map(|(_, e)| e).sum();
    let attendance_rate = if expected > 0 {
      ((checked as f64 / expected as f64) * 100.0).round() as u32
    } else {
      0
    };

    Ok(StatsSnapshot {
      taps_today: taps_today as u64,
      attendance_rate,
      active_queues,
      queue_students,
      events_this_week,
      active_students: active_students as u64,
    })
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

type BoardRow = (String, String, String, i64, u32, u32, u32, String);

fn board_row(row: &rusqlite::Row) -> rusqlite::Result<BoardRow> {
  Ok((
    row.get(0)?,
    row.get(1)?,
    row.get(2)?,
    row.get(3)?,
    row.get(4)?,
    row.get(5)?,
    row.get(6)?,
    row.get(7)?,
  ))
}

fn board_entry(row: BoardRow, rank: usize) -> Result<LeaderboardEntry> {
  let (user_id, name, university, points, current, best, firsts, badges) = row;
  Ok(LeaderboardEntry {
    user_id:        decode_uuid(&user_id)?,
    name,
    university,
    points,
    current_streak: current,
    best_streak:    best,
    first_arrivals: firsts,
    badges:         decode_badges(&badges)?.into_iter().collect(),
    rank,
  })
}
