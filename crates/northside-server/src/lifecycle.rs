//! Event lifecycle: creation, activation, membership and teardown.
//!
//! Every mutating operation runs in one transaction. `users.in_event` is only
//! written next to the `event_members` row it mirrors, and the unique index on
//! `event_members.user_id` is what finally decides "one event per user".

use chrono::Utc;
use northside_db::entities::{event, event_member, user, voted_song};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::history_log::{EventHistory, HistoryLog};
use crate::voting::{self, LeaderboardEntry};

pub const MAX_DESCRIPTION_LEN: usize = 140;

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub code: i32,
    pub location: String,
    pub description: Option<String>,
    pub dj_username: Option<String>,
}

/// The event a user currently sits in, with their role there.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentMembership {
    pub event: event::Model,
    pub is_admin: bool,
    pub is_dj: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    pub event: event::Model,
    pub admin: Option<String>,
    pub dj: Option<String>,
    /// Usernames of everyone but the admin, in join order.
    pub members: Vec<String>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

fn non_blank(value: &str, field: &'static str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::EmptyInput(field));
    }
    Ok(trimmed.to_string())
}

pub async fn create_event(
    db: &DatabaseConnection,
    owner: Uuid,
    new: NewEvent,
) -> Result<event::Model, AppError> {
    let name = non_blank(&new.name, "event name")?;
    let location = non_blank(&new.location, "location")?;
    if new.code <= 0 {
        return Err(AppError::EmptyInput("event code"));
    }
    let description = new
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(AppError::Validation(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }

    let txn = db.begin().await?;

    let dj_id = match new
        .dj_username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(dj_name) => {
            let dj = user::Entity::find()
                .filter(user::Column::Username.eq(dj_name))
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::InvalidDj(format!("no user named {dj_name}")))?;
            if dj.id == owner {
                return Err(AppError::InvalidDj(
                    "the event owner cannot also be its DJ".to_string(),
                ));
            }
            Some(dj.id)
        }
        None => None,
    };

    if event::Entity::find()
        .filter(event::Column::Name.eq(&name))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateName);
    }
    if event::Entity::find()
        .filter(event::Column::Code.eq(new.code))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(AppError::DuplicateCode);
    }

    let now = Utc::now().fixed_offset();
    let row = event::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.clone()),
        code: Set(new.code),
        is_active: Set(false),
        location: Set(location),
        description: Set(description),
        owner_id: Set(owner),
        dj_id: Set(dj_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let model = insert_event(db, txn, row, &name).await?;
    tracing::info!(event_id = %model.id, owner = %owner, "event created");
    Ok(model)
}

/// Insert and commit. A unique violation means a concurrent create won the
/// name or code after our checks; it is reported as the matching duplicate.
async fn insert_event(
    db: &DatabaseConnection,
    txn: DatabaseTransaction,
    row: event::ActiveModel,
    name: &str,
) -> Result<event::Model, AppError> {
    match row.insert(&txn).await {
        Ok(model) => {
            txn.commit().await?;
            Ok(model)
        }
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            txn.rollback().await?;
            let name_taken = event::Entity::find()
                .filter(event::Column::Name.eq(name))
                .one(db)
                .await?
                .is_some();
            Err(if name_taken {
                AppError::DuplicateName
            } else {
                AppError::DuplicateCode
            })
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn activate_event(
    db: &DatabaseConnection,
    event_id: Uuid,
    requester: Uuid,
) -> Result<event::Model, AppError> {
    let txn = db.begin().await?;

    let ev = find_event(&txn, event_id).await?;
    if ev.owner_id != requester {
        return Err(AppError::NotEventOwner);
    }
    if ev.is_active {
        return Err(AppError::EventAlreadyActive);
    }
    if membership_of(&txn, requester).await?.is_some() {
        return Err(AppError::AlreadyInEvent);
    }

    if !set_active(&txn, event_id, true).await? {
        return Err(AppError::EventAlreadyActive);
    }
    if !insert_membership(&txn, event_id, requester, true, false).await? {
        return Err(AppError::AlreadyInEvent);
    }
    set_in_event(&txn, vec![requester], true).await?;

    let ev = find_event(&txn, event_id).await?;
    txn.commit().await?;

    tracing::info!(event_id = %event_id, "event activated");
    Ok(ev)
}

/// Ends an active event. Memberships and votes are purged and a history
/// record is queued once the transaction has committed.
pub async fn deactivate_event(
    db: &DatabaseConnection,
    history: &HistoryLog,
    event_id: Uuid,
    requester: Uuid,
) -> Result<EventHistory, AppError> {
    let txn = db.begin().await?;

    let ev = find_event(&txn, event_id).await?;
    if ev.owner_id != requester {
        return Err(AppError::NotEventOwner);
    }
    if !ev.is_active {
        return Err(AppError::EventNotActive);
    }
    let record = end_event(&txn, &ev).await?;
    txn.commit().await?;

    tracing::info!(event_id = %event_id, members = record.members.len(), "event deactivated");
    history.record(record.clone());
    Ok(record)
}

pub async fn join_event(
    db: &DatabaseConnection,
    user_id: Uuid,
    code: i32,
) -> Result<CurrentMembership, AppError> {
    let txn = db.begin().await?;

    if membership_of(&txn, user_id).await?.is_some() {
        return Err(AppError::AlreadyInEvent);
    }

    let ev = event::Entity::find()
        .filter(event::Column::Code.eq(code))
        .filter(event::Column::IsActive.eq(true))
        .one(&txn)
        .await?
        .ok_or(AppError::EventNotFound)?;

    // Touching the row serialises with a concurrent deactivation.
    let touched = event::Entity::update_many()
        .col_expr(event::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(event::Column::Id.eq(ev.id))
        .filter(event::Column::IsActive.eq(true))
        .exec(&txn)
        .await?;
    if touched.rows_affected == 0 {
        return Err(AppError::EventNotFound);
    }

    let is_dj = ev.dj_id == Some(user_id);
    if !insert_membership(&txn, ev.id, user_id, false, is_dj).await? {
        return Err(AppError::AlreadyInEvent);
    }
    set_in_event(&txn, vec![user_id], true).await?;
    txn.commit().await?;

    tracing::info!(event_id = %ev.id, user_id = %user_id, is_dj, "user joined event");
    Ok(CurrentMembership {
        event: ev,
        is_admin: false,
        is_dj,
    })
}

/// Leave the current event. When the admin leaves, the whole event ends and
/// the returned history is `Some`.
pub async fn leave_event(
    db: &DatabaseConnection,
    history: &HistoryLog,
    user_id: Uuid,
) -> Result<Option<EventHistory>, AppError> {
    let txn = db.begin().await?;

    let membership = membership_of(&txn, user_id)
        .await?
        .ok_or(AppError::NotInEvent)?;

    if membership.is_admin {
        let ev = find_event(&txn, membership.event_id).await?;
        let record = end_event(&txn, &ev).await?;
        txn.commit().await?;

        tracing::info!(event_id = %ev.id, "admin left, event ended");
        history.record(record.clone());
        return Ok(Some(record));
    }

    let removed = event_member::Entity::delete_many()
        .filter(event_member::Column::Id.eq(membership.id))
        .exec(&txn)
        .await?;
    if removed.rows_affected == 0 {
        return Err(AppError::NotInEvent);
    }
    set_in_event(&txn, vec![user_id], false).await?;
    txn.commit().await?;

    tracing::info!(event_id = %membership.event_id, user_id = %user_id, "user left event");
    Ok(None)
}

/// Delete an event in any state. No history is written.
pub async fn delete_event(
    db: &DatabaseConnection,
    event_id: Uuid,
    requester: Uuid,
) -> Result<(), AppError> {
    let txn = db.begin().await?;

    let ev = find_event(&txn, event_id).await?;
    if ev.owner_id != requester {
        return Err(AppError::NotEventOwner);
    }
    purge_event(&txn, event_id).await?;
    event::Entity::delete_by_id(event_id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(event_id = %event_id, "event deleted");
    Ok(())
}

pub async fn owned_events(
    db: &DatabaseConnection,
    owner: Uuid,
) -> Result<Vec<event::Model>, AppError> {
    Ok(event::Entity::find()
        .filter(event::Column::OwnerId.eq(owner))
        .order_by_desc(event::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn current_membership<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<CurrentMembership>, AppError> {
    let row = event_member::Entity::find()
        .filter(event_member::Column::UserId.eq(user_id))
        .find_also_related(event::Entity)
        .one(conn)
        .await?;

    Ok(row.and_then(|(m, ev)| {
        ev.map(|event| CurrentMembership {
            event,
            is_admin: m.is_admin,
            is_dj: m.is_dj,
        })
    }))
}

pub async fn event_detail(
    db: &DatabaseConnection,
    event_id: Uuid,
    viewer: Uuid,
) -> Result<EventDetail, AppError> {
    let txn = db.begin().await?;

    let ev = find_event(&txn, event_id).await?;
    match membership_of(&txn, viewer).await? {
        Some(m) if m.event_id == event_id => {}
        _ => return Err(AppError::NotInEvent),
    }

    let rows = event_member::Entity::find()
        .filter(event_member::Column::EventId.eq(event_id))
        .order_by_asc(event_member::Column::JoinedAt)
        .find_also_related(user::Entity)
        .all(&txn)
        .await?;

    let mut admin = None;
    let mut members = Vec::new();
    for (m, u) in rows {
        let Some(u) = u else { continue };
        if m.is_admin {
            admin = Some(u.username);
        } else {
            members.push(u.username);
        }
    }

    let dj = match ev.dj_id {
        Some(dj_id) => user::Entity::find_by_id(dj_id)
            .one(&txn)
            .await?
            .map(|u| u.username),
        None => None,
    };

    let leaderboard = voting::leaderboard(&txn, event_id).await?;
    txn.commit().await?;

    Ok(EventDetail {
        event: ev,
        admin,
        dj,
        members,
        leaderboard,
    })
}

/// Vote tally of an event, visible only to its members.
pub async fn event_leaderboard(
    db: &DatabaseConnection,
    event_id: Uuid,
    viewer: Uuid,
) -> Result<Vec<LeaderboardEntry>, AppError> {
    find_event(db, event_id).await?;
    match membership_of(db, viewer).await? {
        Some(m) if m.event_id == event_id => {}
        _ => return Err(AppError::NotInEvent),
    }
    Ok(voting::leaderboard(db, event_id).await?)
}

// ── Shared steps ────────────────────────────────────────────────

async fn find_event<C: ConnectionTrait>(conn: &C, event_id: Uuid) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(event_id)
        .one(conn)
        .await?
        .ok_or(AppError::EventNotFound)
}

pub(crate) async fn membership_of<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> Result<Option<event_member::Model>, DbErr> {
    event_member::Entity::find()
        .filter(event_member::Column::UserId.eq(user_id))
        .one(conn)
        .await
}

/// Flip `is_active` only if it currently holds the opposite value.
async fn set_active<C: ConnectionTrait>(conn: &C, event_id: Uuid, active: bool) -> Result<bool, DbErr> {
    let res = event::Entity::update_many()
        .col_expr(event::Column::IsActive, Expr::value(active))
        .col_expr(event::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
        .filter(event::Column::Id.eq(event_id))
        .filter(event::Column::IsActive.eq(!active))
        .exec(conn)
        .await?;
    Ok(res.rows_affected == 1)
}

/// Returns `false` when the user already holds a membership somewhere.
async fn insert_membership<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
    user_id: Uuid,
    is_admin: bool,
    is_dj: bool,
) -> Result<bool, DbErr> {
    let row = event_member::ActiveModel {
        id: Set(Uuid::new_v4()),
        event_id: Set(event_id),
        user_id: Set(user_id),
        is_admin: Set(is_admin),
        is_dj: Set(is_dj),
        joined_at: Set(Utc::now().fixed_offset()),
    };
    let inserted = event_member::Entity::insert(row)
        .on_conflict(
            OnConflict::column(event_member::Column::UserId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(inserted == 1)
}

async fn set_in_event<C: ConnectionTrait>(conn: &C, users: Vec<Uuid>, value: bool) -> Result<(), DbErr> {
    if users.is_empty() {
        return Ok(());
    }
    user::Entity::update_many()
        .col_expr(user::Column::InEvent, Expr::value(value))
        .filter(user::Column::Id.is_in(users))
        .exec(conn)
        .await?;
    Ok(())
}

struct Purged {
    members: Vec<String>,
    songs: Vec<(String, String)>,
}

/// Remove every membership and vote of an event, clearing `in_event` for
/// the former members.
async fn purge_event<C: ConnectionTrait>(conn: &C, event_id: Uuid) -> Result<Purged, DbErr> {
    let rows = event_member::Entity::find()
        .filter(event_member::Column::EventId.eq(event_id))
        .order_by_asc(event_member::Column::JoinedAt)
        .find_also_related(user::Entity)
        .all(conn)
        .await?;

    let user_ids: Vec<Uuid> = rows.iter().map(|(m, _)| m.user_id).collect();
    let members = rows
        .into_iter()
        .filter_map(|(_, u)| u.map(|u| u.username))
        .collect();

    let songs = voted_song::Entity::find()
        .filter(voted_song::Column::EventId.eq(event_id))
        .order_by_asc(voted_song::Column::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(|v| (v.song_name, v.artist_name))
        .collect();

    set_in_event(conn, user_ids, false).await?;
    event_member::Entity::delete_many()
        .filter(event_member::Column::EventId.eq(event_id))
        .exec(conn)
        .await?;
    voted_song::Entity::delete_many()
        .filter(voted_song::Column::EventId.eq(event_id))
        .exec(conn)
        .await?;

    Ok(Purged { members, songs })
}

async fn end_event<C: ConnectionTrait>(conn: &C, ev: &event::Model) -> Result<EventHistory, AppError> {
    if !set_active(conn, ev.id, false).await? {
        return Err(AppError::EventNotActive);
    }
    let purged = purge_event(conn, ev.id).await?;
    Ok(EventHistory {
        event_name: ev.name.clone(),
        ended_at: Utc::now(),
        members: purged.members,
        songs: purged.songs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{member_count, reload_user, seed_user, test_db};
    use crate::voting::{cast_vote, TrackRef};

    fn party(dj: Option<&str>) -> NewEvent {
        NewEvent {
            name: "Party".into(),
            code: 1234,
            location: "Northside Hall".into(),
            description: Some("Friday night".into()),
            dj_username: dj.map(str::to_string),
        }
    }

    fn track(id: &str) -> TrackRef {
        TrackRef {
            track_id: id.into(),
            song_name: format!("Song {id}"),
            artist_name: "Artist".into(),
        }
    }

    #[tokio::test]
    async fn test_create_event_is_inactive() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let b = seed_user(&db, "bob").await;

        let ev = create_event(&db, a.id, party(Some("bob"))).await.unwrap();
        assert!(!ev.is_active);
        assert_eq!(ev.owner_id, a.id);
        assert_eq!(ev.dj_id, Some(b.id));
        assert_eq!(ev.code, 1234);
    }

    #[tokio::test]
    async fn test_create_event_rejects_blank_and_bad_code() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;

        let mut blank = party(None);
        blank.name = "   ".into();
        assert!(matches!(
            create_event(&db, a.id, blank).await,
            Err(AppError::EmptyInput(_))
        ));

        let mut zero = party(None);
        zero.code = 0;
        assert!(matches!(
            create_event(&db, a.id, zero).await,
            Err(AppError::EmptyInput(_))
        ));

        let mut long = party(None);
        long.description = Some("x".repeat(MAX_DESCRIPTION_LEN + 1));
        assert!(matches!(
            create_event(&db, a.id, long).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_event_duplicates() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        create_event(&db, a.id, party(None)).await.unwrap();

        let mut same_name = party(None);
        same_name.code = 9999;
        assert!(matches!(
            create_event(&db, a.id, same_name).await,
            Err(AppError::DuplicateName)
        ));

        let mut same_code = party(None);
        same_code.name = "Other".into();
        assert!(matches!(
            create_event(&db, a.id, same_code).await,
            Err(AppError::DuplicateCode)
        ));
    }

    #[tokio::test]
    async fn test_create_event_invalid_dj() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;

        assert!(matches!(
            create_event(&db, a.id, party(Some("ghost"))).await,
            Err(AppError::InvalidDj(_))
        ));
        assert!(matches!(
            create_event(&db, a.id, party(Some("alice"))).await,
            Err(AppError::InvalidDj(_))
        ));
    }

    #[tokio::test]
    async fn test_activate_makes_owner_admin() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();

        let ev = activate_event(&db, ev.id, a.id).await.unwrap();
        assert!(ev.is_active);

        let m = current_membership(&db, a.id).await.unwrap().unwrap();
        assert!(m.is_admin);
        assert_eq!(m.event.id, ev.id);
        assert!(reload_user(&db, a.id).await.in_event);
    }

    #[tokio::test]
    async fn test_activate_errors() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();

        assert!(matches!(
            activate_event(&db, Uuid::new_v4(), a.id).await,
            Err(AppError::EventNotFound)
        ));
        assert!(matches!(
            activate_event(&db, ev.id, c.id).await,
            Err(AppError::NotEventOwner)
        ));

        activate_event(&db, ev.id, a.id).await.unwrap();
        assert!(matches!(
            activate_event(&db, ev.id, a.id).await,
            Err(AppError::EventAlreadyActive)
        ));
    }

    #[tokio::test]
    async fn test_activate_while_in_another_event() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let first = create_event(&db, a.id, party(None)).await.unwrap();
        let mut other = party(None);
        other.name = "Afterparty".into();
        other.code = 4321;
        let second = create_event(&db, a.id, other).await.unwrap();

        activate_event(&db, first.id, a.id).await.unwrap();
        assert!(matches!(
            activate_event(&db, second.id, a.id).await,
            Err(AppError::AlreadyInEvent)
        ));

        let second = event::Entity::find_by_id(second.id).one(&db).await.unwrap().unwrap();
        assert!(!second.is_active);
        assert_eq!(member_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_join_requires_active_event() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        create_event(&db, a.id, party(None)).await.unwrap();

        assert!(matches!(
            join_event(&db, c.id, 1234).await,
            Err(AppError::EventNotFound)
        ));
        assert!(matches!(
            join_event(&db, c.id, 5555).await,
            Err(AppError::EventNotFound)
        ));
        assert!(!reload_user(&db, c.id).await.in_event);
    }

    #[tokio::test]
    async fn test_join_marks_dj() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let b = seed_user(&db, "bob").await;
        let ev = create_event(&db, a.id, party(Some("bob"))).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();

        let m = join_event(&db, b.id, 1234).await.unwrap();
        assert!(m.is_dj);
        assert!(!m.is_admin);
    }

    #[tokio::test]
    async fn test_join_twice_is_rejected() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();

        join_event(&db, c.id, 1234).await.unwrap();
        assert!(matches!(
            join_event(&db, c.id, 1234).await,
            Err(AppError::AlreadyInEvent)
        ));
        assert_eq!(member_count(&db).await, 2);
        assert!(reload_user(&db, c.id).await.in_event);
    }

    #[tokio::test]
    async fn test_join_while_member_elsewhere_creates_nothing() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let d = seed_user(&db, "dave").await;
        let c = seed_user(&db, "carol").await;

        let ev1 = create_event(&db, a.id, party(None)).await.unwrap();
        let mut second = party(None);
        second.name = "Warehouse".into();
        second.code = 777;
        let ev2 = create_event(&db, d.id, second).await.unwrap();
        activate_event(&db, ev1.id, a.id).await.unwrap();
        activate_event(&db, ev2.id, d.id).await.unwrap();

        join_event(&db, c.id, 1234).await.unwrap();
        assert!(matches!(
            join_event(&db, c.id, 777).await,
            Err(AppError::AlreadyInEvent)
        ));

        let m = current_membership(&db, c.id).await.unwrap().unwrap();
        assert_eq!(m.event.id, ev1.id);
        assert_eq!(member_count(&db).await, 3);
    }

    #[tokio::test]
    async fn test_leave_as_guest() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();

        let ended = leave_event(&db, &HistoryLog::disabled(), c.id).await.unwrap();
        assert!(ended.is_none());
        assert!(!reload_user(&db, c.id).await.in_event);
        assert!(current_membership(&db, c.id).await.unwrap().is_none());

        let ev = event::Entity::find_by_id(ev.id).one(&db).await.unwrap().unwrap();
        assert!(ev.is_active);

        assert!(matches!(
            leave_event(&db, &HistoryLog::disabled(), c.id).await,
            Err(AppError::NotInEvent)
        ));
    }

    #[tokio::test]
    async fn test_admin_leave_ends_event() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        seed_user(&db, "bob").await;
        let c = seed_user(&db, "carol").await;

        let ev = create_event(&db, a.id, party(Some("bob"))).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, c.id, ev.id, &track("T123")).await.unwrap();

        let record = leave_event(&db, &HistoryLog::disabled(), a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.event_name, "Party");
        assert_eq!(record.members, vec!["alice".to_string(), "carol".to_string()]);
        assert_eq!(record.songs, vec![("Song T123".to_string(), "Artist".to_string())]);

        let ev = event::Entity::find_by_id(ev.id).one(&db).await.unwrap().unwrap();
        assert!(!ev.is_active);
        assert_eq!(member_count(&db).await, 0);
        assert!(!reload_user(&db, a.id).await.in_event);
        assert!(!reload_user(&db, c.id).await.in_event);
        assert!(voting::leaderboard(&db, ev.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deactivate_purges_members_and_votes() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, a.id, ev.id, &track("T1")).await.unwrap();
        cast_vote(&db, c.id, ev.id, &track("T1")).await.unwrap();

        assert!(matches!(
            deactivate_event(&db, &HistoryLog::disabled(), ev.id, c.id).await,
            Err(AppError::NotEventOwner)
        ));

        let record = deactivate_event(&db, &HistoryLog::disabled(), ev.id, a.id)
            .await
            .unwrap();
        assert_eq!(record.songs.len(), 2);
        assert_eq!(member_count(&db).await, 0);
        assert!(!reload_user(&db, c.id).await.in_event);
        assert!(voted_song::Entity::find().all(&db).await.unwrap().is_empty());

        assert!(matches!(
            deactivate_event(&db, &HistoryLog::disabled(), ev.id, a.id).await,
            Err(AppError::EventNotActive)
        ));

        // Reactivating starts from a clean slate.
        activate_event(&db, ev.id, a.id).await.unwrap();
        assert_eq!(member_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_delete_event_in_any_state() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;

        let idle = create_event(&db, a.id, party(None)).await.unwrap();
        delete_event(&db, idle.id, a.id).await.unwrap();
        assert!(event::Entity::find_by_id(idle.id).one(&db).await.unwrap().is_none());

        let live = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, live.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, c.id, live.id, &track("T9")).await.unwrap();

        assert!(matches!(
            delete_event(&db, live.id, c.id).await,
            Err(AppError::NotEventOwner)
        ));
        delete_event(&db, live.id, a.id).await.unwrap();

        assert_eq!(member_count(&db).await, 0);
        assert!(!reload_user(&db, a.id).await.in_event);
        assert!(!reload_user(&db, c.id).await.in_event);
        assert!(voted_song::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(matches!(
            delete_event(&db, live.id, a.id).await,
            Err(AppError::EventNotFound)
        ));
    }

    #[tokio::test]
    async fn test_event_detail_requires_membership() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        seed_user(&db, "bob").await;
        let c = seed_user(&db, "carol").await;
        let outsider = seed_user(&db, "eve").await;

        let ev = create_event(&db, a.id, party(Some("bob"))).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, c.id, ev.id, &track("T123")).await.unwrap();

        assert!(matches!(
            event_detail(&db, ev.id, outsider.id).await,
            Err(AppError::NotInEvent)
        ));

        let detail = event_detail(&db, ev.id, c.id).await.unwrap();
        assert_eq!(detail.admin.as_deref(), Some("alice"));
        assert_eq!(detail.dj.as_deref(), Some("bob"));
        assert_eq!(detail.members, vec!["carol".to_string()]);
        assert_eq!(detail.leaderboard.len(), 1);
        assert_eq!(detail.leaderboard[0].votes, 1);
    }

    #[tokio::test]
    async fn test_owned_events() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        create_event(&db, a.id, party(None)).await.unwrap();

        assert_eq!(owned_events(&db, a.id).await.unwrap().len(), 1);
        assert!(owned_events(&db, c.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_in_event_mirrors_membership() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        let log = HistoryLog::disabled();

        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        leave_event(&db, &log, c.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        deactivate_event(&db, &log, ev.id, a.id).await.unwrap();

        for u in [a.id, c.id] {
            let has_row = current_membership(&db, u).await.unwrap().is_some();
            assert_eq!(reload_user(&db, u).await.in_event, has_row);
        }
    }

    #[tokio::test]
    async fn test_event_leaderboard_requires_membership() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let outsider = seed_user(&db, "eve").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        cast_vote(&db, a.id, ev.id, &track("T1")).await.unwrap();

        assert!(matches!(
            event_leaderboard(&db, ev.id, outsider.id).await,
            Err(AppError::NotInEvent)
        ));
        assert!(matches!(
            event_leaderboard(&db, Uuid::new_v4(), a.id).await,
            Err(AppError::EventNotFound)
        ));
        assert_eq!(event_leaderboard(&db, ev.id, a.id).await.unwrap().len(), 1);
    }

    fn raw_event(owner: Uuid, name: &str, code: i32) -> event::ActiveModel {
        let now = Utc::now().fixed_offset();
        event::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            code: Set(code),
            is_active: Set(false),
            location: Set("Hall".into()),
            description: Set(None),
            owner_id: Set(owner),
            dj_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn test_insert_event_maps_unique_violations() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        create_event(&db, a.id, party(None)).await.unwrap();

        let txn = db.begin().await.unwrap();
        assert!(matches!(
            insert_event(&db, txn, raw_event(a.id, "Party", 5678), "Party").await,
            Err(AppError::DuplicateName)
        ));

        let txn = db.begin().await.unwrap();
        assert!(matches!(
            insert_event(&db, txn, raw_event(a.id, "Other", 1234), "Other").await,
            Err(AppError::DuplicateCode)
        ));

        assert_eq!(owned_events(&db, a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_membership_keeps_existing_row() {
        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();

        let txn = db.begin().await.unwrap();
        assert!(!insert_membership(&txn, ev.id, a.id, false, false).await.unwrap());
        txn.commit().await.unwrap();

        assert_eq!(member_count(&db).await, 1);
        assert!(current_membership(&db, a.id).await.unwrap().unwrap().is_admin);
    }

    #[tokio::test]
    async fn test_deactivate_survives_history_write_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let log = HistoryLog::new(blocker.join("history"));

        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, c.id, ev.id, &track("T1")).await.unwrap();

        deactivate_event(&db, &log, ev.id, a.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(member_count(&db).await, 0);
        assert!(!reload_user(&db, c.id).await.in_event);
        assert!(voted_song::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(!blocker.join("history").exists());
    }

    #[tokio::test]
    async fn test_admin_leave_writes_history_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let log = HistoryLog::new(tmp.path().join("history"));

        let db = test_db().await;
        let a = seed_user(&db, "alice").await;
        let c = seed_user(&db, "carol").await;
        let ev = create_event(&db, a.id, party(None)).await.unwrap();
        activate_event(&db, ev.id, a.id).await.unwrap();
        join_event(&db, c.id, 1234).await.unwrap();
        cast_vote(&db, c.id, ev.id, &track("T7")).await.unwrap();

        leave_event(&db, &log, a.id).await.unwrap().unwrap();

        let path = log.file_for("Party").unwrap();
        let mut content = String::new();
        for _ in 0..100 {
            content = std::fs::read_to_string(&path).unwrap_or_default();
            if content.contains("All Songs") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(content.starts_with("Event History for Party\n\nDate: "));
        assert!(content.contains("All Users\n---\nalice\ncarol\n"));
        assert!(content.contains("All Songs\n---\nSong T7 by Artist\n"));
    }
}
