//! Notifications sent by administrators to patients.

use chrono::{NaiveDate, NaiveTime};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, nullable, require_affected, require_found, Gateway,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::{notifications, patients, system_admins};

/// A row in `notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = notifications, check_for_backend(Pg))]
pub struct Notification {
    /// Primary key.
    #[diesel(column_name = notification_id)]
    pub id: i32,
    /// Body text.
    pub message: String,
    /// Day sent.
    pub sent_date: NaiveDate,
    /// Time sent.
    pub sent_time: NaiveTime,
    /// Sender.
    pub admin_id: Option<i32>,
    /// Recipient; `None` for broadcasts.
    pub patient_id: Option<i32>,
}

/// A notification with sender and recipient names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationView {
    /// The stored row.
    #[serde(flatten)]
    pub notification: Notification,
    /// `system_admins.name` of the sender.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_name: Option<String>,
    /// `patients.name` of the recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
}

type NotificationRow = (Notification, Option<String>, Option<String>);

impl From<NotificationRow> for NotificationView {
    fn from((notification, admin_name, patient_name): NotificationRow) -> Self {
        Self {
            notification,
            admin_name,
            patient_name,
        }
    }
}

/// Create payload for [`Notification`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    /// Body text.
    pub message: String,
    /// Day sent.
    pub sent_date: NaiveDate,
    /// Time sent.
    pub sent_time: NaiveTime,
    /// Sender.
    #[serde(default)]
    pub admin_id: Option<i32>,
    /// Recipient.
    #[serde(default)]
    pub patient_id: Option<i32>,
}

/// Update payload for [`Notification`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = notifications)]
pub struct NotificationChanges {
    /// Body text.
    pub message: Option<String>,
    /// Day sent.
    pub sent_date: Option<NaiveDate>,
    /// Time sent.
    pub sent_time: Option<NaiveTime>,
    /// Sender; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub admin_id: Option<Option<i32>>,
    /// Recipient; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub patient_id: Option<Option<i32>>,
}

/// Listing filters for notifications.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NotificationFilter {
    /// Only messages to this patient.
    pub patient_id: Option<i32>,
    /// Only messages from this administrator.
    pub admin_id: Option<i32>,
}

/// PostgreSQL gateway for notifications.
#[derive(Clone)]
pub struct NotificationGateway {
    pool: DbPool,
}

impl NotificationGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! matches_term {
    ($pattern:expr) => {
        notifications::message
            .ilike($pattern.clone())
            .or(system_admins::name
                .nullable()
                .ilike($pattern.clone())
                .assume_not_null())
            .or(patients::name
                .nullable()
                .ilike($pattern.clone())
                .assume_not_null())
    };
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<NotificationView> {
    let row = notifications::table
        .left_join(system_admins::table)
        .left_join(patients::table)
        .filter(notifications::notification_id.eq(id))
        .select((
            Notification::as_select(),
            system_admins::name.nullable(),
            patients::name.nullable(),
        ))
        .first::<NotificationRow>(conn)
        .optional()?;
    require_found(row.map(NotificationView::from), NotificationGateway::NAME, id)
}

impl Gateway for NotificationGateway {
    type View = NotificationView;
    type New = NewNotification;
    type Changes = NotificationChanges;
    type Filter = NotificationFilter;

    const NAME: &'static str = "Notification";
    const PLURAL: &'static str = "notifications";

    fn list(
        &self,
        query: &ListQuery,
        filter: &NotificationFilter,
    ) -> AppResult<Page<NotificationView>> {
        let mut conn = self.pool.get()?;
        let mut rows = notifications::table
            .left_join(system_admins::table)
            .left_join(patients::table)
            .select((
                Notification::as_select(),
                system_admins::name.nullable(),
                patients::name.nullable(),
            ))
            .order((
                notifications::sent_date.desc(),
                notifications::sent_time.desc(),
            ))
            .into_boxed();
        let mut total = notifications::table
            .left_join(system_admins::table)
            .left_join(patients::table)
            .count()
            .into_boxed();

        if let Some(patient) = filter.patient_id {
            rows = rows.filter(notifications::patient_id.eq(patient));
            total = total.filter(notifications::patient_id.eq(patient));
        }
        if let Some(admin) = filter.admin_id {
            rows = rows.filter(notifications::admin_id.eq(admin));
            total = total.filter(notifications::admin_id.eq(admin));
        }
        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(matches_term!(pattern));
            total = total.filter(matches_term!(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load::<NotificationRow>(&mut conn)?
            .into_iter()
            .map(NotificationView::from)
            .collect();
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<NotificationView> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewNotification) -> AppResult<NotificationView> {
        let mut conn = self.pool.get()?;
        let id = diesel::insert_into(notifications::table)
            .values(&new)
            .returning(notifications::notification_id)
            .get_result::<i32>(&mut conn)?;
        fetch(&mut conn, id)
    }

    fn update(&self, id: i32, changes: NotificationChanges) -> AppResult<NotificationView> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(notifications::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(notifications::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
