//! System administrators.

use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, require_affected, require_found, Gateway, NoFilter,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::system_admins;

/// A row in `system_admins`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = system_admins, check_for_backend(Pg))]
pub struct SystemAdmin {
    /// Primary key.
    #[diesel(column_name = admin_id)]
    pub id: i32,
    /// Full name.
    pub name: String,
    /// Email address, unique across admins.
    pub email: String,
    /// Contact number.
    pub phone_number: String,
}

/// Create payload for [`SystemAdmin`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = system_admins)]
pub struct NewSystemAdmin {
    /// Full name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Contact number.
    pub phone_number: String,
}

/// Update payload for [`SystemAdmin`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = system_admins)]
pub struct SystemAdminChanges {
    /// Full name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Contact number.
    pub phone_number: Option<String>,
}

/// PostgreSQL gateway for system administrators.
#[derive(Clone)]
pub struct AdminGateway {
    pool: DbPool,
}

impl AdminGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! matches_term {
    ($pattern:expr) => {
        system_admins::name
            .ilike($pattern.clone())
            .or(system_admins::email.ilike($pattern.clone()))
            .or(system_admins::phone_number.ilike($pattern.clone()))
    };
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<SystemAdmin> {
    let row = system_admins::table
        .find(id)
        .select(SystemAdmin::as_select())
        .first(conn)
        .optional()?;
    require_found(row, AdminGateway::NAME, id)
}

impl Gateway for AdminGateway {
    type View = SystemAdmin;
    type New = NewSystemAdmin;
    type Changes = SystemAdminChanges;
    type Filter = NoFilter;

    const NAME: &'static str = "System administrator";
    const PLURAL: &'static str = "system administrators";

    fn list(&self, query: &ListQuery, _filter: &NoFilter) -> AppResult<Page<SystemAdmin>> {
        let mut conn = self.pool.get()?;
        let mut rows = system_admins::table
            .select(SystemAdmin::as_select())
            .order(system_admins::admin_id.asc())
            .into_boxed();
        let mut total = system_admins::table.count().into_boxed();

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(matches_term!(pattern));
            total = total.filter(matches_term!(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load(&mut conn)?;
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<SystemAdmin> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewSystemAdmin) -> AppResult<SystemAdmin> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(system_admins::table)
            .values(&new)
            .returning(SystemAdmin::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn update(&self, id: i32, changes: SystemAdminChanges) -> AppResult<SystemAdmin> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(system_admins::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(system_admins::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
