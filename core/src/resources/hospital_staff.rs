//! Hospital staff: nurses, nephrologists and technicians.

use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, require_affected, require_found, Gateway, NoFilter,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::hospital_staff;

/// A row in `hospital_staff`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = hospital_staff, check_for_backend(Pg))]
pub struct StaffMember {
    /// Primary key.
    #[diesel(column_name = staff_id)]
    pub id: i32,
    /// Full name.
    pub name: String,
    /// Gender.
    pub gender: String,
    /// Area of practice.
    pub specialization: String,
    /// Contact number.
    pub phone_number: String,
    /// Availability.
    pub status: String,
}

/// Create payload for [`StaffMember`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = hospital_staff)]
pub struct NewStaffMember {
    /// Full name.
    pub name: String,
    /// Gender.
    pub gender: String,
    /// Area of practice.
    pub specialization: String,
    /// Contact number.
    pub phone_number: String,
    /// Availability.
    pub status: String,
}

/// Update payload for [`StaffMember`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = hospital_staff)]
pub struct StaffMemberChanges {
    /// Full name.
    pub name: Option<String>,
    /// Gender.
    pub gender: Option<String>,
    /// Area of practice.
    pub specialization: Option<String>,
    /// Contact number.
    pub phone_number: Option<String>,
    /// Availability.
    pub status: Option<String>,
}

/// PostgreSQL gateway for hospital staff.
#[derive(Clone)]
pub struct StaffGateway {
    pool: DbPool,
}

impl StaffGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! matches_term {
    ($pattern:expr) => {
        hospital_staff::name
            .ilike($pattern.clone())
            .or(hospital_staff::specialization.ilike($pattern.clone()))
            .or(hospital_staff::phone_number.ilike($pattern.clone()))
    };
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<StaffMember> {
    let row = hospital_staff::table
        .find(id)
        .select(StaffMember::as_select())
        .first(conn)
        .optional()?;
    require_found(row, StaffGateway::NAME, id)
}

impl Gateway for StaffGateway {
    type View = StaffMember;
    type New = NewStaffMember;
    type Changes = StaffMemberChanges;
    type Filter = NoFilter;

    const NAME: &'static str = "Hospital staff";
    const PLURAL: &'static str = "hospital staff";

    fn list(&self, query: &ListQuery, _filter: &NoFilter) -> AppResult<Page<StaffMember>> {
        let mut conn = self.pool.get()?;
        let mut rows = hospital_staff::table
            .select(StaffMember::as_select())
            .order(hospital_staff::staff_id.asc())
            .into_boxed();
        let mut total = hospital_staff::table.count().into_boxed();

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

    fn get(&self, id: i32) -> AppResult<StaffMember> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewStaffMember) -> AppResult<StaffMember> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(hospital_staff::table)
            .values(&new)
            .returning(StaffMember::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn update(&self, id: i32, changes: StaffMemberChanges) -> AppResult<StaffMember> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(hospital_staff::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(hospital_staff::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
