//! Payment methods patients can be billed through.

use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, require_affected, require_found, Gateway, NoFilter,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::payment_details;

/// A row in `payment_details`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = payment_details, check_for_backend(Pg))]
pub struct PaymentDetail {
    /// Primary key.
    #[diesel(column_name = payment_details_id)]
    pub id: i32,
    /// Display name.
    pub payment_name: String,
}

/// Create payload for [`PaymentDetail`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = payment_details)]
pub struct NewPaymentDetail {
    /// Display name.
    pub payment_name: String,
}

/// Update payload for [`PaymentDetail`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = payment_details)]
pub struct PaymentDetailChanges {
    /// New display name.
    pub payment_name: Option<String>,
}

/// PostgreSQL gateway for payment details.
#[derive(Clone)]
pub struct PaymentDetailGateway {
    pool: DbPool,
}

impl PaymentDetailGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<PaymentDetail> {
    let row = payment_details::table
        .find(id)
        .select(PaymentDetail::as_select())
        .first(conn)
        .optional()?;
    require_found(row, PaymentDetailGateway::NAME, id)
}

impl Gateway for PaymentDetailGateway {
    type View = PaymentDetail;
    type New = NewPaymentDetail;
    type Changes = PaymentDetailChanges;
    type Filter = NoFilter;

    const NAME: &'static str = "Payment detail";
    const PLURAL: &'static str = "payment details";

    fn list(&self, query: &ListQuery, _filter: &NoFilter) -> AppResult<Page<PaymentDetail>> {
        let mut conn = self.pool.get()?;
        let mut rows = payment_details::table
            .select(PaymentDetail::as_select())
            .order(payment_details::payment_details_id.asc())
            .into_boxed();
        let mut total = payment_details::table.count().into_boxed();

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(payment_details::payment_name.ilike(pattern.clone()));
            total = total.filter(payment_details::payment_name.ilike(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load(&mut conn)?;
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<PaymentDetail> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewPaymentDetail) -> AppResult<PaymentDetail> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(payment_details::table)
            .values(&new)
            .returning(PaymentDetail::as_returning())
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn update(&self, id: i32, changes: PaymentDetailChanges) -> AppResult<PaymentDetail> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(payment_details::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(payment_details::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
