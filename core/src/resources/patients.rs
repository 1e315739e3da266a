//! Registered patients and the payment method they are billed through.

use chrono::NaiveDate;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{
    changeset_error, like_pattern, nullable, require_affected, require_found, Gateway, NoFilter,
};
use crate::pagination::{ListQuery, Page};
use crate::schema::{patients, payment_details};

/// A row in `patients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = patients, check_for_backend(Pg))]
pub struct Patient {
    /// Primary key.
    #[diesel(column_name = patient_id)]
    pub id: i32,
    /// Full name.
    pub name: String,
    /// Postal or street address.
    pub address: String,
    /// Contact number.
    pub phone_number: String,
    /// Date of birth.
    pub date_of_birth: NaiveDate,
    /// Gender.
    pub gender: String,
    /// Emergency contact details.
    pub emergency_contact: String,
    /// Payment method, if any.
    pub payment_details_id: Option<i32>,
}

/// A patient together with the name of their payment method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientView {
    /// The stored row.
    #[serde(flatten)]
    pub patient: Patient,
    /// `payment_details.payment_name`, when a payment method is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_name: Option<String>,
}

impl From<(Patient, Option<String>)> for PatientView {
    fn from((patient, payment_name): (Patient, Option<String>)) -> Self {
        Self {
            patient,
            payment_name,
        }
    }
}

/// Create payload for [`Patient`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = patients)]
pub struct NewPatient {
    /// Full name.
    pub name: String,
    /// Postal or street address.
    pub address: String,
    /// Contact number.
    pub phone_number: String,
    /// Date of birth, `YYYY-MM-DD`.
    pub date_of_birth: NaiveDate,
    /// Gender.
    pub gender: String,
    /// Emergency contact details.
    pub emergency_contact: String,
    /// Payment method.
    #[serde(default)]
    pub payment_details_id: Option<i32>,
}

/// Update payload for [`Patient`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = patients)]
pub struct PatientChanges {
    /// Full name.
    pub name: Option<String>,
    /// Postal or street address.
    pub address: Option<String>,
    /// Contact number.
    pub phone_number: Option<String>,
    /// Date of birth.
    pub date_of_birth: Option<NaiveDate>,
    /// Gender.
    pub gender: Option<String>,
    /// Emergency contact details.
    pub emergency_contact: Option<String>,
    /// Payment method; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub payment_details_id: Option<Option<i32>>,
}

/// PostgreSQL gateway for patients.
#[derive(Clone)]
pub struct PatientGateway {
    pool: DbPool,
}

impl PatientGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

macro_rules! matches_term {
    ($pattern:expr) => {
        patients::name
            .ilike($pattern.clone())
            .or(patients::address.ilike($pattern.clone()))
            .or(patients::phone_number.ilike($pattern.clone()))
            .or(patients::emergency_contact.ilike($pattern.clone()))
            .or(payment_details::payment_name
                .nullable()
                .ilike($pattern.clone())
                .assume_not_null())
    };
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<PatientView> {
    let row = patients::table
        .left_join(payment_details::table)
        .filter(patients::patient_id.eq(id))
        .select((
            Patient::as_select(),
            payment_details::payment_name.nullable(),
        ))
        .first::<(Patient, Option<String>)>(conn)
        .optional()?;
    require_found(row.map(PatientView::from), PatientGateway::NAME, id)
}

impl Gateway for PatientGateway {
    type View = PatientView;
    type New = NewPatient;
    type Changes = PatientChanges;
    type Filter = NoFilter;

    const NAME: &'static str = "Patient";
    const PLURAL: &'static str = "patients";

    fn list(&self, query: &ListQuery, _filter: &NoFilter) -> AppResult<Page<PatientView>> {
        let mut conn = self.pool.get()?;
        let mut rows = patients::table
            .left_join(payment_details::table)
            .select((
                Patient::as_select(),
                payment_details::payment_name.nullable(),
            ))
            .order(patients::patient_id.asc())
            .into_boxed();
        let mut total = patients::table
            .left_join(payment_details::table)
            .count()
            .into_boxed();

        if let Some(pattern) = query.search.as_deref().map(like_pattern) {
            rows = rows.filter(matches_term!(pattern));
            total = total.filter(matches_term!(pattern));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load::<(Patient, Option<String>)>(&mut conn)?
            .into_iter()
            .map(PatientView::from)
            .collect();
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<PatientView> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewPatient) -> AppResult<PatientView> {
        let mut conn = self.pool.get()?;
        let id = diesel::insert_into(patients::table)
            .values(&new)
            .returning(patients::patient_id)
            .get_result::<i32>(&mut conn)?;
        fetch(&mut conn, id)
    }

    fn update(&self, id: i32, changes: PatientChanges) -> AppResult<PatientView> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(patients::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(patients::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}
