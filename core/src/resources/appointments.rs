//! Dialysis sessions and nephrologist consultations.
//!
//! Both kinds share one table and are told apart by `appointment_type`.
//! Listings join in the patient and staff names.

use chrono::{NaiveDate, NaiveTime};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgConnection, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::gateway::{changeset_error, like_pattern, require_affected, require_found, Gateway};
use crate::pagination::{ListQuery, Page};
use crate::schema::{appointments, hospital_staff, patients};

/// What the appointment is for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentType {
    /// A dialysis session.
    #[default]
    Dialysis,
    /// A consultation with a nephrologist.
    Nephrologist,
}

impl AppointmentType {
    /// Value stored in the database and used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dialysis => "dialysis",
            Self::Nephrologist => "nephrologist",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dialysis" => Ok(Self::Dialysis),
            "nephrologist" => Ok(Self::Nephrologist),
            other => Err(format!("unknown appointment type `{other}`")),
        }
    }
}

impl ToSql<Text, Pg> for AppointmentType {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<Text, Pg> for AppointmentType {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        Ok(raw.parse()?)
    }
}

/// A row in `appointments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Queryable, Selectable)]
#[diesel(table_name = appointments, check_for_backend(Pg))]
pub struct Appointment {
    /// Primary key.
    #[diesel(column_name = appointment_id)]
    pub id: i32,
    /// Dialysis session or nephrologist consultation.
    pub appointment_type: AppointmentType,
    /// Scheduled day.
    pub date: NaiveDate,
    /// Scheduled time of day.
    pub time: NaiveTime,
    /// Booking status.
    pub status: String,
    /// Patient being seen.
    pub patient_id: i32,
    /// Staff member in charge.
    pub staff_id: i32,
}

/// An appointment with the patient's and staff member's names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentView {
    /// The stored row.
    #[serde(flatten)]
    pub appointment: Appointment,
    /// `patients.name`.
    pub patient_name: String,
    /// `hospital_staff.name`.
    pub staff_name: String,
}

impl From<(Appointment, String, String)> for AppointmentView {
    fn from((appointment, patient_name, staff_name): (Appointment, String, String)) -> Self {
        Self {
            appointment,
            patient_name,
            staff_name,
        }
    }
}

/// Create payload for [`Appointment`].
#[derive(Debug, Clone, Deserialize, Insertable)]
#[diesel(table_name = appointments)]
pub struct NewAppointment {
    /// Defaults to a dialysis session.
    #[serde(default)]
    pub appointment_type: AppointmentType,
    /// Scheduled day, `YYYY-MM-DD`.
    pub date: NaiveDate,
    /// Scheduled time, `HH:MM:SS`.
    pub time: NaiveTime,
    /// Booking status.
    pub status: String,
    /// Patient being seen.
    pub patient_id: i32,
    /// Staff member in charge.
    pub staff_id: i32,
}

/// Update payload for [`Appointment`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize, AsChangeset)]
#[diesel(table_name = appointments)]
pub struct AppointmentChanges {
    /// Appointment kind.
    pub appointment_type: Option<AppointmentType>,
    /// Scheduled day.
    pub date: Option<NaiveDate>,
    /// Scheduled time of day.
    pub time: Option<NaiveTime>,
    /// Booking status.
    pub status: Option<String>,
    /// Patient being seen.
    pub patient_id: Option<i32>,
    /// Staff member in charge.
    pub staff_id: Option<i32>,
}

/// Listing filters for appointments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AppointmentFilter {
    /// Only this kind of appointment.
    pub appointment_type: Option<AppointmentType>,
    /// Only this patient's appointments.
    pub patient_id: Option<i32>,
    /// Only this staff member's appointments.
    pub staff_id: Option<i32>,
}

/// PostgreSQL gateway for appointments.
#[derive(Clone)]
pub struct AppointmentGateway {
    pool: DbPool,
}

impl AppointmentGateway {
    /// Creates a gateway backed by `pool`.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// A search term that is a date also matches appointments on that day.
macro_rules! matches_term {
    ($pattern:expr, $day:expr) => {
        patients::name
            .ilike($pattern.clone())
            .or(hospital_staff::name.ilike($pattern.clone()))
            .or(appointments::status.ilike($pattern.clone()))
            .or(appointments::date.nullable().eq($day).assume_not_null())
    };
}

macro_rules! apply_filter {
    ($query:expr, $filter:expr) => {{
        let mut query = $query;
        if let Some(kind) = $filter.appointment_type {
            query = query.filter(appointments::appointment_type.eq(kind));
        }
        if let Some(patient) = $filter.patient_id {
            query = query.filter(appointments::patient_id.eq(patient));
        }
        if let Some(staff) = $filter.staff_id {
            query = query.filter(appointments::staff_id.eq(staff));
        }
        query
    }};
}

fn fetch(conn: &mut PgConnection, id: i32) -> AppResult<AppointmentView> {
    let row = appointments::table
        .inner_join(patients::table)
        .inner_join(hospital_staff::table)
        .filter(appointments::appointment_id.eq(id))
        .select((
            Appointment::as_select(),
            patients::name,
            hospital_staff::name,
        ))
        .first::<(Appointment, String, String)>(conn)
        .optional()?;
    require_found(row.map(AppointmentView::from), AppointmentGateway::NAME, id)
}

impl Gateway for AppointmentGateway {
    type View = AppointmentView;
    type New = NewAppointment;
    type Changes = AppointmentChanges;
    type Filter = AppointmentFilter;

    const NAME: &'static str = "Appointment";
    const PLURAL: &'static str = "appointments";

    fn list(
        &self,
        query: &ListQuery,
        filter: &AppointmentFilter,
    ) -> AppResult<Page<AppointmentView>> {
        let mut conn = self.pool.get()?;
        let rows = appointments::table
            .inner_join(patients::table)
            .inner_join(hospital_staff::table)
            .select((
                Appointment::as_select(),
                patients::name,
                hospital_staff::name,
            ))
            .order((appointments::date.asc(), appointments::time.asc()))
            .into_boxed();
        let total = appointments::table
            .inner_join(patients::table)
            .inner_join(hospital_staff::table)
            .count()
            .into_boxed();
        let mut rows = apply_filter!(rows, filter);
        let mut total = apply_filter!(total, filter);

        if let Some(term) = query.search.as_deref() {
            let pattern = like_pattern(term);
            let day = NaiveDate::parse_from_str(term, "%Y-%m-%d").ok();
            rows = rows.filter(matches_term!(pattern, day));
            total = total.filter(matches_term!(pattern, day));
        }

        let total = total.get_result::<i64>(&mut conn)?;
        let data = rows
            .limit(query.page.limit)
            .offset(query.page.offset())
            .load::<(Appointment, String, String)>(&mut conn)?
            .into_iter()
            .map(AppointmentView::from)
            .collect();
        Ok(Page::new(data, total, &query.page))
    }

    fn get(&self, id: i32) -> AppResult<AppointmentView> {
        let mut conn = self.pool.get()?;
        fetch(&mut conn, id)
    }

    fn create(&self, new: NewAppointment) -> AppResult<AppointmentView> {
        let mut conn = self.pool.get()?;
        let id = diesel::insert_into(appointments::table)
            .values(&new)
            .returning(appointments::appointment_id)
            .get_result::<i32>(&mut conn)?;
        fetch(&mut conn, id)
    }

    fn update(&self, id: i32, changes: AppointmentChanges) -> AppResult<AppointmentView> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(appointments::table.find(id))
            .set(&changes)
            .execute(&mut conn)
            .map_err(changeset_error)?;
        require_affected(updated, Self::NAME, id)?;
        fetch(&mut conn, id)
    }

    fn delete(&self, id: i32) -> AppResult<()> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(appointments::table.find(id)).execute(&mut conn)?;
        require_affected(deleted, Self::NAME, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_type_round_trips_through_str() {
        for kind in [AppointmentType::Dialysis, AppointmentType::Nephrologist] {
            assert_eq!(kind.as_str().parse::<AppointmentType>(), Ok(kind));
        }
        assert!("surgery".parse::<AppointmentType>().is_err());
    }

    #[test]
    fn test_new_appointment_defaults_to_dialysis() {
        let new: NewAppointment = serde_json::from_str(
            r#"{"date": "2024-03-04", "time": "08:30:00", "status": "scheduled",
                "patient_id": 1, "staff_id": 2}"#,
        )
        .unwrap();
        assert_eq!(new.appointment_type, AppointmentType::Dialysis);
        assert_eq!(new.time, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
    }

    #[test]
    fn test_view_serializes_names_and_type() {
        let view = AppointmentView::from((
            Appointment {
                id: 9,
                appointment_type: AppointmentType::Nephrologist,
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                status: "scheduled".into(),
                patient_id: 1,
                staff_id: 2,
            },
            "Achieng Otieno".to_string(),
            "Dr. Wanjiru".to_string(),
        ));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["appointment_type"], "nephrologist");
        assert_eq!(json["time"], "14:00:00");
        assert_eq!(json["staff_name"], "Dr. Wanjiru");
    }

    #[test]
    fn test_filter_narrows_query() {
        let filter = AppointmentFilter {
            appointment_type: Some(AppointmentType::Nephrologist),
            patient_id: None,
            staff_id: Some(3),
        };
        let query = apply_filter!(
            appointments::table
                .select(appointments::appointment_id)
                .into_boxed::<Pg>(),
            filter
        );
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();
        assert!(sql.contains(r#""appointments"."appointment_type" = $1"#), "{sql}");
        assert!(sql.contains(r#""appointments"."staff_id" = $2"#), "{sql}");
        assert!(!sql.contains("patient_id"), "{sql}");
    }

    #[test]
    fn test_search_matches_names_and_day() {
        let pattern = like_pattern("2024-03-04");
        let day = NaiveDate::parse_from_str("2024-03-04", "%Y-%m-%d").ok();
        let query = appointments::table
            .inner_join(patients::table)
            .inner_join(hospital_staff::table)
            .select(appointments::appointment_id)
            .filter(matches_term!(pattern, day))
            .into_boxed::<Pg>();
        let sql = diesel::debug_query::<Pg, _>(&query).to_string();
        assert!(sql.contains(r#""patients"."name" ILIKE $1"#), "{sql}");
        assert!(sql.contains(r#""hospital_staff"."name" ILIKE $2"#), "{sql}");
        assert!(sql.contains(r#""appointments"."date" = $4"#), "{sql}");
    }

    #[test]
    fn test_filter_rejects_unknown_type() {
        let err = serde_json::from_str::<AppointmentFilter>(r#"{"appointment_type": "x"}"#);
        assert!(err.is_err());
    }
}
