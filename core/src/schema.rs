//! Database Schema.

diesel::table! {
    /// Payment methods a patient can be billed through.
    payment_details (payment_details_id) {
        /// Primary Key.
        payment_details_id -> Int4,
        /// Display name, e.g. `NHIF`.
        payment_name -> Varchar,
    }
}

diesel::table! {
    /// Registered patients.
    patients (patient_id) {
        /// Primary Key.
        patient_id -> Int4,
        /// Full name.
        name -> Varchar,
        /// Postal or street address.
        address -> Varchar,
        /// Contact number.
        phone_number -> Varchar,
        /// Date of birth.
        date_of_birth -> Date,
        /// Gender as recorded at registration.
        gender -> Varchar,
        /// Emergency contact details.
        emergency_contact -> Varchar,
        /// Payment method, if any.
        payment_details_id -> Nullable<Int4>,
    }
}

diesel::table! {
    /// Nurses, nephrologists and technicians.
    hospital_staff (staff_id) {
        /// Primary Key.
        staff_id -> Int4,
        /// Full name.
        name -> Varchar,
        /// Gender.
        gender -> Varchar,
        /// Area of practice.
        specialization -> Varchar,
        /// Contact number.
        phone_number -> Varchar,
        /// Availability, e.g. `on duty`.
        status -> Varchar,
    }
}

diesel::table! {
    /// Administrators who publish posts and notifications.
    system_admins (admin_id) {
        /// Primary Key.
        admin_id -> Int4,
        /// Full name.
        name -> Varchar,
        /// Email address.
        email -> Varchar,
        /// Contact number.
        phone_number -> Varchar,
    }
}

diesel::table! {
    /// Dialysis sessions and nephrologist consultations.
    appointments (appointment_id) {
        /// Primary Key.
        appointment_id -> Int4,
        /// `dialysis` or `nephrologist`.
        appointment_type -> Varchar,
        /// Scheduled day.
        date -> Date,
        /// Scheduled time of day.
        time -> Time,
        /// Booking status, e.g. `scheduled`.
        status -> Varchar,
        /// Patient being seen.
        patient_id -> Int4,
        /// Staff member in charge.
        staff_id -> Int4,
    }
}

diesel::table! {
    /// Messages sent to patients.
    notifications (notification_id) {
        /// Primary Key.
        notification_id -> Int4,
        /// Body text.
        message -> Text,
        /// Day the message was sent.
        sent_date -> Date,
        /// Time the message was sent.
        sent_time -> Time,
        /// Sender.
        admin_id -> Nullable<Int4>,
        /// Recipient; `NULL` for broadcasts.
        patient_id -> Nullable<Int4>,
    }
}

diesel::table! {
    /// Public announcements.
    posts (post_id) {
        /// Primary Key.
        post_id -> Int4,
        /// Headline.
        title -> Varchar,
        /// Body text.
        content -> Text,
        /// Author.
        admin_id -> Nullable<Int4>,
        /// Publication day.
        post_date -> Date,
        /// Publication time.
        post_time -> Time,
    }
}

diesel::table! {
    /// Index of uploaded history files per patient folder.
    patient_history (history_id) {
        /// Primary Key.
        history_id -> Int4,
        /// Folder name the files live under.
        patient_name -> Varchar,
        /// Matching patient, when the name resolves to one.
        patient_id -> Nullable<Int4>,
        /// File names currently in the folder.
        history_files -> Array<Text>,
        /// Last upload time.
        updated_at -> Timestamp,
    }
}

diesel::joinable!(patients -> payment_details (payment_details_id));
diesel::joinable!(appointments -> patients (patient_id));
diesel::joinable!(appointments -> hospital_staff (staff_id));
diesel::joinable!(notifications -> system_admins (admin_id));
diesel::joinable!(notifications -> patients (patient_id));
diesel::joinable!(posts -> system_admins (admin_id));
diesel::joinable!(patient_history -> patients (patient_id));

diesel::allow_tables_to_appear_in_same_query!(
    payment_details,
    patients,
    hospital_staff,
    system_admins,
    appointments,
    notifications,
    posts,
    patient_history,
);
