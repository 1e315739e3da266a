//! # Patient History Handlers
//!
//! Multipart upload into a patient's folder, folder listing, zip download
//! and removal. Files go through [`HistoryStore`]; the `patient_history`
//! table is kept in step through a [`HistoryLedger`].

use std::collections::HashMap;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use dialysis_core::{AppError, AppResult, HistoryLedger, HistoryStore, ListQuery};
use futures_util::TryStreamExt;
use serde_json::json;

use crate::error::{ApiError, Context};

/// Largest upload accepted in one request.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared state of the history endpoint.
#[derive(Clone)]
pub struct HistoryState {
    store: HistoryStore,
    ledger: Arc<dyn HistoryLedger>,
}

impl HistoryState {
    /// Combines the file store with the ledger that indexes it.
    pub fn new(store: HistoryStore, ledger: impl HistoryLedger) -> Self {
        Self {
            store,
            ledger: Arc::new(ledger),
        }
    }

    async fn run<R, F>(&self, f: F) -> AppResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&HistoryStore, &dyn HistoryLedger) -> AppResult<R> + Send + 'static,
    {
        let store = self.store.clone();
        let ledger = Arc::clone(&self.ledger);
        web::block(move || f(&store, ledger.as_ref()))
            .await
            .map_err(|e| AppError::General(e.to_string()))?
    }
}

fn query_params(req: &HttpRequest) -> Result<HashMap<String, String>, ApiError> {
    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .map_err(|e| ApiError::bad_request(e, "Invalid query string"))
}

fn patient_name(params: &HashMap<String, String>) -> Result<String, ApiError> {
    params
        .get("patient_name")
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ApiError::bad_request("patient_name is required", "Missing patient name"))
}

/// `GET /patient_history`, dispatched on `identifier`.
pub async fn get(
    state: web::Data<HistoryState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = query_params(&req)?;
    match params.get("identifier").map(String::as_str) {
        Some("list") => {
            let name = patient_name(&params)?;
            let files = state
                .run(move |store, _| store.list(&name))
                .await
                .context("Failed to list patient history")?;
            Ok(HttpResponse::Ok().json(files))
        }
        Some("download") => {
            let name = patient_name(&params)?;
            let archive_name = name.clone();
            let bytes = state
                .run(move |store, _| store.archive(&archive_name))
                .await
                .context("Failed to download patient history")?;
            let disposition = ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(format!("{name}.zip"))],
            };
            Ok(HttpResponse::Ok()
                .content_type("application/zip")
                .insert_header(disposition)
                .body(bytes))
        }
        Some("records") => {
            let query = ListQuery::from_params(&params);
            let page = state
                .run(move |_, ledger| ledger.list(&query))
                .await
                .context("Failed to fetch patient history")?;
            Ok(HttpResponse::Ok().json(page))
        }
        other => Err(ApiError::bad_request(
            format!("unknown identifier {:?}", other.unwrap_or_default()),
            "Invalid operation",
        )),
    }
}

struct Upload {
    patient_name: Option<String>,
    files: Vec<(String, Vec<u8>)>,
}

async fn read_upload(mut form: Multipart) -> AppResult<Upload> {
    let mut upload = Upload {
        patient_name: None,
        files: Vec::new(),
    };
    let mut received = 0usize;

    while let Some(mut field) = form
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let mut contents = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            received += chunk.len();
            if received > MAX_UPLOAD_BYTES {
                return Err(AppError::PayloadTooLarge(format!(
                    "upload exceeds {MAX_UPLOAD_BYTES} bytes"
                )));
            }
            contents.extend_from_slice(&chunk);
        }

        match (name.as_str(), file_name) {
            ("patient_name", _) => {
                let value = String::from_utf8(contents)
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                upload.patient_name = Some(value.trim().to_owned());
            }
            ("files", Some(file_name)) => upload.files.push((file_name, contents)),
            (other, _) => tracing::debug!(field = other, "ignoring multipart field"),
        }
    }
    Ok(upload)
}

/// `POST /patient_history`: multipart upload of one or more files.
pub async fn upload(
    state: web::Data<HistoryState>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, ApiError> {
    let form = Multipart::new(req.headers(), payload);
    let Upload {
        patient_name: form_name,
        files,
    } = read_upload(form).await.context("Failed to read upload")?;

    let patient = match form_name.filter(|name| !name.is_empty()) {
        Some(name) => name,
        None => patient_name(&query_params(&req)?)?,
    };
    if files.is_empty() {
        return Err(ApiError::bad_request("no files part", "No files uploaded"));
    }

    let stored = state
        .run(move |store, ledger| {
            let stored = files
                .iter()
                .map(|(name, contents)| store.store(&patient, name, contents))
                .collect::<AppResult<Vec<_>>>()?;
            ledger.record(&patient, &store.list(&patient)?)?;
            tracing::info!(patient = %patient, files = stored.len(), "uploaded patient history");
            Ok(stored)
        })
        .await
        .context("Failed to upload files")?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Files uploaded successfully",
        "files": stored,
    })))
}

/// `Ok(false)` when there was nothing to remove.
fn removed(result: AppResult<()>) -> AppResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(AppError::NotFound(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

/// `DELETE /patient_history?patient_name=X`: removes the folder and its record.
///
/// Either may be missing, e.g. after an upload whose ledger write failed;
/// only when both are is the request a 404.
pub async fn delete(
    state: web::Data<HistoryState>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let name = patient_name(&query_params(&req)?)?;
    state
        .run(move |store, ledger| {
            let folder = removed(store.remove(&name))?;
            let record = removed(ledger.forget(&name))?;
            if !folder && !record {
                return Err(AppError::NotFound(format!("Patient history for {name}")));
            }
            tracing::info!(patient = %name, folder, record, "deleted patient history");
            Ok(())
        })
        .await
        .context("Failed to delete patient history")?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Patient history deleted successfully"
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use dialysis_core::resources::PatientHistory;
    use dialysis_core::Page;
    use std::io::Cursor;
    use std::sync::Mutex;

    #[derive(Default, Clone)]
    struct Ledger {
        rows: Arc<Mutex<Vec<PatientHistory>>>,
    }

    impl HistoryLedger for Ledger {
        fn list(&self, query: &ListQuery) -> AppResult<Page<PatientHistory>> {
            let rows = self.rows.lock().unwrap().clone();
            let total = rows.len() as i64;
            Ok(Page::new(rows, total, &query.page))
        }

        fn record(&self, patient_name: &str, files: &[String]) -> AppResult<PatientHistory> {
            let mut rows = self.rows.lock().unwrap();
            rows.retain(|r| r.patient_name != patient_name);
            let row = PatientHistory {
                id: rows.len() as i32 + 1,
                patient_name: patient_name.to_owned(),
                patient_id: None,
                history_files: files.to_vec(),
                updated_at: chrono::NaiveDateTime::default(),
            };
            rows.push(row.clone());
            Ok(row)
        }

        fn forget(&self, patient_name: &str) -> AppResult<()> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| r.patient_name != patient_name);
            if rows.len() == before {
                return Err(AppError::NotFound(format!("Patient history for {patient_name}")));
            }
            Ok(())
        }
    }

    const BOUNDARY: &str = "clinicboundary";

    fn multipart_body(patient: Option<&str>, files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(patient) = patient {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"patient_name\"\r\n\r\n{patient}\r\n"
                )
                .as_bytes(),
            );
        }
        for (name, contents) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(contents);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(body)
    }

    macro_rules! app {
        ($store:expr, $ledger:expr) => {
            test::init_service(
                App::new().service(routes::history_resource(HistoryState::new(
                    $store.clone(),
                    $ledger.clone(),
                ))),
            )
            .await
        };
    }

    fn fixture() -> (tempfile::TempDir, HistoryStore, Ledger) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history"));
        (dir, store, Ledger::default())
    }

    #[actix_web::test]
    async fn test_upload_then_list() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let body = multipart_body(Some("Achieng"), &[("labs.pdf", b"pdf"), ("notes.txt", b"n")]);
        let resp = test::call_service(&app, upload_request("/patient_history", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["message"], "Files uploaded successfully");
        assert_eq!(json["files"], json!(["labs.pdf", "notes.txt"]));

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=list&patient_name=Achieng")
            .to_request();
        let files: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(files, vec!["labs.pdf", "notes.txt"]);

        let recorded = ledger.rows.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].history_files, vec!["labs.pdf", "notes.txt"]);
    }

    #[actix_web::test]
    async fn test_upload_takes_patient_from_query() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let body = multipart_body(None, &[("scan.png", b"png")]);
        let req = upload_request("/patient_history?patient_name=Otieno", body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(store.root().join("Otieno").join("scan.png").is_file());
    }

    #[actix_web::test]
    async fn test_upload_without_files_is_bad_request() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let body = multipart_body(Some("Achieng"), &[]);
        let resp = test::call_service(&app, upload_request("/patient_history", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_upload_rejects_traversal() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let body = multipart_body(Some(".."), &[("x.txt", b"x")]);
        let resp = test::call_service(&app, upload_request("/patient_history", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_upload_too_large() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let big = vec![0u8; MAX_UPLOAD_BYTES + 1];
        let body = multipart_body(Some("Achieng"), &[("big.bin", &big)]);
        let resp = test::call_service(&app, upload_request("/patient_history", body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!store.root().join("Achieng").exists());
    }

    #[actix_web::test]
    async fn test_download_is_zip() {
        let (_dir, store, ledger) = fixture();
        store.store("Achieng", "labs.pdf", b"pdf").unwrap();
        let app = app!(store, ledger);

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=download&patient_name=Achieng")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("Content-Type").unwrap(), "application/zip");
        assert_eq!(
            resp.headers().get("Content-Disposition").unwrap(),
            "attachment; filename=\"Achieng.zip\""
        );

        let bytes = test::read_body(resp).await;
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        assert_eq!(archive.file_names().collect::<Vec<_>>(), vec!["labs.pdf"]);
    }

    #[actix_web::test]
    async fn test_missing_folder_is_not_found() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=list&patient_name=Nobody")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_records_and_invalid_identifier() {
        let (_dir, store, ledger) = fixture();
        ledger.record("Achieng", &["labs.pdf".to_owned()]).unwrap();
        let app = app!(store, ledger);

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=records")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_entries"], 1);
        assert_eq!(body["data"][0]["patient_name"], "Achieng");

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=rename")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid operation");
    }

    #[actix_web::test]
    async fn test_delete_removes_folder_and_record() {
        let (_dir, store, ledger) = fixture();
        store.store("Achieng", "labs.pdf", b"pdf").unwrap();
        ledger.record("Achieng", &["labs.pdf".to_owned()]).unwrap();
        let app = app!(store, ledger);

        let req = test::TestRequest::delete()
            .uri("/patient_history?patient_name=Achieng")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!store.root().join("Achieng").exists());
        assert!(ledger.rows.lock().unwrap().is_empty());

        let req = test::TestRequest::delete().uri("/patient_history").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_delete_folder_without_record() {
        let (_dir, store, ledger) = fixture();
        store.store("Achieng", "labs.pdf", b"pdf").unwrap();
        let app = app!(store, ledger);

        let req = test::TestRequest::delete()
            .uri("/patient_history?patient_name=Achieng")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(!store.root().join("Achieng").exists());
    }

    #[actix_web::test]
    async fn test_delete_record_without_folder() {
        let (_dir, store, ledger) = fixture();
        ledger.record("Achieng", &["labs.pdf".to_owned()]).unwrap();
        let app = app!(store, ledger);

        let req = test::TestRequest::delete()
            .uri("/patient_history?patient_name=Achieng")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(ledger.rows.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_delete_unknown_patient_is_not_found() {
        let (_dir, store, ledger) = fixture();
        let app = app!(store, ledger);

        let req = test::TestRequest::delete()
            .uri("/patient_history?patient_name=Nobody")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Patient history for Nobody not found");
    }
}
