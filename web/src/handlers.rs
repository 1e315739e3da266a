//! # CRUD Handlers
//!
//! Generic actix handlers over [`Gateway`]. Every resource endpoint is made
//! of these five functions instantiated for its gateway type.

use std::collections::HashMap;

use actix_web::{web, HttpRequest, HttpResponse};
use dialysis_core::{AppError, AppResult, Gateway, ListQuery};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::error::{ApiError, Context};

/// PUT body: the changed fields, plus the id when it is not in the path.
#[derive(Debug, Deserialize)]
#[serde(bound = "C: DeserializeOwned")]
pub struct UpdateBody<C> {
    /// Record to update.
    pub id: Option<i32>,
    /// Fields to change.
    #[serde(flatten)]
    pub changes: C,
}

/// Runs a gateway call on the blocking thread pool.
pub(crate) async fn blocking<G, R, F>(gateway: web::Data<G>, f: F) -> AppResult<R>
where
    G: Gateway,
    R: Send + 'static,
    F: FnOnce(&G) -> AppResult<R> + Send + 'static,
{
    web::block(move || f(gateway.get_ref()))
        .await
        .map_err(|e| AppError::General(e.to_string()))?
}

fn query_params(req: &HttpRequest) -> Result<HashMap<String, String>, ApiError> {
    web::Query::<HashMap<String, String>>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .map_err(|e| ApiError::bad_request(e, "Invalid query string"))
}

fn missing_id<G: Gateway>() -> ApiError {
    ApiError::bad_request(
        "no id supplied",
        format!("Missing {} ID", G::NAME.to_lowercase()),
    )
}

fn parse_id<G: Gateway>(raw: Option<&String>) -> Result<i32, ApiError> {
    let raw = raw
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .ok_or_else(missing_id::<G>)?;
    raw.parse()
        .map_err(|e| ApiError::bad_request(e, format!("Invalid {} ID", G::NAME.to_lowercase())))
}

/// `GET /{resource}`: one page of records.
pub async fn list<G: Gateway>(
    gateway: web::Data<G>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = query_params(&req)?;
    let filter = web::Query::<G::Filter>::from_query(req.query_string())
        .map_err(|e| ApiError::bad_request(e, "Invalid filter"))?
        .into_inner();
    let query = ListQuery::from_params(&params);

    let page = blocking(gateway, move |g| g.list(&query, &filter))
        .await
        .context(format!("Failed to fetch {}", G::PLURAL))?;
    Ok(HttpResponse::Ok().json(page))
}

/// `GET /{resource}/{id}`: a single record.
pub async fn get<G: Gateway>(
    gateway: web::Data<G>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let record = blocking(gateway, move |g| g.get(id))
        .await
        .context(format!("Failed to fetch {}", G::NAME.to_lowercase()))?;
    Ok(HttpResponse::Ok().json(record))
}

/// `POST /{resource}`: insert and return the stored record.
pub async fn create<G: Gateway>(
    gateway: web::Data<G>,
    body: web::Json<G::New>,
) -> Result<HttpResponse, ApiError> {
    let new = body.into_inner();
    let record = blocking(gateway, move |g| g.create(new))
        .await
        .context(format!("Failed to create {}", G::NAME.to_lowercase()))?;
    Ok(HttpResponse::Created().json(record))
}

/// `PUT /{resource}` with the id in the body.
pub async fn update<G: Gateway>(
    gateway: web::Data<G>,
    body: web::Json<UpdateBody<G::Changes>>,
) -> Result<HttpResponse, ApiError> {
    let UpdateBody { id, changes } = body.into_inner();
    let id = id.ok_or_else(missing_id::<G>)?;
    apply_update(gateway, id, changes).await
}

/// `PUT /{resource}/{id}`.
pub async fn update_by_path<G: Gateway>(
    gateway: web::Data<G>,
    id: web::Path<i32>,
    body: web::Json<UpdateBody<G::Changes>>,
) -> Result<HttpResponse, ApiError> {
    let UpdateBody { id: body_id, changes } = body.into_inner();
    let id = id.into_inner();
    if let Some(body_id) = body_id.filter(|body_id| *body_id != id) {
        return Err(ApiError::bad_request(
            format!("body id {body_id} does not match path id {id}"),
            "Invalid request payload",
        ));
    }
    apply_update(gateway, id, changes).await
}

async fn apply_update<G: Gateway>(
    gateway: web::Data<G>,
    id: i32,
    changes: G::Changes,
) -> Result<HttpResponse, ApiError> {
    let record = blocking(gateway, move |g| g.update(id, changes))
        .await
        .context(format!("Failed to update {}", G::NAME.to_lowercase()))?;
    Ok(HttpResponse::Ok().json(record))
}

/// `DELETE /{resource}?id=n`.
pub async fn delete<G: Gateway>(
    gateway: web::Data<G>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let params = query_params(&req)?;
    let id = parse_id::<G>(params.get("id"))?;
    remove(gateway, id).await
}

/// `DELETE /{resource}/{id}`.
pub async fn delete_by_path<G: Gateway>(
    gateway: web::Data<G>,
    id: web::Path<i32>,
) -> Result<HttpResponse, ApiError> {
    remove(gateway, id.into_inner()).await
}

async fn remove<G: Gateway>(gateway: web::Data<G>, id: i32) -> Result<HttpResponse, ApiError> {
    blocking(gateway, move |g| g.delete(id))
        .await
        .context(format!("Failed to delete {}", G::NAME.to_lowercase()))?;
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("{} deleted successfully", G::NAME)
    })))
}
