use axum::{
    Extension, Json,
    extract::{FromRequest, FromRequestParts, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use hospital_auth::{LoginRequest, Profile, RegisterRequest, TokenClaims};
use hospital_core::models::{
    EmployeeChanges, NewAppointment, NewEmployee, NewMedicalHistory, PatientRequest,
    PatientSearch,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::server::AppState;

/// JSON body extractor whose rejections render as [`ApiError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query extractor whose rejections render as [`ApiError`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

type ApiResult<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    backend: &'static str,
}

#[derive(Serialize)]
struct RowsAffected {
    rows_affected: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeSearch {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
}

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            backend: state.store.backend_name(),
        }),
    )
}

// ---- auth ----

pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    state.auth.register(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully" })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.auth.login(&request).await?))
}

pub async fn profile(Extension(claims): Extension<TokenClaims>) -> Json<Profile> {
    Json(Profile::from(&claims))
}

// ---- patients ----

pub async fn list_patients(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.patients.list_patients().await?))
}

pub async fn search_patients(
    State(state): State<AppState>,
    ApiQuery(search): ApiQuery<PatientSearch>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.patients.search_patients(&search).await?))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.patients.get_patient(&patient_id).await?))
}

/// The caller's own record, keyed by the token subject.
pub async fn my_record(
    State(state): State<AppState>,
    Extension(claims): Extension<TokenClaims>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.patients.get_patient(&claims.sub).await?))
}

pub async fn add_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PatientRequest>,
) -> ApiResult<impl IntoResponse> {
    state.patients.add_patient(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Patient added successfully" })),
    ))
}

pub async fn update_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PatientRequest>,
) -> ApiResult<impl IntoResponse> {
    let rows_affected = state.patients.update_patient(&request).await?;
    Ok(Json(RowsAffected { rows_affected }))
}

pub async fn add_appointment(
    State(state): State<AppState>,
    ApiJson(appointment): ApiJson<NewAppointment>,
) -> ApiResult<impl IntoResponse> {
    let rows_affected = state.patients.add_appointment(&appointment).await?;
    Ok((StatusCode::CREATED, Json(RowsAffected { rows_affected })))
}

pub async fn add_medical_history(
    State(state): State<AppState>,
    ApiJson(entry): ApiJson<NewMedicalHistory>,
) -> ApiResult<impl IntoResponse> {
    let rows_affected = state.patients.add_medical_history(&entry).await?;
    Ok((StatusCode::CREATED, Json(RowsAffected { rows_affected })))
}

// ---- employees ----

pub async fn list_employees(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.employees.list_employees().await?))
}

pub async fn search_employees(
    State(state): State<AppState>,
    ApiQuery(search): ApiQuery<EmployeeSearch>,
) -> ApiResult<impl IntoResponse> {
    let found = state
        .employees
        .search_employees(&search.employee_id, &search.first_name, &search.last_name)
        .await?;
    Ok(Json(found))
}

pub async fn get_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.employees.get_employee(&employee_id).await?))
}

pub async fn add_employee(
    State(state): State<AppState>,
    ApiJson(employee): ApiJson<NewEmployee>,
) -> ApiResult<impl IntoResponse> {
    let rows_affected = state.employees.add_employee(&employee).await?;
    Ok((StatusCode::CREATED, Json(RowsAffected { rows_affected })))
}

pub async fn update_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    ApiJson(changes): ApiJson<EmployeeChanges>,
) -> ApiResult<impl IntoResponse> {
    let rows_affected = state.employees.update_employee(&employee_id, &changes).await?;
    Ok(Json(RowsAffected { rows_affected }))
}
