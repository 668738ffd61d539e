//! REST API for the doctor dashboard service.
//!
//! ## Purpose
//! Exposes the activation workflow (admin) and the doctor dashboard
//! (statistics, patients, appointments) over HTTP, with OpenAPI docs served
//! from `/swagger-ui`.
//!
//! All endpoints require the gateway-validated identity headers; dashboard
//! endpoints additionally require the DOCTOR role and a matching doctor
//! record, activation endpoints the ADMIN role.

use axum::extract::{Path as AxumPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use api_shared::auth::AuthError;
use api_shared::{CallerIdentity, HealthRes, HealthService, Role};
use dds_core::entities::ConsultationOutcome;
use dds_core::services::{
    ActivationService, AppointmentListQuery, AppointmentService, AssignmentService,
    DashboardService, PatientListQuery, ProcessActivation, ScheduleAppointment,
};
use dds_core::store::PageRequest;
use dds_core::{CoreConfig, CoreError};

pub mod dto;

use dto::{
    AppointmentCountRes, AppointmentListRes, AppointmentRes, AssignPatientReq,
    CancelAppointmentReq, CompleteAppointmentReq, DashboardStatisticsRes, MessageRes,
    PatientCountRes, PatientListRes, PatientSummaryRes, PendingCountRes, PendingDoctorRes,
    ProcessActivationReq, RelationshipRes, ScheduleAppointmentReq,
};

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<CoreConfig>,
    pub activation: Arc<ActivationService>,
    pub assignments: Arc<AssignmentService>,
    pub appointments: Arc<AppointmentService>,
    pub dashboard: Arc<DashboardService>,
}

/// Error wrapper mapping core failures onto HTTP statuses.
///
/// NotFound→404, InvalidArgument→400, Conflict→409; adapter failures are
/// logged and surface as an opaque 500.
pub enum ApiError {
    Core(CoreError),
    Auth(AuthError),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError::Core(e)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Auth(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let core = match self {
            ApiError::Auth(e) => return e.into_response(),
            ApiError::Core(e) => e,
        };
        let status = match &core {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CoreError::Conflict(_) => StatusCode::CONFLICT,
            CoreError::Store(_) | CoreError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %core, "request failed");
            return (status, Json(serde_json::json!({ "error": "internal error" })))
                .into_response();
        }
        (status, Json(serde_json::json!({ "error": core.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        dashboard_statistics,
        patient_list,
        assign_patient,
        terminate_patient,
        patient_count,
        appointment_list,
        upcoming_appointments,
        today_appointments,
        appointment_count,
        schedule_appointment,
        confirm_appointment,
        check_in_appointment,
        complete_appointment,
        cancel_appointment,
        no_show_appointment,
        list_pending_activations,
        pending_activation_count,
        process_activation,
    ),
    components(schemas(
        HealthRes,
        MessageRes,
        DashboardStatisticsRes,
        PatientListRes,
        PatientSummaryRes,
        PatientCountRes,
        AppointmentListRes,
        AppointmentRes,
        AppointmentCountRes,
        AssignPatientReq,
        RelationshipRes,
        ScheduleAppointmentReq,
        CompleteAppointmentReq,
        CancelAppointmentReq,
        PendingDoctorRes,
        PendingCountRes,
        ProcessActivationReq,
    ))
)]
struct ApiDoc;

/// Build the service router with Swagger UI and CORS attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/doctors/dashboard/statistics", get(dashboard_statistics))
        .route("/api/doctors/dashboard/patients", get(patient_list))
        .route("/api/doctors/dashboard/patients", post(assign_patient))
        .route(
            "/api/doctors/dashboard/patients/:patient_user_id",
            delete(terminate_patient),
        )
        .route("/api/doctors/dashboard/patients/count", get(patient_count))
        .route("/api/doctors/dashboard/appointments", get(appointment_list))
        .route("/api/doctors/dashboard/appointments", post(schedule_appointment))
        .route(
            "/api/doctors/dashboard/appointments/upcoming",
            get(upcoming_appointments),
        )
        .route("/api/doctors/dashboard/appointments/today", get(today_appointments))
        .route("/api/doctors/dashboard/appointments/count", get(appointment_count))
        .route(
            "/api/doctors/dashboard/appointments/:id/confirm",
            post(confirm_appointment),
        )
        .route(
            "/api/doctors/dashboard/appointments/:id/check-in",
            post(check_in_appointment),
        )
        .route(
            "/api/doctors/dashboard/appointments/:id/complete",
            post(complete_appointment),
        )
        .route(
            "/api/doctors/dashboard/appointments/:id/cancel",
            post(cancel_appointment),
        )
        .route(
            "/api/doctors/dashboard/appointments/:id/no-show",
            post(no_show_appointment),
        )
        .route("/api/admin/activations/pending", get(list_pending_activations))
        .route(
            "/api/admin/activations/pending/count",
            get(pending_activation_count),
        )
        .route("/api/admin/activations/process", post(process_activation))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn page_request(cfg: &CoreConfig, page: Option<u32>, size: Option<u32>) -> PageRequest {
    let size = size
        .unwrap_or_else(|| cfg.default_page_size())
        .clamp(1, cfg.max_page_size());
    PageRequest::new(page.unwrap_or(0), size)
}

// ============================================================================
// HEALTH
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint.
///
/// Used for monitoring and load balancer health checks; requires no
/// identity headers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

// ============================================================================
// DASHBOARD
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/statistics",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStatisticsRes),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "Caller is not a doctor"),
        (status = 404, description = "No doctor record for the caller")
    )
)]
/// Dashboard statistics for the calling doctor
///
/// Patient and appointment totals, today's numbers, weekly and monthly
/// activity, and new-patient counts, computed for the doctor owned by the
/// authenticated user id.
#[axum::debug_handler]
async fn dashboard_statistics(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<DashboardStatisticsRes> {
    identity.require_role(Role::Doctor)?;
    tracing::info!(user_id = %identity.user_id, "dashboard statistics requested");
    let stats = state.dashboard.statistics(&identity.user_id).await?;
    Ok(Json(stats.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
struct PatientListParams {
    /// ACTIVE (default), INACTIVE, TERMINATED or ALL.
    status: Option<String>,
    /// Case-insensitive substring over names and email.
    search: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/patients",
    params(PatientListParams),
    responses(
        (status = 200, description = "Paged patient summaries", body = PatientListRes),
        (status = 400, description = "Invalid status filter")
    )
)]
/// The calling doctor's patient list
///
/// Relationship rows stitched with user-directory records, newest
/// assignment first. Patients missing from the directory are skipped.
#[axum::debug_handler]
async fn patient_list(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Query(params): Query<PatientListParams>,
) -> ApiResult<PatientListRes> {
    identity.require_role(Role::Doctor)?;
    let query = PatientListQuery {
        status: params.status.unwrap_or_else(|| "ACTIVE".into()),
        search: params.search,
        page: page_request(&state.cfg, params.page, params.size),
    };
    let page = state.dashboard.patients(&identity.user_id, query).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/patients",
    request_body = AssignPatientReq,
    responses(
        (status = 200, description = "Relationship (created or pre-existing)", body = RelationshipRes),
        (status = 404, description = "Patient unknown to the user directory")
    )
)]
/// Assign a patient to the calling doctor
///
/// Idempotent: assigning an already-assigned patient returns the existing
/// relationship unchanged.
#[axum::debug_handler]
async fn assign_patient(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Json(req): Json<AssignPatientReq>,
) -> ApiResult<RelationshipRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let relationship = state
        .assignments
        .assign(&doctor.id, &req.patient_user_id)
        .await?;
    Ok(Json(relationship.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
struct TerminateParams {
    reason: Option<String>,
}

#[utoipa::path(
    delete,
    path = "/api/doctors/dashboard/patients/{patient_user_id}",
    params(
        ("patient_user_id" = String, Path, description = "Patient user id"),
        TerminateParams
    ),
    responses(
        (status = 200, description = "Terminated relationship", body = RelationshipRes),
        (status = 404, description = "Patient is not assigned to this doctor")
    )
)]
/// End the relationship with a patient. The ledger row is kept for history.
#[axum::debug_handler]
async fn terminate_patient(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(patient_user_id): AxumPath<String>,
    Query(params): Query<TerminateParams>,
) -> ApiResult<RelationshipRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let relationship = state
        .assignments
        .terminate(&doctor.id, &patient_user_id, params.reason.as_deref())
        .await?;
    Ok(Json(relationship.into()))
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/patients/count",
    responses(
        (status = 200, description = "Patient counts by status", body = PatientCountRes)
    )
)]
/// Patient counts by relationship status.
#[axum::debug_handler]
async fn patient_count(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<PatientCountRes> {
    identity.require_role(Role::Doctor)?;
    let counts = state.dashboard.patient_counts(&identity.user_id).await?;
    Ok(Json(counts.into()))
}

#[derive(Debug, Deserialize, IntoParams)]
struct AppointmentListParams {
    /// An appointment status (default SCHEDULED) or ALL.
    status: Option<String>,
    /// Inclusive start date, YYYY-MM-DD. Defaults to today.
    from: Option<String>,
    /// Inclusive end date, YYYY-MM-DD. Defaults to one year from today.
    to: Option<String>,
    page: Option<u32>,
    size: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/appointments",
    params(AppointmentListParams),
    responses(
        (status = 200, description = "Paged appointments", body = AppointmentListRes),
        (status = 400, description = "Invalid status or date filter")
    )
)]
/// The calling doctor's appointments
///
/// Filtered by status and an inclusive calendar-date window, start time
/// ascending.
#[axum::debug_handler]
async fn appointment_list(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Query(params): Query<AppointmentListParams>,
) -> ApiResult<AppointmentListRes> {
    identity.require_role(Role::Doctor)?;
    let query = AppointmentListQuery {
        status: params.status.unwrap_or_else(|| "SCHEDULED".into()),
        from: params.from,
        to: params.to,
        page: page_request(&state.cfg, params.page, params.size),
    };
    let page = state.dashboard.appointments(&identity.user_id, query).await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/appointments/upcoming",
    responses(
        (status = 200, description = "Appointments in the next 7 days", body = [AppointmentRes])
    )
)]
/// Upcoming appointments (next 7 days), start time ascending.
#[axum::debug_handler]
async fn upcoming_appointments(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<Vec<AppointmentRes>> {
    identity.require_role(Role::Doctor)?;
    let upcoming = state.dashboard.upcoming(&identity.user_id).await?;
    Ok(Json(upcoming.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/appointments/today",
    responses(
        (status = 200, description = "Today's appointments", body = [AppointmentRes])
    )
)]
/// Today's schedule, start time ascending.
#[axum::debug_handler]
async fn today_appointments(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<Vec<AppointmentRes>> {
    identity.require_role(Role::Doctor)?;
    let today = state.dashboard.today(&identity.user_id).await?;
    Ok(Json(today.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/doctors/dashboard/appointments/count",
    responses(
        (status = 200, description = "Appointment counts by status", body = AppointmentCountRes)
    )
)]
/// Appointment counts by status.
#[axum::debug_handler]
async fn appointment_count(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<AppointmentCountRes> {
    identity.require_role(Role::Doctor)?;
    let counts = state.dashboard.appointment_counts(&identity.user_id).await?;
    Ok(Json(counts.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments",
    request_body = ScheduleAppointmentReq,
    responses(
        (status = 200, description = "Booked appointment", body = AppointmentRes),
        (status = 400, description = "Start not in the future, or invalid type"),
        (status = 404, description = "Patient unknown to the user directory"),
        (status = 409, description = "Window overlaps an existing appointment")
    )
)]
/// Book an appointment for the calling doctor
///
/// Runs the conflict check before insert, caches the patient's contact
/// details on the row, and records the booking on the assignment ledger.
#[axum::debug_handler]
async fn schedule_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Json(req): Json<ScheduleAppointmentReq>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state
        .appointments
        .schedule(
            &doctor.id,
            ScheduleAppointment {
                patient_user_id: req.patient_user_id,
                start_time: req.appointment_date,
                duration_minutes: req.duration_minutes,
                appointment_type: req.appointment_type,
                reason_for_visit: req.reason_for_visit,
                symptoms: req.symptoms,
                patient_notes: req.patient_notes,
                consultation_fee: req.consultation_fee,
                created_by: Some(identity.user_id.clone()),
            },
        )
        .await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments/{id}/confirm",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Confirmed appointment", body = AppointmentRes),
        (status = 409, description = "Not in SCHEDULED state")
    )
)]
/// Confirm a scheduled appointment.
#[axum::debug_handler]
async fn confirm_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state.appointments.confirm(&doctor.id, &id).await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments/{id}/check-in",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment now in progress", body = AppointmentRes),
        (status = 409, description = "Not in a schedulable state")
    )
)]
/// Record the patient's arrival.
#[axum::debug_handler]
async fn check_in_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state.appointments.check_in(&doctor.id, &id).await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments/{id}/complete",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = CompleteAppointmentReq,
    responses(
        (status = 200, description = "Completed appointment", body = AppointmentRes),
        (status = 409, description = "Already in a terminal state")
    )
)]
/// Complete an appointment with its consultation outcome
///
/// Also counts the consultation on the doctor↔patient ledger.
#[axum::debug_handler]
async fn complete_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<CompleteAppointmentReq>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state
        .appointments
        .complete(
            &doctor.id,
            &id,
            ConsultationOutcome {
                diagnosis: req.diagnosis,
                prescription: req.prescription,
                treatment_plan: req.treatment_plan,
                notes: req.notes,
            },
        )
        .await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = CancelAppointmentReq,
    responses(
        (status = 200, description = "Cancelled appointment", body = AppointmentRes),
        (status = 409, description = "Less than 24h notice or not schedulable")
    )
)]
/// Cancel an appointment, subject to the 24-hour notice rule.
#[axum::debug_handler]
async fn cancel_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<CancelAppointmentReq>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state
        .appointments
        .cancel(&doctor.id, &id, &identity.user_id, req.reason.as_deref())
        .await?;
    Ok(Json(appointment.into()))
}

#[utoipa::path(
    post,
    path = "/api/doctors/dashboard/appointments/{id}/no-show",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment marked as no-show", body = AppointmentRes),
        (status = 409, description = "Already in a terminal state")
    )
)]
/// Mark the patient as a no-show.
#[axum::debug_handler]
async fn no_show_appointment(
    State(state): State<AppState>,
    identity: CallerIdentity,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<AppointmentRes> {
    identity.require_role(Role::Doctor)?;
    let doctor = state.dashboard.doctor_for_user(&identity.user_id).await?;
    let appointment = state.appointments.mark_no_show(&doctor.id, &id).await?;
    Ok(Json(appointment.into()))
}

// ============================================================================
// ACTIVATION (ADMIN)
// ============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/activations/pending",
    responses(
        (status = 200, description = "Doctors awaiting activation", body = [PendingDoctorRes]),
        (status = 403, description = "Caller is not an admin")
    )
)]
/// Doctors awaiting activation review.
#[axum::debug_handler]
async fn list_pending_activations(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<Vec<PendingDoctorRes>> {
    identity.require_role(Role::Admin)?;
    let pending = state.activation.pending_doctors().await?;
    Ok(Json(pending.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/activations/pending/count",
    responses(
        (status = 200, description = "Count of pending requests", body = PendingCountRes)
    )
)]
/// Count of unprocessed activation requests.
#[axum::debug_handler]
async fn pending_activation_count(
    State(state): State<AppState>,
    identity: CallerIdentity,
) -> ApiResult<PendingCountRes> {
    identity.require_role(Role::Admin)?;
    let pending = state.activation.count_pending().await?;
    Ok(Json(PendingCountRes { pending }))
}

#[utoipa::path(
    post,
    path = "/api/admin/activations/process",
    request_body = ProcessActivationReq,
    responses(
        (status = 200, description = "Decision applied", body = MessageRes),
        (status = 400, description = "Unknown action"),
        (status = 404, description = "Doctor or request not found"),
        (status = 409, description = "Request already processed")
    )
)]
/// Apply an APPROVE/REJECT decision to a doctor's activation request
///
/// The decision is persisted before the notification is attempted; a
/// notification failure never fails this call.
#[axum::debug_handler]
async fn process_activation(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Json(req): Json<ProcessActivationReq>,
) -> ApiResult<MessageRes> {
    identity.require_role(Role::Admin)?;
    state
        .activation
        .process(ProcessActivation {
            doctor_id: req.doctor_id,
            action: req.action,
            notes: req.notes,
            admin_id: identity.user_id.clone(),
            admin_email: identity.email.clone().unwrap_or_default(),
        })
        .await?;
    Ok(Json(MessageRes {
        message: "activation request processed".into(),
    }))
}
