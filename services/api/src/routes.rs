use crate::infra::{AppState, RosterState};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use rollcall::error::AppError;
use rollcall::workflows::roster::{
    FullTable, MappedRow, ParameterSet, ReportFormat, ReportKind, RosterError, RosterPipeline,
    RosterReports, RunParameterOverrides, RunParameters, RunPreset, RunSummary, TeacherCodeRow,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use tracing::{info, warn};

/// Exactly one of `roster_csv` and `roster_xlsx_base64` must be present.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    pub(crate) roster_csv: Option<String>,
    #[serde(default)]
    pub(crate) roster_xlsx_base64: Option<String>,
    #[serde(default)]
    pub(crate) preset: Option<RunPreset>,
    #[serde(default)]
    pub(crate) parameters: Option<RunParameterOverrides>,
    #[serde(default)]
    pub(crate) include_full: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DownloadQuery {
    #[serde(default)]
    pub(crate) format: Option<ReportFormat>,
}

enum RosterUpload {
    Csv(Vec<u8>),
    Workbook(Vec<u8>),
}

impl RosterUpload {
    fn from_request(
        roster_csv: Option<String>,
        roster_xlsx_base64: Option<String>,
    ) -> Result<Self, RosterError> {
        match (roster_csv, roster_xlsx_base64) {
            (Some(csv), None) => Ok(Self::Csv(csv.into_bytes())),
            (None, Some(encoded)) => BASE64
                .decode(encoded.trim())
                .map(Self::Workbook)
                .map_err(|err| RosterError::InvalidParameter {
                    parameter: "roster_xlsx_base64",
                    reason: format!("not valid base64: {err}"),
                }),
            (None, None) => Err(RosterError::InvalidParameter {
                parameter: "roster",
                reason: "provide roster_csv or roster_xlsx_base64".to_string(),
            }),
            (Some(_), Some(_)) => Err(RosterError::InvalidParameter {
                parameter: "roster",
                reason: "provide only one of roster_csv and roster_xlsx_base64".to_string(),
            }),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Csv(bytes) | Self::Workbook(bytes) => bytes,
        }
    }

    fn run(&self, pipeline: &RosterPipeline) -> Result<RosterReports, RosterError> {
        match self {
            Self::Csv(bytes) => pipeline.run_reader(bytes.as_slice()),
            Self::Workbook(bytes) => pipeline.run_workbook(Cursor::new(bytes.as_slice())),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    pub(crate) run_key: String,
    pub(crate) cached: bool,
    pub(crate) generated_at: DateTime<Utc>,
    pub(crate) parameters: RunParameters,
    pub(crate) summary: RunSummary,
    pub(crate) mapped: Vec<MappedRow>,
    pub(crate) teacher_codes: Vec<TeacherCodeRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) full: Option<FullTable>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ParameterSetView {
    pub(crate) key: &'static str,
    pub(crate) description: String,
    pub(crate) columns: Vec<&'static str>,
}

pub(crate) fn roster_router(state: RosterState) -> Router {
    Router::new()
        .route("/api/v1/roster/generate", post(generate_endpoint))
        .route("/api/v1/roster/reports/:kind", get(report_download_endpoint))
        .route("/api/v1/roster/parameter-sets", get(parameter_sets_endpoint))
        .with_state(state)
}

pub(crate) fn with_roster_routes(state: RosterState) -> Router {
    roster_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn parameter_sets_endpoint() -> Json<Vec<ParameterSetView>> {
    let views = ParameterSet::ordered()
        .into_iter()
        .map(|set| ParameterSetView {
            key: set.key(),
            description: set.description(),
            columns: set.fields().iter().map(|field| field.column()).collect(),
        })
        .collect();
    Json(views)
}

pub(crate) async fn generate_endpoint(
    State(state): State<RosterState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let GenerateRequest {
        roster_csv,
        roster_xlsx_base64,
        preset,
        parameters,
        include_full,
    } = payload;

    let upload = RosterUpload::from_request(roster_csv, roster_xlsx_base64)?;
    let base = preset.unwrap_or(state.default_preset).parameters();
    let params = parameters.unwrap_or_default().apply(base);
    let pipeline = RosterPipeline::new(params)?.with_max_students(state.max_students);

    let key = pipeline.run_key(upload.bytes());

    let (reports, cached) = {
        let mut cache = state.reports.lock().expect("report cache mutex poisoned");
        let cached = cache.get(key).is_some();
        let outcome = cache.refresh(key, || upload.run(&pipeline));
        match outcome {
            Ok(reports) => (reports, cached),
            Err(err) => {
                warn!(%key, kind = ?err.kind(), error = %err, "roster run rejected");
                return Err(err.into());
            }
        }
    };

    info!(%key, cached, students = reports.summary.students, "roster run served");

    Ok(Json(GenerateResponse {
        run_key: key.to_string(),
        cached,
        generated_at: Utc::now(),
        parameters: pipeline.parameters().clone(),
        summary: reports.summary.clone(),
        mapped: reports.mapped.clone(),
        teacher_codes: reports.teacher_codes.clone(),
        full: include_full.then(|| reports.full.clone()),
    }))
}

pub(crate) async fn report_download_endpoint(
    State(state): State<RosterState>,
    Path(kind): Path<String>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let kind: ReportKind = match kind.parse() {
        Ok(kind) => kind,
        Err(message) => {
            return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response())
        }
    };

    let latest = state
        .reports
        .lock()
        .expect("report cache mutex poisoned")
        .latest()
        .ok_or(AppError::ReportUnavailable(kind))?;
    let format = query.format.unwrap_or_default();
    let body = latest.render(kind, format)?;

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", kind.file_name(format)),
        ),
    ];
    Ok((StatusCode::OK, headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use rollcall::workflows::roster::DEFAULT_MAX_STUDENTS;
    use tower::ServiceExt;

    const SAMPLE_WORKBOOK: &[u8] =
        include_bytes!("../../../crates/rollcall/tests/fixtures/sample_roster.xlsx");

    async fn post_generate(app: Router, payload: serde_json::Value) -> Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/roster/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds")
    }

    const ROSTER: &str = "District,Block,School_ID,School,Total_Students\n\
                          District A,Block A,1001,School A,3\n\
                          District A,Block B,1002,School B,2\n";

    fn request(roster_csv: &str) -> GenerateRequest {
        GenerateRequest {
            roster_csv: Some(roster_csv.to_string()),
            roster_xlsx_base64: None,
            preset: None,
            parameters: None,
            include_full: false,
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn generate_endpoint_returns_roll_numbers() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        let Json(body) = generate_endpoint(State(state), Json(request(ROSTER)))
            .await
            .expect("run succeeds");

        assert!(!body.cached);
        assert_eq!(body.summary.students, 5);
        assert_eq!(body.mapped[0].roll_number, "100101001");
        assert_eq!(body.mapped[3].roll_number, "100201001");
        assert_eq!(body.teacher_codes.len(), 2);
        assert!(body.full.is_none());
    }

    #[tokio::test]
    async fn repeated_upload_is_served_from_cache() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        generate_endpoint(State(state.clone()), Json(request(ROSTER)))
            .await
            .expect("first run");
        let Json(body) = generate_endpoint(State(state), Json(request(ROSTER)))
            .await
            .expect("second run");
        assert!(body.cached);
    }

    #[tokio::test]
    async fn overrides_apply_on_top_of_requested_preset() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        let mut payload = request(ROSTER);
        payload.preset = Some(RunPreset::Custom);
        payload.parameters = Some(RunParameterOverrides {
            buffer_percent: Some(0.0),
            ..RunParameterOverrides::default()
        });
        payload.include_full = true;

        let Json(body) = generate_endpoint(State(state), Json(payload))
            .await
            .expect("run succeeds");
        assert_eq!(body.parameters.selected_param, ParameterSet::A1);
        assert_eq!(body.parameters.student_digits, 4);
        assert_eq!(body.summary.students, 5);
        assert_eq!(body.mapped[0].roll_number, "001010001");
        assert_eq!(body.full.expect("full table included").rows.len(), 5);
    }

    #[tokio::test]
    async fn missing_column_is_a_bad_request() {
        let app = roster_router(RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS));
        let payload = json!({ "roster_csv": "District,Block,School,Total_Students\nD,B,S,1\n" });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/roster/generate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "missing_column");
    }

    #[tokio::test]
    async fn downloads_are_unavailable_before_first_run() {
        let app = roster_router(RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/roster/reports/mapped")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_run_keeps_previous_downloads() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        generate_endpoint(State(state.clone()), Json(request(ROSTER)))
            .await
            .expect("first run");
        let duplicate = "District,Block,School_ID,School,Total_Students\n\
                         D,B,1,S1,1\nD,B,1,S2,1\n";
        generate_endpoint(State(state.clone()), Json(request(duplicate)))
            .await
            .expect_err("duplicate School_ID rejected");

        let response = roster_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/roster/reports/teacher-codes")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let text = String::from_utf8(bytes.to_vec()).expect("utf8 csv");
        assert_eq!(text, "School Name,Teacher Code\nSchool A,001\nSchool B,002\n");
    }

    #[tokio::test]
    async fn unknown_report_kind_is_not_found() {
        let app = roster_router(RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/roster/reports/summary")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn readiness_reflects_the_startup_flag() {
        let readiness = Arc::new(AtomicBool::new(false));
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        let app = with_roster_routes(RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS)).layer(Extension(
            AppState {
                readiness: readiness.clone(),
                metrics: Arc::new(metrics),
            },
        ));

        let ready = |app: Router| async move {
            app.oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds")
        };

        let response = ready(app.clone()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let response = ready(app).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn parameter_sets_are_listed_in_order() {
        let Json(sets) = parameter_sets_endpoint().await;
        assert_eq!(sets.len(), 8);
        assert_eq!(sets[0].key, "A1");
        assert_eq!(sets[0].description, "School + Grade + Student");
        assert_eq!(sets[0].columns, ["School_Code", "Grade", "student_no"]);
        assert_eq!(sets[7].columns.len(), 6);
    }

    #[tokio::test]
    async fn oversized_roster_is_rejected_and_previous_run_kept() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        generate_endpoint(State(state.clone()), Json(request(ROSTER)))
            .await
            .expect("first run");

        let huge = "District,Block,School_ID,School,Total_Students
D,B,1,S1,1e15
";
        let payload = json!({ "roster_csv": huge });
        let response = post_generate(roster_router(state.clone()), payload).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["kind"], "processing_failure");

        let latest = state
            .reports
            .lock()
            .expect("report cache mutex poisoned")
            .latest()
            .expect("previous run kept");
        assert_eq!(latest.summary.students, 5);
    }

    #[tokio::test]
    async fn workbook_upload_matches_the_csv_sample() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        let mut payload = request(ROSTER);
        payload.roster_csv = None;
        payload.roster_xlsx_base64 = Some(BASE64.encode(SAMPLE_WORKBOOK));

        let Json(body) = generate_endpoint(State(state), Json(payload))
            .await
            .expect("workbook run succeeds");
        assert_eq!(body.summary.schools, 5);
        assert_eq!(body.summary.students, 962);
        assert_eq!(body.teacher_codes.len(), 5);
    }

    #[tokio::test]
    async fn roster_must_be_given_exactly_once() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        for payload in [
            json!({}),
            json!({ "roster_csv": ROSTER, "roster_xlsx_base64": BASE64.encode(SAMPLE_WORKBOOK) }),
            json!({ "roster_xlsx_base64": "not base64!" }),
        ] {
            let response = post_generate(roster_router(state.clone()), payload).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["kind"], "invalid_parameter");
        }
    }

    #[tokio::test]
    async fn reports_download_as_xlsx_on_request() {
        let state = RosterState::new(RunPreset::Standard, DEFAULT_MAX_STUDENTS);
        generate_endpoint(State(state.clone()), Json(request(ROSTER)))
            .await
            .expect("first run");

        let response = roster_router(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/roster/reports/mapped?format=xlsx")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            ReportFormat::Xlsx.content_type()
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Student_Ids_Mapped.xlsx\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        assert!(bytes.starts_with(b"PK"));
    }
}
