use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use fortune_core::{
    AuditEntry, Member, NewPrize, Prize, PrizeUpdate, ResetScope, Role, SpinRecord,
};
use fortune_shared::{
    ApiError, AuditEntryOut, CheckOut, MemberCreateRequest, MemberOut, PrizeCreateRequest,
    PrizeOut, PrizeUpdateRequest, ReorderRequest, ResetOut, RoleChangeRequest, SpinOut,
    SpinResultOut, StatusOut,
};
use serde::Deserialize;

use crate::{error::HttpError, identity::Caller, AppState};

type Shared = State<Arc<AppState>>;
type ApiJson<T> = Result<Json<T>, HttpError>;

const DEFAULT_AUDIT_PAGE: i64 = 100;

pub fn router(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .route("/prizes", get(route_prizes))
        .route("/spin", post(route_spin))
        .route("/check/:identity_id", get(route_check));

    let admin = Router::new()
        .route("/prizes", get(route_admin_prizes).post(route_create_prize))
        .route("/prizes/reorder", put(route_reorder_prizes))
        .route("/prizes/:id", put(route_update_prize).delete(route_delete_prize))
        .route("/results", get(route_results))
        .route("/results/:identity_id", delete(route_reset_one))
        .route("/reset", post(route_reset_all))
        .route("/audit", get(route_audit))
        .route("/users", get(route_members).post(route_add_member))
        .route(
            "/users/:identity_id",
            put(route_change_role).delete(route_remove_member),
        );

    Router::new()
        .route("/health", get(route_health))
        .nest("/api", public)
        .nest("/api/admin", admin)
        .with_state(state)
}

async fn route_health() -> Json<StatusOut> {
    Json(StatusOut::ok())
}

async fn route_prizes(State(state): Shared) -> ApiJson<Vec<PrizeOut>> {
    let prizes = state.fortune.prizes.list_active().await?;
    Ok(Json(prizes.into_iter().map(prize_out).collect()))
}

async fn route_spin(State(state): Shared, Caller(identity): Caller) -> ApiJson<SpinOut> {
    let prize = state.fortune.allocator.claim(&identity).await?;
    Ok(Json(SpinOut {
        prize_id: prize.id,
        prize_label: prize.label,
        prize_icon: prize.icon,
        prize_color: prize.color,
    }))
}

async fn route_check(State(state): Shared, Path(identity_id): Path<i64>) -> ApiJson<CheckOut> {
    let claimed = state.fortune.ledger.check_claimed(identity_id).await?;
    Ok(Json(CheckOut {
        has_played: claimed.is_some(),
        prize: claimed.map(|c| SpinOut {
            prize_id: c.prize_id,
            prize_label: c.label,
            prize_icon: c.icon,
            prize_color: c.color,
        }),
    }))
}

async fn route_admin_prizes(State(state): Shared, Caller(actor): Caller) -> ApiJson<Vec<PrizeOut>> {
    let prizes = state.fortune.admin.prizes(&actor).await?;
    Ok(Json(prizes.into_iter().map(prize_out).collect()))
}

async fn route_create_prize(
    State(state): Shared,
    Caller(actor): Caller,
    Json(req): Json<PrizeCreateRequest>,
) -> ApiJson<PrizeOut> {
    let new = NewPrize {
        label: req.label,
        icon: req.icon,
        color: req.color,
        position: req.position,
        active: req.is_active,
    };
    let prize = state.fortune.admin.create_prize(&actor, new).await?;
    Ok(Json(prize_out(prize)))
}

async fn route_update_prize(
    State(state): Shared,
    Caller(actor): Caller,
    Path(id): Path<i64>,
    Json(req): Json<PrizeUpdateRequest>,
) -> ApiJson<PrizeOut> {
    let patch = PrizeUpdate {
        label: req.label,
        icon: req.icon,
        color: req.color,
        active: req.is_active,
    };
    let prize = state.fortune.admin.update_prize(&actor, id, patch).await?;
    Ok(Json(prize_out(prize)))
}

async fn route_delete_prize(
    State(state): Shared,
    Caller(actor): Caller,
    Path(id): Path<i64>,
) -> ApiJson<StatusOut> {
    state.fortune.admin.delete_prize(&actor, id).await?;
    Ok(Json(StatusOut::ok()))
}

async fn route_reorder_prizes(
    State(state): Shared,
    Caller(actor): Caller,
    Json(req): Json<ReorderRequest>,
) -> ApiJson<StatusOut> {
    state.fortune.admin.reorder_prizes(&actor, &req.order).await?;
    Ok(Json(StatusOut::ok()))
}

async fn route_results(State(state): Shared, Caller(actor): Caller) -> ApiJson<Vec<SpinResultOut>> {
    let records = state.fortune.admin.results(&actor).await?;
    Ok(Json(records.into_iter().map(result_out).collect()))
}

async fn route_reset_one(
    State(state): Shared,
    Caller(actor): Caller,
    Path(identity_id): Path<i64>,
) -> ApiJson<ResetOut> {
    let removed = state
        .fortune
        .admin
        .reset_spins(&actor, ResetScope::Identity(identity_id))
        .await?;
    Ok(Json(ResetOut { removed }))
}

async fn route_reset_all(State(state): Shared, Caller(actor): Caller) -> ApiJson<ResetOut> {
    let removed = state.fortune.admin.reset_spins(&actor, ResetScope::All).await?;
    Ok(Json(ResetOut { removed }))
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<i64>,
}

async fn route_audit(
    State(state): Shared,
    Caller(actor): Caller,
    Query(query): Query<AuditQuery>,
) -> ApiJson<Vec<AuditEntryOut>> {
    let entries = state
        .fortune
        .admin
        .audit_log(&actor, query.limit.unwrap_or(DEFAULT_AUDIT_PAGE))
        .await?;
    Ok(Json(entries.into_iter().map(audit_out).collect()))
}

async fn route_members(State(state): Shared, Caller(actor): Caller) -> ApiJson<Vec<MemberOut>> {
    let members = state.fortune.admin.members(&actor).await?;
    Ok(Json(members.into_iter().map(member_out).collect()))
}

async fn route_add_member(
    State(state): Shared,
    Caller(actor): Caller,
    Json(req): Json<MemberCreateRequest>,
) -> ApiJson<MemberOut> {
    let role = parse_role(&req.role)?;
    let member = state
        .fortune
        .admin
        .add_member(&actor, req.identity_id, req.display_name, role)
        .await?;
    Ok(Json(member_out(member)))
}

async fn route_change_role(
    State(state): Shared,
    Caller(actor): Caller,
    Path(identity_id): Path<i64>,
    Json(req): Json<RoleChangeRequest>,
) -> ApiJson<MemberOut> {
    let role = parse_role(&req.role)?;
    let member = state
        .fortune
        .admin
        .change_role(&actor, identity_id, role)
        .await?;
    Ok(Json(member_out(member)))
}

async fn route_remove_member(
    State(state): Shared,
    Caller(actor): Caller,
    Path(identity_id): Path<i64>,
) -> ApiJson<StatusOut> {
    state.fortune.admin.remove_member(&actor, identity_id).await?;
    Ok(Json(StatusOut::ok()))
}

fn parse_role(raw: &str) -> Result<Role, HttpError> {
    raw.parse::<Role>()
        .map_err(|err| HttpError(ApiError::Invalid(err.to_string())))
}

fn prize_out(p: Prize) -> PrizeOut {
    PrizeOut {
        id: p.id,
        label: p.label,
        icon: p.icon,
        color: p.color,
        position: p.position,
        is_active: p.active,
    }
}

fn result_out(r: SpinRecord) -> SpinResultOut {
    SpinResultOut {
        id: r.id,
        identity_id: r.identity_id,
        display_name: r.display_name,
        prize_id: r.prize_id,
        prize_label: r.prize_label,
        created_at: r.created_at,
    }
}

fn member_out(m: Member) -> MemberOut {
    MemberOut {
        id: m.id,
        identity_id: m.identity_id,
        display_name: m.display_name,
        role: m.role.to_string(),
        added_by: m.added_by,
        created_at: m.created_at,
    }
}

fn audit_out(e: AuditEntry) -> AuditEntryOut {
    AuditEntryOut {
        id: e.id,
        actor_id: e.actor_id,
        actor_name: e.actor_name,
        action: e.action.to_string(),
        details: e.details,
        created_at: e.created_at,
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use fortune_core::{db, CoreConfig, OsRandom};
    use fortune_shared::ErrorBody;
    use tower::ServiceExt;

    use super::*;
    use crate::identity::{IDENTITY_ID_HEADER, IDENTITY_NAME_HEADER};

    const KEY: &str = "test-key";
    const ROOT: i64 = 1;

    async fn app() -> Router {
        let config = CoreConfig {
            admin_ids: vec![ROOT],
            ..CoreConfig::default()
        };
        let pool = db::connect_in_memory().await.unwrap();
        db::migrate(&pool).await.unwrap();
        db::seed(&pool, &config).await.unwrap();
        let fortune = fortune_core::Fortune::with_pool(pool, &config, Arc::new(OsRandom));
        router(Arc::new(AppState {
            fortune,
            gateway_key: KEY.into(),
        }))
    }

    fn request(method: &str, uri: &str, caller: Option<i64>, body: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = caller {
            builder = builder
                .header(header::AUTHORIZATION, format!("Bearer {KEY}"))
                .header(IDENTITY_ID_HEADER, id.to_string())
                .header(IDENTITY_NAME_HEADER, format!("user-{id}"));
        }
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn spin_once_then_conflict_then_check() {
        let app = app().await;
        let (status, body) = call(&app, request("POST", "/api/spin", Some(42), None)).await;
        assert_eq!(status, StatusCode::OK);
        let spin: SpinOut = serde_json::from_slice(&body).unwrap();

        let (status, body) = call(&app, request("POST", "/api/spin", Some(42), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let err: ErrorBody = serde_json::from_slice(&body).unwrap();
        assert!(!err.error.is_empty());

        let (status, body) = call(&app, request("GET", "/api/check/42", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let check: CheckOut = serde_json::from_slice(&body).unwrap();
        assert!(check.has_played);
        assert_eq!(check.prize, Some(spin));
    }

    #[tokio::test]
    async fn spin_requires_gateway_key() {
        let app = app().await;
        let (status, _) = call(&app, request("POST", "/api/spin", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .method("POST")
            .uri("/api/spin")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .header(IDENTITY_ID_HEADER, "42")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn public_prizes_and_health() {
        let app = app().await;
        let (status, body) = call(&app, request("GET", "/api/prizes", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let prizes: Vec<PrizeOut> = serde_json::from_slice(&body).unwrap();
        assert_eq!(prizes.len(), 6);
        assert!(prizes.windows(2).all(|w| w[0].position < w[1].position));

        let (status, _) = call(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_surface_rejects_strangers() {
        let app = app().await;
        let (status, _) = call(&app, request("GET", "/api/admin/results", Some(99), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = call(&app, request("GET", "/api/admin/results", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn partial_reorder_is_bad_request() {
        let app = app().await;
        let (status, _) = call(
            &app,
            request("PUT", "/api/admin/prizes/reorder", Some(ROOT), Some(r#"{"order":[1,2]}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn self_removal_is_conflict() {
        let app = app().await;
        let (status, _) = call(&app, request("DELETE", "/api/admin/users/1", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_role_is_bad_request() {
        let app = app().await;
        let (status, _) = call(
            &app,
            request(
                "POST",
                "/api/admin/users",
                Some(ROOT),
                Some(r#"{"identity_id":7,"role":"owner"}"#),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reset_one_then_spin_again() {
        let app = app().await;
        let (status, _) = call(&app, request("POST", "/api/spin", Some(42), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, request("DELETE", "/api/admin/results/42", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::OK);
        let reset: ResetOut = serde_json::from_slice(&body).unwrap();
        assert_eq!(reset.removed, 1);

        let (status, _) = call(&app, request("DELETE", "/api/admin/results/42", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, request("POST", "/api/spin", Some(42), None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, request("GET", "/api/admin/audit?limit=5", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::OK);
        let entries: Vec<AuditEntryOut> = serde_json::from_slice(&body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "reset_one");
    }

    #[tokio::test]
    async fn created_prize_comes_back_as_json() {
        let app = app().await;
        let (status, body) = call(
            &app,
            request(
                "POST",
                "/api/admin/prizes",
                Some(ROOT),
                Some(r##"{"label":"Cake","icon":"🍰","color":"#ffaa00","position":1}"##),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let prize: PrizeOut = serde_json::from_slice(&body).unwrap();
        assert_eq!((prize.label.as_str(), prize.position, prize.is_active), ("Cake", 1, true));

        let (_, body) = call(&app, request("GET", "/api/admin/audit", Some(ROOT), None)).await;
        let entries: Vec<AuditEntryOut> = serde_json::from_slice(&body).unwrap();
        assert_eq!(entries[0].action, "create_prize");
    }

    #[tokio::test]
    async fn non_positive_audit_limit_is_bad_request() {
        let app = app().await;
        let (status, _) = call(&app, request("GET", "/api/admin/audit?limit=0", Some(ROOT), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
