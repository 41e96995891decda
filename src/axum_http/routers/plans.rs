use crate::{
    auth::AuthUser,
    domain::repositories::plans::PlanRepository,
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad, repositories::plans::PlanPostgres,
    },
    usecases::plans::PlanUseCase,
};
use axum::{
    Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get,
};
use std::sync::Arc;
use tracing::{error, info};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let plans_usecase = PlanUseCase::new(Arc::new(plan_repository));

    Router::new()
        .route("/", get(list_plans))
        .with_state(Arc::new(plans_usecase))
}

pub async fn list_plans<P>(
    State(usecase): State<Arc<PlanUseCase<P>>>,
    AuthUser { user_id, .. }: AuthUser,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    info!(%user_id, "plans: list request received");
    match usecase.list_plans().await {
        Ok(plans) => Json(plans).into_response(),
        Err(err) => {
            error!(%user_id, error = ?err, "plans: failed to list plans");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load plans".to_string(),
            )
                .into_response()
        }
    }
}
