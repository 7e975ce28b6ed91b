use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::db::{create_pool, get_all_teams, get_latest_run, get_team_by_id, get_team_facts, init_database_with_pool};
use crate::models::{ApiResponse, GameTeamFact, PipelineRun, TeamEntity};

const DEFAULT_GAME_LIMIT: i64 = 20;
const MAX_GAME_LIMIT: i64 = 200;

pub async fn serve(config: &AppConfig, port: u16) -> anyhow::Result<()> {
    let pool = create_pool(config).await?;
    init_database_with_pool(&pool).await?;

    let app = create_router().with_state(pool);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("CourtForge API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<SqlitePool> {
    Router::new()
        .route("/health", get(health_check))
        .route("/runs/latest", get(latest_run_handler))
        .route("/teams", get(list_teams_handler))
        .route("/teams/{id}", get(team_handler))
        .route("/teams/{id}/games", get(team_games_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("CourtForge API is running"))
}

// GET /runs/latest - Most recent published run
async fn latest_run_handler(
    State(pool): State<SqlitePool>,
) -> Result<Json<ApiResponse<PipelineRun>>, StatusCode> {
    match get_latest_run(&pool).await {
        Ok(Some(run)) => Ok(Json(ApiResponse::success(run))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch latest run: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /teams - Published team dimension
async fn list_teams_handler(
    State(pool): State<SqlitePool>,
) -> Result<Json<ApiResponse<Vec<TeamEntity>>>, StatusCode> {
    match get_all_teams(&pool).await {
        Ok(teams) => Ok(Json(ApiResponse::success(teams))),
        Err(e) => {
            tracing::error!("Failed to fetch teams: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /teams/{id}
async fn team_handler(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<TeamEntity>>, StatusCode> {
    match get_team_by_id(&pool, &team_id).await {
        Ok(Some(team)) => Ok(Json(ApiResponse::success(team))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch team {}: {}", team_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Deserialize)]
struct TeamGamesQuery {
    limit: Option<i64>,
}

// GET /teams/{id}/games?limit= - Team's most recent facts, newest first
async fn team_games_handler(
    State(pool): State<SqlitePool>,
    Path(team_id): Path<String>,
    Query(params): Query<TeamGamesQuery>,
) -> Result<Json<ApiResponse<Vec<GameTeamFact>>>, StatusCode> {
    let limit = params.limit.unwrap_or(DEFAULT_GAME_LIMIT).clamp(1, MAX_GAME_LIMIT);

    match get_team_by_id(&pool, &team_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to fetch team {}: {}", team_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    match get_team_facts(&pool, &team_id, limit).await {
        Ok(facts) => Ok(Json(ApiResponse::success(facts))),
        Err(e) => {
            tracing::error!("Failed to fetch games for {}: {}", team_id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
