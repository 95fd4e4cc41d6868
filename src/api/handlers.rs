use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::{dto::*, errors::ApiError};
use crate::domain::{LedgerStatistics, PositionState, Trade};
use crate::error::TradeError;
use crate::market::{format_mcap, Page};
use crate::services::{
    LiveTracker, LiveUpdate, PortfolioPoller, PortfolioSnapshot, PositionLedger, TradeDesk,
    TradeOutcome,
};

const MAX_HISTORY: usize = 1000;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<PositionLedger>,
    pub desk: Arc<TradeDesk>,
    pub tracker: Arc<LiveTracker>,
    pub portfolio: Arc<PortfolioPoller>,
}

/// GET /health - Health check
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "paper-trader"
    }))
}

/// GET /portfolio - Open positions and recent realized trades
pub async fn get_portfolio(
    State(state): State<AppState>,
) -> Result<Json<PortfolioSnapshot>, ApiError> {
    let snapshot = state.portfolio.refresh().await?;
    Ok(Json(snapshot.as_ref().clone()))
}

/// GET /positions - List open positions
pub async fn list_positions(
    State(state): State<AppState>,
) -> Result<Json<Vec<PositionDto>>, ApiError> {
    let positions = state.ledger.open_positions().await?;
    Ok(Json(positions.into_iter().map(PositionDto::from).collect()))
}

/// GET /positions/:mint - Position with its latest live reading
pub async fn get_position(
    State(state): State<AppState>,
    Path(mint): Path<String>,
) -> Result<Json<PositionDetailsDto>, ApiError> {
    let position = state
        .ledger
        .position(&mint)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No open position for {}", mint)))?;

    Ok(Json(PositionDetailsDto {
        position: PositionDto::from(position),
        live: state.tracker.latest(&mint).await,
    }))
}

/// GET /trades - Realized trades, newest first
pub async fn list_trades(
    State(state): State<AppState>,
    Query(query): Query<TradeHistoryQuery>,
) -> Result<Json<Vec<Trade>>, ApiError> {
    let limit = query.limit.unwrap_or(10).min(MAX_HISTORY);
    Ok(Json(state.ledger.realized_trades(limit).await?))
}

/// GET /statistics - Ledger totals
pub async fn get_statistics(
    State(state): State<AppState>,
) -> Result<Json<LedgerStatistics>, ApiError> {
    Ok(Json(state.ledger.statistics().await?))
}

/// GET /live - Latest live reading of every tracked position
pub async fn list_live(State(state): State<AppState>) -> Json<Vec<LiveUpdate>> {
    let mut updates = state.tracker.all_latest().await;
    updates.sort_by(|a, b| a.mint.cmp(&b.mint));
    Json(updates)
}

/// POST /live - Overlay view for a page the client is showing
pub async fn observe_page(
    State(state): State<AppState>,
    Json(payload): Json<PageRequest>,
) -> Result<Json<LiveViewDto>, ApiError> {
    let mint = payload.resolve_mint().ok_or(TradeError::MissingMint)?;

    let reading = state.desk.read_page(&mint, payload.html.clone()).await?;
    let position = state.ledger.position(&mint).await?;
    let live = match payload.html {
        Some(html) => state.tracker.observe(&Page::new(mint.clone(), html)).await?,
        None => state.tracker.latest(&mint).await,
    };

    Ok(Json(LiveViewDto {
        mint,
        market_cap_display: format!("${}", format_mcap(reading.market_cap)),
        market_cap: reading.market_cap,
        state: PositionState::of(position.as_ref()),
        live,
    }))
}

/// POST /trades/buy - Paper buy one unit
pub async fn buy(
    State(state): State<AppState>,
    Json(payload): Json<PageRequest>,
) -> Result<Json<TradeOutcome>, ApiError> {
    let mint = payload.resolve_mint().ok_or(TradeError::MissingMint)?;
    Ok(Json(state.desk.buy(&mint, payload.html).await?))
}

/// POST /trades/sell - Paper sell the whole position
pub async fn sell_all(
    State(state): State<AppState>,
    Json(payload): Json<PageRequest>,
) -> Result<Json<TradeOutcome>, ApiError> {
    let mint = payload.resolve_mint().ok_or(TradeError::MissingMint)?;
    Ok(Json(state.desk.sell_all(&mint, payload.html).await?))
}

/// POST /reset - Clear all positions and trades
pub async fn reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    state.desk.reset(payload.confirm).await?;
    state.portfolio.refresh().await?;

    Ok(Json(ResetResponse {
        message: "All positions and trades cleared".to_string(),
    }))
}
