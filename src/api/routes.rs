use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::*;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))

        // Listing view
        .route("/portfolio", get(get_portfolio))
        .route("/positions", get(list_positions))
        .route("/positions/:mint", get(get_position))
        .route("/trades", get(list_trades))
        .route("/statistics", get(get_statistics))

        // Overlay
        .route("/live", get(list_live).post(observe_page))

        // User actions
        .route("/trades/buy", post(buy))
        .route("/trades/sell", post(sell_all))
        .route("/reset", post(reset))

        // WebSocket route
        .route("/ws", get(super::websocket::ws_handler))

        .with_state(state)
}
