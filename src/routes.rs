// region:    --- Imports
use crate::handlers::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

// endregion: --- Imports

/// 전체 라우터
pub fn router(state: AppState) -> Router {
    // 브라우저 클라이언트를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = state.config.max_body_bytes;

    let auth = Router::new()
        .route("/auth/signup", post(handlers::handle_signup))
        .route("/auth/login", post(handlers::handle_login))
        .route("/auth/logout", post(handlers::handle_logout))
        .route("/me", get(handlers::handle_me));

    let auctions = Router::new()
        .route("/fees", get(handlers::handle_get_fees))
        .route("/auctions", get(handlers::handle_get_auctions))
        .route("/auctions/:id", get(handlers::handle_get_auction))
        .route(
            "/auctions/:id/countdown",
            get(handlers::handle_countdown_stream),
        )
        .route(
            "/auctions/:id/bids",
            get(handlers::handle_get_bids).post(handlers::handle_place_bid),
        )
        .route("/auctions/:id/bids/stream", get(handlers::handle_bid_stream));

    let cart = Router::new()
        .route(
            "/cart",
            get(handlers::handle_get_cart).post(handlers::handle_add_to_cart),
        )
        .route("/cart/:auction_id", delete(handlers::handle_remove_from_cart))
        .route("/cart/checkout", post(handlers::handle_checkout));

    let dashboard = Router::new()
        .route("/dashboard", get(handlers::handle_dashboard))
        .route(
            "/dashboard/participations/:id/exit",
            post(handlers::handle_exit),
        )
        .route(
            "/dashboard/participations/:id/email",
            get(handlers::handle_email_preview),
        );

    let admin = Router::new()
        .route("/admin/dashboard", get(handlers::handle_admin_dashboard))
        .route(
            "/admin/listings",
            get(handlers::handle_admin_listings).post(handlers::handle_add_listing),
        )
        .route(
            "/admin/listings/:id",
            delete(handlers::handle_delete_listing),
        )
        .route(
            "/admin/listings/:id/resolve",
            post(handlers::handle_resolve),
        )
        .route("/admin/users", get(handlers::handle_admin_users))
        .route("/admin/reports", get(handlers::handle_admin_reports));

    Router::new()
        .merge(auth)
        .merge(auctions)
        .merge(cart)
        .merge(dashboard)
        .merge(admin)
        .layer(cors)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
