// region:    --- Imports
use crate::admin::{
    self, AdminListing, AdminStats, ListingFilter, NewListingRequest, Reports, Resolution,
    UserFilter, UserRow,
};
use crate::auction::model::{Auction, Bid, EmailType, Participation, Profile};
use crate::bidding::commands::PlaceBidCommand;
use crate::bidding::ledger::{BidLedger, LedgerNotice, LedgerSnapshot};
use crate::cart::{self, Agreements, CartView, CheckoutReceipt};
use crate::catalog::{browse, AuctionCard, CatalogQuery};
use crate::config::Config;
use crate::dashboard::{self, Dashboard};
use crate::error::{MarketError, MarketResult};
use crate::fees::{fee_table, FeeRow};
use crate::notify::{EmailMessage, Mailer};
use crate::realtime::ChangeFeed;
use crate::session::{LoginRequest, Session, SessionInfo, SessionManager, SignupRequest};
use crate::store::MarketStore;
use crate::timer::Countdown;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use chrono::Utc;
use futures::stream::{self, Stream};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// endregion: --- Imports

// region:    --- App State
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub feed: ChangeFeed,
    pub sessions: Arc<SessionManager>,
    pub mailer: Arc<Mailer>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, feed: ChangeFeed, config: Config) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(Arc::clone(&store))),
            mailer: Arc::new(Mailer::new(Arc::clone(&store))),
            config: Arc::new(config),
            store,
            feed,
        }
    }

    fn ledger(&self, auction_id: i64) -> Arc<BidLedger> {
        BidLedger::new(
            auction_id,
            Arc::clone(&self.store),
            self.feed.clone(),
            self.config.bid_echo_timeout,
        )
    }
}

/// `Authorization: Bearer <token>` 헤더에서 세션 토큰 추출
fn bearer_token(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .and_then(|token| Uuid::parse_str(token.trim()).ok())
}

async fn optional_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    match bearer_token(headers) {
        Some(token) => state.sessions.get(token).await,
        None => None,
    }
}

async fn require_session(state: &AppState, headers: &HeaderMap) -> MarketResult<Session> {
    optional_session(state, headers)
        .await
        .ok_or(MarketError::Unauthenticated)
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> MarketResult<Session> {
    let session = require_session(state, headers).await?;
    if !session.is_admin() {
        return Err(MarketError::Forbidden);
    }
    Ok(session)
}
// endregion: --- App State

// region:    --- Auth Handlers

/// 회원가입
pub async fn handle_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> MarketResult<(StatusCode, Json<SessionInfo>)> {
    let info = state.sessions.signup(req).await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// 로그인
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> MarketResult<Json<SessionInfo>> {
    Ok(Json(state.sessions.login(req).await?))
}

/// 로그아웃
pub async fn handle_logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<StatusCode> {
    let token = bearer_token(&headers).ok_or(MarketError::Unauthenticated)?;
    state.sessions.logout(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 내 정보
pub async fn handle_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<Json<Profile>> {
    Ok(Json(require_session(&state, &headers).await?.user))
}

// endregion: --- Auth Handlers

// region:    --- Query Handlers

/// 카테고리별 수수료 표
pub async fn handle_get_fees() -> Json<Vec<FeeRow>> {
    Json(fee_table())
}

/// 경매 목록 조회
pub async fn handle_get_auctions(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> MarketResult<Json<Vec<AuctionCard>>> {
    info!("{:<12} --> 경매 목록 조회 {:?}", "HandlerQuery", query);
    let auctions = state.store.list_auctions().await?;
    Ok(Json(browse(auctions, &query, Utc::now())?))
}

/// 경매 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> MarketResult<Json<AuctionCard>> {
    info!("{:<12} --> 경매 조회 id: {}", "HandlerQuery", auction_id);
    let auction = state.store.get_auction(auction_id).await?;
    Ok(Json(AuctionCard::new(auction, Utc::now())))
}

/// 입찰 이력 조회
pub async fn handle_get_bids(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> MarketResult<Json<LedgerSnapshot>> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "HandlerQuery", auction_id);
    Ok(Json(state.ledger(auction_id).fetch().await?))
}

// endregion: --- Query Handlers

// region:    --- Stream Handlers

/// 카운트다운 스트림 (SSE). 연결이 끊기면 타이머도 멈춘다.
pub async fn handle_countdown_stream(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> MarketResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let auction = state.store.get_auction(auction_id).await?;
    let countdown = Countdown::start(auction.expiration_date);
    let receiver = countdown.subscribe();

    let events = stream::unfold(
        Some((countdown, receiver, true)),
        |pending| async move {
            let (countdown, mut receiver, first) = pending?;
            if !first && receiver.changed().await.is_err() {
                return None;
            }
            let value = *receiver.borrow_and_update();
            let event = Ok::<_, axum::Error>(
                Event::default().event("countdown").data(value.to_string()),
            );
            let next = (!value.is_expired()).then_some((countdown, receiver, false));
            Some((event, next))
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// 입찰 원장 스트림 (SSE). 첫 이벤트는 현재 스냅샷이다.
pub async fn handle_bid_stream(
    State(state): State<AppState>,
    Path(auction_id): Path<i64>,
) -> MarketResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let ledger = state.ledger(auction_id);
    // 조회와 구독 사이의 입찰을 놓치지 않도록 구독을 먼저 시작
    let watch = ledger.watch();
    let initial = ledger.fetch().await?;
    info!(
        "{:<12} --> 입찰 스트림 시작 id: {}",
        "HandlerStream", auction_id
    );

    let events = stream::unfold(
        Some((watch, Some(initial))),
        |pending| async move {
            let (mut watch, initial) = pending?;
            if let Some(snapshot) = initial {
                let event = Event::default().event("snapshot").json_data(&snapshot);
                return Some((event, Some((watch, None))));
            }
            match watch.next().await? {
                LedgerNotice::NewBid(snapshot) => {
                    let event = Event::default().event("new_bid").json_data(&snapshot);
                    Some((event, Some((watch, None))))
                }
                LedgerNotice::Closed => {
                    let event = Ok(Event::default().event("closed").data(""));
                    Some((event, None))
                }
            }
        },
    );

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// endregion: --- Stream Handlers

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_place_bid(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
    Json(cmd): Json<PlaceBidCommand>,
) -> MarketResult<(StatusCode, Json<Bid>)> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
    let session = optional_session(&state, &headers).await;
    let bid = state
        .ledger(auction_id)
        .place_bid(session.as_ref().map(|s| &s.user), cmd.amount)
        .await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub auction_id: i64,
}

/// 장바구니 조회
pub async fn handle_get_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<Json<CartView>> {
    Ok(Json(require_session(&state, &headers).await?.cart.view()))
}

/// 장바구니 담기
pub async fn handle_add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AddToCart>,
) -> MarketResult<Json<CartView>> {
    let session = require_session(&state, &headers).await?;
    let auction: Auction = state.store.get_auction(req.auction_id).await?;
    let view = state
        .sessions
        .update(session.token, |s| {
            s.cart.add(&auction, Utc::now())?;
            Ok(s.cart.view())
        })
        .await?;
    info!(
        "{:<12} --> 장바구니 담기 user: {}, auction: {}",
        "Command", session.user.id, auction.id
    );
    Ok(Json(view))
}

/// 장바구니 빼기
pub async fn handle_remove_from_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> MarketResult<Json<CartView>> {
    let session = require_session(&state, &headers).await?;
    let view = state
        .sessions
        .update(session.token, |s| {
            s.cart.remove(auction_id)?;
            Ok(s.cart.view())
        })
        .await?;
    Ok(Json(view))
}

/// 체크아웃
pub async fn handle_checkout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(agreements): Json<Agreements>,
) -> MarketResult<Json<CheckoutReceipt>> {
    let session = require_session(&state, &headers).await?;
    let receipt = cart::checkout(
        state.store.as_ref(),
        &state.mailer,
        &session.user,
        &session.cart,
        agreements,
    )
    .await?;

    // 기록된 경매만 장바구니에서 제거
    state
        .sessions
        .update(session.token, |s| {
            s.cart.remove_checked_out(&receipt.participations);
            Ok(())
        })
        .await?;
    Ok(Json(receipt))
}

// endregion: --- Command Handlers

// region:    --- Dashboard Handlers

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub kind: String,
}

/// 대시보드
pub async fn handle_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<Json<Dashboard>> {
    let session = require_session(&state, &headers).await?;
    Ok(Json(dashboard::load(state.store.as_ref(), session.user.id).await?))
}

/// 경매 참가 포기
pub async fn handle_exit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(participation_id): Path<i64>,
) -> MarketResult<Json<Participation>> {
    let session = require_session(&state, &headers).await?;
    let updated = dashboard::exit(
        state.store.as_ref(),
        &state.mailer,
        &session.user,
        participation_id,
    )
    .await?;
    Ok(Json(updated))
}

/// 이메일 미리보기
pub async fn handle_email_preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(participation_id): Path<i64>,
    Query(query): Query<EmailQuery>,
) -> MarketResult<Json<EmailMessage>> {
    let session = require_session(&state, &headers).await?;
    let kind: EmailType = query.kind.parse()?;
    let message =
        dashboard::email_preview(state.store.as_ref(), &session.user, participation_id, kind)
            .await?;
    Ok(Json(message))
}

// endregion: --- Dashboard Handlers

// region:    --- Admin Handlers

/// 관리자 대시보드
pub async fn handle_admin_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<Json<AdminStats>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        admin::dashboard_stats(state.store.as_ref(), Utc::now()).await?,
    ))
}

/// 관리자 경매 목록
pub async fn handle_admin_listings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ListingFilter>,
) -> MarketResult<Json<Vec<AdminListing>>> {
    require_admin(&state, &headers).await?;
    Ok(Json(
        admin::list_listings(state.store.as_ref(), &filter, Utc::now()).await?,
    ))
}

/// 경매 등록
pub async fn handle_add_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewListingRequest>,
) -> MarketResult<(StatusCode, Json<Auction>)> {
    let session = require_admin(&state, &headers).await?;
    let auction = admin::add_listing(state.store.as_ref(), &session.user, req).await?;
    Ok((StatusCode::CREATED, Json(auction)))
}

/// 경매 삭제
pub async fn handle_delete_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> MarketResult<StatusCode> {
    require_admin(&state, &headers).await?;
    admin::delete_listing(state.store.as_ref(), auction_id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 경매 마감 처리
pub async fn handle_resolve(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(auction_id): Path<i64>,
) -> MarketResult<Json<Resolution>> {
    require_admin(&state, &headers).await?;
    let resolution =
        admin::resolve(state.store.as_ref(), &state.mailer, auction_id, Utc::now()).await?;
    Ok(Json(resolution))
}

/// 사용자 목록
pub async fn handle_admin_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<UserFilter>,
) -> MarketResult<Json<Vec<UserRow>>> {
    require_admin(&state, &headers).await?;
    Ok(Json(admin::list_users(state.store.as_ref(), &filter).await?))
}

/// 리포트
pub async fn handle_admin_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> MarketResult<Json<Reports>> {
    require_admin(&state, &headers).await?;
    Ok(Json(admin::reports(state.store.as_ref()).await?))
}

// endregion: --- Admin Handlers
