// region:    --- Imports
use auction_grid::config::Config;
use auction_grid::database::DatabaseManager;
use auction_grid::handlers::AppState;
use auction_grid::message_broker::KafkaManager;
use auction_grid::realtime::{ChangeFeed, EventPublisher};
use auction_grid::routes;
use auction_grid::store::{MarketStore, MemoryStore, PostgresStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = Config::from_env()?;
    let feed = ChangeFeed::new();

    // Kafka 가 설정되어 있으면 다른 인스턴스의 변경도 Kafka 를 거쳐 로컬 피드로 들어온다
    let publisher: Arc<dyn EventPublisher> = match &config.kafka_brokers {
        Some(brokers) => {
            let kafka_manager = KafkaManager::new(brokers, &config.kafka_topic, feed.clone())?;
            if let Err(e) = kafka_manager.initialize().await {
                error!("{:<12} --> Kafka 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            if let Err(e) = kafka_manager.create_topic(5, 1).await {
                warn!("{:<12} --> 토픽 생성 건너뜀: {:?}", "Main", e);
            }
            kafka_manager.spawn_bridge();
            info!("{:<12} --> Kafka 초기화 성공", "Main");
            let producer: Arc<dyn EventPublisher> = kafka_manager.get_producer();
            producer
        }
        None => {
            info!("{:<12} --> 로컬 변경 피드 사용", "Main");
            Arc::new(feed.clone())
        }
    };

    // DATABASE_URL 이 없으면 메모리 저장소로 실행
    let store: Arc<dyn MarketStore> = match &config.database_url {
        Some(url) => {
            let db_manager =
                Arc::new(DatabaseManager::new(url, config.database_max_connections).await?);
            if let Err(e) = db_manager.initialize_database(config.database_reset).await {
                error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
                return Err(e.into());
            }
            info!("{:<12} --> 데이터베이스 초기화 성공", "Main");
            Arc::new(PostgresStore::new(db_manager, publisher))
        }
        None => {
            warn!("{:<12} --> DATABASE_URL 미설정, 메모리 저장소 사용", "Main");
            Arc::new(MemoryStore::new(publisher))
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(store, feed, config);
    let admin = state.sessions.ensure_admin(&state.config).await?;
    info!("{:<12} --> 관리자 계정 확인: {}", "Main", admin.email);

    // 리스너 생성
    let listener = TcpListener::bind(&bind_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes::router(state).into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
