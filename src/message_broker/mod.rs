/// 다중 인스턴스 배포를 위한 Kafka 변경 피드 브리지
/// 저장소가 발행한 이벤트는 로컬 피드에 바로 전파하고 Kafka 로도 내보낸다.
/// 다른 인스턴스는 이를 받아 자신의 로컬 피드로 전파하고, 자기가 보낸 이벤트는 건너뛴다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::error::{MarketError, MarketResult};
use crate::realtime::{ChangeFeed, EventPublisher};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

// region:    --- Envelope
/// Kafka 메시지 본문. 발신 인스턴스를 함께 싣는다.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    origin: String,
    event: AuctionEvent,
}

/// 다른 인스턴스가 보낸 이벤트만 꺼낸다
fn foreign_event(payload: &[u8], instance_id: &str) -> MarketResult<Option<AuctionEvent>> {
    let envelope: Envelope = serde_json::from_slice(payload)?;
    Ok((envelope.origin != instance_id).then_some(envelope.event))
}
// endregion: --- Envelope

// region:    --- Kafka Producer
#[derive(Clone)]
pub struct KafkaProducer {
    producer: Arc<FutureProducer>,
    topic: String,
    instance_id: String,
    local: ChangeFeed,
}

/// KafkaProducer 구현
impl KafkaProducer {
    pub fn new(
        brokers: &str,
        topic: &str,
        instance_id: &str,
        local: ChangeFeed,
    ) -> MarketResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| MarketError::Broker(format!("Producer 생성 실패: {:?}", e)))?;

        Ok(KafkaProducer {
            producer: Arc::new(producer),
            topic: topic.to_string(),
            instance_id: instance_id.to_string(),
            local,
        })
    }

    /// 메시지 전송
    pub async fn send_message(&self, topic: &str, key: &str, value: &str) -> MarketResult<()> {
        info!(
            "{:<12} --> Kafka 메시지 전송: topic={}, key={}",
            "Producer", topic, key
        );
        let record = FutureRecord::to(topic).key(key).payload(value);

        self.producer
            .send(record, Duration::from_secs(0))
            .await
            .map_err(|(e, _)| MarketError::Broker(format!("Error sending message: {:?}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl EventPublisher for KafkaProducer {
    /// 로컬 구독자에게는 Kafka 왕복 없이 바로 전달한다.
    /// 경매 id 를 키로 사용해 같은 경매의 이벤트 순서를 유지
    async fn publish(&self, event: AuctionEvent) -> MarketResult<()> {
        self.local.notify(event.clone());
        let key = event.auction_id().to_string();
        let payload = serde_json::to_string(&Envelope {
            origin: self.instance_id.clone(),
            event,
        })?;
        self.send_message(&self.topic, &key, &payload).await
    }
}
// endregion: --- Kafka Producer

// region:    --- Kafka Consumer
pub struct KafkaConsumer {
    consumer: Arc<StreamConsumer>,
}

/// KafkaConsumer 구현
impl KafkaConsumer {
    pub fn new(brokers: &str, group_id: &str) -> MarketResult<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("allow.auto.create.topics", "true")
            .create()
            .map_err(|e| MarketError::Broker(format!("Consumer 생성 실패: {:?}", e)))?;

        Ok(KafkaConsumer {
            consumer: Arc::new(consumer),
        })
    }

    /// 이벤트 수신 루프. `instance_id` 가 보낸 이벤트는 이미 로컬에 전파되었으므로 건너뛴다.
    pub async fn consume_events<F>(
        &self,
        topic: &str,
        instance_id: &str,
        handler: F,
    ) -> MarketResult<()>
    where
        F: Fn(AuctionEvent) + Send + 'static,
    {
        info!("{:<12} --> Kafka 이벤트 수신 시작: topic={}", "Consumer", topic);
        self.consumer
            .subscribe(&[topic])
            .map_err(|e| MarketError::Broker(e.to_string()))?;

        loop {
            match self.consumer.recv().await {
                Ok(message) => {
                    debug!(
                        "{:<12} --> 메시지 수신: topic={}, partition={}, offset={}",
                        "Consumer",
                        message.topic(),
                        message.partition(),
                        message.offset()
                    );

                    if let Some(payload) = message.payload() {
                        match foreign_event(payload, instance_id) {
                            Ok(Some(event)) => handler(event),
                            Ok(None) => debug!("{:<12} --> 자체 발행 이벤트 건너뜀", "Consumer"),
                            Err(e) => error!(
                                "{:<12} --> 이벤트 본문 해석 실패: {:?}",
                                "Consumer", e
                            ),
                        }
                    } else {
                        warn!("{:<12} --> 빈 페이로드 수신", "Consumer");
                    }
                }
                Err(e) => error!("{:<12} --> 메시지 수신 오류: {:?}", "Consumer", e),
            }
        }
    }
}
// endregion: --- Kafka Consumer

// region:    --- Kafka Manager
pub struct KafkaManager {
    producer: Arc<KafkaProducer>,
    consumer: Arc<KafkaConsumer>,
    feed: ChangeFeed,
    instance_id: String,
    brokers: String,
    topic: String,
}

/// KafkaManager 구현
impl KafkaManager {
    /// 인스턴스마다 고유한 그룹 id 를 사용해 모든 인스턴스가 모든 이벤트를 받는다
    pub fn new(brokers: &str, topic: &str, feed: ChangeFeed) -> MarketResult<Self> {
        let instance_id = format!("auction-grid-{}", uuid::Uuid::new_v4());

        let producer = Arc::new(KafkaProducer::new(
            brokers,
            topic,
            &instance_id,
            feed.clone(),
        )?);
        let consumer = Arc::new(KafkaConsumer::new(brokers, &instance_id)?);

        Ok(KafkaManager {
            producer,
            consumer,
            feed,
            instance_id,
            brokers: brokers.to_string(),
            topic: topic.to_string(),
        })
    }

    /// 프로듀서 반환
    pub fn get_producer(&self) -> Arc<KafkaProducer> {
        Arc::clone(&self.producer)
    }

    /// 브로커 연결 확인 (메타데이터 조회)
    pub async fn initialize(&self) -> MarketResult<()> {
        info!("{:<12} --> Kafka 초기화 시작", "Manager");

        let mut attempts = 0;
        let max_attempts = 10;
        while attempts < max_attempts {
            let consumer = Arc::clone(&self.consumer.consumer);
            let fetched = tokio::task::spawn_blocking(move || {
                consumer
                    .fetch_metadata(None, Duration::from_secs(1))
                    .map(|metadata| metadata.brokers().len())
            })
            .await
            .map_err(|e| MarketError::Broker(e.to_string()))?;

            match fetched {
                Ok(brokers) => {
                    info!("{:<12} --> Kafka 브로커 {}개 확인", "Manager", brokers);
                    return Ok(());
                }
                Err(e) => {
                    attempts += 1;
                    warn!(
                        "{:<12} --> Kafka 연결 대기 중... (시도: {}/{}) {:?}",
                        "Manager", attempts, max_attempts, e
                    );
                    time::sleep(Duration::from_millis(500)).await;
                }
            }
        }

        Err(MarketError::Broker("Kafka 연결 확인 실패".to_string()))
    }

    /// 토픽 생성
    pub async fn create_topic(
        &self,
        num_partitions: i32,
        replication_factor: i32,
    ) -> MarketResult<()> {
        info!("{:<12} --> Kafka 토픽 생성 시작: {}", "Manager", self.topic);

        let admin_client: AdminClient<DefaultClientContext> = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .create()
            .map_err(|e| MarketError::Broker(format!("AdminClient 생성 실패: {:?}", e)))?;

        let new_topic = NewTopic::new(
            &self.topic,
            num_partitions,
            TopicReplication::Fixed(replication_factor),
        );

        match admin_client
            .create_topics(&[new_topic], &AdminOptions::new())
            .await
        {
            Ok(_) => {
                info!("{:<12} --> Kafka 토픽 생성 성공: {}", "Manager", self.topic);
                Ok(())
            }
            Err(e) => {
                error!("{:<12} --> Kafka 토픽 생성 실패: {:?}", "Manager", e);
                Err(MarketError::Broker(format!("토픽 생성 실패: {:?}", e)))
            }
        }
    }

    /// 다른 인스턴스의 Kafka 이벤트를 로컬 변경 피드로 전달하는 작업 시작
    pub fn spawn_bridge(&self) {
        let consumer = Arc::clone(&self.consumer);
        let topic = self.topic.clone();
        let instance_id = self.instance_id.clone();
        let feed = self.feed.clone();
        tokio::spawn(async move {
            if let Err(e) = consumer
                .consume_events(&topic, &instance_id, move |event| feed.notify(event))
                .await
            {
                error!("{:<12} --> 이벤트 브리지 종료: {:?}", "Bridge", e);
            }
        });
    }
}
// endregion: --- Kafka Manager

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload(origin: &str) -> Vec<u8> {
        serde_json::to_vec(&Envelope {
            origin: origin.to_string(),
            event: AuctionEvent::BidPlaced {
                bid_id: 5,
                auction_id: 2,
                bidder_id: 9,
                amount: 130000,
                timestamp: Utc::now(),
            },
        })
        .unwrap()
    }

    #[test]
    fn own_events_are_not_bridged_twice() {
        assert!(foreign_event(&payload("node-a"), "node-a").unwrap().is_none());
    }

    #[test]
    fn other_instances_events_are_bridged() {
        let event = foreign_event(&payload("node-b"), "node-a").unwrap().unwrap();
        assert_eq!(event.auction_id(), 2);
    }

    #[test]
    fn malformed_payload_is_an_error() {
        assert!(foreign_event(b"not json", "node-a").is_err());
    }
}
