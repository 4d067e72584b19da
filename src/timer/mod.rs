/// 경매 카운트다운 타이머
/// 만료 시각으로부터 남은 시간을 1초마다 다시 계산하고, 만료되면 "Expired" 상태에서 멈춘다.
// region:    --- Imports
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::debug;

// endregion: --- Imports

// region:    --- Time Remaining
const MS_PER_MINUTE: i64 = 60 * 1000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    Running { days: i64, hours: i64, minutes: i64 },
    Expired,
}

impl TimeRemaining {
    pub fn is_expired(&self) -> bool {
        matches!(self, TimeRemaining::Expired)
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRemaining::Running {
                days,
                hours,
                minutes,
            } => write!(f, "{days}d {hours}h {minutes}m"),
            TimeRemaining::Expired => f.write_str("Expired"),
        }
    }
}

impl Serialize for TimeRemaining {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 남은 시간 계산
pub fn remaining(expiration: DateTime<Utc>, now: DateTime<Utc>) -> TimeRemaining {
    let diff = (expiration - now).num_milliseconds();
    if diff <= 0 {
        return TimeRemaining::Expired;
    }
    TimeRemaining::Running {
        days: diff / MS_PER_DAY,
        hours: (diff % MS_PER_DAY) / MS_PER_HOUR,
        minutes: (diff % MS_PER_HOUR) / MS_PER_MINUTE,
    }
}
// endregion: --- Time Remaining

// region:    --- Countdown
/// 실행 중인 카운트다운. drop 되면 타이머 작업도 중단된다.
pub struct Countdown {
    receiver: watch::Receiver<TimeRemaining>,
    task: JoinHandle<()>,
}

impl Countdown {
    /// 카운트다운 시작
    pub fn start(expiration: DateTime<Utc>) -> Self {
        let initial = remaining(expiration, Utc::now());
        let (sender, receiver) = watch::channel(initial);

        let task = tokio::spawn(async move {
            if initial.is_expired() {
                debug!("{:<12} --> 이미 만료된 경매", "Countdown");
                return;
            }
            let mut ticker = interval(Duration::from_secs(1));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // 첫 tick은 즉시 완료되므로 건너뛴다
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let next = remaining(expiration, Utc::now());
                if sender.send(next).is_err() {
                    break;
                }
                if next.is_expired() {
                    debug!("{:<12} --> 카운트다운 만료", "Countdown");
                    break;
                }
            }
        });

        Self { receiver, task }
    }

    pub fn current(&self) -> TimeRemaining {
        *self.receiver.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimeRemaining> {
        self.receiver.clone()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
// endregion: --- Countdown

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn past_expiration_is_expired() {
        let now = Utc::now();
        assert_eq!(remaining(now - ChronoDuration::seconds(1), now), TimeRemaining::Expired);
        assert_eq!(remaining(now, now), TimeRemaining::Expired);
        assert_eq!(remaining(now, now).to_string(), "Expired");
    }

    #[test]
    fn decomposes_into_days_hours_minutes() {
        let now = Utc::now();
        let expiration = now
            + ChronoDuration::days(2)
            + ChronoDuration::hours(14)
            + ChronoDuration::minutes(32)
            + ChronoDuration::seconds(10);
        let left = remaining(expiration, now);
        assert_eq!(
            left,
            TimeRemaining::Running {
                days: 2,
                hours: 14,
                minutes: 32
            }
        );
        assert_eq!(left.to_string(), "2d 14h 32m");
    }

    #[test]
    fn under_a_minute_reads_zero() {
        let now = Utc::now();
        let left = remaining(now + ChronoDuration::seconds(30), now);
        assert_eq!(left.to_string(), "0d 0h 0m");
        assert!(!left.is_expired());
    }

    #[tokio::test]
    async fn countdown_for_past_deadline_stops_immediately() {
        let countdown = Countdown::start(Utc::now() - ChronoDuration::minutes(5));
        assert!(countdown.current().is_expired());
        let mut rx = countdown.subscribe();
        // 송신 측이 종료되면 changed()는 에러를 돌려준다
        let ended = tokio::time::timeout(std::time::Duration::from_secs(1), rx.changed()).await;
        assert!(matches!(ended, Ok(Err(_))));
    }

    #[tokio::test]
    async fn countdown_reaches_expired_and_stops() {
        let countdown = Countdown::start(Utc::now() + ChronoDuration::milliseconds(1200));
        assert!(!countdown.current().is_expired());
        let mut rx = countdown.subscribe();
        let waited = tokio::time::timeout(std::time::Duration::from_secs(4), async {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await;
        assert!(waited.is_ok());
        assert!(rx.borrow().is_expired());
    }

    #[tokio::test]
    async fn dropping_countdown_cancels_the_task() {
        let countdown = Countdown::start(Utc::now() + ChronoDuration::days(1));
        let mut rx = countdown.subscribe();
        drop(countdown);
        let ended = tokio::time::timeout(std::time::Duration::from_secs(1), rx.changed()).await;
        assert!(matches!(ended, Ok(Err(_))));
    }
}
// endregion: --- Tests
