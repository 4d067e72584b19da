// region:    --- Imports
use crate::error::MarketError;
use crate::fees::{calculate_fees, Fees};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// endregion: --- Imports

/// 서비스 지역 (구자라트 주)
pub const GUJARAT_CITIES: [&str; 10] = [
    "Ahmedabad",
    "Surat",
    "Vadodara",
    "Rajkot",
    "Bhavnagar",
    "Gandhinagar",
    "Jamnagar",
    "Junagadh",
    "Navsari",
    "Valsad",
];

pub fn is_supported_city(city: &str) -> bool {
    GUJARAT_CITIES.contains(&city)
}

// region:    --- Enums
/// 경매 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Two Wheeler")]
    TwoWheeler,
    #[serde(rename = "Four Wheeler")]
    FourWheeler,
    #[serde(rename = "Heavy Vehicle")]
    HeavyVehicle,
    #[serde(rename = "Property")]
    Property,
    #[serde(rename = "Antiques")]
    Antiques,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::TwoWheeler,
        Category::FourWheeler,
        Category::HeavyVehicle,
        Category::Property,
        Category::Antiques,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::TwoWheeler => "Two Wheeler",
            Category::FourWheeler => "Four Wheeler",
            Category::HeavyVehicle => "Heavy Vehicle",
            Category::Property => "Property",
            Category::Antiques => "Antiques",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| MarketError::validation(format!("알 수 없는 카테고리입니다: {s}")))
    }
}

/// 타임스탬프로부터 계산되는 경매 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuctionStatus {
    Active,
    Cooldown,
    Expired,
}

impl fmt::Display for AuctionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AuctionStatus::Active => "active",
            AuctionStatus::Cooldown => "cooldown",
            AuctionStatus::Expired => "expired",
        })
    }
}

/// 참가 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipationStatus {
    Active,
    Won,
    Lost,
    Exited,
}

impl ParticipationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipationStatus::Active => "active",
            ParticipationStatus::Won => "won",
            ParticipationStatus::Lost => "lost",
            ParticipationStatus::Exited => "exited",
        }
    }
}

impl FromStr for ParticipationStatus {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ParticipationStatus::Active),
            "won" => Ok(ParticipationStatus::Won),
            "lost" => Ok(ParticipationStatus::Lost),
            "exited" => Ok(ParticipationStatus::Exited),
            other => Err(MarketError::Corrupt(format!("participation status: {other}"))),
        }
    }
}

/// 사용자 권한
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(MarketError::Corrupt(format!("role: {other}"))),
        }
    }
}

/// 모의 이메일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    Participation,
    Refund,
    Winner,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::Participation => "participation",
            EmailType::Refund => "refund",
            EmailType::Winner => "winner",
        }
    }
}

impl FromStr for EmailType {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participation" => Ok(EmailType::Participation),
            "refund" => Ok(EmailType::Refund),
            "winner" | "won" => Ok(EmailType::Winner),
            other => Err(MarketError::validation(format!(
                "알 수 없는 이메일 종류입니다: {other}"
            ))),
        }
    }
}
// endregion: --- Enums

// region:    --- Auction
/// 경매 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Auction {
    pub id: i64,
    pub title: String,
    pub city: String,
    pub category: Category,
    pub base_price: i64,
    pub current_bid: Option<i64>,
    pub bidders_count: i32,
    pub expiration_date: DateTime<Utc>,
    pub cooldown_hours: i32,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub years_used: Option<i32>,
    pub condition_rating: Option<i32>,
    pub insurance_status: Option<bool>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Auction {
    /// 현재 최고 입찰가 (입찰이 없으면 시작가)
    pub fn current_highest(&self) -> i64 {
        match self.current_bid {
            Some(bid) if bid > 0 => bid,
            _ => self.base_price,
        }
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> AuctionStatus {
        crate::auction::lifecycle::status_at(self.expiration_date, self.cooldown_hours, now)
    }

    pub fn fees(&self) -> Fees {
        calculate_fees(self.category)
    }
}

/// 신규 경매 생성 데이터
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAuction {
    pub title: String,
    pub city: String,
    pub category: Category,
    pub base_price: i64,
    pub expiration_date: DateTime<Utc>,
    pub cooldown_hours: i32,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub years_used: Option<i32>,
    pub condition_rating: Option<i32>,
    pub insurance_status: Option<bool>,
    pub created_by: Option<i64>,
}
// endregion: --- Auction

// region:    --- Bid
/// 입찰 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bid {
    pub id: i64,
    pub auction_id: i64,
    pub user_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBid {
    pub auction_id: i64,
    pub user_id: i64,
    pub amount: i64,
}
// endregion: --- Bid

// region:    --- Participation
/// 경매 참가 모델
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participation {
    pub id: i64,
    pub user_id: i64,
    pub auction_id: i64,
    pub platform_fee: i64,
    pub deposit_fee: i64,
    pub status: ParticipationStatus,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewParticipation {
    pub user_id: i64,
    pub auction_id: i64,
    pub platform_fee: i64,
    pub deposit_fee: i64,
}
// endregion: --- Participation

// region:    --- Profile
/// 사용자 프로필
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub city: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// 인증 정보를 포함한 계정 (직렬화 대상 아님)
#[derive(Debug, Clone)]
pub struct Account {
    pub profile: Profile,
    pub password_hash: String,
    pub password_salt: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub full_name: String,
    pub city: String,
    pub role: Role,
    pub password_hash: String,
    pub password_salt: String,
}
// endregion: --- Profile

// region:    --- Email Log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub auction_id: Option<i64>,
    pub email_type: EmailType,
    pub subject: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEmailLog {
    pub user_id: Option<i64>,
    pub auction_id: Option<i64>,
    pub email_type: EmailType,
    pub subject: String,
    pub content: String,
}
// endregion: --- Email Log
