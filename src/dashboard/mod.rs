/// 사용자 대시보드
/// - 참가 중 / 낙찰 / 유찰(자진 포기 포함) 탭
/// - 자진 포기 시 보증금 환불 메일 발송
/// - 이메일 미리보기
// region:    --- Imports
use crate::auction::model::{
    Auction, AuctionStatus, EmailType, Participation, ParticipationStatus, Profile,
};
use crate::error::{MarketError, MarketResult};
use crate::notify::{render, EmailContext, EmailMessage, Mailer};
use crate::store::{MarketStore, ParticipationFilter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    #[serde(flatten)]
    pub participation: Participation,
    pub title: String,
    pub image: Option<String>,
    pub current_highest: i64,
    pub auction_status: AuctionStatus,
    /// 유찰 또는 포기 시 환불되는 보증금
    pub refund: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub participating: Vec<DashboardEntry>,
    pub won: Vec<DashboardEntry>,
    pub lost: Vec<DashboardEntry>,
}

fn entry(participation: Participation, auction: &Auction, now: DateTime<Utc>) -> DashboardEntry {
    let refund = match participation.status {
        ParticipationStatus::Lost | ParticipationStatus::Exited => Some(participation.deposit_fee),
        ParticipationStatus::Active | ParticipationStatus::Won => None,
    };
    DashboardEntry {
        title: auction.title.clone(),
        image: auction.images.first().cloned(),
        current_highest: auction.current_highest(),
        auction_status: auction.status_at(now),
        refund,
        participation,
    }
}

/// 사용자의 참가 내역을 상태별로 묶는다
pub async fn load(store: &dyn MarketStore, user_id: i64) -> MarketResult<Dashboard> {
    let participations = store
        .list_participations(ParticipationFilter::for_user(user_id))
        .await?;
    let auctions: HashMap<i64, Auction> = store
        .list_auctions()
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let now = Utc::now();
    let mut dashboard = Dashboard::default();
    for participation in participations {
        let Some(auction) = auctions.get(&participation.auction_id) else {
            continue;
        };
        let status = participation.status;
        let row = entry(participation, auction, now);
        match status {
            ParticipationStatus::Active => dashboard.participating.push(row),
            ParticipationStatus::Won => dashboard.won.push(row),
            ParticipationStatus::Lost | ParticipationStatus::Exited => dashboard.lost.push(row),
        }
    }
    Ok(dashboard)
}

/// 본인의 참가 내역만 조회
async fn own_participation(
    store: &dyn MarketStore,
    user: &Profile,
    participation_id: i64,
) -> MarketResult<Participation> {
    store
        .list_participations(ParticipationFilter::for_user(user.id))
        .await?
        .into_iter()
        .find(|p| p.id == participation_id)
        .ok_or_else(|| MarketError::NotFound(format!("participation {participation_id}")))
}
// endregion: --- Dashboard

// region:    --- Exit
/// 경매 참가 포기: 상태를 exited 로 바꾸고 환불 메일 발송
pub async fn exit(
    store: &dyn MarketStore,
    mailer: &Mailer,
    user: &Profile,
    participation_id: i64,
) -> MarketResult<Participation> {
    let participation = own_participation(store, user, participation_id).await?;
    if participation.status != ParticipationStatus::Active {
        return Err(MarketError::Conflict(format!(
            "진행 중인 참가만 포기할 수 있습니다: {}",
            participation.status.as_str()
        )));
    }

    let updated = store
        .update_participation_status(
            participation.id,
            ParticipationStatus::Active,
            ParticipationStatus::Exited,
        )
        .await?;
    info!(
        "{:<12} --> 참가 포기 user: {}, auction: {}",
        "Dashboard", user.id, updated.auction_id
    );

    let auction = store.get_auction(updated.auction_id).await?;
    let ctx = EmailContext::new(
        &user.full_name,
        &user.email,
        Some(user.id),
        &auction,
        updated.platform_fee,
        updated.deposit_fee,
    );
    if let Err(e) = mailer.send(render(EmailType::Refund, &ctx)).await {
        error!("{:<12} --> 환불 메일 발송 실패: {:?}", "Dashboard", e);
    }
    Ok(updated)
}
// endregion: --- Exit

// region:    --- Email Preview
/// 발송 없이 이메일 본문만 렌더링
pub async fn email_preview(
    store: &dyn MarketStore,
    user: &Profile,
    participation_id: i64,
    kind: EmailType,
) -> MarketResult<EmailMessage> {
    let participation = own_participation(store, user, participation_id).await?;
    let auction = store.get_auction(participation.auction_id).await?;

    let mut ctx = EmailContext::new(
        &user.full_name,
        &user.email,
        Some(user.id),
        &auction,
        participation.platform_fee,
        participation.deposit_fee,
    );
    ctx.refund_completed = participation.status == ParticipationStatus::Lost;
    Ok(render(kind, &ctx))
}
// endregion: --- Email Preview
