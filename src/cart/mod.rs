/// 장바구니와 체크아웃
/// 장바구니는 세션이 소유하며, 체크아웃은 전부 성공하거나 전부 실패한다.
// region:    --- Imports
use crate::auction::model::{
    Auction, AuctionStatus, Category, EmailType, NewParticipation, Participation, Profile,
};
use crate::error::{MarketError, MarketResult};
use crate::fees::{sum_fees, FeeTotals, Fees};
use crate::notify::{render, EmailContext, Mailer};
use crate::store::MarketStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Cart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub auction_id: i64,
    pub title: String,
    pub category: Category,
    pub base_price: i64,
    pub image: Option<String>,
    pub platform_fee: i64,
    pub deposit_fee: i64,
}

impl CartItem {
    fn fees(&self) -> Fees {
        Fees {
            platform: self.platform_fee,
            deposit: self.deposit_fee,
            total: self.platform_fee + self.deposit_fee,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// 장바구니 응답
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    #[serde(flatten)]
    pub totals: FeeTotals,
}

impl Cart {
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, auction_id: i64) -> bool {
        self.items.iter().any(|i| i.auction_id == auction_id)
    }

    /// 진행 중인 경매만 담을 수 있다
    pub fn add(&mut self, auction: &Auction, now: DateTime<Utc>) -> MarketResult<&CartItem> {
        let status = auction.status_at(now);
        if status != AuctionStatus::Active {
            return Err(MarketError::AuctionNotActive(status));
        }
        if self.contains(auction.id) {
            return Err(MarketError::Conflict(format!(
                "이미 장바구니에 담긴 경매입니다: {}",
                auction.title
            )));
        }

        let fees = auction.fees();
        self.items.push(CartItem {
            auction_id: auction.id,
            title: auction.title.clone(),
            category: auction.category,
            base_price: auction.base_price,
            image: auction.images.first().cloned(),
            platform_fee: fees.platform,
            deposit_fee: fees.deposit,
        });
        Ok(&self.items[self.items.len() - 1])
    }

    pub fn remove(&mut self, auction_id: i64) -> MarketResult<CartItem> {
        let position = self
            .items
            .iter()
            .position(|i| i.auction_id == auction_id)
            .ok_or_else(|| MarketError::NotFound(format!("cart item {auction_id}")))?;
        Ok(self.items.remove(position))
    }

    /// 체크아웃된 경매를 한 번에 뺀다. 이미 없는 항목은 무시한다.
    pub fn remove_checked_out(&mut self, participations: &[Participation]) {
        self.items
            .retain(|item| !participations.iter().any(|p| p.auction_id == item.auction_id));
    }

    pub fn totals(&self) -> FeeTotals {
        sum_fees(self.items.iter().map(CartItem::fees))
    }

    pub fn view(&self) -> CartView {
        CartView {
            items: self.items.clone(),
            totals: self.totals(),
        }
    }
}
// endregion: --- Cart

// region:    --- Checkout
/// 체크아웃 전 동의 항목
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Agreements {
    #[serde(default)]
    pub read_terms: bool,
    #[serde(default)]
    pub understand_payment: bool,
    #[serde(default)]
    pub accept_refund: bool,
}

impl Agreements {
    pub fn all_accepted(&self) -> bool {
        self.read_terms && self.understand_payment && self.accept_refund
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub participations: Vec<Participation>,
    #[serde(flatten)]
    pub totals: FeeTotals,
}

/// 장바구니의 모든 항목을 참가로 기록하고 참가 확인 메일 발송
/// 성공 시 호출자가 장바구니를 비워야 한다.
pub async fn checkout(
    store: &dyn MarketStore,
    mailer: &Mailer,
    user: &Profile,
    cart: &Cart,
    agreements: Agreements,
) -> MarketResult<CheckoutReceipt> {
    if !agreements.all_accepted() {
        return Err(MarketError::TermsNotAccepted);
    }
    if cart.is_empty() {
        return Err(MarketError::validation("장바구니가 비어 있습니다."));
    }

    info!(
        "{:<12} --> 체크아웃 시작 user: {}, items: {}",
        "Cart",
        user.id,
        cart.items().len()
    );

    let rows = cart
        .items()
        .iter()
        .map(|item| NewParticipation {
            user_id: user.id,
            auction_id: item.auction_id,
            platform_fee: item.platform_fee,
            deposit_fee: item.deposit_fee,
        })
        .collect();
    let participations = store.insert_participations(rows).await?;

    // 참가 기록 이후의 메일 실패는 체크아웃을 되돌리지 않는다
    for item in cart.items() {
        let auction = match store.get_auction(item.auction_id).await {
            Ok(auction) => auction,
            Err(e) => {
                error!("{:<12} --> 참가 메일용 경매 조회 실패: {:?}", "Cart", e);
                continue;
            }
        };
        let ctx = EmailContext::new(
            &user.full_name,
            &user.email,
            Some(user.id),
            &auction,
            item.platform_fee,
            item.deposit_fee,
        );
        if let Err(e) = mailer.send(render(EmailType::Participation, &ctx)).await {
            error!("{:<12} --> 참가 메일 발송 실패: {:?}", "Cart", e);
        }
    }

    Ok(CheckoutReceipt {
        participations,
        totals: cart.totals(),
    })
}
// endregion: --- Checkout
