/// 모의 이메일 발송
/// 실제 메일은 보내지 않고 로그와 email_logs 에만 남긴다.
// region:    --- Imports
use crate::auction::model::{Auction, EmailLog, EmailType, NewEmailLog};
use crate::error::MarketResult;
use crate::fees::format_inr;
use crate::store::MarketStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

// endregion: --- Imports

// region:    --- Templates
/// 이메일 본문 렌더링에 필요한 값
#[derive(Debug, Clone)]
pub struct EmailContext {
    pub recipient_name: String,
    pub recipient_email: String,
    pub user_id: Option<i64>,
    pub auction_id: i64,
    pub title: String,
    pub category: String,
    pub base_price: i64,
    pub platform_fee: i64,
    pub deposit: i64,
    pub winning_bid: Option<i64>,
    pub refund_completed: bool,
}

impl EmailContext {
    pub fn new(
        recipient_name: &str,
        recipient_email: &str,
        user_id: Option<i64>,
        auction: &Auction,
        platform_fee: i64,
        deposit: i64,
    ) -> Self {
        Self {
            recipient_name: recipient_name.to_string(),
            recipient_email: recipient_email.to_string(),
            user_id,
            auction_id: auction.id,
            title: auction.title.clone(),
            category: auction.category.to_string(),
            base_price: auction.base_price,
            platform_fee,
            deposit,
            winning_bid: auction.current_bid,
            refund_completed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub kind: EmailType,
    pub subject: String,
    pub body: String,
    #[serde(skip)]
    pub user_id: Option<i64>,
    #[serde(skip)]
    pub auction_id: Option<i64>,
}

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━";
const SIGNATURE: &str = "Auction Grid Team";

/// 이메일 렌더링
pub fn render(kind: EmailType, ctx: &EmailContext) -> EmailMessage {
    let (subject, body) = match kind {
        EmailType::Participation => (
            format!("Auction Participation Confirmed - {}", ctx.title),
            format!(
                "Dear {name},\n\n\
                 ✅ Your participation in the following auction has been confirmed:\n\n\
                 Auction Details:\n{RULE}\n\
                 - Title: {title}\n\
                 - Base Price: {base}\n\
                 - Category: {category}\n\n\
                 Your Payment:\n{RULE}\n\
                 - Platform Fees: {platform} (Non-refundable)\n\
                 - Deposit: {deposit} (Refundable if you lose)\n\n\
                 Best regards,\n{SIGNATURE}",
                name = ctx.recipient_name,
                title = ctx.title,
                base = format_inr(ctx.base_price),
                category = ctx.category,
                platform = format_inr(ctx.platform_fee),
                deposit = format_inr(ctx.deposit),
            ),
        ),
        EmailType::Refund => (
            "Auction Closed - Refund Initiated".to_string(),
            format!(
                "Dear {name},\n\n\
                 The auction you participated in has concluded:\n\n\
                 Auction: {title}\n\
                 Result: Another bidder won this auction\n\n\
                 💰 REFUND DETAILS:\n{RULE}\n\
                 - Deposit Amount: {deposit}\n\
                 - Refund Status: {status}\n\
                 - Expected in: 5-7 business days\n\n\
                 Thank you for participating!\n{SIGNATURE}",
                name = ctx.recipient_name,
                title = ctx.title,
                deposit = format_inr(ctx.deposit),
                status = if ctx.refund_completed {
                    "Completed"
                } else {
                    "Processing"
                },
            ),
        ),
        EmailType::Winner => {
            let winning = ctx.winning_bid.unwrap_or(ctx.base_price);
            // 20% 는 곱하지 않고 나눠서 구한다
            let first = winning / 5;
            let second = winning - first;
            (
                "🎉 Congratulations! You Won the Auction".to_string(),
                format!(
                    "Dear {name},\n\n\
                     🏆 CONGRATULATIONS! You are the winning bidder!\n\n\
                     Auction Details:\n{RULE}\n\
                     - Item: {title}\n\
                     - Your Winning Bid: {winning}\n\
                     - Deposit Paid: {deposit}\n\n\
                     ⏰ PAYMENT SCHEDULE:\n{RULE}\n\
                     Stage 1: 20% within 48 hours\n  Amount: {first}\n\
                     Stage 2: 80% within 60 days\n  Amount: {second}\n\n\
                     ⚠️ IMPORTANT WARNING:\n\
                     Failure to complete payment will result in:\n\
                     - Forfeiture of {deposit} deposit\n\
                     - Legal action as per Indian law\n\
                     - Ban from future government auctions\n\n\
                     Congratulations again!\n{SIGNATURE}",
                    name = ctx.recipient_name,
                    title = ctx.title,
                    winning = format_inr(winning),
                    deposit = format_inr(ctx.deposit),
                    first = format_inr(first),
                    second = format_inr(second),
                ),
            )
        }
    };

    EmailMessage {
        to: ctx.recipient_email.clone(),
        kind,
        subject,
        body,
        user_id: ctx.user_id,
        auction_id: Some(ctx.auction_id),
    }
}
// endregion: --- Templates

// region:    --- Mailer
/// 모의 메일러
pub struct Mailer {
    store: Arc<dyn MarketStore>,
}

impl Mailer {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self { store }
    }

    /// 이메일 "발송" (로그 + email_logs 기록)
    pub async fn send(&self, message: EmailMessage) -> MarketResult<EmailLog> {
        info!(
            "{:<12} --> 📧 EMAIL SENT: to={}, subject={}",
            "Mailer", message.to, message.subject
        );
        self.store
            .log_email(NewEmailLog {
                user_id: message.user_id,
                auction_id: message.auction_id,
                email_type: message.kind,
                subject: message.subject,
                content: message.body,
            })
            .await
    }
}
// endregion: --- Mailer

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::Category;
    use chrono::Utc;

    fn swift() -> Auction {
        Auction {
            id: 1,
            title: "Maruti Swift VXI 2018".to_string(),
            city: "Ahmedabad".to_string(),
            category: Category::FourWheeler,
            base_price: 120000,
            current_bid: Some(150000),
            bidders_count: 3,
            expiration_date: Utc::now(),
            cooldown_hours: 24,
            description: None,
            images: Vec::new(),
            years_used: None,
            condition_rating: None,
            insurance_status: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn winner_email_splits_payment_twenty_eighty() {
        let ctx = EmailContext::new("Priya", "priya@mail.com", Some(2), &swift(), 500, 4500);
        let message = render(EmailType::Winner, &ctx);
        assert!(message.body.contains("Your Winning Bid: ₹1,50,000"));
        assert!(message.body.contains("Amount: ₹30,000"));
        assert!(message.body.contains("Amount: ₹1,20,000"));
        assert_eq!(message.to, "priya@mail.com");
    }

    #[test]
    fn winner_email_renders_for_the_largest_stored_bid() {
        let mut auction = swift();
        auction.current_bid = Some(i64::MAX);
        let ctx = EmailContext::new("Priya", "priya@mail.com", Some(2), &auction, 500, 4500);
        let message = render(EmailType::Winner, &ctx);
        let first = i64::MAX / 5;
        assert!(message
            .body
            .contains(&format!("Amount: {}", format_inr(first))));
        assert!(message
            .body
            .contains(&format!("Amount: {}", format_inr(i64::MAX - first))));
    }

    #[test]
    fn participation_email_lists_fees() {
        let ctx = EmailContext::new("Amit", "amit@mail.com", Some(1), &swift(), 500, 4500);
        let message = render(EmailType::Participation, &ctx);
        assert_eq!(
            message.subject,
            "Auction Participation Confirmed - Maruti Swift VXI 2018"
        );
        assert!(message.body.contains("Platform Fees: ₹500 (Non-refundable)"));
        assert!(message.body.contains("Deposit: ₹4,500 (Refundable if you lose)"));
    }

    #[test]
    fn refund_email_reports_processing_by_default() {
        let ctx = EmailContext::new("Amit", "amit@mail.com", Some(1), &swift(), 500, 4500);
        let message = render(EmailType::Refund, &ctx);
        assert!(message.body.contains("Refund Status: Processing"));
    }
}
