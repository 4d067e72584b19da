/// 카테고리별 참가 수수료
/// 플랫폼 수수료는 환불되지 않으며, 보증금은 낙찰에 실패하면 환불된다.
// region:    --- Imports
use crate::auction::model::Category;
use serde::Serialize;

// endregion: --- Imports

/// 입찰가와 시작가의 상한 (₹1,000 crore)
pub const MAX_AMOUNT: i64 = 10_000_000_000;

// region:    --- Fee Table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Fees {
    pub platform: i64,
    pub deposit: i64,
    pub total: i64,
}

/// 수수료 계산
pub fn calculate_fees(category: Category) -> Fees {
    let (platform, deposit) = match category {
        Category::TwoWheeler => (50, 1950),
        Category::FourWheeler => (500, 4500),
        Category::HeavyVehicle => (1000, 9000),
        Category::Property => (1000, 14000),
        Category::Antiques => (100, 1500),
    };
    Fees {
        platform,
        deposit,
        total: platform + deposit,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeRow {
    pub category: Category,
    #[serde(flatten)]
    pub fees: Fees,
}

/// 전체 수수료 표
pub fn fee_table() -> Vec<FeeRow> {
    Category::ALL
        .into_iter()
        .map(|category| FeeRow {
            category,
            fees: calculate_fees(category),
        })
        .collect()
}
// endregion: --- Fee Table

// region:    --- Totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeeTotals {
    pub total_platform_fees: i64,
    pub total_deposit_fees: i64,
    pub grand_total: i64,
}

/// 여러 수수료의 합계
pub fn sum_fees<I>(fees: I) -> FeeTotals
where
    I: IntoIterator<Item = Fees>,
{
    let (platform, deposit) = fees
        .into_iter()
        .fold((0, 0), |(p, d), f| (p + f.platform, d + f.deposit));
    FeeTotals {
        total_platform_fees: platform,
        total_deposit_fees: deposit,
        grand_total: platform + deposit,
    }
}
// endregion: --- Totals

// region:    --- Formatting
/// 인도식 자릿수 구분 (예: ₹1,20,000)
pub fn format_inr(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 0 {
            let start = end.saturating_sub(2);
            groups.push(&head[start..end]);
            end = start;
        }
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };
    if amount < 0 {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}
// endregion: --- Formatting
