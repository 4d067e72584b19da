/// 경매 목록 조회
pub const LIST_AUCTIONS: &str = r#"
    SELECT id, title, city, category, base_price, current_bid, bidders_count, expiration_date,
           cooldown_hours, description, images, years_used, condition_rating, insurance_status,
           created_by, created_at
    FROM auctions
    ORDER BY created_at DESC, id DESC
"#;

/// 경매 조회
pub const GET_AUCTION: &str = r#"
    SELECT id, title, city, category, base_price, current_bid, bidders_count, expiration_date,
           cooldown_hours, description, images, years_used, condition_rating, insurance_status,
           created_by, created_at
    FROM auctions
    WHERE id = $1
"#;

/// 경매 생성
pub const INSERT_AUCTION: &str = r#"
    INSERT INTO auctions (title, city, category, base_price, expiration_date, cooldown_hours,
                          description, images, years_used, condition_rating, insurance_status,
                          created_by)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
    RETURNING id, title, city, category, base_price, current_bid, bidders_count, expiration_date,
              cooldown_hours, description, images, years_used, condition_rating, insurance_status,
              created_by, created_at
"#;

/// 경매 삭제
pub const DELETE_AUCTION: &str = "DELETE FROM auctions WHERE id = $1";

/// 입찰 목록 조회 (최신 순)
pub const LIST_BIDS: &str = r#"
    SELECT id, auction_id, user_id, amount, created_at
    FROM bids
    WHERE auction_id = $1
    ORDER BY created_at DESC, id DESC
"#;

/// 현재 최고가 조회 (입찰이 없으면 시작가)
pub const GET_CURRENT_HIGHEST: &str =
    "SELECT COALESCE(NULLIF(current_bid, 0), base_price) AS current_highest FROM auctions WHERE id = $1";

/// 최고가 갱신 (현재 최고가보다 높을 때만)
pub const RAISE_CURRENT_BID: &str = r#"
    UPDATE auctions SET current_bid = $2
    WHERE id = $1 AND COALESCE(NULLIF(current_bid, 0), base_price) < $2
    RETURNING id
"#;

/// 입찰 기록
pub const INSERT_BID: &str = r#"
    INSERT INTO bids (auction_id, user_id, amount)
    VALUES ($1, $2, $3)
    RETURNING id, auction_id, user_id, amount, created_at
"#;

/// 입찰자 수 갱신
pub const REFRESH_BIDDERS_COUNT: &str = r#"
    UPDATE auctions
    SET bidders_count = (SELECT COUNT(DISTINCT user_id) FROM bids WHERE auction_id = $1)
    WHERE id = $1
"#;

/// 프로필 조회
pub const GET_PROFILES: &str =
    "SELECT id, email, full_name, city, role, created_at FROM profiles WHERE id = ANY($1)";

/// 전체 프로필 조회
pub const LIST_PROFILES: &str =
    "SELECT id, email, full_name, city, role, created_at FROM profiles ORDER BY created_at DESC, id DESC";

/// 계정 생성
pub const INSERT_PROFILE: &str = r#"
    INSERT INTO profiles (email, full_name, city, role, password_hash, password_salt)
    VALUES ($1, $2, $3, $4, $5, $6)
    RETURNING id, email, full_name, city, role, created_at
"#;

/// 이메일로 계정 조회
pub const FIND_ACCOUNT: &str = r#"
    SELECT id, email, full_name, city, role, created_at, password_hash, password_salt
    FROM profiles
    WHERE LOWER(email) = LOWER($1)
"#;

/// 참가 기록
pub const INSERT_PARTICIPATION: &str = r#"
    INSERT INTO participations (user_id, auction_id, platform_fee, deposit_fee)
    VALUES ($1, $2, $3, $4)
    RETURNING id, user_id, auction_id, platform_fee, deposit_fee, status, joined_at
"#;

/// 참가 목록 조회
pub const LIST_PARTICIPATIONS: &str = r#"
    SELECT id, user_id, auction_id, platform_fee, deposit_fee, status, joined_at
    FROM participations
    WHERE ($1::BIGINT IS NULL OR user_id = $1) AND ($2::BIGINT IS NULL OR auction_id = $2)
    ORDER BY joined_at DESC, id DESC
"#;

/// 참가 상태 변경 (현재 상태가 $3 일 때만)
pub const UPDATE_PARTICIPATION_STATUS: &str = r#"
    UPDATE participations SET status = $2
    WHERE id = $1 AND status = $3
    RETURNING id, user_id, auction_id, platform_fee, deposit_fee, status, joined_at
"#;

/// 참가 상태 조회
pub const GET_PARTICIPATION_STATUS: &str = "SELECT status FROM participations WHERE id = $1";

/// 이메일 기록
pub const INSERT_EMAIL_LOG: &str = r#"
    INSERT INTO email_logs (user_id, auction_id, email_type, subject, content)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, user_id, auction_id, email_type, subject, content, sent_at
"#;

/// 최근 이메일 조회
pub const RECENT_EMAILS: &str = r#"
    SELECT id, user_id, auction_id, email_type, subject, content, sent_at
    FROM email_logs
    ORDER BY sent_at DESC, id DESC
    LIMIT $1
"#;
