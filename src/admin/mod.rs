/// 관리자 기능
/// 경매 등록/삭제/마감, 사용자 목록, 리포트, 관리자 대시보드
pub mod listings;
pub mod reports;

pub use listings::{
    add_listing, delete_listing, list_listings, resolve, AdminListing, ListingFilter,
    NewListingRequest, Resolution,
};
pub use reports::{dashboard_stats, list_users, reports, AdminStats, Reports, UserFilter, UserRow};
