/// 로그인 세션 관리
/// 세션은 로그인/회원가입 시 생성되고 로그아웃 시 제거된다. 장바구니는 세션이 소유한다.
// region:    --- Imports
use crate::auction::model::{is_supported_city, NewAccount, Profile, Role, GUJARAT_CITIES};
use crate::cart::Cart;
use crate::config::Config;
use crate::error::{MarketError, MarketResult};
use crate::store::MarketStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

// endregion: --- Imports

const MIN_PASSWORD_LEN: usize = 6;

// region:    --- Requests
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub city: String,
    #[serde(default)]
    pub accept_terms: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// 로그인 응답
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub token: Uuid,
    pub user: Profile,
}
// endregion: --- Requests

// region:    --- Session
#[derive(Debug, Clone)]
pub struct Session {
    pub token: Uuid,
    pub user: Profile,
    pub cart: Cart,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new(user: Profile) -> Self {
        Self {
            token: Uuid::new_v4(),
            user,
            cart: Cart::default(),
            created_at: Utc::now(),
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            token: self.token,
            user: self.user.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.role == Role::Admin
    }
}

/// salt + password 의 SHA-256 (hex)
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn validate_signup(req: &SignupRequest) -> MarketResult<()> {
    if req.full_name.trim().is_empty() {
        return Err(MarketError::validation("이름을 입력해 주세요."));
    }
    if req.email.trim().is_empty() || !req.email.contains('@') {
        return Err(MarketError::validation("올바른 이메일을 입력해 주세요."));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(MarketError::validation(format!(
            "비밀번호는 최소 {MIN_PASSWORD_LEN}자 이상이어야 합니다."
        )));
    }
    if !is_supported_city(&req.city) {
        return Err(MarketError::validation(format!(
            "지원하지 않는 도시입니다. 가능한 도시: {}",
            GUJARAT_CITIES.join(", ")
        )));
    }
    if !req.accept_terms {
        return Err(MarketError::TermsNotAccepted);
    }
    Ok(())
}
// endregion: --- Session

// region:    --- Session Manager
pub struct SessionManager {
    store: Arc<dyn MarketStore>,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self {
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 회원가입 후 바로 로그인
    pub async fn signup(&self, req: SignupRequest) -> MarketResult<SessionInfo> {
        validate_signup(&req)?;
        info!("{:<12} --> 회원가입 요청: {}", "Session", req.email);

        let salt = Uuid::new_v4().simple().to_string();
        let profile = self
            .store
            .create_account(NewAccount {
                email: req.email.trim().to_lowercase(),
                full_name: req.full_name.trim().to_string(),
                city: req.city,
                role: Role::User,
                password_hash: hash_password(&salt, &req.password),
                password_salt: salt,
            })
            .await?;

        Ok(self.open(profile).await)
    }

    pub async fn login(&self, req: LoginRequest) -> MarketResult<SessionInfo> {
        let account = self
            .store
            .find_account(&req.email.trim().to_lowercase())
            .await?;

        match account {
            Some(account)
                if hash_password(&account.password_salt, &req.password)
                    == account.password_hash =>
            {
                info!("{:<12} --> 로그인 성공: {}", "Session", account.profile.email);
                Ok(self.open(account.profile).await)
            }
            _ => {
                warn!("{:<12} --> 로그인 실패: {}", "Session", req.email);
                Err(MarketError::Unauthenticated)
            }
        }
    }

    async fn open(&self, profile: Profile) -> SessionInfo {
        let session = Session::new(profile);
        let info = session.info();
        self.sessions.write().await.insert(session.token, session);
        info
    }

    /// 세션 제거 (장바구니도 함께 사라진다)
    pub async fn logout(&self, token: Uuid) -> MarketResult<()> {
        match self.sessions.write().await.remove(&token) {
            Some(session) => {
                info!("{:<12} --> 로그아웃: {}", "Session", session.user.email);
                Ok(())
            }
            None => Err(MarketError::Unauthenticated),
        }
    }

    pub async fn get(&self, token: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&token).cloned()
    }

    /// 세션을 잠근 채로 수정
    pub async fn update<F, R>(&self, token: Uuid, f: F) -> MarketResult<R>
    where
        F: FnOnce(&mut Session) -> MarketResult<R>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&token)
            .ok_or(MarketError::Unauthenticated)?;
        f(session)
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// 관리자 계정이 없으면 생성
    pub async fn ensure_admin(&self, config: &Config) -> MarketResult<Profile> {
        let email = config.admin_email.trim().to_lowercase();
        if let Some(account) = self.store.find_account(&email).await? {
            return Ok(account.profile);
        }

        info!("{:<12} --> 관리자 계정 생성: {}", "Session", email);
        let salt = Uuid::new_v4().simple().to_string();
        self.store
            .create_account(NewAccount {
                email,
                full_name: "Administrator".to_string(),
                city: GUJARAT_CITIES[0].to_string(),
                role: Role::Admin,
                password_hash: hash_password(&salt, &config.admin_password),
                password_salt: salt,
            })
            .await
    }
}
// endregion: --- Session Manager

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::ChangeFeed;
    use crate::store::MemoryStore;

    fn manager() -> SessionManager {
        let store = Arc::new(MemoryStore::new(Arc::new(ChangeFeed::new())));
        SessionManager::new(store)
    }

    fn signup_request() -> SignupRequest {
        SignupRequest {
            full_name: "Amit Sharma".to_string(),
            email: "Amit@Mail.com".to_string(),
            password: "secret1".to_string(),
            city: "Vadodara".to_string(),
            accept_terms: true,
        }
    }

    #[tokio::test]
    async fn signup_then_login_with_same_credentials() {
        let sessions = manager();
        let first = sessions.signup(signup_request()).await.unwrap();
        assert_eq!(first.user.email, "amit@mail.com");
        assert_eq!(first.user.role, Role::User);

        let second = sessions
            .login(LoginRequest {
                email: "amit@mail.com".to_string(),
                password: "secret1".to_string(),
            })
            .await
            .unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(sessions.active_count().await, 2);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let sessions = manager();
        sessions.signup(signup_request()).await.unwrap();
        let result = sessions
            .login(LoginRequest {
                email: "amit@mail.com".to_string(),
                password: "wrong-pass".to_string(),
            })
            .await;
        assert!(matches!(result, Err(MarketError::Unauthenticated)));
    }

    #[tokio::test]
    async fn signup_validates_city_password_and_terms() {
        let sessions = manager();

        let mut req = signup_request();
        req.city = "Mumbai".to_string();
        assert!(matches!(
            sessions.signup(req).await,
            Err(MarketError::Validation(_))
        ));

        let mut req = signup_request();
        req.password = "12345".to_string();
        assert!(matches!(
            sessions.signup(req).await,
            Err(MarketError::Validation(_))
        ));

        let mut req = signup_request();
        req.accept_terms = false;
        assert!(matches!(
            sessions.signup(req).await,
            Err(MarketError::TermsNotAccepted)
        ));
    }

    #[tokio::test]
    async fn logout_drops_the_session() {
        let sessions = manager();
        let info = sessions.signup(signup_request()).await.unwrap();
        sessions.logout(info.token).await.unwrap();
        assert!(sessions.get(info.token).await.is_none());
        assert!(matches!(
            sessions.logout(info.token).await,
            Err(MarketError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let sessions = manager();
        let config = Config::default();
        let first = sessions.ensure_admin(&config).await.unwrap();
        let second = sessions.ensure_admin(&config).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);
    }
}
