use std::time::Duration;

use axum::http::{HeaderMap, header};
use moka::future::Cache;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AppError;

/// 会话数据。
#[derive(Debug, Clone, Copy)]
pub struct SessionData {
    pub authenticated: bool,
    pub admin: bool,
}

/// 会话 Cookie 名。
pub const SESSION_COOKIE: &str = "sid";

/// 进程内会话服务。
///
/// 会话保存在带 TTL 的缓存中，重启即失效；
/// 凭据有两档：站点口令（普通会话）与管理口令（管理会话）。
pub struct SessionService {
    sessions: Cache<String, SessionData>,
    site_password: String,
    admin_key: String,
    ttl_secs: u64,
}

impl SessionService {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            sessions: Cache::builder()
                .time_to_live(Duration::from_secs(cfg.session_ttl_secs))
                .build(),
            site_password: cfg.site_password.clone(),
            admin_key: cfg.admin_key.clone(),
            ttl_secs: cfg.session_ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// 校验口令并创建会话，返回会话 ID。管理口令优先判定。
    pub async fn login(&self, password: &str) -> Result<(String, SessionData), AppError> {
        let data = if !self.admin_key.is_empty() && password == self.admin_key {
            SessionData {
                authenticated: true,
                admin: true,
            }
        } else if password == self.site_password {
            SessionData {
                authenticated: true,
                admin: false,
            }
        } else {
            return Err(AppError::Auth("口令错误".to_string()));
        };

        let sid = Uuid::new_v4().to_string();
        self.sessions.insert(sid.clone(), data).await;
        Ok((sid, data))
    }

    /// 注销指定会话（幂等）。
    pub async fn logout(&self, headers: &HeaderMap) {
        if let Some(sid) = session_id_from_headers(headers) {
            self.sessions.invalidate(sid).await;
        }
    }

    /// 从请求头解析会话并校验，未登录返回 401。
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<SessionData, AppError> {
        let sid = session_id_from_headers(headers)
            .ok_or_else(|| AppError::Auth("未登录".to_string()))?;
        self.sessions
            .get(sid)
            .await
            .filter(|s| s.authenticated)
            .ok_or_else(|| AppError::Auth("会话已失效，请重新登录".to_string()))
    }
}

/// 从 Cookie 头提取会话 ID。
fn session_id_from_headers(headers: &HeaderMap) -> Option<&str> {
    let cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookie.split(';') {
        let mut kv = pair.trim().splitn(2, '=');
        if kv.next() == Some(SESSION_COOKIE)
            && let Some(v) = kv.next()
        {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn service() -> SessionService {
        SessionService::new(&AuthConfig {
            site_password: "member-pass".to_string(),
            admin_key: "admin-pass".to_string(),
            session_ttl_secs: 60,
        })
    }

    fn cookie_headers(sid: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; sid={sid}")).unwrap(),
        );
        h
    }

    #[tokio::test]
    async fn login_distinguishes_member_and_admin() {
        let svc = service();

        let (_, member) = svc.login("member-pass").await.unwrap();
        assert!(member.authenticated);
        assert!(!member.admin);

        let (_, admin) = svc.login("admin-pass").await.unwrap();
        assert!(admin.admin);

        assert!(matches!(
            svc.login("wrong").await,
            Err(AppError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn authorize_accepts_live_session_and_rejects_after_logout() {
        let svc = service();
        let (sid, _) = svc.login("member-pass").await.unwrap();
        let headers = cookie_headers(&sid);

        assert!(svc.authorize(&headers).await.is_ok());

        svc.logout(&headers).await;
        assert!(matches!(
            svc.authorize(&headers).await,
            Err(AppError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn authorize_rejects_missing_or_unknown_cookie() {
        let svc = service();
        assert!(svc.authorize(&HeaderMap::new()).await.is_err());
        assert!(svc.authorize(&cookie_headers("ghost")).await.is_err());
    }

    #[test]
    fn session_id_parsing_handles_multiple_cookies() {
        let h = cookie_headers("abc123");
        assert_eq!(session_id_from_headers(&h), Some("abc123"));
        assert_eq!(session_id_from_headers(&HeaderMap::new()), None);
    }
}
