//! Shared-secret password gate with a marker cookie session.
//!
//! A session is nothing more than a cookie named after the gate carrying the
//! literal value `authenticated`. There is no signing and no server-side
//! session store: whoever holds the cookie is in, and logging out means
//! telling the browser to drop it.

use axum::http::header::{self, InvalidHeaderValue};
use axum::http::{HeaderMap, HeaderValue};
use subtle::ConstantTimeEq;

use crate::config::{Environment, GateKind, GateSettings, Secret};

/// Cookie value marking an authenticated session.
pub const SESSION_MARKER: &str = "authenticated";

/// 30 days.
pub const SESSION_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
        }
    }
}

/// One password gate (preview or admin).
#[derive(Debug, Clone)]
pub struct AuthGate {
    kind: GateKind,
    enabled: bool,
    cookie_name: String,
    secret: Option<Secret>,
    login_path: String,
    issue_cookie: HeaderValue,
    clear_cookie: HeaderValue,
}

impl AuthGate {
    /// Build a gate. The admin gate uses `SameSite=Strict`; cookies are
    /// `Secure` in production.
    pub fn new(
        kind: GateKind,
        settings: &GateSettings,
        environment: Environment,
    ) -> Result<Self, InvalidHeaderValue> {
        let same_site = match kind {
            GateKind::Preview => SameSite::Lax,
            GateKind::Admin => SameSite::Strict,
        };
        let secure = environment.is_production();
        let name = settings.cookie_name.as_str();

        Ok(Self {
            kind,
            enabled: settings.enabled,
            cookie_name: settings.cookie_name.clone(),
            secret: settings.password.clone(),
            login_path: settings.login_path.clone(),
            issue_cookie: build_cookie(name, SESSION_MARKER, SESSION_MAX_AGE_SECS, same_site, secure)?,
            clear_cookie: build_cookie(name, "", 0, same_site, secure)?,
        })
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Exact match against the configured secret. Fails closed when no
    /// secret is configured.
    pub fn verify(&self, supplied: &str) -> bool {
        match &self.secret {
            Some(secret) => bool::from(supplied.as_bytes().ct_eq(secret.expose().as_bytes())),
            None => false,
        }
    }

    /// `Set-Cookie` value starting a session.
    pub fn issue_session(&self) -> HeaderValue {
        self.issue_cookie.clone()
    }

    /// `Set-Cookie` value ending a session. Safe to send any number of times.
    pub fn clear_session(&self) -> HeaderValue {
        self.clear_cookie.clone()
    }

    /// True iff the request carries this gate's cookie with the marker value.
    pub fn check_session(&self, headers: &HeaderMap) -> bool {
        cookie_values(headers, &self.cookie_name).any(|value| value == SESSION_MARKER)
    }

    /// Whether a request passes this gate: disabled gates admit everyone.
    pub fn admits(&self, headers: &HeaderMap) -> bool {
        !self.enabled || self.check_session(headers)
    }

    /// Login page URL carrying the originally requested location.
    pub fn login_redirect(&self, original: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(original.as_bytes()).collect();
        format!("{}?redirect={}", self.login_path, encoded)
    }
}

fn build_cookie(
    name: &str,
    value: &str,
    max_age: u64,
    same_site: SameSite,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite={}",
        name,
        value,
        max_age,
        same_site.as_str()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Every value of the named cookie across all `Cookie` headers.
pub fn cookie_values<'a>(
    headers: &'a HeaderMap,
    name: &'a str,
) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(move |pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// The preview and admin gates.
#[derive(Debug, Clone)]
pub struct AuthGates {
    preview: AuthGate,
    admin: AuthGate,
}

impl AuthGates {
    pub fn new(preview: AuthGate, admin: AuthGate) -> Self {
        Self { preview, admin }
    }

    pub fn get(&self, kind: GateKind) -> &AuthGate {
        match kind {
            GateKind::Preview => &self.preview,
            GateKind::Admin => &self.admin,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuthGate> {
        [&self.preview, &self.admin].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    fn preview_gate(secret: Option<&str>, environment: Environment) -> AuthGate {
        let mut settings = AuthConfig::default().preview;
        settings.password = secret.map(Secret::new);
        AuthGate::new(GateKind::Preview, &settings, environment).unwrap()
    }

    fn cookie_header(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_verify_exact_match() {
        let gate = preview_gate(Some("mindmuscle2025"), Environment::Production);
        assert!(gate.verify("mindmuscle2025"));
        assert!(!gate.verify("wrong"));
        assert!(!gate.verify("mindmuscle2025 "));
        assert!(!gate.verify(""));
    }

    #[test]
    fn test_verify_fails_closed_without_secret() {
        let gate = preview_gate(None, Environment::Production);
        assert!(!gate.has_secret());
        assert!(!gate.verify(""));
        assert!(!gate.verify("anything"));
    }

    #[test]
    fn test_issue_cookie_attributes() {
        let prod = preview_gate(Some("x"), Environment::Production);
        assert_eq!(
            prod.issue_session(),
            "preview_auth=authenticated; Path=/; Max-Age=2592000; HttpOnly; SameSite=Lax; Secure"
        );

        let dev = preview_gate(Some("x"), Environment::Development);
        assert_eq!(
            dev.issue_session(),
            "preview_auth=authenticated; Path=/; Max-Age=2592000; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_admin_cookie_is_strict() {
        let settings = AuthConfig::default().admin;
        let gate = AuthGate::new(GateKind::Admin, &settings, Environment::Production).unwrap();
        let cookie = gate.issue_session();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("admin_auth=authenticated;"));
        assert!(cookie.contains("SameSite=Strict"));
    }

    #[test]
    fn test_clear_session_is_repeatable() {
        let gate = preview_gate(Some("x"), Environment::Development);
        let first = gate.clear_session();
        let second = gate.clear_session();
        assert_eq!(first, second);
        assert_eq!(
            first,
            "preview_auth=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_check_session() {
        let gate = preview_gate(Some("x"), Environment::Production);

        assert!(gate.check_session(&cookie_header("preview_auth=authenticated")));
        assert!(gate.check_session(&cookie_header(
            "theme=dark; preview_auth=authenticated; other=1"
        )));
        assert!(!gate.check_session(&cookie_header("preview_auth=Authenticated")));
        assert!(!gate.check_session(&cookie_header("preview_auth=")));
        assert!(!gate.check_session(&cookie_header("admin_auth=authenticated")));
        assert!(!gate.check_session(&cookie_header("xpreview_auth=authenticated")));
        assert!(!gate.check_session(&HeaderMap::new()));
    }

    #[test]
    fn test_split_cookie_headers() {
        let gate = preview_gate(Some("x"), Environment::Production);
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(header::COOKIE, HeaderValue::from_static("preview_auth=authenticated"));
        assert!(gate.check_session(&headers));
    }

    #[test]
    fn test_disabled_gate_admits_everyone() {
        let mut settings = AuthConfig::default().preview;
        settings.enabled = false;
        let gate = AuthGate::new(GateKind::Preview, &settings, Environment::Production).unwrap();
        assert!(gate.admits(&HeaderMap::new()));
    }

    #[test]
    fn test_login_redirect_encodes_target() {
        let gate = preview_gate(None, Environment::Production);
        assert_eq!(
            gate.login_redirect("/pricing?plan=team"),
            "/password?redirect=%2Fpricing%3Fplan%3Dteam"
        );
    }
}
