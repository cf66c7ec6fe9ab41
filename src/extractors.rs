use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::fmt;

use crate::blog::parse_page_param;

pub const FLASH_COOKIE: &str = "scribe_flash";

/// Requested page from the `page` query parameter. Never rejects: anything
/// unusable becomes page 1 and clamping happens against the real count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParam(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for PageParam {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == "page")
                .map(|(_, value)| value.into_owned())
        });
        Ok(PageParam(parse_page_param(raw.as_deref())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Notice,
    Alert,
}

impl FlashKind {
    fn as_str(self) -> &'static str {
        match self {
            FlashKind::Notice => "notice",
            FlashKind::Alert => "alert",
        }
    }
}

/// One-shot message carried across a redirect in a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Notice,
            message: message.into(),
        }
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Alert,
            message: message.into(),
        }
    }

    pub fn is_alert(&self) -> bool {
        self.kind == FlashKind::Alert
    }

    /// `Set-Cookie` value that stores this flash for the next request.
    pub fn set_cookie(&self) -> String {
        let encoded: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(self.kind.as_str(), &self.message)
            .finish();
        format!("{FLASH_COOKIE}={encoded}; HttpOnly; SameSite=Lax; Path=/; Max-Age=60")
    }

    /// `Set-Cookie` value that removes a consumed flash.
    pub fn clear_cookie() -> String {
        format!("{FLASH_COOKIE}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0")
    }

    fn decode(raw: &str) -> Option<Self> {
        let (kind, message) = url::form_urlencoded::parse(raw.as_bytes()).next()?;
        let kind = match kind.as_ref() {
            "notice" => FlashKind::Notice,
            "alert" => FlashKind::Alert,
            _ => return None,
        };
        Some(Self {
            kind,
            message: message.into_owned(),
        })
    }
}

impl fmt::Display for Flash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Flash left by the previous response, if any.
pub struct IncomingFlash(pub Option<Flash>);

impl<S: Send + Sync> FromRequestParts<S> for IncomingFlash {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(
            extract_cookie(parts, FLASH_COOKIE).and_then(Flash::decode),
        ))
    }
}

fn extract_cookie<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
