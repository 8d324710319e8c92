//! Cookie-backed sessions and one-shot flash messages.

use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "mathquiz_session";
pub const FLASH_COOKIE: &str = "mathquiz_flash";

/// Return the caller's session id, issuing a new one if absent.
pub fn session_id(cookies: &Cookies) -> String {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        let value = cookie.value();
        if Uuid::parse_str(value).is_ok() {
            return value.to_string();
        }
    }

    let id = Uuid::new_v4().to_string();
    tracing::debug!(session = %id, "issued new session");
    cookies.add(
        Cookie::build((SESSION_COOKIE, id.clone()))
            .path("/")
            .http_only(true)
            .build(),
    );
    id
}

/// Messages shown once on the next rendered page.
///
/// The cookie carries only the variant's code, so no escaping is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    NoResults,
    NoTestIndex,
    NoHistory,
    InvalidTestIndex,
    InvalidTestIndexFormat,
    NoTestInProgress,
}

impl Flash {
    const ALL: [Flash; 6] = [
        Flash::NoResults,
        Flash::NoTestIndex,
        Flash::NoHistory,
        Flash::InvalidTestIndex,
        Flash::InvalidTestIndexFormat,
        Flash::NoTestInProgress,
    ];

    fn code(self) -> &'static str {
        match self {
            Flash::NoResults => "no-results",
            Flash::NoTestIndex => "no-test-index",
            Flash::NoHistory => "no-history",
            Flash::InvalidTestIndex => "invalid-test-index",
            Flash::InvalidTestIndexFormat => "invalid-test-index-format",
            Flash::NoTestInProgress => "no-test-in-progress",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Flash::NoResults => "No test results found.",
            Flash::NoTestIndex => "No test index provided.",
            Flash::NoHistory => "No test history found.",
            Flash::InvalidTestIndex => "Invalid test index.",
            Flash::InvalidTestIndexFormat => "Invalid test index format.",
            Flash::NoTestInProgress => "No test in progress. Please start a new test.",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.code() == code)
    }
}

pub fn set_flash(cookies: &Cookies, flash: Flash) {
    cookies.add(
        Cookie::build((FLASH_COOKIE, flash.code()))
            .path("/")
            .http_only(true)
            .build(),
    );
}

/// Read and clear the pending flash message.
pub fn take_flash(cookies: &Cookies) -> Option<&'static str> {
    let code = cookies.get(FLASH_COOKIE)?.value().to_string();
    cookies.remove(Cookie::build(FLASH_COOKIE).path("/").build());
    Flash::from_code(&code).map(Flash::message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for flash in Flash::ALL {
            assert_eq!(Flash::from_code(flash.code()), Some(flash));
        }
        assert_eq!(Flash::from_code("bogus"), None);
    }

    #[test]
    fn codes_are_cookie_safe() {
        for flash in Flash::ALL {
            assert!(flash
                .code()
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-'));
        }
    }
}
