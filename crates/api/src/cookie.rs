//! Session cookie encoding.

use axum::http::{header, HeaderMap, HeaderValue};

use scheduler_auth::SessionId;

/// Raw value of cookie `name`, if the request sent one.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

/// Read the session id from the `Cookie` header.
///
/// An unparseable value is treated like no session at all.
pub fn session_from_headers(headers: &HeaderMap, name: &str) -> Option<SessionId> {
    cookie_value(headers, name).and_then(SessionId::parse)
}

/// `Set-Cookie` value binding the session; `None` if `name` is not a valid header token.
pub fn set_session(name: &str, id: SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!("{name}={id}; HttpOnly; SameSite=Lax; Path=/")).ok()
}

/// `Set-Cookie` value expiring the session cookie.
pub fn clear_session(name: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{name}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax; Path=/"
    ))
    .ok()
}

/// Append a `Set-Cookie` header, or nothing when the value could not be built.
pub fn append(headers: &mut HeaderMap, value: Option<HeaderValue>) {
    match value {
        Some(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        None => tracing::warn!("session cookie not sent: invalid header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_named_cookie_among_others() {
        let id = SessionId::random();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; SESSION={id}; other=1")).unwrap(),
        );

        assert_eq!(session_from_headers(&headers, "SESSION"), Some(id));
        assert_eq!(session_from_headers(&headers, "MISSING"), None);
    }

    #[test]
    fn garbage_session_value_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("SESSION=not-a-session"));
        assert_eq!(session_from_headers(&headers, "SESSION"), None);
        assert_eq!(cookie_value(&headers, "SESSION"), Some("not-a-session"));
    }

    #[test]
    fn set_and_clear_are_http_only() {
        let id = SessionId::random();
        let set = set_session("SESSION", id).unwrap();
        let set = set.to_str().unwrap();
        assert!(set.starts_with(&format!("SESSION={id};")));
        assert!(set.contains("HttpOnly"));

        let cleared = clear_session("SESSION").unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn invalid_cookie_name_sends_no_header() {
        assert_eq!(set_session("bad\nname", SessionId::random()), None);
        assert_eq!(clear_session("bad\nname"), None);

        let mut headers = HeaderMap::new();
        append(&mut headers, clear_session("bad\nname"));
        assert!(headers.get(header::SET_COOKIE).is_none());

        append(&mut headers, clear_session("SESSION"));
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 1);
    }
}
