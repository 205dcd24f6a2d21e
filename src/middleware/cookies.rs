use axum::http::{header, HeaderMap};

/// Value of a request cookie; later duplicates win
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .last()
}

/// `Set-Cookie` value for a site-wide, script-invisible cookie
pub fn set_cookie(name: &str, value: &str, max_age_secs: Option<u64>) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value);
    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={}", max_age));
    }
    cookie
}

pub fn clear_cookie(name: &str) -> String {
    set_cookie(name, "", Some(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn reads_cookie_pairs() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1; dapi_session=abc.def"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(get_cookie(&headers, "dapi_session").as_deref(), Some("abc.def"));
        assert_eq!(get_cookie(&headers, "b").as_deref(), Some("2"));
        assert_eq!(get_cookie(&headers, "c"), None);
    }

    #[test]
    fn formats_set_cookie() {
        assert_eq!(
            set_cookie("x", "1", Some(60)),
            "x=1; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert!(clear_cookie("x").starts_with("x=;"));
    }
}
