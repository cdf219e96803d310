//! Authorization gate and [CSRF] protection middlewares.
//!
//! [CSRF]: https://owasp.org/www-community/attacks/csrf

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse as _, Redirect, Response},
    Extension,
};
use http::{header, HeaderMap, Method, Uri};
use tracing as log;

use crate::{define_error, session, Error, GRAPHQL_PATH};

/// Authorization gate configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path prefixes requiring an authenticated session.
    pub protected: Vec<String>,

    /// Path of the sign-in page unauthenticated requests are redirected to.
    pub sign_in: String,
}

impl Config {
    /// Indicates whether the provided `path` requires an authenticated
    /// session.
    #[must_use]
    pub fn protects(&self, path: &str) -> bool {
        self.protected.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Returns the sign-in location bringing the user back to the provided
    /// `path` afterwards.
    #[must_use]
    pub fn sign_in_location(&self, path: &str) -> String {
        format!("{}?callbackUrl={}", self.sign_in, urlencoding::encode(path))
    }
}

/// Middleware letting requests to protected paths through only with an
/// authenticated session.
///
/// An expired session is refreshed once. If that fails, the session cookies
/// are cleared and the request is redirected to the sign-in page.
pub async fn protect(
    Extension(config): Extension<Config>,
    store: session::Store,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_owned();
    if !config.protects(&path) {
        return next.run(req).await;
    }

    let session = match store.get().await {
        Some(session) => Some(session),
        None => store.refresh().await,
    };
    let Some(session) = session else {
        log::debug!("unauthenticated request to `{path}`, redirecting");
        store.clear().await;
        return Redirect::to(&config.sign_in_location(&path)).into_response();
    };

    _ = req.extensions_mut().insert(session);
    next.run(req).await
}

/// Middleware rejecting state-changing GraphQL requests coming from another
/// origin.
pub async fn csrf(req: Request, next: Next) -> Response {
    let is_safe = matches!(
        *req.method(),
        Method::GET | Method::HEAD | Method::OPTIONS,
    );
    if req.uri().path() != GRAPHQL_PATH
        || is_safe
        || is_same_origin(req.headers())
    {
        return next.run(req).await;
    }

    log::warn!(
        "CSRF validation failed for `{} {}`",
        req.method(),
        req.uri().path(),
    );
    Error::from(CsrfError::ValidationFailed).into_response()
}

/// Checks whether the `Origin` (or, failing that, `Referer`) header of a
/// request points to the same authority as its `Host` header.
fn is_same_origin(headers: &HeaderMap) -> bool {
    let get = |name: header::HeaderName| {
        headers.get(name).and_then(|h| h.to_str().ok())
    };
    let matches_host = |url: &str| -> Option<bool> {
        let host = get(header::HOST)?;
        let uri = url.parse::<Uri>().ok()?;
        Some(
            uri.authority()
                .is_some_and(|a| a.as_str().eq_ignore_ascii_case(host)),
        )
    };

    if let Some(origin) = get(header::ORIGIN) {
        match matches_host(origin) {
            Some(true) => return true,
            Some(false) => {}
            None => return false,
        }
    }
    get(header::REFERER)
        .and_then(matches_host)
        .unwrap_or(false)
}

define_error! {
    enum CsrfError {
        #[code = "CSRF_VALIDATION_FAILED"]
        #[status = FORBIDDEN]
        #[message = "CSRF validation failed"]
        ValidationFailed,
    }
}

#[cfg(test)]
mod spec {
    use http::{header, HeaderMap, HeaderValue};

    use super::{is_same_origin, Config};

    fn headers(pairs: &[(header::HeaderName, &'static str)]) -> HeaderMap {
        pairs
            .iter()
            .map(|(n, v)| (n.clone(), HeaderValue::from_static(*v)))
            .collect()
    }

    #[test]
    fn protects_configured_prefixes_only() {
        let conf = Config {
            protected: vec!["/private".into()],
            sign_in: "/signin".into(),
        };

        assert!(conf.protects("/private"));
        assert!(conf.protects("/private/settings"));
        assert!(!conf.protects("/"));
        assert!(!conf.protects("/api/auth/signin"));
    }

    #[test]
    fn encodes_callback_url() {
        let conf = Config {
            protected: vec![],
            sign_in: "/signin".into(),
        };

        assert_eq!(
            conf.sign_in_location("/private/a b"),
            "/signin?callbackUrl=%2Fprivate%2Fa%20b",
        );
    }

    #[test]
    fn accepts_same_origin() {
        assert!(is_same_origin(&headers(&[
            (header::HOST, "localhost:3000"),
            (header::ORIGIN, "http://localhost:3000"),
        ])));
        assert!(is_same_origin(&headers(&[
            (header::HOST, "localhost:3000"),
            (header::REFERER, "http://localhost:3000/private?x=1"),
        ])));
        assert!(is_same_origin(&headers(&[
            (header::HOST, "localhost:3000"),
            (header::ORIGIN, "http://evil.example"),
            (header::REFERER, "http://localhost:3000/private"),
        ])));
    }

    #[test]
    fn rejects_foreign_or_missing_origin() {
        assert!(!is_same_origin(&headers(&[(
            header::HOST,
            "localhost:3000"
        )])));
        assert!(!is_same_origin(&headers(&[
            (header::HOST, "localhost:3000"),
            (header::ORIGIN, "http://evil.example"),
        ])));
        assert!(!is_same_origin(&headers(&[
            (header::HOST, "localhost:3000"),
            (header::ORIGIN, "http://localhost:3001"),
        ])));
        assert!(!is_same_origin(&headers(&[(
            header::ORIGIN,
            "http://localhost:3000"
        )])));
    }
}
