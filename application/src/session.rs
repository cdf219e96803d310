//! Cookie-backed session [`Store`].

use std::{sync::Arc, time::Duration};

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    middleware::Next,
    response::{IntoResponse as _, Response},
    Extension,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service::{
    cipher::Sealed,
    command::{
        create_user_session, AuthorizeUserSession, Command as _,
        RefreshUserSession,
    },
    domain::Session,
};
use tokio::sync::Mutex;
use tracing as log;

use crate::{define_error, Error, Service};

/// Name of the cookie holding the sealed access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Name of the cookie holding the sealed ID token.
pub const ID_TOKEN_COOKIE: &str = "id_token";

/// Name of the cookie holding the sealed refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Session cookies configuration.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Indicator whether the cookies are marked `Secure`.
    pub secure: bool,

    /// Lifetime of the access and ID token cookies.
    pub access_ttl: Duration,

    /// Lifetime of the refresh token cookie.
    pub refresh_ttl: Duration,
}

/// Per-request store of the current [`Session`], kept in encrypted cookies.
///
/// Cheap to clone: every clone shares the same cookie jar, which is written
/// to the response by the [`attach()`] middleware.
#[derive(Clone, Debug)]
pub struct Store(Arc<Inner>);

/// Shared state of a [`Store`].
#[derive(Debug)]
struct Inner {
    /// [`Service`] authorizing and refreshing [`Session`]s.
    service: Service,

    /// Cookies [`Config`].
    config: Config,

    /// Mutable [`State`] of the request.
    state: Mutex<State>,
}

/// Mutable state of a [`Store`].
#[derive(Debug)]
struct State {
    /// Cookies of the request, along with the changes to send back.
    jar: CookieJar,

    /// [`Session`] resolved during the request.
    ///
    /// [`None`] until resolved for the first time.
    current: Option<Option<Session>>,
}

impl Store {
    /// Creates a new [`Store`] over the provided request cookies.
    #[must_use]
    pub fn new(service: Service, config: Config, jar: CookieJar) -> Self {
        Self(Arc::new(Inner {
            service,
            config,
            state: Mutex::new(State { jar, current: None }),
        }))
    }

    /// Returns the [`Service`] of this [`Store`].
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.0.service
    }

    /// Returns the current [`Session`], if the request carries a valid one.
    ///
    /// Never refreshes an expired [`Session`], and resolves it at most once
    /// per request.
    pub async fn get(&self) -> Option<Session> {
        let mut state = self.0.state.lock().await;
        if let Some(current) = &state.current {
            return current.clone();
        }

        let session = match state.jar.get(ID_TOKEN_COOKIE) {
            Some(cookie) => self
                .0
                .service
                .execute(AuthorizeUserSession::from(Sealed::from(
                    cookie.value().to_owned(),
                )))
                .await
                .map_err(|e| log::debug!("`Session` is not authorized: {e}"))
                .ok(),
            None => None,
        };
        state.current = Some(session.clone());
        session
    }

    /// Saves the provided [`create_user_session::Output`] into the cookies,
    /// making its [`Session`] the current one.
    pub async fn save(&self, output: create_user_session::Output) -> Session {
        let create_user_session::Output { session, tokens } = output;
        let Config {
            access_ttl,
            refresh_ttl,
            ..
        } = self.0.config;

        let mut state = self.0.state.lock().await;
        let mut jar = state
            .jar
            .clone()
            .add(self.cookie(
                ACCESS_TOKEN_COOKIE,
                tokens.access_token,
                access_ttl,
            ))
            .add(self.cookie(ID_TOKEN_COOKIE, tokens.id_token, access_ttl));
        if let Some(refresh_token) = tokens.refresh_token {
            jar = jar.add(self.cookie(
                REFRESH_TOKEN_COOKIE,
                refresh_token,
                refresh_ttl,
            ));
        }
        state.jar = jar;
        state.current = Some(Some(session.clone()));

        log::debug!("`Session` of `User(id: {})` saved", session.user.id);
        session
    }

    /// Removes all the session cookies, whatever they hold.
    pub async fn clear(&self) {
        let mut state = self.0.state.lock().await;
        state.jar = [ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE]
            .into_iter()
            .fold(state.jar.clone(), |jar, name| {
                jar.remove(Cookie::build(name).path("/"))
            });
        state.current = Some(None);
    }

    /// Refreshes the current [`Session`] with the refresh token cookie.
    ///
    /// [`None`] is returned if there is no refresh token, or the identity
    /// provider rejects it.
    pub async fn refresh(&self) -> Option<Session> {
        let (refresh_token, id_token) = {
            let state = self.0.state.lock().await;
            let sealed = |name: &str| {
                state
                    .jar
                    .get(name)
                    .map(|c| Sealed::from(c.value().to_owned()))
            };
            (sealed(REFRESH_TOKEN_COOKIE)?, sealed(ID_TOKEN_COOKIE))
        };

        let output = self
            .0
            .service
            .execute(RefreshUserSession {
                refresh_token,
                id_token,
            })
            .await
            .map_err(|e| log::warn!("failed to refresh `Session`: {e}"))
            .ok()?;
        Some(self.save(output).await)
    }

    /// Returns the cookie jar with the changes made during the request.
    pub async fn jar(&self) -> CookieJar {
        self.0.state.lock().await.jar.clone()
    }

    /// Builds a session cookie holding the provided [`Sealed`] value.
    fn cookie(
        &self,
        name: &'static str,
        value: Sealed,
        ttl: Duration,
    ) -> Cookie<'static> {
        Cookie::build((name, value.into_inner()))
            .http_only(true)
            .secure(self.0.config.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(
                time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX),
            )
            .build()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Store
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| {
                Error::internal(&"missing `session::Store` extension")
            })
    }
}

/// Middleware attaching a [`Store`] to every request and writing its cookie
/// changes to the response.
pub async fn attach(
    Extension(service): Extension<Service>,
    Extension(config): Extension<Config>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let store = Store::new(service, config, jar);
    _ = req.extensions_mut().insert(store.clone());

    let res = next.run(req).await;
    (store.jar().await, res).into_response()
}

/// [`Session`] of the authenticated user, resolved by the authorization gate.
#[derive(Clone, Debug)]
pub struct Current(pub Session);

#[async_trait]
impl<S> FromRequestParts<S> for Current
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut http::request::Parts,
        _: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self)
            .ok_or_else(|| AuthError::AuthorizationRequired.into())
    }
}

define_error! {
    enum AuthError {
        #[code = "AUTHORIZATION_REQUIRED"]
        #[status = UNAUTHORIZED]
        #[message = "Authorization required"]
        AuthorizationRequired,
    }
}
