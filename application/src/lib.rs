//! Application provides HTTP API for interacting with the [`Service`].

#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod api;
pub mod args;
pub mod config;
mod context;
pub mod error;
pub mod gate;
pub mod rest;
pub mod session;

use std::sync::Arc;

use axum::{
    middleware,
    response::{IntoResponse, Response},
    routing::{get, on, post, MethodFilter},
    Extension, Json, Router,
};
use derive_more::Debug;
use juniper::{
    http::{GraphQLBatchRequest, GraphQLBatchResponse, GraphQLResponse},
    DefaultScalarValue, Definition, IntoFieldError as _, OperationType,
    ScalarValue,
};
use juniper_axum::extract::JuniperRequest;
// Used in binary.
use axum_client_ip as _;
use tower_http as _;
use tracing_subscriber as _;

pub use self::{
    args::Args,
    config::Config,
    context::Context,
    error::{AsError, Error},
};

/// [`Service`] with filled infrastructure dependencies.
///
/// [`Service`]: service::Service
pub type Service =
    service::Service<service::infra::Identity, service::infra::Memory>;

/// Path of the GraphQL endpoint.
pub const GRAPHQL_PATH: &str = "/graphql";

/// [`juniper`] GraphQL response.
#[derive(Debug)]
pub struct JuniperResponse<S = DefaultScalarValue>
where
    S: ScalarValue,
{
    /// Status code of the response.
    pub status_code: http::StatusCode,

    /// Underlying GraphQL response.
    #[debug(skip)]
    pub response: GraphQLBatchResponse<S>,
}

impl<S> IntoResponse for JuniperResponse<S>
where
    S: ScalarValue,
{
    fn into_response(self) -> Response {
        let Self {
            status_code,
            response,
        } = self;

        if response.is_ok() {
            Json(response).into_response()
        } else {
            (status_code, Json(response)).into_response()
        }
    }
}

/// GraphQL API handler.
///
/// Mutations are executed for `POST` requests only, as `GET` ones bypass the
/// [CSRF] check.
///
/// [CSRF]: https://owasp.org/www-community/attacks/csrf
pub async fn graphql(
    Extension(schema): Extension<Arc<api::Schema>>,
    method: http::Method,
    context: Context,
    JuniperRequest(gql_request): JuniperRequest,
) -> Response {
    if method == http::Method::GET && has_mutation(&schema, &gql_request) {
        let err = Error::from(GraphqlError::MutationOverGet);
        let status_code = err.status_code;
        let response: GraphQLBatchResponse = GraphQLBatchResponse::Single(
            GraphQLResponse::error(err.into_field_error()),
        );
        return (status_code, Json(response)).into_response();
    }

    JuniperResponse {
        status_code: context.error_status_code(),
        response: gql_request.execute(&*schema, &context).await,
    }
    .into_response()
}

/// Checks whether any document of the provided [`GraphQLBatchRequest`]
/// defines a mutation operation.
///
/// Unparsable documents are left for [`juniper`] to reject.
fn has_mutation(schema: &api::Schema, request: &GraphQLBatchRequest) -> bool {
    let requests = match request {
        GraphQLBatchRequest::Single(req) => std::slice::from_ref(req),
        GraphQLBatchRequest::Batch(reqs) => reqs.as_slice(),
    };
    requests.iter().any(|req| {
        juniper::parser::parse_document_source(&req.query, &schema.schema)
            .is_ok_and(|doc| {
                doc.iter().any(|def| {
                    matches!(
                        def,
                        Definition::Operation(op)
                            if matches!(
                                op.item.operation_type,
                                OperationType::Mutation,
                            ),
                    )
                })
            })
    })
}

crate::define_error! {
    enum GraphqlError {
        #[code = "MUTATION_OVER_GET"]
        #[status = METHOD_NOT_ALLOWED]
        #[message = "Mutations must be sent with `POST` requests"]
        MutationOverGet,
    }
}

/// Builds the [`Router`] serving the whole API of the provided [`Service`].
///
/// Every request gets a [`session::Store`] attached, passes the [CSRF] check
/// and, for protected paths, the authorization gate.
///
/// [CSRF]: https://owasp.org/www-community/attacks/csrf
pub fn router(
    service: Service,
    session: session::Config,
    gate: gate::Config,
) -> Router {
    let schema = api::Schema::new(
        api::Query,
        api::Mutation,
        juniper::EmptySubscription::new(),
    );

    Router::new()
        .route(
            GRAPHQL_PATH,
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .route("/api/auth/signin", post(rest::sign_in))
        .route("/api/auth/change-password", post(rest::change_password))
        .route("/api/auth/signout", post(rest::sign_out))
        .route("/private", get(rest::private))
        .layer(middleware::from_fn(gate::protect))
        .layer(middleware::from_fn(gate::csrf))
        .layer(middleware::from_fn(session::attach))
        .layer(Extension(Arc::new(schema)))
        .layer(Extension(service))
        .layer(Extension(session))
        .layer(Extension(gate))
}

#[cfg(test)]
mod spec {
    use std::{sync::LazyLock, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        response::Response,
        Router,
    };
    use axum_extra::extract::cookie::{Cookie, SameSite};
    use http::{header, Method, Request, StatusCode};
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use service::{
        infra::{Fake, Memory},
        Cipher,
    };
    use tower::ServiceExt as _;

    use super::{gate, router, session, Service};

    /// [`Cipher`] shared by the tests, as deriving one is slow.
    static CIPHER: LazyLock<Cipher> = LazyLock::new(|| {
        Cipher::derive(&SecretString::from("router-tests")).unwrap()
    });

    fn app(idp: Fake) -> Router {
        router(
            Service::new(
                service::Config {
                    cipher: CIPHER.clone(),
                },
                idp.into(),
                Memory::default(),
            ),
            session::Config {
                secure: false,
                access_ttl: Duration::from_secs(60 * 60),
                refresh_ttl: Duration::from_secs(24 * 60 * 60),
            },
            gate::Config {
                protected: vec!["/private".into()],
                sign_in: "/signin".into(),
            },
        )
    }

    fn request(
        method: Method,
        uri: &str,
        cookies: &str,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "localhost:3000");
        if !cookies.is_empty() {
            req = req.header(header::COOKIE, cookies);
        }
        match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap()
    }

    async fn body(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookies(res: &Response) -> Vec<Cookie<'static>> {
        res.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse(v.to_str().unwrap().to_owned()).unwrap())
            .collect()
    }

    fn cookie_header(cookies: &[Cookie<'_>]) -> String {
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Sends the provided GraphQL `query` as a same-origin `POST` request.
    async fn graphql(app: &Router, cookies: &str, query: &str) -> Response {
        let mut req = request(
            Method::POST,
            super::GRAPHQL_PATH,
            cookies,
            Some(json!({ "query": query })),
        );
        _ = req.headers_mut().insert(
            header::ORIGIN,
            "http://localhost:3000".parse().unwrap(),
        );
        app.clone().oneshot(req).await.unwrap()
    }

    async fn sign_in(app: &Router, username: &str, password: &str) -> Response {
        app.clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/signin",
                "",
                Some(json!({ "username": username, "password": password })),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn signs_in_with_session_cookies() {
        let app = app(Fake::default());

        let res = sign_in(&app, "test@example.com", "password123").await;

        assert_eq!(res.status(), StatusCode::OK);
        let cookies = set_cookies(&res);
        for name in [
            session::ACCESS_TOKEN_COOKIE,
            session::ID_TOKEN_COOKIE,
            session::REFRESH_TOKEN_COOKIE,
        ] {
            let cookie = cookies
                .iter()
                .find(|c| c.name() == name)
                .unwrap_or_else(|| panic!("`{name}` cookie expected"));
            assert!(!cookie.value().is_empty());
            assert_eq!(cookie.http_only(), Some(true));
            assert_eq!(cookie.same_site(), Some(SameSite::Strict));
            assert_eq!(cookie.path(), Some("/"));
        }
        let body = body(res).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["id"], "user-123");
        assert_eq!(body["user"]["name"], "Test User");
    }

    #[tokio::test]
    async fn maps_sign_in_failures() {
        let app = app(Fake::default());

        let res = sign_in(&app, "test@example.com", "wrong").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(res).await["code"], "INVALID_CREDENTIALS");

        let res = sign_in(&app, "unconfirmed@example.com", "password123").await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body(res).await["code"], "ACCOUNT_UNCONFIRMED");

        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/signin",
                "",
                Some(json!({ "username": "test@example.com" })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(res).await["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn resolves_password_challenge() {
        let fake = Fake::default();
        let app = app(fake.clone());

        let res = sign_in(&app, "newpassword@example.com", "oldpassword").await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookies(&res).is_empty());
        let body_json = body(res).await;
        assert_eq!(body_json["success"], false);
        assert_eq!(body_json["requiresPasswordChange"], true);
        assert_eq!(body_json["challenge"]["name"], "NEW_PASSWORD_REQUIRED");
        assert_eq!(
            body_json["challenge"]["username"],
            "newpassword@example.com",
        );
        let session = body_json["challenge"]["session"].clone();

        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/change-password",
                "",
                Some(json!({ "session": session, "newPassword": "Short1!" })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(res).await["code"], "PASSWORD_POLICY_VIOLATION");
        assert_eq!(fake.pending_challenges().await, 1);

        let res = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/auth/change-password",
                "",
                Some(json!({
                    "session": session,
                    "newPassword": "BrandNew123",
                    "username": "newpassword@example.com",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(set_cookies(&res).len(), 3);
        assert_eq!(body(res).await["user"]["id"], "user-789");
        assert_eq!(fake.pending_challenges().await, 0);

        let res = sign_in(&app, "newpassword@example.com", "BrandNew123").await;
        assert_eq!(body(res).await["success"], true);
    }

    #[tokio::test]
    async fn signs_out_by_clearing_cookies() {
        let app = app(Fake::default());
        let res = sign_in(&app, "test@example.com", "password123").await;
        let cookies = cookie_header(&set_cookies(&res));

        let res = app
            .clone()
            .oneshot(request(Method::POST, "/api/auth/signout", &cookies, None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let cleared = set_cookies(&res);
        assert_eq!(cleared.len(), 3);
        for cookie in cleared {
            assert!(cookie.value().is_empty(), "{cookie}");
            assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
        }
        assert_eq!(body(res).await["success"], true);
    }

    #[tokio::test]
    async fn redirects_unauthenticated_requests() {
        let app = app(Fake::default());

        let res = app
            .oneshot(request(Method::GET, "/private", "", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            res.headers()[header::LOCATION],
            "/signin?callbackUrl=%2Fprivate",
        );
    }

    #[tokio::test]
    async fn clears_cookies_of_rejected_sessions() {
        let app = app(Fake::default());

        let res = app
            .oneshot(request(
                Method::GET,
                "/private",
                "access_token=forged; id_token=forged; refresh_token=forged",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        let cleared = set_cookies(&res);
        assert_eq!(cleared.len(), 3);
        assert!(cleared.iter().all(|c| c.value().is_empty()));
    }

    #[tokio::test]
    async fn serves_private_pages_to_authenticated_users() {
        let app = app(Fake::default());
        let res = sign_in(&app, "test@example.com", "password123").await;
        let cookies = cookie_header(&set_cookies(&res));

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/private", &cookies, None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookies(&res).is_empty());
        let body = body(res).await;
        assert_eq!(body["user"]["id"], "user-123");
        assert!(body["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn refreshes_expired_sessions_in_gate() {
        let app = app(Fake::default().with_token_lifetime(Duration::ZERO));
        let res = sign_in(&app, "test@example.com", "password123").await;
        let cookies = cookie_header(&set_cookies(&res));

        let res = app
            .clone()
            .oneshot(request(Method::GET, "/private", &cookies, None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let renewed = set_cookies(&res);
        assert!(renewed
            .iter()
            .any(|c| c.name() == session::ACCESS_TOKEN_COOKIE
                && !c.value().is_empty()));
        assert!(renewed
            .iter()
            .any(|c| c.name() == session::ID_TOKEN_COOKIE
                && !c.value().is_empty()));
        assert_eq!(body(res).await["user"]["id"], "user-123");
    }

    #[tokio::test]
    async fn never_refreshes_outside_gate() {
        let app = app(Fake::default().with_token_lifetime(Duration::ZERO));
        let res = sign_in(&app, "test@example.com", "password123").await;
        let cookies = cookie_header(&set_cookies(&res));

        let mut req = request(
            Method::POST,
            super::GRAPHQL_PATH,
            &cookies,
            Some(json!({ "query": "{ session { expiresAt } }" })),
        );
        _ = req.headers_mut().insert(
            header::ORIGIN,
            "http://localhost:3000".parse().unwrap(),
        );
        let res = app.clone().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert!(set_cookies(&res).is_empty());
        assert_eq!(body(res).await["data"]["session"], Value::Null);
    }

    #[tokio::test]
    async fn rejects_cross_origin_graphql_requests() {
        let app = app(Fake::default());

        let mut req = request(
            Method::POST,
            super::GRAPHQL_PATH,
            "",
            Some(json!({ "query": "{ session { expiresAt } }" })),
        );
        _ = req.headers_mut().insert(
            header::ORIGIN,
            "http://evil.example".parse().unwrap(),
        );
        let res = app.oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(body(res).await["code"], "CSRF_VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn never_executes_mutations_over_get() {
        let app = app(Fake::default());
        let uri = format!(
            "{}?query={}",
            super::GRAPHQL_PATH,
            urlencoding::encode(
                r#"mutation {
                    signIn(
                        username: "test@example.com",
                        password: "password123",
                    ) {
                        __typename
                    }
                }"#,
            ),
        );

        let mut req = request(Method::GET, &uri, "", None);
        _ = req.headers_mut().insert(
            header::ORIGIN,
            "http://evil.example".parse().unwrap(),
        );
        let res = app.clone().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(set_cookies(&res).is_empty());
        let body = body(res).await;
        assert_eq!(
            body["errors"][0]["extensions"]["code"],
            "MUTATION_OVER_GET",
        );
        assert_eq!(body["data"], Value::Null);

        let res = app
            .oneshot(request(Method::GET, &uri, "", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(set_cookies(&res).is_empty());
    }

    #[tokio::test]
    async fn reports_weak_graphql_passwords_as_policy_violations() {
        let fake = Fake::default();
        let app = app(fake.clone());
        let res = sign_in(&app, "newpassword@example.com", "oldpassword").await;
        let session = body(res).await["challenge"]["session"]
            .as_str()
            .unwrap()
            .to_owned();

        let res = graphql(
            &app,
            "",
            &format!(
                r#"mutation {{
                    changePassword(session: "{session}", newPassword: "abc") {{
                        expiresAt
                    }}
                }}"#,
            ),
        )
        .await;

        assert!(set_cookies(&res).is_empty());
        let body = body(res).await;
        assert_eq!(
            body["errors"][0]["extensions"]["code"],
            "PASSWORD_POLICY_VIOLATION",
        );
        assert_eq!(body["data"], Value::Null);
        assert_eq!(fake.pending_challenges().await, 1);
    }

    #[tokio::test]
    async fn greets_anonymous_users() {
        let app = app(Fake::default());

        let res = graphql(&app, "", r#"{ hello(text: "world") }"#).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body(res).await["data"]["hello"], "Hello world");
    }

    #[tokio::test]
    async fn requires_session_for_posts() {
        let app = app(Fake::default());

        for query in [
            r#"mutation { createPost(name: "Test Post") { id } }"#,
            "{ latestPost { id } }",
            "{ secretMessage }",
        ] {
            let res = graphql(&app, "", query).await;

            let body = body(res).await;
            assert_eq!(
                body["errors"][0]["extensions"]["code"],
                "AUTHORIZATION_REQUIRED",
                "{query}",
            );
        }
    }

    #[tokio::test]
    async fn manages_posts_of_signed_in_users() {
        let app = app(Fake::default());
        let res = sign_in(&app, "test@example.com", "password123").await;
        let cookies = cookie_header(&set_cookies(&res));

        let res = graphql(&app, &cookies, "{ latestPost { id } }").await;
        assert_eq!(body(res).await["data"]["latestPost"], Value::Null);

        let res = graphql(
            &app,
            &cookies,
            r#"mutation {
                createPost(name: " Test Post ") { id name createdById }
            }"#,
        )
        .await;
        let created = body(res).await["data"]["createPost"].clone();
        assert_eq!(created["name"], "Test Post");
        assert_eq!(created["createdById"], "user-123");

        let res = graphql(&app, &cookies, "{ latestPost { id name } }").await;
        let latest = body(res).await["data"]["latestPost"].clone();
        assert_eq!(latest["id"], created["id"]);

        let res = graphql(&app, &cookies, "{ secretMessage }").await;
        assert_eq!(
            body(res).await["data"]["secretMessage"],
            "you can now see this secret message!",
        );

        let res = graphql(
            &app,
            &cookies,
            r#"mutation { createPost(name: "  ") { id } }"#,
        )
        .await;
        assert!(body(res).await["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("PostName"));
    }

    #[tokio::test]
    async fn signs_in_through_graphql() {
        let app = app(Fake::default());

        let mut req = request(
            Method::POST,
            super::GRAPHQL_PATH,
            "",
            Some(json!({
                "query": r#"mutation {
                    signIn(
                        username: "test@example.com",
                        password: "password123",
                    ) {
                        __typename
                    }
                }"#,
            })),
        );
        _ = req.headers_mut().insert(
            header::ORIGIN,
            "http://localhost:3000".parse().unwrap(),
        );
        let res = app.clone().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let cookies = cookie_header(&set_cookies(&res));
        assert_eq!(body(res).await["data"]["signIn"]["__typename"], "Session");

        let res = app
            .oneshot(request(
                Method::GET,
                &format!(
                    "{}?query={}",
                    super::GRAPHQL_PATH,
                    urlencoding::encode("{ session { user { id } } }"),
                ),
                &cookies,
                None,
            ))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            body(res).await["data"]["session"]["user"]["id"],
            "user-123",
        );
    }
}
