//! [`Session`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};

use crate::domain::{token::Claims, User};

/// Application-level session of an authenticated [`User`].
///
/// Never stored server-side: it's recomputed from the ID token on each
/// request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    /// [`User`] this [`Session`] belongs to.
    pub user: User,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

impl Session {
    /// Derives a [`Session`] from the provided ID token [`Claims`].
    ///
    /// [`None`] is returned if the [`Claims`] carry no valid expiration.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Option<Self> {
        Some(Self {
            user: claims.to_user(),
            expires_at: claims.expires_at()?,
        })
    }

    /// Indicates whether this [`Session`] has expired at the provided moment.
    #[must_use]
    pub fn is_expired_at<At: ?Sized>(&self, moment: DateTimeOf<At>) -> bool {
        self.expires_at.is_reached_at(moment)
    }
}

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, unit::Expiration)>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;
    use serde_json::json;

    use crate::domain::token;

    use super::Session;

    #[test]
    fn derives_user_from_claims() {
        let claims = token::decode(token::spec::unsigned(&json!({
            "sub": "user-123",
            "email": "test@example.com",
            "name": "Test User",
            "picture": "https://example.com/me.png",
            "exp": 2_000_000_000,
        })))
        .unwrap();

        let session = Session::from_claims(&claims).unwrap();

        assert_eq!(session.user.id.as_ref(), "user-123");
        assert_eq!(session.user.email.as_deref(), Some("test@example.com"));
        assert_eq!(session.user.name.as_deref(), Some("Test User"));
        assert_eq!(
            session.user.image.as_deref(),
            Some("https://example.com/me.png"),
        );
        assert_eq!(session.expires_at.unix_timestamp(), 2_000_000_000);
    }

    #[test]
    fn requires_expiration() {
        let claims =
            token::decode(token::spec::unsigned(&json!({"sub": "user-123"})))
                .unwrap();

        assert!(Session::from_claims(&claims).is_none());
    }

    #[test]
    fn expires_at_expiration_moment() {
        let now = DateTime::now();
        let claims = token::decode(token::spec::unsigned(&json!({
            "sub": "user-123",
            "exp": now.unix_timestamp() + 60,
        })))
        .unwrap();
        let session = Session::from_claims(&claims).unwrap();

        assert!(!session.is_expired_at(now));
        assert!(session.is_expired_at(now + Duration::from_secs(60)));
    }
}
