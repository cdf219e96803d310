//! [`User`]-related definitions.

use derive_more::{AsRef, Debug, Display, From, Into};
use juniper::{GraphQLObject, GraphQLScalar};
use service::domain;

use crate::{api::scalar, Context};

/// Authenticated user, as described by its identity provider.
#[derive(Clone, Debug, GraphQLObject)]
#[graphql(context = Context)]
pub struct User {
    /// Unique identifier of this `User` in the identity provider.
    pub id: String,

    /// Email address of this `User`.
    pub email: Option<String>,

    /// Display name of this `User`.
    pub name: Option<String>,

    /// Avatar URL of this `User`.
    pub image: Option<String>,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        let domain::User {
            id,
            email,
            name,
            image,
        } = user;
        Self {
            id: id.as_ref().to_owned(),
            email,
            name,
            image,
        }
    }
}

/// Name a `User` signs in with.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(
    name = "Username",
    with = scalar::Via::<domain::user::Username>,
)]
pub struct Username(domain::user::Username);

/// Current password of a `User`.
#[derive(AsRef, Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(
    name = "UserPassword",
    with = scalar::Via::<domain::user::Password>,
)]
pub struct Password(domain::user::Password);

/// Password replacing a temporary one, 8 to 256 characters long.
///
/// Checked by resolvers rather than on parsing, so a weak password is
/// reported with the `PASSWORD_POLICY_VIOLATION` code.
#[derive(Clone, Debug, From, GraphQLScalar, Into)]
#[graphql(name = "UserNewPassword", transparent)]
pub struct NewPassword(#[debug(skip)] String);

impl NewPassword {
    /// Checks this [`NewPassword`] against the password length policy.
    ///
    /// # Errors
    ///
    /// With [`PasswordError::InvalidLength`] if it's too short or too long.
    pub fn validate(self) -> Result<domain::user::NewPassword, PasswordError> {
        domain::user::NewPassword::new(self.0)
            .ok_or(PasswordError::InvalidLength)
    }
}

crate::define_error! {
    enum PasswordError {
        #[code = "PASSWORD_POLICY_VIOLATION"]
        #[status = BAD_REQUEST]
        #[message = "`newPassword` must be 8 to 256 characters long"]
        InvalidLength,
    }
}

#[cfg(test)]
mod spec {
    use super::{NewPassword, PasswordError};

    #[test]
    fn validates_password_length() {
        for short in ["", "Short1!"] {
            assert!(matches!(
                NewPassword::from(short.to_owned()).validate(),
                Err(PasswordError::InvalidLength),
            ));
        }
        assert!(NewPassword::from("x".repeat(257)).validate().is_err());
        assert!(NewPassword::from("NewPassword1!".to_owned())
            .validate()
            .is_ok());
    }

    #[test]
    fn never_prints_passwords() {
        let password = NewPassword::from("NewPassword1!".to_owned());

        assert!(!format!("{password:?}").contains("NewPassword1!"));
    }
}
