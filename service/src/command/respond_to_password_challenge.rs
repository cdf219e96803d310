//! [`Command`] for resolving a new password [`Challenge`].

use derive_more::{Display, Error, From};
use secrecy::SecretBox;
use tracerr::Traced;

#[cfg(doc)]
use crate::domain::{Challenge, Session, User};
use crate::{
    domain::{challenge, user, TokenSet},
    infra::identity::{
        self, IdentityProvider, RespondToNewPasswordChallenge,
    },
    Service,
};

use super::{create_user_session, Command, CreateUserSession};

/// [`Command`] for resolving a [`challenge::Name::NewPasswordRequired`]
/// [`Challenge`] and creating a [`Session`].
///
/// The [`user::NewPassword`] type guarantees the length policy is checked
/// before the identity provider is called.
#[derive(Debug)]
pub struct RespondToPasswordChallenge {
    /// [`challenge::Session`] of the [`Challenge`].
    pub session: challenge::Session,

    /// Password replacing the temporary one.
    pub new_password: SecretBox<user::NewPassword>,

    /// Name of the [`User`] the [`Challenge`] was issued for.
    pub username: Option<user::Username>,
}

impl<Idp, Db> Command<RespondToPasswordChallenge> for Service<Idp, Db>
where
    Idp: IdentityProvider<
        RespondToNewPasswordChallenge,
        Ok = TokenSet,
        Err = Traced<identity::Error>,
    >,
{
    type Ok = create_user_session::Output;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        cmd: RespondToPasswordChallenge,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let RespondToPasswordChallenge {
            session,
            new_password,
            username,
        } = cmd;

        let tokens = self
            .identity_provider()
            .execute(RespondToNewPasswordChallenge {
                session,
                new_password,
                username,
            })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        self.execute(CreateUserSession { tokens })
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`RespondToPasswordChallenge`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`IdentityProvider`] error.
    #[display("`IdentityProvider` operation failed: {_0}")]
    IdentityProvider(identity::Error),

    /// [`CreateUserSession`] error.
    #[display("Failed to create `Session`: {_0}")]
    Session(create_user_session::ExecutionError),
}

#[cfg(test)]
mod spec {
    use secrecy::SecretBox;

    use crate::{
        command::{sign_in, spec::service, SignIn},
        domain::{challenge, user},
        infra::{identity, Fake},
        Command as _,
    };

    use super::{ExecutionError, RespondToPasswordChallenge};

    async fn challenge(
        svc: &crate::Service<Fake, crate::infra::Memory>,
    ) -> (challenge::Session, String) {
        let out = svc
            .execute(SignIn {
                username: user::Username::new("newpassword@example.com")
                    .unwrap(),
                password: SecretBox::new(Box::new(
                    user::Password::new("oldpassword").unwrap(),
                )),
            })
            .await
            .unwrap();
        let sign_in::Output::ChallengeRequired {
            challenge,
            username,
        } = out
        else {
            panic!("challenge expected");
        };
        (challenge.session, username)
    }

    #[tokio::test]
    async fn creates_session_after_new_password() {
        let svc = service(Fake::default());
        let (session, username) = challenge(&svc).await;

        let out = svc
            .execute(RespondToPasswordChallenge {
                session,
                new_password: SecretBox::new(Box::new(
                    user::NewPassword::new("NewPassword1!").unwrap(),
                )),
                username: user::Username::new(username),
            })
            .await
            .unwrap();

        assert_eq!(out.session.user.id.as_ref(), "user-789");
    }

    #[tokio::test]
    async fn rejects_unknown_sessions() {
        let svc = service(Fake::default());

        let err = svc
            .execute(RespondToPasswordChallenge {
                session: challenge::Session::new("unknown").unwrap(),
                new_password: SecretBox::new(Box::new(
                    user::NewPassword::new("NewPassword1!").unwrap(),
                )),
                username: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::IdentityProvider(
                identity::Error::InvalidChallengeSession
            ),
        ));
    }
}
