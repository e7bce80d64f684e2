//! Account creation.

use tracing::info;

use super::{Result, SessionError};
use crate::auth::{AuthService, Identity};
use crate::model::{ModelError, UserProfile};
use crate::storage::{Collection, DocumentStore, Fields, CREATED_AT_FIELD};

/// Sign-up form input.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Create an account and write its profile to `users/{uid}`.
///
/// The new account is signed in on success.
#[tracing::instrument(name = "account.sign_up", skip_all, fields(email = %form.email))]
pub async fn sign_up(
    auth: &dyn AuthService,
    store: &dyn DocumentStore,
    form: SignUp,
) -> Result<Identity> {
    if form.password != form.confirm_password {
        return Err(SessionError::PasswordMismatch);
    }

    let profile = UserProfile::new(form.first_name, form.last_name, form.email.clone());
    let identity = auth
        .sign_up(&form.email, &form.password, &profile.display_name)
        .await?;

    let fields = Fields::from_serialize(&profile)
        .map_err(ModelError::from)?
        .server_timestamp(CREATED_AT_FIELD);
    store
        .set_merge(Collection::Users, &identity.uid, fields)
        .await?;

    info!(uid = %identity.uid, "Account created");
    Ok(identity)
}
