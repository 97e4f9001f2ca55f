use secrecy::ExposeSecret;
use std::time::Duration;

use crate::config::Credentials;
use crate::error::ScrapeError;
use crate::navigator::{Locator, Navigator};

/// A username/password sign-in form.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub url: String,
    pub username: Locator,
    pub password: Locator,
    pub submit: Locator,
    /// Present once the session is authenticated.
    pub signed_in: Locator,
    pub form_timeout: Duration,
    pub auth_timeout: Duration,
}

impl LoginForm {
    /// Fills and submits the form, then waits (bounded) for the signed-in
    /// marker. Never retried.
    pub fn sign_in<N: Navigator>(
        &self,
        nav: &N,
        site: &str,
        credentials: &Credentials,
    ) -> Result<(), ScrapeError> {
        let failed = |reason: String| ScrapeError::LoginFailed {
            site: site.to_string(),
            reason,
        };

        nav.open(&self.url)?;
        if !nav.wait_for(&self.username, self.form_timeout)? {
            return Err(failed(format!(
                "login form did not appear within {}s",
                self.form_timeout.as_secs()
            )));
        }

        nav.type_into(&nav.find_element(&self.username)?, &credentials.username)?;
        nav.type_into(
            &nav.find_element(&self.password)?,
            credentials.password.expose_secret(),
        )?;
        nav.click(&nav.find_element(&self.submit)?)?;

        tracing::info!(site, "Attempting login");
        if !nav.wait_for(&self.signed_in, self.auth_timeout)? {
            return Err(failed(format!(
                "not signed in after {}s",
                self.auth_timeout.as_secs()
            )));
        }

        tracing::info!(site, "Login succeeded");
        Ok(())
    }
}
