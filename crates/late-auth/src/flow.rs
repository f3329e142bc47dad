//! End-to-end sign-in and token renewal.

use anyhow::{Context, Result};

use crate::callback::{
    find_available_port, wait_for_callback, NoCallbackPort, CALLBACK_PORT_END, CALLBACK_PORT_START,
};
use crate::google::GoogleOAuth2Provider;
use crate::storage::{SecureStorage, TokenSet, GOOGLE_SERVICE};

/// Outcome of a successful sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub email: String,
    pub token_set: TokenSet,
}

/// Run the browser flow: open the consent page, wait for the redirect,
/// exchange the code, look up the account email, and store the tokens.
pub async fn authenticate(
    provider: &GoogleOAuth2Provider,
    storage: &SecureStorage,
) -> Result<SignIn> {
    let port = find_available_port(CALLBACK_PORT_START, CALLBACK_PORT_END).ok_or(NoCallbackPort {
        start: CALLBACK_PORT_START,
        end: CALLBACK_PORT_END,
    })?;

    let (auth_url, expected_state) = provider.authorization_url(port);

    tracing::info!("Auth URL: {}", auth_url);
    if let Err(e) = webbrowser::open(&auth_url) {
        tracing::warn!("Failed to open browser ({}). Open this URL to sign in: {}", e, auth_url);
    }

    let code = wait_for_callback(port, &expected_state).await?;

    let token_response = provider
        .exchange_code(&code, port)
        .await
        .context("Token exchange failed")?;

    let user_info = provider
        .get_user_info(&token_response.access_token)
        .await
        .context("Failed to get user info")?;

    let token_set = token_response.into_token_set(None);
    storage
        .store_token(GOOGLE_SERVICE, &token_set)
        .context("Failed to store token")?;

    tracing::info!("Google authentication successful for {}", user_info.email);
    Ok(SignIn {
        email: user_info.email,
        token_set,
    })
}

/// Return the stored token set, refreshing it first when it is about to expire.
pub async fn fresh_token(
    provider: &GoogleOAuth2Provider,
    storage: &SecureStorage,
) -> Result<TokenSet> {
    let token_set = storage
        .retrieve_token(GOOGLE_SERVICE)
        .context("Not signed in")?;

    if !token_set.needs_refresh() {
        return Ok(token_set);
    }

    let refresh_token = token_set
        .refresh_token
        .clone()
        .context("Token expired and no refresh token is stored")?;

    tracing::info!("Refreshing Google access token");
    let refreshed = provider
        .refresh_token(&refresh_token)
        .await?
        .into_token_set(Some(refresh_token));

    storage.store_token(GOOGLE_SERVICE, &refreshed)?;
    Ok(refreshed)
}

/// Mark the stored access token as expired after the API rejected it, so the
/// next [`fresh_token`] call refreshes it.
pub fn mark_expired(storage: &SecureStorage) -> Result<()> {
    let mut token_set = storage
        .retrieve_token(GOOGLE_SERVICE)
        .context("Not signed in")?;
    token_set.expires_at = 0;
    storage.store_token(GOOGLE_SERVICE, &token_set)
}
