use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension, Form,
};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    models::session::{Credentials, Session},
    state::AppState,
    validation::auth::*,
    views::Page,
};

/// What the login and signup forms get back when submission fails.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsActionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<CredentialsFieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<CredentialsFields>,
}

/// The verification page's `resend` outcome.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyActionData {
    pub resend: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resend_error: Option<String>,
}

/// What the password reset form gets back.
#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetActionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<EmailFieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<EmailField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

/// A form carrying only an `_action` discriminator (plus optional email).
#[derive(Deserialize, Debug, Default)]
pub struct ActionForm {
    #[serde(rename = "_action")]
    pub action: Option<String>,
    pub email: Option<String>,
}

fn bad_request<T: Serialize>(title: &str, data: T) -> Result<Response> {
    Page::new(title, None, data).render_with(StatusCode::BAD_REQUEST)
}

/// Validates a login/signup submission, or renders why it was rejected.
fn submitted_credentials(
    title: &str,
    form: CredentialsForm,
) -> std::result::Result<CredentialsFields, Result<Response>> {
    let Some(fields) = form.fields() else {
        return Err(bad_request(
            title,
            CredentialsActionData {
                form_error: Some(FORM_NOT_SUBMITTED.to_string()),
                ..Default::default()
            },
        ));
    };

    if let Err(field_errors) = fields.check() {
        return Err(bad_request(
            title,
            CredentialsActionData {
                field_errors: Some(field_errors),
                fields: Some(fields),
                ..Default::default()
            },
        ));
    }

    Ok(fields)
}

/// Renders a registry failure next to the submitted fields.
fn credentials_failure(title: &str, fields: CredentialsFields, error: AppError) -> Result<Response> {
    let form_error = match error.server_error() {
        Some(e) => e.message.clone(),
        None => {
            tracing::error!("❌ Credentials request failed: {}", error);
            "An error occurred.".to_string()
        }
    };

    bad_request(
        title,
        CredentialsActionData {
            form_error: Some(form_error),
            fields: Some(fields),
            ..Default::default()
        },
    )
}

const LOGIN_TITLE: &str = "BrickHub | Sign In";
const SIGNUP_TITLE: &str = "BrickHub | Sign Up";
const VERIFY_TITLE: &str = "BrickHub | Verify Email";
const PASSWORD_RESET_TITLE: &str = "BrickHub | Password Reset";

/// Shows the login form, unless already signed in.
pub async fn login_page(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    if state.sessions.get_user(&cookies).is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Page::new(LOGIN_TITLE, None, ()).render()
}

/// Handles the login form.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let fields = match submitted_credentials(LOGIN_TITLE, form) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    tracing::info!("🔐 Login attempt for: {}", fields.username);
    let credentials = match state.registry.login(&fields.username, &fields.password).await {
        Ok(credentials) => credentials,
        Err(e) => return credentials_failure(LOGIN_TITLE, fields, e),
    };

    tracing::info!("✅ User logged in: {}", fields.username);
    Ok(state
        .sessions
        .create_user_session(&cookies, &credentials, "/")?
        .into_response())
}

/// Shows the signup form, unless already signed in.
pub async fn signup_page(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    if state.sessions.get_user(&cookies).is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Page::new(SIGNUP_TITLE, None, ()).render()
}

/// Handles the signup form.
///
/// The verification email is sent in the background; its failure doesn't
/// fail the signup since the user can ask for another one.
#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<CredentialsForm>,
) -> Result<Response> {
    let fields = match submitted_credentials(SIGNUP_TITLE, form) {
        Ok(fields) => fields,
        Err(response) => return response,
    };

    tracing::info!("📝 Signup attempt for: {}", fields.username);
    let credentials = match state.registry.signup(&fields.username, &fields.password).await {
        Ok(credentials) => credentials,
        Err(e) => return credentials_failure(SIGNUP_TITLE, fields, e),
    };

    let registry = state.registry.clone();
    let access_token = credentials.access_token.clone();
    tokio::spawn(async move {
        if let Err(e) = registry.send_verification_email(&access_token).await {
            tracing::warn!("❌ Verification email not sent: {}", e);
        }
    });

    tracing::info!("✅ User signed up: {}", fields.username);
    Ok(state
        .sessions
        .create_user_session(&cookies, &credentials, "/verify")?
        .into_response())
}

/// The credentials of a signed-in user whose email still needs verifying.
fn unverified_credentials(session: &Session) -> Option<&Credentials> {
    let credentials = session.credentials.as_ref()?;
    let user = session.user.as_ref()?;
    if user.email_verified {
        return None;
    }
    Some(credentials)
}

/// Shows the "verify your email" page to unverified users.
pub async fn verify_page(Extension(session): Extension<Session>) -> Result<Response> {
    if unverified_credentials(&session).is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    Page::new(VERIFY_TITLE, session.user, ()).render()
}

/// Handles "I verified, continue" and "resend the email".
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    cookies: Cookies,
    Form(form): Form<ActionForm>,
) -> Result<Response> {
    let Some(credentials) = unverified_credentials(&session) else {
        return Ok(Redirect::to("/").into_response());
    };

    match form.action.as_deref() {
        Some("continue") => {
            // The refreshed token carries the new email_verified claim.
            let credentials = state.registry.refresh(&credentials.refresh_token).await?;
            tracing::info!("✅ Credentials refreshed after verification");
            Ok(state
                .sessions
                .create_user_session(&cookies, &credentials, "/")?
                .into_response())
        }
        Some("resend") => {
            let data = match state
                .registry
                .send_verification_email(&credentials.access_token)
                .await
            {
                Ok(()) => VerifyActionData {
                    resend: "success",
                    resend_error: None,
                },
                Err(e) => {
                    tracing::warn!("❌ Resending verification email failed: {}", e);
                    VerifyActionData {
                        resend: "failure",
                        resend_error: e.server_error().map(|e| e.message.clone()),
                    }
                }
            };
            Page::new(VERIFY_TITLE, session.user, data).render()
        }
        _ => Err(AppError::Validation("Unsupported form action.".to_string())),
    }
}

/// Signs out.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Response {
    tracing::info!("👋 Logout");
    state.sessions.destroy_session(&cookies).into_response()
}

/// Shows the password reset form, unless already signed in.
pub async fn password_reset_page(
    State(state): State<AppState>,
    cookies: Cookies,
) -> Result<Response> {
    if state.sessions.get_user(&cookies).is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Page::new(PASSWORD_RESET_TITLE, None, ()).render()
}

/// Handles the password reset form.
///
/// The outcome is always reported as a success so the form can't be used to
/// probe which emails have accounts.
#[axum::debug_handler]
pub async fn password_reset(
    State(state): State<AppState>,
    Form(form): Form<ActionForm>,
) -> Result<Response> {
    match form.action.as_deref() {
        Some("send") => {
            let Some(email) = form.email else {
                return bad_request(
                    PASSWORD_RESET_TITLE,
                    PasswordResetActionData {
                        form_error: Some(FORM_NOT_SUBMITTED.to_string()),
                        status: Some("failure"),
                        ..Default::default()
                    },
                );
            };

            let fields = EmailField { email };
            if let Err(field_errors) = fields.check() {
                return bad_request(
                    PASSWORD_RESET_TITLE,
                    PasswordResetActionData {
                        field_errors: Some(field_errors),
                        fields: Some(fields),
                        ..Default::default()
                    },
                );
            }

            if let Err(e) = state.registry.send_password_reset_email(&fields.email).await {
                tracing::warn!("❌ Password reset email not sent: {}", e);
            }

            Page::new(
                PASSWORD_RESET_TITLE,
                None,
                PasswordResetActionData {
                    status: Some("success"),
                    ..Default::default()
                },
            )
            .render()
        }
        Some("done") => Ok(Redirect::to("/").into_response()),
        _ => bad_request(
            PASSWORD_RESET_TITLE,
            PasswordResetActionData {
                form_error: Some("Unsupported form action.".to_string()),
                status: Some("failure"),
                ..Default::default()
            },
        ),
    }
}
