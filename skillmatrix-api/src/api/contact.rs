//! Public contact and quote forms, relayed by mail.
//!
//! Both endpoints are unauthenticated and live at `/api/contact` and
//! `/api/quote`.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State, post};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::logged_json::LoggedJson;
use crate::mailer::{Mailer, MailerState, OutgoingMail};

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ContactRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuoteRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MailSent {
    pub success: bool,
    pub message_id: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MailFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub type MailResult = Result<Json<MailSent>, status::Custom<Json<MailFailure>>>;

fn failure(status: Status, error: &str, details: Option<String>) -> status::Custom<Json<MailFailure>> {
    status::Custom(
        status,
        Json(MailFailure {
            error: error.to_string(),
            details,
        }),
    )
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds the support mail, or `None` when a required field is missing.
pub fn contact_mail(request: &ContactRequest) -> Option<OutgoingMail> {
    let email = present(&request.email)?;
    let subject = present(&request.subject)?;
    let message = present(&request.message)?;
    Some(OutgoingMail {
        reply_to: email.to_string(),
        subject: format!("[Skill Matrix Support] {}", subject),
        text: format!("From: {}\n\n{}", email, message),
    })
}

/// Builds the quote mail, or `None` when a required field is missing.
/// The phone number is optional.
pub fn quote_mail(request: &QuoteRequest) -> Option<OutgoingMail> {
    let company = present(&request.company)?;
    let name = present(&request.name)?;
    let email = present(&request.email)?;
    let message = present(&request.message)?;
    let phone = present(&request.phone).unwrap_or("N/A");
    Some(OutgoingMail {
        reply_to: email.to_string(),
        subject: format!("[Skill Matrix Quote Request] from {}", company),
        text: format!(
            "Company: {}\nContact: {}\nUser Email: {}\nPhone: {}\n\nMessage:\n{}",
            company, name, email, phone, message
        ),
    })
}

/// Sends `mail` and shapes the response both endpoints return.
pub async fn relay(mailer: &dyn Mailer, mail: OutgoingMail) -> MailResult {
    let subject = mail.subject.clone();
    match mailer.send(mail).await {
        Ok(message_id) => {
            info!("Mail '{}' sent as {}", subject, message_id);
            Ok(Json(MailSent {
                success: true,
                message_id,
            }))
        }
        Err(e) => {
            error!("Error sending mail '{}': {}", subject, e);
            Err(failure(
                Status::InternalServerError,
                "Failed to send email",
                Some(e.to_string()),
            ))
        }
    }
}

/// Contact endpoint.
///
/// - **URL:** `/api/contact`
/// - **Method:** `POST`
/// - **Purpose:** Relays a support request by mail
/// - **Authentication:** None required
///
/// ```json
/// { "email": "visitor@example.com", "subject": "Question", "message": "Hello" }
/// ```
///
/// Returns `{"success": true, "messageId": "..."}`, 400 when a field is
/// missing, or 500 with `details` when the relay fails.
#[post("/contact", data = "<request>")]
pub async fn contact(mailer: &State<MailerState>, request: LoggedJson<ContactRequest>) -> MailResult {
    let Some(mail) = contact_mail(&request) else {
        return Err(failure(
            Status::BadRequest,
            "Email, subject, and message are required",
            None,
        ));
    };
    relay(mailer.inner().as_ref(), mail).await
}

/// Quote endpoint.
///
/// - **URL:** `/api/quote`
/// - **Method:** `POST`
/// - **Purpose:** Relays a quote request by mail
/// - **Authentication:** None required
///
/// ```json
/// { "company": "Acme", "name": "Jo", "email": "jo@acme.example", "phone": "", "message": "Pricing?" }
/// ```
#[post("/quote", data = "<request>")]
pub async fn quote(mailer: &State<MailerState>, request: LoggedJson<QuoteRequest>) -> MailResult {
    let Some(mail) = quote_mail(&request) else {
        return Err(failure(
            Status::BadRequest,
            "Company, name, email, and message are required",
            None,
        ));
    };
    relay(mailer.inner().as_ref(), mail).await
}

pub fn routes() -> Vec<Route> {
    routes![contact, quote]
}
