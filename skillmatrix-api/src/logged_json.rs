//! Logged JSON request guard.
//!
//! A drop-in replacement for `Json<T>` that logs the parsed request body.
//! Credential fields are masked before the body is written to the log.

use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::{
    Data, Request,
    data::{self, FromData},
};
use serde_json::Value;

/// Keys whose values never reach the log.
const REDACTED_KEYS: &[&str] = &["password", "new_password", "password_hash", "token"];

pub struct LoggedJson<T>(pub T);

impl<T> LoggedJson<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for LoggedJson<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::DerefMut for LoggedJson<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Replaces credential values with `"***"`, recursing into arrays and objects.
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                    *inner = Value::String("***".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

#[rocket::async_trait]
impl<'r, T: Deserialize<'r> + Serialize> FromData<'r> for LoggedJson<T> {
    type Error = rocket::serde::json::Error<'r>;

    async fn from_data(req: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        match Json::<T>::from_data(req, data).await {
            data::Outcome::Success(json_data) => {
                match serde_json::to_value(&json_data.0) {
                    Ok(mut body) => {
                        redact(&mut body);
                        info!(
                            "API Request Body: {} {} | Data: {}",
                            req.method().as_str(),
                            req.uri().path(),
                            body
                        );
                    }
                    Err(_) => {
                        info!(
                            "API Request Body: {} {} | Data: <failed to serialize>",
                            req.method().as_str(),
                            req.uri().path()
                        );
                    }
                }
                data::Outcome::Success(LoggedJson(json_data.into_inner()))
            }
            data::Outcome::Error(e) => data::Outcome::Error(e),
            data::Outcome::Forward(f) => data::Outcome::Forward(f),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for LoggedJson<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_nested_credentials() {
        let mut body = json!({
            "email": "a@example.com",
            "Password": "hunter2",
            "users": [{ "password": "x", "role": "admin" }]
        });
        redact(&mut body);
        assert_eq!(body["email"], "a@example.com");
        assert_eq!(body["Password"], "***");
        assert_eq!(body["users"][0]["password"], "***");
        assert_eq!(body["users"][0]["role"], "admin");
    }
}
