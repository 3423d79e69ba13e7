use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError, ValidationErrors};

/// Body of `POST /send-notification`.
///
/// Fields hold the raw JSON the caller sent, whatever its type. Absent values
/// are forwarded untouched unless the relay runs in strict validation mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationRequest {
    pub token: Option<Value>,
    pub title: Option<Value>,
    pub body: Option<Value>,
}

impl NotificationRequest {
    /// Read the three fields by key from a parsed body.
    ///
    /// Arrays carry no keys, so every field comes out absent. Any other
    /// non-object root returns `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(mut fields) => Some(Self::from_fields(&mut fields)),
            Value::Array(_) => Some(Self::default()),
            _ => None,
        }
    }

    fn from_fields(fields: &mut Map<String, Value>) -> Self {
        Self {
            token: fields.remove("token"),
            title: fields.remove("title"),
            body: fields.remove("body"),
        }
    }
}

impl Validate for NotificationRequest {
    /// Strict mode: every field must be a non-empty string.
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        for (field, value) in [
            ("token", &self.token),
            ("title", &self.title),
            ("body", &self.body),
        ] {
            if let Err(error) = non_empty_string(value) {
                errors.add(field, error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn non_empty_string(value: &Option<Value>) -> Result<(), ValidationError> {
    let code = match value {
        None => "required",
        Some(Value::String(s)) if !s.is_empty() => return Ok(()),
        Some(Value::String(_)) => "length",
        Some(_) => "type",
    };
    let mut error = ValidationError::new(code);
    error.message = Some(match code {
        "required" => "Field is required".into(),
        "length" => "Field cannot be empty".into(),
        _ => "Field must be a string".into(),
    });
    Err(error)
}

/// Message in the shape the push provider expects:
/// `{ "notification": { "title", "body" }, "token" }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    pub notification: NotificationContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl From<NotificationRequest> for ProviderMessage {
    fn from(request: NotificationRequest) -> Self {
        Self {
            notification: NotificationContent {
                title: request.title,
                body: request.body,
            },
            token: request.token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: Value) -> NotificationRequest {
        NotificationRequest::from_json(value).expect("object or array root")
    }

    #[test]
    fn provider_message_copies_fields_verbatim() {
        let message = ProviderMessage::from(request(json!({
            "token": "abc",
            "title": "  Hi  ",
            "body": "There"
        })));

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "notification": { "title": "  Hi  ", "body": "There" },
                "token": "abc"
            })
        );
    }

    #[test]
    fn absent_fields_stay_absent() {
        let message = ProviderMessage::from(request(json!({ "token": "abc", "body": "There" })));

        assert_eq!(message.notification.title, None);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "notification": { "body": "There" }, "token": "abc" })
        );
    }

    #[test]
    fn non_string_values_are_kept_as_sent() {
        let message = ProviderMessage::from(request(json!({
            "token": "abc",
            "title": 5,
            "body": null
        })));

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({ "notification": { "title": 5, "body": null }, "token": "abc" })
        );
    }

    #[test]
    fn array_bodies_are_never_read_by_position() {
        let request = request(json!(["victim-token", "Hi", "There"]));
        assert_eq!(request, NotificationRequest::default());
    }

    #[test]
    fn scalar_roots_are_not_requests() {
        assert!(NotificationRequest::from_json(Value::Null).is_none());
        assert!(NotificationRequest::from_json(json!("abc")).is_none());
        assert!(NotificationRequest::from_json(json!(42)).is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let request = request(json!({ "token": "abc", "priority": "high" }));
        assert_eq!(request.token, Some(json!("abc")));
        assert_eq!(request.title, None);
    }

    #[test]
    fn strict_validation_requires_non_empty_strings() {
        let missing_title = request(json!({ "token": "abc", "body": "There" }));
        let errors = missing_title.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));

        let empty_token = request(json!({ "token": "", "title": "Hi", "body": "There" }));
        assert!(empty_token.validate().is_err());

        let numeric_title = request(json!({ "token": "abc", "title": 5, "body": "There" }));
        assert!(numeric_title.validate().is_err());

        let complete = request(json!({ "token": "abc", "title": "Hi", "body": "There" }));
        assert!(complete.validate().is_ok());
    }
}
