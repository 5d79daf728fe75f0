use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("intent id must not be empty")]
    EmptyIntentId,
    #[error("duplicate intent id `{0}`")]
    DuplicateIntentId(String),
    #[error("intent `{intent_id}` has zero priority (priority must be positive)")]
    ZeroPriority { intent_id: String },
    #[error("intent `{intent_id}` has invalid pattern `{pattern}`: {message}")]
    InvalidPattern { intent_id: String, pattern: String, message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResponderError {
    #[error("responder failed: {0}")]
    Internal(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Responder(#[from] ResponderError),
    #[error("invalid action: {0}")]
    InvalidAction(String),
    #[error("integration failure: {0}")]
    Integration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "That action isn't available right now. Try another option.",
            Self::ServiceUnavailable { .. } => {
                "The assistant is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::InvalidAction(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Responder(error) => Self::ServiceUnavailable {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Catalog(error) => {
                Self::Internal { message: error.to_string(), correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, CatalogError, InterfaceError, ResponderError};

    #[test]
    fn invalid_action_maps_to_bad_request_with_correlation_id() {
        let interface = ApplicationError::InvalidAction("nav.unknown".to_owned())
            .into_interface("session-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "session-1"
        ));
        assert_eq!(
            interface.user_message(),
            "That action isn't available right now. Try another option."
        );
    }

    #[test]
    fn responder_failure_maps_to_service_unavailable() {
        let interface =
            ApplicationError::from(ResponderError::Internal("template missing".to_owned()))
                .into_interface("session-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The assistant is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn broken_catalog_maps_to_internal() {
        let interface =
            ApplicationError::from(CatalogError::DuplicateIntentId("greeting".to_owned()))
                .into_interface("session-3");

        assert!(matches!(
            interface,
            InterfaceError::Internal { ref message, .. } if message.contains("greeting")
        ));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
