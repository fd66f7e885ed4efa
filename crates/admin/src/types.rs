//! Admin API response types.

use serde::{Deserialize, Serialize};

use quayside_core::{ErrorResult, JobId, JobState, PaymentMethodId, ShippingMethodId, ZoneId};

/// Result of the admin `login` mutation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LoginResult {
    Err(ErrorResult),
    Ok(CurrentUser),
}

/// The administrator a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub identifier: String,
}

/// A paginated list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemList<T> {
    pub items: Vec<T>,
    pub total_items: i64,
}

/// A country or province that belongs to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub code: String,
    pub name: String,
    pub enabled: bool,
}

/// A shipping/tax zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    #[serde(default)]
    pub members: Vec<Region>,
}

impl Zone {
    /// Whether any enabled region belongs to the zone.
    #[must_use]
    pub fn has_enabled_members(&self) -> bool {
        self.members.iter().any(|m| m.enabled)
    }
}

/// Reference to a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRef {
    pub id: ZoneId,
    pub name: String,
}

/// Reference to a configurable operation (checker, calculator, handler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    pub code: String,
}

/// A shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethod {
    pub id: ShippingMethodId,
    pub code: String,
    pub name: String,
    pub checker: OperationRef,
    pub calculator: OperationRef,
}

/// A payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub code: String,
    pub name: String,
    pub enabled: bool,
    pub handler: OperationRef,
}

/// The channel the session operates on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,
    pub code: String,
    pub default_shipping_zone: Option<ZoneRef>,
    pub default_tax_zone: Option<ZoneRef>,
}

/// A background job on the engine's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub queue_name: String,
    pub state: JobState,
    /// Percentage, 0 to 100.
    pub progress: f64,
    pub result: Option<serde_json::Value>,
    pub error: Option<serde_json::Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use quayside_core::ErrorCode;

    #[test]
    fn test_login_result_union() {
        let ok: LoginResult = serde_json::from_str(
            r#"{"__typename":"CurrentUser","id":"1","identifier":"superadmin"}"#,
        )
        .unwrap();
        assert!(matches!(ok, LoginResult::Ok(ref u) if u.identifier == "superadmin"));

        let err: LoginResult = serde_json::from_str(
            r#"{"__typename":"InvalidCredentialsError","errorCode":"INVALID_CREDENTIALS_ERROR","message":"bad"}"#,
        )
        .unwrap();
        assert!(matches!(
            err,
            LoginResult::Err(ref e) if e.error_code == ErrorCode::InvalidCredentialsError
        ));
    }

    #[test]
    fn test_job_deserialize() {
        let job: Job = serde_json::from_str(
            r#"{"id":"7","queueName":"update-search-index","state":"RUNNING","progress":40.5,"result":null,"error":null}"#,
        )
        .unwrap();
        assert_eq!(job.state, JobState::Running);
        assert!(!job.state.is_finished());
        assert!((job.progress - 40.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zone_members() {
        let zone: Zone = serde_json::from_str(
            r#"{"id":"1","name":"Europe","members":[{"code":"FR","name":"France","enabled":false}]}"#,
        )
        .unwrap();
        assert!(!zone.has_enabled_members());
    }
}
