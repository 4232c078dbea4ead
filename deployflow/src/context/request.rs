//! The immutable deployment request.

use crate::config::DeployConfig;
use serde::Serialize;

/// Environment used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "staging";

/// Version used when none is given.
pub const DEFAULT_VERSION: &str = "latest";

/// What to deploy and where.
///
/// The namespace and full image reference are derived once in
/// [`DeploymentRequest::new`] and never recomputed; fields are private so
/// no step can alter them mid-run. Serialization is one-way for the same
/// reason: a request only comes into being through [`DeploymentRequest::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRequest {
    environment: String,
    version: String,
    namespace: String,
    full_image_name: String,
}

impl DeploymentRequest {
    /// Builds a request, applying defaults for absent values.
    ///
    /// Values are otherwise taken verbatim.
    #[must_use]
    pub fn new(environment: Option<&str>, version: Option<&str>, config: &DeployConfig) -> Self {
        let environment = environment.unwrap_or(DEFAULT_ENVIRONMENT).to_string();
        let version = version.unwrap_or(DEFAULT_VERSION).to_string();
        let namespace = format!("{}{}", config.namespace_prefix, environment);
        let full_image_name = format!("{}/{}:{}", config.registry, config.image_name, version);

        Self {
            environment,
            version,
            namespace,
            full_image_name,
        }
    }

    /// Target environment.
    #[must_use]
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Image tag being deployed.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Cluster namespace for this environment.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `registry/image:version`.
    #[must_use]
    pub fn full_image_name(&self) -> &str {
        &self.full_image_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeployConfig::default();
        let request = DeploymentRequest::new(None, None, &config);

        assert_eq!(request.environment(), "staging");
        assert_eq!(request.version(), "latest");
        assert_eq!(request.namespace(), "test-automation-staging");
        assert_eq!(request.full_image_name(), "localhost:5000/test-automation:latest");
    }

    #[test]
    fn test_derived_values() {
        let config = DeployConfig::default().with_registry("ghcr.io/acme");
        let request = DeploymentRequest::new(Some("production"), Some("v2.3.1"), &config);

        assert_eq!(request.namespace(), "test-automation-production");
        assert_eq!(request.full_image_name(), "ghcr.io/acme/test-automation:v2.3.1");
    }

    #[test]
    fn test_values_are_not_validated() {
        let config = DeployConfig::default();
        let request = DeploymentRequest::new(Some("qa env"), Some(""), &config);

        assert_eq!(request.namespace(), "test-automation-qa env");
        assert_eq!(request.full_image_name(), "localhost:5000/test-automation:");
    }

    #[test]
    fn test_serializes_derived_values() {
        let request = DeploymentRequest::new(Some("dev"), Some("1"), &DeployConfig::default());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["namespace"], "test-automation-dev");
        assert_eq!(json["full_image_name"], "localhost:5000/test-automation:1");
    }

    #[test]
    fn test_later_config_changes_do_not_leak() {
        let mut config = DeployConfig::default();
        let request = DeploymentRequest::new(Some("dev"), Some("1"), &config);
        config.registry = "elsewhere".to_string();

        assert_eq!(request.full_image_name(), "localhost:5000/test-automation:1");
    }
}
