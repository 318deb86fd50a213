// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication methods derived from server user token policies.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use uapub_config::DEFAULT_JWT_TOKEN_TYPE;

use crate::credential::CredentialType;
use crate::error::{BridgeError, BridgeResult};
use crate::types::{EnumValue, ProtocolEnum};

/// Id of the method synthesized when a server advertises no policies.
pub const ANONYMOUS_METHOD_ID: &str = "Anonymous";

/// User token kinds a server can advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserTokenType {
    /// Anonymous.
    Anonymous = 0,
    /// User name and password.
    UserName = 1,
    /// X.509 certificate.
    Certificate = 2,
    /// Externally issued token.
    IssuedToken = 3,
}

impl ProtocolEnum for UserTokenType {
    const KIND: &'static str = "UserTokenType";

    fn all() -> &'static [Self] {
        &[Self::Anonymous, Self::UserName, Self::Certificate, Self::IssuedToken]
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::UserName => "UserName",
            Self::Certificate => "Certificate",
            Self::IssuedToken => "IssuedToken",
        }
    }

    fn value(&self) -> u32 {
        *self as u32
    }
}

/// A user token policy as advertised by a server endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTokenPolicy {
    /// Policy id.
    #[serde(default)]
    pub policy_id: Option<String>,
    /// Token type wire value or name.
    pub token_type: EnumValue,
    /// Issued token type URI.
    #[serde(default)]
    pub issued_token_type: Option<String>,
    /// Issuer endpoint URL; for JWT policies a JSON document.
    #[serde(default)]
    pub issuer_endpoint_url: Option<String>,
    /// Security policy URI.
    #[serde(default)]
    pub security_policy_uri: Option<String>,
}

impl UserTokenPolicy {
    /// Creates a policy of a known token type.
    pub fn new(policy_id: impl Into<String>, token_type: UserTokenType) -> Self {
        Self {
            policy_id: Some(policy_id.into()),
            token_type: EnumValue::Value(i64::from(token_type.value())),
            issued_token_type: None,
            issuer_endpoint_url: None,
            security_policy_uri: None,
        }
    }

    /// Sets the issued token type.
    pub fn with_issued_token_type(mut self, uri: impl Into<String>) -> Self {
        self.issued_token_type = Some(uri.into());
        self
    }

    /// Sets the issuer endpoint URL.
    pub fn with_issuer_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.issuer_endpoint_url = Some(url.into());
        self
    }

    /// Sets the security policy URI.
    pub fn with_security_policy_uri(mut self, uri: impl Into<String>) -> Self {
        self.security_policy_uri = Some(uri.into());
        self
    }
}

/// A selectable authentication method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationMethod {
    /// Method id (the policy id).
    pub id: String,
    /// Security policy URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<String>,
    /// Credential type to configure.
    pub credential_type: CredentialType,
    /// Method specific configuration.
    #[serde(default)]
    pub configuration: Value,
}

impl AuthenticationMethod {
    /// The method offered when a server advertises none.
    pub fn anonymous() -> Self {
        Self {
            id: ANONYMOUS_METHOD_ID.to_string(),
            security_policy: None,
            credential_type: CredentialType::None,
            configuration: Value::Null,
        }
    }
}

/// Parses issuer configuration documents.
pub trait ConfigurationParser: Send + Sync {
    /// Parses text into structured data.
    fn parse(&self, text: &str) -> BridgeResult<Value>;
}

/// [`ConfigurationParser`] for JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ConfigurationParser for JsonParser {
    fn parse(&self, text: &str) -> BridgeResult<Value> {
        serde_json::from_str(text).map_err(|e| BridgeError::invalid_argument(e.to_string()))
    }
}

/// Derives authentication methods, accepting the standard JWT token type.
pub fn derive_policies(
    policies: Option<&[UserTokenPolicy]>,
    parser: &dyn ConfigurationParser,
) -> Vec<AuthenticationMethod> {
    derive_policies_with(policies, parser, DEFAULT_JWT_TOKEN_TYPE)
}

/// Derives authentication methods from server policies.
///
/// Unsupported token types and issued-token subtypes are dropped. The
/// result keeps first occurrences only.
pub fn derive_policies_with(
    policies: Option<&[UserTokenPolicy]>,
    parser: &dyn ConfigurationParser,
    jwt_token_type: &str,
) -> Vec<AuthenticationMethod> {
    let policies = match policies {
        Some(p) if !p.is_empty() => p,
        _ => return vec![AuthenticationMethod::anonymous()],
    };

    let mut methods: Vec<AuthenticationMethod> = Vec::with_capacity(policies.len());
    for method in policies.iter().filter_map(|p| to_method(p, parser, jwt_token_type)) {
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    debug!(
        advertised = policies.len(),
        selectable = methods.len(),
        "Derived authentication methods"
    );
    methods
}

fn to_method(
    policy: &UserTokenPolicy,
    parser: &dyn ConfigurationParser,
    jwt_token_type: &str,
) -> Option<AuthenticationMethod> {
    let token_type = match &policy.token_type {
        EnumValue::Value(v) => UserTokenType::from_value(*v),
        EnumValue::Name(n) => UserTokenType::from_name(n),
    };

    let (credential_type, configuration) = match token_type? {
        UserTokenType::Anonymous => (CredentialType::None, Value::Null),
        UserTokenType::UserName => (CredentialType::UserName, Value::Null),
        UserTokenType::Certificate => (
            CredentialType::X509Certificate,
            policy
                .issuer_endpoint_url
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        ),
        UserTokenType::IssuedToken => {
            if policy.issued_token_type.as_deref() != Some(jwt_token_type) {
                debug!(
                    policy_id = ?policy.policy_id,
                    issued_token_type = ?policy.issued_token_type,
                    "Dropping unsupported issued token policy"
                );
                return None;
            }
            (CredentialType::JwtToken, jwt_configuration(policy, parser))
        }
    };

    Some(AuthenticationMethod {
        id: policy.policy_id.clone().unwrap_or_default(),
        security_policy: policy.security_policy_uri.clone(),
        credential_type,
        configuration,
    })
}

/// Parses the issuer document, keeping the raw text when it is not parseable.
fn jwt_configuration(policy: &UserTokenPolicy, parser: &dyn ConfigurationParser) -> Value {
    let Some(raw) = policy.issuer_endpoint_url.as_deref() else {
        return Value::Null;
    };
    match parser.parse(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                policy_id = ?policy.policy_id,
                error = %e,
                "Issuer endpoint configuration is not structured, keeping raw string"
            );
            Value::String(raw.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JWT: &str = "http://opcfoundation.org/UA/UserToken#JWT";

    #[test]
    fn test_empty_yields_anonymous() {
        assert_eq!(derive_policies(None, &JsonParser), vec![AuthenticationMethod::anonymous()]);
        assert_eq!(
            derive_policies(Some(&[]), &JsonParser),
            vec![AuthenticationMethod::anonymous()]
        );
    }

    #[test]
    fn test_certificate_policy() {
        let policies = [UserTokenPolicy::new("cert", UserTokenType::Certificate)
            .with_issuer_endpoint_url("opc.tcp://issuer:4840")
            .with_security_policy_uri("http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256")];
        let methods = derive_policies(Some(&policies), &JsonParser);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].credential_type, CredentialType::X509Certificate);
        assert_eq!(methods[0].configuration, json!("opc.tcp://issuer:4840"));
        assert!(methods[0].security_policy.is_some());
    }

    #[test]
    fn test_jwt_structured_configuration() {
        let policies = [UserTokenPolicy::new("jwt", UserTokenType::IssuedToken)
            .with_issued_token_type(JWT)
            .with_issuer_endpoint_url(r#"{"ua:tokenEndpoint":"https://login/token"}"#)];
        let methods = derive_policies(Some(&policies), &JsonParser);
        assert_eq!(methods[0].credential_type, CredentialType::JwtToken);
        assert_eq!(methods[0].configuration, json!({"ua:tokenEndpoint": "https://login/token"}));
    }

    #[test]
    fn test_jwt_falls_back_to_raw_string() {
        let policies = [UserTokenPolicy::new("jwt", UserTokenType::IssuedToken)
            .with_issued_token_type(JWT)
            .with_issuer_endpoint_url("https://login/authorize")];
        let methods = derive_policies(Some(&policies), &JsonParser);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].configuration, json!("https://login/authorize"));
    }

    #[test]
    fn test_unsupported_policies_dropped() {
        let policies = [
            UserTokenPolicy::new("kerberos", UserTokenType::IssuedToken)
                .with_issued_token_type("http://opcfoundation.org/UA/UserToken#Kerberos"),
            UserTokenPolicy {
                token_type: EnumValue::Value(9),
                ..UserTokenPolicy::new("future", UserTokenType::Anonymous)
            },
            UserTokenPolicy::new("user", UserTokenType::UserName),
        ];
        let methods = derive_policies(Some(&policies), &JsonParser);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, "user");
    }

    #[test]
    fn test_duplicates_removed_in_order() {
        let policies = [
            UserTokenPolicy::new("anon", UserTokenType::Anonymous),
            UserTokenPolicy::new("user", UserTokenType::UserName),
            UserTokenPolicy::new("anon", UserTokenType::Anonymous),
        ];
        let ids: Vec<_> = derive_policies(Some(&policies), &JsonParser)
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["anon", "user"]);
    }

    #[test]
    fn test_custom_jwt_type() {
        let policies = [UserTokenPolicy::new("jwt", UserTokenType::IssuedToken)
            .with_issued_token_type("urn:custom:jwt")];
        assert!(derive_policies(Some(&policies), &JsonParser).is_empty());
        let methods = derive_policies_with(Some(&policies), &JsonParser, "urn:custom:jwt");
        assert_eq!(methods[0].configuration, Value::Null);
    }

    #[test]
    fn test_token_type_by_name() {
        let policy: UserTokenPolicy =
            serde_json::from_str(r#"{"policyId":"u","tokenType":"UserName"}"#).unwrap();
        let methods = derive_policies(Some(&[policy]), &JsonParser);
        assert_eq!(methods[0].credential_type, CredentialType::UserName);
    }
}
