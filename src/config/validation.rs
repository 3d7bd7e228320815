//! Configuration validation.
//!
//! Validates configuration at startup to catch catalog mistakes early.
//! Resolution itself never fails on a bad catalog; these checks exist so
//! that surprising resolution results are caught before shipping data.

use super::Config;
use super::push::decode_server_key;
use std::collections::{HashMap, HashSet};
use superfeed_model::FieldKind;
use thiserror::Error;

/// Length of an uncompressed P-256 public key.
const SERVER_KEY_LEN: usize = 65;

/// Validation errors for configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("channel username is empty ({0})")]
    EmptyUsername(String),
    #[error("channels.{parent} lists related channel '{username}' more than once")]
    DuplicateRelated { parent: String, username: String },
    #[error("channels.{0} lists itself as a related channel")]
    SelfRelated(String),
    #[error("related channel '{username}' is claimed by both '{first}' and '{second}'")]
    RelatedClaimedTwice {
        username: String,
        first: String,
        second: String,
    },
    #[error("{channel}: tenant_connection.{field} is empty")]
    EmptyTenantField { channel: String, field: &'static str },
    #[error("channels.{channel}.onboarding: field id '{field}' is used more than once")]
    DuplicateFieldId { channel: String, field: String },
    #[error("channels.{channel}.onboarding: field '{field}' has no options")]
    NoOptions { channel: String, field: String },
    #[error("channels.{0}.onboarding.finish_rpc is empty")]
    EmptyFinishRpc(String),
    #[error("hierarchy lists '{0}' more than once")]
    DuplicateDirectoryEntry(String),
    #[error("push.application_server_key is invalid: {0}")]
    InvalidServerKey(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_channels(config, &mut errors);
    validate_hierarchy(config, &mut errors);

    // Application server key (VAPID public key)
    if let Some(ref key) = config.push.application_server_key {
        match decode_server_key(key) {
            Ok(bytes) if bytes.len() == SERVER_KEY_LEN => {}
            Ok(bytes) => errors.push(ValidationError::InvalidServerKey(format!(
                "expected {SERVER_KEY_LEN} bytes, got {}",
                bytes.len()
            ))),
            Err(e) => errors.push(ValidationError::InvalidServerKey(e.to_string())),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_channels(config: &Config, errors: &mut Vec<ValidationError>) {
    // child -> first parent claiming it (BTreeMap order)
    let mut claimed: HashMap<&str, &str> = HashMap::new();

    for (parent, entry) in &config.channels {
        if parent.is_empty() {
            errors.push(ValidationError::EmptyUsername("channels".to_string()));
        }

        let mut seen = HashSet::new();
        for related in &entry.related_channels {
            let username = related.username.as_str();
            if username.is_empty() {
                errors.push(ValidationError::EmptyUsername(format!(
                    "channels.{parent}.related_channels"
                )));
                continue;
            }
            if username == parent {
                errors.push(ValidationError::SelfRelated(parent.clone()));
            }
            if !seen.insert(username) {
                errors.push(ValidationError::DuplicateRelated {
                    parent: parent.clone(),
                    username: username.to_string(),
                });
                continue;
            }
            match claimed.get(username) {
                Some(first) if *first != parent.as_str() => {
                    errors.push(ValidationError::RelatedClaimedTwice {
                        username: username.to_string(),
                        first: first.to_string(),
                        second: parent.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    claimed.insert(username, parent.as_str());
                }
            }

            if let Some(ref tenant) = related.tenant_connection {
                check_tenant(&format!("{parent}/{username}"), tenant, errors);
            }
        }

        if let Some(ref tenant) = entry.tenant_connection {
            check_tenant(parent, tenant, errors);
        }

        if let Some(ref onboarding) = entry.onboarding {
            if onboarding.finish_rpc.trim().is_empty() {
                errors.push(ValidationError::EmptyFinishRpc(parent.clone()));
            }
            let mut ids = HashSet::new();
            for field in onboarding.fields() {
                if !ids.insert(field.id.as_str()) {
                    errors.push(ValidationError::DuplicateFieldId {
                        channel: parent.clone(),
                        field: field.id.clone(),
                    });
                }
                if matches!(
                    field.kind,
                    FieldKind::Select { .. } | FieldKind::Multiselect { .. }
                ) && field.kind.options().is_none_or(|o| o.is_empty())
                {
                    errors.push(ValidationError::NoOptions {
                        channel: parent.clone(),
                        field: field.id.clone(),
                    });
                }
            }
        }
    }
}

fn check_tenant(
    channel: &str,
    tenant: &superfeed_model::TenantConnection,
    errors: &mut Vec<ValidationError>,
) {
    if tenant.url.trim().is_empty() {
        errors.push(ValidationError::EmptyTenantField {
            channel: channel.to_string(),
            field: "url",
        });
    }
    if tenant.anon_key.trim().is_empty() {
        errors.push(ValidationError::EmptyTenantField {
            channel: channel.to_string(),
            field: "anon_key",
        });
    }
}

fn validate_hierarchy(config: &Config, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for root in &config.hierarchy {
        root.for_each_member(&mut |path, member| {
            if member.username.is_empty() {
                errors.push(ValidationError::EmptyUsername(format!(
                    "hierarchy {}",
                    path.join("/")
                )));
            } else if !seen.insert(member.username.clone()) {
                errors.push(ValidationError::DuplicateDirectoryEntry(
                    member.username.clone(),
                ));
            }
        });
    }
}
