//! # Policy Documents
//!
//! TOML rendering of a rule set. Entity patterns name certificates by
//! subject; a [`CertificateDirectory`] resolves those names on load.
//!
//! ```toml
//! [[Policy.Rules.Rule]]
//! Migration = "denied"
//! OACreation = "authorized"
//!
//! [[Policy.Rules.Rule.From.Entity]]
//! type = "domain"
//! name = "domain:acme"
//!
//! [[Policy.Rules.Rule.To.Entity]]
//! type = "entity"
//!
//! [Policy.Rules.Rule.Communication.Request]
//! value = "authorized"
//! [Policy.Rules.Rule.Communication.Request.Attributes]
//! authentication = "required"
//! integrity = "required"
//! confidentiality = "optional"
//!
//! [Policy.Rules.Rule.Communication.Reply]
//! value = "denied"
//! [Policy.Rules.Rule.Communication.Reply.Attributes]
//! authentication = "optional"
//! integrity = "optional"
//! confidentiality = "optional"
//! ```

use crate::domain::authorization::Authorization;
use crate::domain::communication::Communication;
use crate::domain::entity::EntityType;
use crate::domain::rule::{PolicyRule, RuleEntities, RuleEntity};
use crate::error::{PolicyError, PolicyResult};
use sec_crypto::Certificate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Certificates known by subject name.
#[derive(Clone, Debug, Default)]
pub struct CertificateDirectory {
    by_name: HashMap<String, Certificate>,
}

impl CertificateDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a certificate under its subject.
    pub fn insert(&mut self, certificate: Certificate) {
        self.by_name
            .insert(certificate.subject().to_string(), certificate);
    }

    /// Look up a subject.
    pub fn resolve(&self, name: &str) -> PolicyResult<&Certificate> {
        self.by_name
            .get(name)
            .ok_or_else(|| PolicyError::UnknownEntityName(name.to_string()))
    }
}

/// `authorized` or `denied`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Allowed.
    Authorized,
    /// Forbidden.
    Denied,
}

impl From<bool> for Permission {
    fn from(allowed: bool) -> Self {
        if allowed {
            Self::Authorized
        } else {
            Self::Denied
        }
    }
}

impl From<Permission> for bool {
    fn from(p: Permission) -> Self {
        p == Permission::Authorized
    }
}

/// Attribute value as written in documents.
///
/// `allowed` and `authorized` are accepted spellings of `optional`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    /// REQUIRED
    Required,
    /// OPTIONAL
    Optional,
    /// DENIED
    Denied,
    /// OPTIONAL
    Allowed,
    /// OPTIONAL
    Authorized,
}

impl From<AttributeValue> for Authorization {
    fn from(v: AttributeValue) -> Self {
        match v {
            AttributeValue::Required => Self::Required,
            AttributeValue::Denied => Self::Denied,
            AttributeValue::Optional | AttributeValue::Allowed | AttributeValue::Authorized => {
                Self::Optional
            }
        }
    }
}

impl From<Authorization> for AttributeValue {
    fn from(a: Authorization) -> Self {
        match a {
            Authorization::Required => Self::Required,
            Authorization::Optional => Self::Optional,
            Authorization::Denied => Self::Denied,
        }
    }
}

/// Per-axis attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributesDocument {
    /// Authentication requirement
    pub authentication: AttributeValue,
    /// Integrity requirement
    pub integrity: AttributeValue,
    /// Confidentiality requirement
    pub confidentiality: AttributeValue,
}

/// One direction of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionDocument {
    /// Whether traffic may flow
    pub value: Permission,
    /// Per-axis requirements
    #[serde(rename = "Attributes")]
    pub attributes: AttributesDocument,
}

impl From<&Communication> for DirectionDocument {
    fn from(c: &Communication) -> Self {
        Self {
            value: c.is_allowed().into(),
            attributes: AttributesDocument {
                authentication: c.authentication().into(),
                integrity: c.integrity().into(),
                confidentiality: c.confidentiality().into(),
            },
        }
    }
}

impl From<&DirectionDocument> for Communication {
    fn from(d: &DirectionDocument) -> Self {
        Communication::new(
            d.value.into(),
            d.attributes.authentication.into(),
            d.attributes.confidentiality.into(),
            d.attributes.integrity.into(),
        )
    }
}

/// Request and reply blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationDocument {
    /// From -> To
    #[serde(rename = "Request")]
    pub request: DirectionDocument,
    /// To -> From
    #[serde(rename = "Reply")]
    pub reply: DirectionDocument,
}

/// Typed entity pattern; `name` is a certificate subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Entity type
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    /// Certificate subject; absent for wildcard patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Entity pattern list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitiesDocument {
    /// Members
    #[serde(rename = "Entity", default)]
    pub entities: Vec<EntityDocument>,
}

/// One rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    /// Migration permission
    #[serde(rename = "Migration")]
    pub migration: Permission,
    /// Remote object creation permission
    #[serde(rename = "OACreation")]
    pub ao_creation: Permission,
    /// Source pattern
    #[serde(rename = "From", default)]
    pub from: EntitiesDocument,
    /// Target pattern
    #[serde(rename = "To", default)]
    pub to: EntitiesDocument,
    /// Traffic policy
    #[serde(rename = "Communication")]
    pub communication: CommunicationDocument,
}

/// `Policy.Rules`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesDocument {
    /// Rules in order
    #[serde(rename = "Rule", default)]
    pub rules: Vec<RuleDocument>,
}

/// `Policy`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySection {
    /// Rule list
    #[serde(rename = "Rules", default)]
    pub rules: RulesDocument,
}

/// Whole policy file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Root table
    #[serde(rename = "Policy", default)]
    pub policy: PolicySection,
}

impl PolicyDocument {
    /// Parse TOML text.
    pub fn parse(content: &str) -> PolicyResult<Self> {
        toml::from_str(content).map_err(|e| PolicyError::DocumentParse(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> PolicyResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PolicyError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Render as TOML text.
    pub fn to_toml(&self) -> PolicyResult<String> {
        toml::to_string(self).map_err(|e| PolicyError::DocumentSerialize(e.to_string()))
    }

    /// Describe `rules`; certificates are written by subject.
    pub fn from_rules(rules: &[PolicyRule]) -> Self {
        let rules = rules.iter().map(rule_document).collect();
        Self {
            policy: PolicySection {
                rules: RulesDocument { rules },
            },
        }
    }

    /// Build rules, resolving entity names through `directory`.
    pub fn to_rules(&self, directory: &CertificateDirectory) -> PolicyResult<Vec<PolicyRule>> {
        self.policy
            .rules
            .rules
            .iter()
            .map(|doc| {
                Ok(PolicyRule::new(
                    rule_entities(&doc.from, directory)?,
                    rule_entities(&doc.to, directory)?,
                    Communication::from(&doc.communication.request),
                    Communication::from(&doc.communication.reply),
                )
                .with_migration(doc.migration.into())
                .with_ao_creation(doc.ao_creation.into()))
            })
            .collect()
    }
}

fn rule_document(rule: &PolicyRule) -> RuleDocument {
    RuleDocument {
        migration: rule.migration().into(),
        ao_creation: rule.ao_creation().into(),
        from: entities_document(rule.from()),
        to: entities_document(rule.to()),
        communication: CommunicationDocument {
            request: rule.request().into(),
            reply: rule.reply().into(),
        },
    }
}

fn entities_document(pattern: &RuleEntities) -> EntitiesDocument {
    EntitiesDocument {
        entities: pattern
            .members()
            .iter()
            .map(|m| EntityDocument {
                entity_type: m.entity_type(),
                name: m.certificate().map(|c| c.subject().to_string()),
            })
            .collect(),
    }
}

fn rule_entities(
    doc: &EntitiesDocument,
    directory: &CertificateDirectory,
) -> PolicyResult<RuleEntities> {
    let members = doc
        .entities
        .iter()
        .map(|e| match &e.name {
            None => Ok(RuleEntity::any(e.entity_type)),
            Some(name) => Ok(RuleEntity::certified(
                e.entity_type,
                directory.resolve(name)?.clone(),
            )),
        })
        .collect::<PolicyResult<Vec<_>>>()?;
    Ok(RuleEntities::new(members))
}
