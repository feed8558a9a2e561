//! Resource hierarchy: reference types, references and resource paths

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of resource a membership or permission applies to.
///
/// Variants are declared shallowest first, so the derived ordering follows
/// containment depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Organization,
    Environment,
    Domain,
    Application,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 4] = [
        ReferenceType::Organization,
        ReferenceType::Environment,
        ReferenceType::Domain,
        ReferenceType::Application,
    ];

    /// The type of the resource that contains this one.
    pub fn parent(&self) -> Option<ReferenceType> {
        match self {
            ReferenceType::Organization => None,
            ReferenceType::Environment => Some(ReferenceType::Organization),
            ReferenceType::Domain => Some(ReferenceType::Environment),
            ReferenceType::Application => Some(ReferenceType::Domain),
        }
    }

    /// Containment depth, 0 for organizations.
    pub fn depth(&self) -> usize {
        match self {
            ReferenceType::Organization => 0,
            ReferenceType::Environment => 1,
            ReferenceType::Domain => 2,
            ReferenceType::Application => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Organization => "ORGANIZATION",
            ReferenceType::Environment => "ENVIRONMENT",
            ReferenceType::Domain => "DOMAIN",
            ReferenceType::Application => "APPLICATION",
        }
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        ReferenceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown reference type '{}'", s)))
    }
}

/// A (referenceType, referenceId) pair identifying one scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub reference_type: ReferenceType,
    pub reference_id: String,
}

impl Reference {
    pub fn new(reference_type: ReferenceType, reference_id: impl Into<String>) -> Self {
        Self {
            reference_type,
            reference_id: reference_id.into(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.reference_type, self.reference_id)
    }
}

/// Scopes to consult for a permission check, most specific first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePath {
    scopes: Vec<Reference>,
}

impl ResourcePath {
    /// Build a path from already-ordered scopes (most specific first).
    pub fn from_scopes(scopes: Vec<Reference>) -> Self {
        Self { scopes }
    }

    /// Build the path of a resource from its organization down.
    ///
    /// Deeper levels may be absent, but a level cannot be given without
    /// all the levels above it.
    pub fn from_parts(
        organization_id: &str,
        environment_id: Option<&str>,
        domain_id: Option<&str>,
        application_id: Option<&str>,
    ) -> Result<Self> {
        let levels = [
            (ReferenceType::Environment, environment_id),
            (ReferenceType::Domain, domain_id),
            (ReferenceType::Application, application_id),
        ];

        let mut scopes = vec![Reference::new(ReferenceType::Organization, organization_id)];
        let mut truncated = false;
        for (reference_type, id) in levels {
            match id {
                Some(id) if truncated => {
                    return Err(AppError::BadRequest(format!(
                        "{} '{}' given without its {}",
                        reference_type,
                        id,
                        reference_type.parent().map(|p| p.as_str()).unwrap_or_default()
                    )));
                }
                Some(id) => scopes.push(Reference::new(reference_type, id)),
                None => truncated = true,
            }
        }

        scopes.reverse();
        Ok(Self { scopes })
    }

    pub fn scopes(&self) -> &[Reference] {
        &self.scopes
    }

    /// The most specific scope of the path.
    pub fn target(&self) -> Option<&Reference> {
        self.scopes.first()
    }

    /// Identifier of the scope of the given type, if the path reaches it.
    pub fn id_of(&self, reference_type: ReferenceType) -> Option<&str> {
        self.scopes
            .iter()
            .find(|s| s.reference_type == reference_type)
            .map(|s| s.reference_id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }
}
