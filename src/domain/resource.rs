//! Protected resources looked up for existence checks

use serde::{Deserialize, Serialize};

/// Security domain, owned by an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    pub environment_id: String,
    pub name: String,
}

/// Application registered in a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub domain: String,
    pub name: String,
}
