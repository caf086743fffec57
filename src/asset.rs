//! Emitted assets and their load order.

use serde::{Deserialize, Serialize};

use crate::error::{CompilerError, ASSET_DEPENDENCY_NOT_FOUND, ASSET_GRAPH_CIRCULAR_DEP, GRAPH_CIRCULAR_DEP};
use crate::graph::{sort_nodes, GraphNode};
use crate::sequence::short_hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    Javascript,
    Stylesheet,
}

impl AssetKind {
    /// Default load priority; stylesheets load ahead of scripts.
    pub fn priority(self) -> i64 {
        match self {
            AssetKind::Javascript => 0,
            AssetKind::Stylesheet => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub content: String,
    pub name: String,
    pub size: usize,
    pub etag: String,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub dependencies: Vec<String>,
    pub priority: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Asset {
    /// Asset named by the hash of its content.
    pub fn new(kind: AssetKind, content: impl Into<String>) -> Self {
        let content = content.into();
        let name = short_hash(&content);
        Self {
            size: content.len(),
            etag: name.clone(),
            name,
            content,
            kind,
            dependencies: Vec::new(),
            priority: kind.priority(),
            integrity: None,
            cross_origin: None,
            referrer_policy: None,
            filepath: None,
            url: None,
        }
    }

    pub fn depends_on(&mut self, name: &str) {
        if name != self.name && !self.dependencies.iter().any(|d| d == name) {
            self.dependencies.push(name.to_string());
        }
    }
}

/// Orders assets so dependencies load first. Identical assets are merged.
pub fn resolve_assets(assets: Vec<Asset>) -> Result<Vec<Asset>, CompilerError> {
    let mut unique: Vec<Asset> = Vec::with_capacity(assets.len());
    for asset in assets {
        match unique.iter_mut().find(|a| a.name == asset.name) {
            Some(existing) => {
                for dep in &asset.dependencies {
                    existing.depends_on(dep);
                }
            }
            None => unique.push(asset),
        }
    }

    for asset in &unique {
        if let Some(missing) = asset
            .dependencies
            .iter()
            .find(|dep| !unique.iter().any(|a| &a.name == *dep))
        {
            return Err(
                CompilerError::new(ASSET_DEPENDENCY_NOT_FOUND, "Asset depends on an unknown asset")
                    .detail("asset", &asset.name)
                    .detail("dependency", missing),
            );
        }
    }

    let nodes: Vec<GraphNode> = unique
        .iter()
        .map(|a| GraphNode {
            name: a.name.clone(),
            dependencies: a.dependencies.clone(),
            priority: a.priority,
        })
        .collect();

    let order = sort_nodes(&nodes).map_err(|mut err| {
        if err.code == GRAPH_CIRCULAR_DEP {
            err.code = ASSET_GRAPH_CIRCULAR_DEP.to_string();
            err.hint = crate::error::describe(ASSET_GRAPH_CIRCULAR_DEP).to_string();
        }
        err
    })?;

    let mut sorted = Vec::with_capacity(unique.len());
    for name in order {
        if let Some(at) = unique.iter().position(|a| a.name == name) {
            sorted.push(unique.swap_remove(at));
        }
    }
    tracing::debug!(assets = sorted.len(), "resolved asset order");
    Ok(sorted)
}
