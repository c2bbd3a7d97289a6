use crate::api::{ApiError, OntologyApi};
use crate::models::{Disease, Dto, Mode};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_DEPTH: usize = 64;

#[derive(Debug, Error)]
pub enum TreeError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("ancestor cycle through node {0}")]
    Cycle(String),

    #[error("ancestor path of {0} is deeper than 64 levels")]
    TooDeep(String),

    #[error("root {0} not found")]
    MissingRoot(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeDetails {
    Disease(Disease),
    Dto(Dto),
}

impl NodeDetails {
    pub fn key(&self) -> String {
        match self {
            NodeDetails::Disease(d) => d.id.to_string(),
            NodeDetails::Dto(d) => d.id.clone(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            NodeDetails::Disease(d) => &d.name,
            NodeDetails::Dto(d) => &d.name,
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            NodeDetails::Disease(_) => Mode::Disease,
            NodeDetails::Dto(_) => Mode::Target,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    NotLoaded,
    Loading,
    Loaded(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub details: NodeDetails,
    pub parent: Option<String>,
    pub children: Children,
    pub expanded: bool,
    pub is_root: bool,
}

impl TreeNode {
    fn new(details: NodeDetails, parent: Option<String>) -> Self {
        Self {
            details,
            parent,
            children: Children::NotLoaded,
            expanded: false,
            is_root: false,
        }
    }

    /// Loaded nodes without children render as leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(&self.children, Children::Loaded(keys) if keys.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChildRequest {
    pub generation: u64,
    pub key: String,
    pub details: NodeDetails,
}

/// Every ancestor of `target`, root first, each with its full list of children.
#[derive(Debug, Clone, PartialEq)]
pub struct PathLoad {
    pub ancestors: Vec<(NodeDetails, Vec<NodeDetails>)>,
    pub target: NodeDetails,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub mode: Mode,
    pub key: String,
    pub details: NodeDetails,
    pub is_root: bool,
}

pub struct TreeView {
    pub mode: Mode,
    generation: u64,
    nodes: HashMap<String, TreeNode>,
    roots: Vec<String>,
    selected: Option<String>,
    scroll_to: Option<String>,
}

impl TreeView {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            generation: 0,
            nodes: HashMap::new(),
            roots: Vec::new(),
            selected: None,
            scroll_to: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.generation += 1;
        self.nodes.clear();
        self.roots.clear();
        self.selected = None;
        self.scroll_to = None;
    }

    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    pub fn node(&self, key: &str) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The node the UI should scroll into view, consumed once.
    pub fn take_scroll_target(&mut self) -> Option<String> {
        self.scroll_to.take()
    }

    pub fn set_roots(&mut self, generation: u64, entries: Vec<NodeDetails>) -> bool {
        if generation != self.generation {
            debug!(generation, current = self.generation, "dropping stale tree roots");
            return false;
        }
        for details in entries {
            let key = self.upsert(details, None);
            self.mark_root(&key);
        }
        true
    }

    fn mark_root(&mut self, key: &str) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.is_root = true;
            node.parent = None;
        }
        if !self.roots.iter().any(|k| k == key) {
            self.roots.push(key.to_string());
        }
    }

    fn upsert(&mut self, details: NodeDetails, parent: Option<String>) -> String {
        let key = details.key();
        match self.nodes.get_mut(&key) {
            Some(node) => {
                node.details = details;
                if parent.is_some() {
                    node.parent = parent;
                }
            }
            None => {
                self.nodes.insert(key.clone(), TreeNode::new(details, parent));
            }
        }
        key
    }

    fn install_children(&mut self, parent_key: &str, children: Vec<NodeDetails>) {
        let mut keys = Vec::with_capacity(children.len());
        for child in children {
            let key = self.upsert(child, Some(parent_key.to_string()));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        if let Some(node) = self.nodes.get_mut(parent_key) {
            node.children = Children::Loaded(keys);
        }
    }

    /// Flips a node open or closed. Opening a node whose children were never
    /// fetched returns the request that fetches them.
    pub fn toggle(&mut self, key: &str) -> Option<ChildRequest> {
        let generation = self.generation;
        let node = self.nodes.get_mut(key)?;

        if node.expanded {
            node.expanded = false;
            return None;
        }

        node.expanded = true;
        if node.children == Children::NotLoaded {
            node.children = Children::Loading;
            return Some(ChildRequest {
                generation,
                key: key.to_string(),
                details: node.details.clone(),
            });
        }
        None
    }

    pub fn apply_children(
        &mut self,
        request: &ChildRequest,
        result: Result<Vec<NodeDetails>, String>,
    ) -> bool {
        if request.generation != self.generation {
            debug!(key = %request.key, "dropping children from a previous tree");
            return false;
        }
        if !self.nodes.contains_key(&request.key) {
            return false;
        }

        match result {
            Ok(children) => {
                self.install_children(&request.key, children);
                true
            }
            Err(err) => {
                warn!(key = %request.key, %err, "could not load children");
                if let Some(node) = self.nodes.get_mut(&request.key) {
                    node.children = Children::NotLoaded;
                    node.expanded = false;
                }
                false
            }
        }
    }

    pub fn apply_path(&mut self, generation: u64, path: PathLoad) -> Option<Selection> {
        if generation != self.generation || path.target.mode() != self.mode {
            return None;
        }

        let mut parent: Option<String> = None;
        for (index, (ancestor, children)) in path.ancestors.into_iter().enumerate() {
            let key = self.upsert(ancestor, parent.clone());
            if index == 0 {
                self.mark_root(&key);
            }
            self.install_children(&key, children);
            if let Some(node) = self.nodes.get_mut(&key) {
                node.expanded = true;
            }
            parent = Some(key);
        }

        let key = self.upsert(path.target, parent.clone());
        if parent.is_none() {
            self.mark_root(&key);
        }
        self.scroll_to = Some(key.clone());
        self.select(&key)
    }

    pub fn select(&mut self, key: &str) -> Option<Selection> {
        let node = self.nodes.get(key)?;
        let selection = Selection {
            mode: self.mode,
            key: key.to_string(),
            details: node.details.clone(),
            is_root: node.is_root,
        };
        self.selected = Some(key.to_string());
        Some(selection)
    }

    pub fn visible_rows(&self) -> Vec<(usize, String)> {
        let mut rows = Vec::new();
        let mut stack: Vec<(usize, &String)> = self.roots.iter().rev().map(|k| (0, k)).collect();

        while let Some((depth, key)) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            rows.push((depth, key.clone()));
            if let (true, Children::Loaded(children)) = (node.expanded, &node.children) {
                for child in children.iter().rev() {
                    stack.push((depth + 1, child));
                }
            }
        }
        rows
    }
}

pub fn load_roots(
    api: &dyn OntologyApi,
    mode: Mode,
    disease_root_doid: &str,
) -> Result<Vec<NodeDetails>, TreeError> {
    match mode {
        Mode::Disease => {
            let root = api
                .get_disease_by_doid(disease_root_doid)?
                .ok_or_else(|| TreeError::MissingRoot(disease_root_doid.to_string()))?;
            Ok(vec![NodeDetails::Disease(root)])
        }
        Mode::Target => Ok(api
            .get_dtos(Some(false))?
            .into_iter()
            .map(NodeDetails::Dto)
            .collect()),
    }
}

pub fn load_children(
    api: &dyn OntologyApi,
    details: &NodeDetails,
) -> Result<Vec<NodeDetails>, TreeError> {
    Ok(match details {
        NodeDetails::Disease(d) => api
            .get_disease_children(d.id)?
            .into_iter()
            .map(NodeDetails::Disease)
            .collect(),
        NodeDetails::Dto(d) => api
            .get_dto_children(&d.id)?
            .into_iter()
            .map(NodeDetails::Dto)
            .collect(),
    })
}

fn parent_of(api: &dyn OntologyApi, details: &NodeDetails) -> Result<Option<NodeDetails>, TreeError> {
    Ok(match details {
        NodeDetails::Disease(d) => api.get_disease_parent(d.id)?.map(NodeDetails::Disease),
        NodeDetails::Dto(d) => match &d.parent {
            Some(url) => api.get_dto_parent(url)?.map(NodeDetails::Dto),
            None => None,
        },
    })
}

/// Walks parent links up to the root. Returns the ancestors root first,
/// without `details` itself.
pub fn resolve_ancestors(
    api: &dyn OntologyApi,
    details: &NodeDetails,
) -> Result<Vec<NodeDetails>, TreeError> {
    let mut seen = HashSet::from([details.key()]);
    let mut ancestors = Vec::new();
    let mut current = details.clone();

    while let Some(parent) = parent_of(api, &current)? {
        let key = parent.key();
        if !seen.insert(key.clone()) {
            return Err(TreeError::Cycle(key));
        }
        if ancestors.len() >= MAX_DEPTH {
            return Err(TreeError::TooDeep(details.key()));
        }
        ancestors.push(parent.clone());
        current = parent;
    }

    ancestors.reverse();
    Ok(ancestors)
}

pub fn load_path(api: &dyn OntologyApi, details: NodeDetails) -> Result<PathLoad, TreeError> {
    let ancestors = resolve_ancestors(api, &details)?;
    let mut levels = Vec::with_capacity(ancestors.len());
    for ancestor in ancestors {
        let children = load_children(api, &ancestor)?;
        levels.push((ancestor, children));
    }
    debug!(node = %details.key(), depth = levels.len(), "resolved tree path");
    Ok(PathLoad {
        ancestors: levels,
        target: details,
    })
}
