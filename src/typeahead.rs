use crate::api::{ApiResult, OntologyApi};
use crate::models::{Datapoint, Disease, Entity, Mode, Target};
use crate::tasks::RequestGuard;
use crate::tree::NodeDetails;
use tracing::warn;

pub const MIN_QUERY_LEN: usize = 2;
pub const MAX_DATA_HITS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit {
    Disease(Disease),
    Target(Target),
}

impl SearchHit {
    pub fn label(&self) -> String {
        match self {
            SearchHit::Disease(d) => format!("{} ({})", d.name, d.doid),
            SearchHit::Target(t) => match &t.sym {
                Some(sym) => format!("{} ({})", t.name, sym),
                None => t.name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub ticket: u64,
    pub mode: Mode,
    pub query: String,
}

#[derive(Default)]
pub struct TreeSearch {
    pub query: String,
    pub results: Vec<SearchHit>,
    pub pending: bool,
    guard: RequestGuard,
}

impl TreeSearch {
    pub fn clear(&mut self) {
        self.query.clear();
        self.results.clear();
        self.pending = false;
        self.guard.invalidate();
    }

    /// Called whenever the text box changes.
    pub fn on_query_changed(&mut self, mode: Mode) -> Option<SearchRequest> {
        let query = self.query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            self.results.clear();
            self.pending = false;
            self.guard.invalidate();
            return None;
        }
        self.pending = true;
        Some(SearchRequest {
            ticket: self.guard.issue(),
            mode,
            query: query.to_string(),
        })
    }

    pub fn apply(&mut self, request: &SearchRequest, result: Result<Vec<SearchHit>, String>) -> bool {
        if !self.guard.is_current(request.ticket) {
            return false;
        }
        self.pending = false;
        match result {
            Ok(hits) => {
                self.results = hits;
                true
            }
            Err(err) => {
                warn!(query = %request.query, %err, "search failed");
                self.results.clear();
                false
            }
        }
    }
}

pub fn run_search(api: &dyn OntologyApi, mode: Mode, query: &str) -> ApiResult<Vec<SearchHit>> {
    Ok(match mode {
        Mode::Disease => api
            .find_disease(query)?
            .into_iter()
            .map(SearchHit::Disease)
            .collect(),
        Mode::Target => api
            .find_target(query, true)?
            .into_iter()
            .map(SearchHit::Target)
            .collect(),
    })
}

/// What a picked hit turns into: the plot subject and, when known, the tree
/// node to open the tree to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHit {
    pub subject: Entity,
    pub node: Option<NodeDetails>,
}

/// Targets live in the tree as DTO nodes, so their DTO entry is looked up.
/// A failed lookup still plots the target.
pub fn resolve_hit(api: &dyn OntologyApi, hit: SearchHit) -> ResolvedHit {
    match hit {
        SearchHit::Disease(d) => ResolvedHit {
            node: Some(NodeDetails::Disease(d.clone())),
            subject: Entity::Disease(d),
        },
        SearchHit::Target(t) => {
            let node = t.dtoid.as_deref().and_then(|dtoid| match api.get_dto(dtoid) {
                Ok(dto) => Some(NodeDetails::Dto(dto)),
                Err(err) => {
                    warn!(dtoid, %err, "no DTO node for target");
                    None
                }
            });
            ResolvedHit {
                subject: Entity::Target(t),
                node,
            }
        }
    }
}

/// Indices of loaded datapoints whose name or symbol contains `query`.
pub fn match_datapoints(points: &[Datapoint], query: &str) -> Vec<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.label().to_lowercase().contains(&needle))
        .map(|(i, _)| i)
        .take(MAX_DATA_HITS)
        .collect()
}
