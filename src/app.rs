use crate::api::OntologyApi;
use crate::config::{Config, DEFAULT_THRESHOLD};
use crate::detail::{DetailModal, PageRequest};
use crate::exporter::Exporter;
use crate::filters::Filters;
use crate::logging::LogBuffer;
use crate::models::{Article, Entity, Mode, Page};
use crate::scatterplot::{LoadOutcome, PlotData, Scatterplot, load_associations};
use crate::share::{ShareChart, ShareLink};
use crate::table::TableView;
use crate::tasks::{Jobs, RequestGuard, Task};
use crate::tree::{self, ChildRequest, NodeDetails, PathLoad, Selection, TreeView};
use crate::typeahead::{self, ResolvedHit, SearchHit, SearchRequest, TreeSearch};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum View {
    Plot,
    Table,
}

pub struct AppState {
    pub config: Config,
    pub mode: Mode,
    pub view: View,
    pub tree: TreeView,
    pub tree_search: TreeSearch,
    pub data_search: String,
    pub plot: Scatterplot,
    pub filters: Filters,
    pub table: TableView,
    pub exporter: Exporter,
    pub share: ShareChart,
    pub detail: DetailModal,
    pub about_open: bool,
    pub status: Option<String>,
    pub log: LogBuffer,
    pub log_panel_height: f32,
    pub log_panel_visible: bool,
    api: Arc<dyn OntologyApi>,
    root_jobs: Jobs<u64, Vec<NodeDetails>>,
    child_jobs: Jobs<ChildRequest, Vec<NodeDetails>>,
    path_jobs: Jobs<(u64, u64), PathLoad>,
    plot_jobs: Jobs<u64, PlotData>,
    search_jobs: Jobs<SearchRequest, Vec<SearchHit>>,
    pick_jobs: Jobs<u64, ResolvedHit>,
    article_jobs: Jobs<PageRequest, Page<Article>>,
    /// Search picks, share links and tree paths; a newer one or a manual
    /// selection supersedes them.
    navigation: RequestGuard,
}

impl AppState {
    pub fn new(api: Arc<dyn OntologyApi>, config: Config, log: LogBuffer) -> Self {
        let mut state = Self {
            config,
            mode: Mode::Disease,
            view: View::Plot,
            tree: TreeView::new(Mode::Disease),
            tree_search: TreeSearch::default(),
            data_search: String::new(),
            plot: Scatterplot::default(),
            filters: Filters::default(),
            table: TableView::new(Mode::Disease),
            exporter: Exporter::new(Mode::Disease),
            share: ShareChart::default(),
            detail: DetailModal::default(),
            about_open: false,
            status: None,
            log,
            log_panel_height: 150.0,
            log_panel_visible: false,
            api,
            root_jobs: Jobs::default(),
            child_jobs: Jobs::default(),
            path_jobs: Jobs::default(),
            plot_jobs: Jobs::default(),
            search_jobs: Jobs::default(),
            pick_jobs: Jobs::default(),
            article_jobs: Jobs::default(),
            navigation: RequestGuard::default(),
        };
        state.set_mode(Mode::Disease);
        state
    }

    fn spawn<T, F>(&self, name: &str, ticket: u64, work: F) -> Task<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn OntologyApi) -> Result<T, String> + Send + 'static,
    {
        let api = Arc::clone(&self.api);
        Task::spawn(name, ticket, move || work(api.as_ref()))
    }

    fn fail(&mut self, context: &str, err: String) {
        error!(%err, "{}", context);
        self.status = Some(format!("{}: {}", context, err));
    }

    pub fn has_pending(&self) -> bool {
        !(self.root_jobs.is_empty()
            && self.child_jobs.is_empty()
            && self.path_jobs.is_empty()
            && self.plot_jobs.is_empty()
            && self.search_jobs.is_empty()
            && self.pick_jobs.is_empty()
            && self.article_jobs.is_empty())
    }

    pub fn set_mode(&mut self, mode: Mode) {
        info!(%mode, "switching mode");
        self.mode = mode;
        self.navigation.invalidate();
        self.tree.set_mode(mode);
        self.tree_search.clear();
        self.data_search.clear();
        self.filters.reset();
        self.exporter.set_mode(mode);
        self.table.set_mode(mode);
        self.share.close();
        self.share.url = None;
        self.plot.clear();
        self.status = None;
        self.load_roots();
    }

    fn load_roots(&mut self) {
        let generation = self.tree.generation();
        let mode = self.mode;
        let root = self.config.disease_root_doid.clone();
        let task = self.spawn("tree_roots", generation, move |api| {
            tree::load_roots(api, mode, &root).map_err(|e| e.to_string())
        });
        self.root_jobs.push(generation, task);
    }

    pub fn toggle_node(&mut self, key: &str) {
        if let Some(request) = self.tree.toggle(key) {
            let details = request.details.clone();
            let task = self.spawn("tree_children", request.generation, move |api| {
                tree::load_children(api, &details).map_err(|e| e.to_string())
            });
            self.child_jobs.push(request, task);
        }
    }

    pub fn select_node(&mut self, key: &str) {
        if let Some(selection) = self.tree.select(key) {
            self.navigation.invalidate();
            self.on_selection(selection, false);
        }
    }

    pub fn expand_to_node(&mut self, details: NodeDetails) {
        let generation = self.tree.generation();
        let ticket = self.navigation.issue();
        let task = self.spawn("tree_path", ticket, move |api| {
            tree::load_path(api, details).map_err(|e| e.to_string())
        });
        self.path_jobs.push((generation, ticket), task);
    }

    fn on_selection(&mut self, selection: Selection, plot_loaded: bool) {
        self.share.close();

        let share_id = match &selection.details {
            NodeDetails::Disease(d) => d.doid.clone(),
            NodeDetails::Dto(d) => d.id.clone(),
        };
        self.share.set_url(&self.config.share_origin, selection.mode, &share_id);

        if plot_loaded || selection.is_root {
            return;
        }
        match subject_for(&selection.details) {
            Some(subject) => self.load_plot(subject, heading_for(&selection.details)),
            None => info!(node = %selection.key, "node has no target to plot"),
        }
    }

    /// Plots a new subject. `heading` replaces the subject's own name in the
    /// plot title.
    pub fn load_plot(&mut self, subject: Entity, heading: Option<String>) {
        self.plot.heading = heading;
        self.start_plot(subject, DEFAULT_THRESHOLD);
    }

    fn start_plot(&mut self, subject: Entity, limit: usize) {
        self.table.clear();
        self.data_search.clear();
        let ticket = self.plot.begin_load(&subject, limit);
        let task = self.spawn("plot_request", ticket, move |api| {
            load_associations(api, subject, limit).map_err(|e| e.to_string())
        });
        self.plot_jobs.push(ticket, task);
    }

    pub fn change_threshold(&mut self, limit: usize) {
        if let Some(subject) = self.plot.subject.clone() {
            self.start_plot(subject, limit.max(1));
        }
    }

    fn on_plot_loaded(&mut self) {
        if let Some(subject) = &self.plot.subject {
            self.exporter.set_data(&self.plot.points, subject);
        }
        self.table.set_data(&self.plot.points);
        self.filters.reset();
        self.status = None;
    }

    pub fn search_changed(&mut self) {
        if let Some(request) = self.tree_search.on_query_changed(self.mode) {
            let (mode, query) = (request.mode, request.query.clone());
            let task = self.spawn("tree_search", request.ticket, move |api| {
                typeahead::run_search(api, mode, &query).map_err(|e| e.to_string())
            });
            self.search_jobs.push(request, task);
        }
    }

    pub fn pick_hit(&mut self, hit: SearchHit) {
        self.tree_search.clear();
        let ticket = self.navigation.issue();
        let task = self.spawn("resolve_hit", ticket, move |api| {
            Ok(typeahead::resolve_hit(api, hit))
        });
        self.pick_jobs.push(ticket, task);
    }

    pub fn open_share_link(&mut self, link: ShareLink) {
        info!(mode = %link.mode, id = %link.id, "opening shared chart");
        self.set_mode(link.mode);
        let ticket = self.navigation.issue();
        let task = self.spawn("share_link", ticket, move |api| resolve_share_link(api, &link));
        self.pick_jobs.push(ticket, task);
    }

    fn on_hit_resolved(&mut self, resolved: ResolvedHit) {
        let heading = resolved.node.as_ref().and_then(heading_for);
        self.load_plot(resolved.subject, heading);
        if let Some(node) = resolved.node {
            self.expand_to_node(node);
        }
    }

    pub fn show_detail(&mut self, partner: &Entity) {
        let pair = match (&self.plot.subject, partner) {
            (Some(Entity::Disease(d)), Entity::Target(t)) => Some((t.clone(), d.clone())),
            (Some(Entity::Target(t)), Entity::Disease(d)) => Some((t.clone(), d.clone())),
            _ => None,
        };
        if let Some((target, disease)) = pair {
            let request = self.detail.show(target, disease);
            self.load_articles(request);
        }
    }

    pub fn show_point_detail(&mut self, index: usize) {
        if let Some(point) = self.plot.points.get(index) {
            let partner = point.partner.clone();
            self.show_detail(&partner);
        }
    }

    pub fn detail_next_page(&mut self) {
        if let Some(request) = self.detail.next_page() {
            self.load_articles(request);
        }
    }

    pub fn detail_previous_page(&mut self) {
        if let Some(request) = self.detail.previous_page() {
            self.load_articles(request);
        }
    }

    fn load_articles(&mut self, request: PageRequest) {
        let r = request.clone();
        let task = self.spawn("articles", request.ticket, move |api| {
            api.get_disease_target_articles(r.disease_id, r.target_id, r.start, r.limit)
                .map_err(|e| e.to_string())
        });
        self.article_jobs.push(request, task);
    }

    pub fn export_to(&mut self, path: &Path) {
        if let Err(err) = self.exporter.save_to(path) {
            self.fail("Export failed", err.to_string());
        }
    }

    pub fn poll(&mut self) {
        for (generation, result) in self.root_jobs.drain_ready() {
            match result {
                Ok(roots) => {
                    self.tree.set_roots(generation, roots);
                }
                Err(err) if generation == self.tree.generation() => {
                    self.fail("Could not load the tree", err)
                }
                Err(_) => {}
            }
        }

        for (request, result) in self.child_jobs.drain_ready() {
            self.tree.apply_children(&request, result);
        }

        for ((generation, ticket), result) in self.path_jobs.drain_ready() {
            if !self.navigation.is_current(ticket) {
                continue;
            }
            match result {
                Ok(path) => {
                    if let Some(selection) = self.tree.apply_path(generation, path) {
                        self.on_selection(selection, true);
                    }
                }
                Err(err) => self.fail("Could not open the tree", err),
            }
        }

        for (ticket, result) in self.plot_jobs.drain_ready() {
            match self.plot.finish_load(ticket, result) {
                LoadOutcome::Applied => self.on_plot_loaded(),
                LoadOutcome::Failed(err) => self.fail("Could not load associations", err),
                LoadOutcome::Stale => {}
            }
        }

        for (request, result) in self.search_jobs.drain_ready() {
            self.tree_search.apply(&request, result);
        }

        for (ticket, result) in self.pick_jobs.drain_ready() {
            if !self.navigation.is_current(ticket) {
                continue;
            }
            match result {
                Ok(resolved) => self.on_hit_resolved(resolved),
                Err(err) => self.fail("Could not open the selection", err),
            }
        }

        for (request, result) in self.article_jobs.drain_ready() {
            self.detail.apply_page(&request, result);
        }
    }
}

pub fn subject_for(details: &NodeDetails) -> Option<Entity> {
    match details {
        NodeDetails::Disease(d) => Some(Entity::Disease(d.clone())),
        NodeDetails::Dto(d) => d.target.first().cloned().map(Entity::Target),
    }
}

/// DTO nodes title the plot with their own name rather than their target's.
fn heading_for(details: &NodeDetails) -> Option<String> {
    match details {
        NodeDetails::Disease(_) => None,
        NodeDetails::Dto(d) => Some(d.name.clone()),
    }
}

/// Disease links carry a DOID (or a numeric id), target links a DTO id.
pub fn resolve_share_link(api: &dyn OntologyApi, link: &ShareLink) -> Result<ResolvedHit, String> {
    match link.mode {
        Mode::Disease => {
            let disease = if link.id.starts_with("DOID:") {
                api.get_disease_by_doid(&link.id)
                    .map_err(|e| e.to_string())?
                    .ok_or_else(|| format!("no disease with DOID {}", link.id))?
            } else {
                api.get_disease(&link.id).map_err(|e| e.to_string())?
            };
            Ok(ResolvedHit {
                subject: Entity::Disease(disease.clone()),
                node: Some(NodeDetails::Disease(disease)),
            })
        }
        Mode::Target => {
            let dto = api.get_dto(&link.id).map_err(|e| e.to_string())?;
            let target = dto
                .target
                .first()
                .cloned()
                .ok_or_else(|| format!("DTO {} has no target", link.id))?;
            Ok(ResolvedHit {
                subject: Entity::Target(target),
                node: Some(NodeDetails::Dto(dto)),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, SlowApi};
    use crate::models::{Association, Disease, Dto, Target};
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    fn disease(id: i64, name: &str, parent: Option<i64>) -> Disease {
        Disease {
            id,
            doid: format!("DOID:{}", id),
            name: name.into(),
            summary: None,
            parent,
        }
    }

    fn target(id: i64) -> Target {
        Target {
            id,
            uniprot: None,
            name: format!("target {}", id),
            sym: None,
            tdl: Some("Tclin".into()),
            fam: None,
            famext: None,
            dtoid: None,
            novelty: Some(0.5),
        }
    }

    fn api() -> FakeApi {
        FakeApi {
            diseases: vec![
                disease(4, "disease", None),
                disease(7, "cancer", Some(4)),
                disease(9, "lung cancer", Some(7)),
            ],
            dtos: vec![Dto {
                id: "30".into(),
                dtoid: Some("DTO_30".into()),
                name: "ABL1".into(),
                parent: None,
                target: vec![target(11)],
            }],
            associations: HashMap::from([(
                9,
                vec![Association {
                    importance: Some(2.0),
                    novelty: None,
                    target: Some(target(11)),
                    disease: None,
                }],
            )]),
            ..Default::default()
        }
    }

    fn settle(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.has_pending() && Instant::now() < deadline {
            state.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
        state.poll();
    }

    fn app() -> AppState {
        let config = Config::from_lookup(|_| None);
        AppState::new(Arc::new(api()), config, LogBuffer::default())
    }

    fn slow_app(slow: &[&str]) -> AppState {
        let mut inner = api();
        for (id, dtoid, name, target_id) in [("31", "DTO_A", "Kinase A", 1), ("32", "DTO_B", "Kinase B", 2)] {
            let mut t = target(target_id);
            t.dtoid = Some(dtoid.into());
            inner.dtos.push(Dto {
                id: id.into(),
                dtoid: Some(dtoid.into()),
                name: name.into(),
                parent: None,
                target: vec![t],
            });
        }
        let api = SlowApi {
            inner,
            slow: slow.iter().map(|s| s.to_string()).collect(),
            delay: Duration::from_millis(400),
        };
        AppState::new(Arc::new(api), Config::from_lookup(|_| None), LogBuffer::default())
    }

    #[test]
    fn starts_with_the_disease_root() {
        let mut state = app();
        settle(&mut state);
        assert_eq!(state.tree.roots(), &["4".to_string()]);
        assert_eq!(state.status, None);
    }

    #[test]
    fn selecting_a_node_loads_its_plot() {
        let mut state = app();
        settle(&mut state);

        state.expand_to_node(NodeDetails::Disease(disease(9, "lung cancer", Some(7))));
        settle(&mut state);
        assert_eq!(state.tree.selected(), Some("9"));
        assert!(state.plot.points.is_empty(), "path expansion alone does not plot");

        state.select_node("9");
        settle(&mut state);
        assert_eq!(state.plot.points.len(), 1);
        assert_eq!(state.table.len(), 1);
        assert!(state.exporter.is_enabled());
        assert_eq!(
            state.share.url.as_deref(),
            Some("https://newdrugtargets.org?disease=DOID:9")
        );
    }

    #[test]
    fn selecting_the_root_does_not_plot() {
        let mut state = app();
        settle(&mut state);
        state.select_node("4");
        settle(&mut state);
        assert!(state.plot.subject.is_none());
    }

    #[test]
    fn share_link_switches_mode_and_plots() {
        let mut state = app();
        state.open_share_link(ShareLink {
            mode: Mode::Target,
            id: "30".into(),
        });
        settle(&mut state);

        assert_eq!(state.mode, Mode::Target);
        assert_eq!(state.plot.subject.as_ref().map(|s| s.id()), Some(11));
        assert_eq!(state.tree.selected(), Some("30"));
    }

    #[test]
    fn share_link_by_doid() {
        let api = api();
        let resolved = resolve_share_link(
            &api,
            &ShareLink {
                mode: Mode::Disease,
                id: "DOID:9".into(),
            },
        )
        .unwrap();
        assert_eq!(resolved.subject.name(), "lung cancer");
    }

    #[test]
    fn dto_without_targets_has_no_subject() {
        let dto = Dto {
            id: "1".into(),
            dtoid: None,
            name: "Protein".into(),
            parent: None,
            target: vec![],
        };
        assert_eq!(subject_for(&NodeDetails::Dto(dto)), None);
    }

    #[test]
    fn switching_mode_resets_components() {
        let mut state = app();
        settle(&mut state);
        state.select_node("4");
        state.set_mode(Mode::Target);
        settle(&mut state);

        assert!(state.share.url.is_none());
        assert!(!state.exporter.is_enabled());
        assert_eq!(state.tree.roots(), &["30".to_string()]);
    }

    #[test]
    fn picking_a_disease_fills_plot_and_table() {
        let mut state = app();
        settle(&mut state);

        state.pick_hit(SearchHit::Disease(disease(9, "lung cancer", Some(7))));
        settle(&mut state);

        assert_eq!(state.tree.selected(), Some("9"));
        assert_eq!(state.plot.points.len(), 1);
        assert_eq!(state.table.len(), state.plot.points.len());
    }

    #[test]
    fn share_link_keeps_table_rows() {
        let mut state = app();
        state.open_share_link(ShareLink {
            mode: Mode::Disease,
            id: "DOID:9".into(),
        });
        settle(&mut state);

        assert_eq!(state.tree.selected(), Some("9"));
        assert_eq!(state.table.len(), 1);
        assert!(state.exporter.is_enabled());
    }

    #[test]
    fn latest_pick_wins() {
        let mut state = slow_app(&["get_dto DTO_A"]);
        state.set_mode(Mode::Target);
        settle(&mut state);

        let hit = |state: &AppState, dto: &str| {
            let dto = state.tree.node(dto).map(|n| n.details.clone());
            match dto {
                Some(NodeDetails::Dto(d)) => SearchHit::Target(d.target[0].clone()),
                other => panic!("no DTO node: {:?}", other),
            }
        };
        let (a, b) = (hit(&state, "31"), hit(&state, "32"));
        state.pick_hit(a);
        state.pick_hit(b);
        settle(&mut state);

        assert_eq!(state.plot.subject.as_ref().map(|s| s.id()), Some(2));
        assert_eq!(state.tree.selected(), Some("32"));
        assert_eq!(state.plot.title().map(|t| t.1), Some("Kinase B".to_string()));
        assert_eq!(
            state.share.url.as_deref(),
            Some("https://newdrugtargets.org?target=32")
        );
    }

    #[test]
    fn clicking_a_node_drops_a_pending_path() {
        let mut state = slow_app(&["get_disease_parent 9"]);
        settle(&mut state);
        state.toggle_node("4");
        settle(&mut state);

        state.expand_to_node(NodeDetails::Disease(disease(9, "lung cancer", Some(7))));
        state.select_node("7");
        settle(&mut state);

        assert_eq!(state.tree.selected(), Some("7"));
        assert_eq!(state.plot.subject.as_ref().map(|s| s.id()), Some(7));
        assert_eq!(
            state.share.url.as_deref(),
            Some("https://newdrugtargets.org?disease=DOID:7")
        );
        assert_eq!(state.status, None);
    }
}
