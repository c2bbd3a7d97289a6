use crate::api::{ApiResult, OntologyApi};
use crate::config::MAX_THRESHOLD;
use crate::filters::Filters;
use crate::models::{Association, Datapoint, Entity, Mode, Target};
use crate::tasks::RequestGuard;
use eframe::egui::{Color32, Pos2, Vec2};
use tracing::{info, warn};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    pub subject: Entity,
    pub datapoints: Vec<Datapoint>,
    pub total_count: usize,
}

fn to_datapoint(assoc: Association, subject_mode: Mode) -> Option<Datapoint> {
    let (novelty, partner) = match subject_mode {
        Mode::Disease => {
            let target = assoc.target?;
            (assoc.novelty.or(target.novelty), Entity::Target(target))
        }
        Mode::Target => (assoc.novelty, Entity::Disease(assoc.disease?)),
    };
    let novelty = novelty?;
    let importance = assoc.importance?;

    let plottable = |v: f64| v.is_finite() && v > 0.0;
    if !plottable(novelty) || !plottable(importance) {
        return None;
    }

    Some(Datapoint {
        novelty,
        importance,
        partner,
    })
}

/// Associations that cannot sit on a log axis are dropped.
pub fn load_associations(api: &dyn OntologyApi, subject: Entity, limit: usize) -> ApiResult<PlotData> {
    let page = match &subject {
        Entity::Disease(d) => api.get_disease_targets(d.id, limit, 0)?,
        Entity::Target(t) => api.get_target_diseases(t.id, limit, 0)?,
    };

    let received = page.results.len();
    let mode = subject.mode();
    let datapoints: Vec<Datapoint> = page
        .results
        .into_iter()
        .filter_map(|assoc| to_datapoint(assoc, mode))
        .collect();

    if datapoints.len() < received {
        warn!(
            subject = subject.name(),
            dropped = received - datapoints.len(),
            "skipped associations without plottable scores"
        );
    }
    info!(subject = subject.name(), points = datapoints.len(), total = page.count, "loaded plot");

    Ok(PlotData {
        subject,
        datapoints,
        total_count: page.count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogDomain {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

fn nice_extent(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let lo = min.floor();
    let mut hi = max.ceil();
    if hi <= lo {
        hi = lo + 1.0;
    }
    Some([lo, hi])
}

pub fn log_domain(points: &[Datapoint]) -> Option<LogDomain> {
    Some(LogDomain {
        x: nice_extent(points.iter().map(|p| p.novelty.log10()))?,
        y: nice_extent(points.iter().map(|p| p.importance.log10()))?,
    })
}

fn clamp_axis(domain: [f64; 2], view: [f64; 2]) -> [f64; 2] {
    let domain_width = domain[1] - domain[0];
    let view_width = view[1] - view[0];
    if domain_width <= 0.0 || view_width <= 0.0 {
        return domain;
    }
    let zoom = domain_width / view_width;
    let clamped = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    if (clamped - zoom).abs() < f64::EPSILON {
        return view;
    }
    let center = (view[0] + view[1]) / 2.0;
    let half = domain_width / clamped / 2.0;
    [center - half, center + half]
}

/// Keeps the visible window between 0.5x and 20x of the domain. Returns the
/// corrected window, or `None` if `view` is already within bounds.
pub fn clamp_view(domain: &LogDomain, view: &LogDomain) -> Option<LogDomain> {
    let clamped = LogDomain {
        x: clamp_axis(domain.x, view.x),
        y: clamp_axis(domain.y, view.y),
    };
    if clamped == *view { None } else { Some(clamped) }
}

pub fn tdl_color(tdl: Option<&str>) -> Color32 {
    match tdl.map(|t| t.to_lowercase()).as_deref() {
        Some("tclin") => Color32::from_rgb(60, 120, 216),
        Some("tchem") => Color32::from_rgb(106, 168, 79),
        Some("tbio") => Color32::from_rgb(241, 194, 50),
        Some("tdark") => Color32::from_rgb(204, 65, 37),
        _ => Color32::GRAY,
    }
}

/// Detailed family when known, else the broad one.
pub fn family_label(target: &Target) -> Option<&str> {
    target.famext.as_deref().or(target.fam.as_deref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TooltipSide {
    Left,
    Right,
}

/// Places a tooltip beside a point of radius `radius`, flipping to the left
/// when the right side would run past `screen_width`.
pub fn tooltip_position(point: Pos2, radius: f32, size: Vec2, screen_width: f32) -> (Pos2, TooltipSide) {
    let top = point.y - size.y / 2.0;
    if point.x + radius + size.x + 5.0 > screen_width {
        (Pos2::new(point.x - radius - size.x - 5.0, top), TooltipSide::Left)
    } else {
        (Pos2::new(point.x + radius + 5.0, top), TooltipSide::Right)
    }
}

pub fn nearest_point(
    points: impl Iterator<Item = (usize, Pos2)>,
    pointer: Pos2,
    max_distance: f32,
) -> Option<usize> {
    points
        .map(|(index, pos)| (index, pos.distance(pointer)))
        .filter(|(_, dist)| *dist <= max_distance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(index, _)| index)
}

/// Label for a log10 grid line: `10^exp` written out in plain decimals.
pub fn format_log_tick(exp: f64) -> String {
    let value = 10f64.powf(exp);
    if value >= 1e6 || value < 1e-6 {
        return format!("{:.0e}", value);
    }
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

pub fn threshold_max(total_count: usize) -> usize {
    total_count.clamp(1, MAX_THRESHOLD)
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Applied,
    Stale,
    Failed(String),
}

#[derive(Default)]
pub struct Scatterplot {
    pub subject: Option<Entity>,
    pub heading: Option<String>,
    pub points: Vec<Datapoint>,
    pub total_count: usize,
    pub threshold: usize,
    pub domain: Option<LogDomain>,
    pub hovered: Option<usize>,
    pub pinned: Option<usize>,
    /// Set when fresh data arrived and the view should fit the domain again.
    pub reset_view: bool,
    pub loading: bool,
    guard: RequestGuard,
}

impl Scatterplot {
    pub fn clear(&mut self) {
        self.guard.invalidate();
        self.subject = None;
        self.heading = None;
        self.points.clear();
        self.total_count = 0;
        self.domain = None;
        self.hovered = None;
        self.pinned = None;
        self.loading = false;
    }

    pub fn begin_load(&mut self, subject: &Entity, limit: usize) -> u64 {
        self.subject = Some(subject.clone());
        self.threshold = limit;
        self.hovered = None;
        self.pinned = None;
        self.loading = true;
        self.guard.issue()
    }

    pub fn finish_load(&mut self, ticket: u64, result: Result<PlotData, String>) -> LoadOutcome {
        if !self.guard.is_current(ticket) {
            return LoadOutcome::Stale;
        }
        self.loading = false;

        match result {
            Ok(data) => {
                self.domain = log_domain(&data.datapoints);
                self.subject = Some(data.subject);
                self.points = data.datapoints;
                self.total_count = data.total_count;
                self.threshold = self.threshold.min(threshold_max(self.total_count));
                self.reset_view = true;
                LoadOutcome::Applied
            }
            Err(err) => LoadOutcome::Failed(err),
        }
    }

    pub fn threshold_max(&self) -> usize {
        threshold_max(self.total_count)
    }

    pub fn visible(&self, filters: &Filters) -> Vec<usize> {
        (0..self.points.len())
            .filter(|&i| filters.matches(&self.points[i].partner))
            .collect()
    }

    /// Pins the tooltip on a point, e.g. when it was picked from the data search.
    pub fn pin(&mut self, index: usize) {
        if index < self.points.len() {
            self.pinned = Some(index);
        }
    }

    pub fn focused(&self) -> Option<&Datapoint> {
        self.hovered.or(self.pinned).and_then(|i| self.points.get(i))
    }

    pub fn title(&self) -> Option<(&'static str, String, String)> {
        match self.subject.as_ref()? {
            Entity::Disease(d) => Some((
                "Targets associated with ",
                d.name.clone(),
                format!("http://disease-ontology.org/term/{}", urlencoding::encode(&d.doid)),
            )),
            Entity::Target(t) => Some((
                "Diseases associated with ",
                self.heading.clone().unwrap_or_else(|| t.name.clone()),
                format!(
                    "https://pharos.nih.gov/idg/targets/{}",
                    urlencoding::encode(t.uniprot.as_deref().unwrap_or_default())
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::filters::FilterKind;
    use crate::models::{Disease, Target};
    use std::collections::HashMap;

    fn target(id: i64, tdl: &str, novelty: Option<f64>) -> Target {
        Target {
            id,
            uniprot: Some(format!("P{:05}", id)),
            name: format!("target {}", id),
            sym: Some(format!("T{}", id)),
            tdl: Some(tdl.to_string()),
            fam: Some("Kinase".to_string()),
            famext: None,
            dtoid: None,
            novelty,
        }
    }

    fn assoc(t: Target, importance: f64) -> Association {
        Association {
            importance: Some(importance),
            novelty: None,
            target: Some(t),
            disease: None,
        }
    }

    fn subject() -> Entity {
        Entity::Disease(Disease {
            id: 5,
            doid: "DOID:5".into(),
            name: "some disease".into(),
            summary: None,
            parent: None,
        })
    }

    fn api() -> FakeApi {
        let associations = vec![
            assoc(target(1, "Tclin", Some(0.01)), 2.0),
            assoc(target(2, "Tdark", Some(0.5)), 0.1),
            assoc(target(3, "Tbio", None), 1.0),
            assoc(target(4, "Tchem", Some(0.2)), 0.0),
            assoc(target(5, "Tbio", Some(3.0)), 40.0),
        ];
        FakeApi {
            associations: HashMap::from([(5, associations)]),
            ..Default::default()
        }
    }

    #[test]
    fn drops_unplottable_associations() {
        let data = load_associations(&api(), subject(), 300).unwrap();
        let ids: Vec<i64> = data.datapoints.iter().map(|p| p.partner.id()).collect();
        assert_eq!(ids, vec![1, 2, 5]);
        assert_eq!(data.total_count, 5);
    }

    #[test]
    fn requests_the_threshold_as_limit() {
        let api = api();
        load_associations(&api, subject(), 42).unwrap();
        assert_eq!(api.calls(), vec!["get_disease_targets 5 42".to_string()]);
    }

    #[test]
    fn domain_is_widened_to_decades() {
        let data = load_associations(&api(), subject(), 300).unwrap();
        let domain = log_domain(&data.datapoints).unwrap();
        assert_eq!(domain.x, [-2.0, 1.0]);
        assert_eq!(domain.y, [-1.0, 2.0]);
        assert_eq!(log_domain(&[]), None);
    }

    #[test]
    fn single_decade_domain_is_not_empty() {
        let point = Datapoint {
            novelty: 10.0,
            importance: 10.0,
            partner: subject(),
        };
        let domain = log_domain(&[point]).unwrap();
        assert_eq!(domain.x, [1.0, 2.0]);
    }

    #[test]
    fn zoom_is_clamped() {
        let domain = LogDomain {
            x: [0.0, 4.0],
            y: [0.0, 4.0],
        };
        let within = LogDomain {
            x: [1.0, 3.0],
            y: [0.0, 4.0],
        };
        assert_eq!(clamp_view(&domain, &within), None);

        let too_close = LogDomain {
            x: [1.0, 1.1],
            y: [0.0, 4.0],
        };
        let fixed = clamp_view(&domain, &too_close).unwrap();
        assert!(((fixed.x[1] - fixed.x[0]) - 0.2).abs() < 1e-9);
        assert!(((fixed.x[0] + fixed.x[1]) / 2.0 - 1.05).abs() < 1e-9);

        let too_far = LogDomain {
            x: [0.0, 4.0],
            y: [-10.0, 10.0],
        };
        let fixed = clamp_view(&domain, &too_far).unwrap();
        assert_eq!(fixed.y, [-4.0, 4.0]);
    }

    #[test]
    fn tooltip_flips_near_the_right_edge() {
        let size = Vec2::new(200.0, 80.0);
        let (pos, side) = tooltip_position(Pos2::new(100.0, 300.0), 4.0, size, 1000.0);
        assert_eq!(side, TooltipSide::Right);
        assert_eq!(pos, Pos2::new(109.0, 260.0));

        let (pos, side) = tooltip_position(Pos2::new(900.0, 300.0), 4.0, size, 1000.0);
        assert_eq!(side, TooltipSide::Left);
        assert_eq!(pos, Pos2::new(691.0, 260.0));
    }

    #[test]
    fn nearest_point_respects_distance() {
        let points = vec![(0, Pos2::new(0.0, 0.0)), (1, Pos2::new(10.0, 0.0))];
        assert_eq!(nearest_point(points.clone().into_iter(), Pos2::new(8.0, 0.0), 5.0), Some(1));
        assert_eq!(nearest_point(points.into_iter(), Pos2::new(50.0, 0.0), 5.0), None);
    }

    #[test]
    fn stale_loads_are_ignored() {
        let mut plot = Scatterplot::default();
        let first = plot.begin_load(&subject(), 300);
        let second = plot.begin_load(&subject(), 100);
        let data = load_associations(&api(), subject(), 300).unwrap();

        assert_eq!(plot.finish_load(first, Ok(data.clone())), LoadOutcome::Stale);
        assert!(plot.points.is_empty());
        assert!(plot.loading);

        assert_eq!(plot.finish_load(second, Ok(data)), LoadOutcome::Applied);
        assert_eq!(plot.points.len(), 3);
        assert_eq!(plot.threshold, 5);
        assert_eq!(plot.threshold_max(), 5);
        assert!(plot.reset_view);
    }

    #[test]
    fn clearing_invalidates_pending_loads() {
        let mut plot = Scatterplot::default();
        let ticket = plot.begin_load(&subject(), 300);
        plot.clear();
        assert_eq!(plot.finish_load(ticket, Err("late".into())), LoadOutcome::Stale);
    }

    #[test]
    fn filters_hide_points() {
        let mut plot = Scatterplot::default();
        let ticket = plot.begin_load(&subject(), 300);
        plot.finish_load(ticket, Ok(load_associations(&api(), subject(), 300).unwrap()));

        let mut filters = Filters::default();
        assert_eq!(plot.visible(&filters), vec![0, 1, 2]);
        filters.toggle(FilterKind::Tdl, "tdark");
        assert_eq!(plot.visible(&filters), vec![0, 2]);
    }

    #[test]
    fn log_ticks_read_as_plain_numbers() {
        assert_eq!(format_log_tick(0.0), "1");
        assert_eq!(format_log_tick(2.0), "100");
        assert_eq!(format_log_tick(-2.0), "0.01");
        assert_eq!(format_log_tick(7.0), "1e7");
    }

    #[test]
    fn threshold_max_caps_at_two_thousand() {
        assert_eq!(threshold_max(0), 1);
        assert_eq!(threshold_max(150), 150);
        assert_eq!(threshold_max(12_000), 2000);
    }

    #[test]
    fn title_links_to_disease_ontology() {
        let mut plot = Scatterplot::default();
        plot.begin_load(&subject(), 300);
        let (prefix, name, url) = plot.title().unwrap();
        assert_eq!(prefix, "Targets associated with ");
        assert_eq!(name, "some disease");
        assert_eq!(url, "http://disease-ontology.org/term/DOID%3A5");
    }

    #[test]
    fn tooltip_family_falls_back_to_fam() {
        let mut t = target(1, "Tclin", None);
        assert_eq!(family_label(&t), Some("Kinase"));
        t.famext = Some("Tyrosine kinase".into());
        assert_eq!(family_label(&t), Some("Tyrosine kinase"));
        t.fam = None;
        t.famext = None;
        assert_eq!(family_label(&t), None);
    }

    #[test]
    fn target_title_prefers_the_heading() {
        let mut plot = Scatterplot::default();
        plot.begin_load(&Entity::Target(target(7, "Tclin", None)), 300);
        assert_eq!(plot.title().unwrap().1, "target 7");

        plot.heading = Some("Tyrosine-protein kinase ABL1".into());
        let (prefix, name, url) = plot.title().unwrap();
        assert_eq!(prefix, "Diseases associated with ");
        assert_eq!(name, "Tyrosine-protein kinase ABL1");
        assert_eq!(url, "https://pharos.nih.gov/idg/targets/P00007");

        plot.clear();
        assert_eq!(plot.heading, None);
    }

    #[test]
    fn pinned_point_is_focused_until_hover() {
        let mut plot = Scatterplot::default();
        let ticket = plot.begin_load(&subject(), 300);
        plot.finish_load(ticket, Ok(load_associations(&api(), subject(), 300).unwrap()));

        plot.pin(2);
        assert_eq!(plot.focused().map(|p| p.partner.id()), Some(5));
        plot.hovered = Some(0);
        assert_eq!(plot.focused().map(|p| p.partner.id()), Some(1));
        plot.pin(99);
        assert_eq!(plot.pinned, Some(2));
    }
}
