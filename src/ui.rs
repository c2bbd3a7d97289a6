use crate::app::{AppState, View};
use crate::detail::{pubmed_url, upper_first};
use crate::filters::{FilterKind, IDG_VALUES, TDL_VALUES};
use crate::models::{Datapoint, Entity, Mode};
use crate::scatterplot::{
    LogDomain, TooltipSide, clamp_view, family_label, format_log_tick, nearest_point, tdl_color,
    tooltip_position,
};
use crate::tree::Children;
use crate::typeahead::{MIN_QUERY_LEN, SearchHit, match_datapoints};
use eframe::egui;
use eframe::egui::{Align, Color32, Layout, RichText, Sense, Ui, Vec2};
use egui_extras::{Column, TableBuilder};
use egui_plot::{Legend, MarkerShape, Plot, PlotBounds, PlotPoint, Points};
use rfd::FileDialog;

const POINT_RADIUS: f32 = 4.0;
const HOVER_DISTANCE: f32 = 8.0;
const TOOLTIP_SIZE: Vec2 = Vec2::new(240.0, 96.0);

enum TreeAction {
    Toggle(String),
    Select(String),
}

pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        for (mode, label) in [(Mode::Disease, "Diseases"), (Mode::Target, "Targets")] {
            if ui.selectable_label(state.mode == mode, label).clicked() && state.mode != mode {
                state.set_mode(mode);
            }
        }
        if ui.selectable_label(state.about_open, "About").clicked() {
            state.about_open = !state.about_open;
        }
    });
    ui.separator();

    tree_search(ui, state);
    ui.separator();

    if state.tree.is_empty() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading tree...");
        });
        return;
    }

    let scroll_target = state.tree.take_scroll_target();
    let mut action: Option<TreeAction> = None;

    egui::ScrollArea::both()
        .id_salt("tree_scroll")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (depth, key) in state.tree.visible_rows() {
                let Some(node) = state.tree.node(&key) else {
                    continue;
                };
                let is_selected = state.tree.selected() == Some(key.as_str());

                ui.horizontal(|ui| {
                    ui.add_space(depth as f32 * 16.0);

                    if node.is_leaf() {
                        ui.add_space(18.0);
                    } else if node.children == Children::Loading {
                        ui.spinner();
                    } else {
                        let arrow = if node.expanded { "▼" } else { "▶" };
                        if ui.small_button(arrow).clicked() {
                            action = Some(TreeAction::Toggle(key.clone()));
                        }
                    }

                    let response = ui.selectable_label(is_selected, node.details.label());
                    if response.clicked() {
                        action = Some(TreeAction::Select(key.clone()));
                    }
                    if scroll_target.as_deref() == Some(key.as_str()) {
                        response.scroll_to_me(Some(Align::Center));
                    }
                });
            }
        });

    match action {
        Some(TreeAction::Toggle(key)) => state.toggle_node(&key),
        Some(TreeAction::Select(key)) => state.select_node(&key),
        None => {}
    }
}

fn tree_search(ui: &mut Ui, state: &mut AppState) {
    let hint = match state.mode {
        Mode::Disease => "Search diseases",
        Mode::Target => "Search targets",
    };
    let response = ui.add(
        egui::TextEdit::singleline(&mut state.tree_search.query)
            .hint_text(hint)
            .desired_width(f32::INFINITY),
    );
    if response.changed() {
        state.search_changed();
    }

    if state.tree_search.pending {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Searching...");
        });
    }

    let mut picked: Option<SearchHit> = None;
    if !state.tree_search.results.is_empty() {
        egui::ScrollArea::vertical()
            .id_salt("tree_search_results")
            .max_height(200.0)
            .show(ui, |ui| {
                for hit in &state.tree_search.results {
                    if ui.selectable_label(false, hit.label()).clicked() {
                        picked = Some(hit.clone());
                    }
                }
            });
    } else if !state.tree_search.pending
        && state.tree_search.query.trim().chars().count() >= MIN_QUERY_LEN
    {
        ui.weak("No matches.");
    }

    if let Some(hit) = picked {
        state.pick_hit(hit);
    }
}

pub fn tab_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        for &view in &[View::Plot, View::Table] {
            let label = format!("{:?}", view);
            if ui.selectable_label(state.view == view, label).clicked() {
                state.view = view;
            }
        }
    });
}

fn plot_title(ui: &mut Ui, state: &AppState) {
    match state.plot.title() {
        Some((prefix, name, url)) => {
            ui.horizontal(|ui| {
                ui.heading(prefix);
                ui.hyperlink_to(RichText::new(name).heading(), url);
                if state.plot.loading {
                    ui.spinner();
                }
            });
        }
        None => {
            let prompt = match state.mode {
                Mode::Disease => "Select a disease to see its associated targets.",
                Mode::Target => "Select a target to see its associated diseases.",
            };
            ui.heading(prompt);
        }
    }
}

fn filters_menu(ui: &mut Ui, state: &mut AppState) {
    let label = if state.filters.is_default() { "Filters" } else { "Filters *" };
    ui.menu_button(label, |ui| {
        ui.label(RichText::new("Development level").strong());
        for value in TDL_VALUES {
            let mut on = state.filters.is_selected(FilterKind::Tdl, value);
            if ui.checkbox(&mut on, upper_first(value)).changed() {
                state.filters.toggle(FilterKind::Tdl, value);
            }
        }
        ui.separator();
        ui.label(RichText::new("IDG family").strong());
        for value in IDG_VALUES {
            let mut on = state.filters.is_selected(FilterKind::Idg, value);
            if ui.checkbox(&mut on, upper_first(value)).changed() {
                state.filters.toggle(FilterKind::Idg, value);
            }
        }
        ui.separator();
        if ui.button("Reset").clicked() {
            state.filters.reset();
        }
    });
}

fn toolbar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        tab_bar(ui, state);
        ui.separator();

        if state.plot.subject.as_ref().is_some_and(|s| s.mode() == Mode::Disease) {
            filters_menu(ui, state);
        }

        if state.plot.subject.is_some() {
            let max = state.plot.threshold_max();
            let mut threshold = state.plot.threshold.clamp(1, max);
            let response = ui
                .add_enabled(
                    !state.plot.loading,
                    egui::Slider::new(&mut threshold, 1..=max).text("Threshold"),
                )
                .on_hover_text("Maximum number of associations to plot");
            state.plot.threshold = threshold;
            if response.drag_stopped() || (response.changed() && !response.dragged()) {
                state.change_threshold(threshold);
            }
        }

        if ui
            .add_enabled(state.exporter.is_enabled(), egui::Button::new("Export"))
            .clicked()
        {
            if let Some(path) = FileDialog::new()
                .set_file_name(state.exporter.filename())
                .add_filter("CSV", &["csv"])
                .save_file()
            {
                state.export_to(&path);
            }
        }

        if ui
            .add_enabled(state.share.url.is_some(), egui::Button::new("Share"))
            .clicked()
        {
            state.share.open = !state.share.open;
        }
    });
}

fn data_search(ui: &mut Ui, state: &mut AppState) {
    if state.plot.points.is_empty() {
        return;
    }
    let partner = state.plot.subject.as_ref().map(|s| s.mode().partner_label()).unwrap_or_default();

    match state.view {
        View::Plot => {
            ui.add(
                egui::TextEdit::singleline(&mut state.data_search)
                    .hint_text(format!("Find a {} on the plot", partner))
                    .desired_width(300.0),
            );
            let matches = match_datapoints(&state.plot.points, &state.data_search);
            let mut picked = None;
            for index in matches {
                if ui.selectable_label(false, state.plot.points[index].label()).clicked() {
                    picked = Some(index);
                }
            }
            if let Some(index) = picked {
                state.plot.pin(index);
                state.data_search.clear();
            }
        }
        View::Table => {
            ui.add(
                egui::TextEdit::singleline(&mut state.table.search)
                    .hint_text(format!("Filter {}s by name", partner))
                    .desired_width(300.0),
            );
        }
    }
}

pub fn central_panel(ctx: &egui::Context, ui: &mut Ui, state: &mut AppState) {
    plot_title(ui, state);
    toolbar(ui, state);
    data_search(ui, state);

    if let Some(status) = &state.status {
        ui.colored_label(Color32::RED, status);
    }
    ui.separator();

    if state.plot.subject.is_none() {
        return;
    }
    if state.plot.points.is_empty() {
        if !state.plot.loading {
            ui.label("No associations to show.");
        }
        return;
    }

    match state.view {
        View::Plot => plot_view(ctx, ui, state),
        View::Table => table_view(ui, state),
    }
}

fn plot_view(ctx: &egui::Context, ui: &mut Ui, state: &mut AppState) {
    let visible = state.plot.visible(&state.filters);

    let mut groups: Vec<(String, Color32, Vec<[f64; 2]>)> = Vec::new();
    for &index in &visible {
        let point = &state.plot.points[index];
        let tdl = point.partner.as_target().and_then(|t| t.tdl.clone());
        let name = match (&point.partner, &tdl) {
            (Entity::Target(_), Some(tdl)) => upper_first(&tdl.to_lowercase()),
            (Entity::Target(_), None) => "Unknown".to_string(),
            (Entity::Disease(_), _) => "Diseases".to_string(),
        };
        let color = match &point.partner {
            Entity::Target(_) => tdl_color(tdl.as_deref()),
            Entity::Disease(_) => Color32::LIGHT_BLUE,
        };
        let xy = [point.novelty.log10(), point.importance.log10()];
        match groups.iter_mut().find(|(n, _, _)| *n == name) {
            Some((_, _, coords)) => coords.push(xy),
            None => groups.push((name, color, vec![xy])),
        }
    }

    let mut plot = Plot::new("association_plot")
        .legend(Legend::default())
        .x_axis_label("Novelty")
        .y_axis_label("Importance")
        .x_axis_formatter(|mark, _range| format_log_tick(mark.value))
        .y_axis_formatter(|mark, _range| format_log_tick(mark.value))
        .label_formatter(|_, _| String::new());

    if let Some(domain) = state.plot.domain {
        plot = plot
            .include_x(domain.x[0])
            .include_x(domain.x[1])
            .include_y(domain.y[0])
            .include_y(domain.y[1]);
    }
    if state.plot.reset_view {
        plot = plot.reset();
        state.plot.reset_view = false;
    }

    let domain = state.plot.domain;
    let response = plot.show(ui, |plot_ui| {
        for (name, color, coords) in groups {
            plot_ui.points(
                Points::new(coords)
                    .name(name)
                    .color(color)
                    .shape(MarkerShape::Circle)
                    .filled(true)
                    .radius(POINT_RADIUS),
            );
        }

        if let Some(domain) = domain {
            let bounds = plot_ui.plot_bounds();
            let view = LogDomain {
                x: [bounds.min()[0], bounds.max()[0]],
                y: [bounds.min()[1], bounds.max()[1]],
            };
            if let Some(fixed) = clamp_view(&domain, &view) {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                    [fixed.x[0], fixed.y[0]],
                    [fixed.x[1], fixed.y[1]],
                ));
            }
        }
    });

    let transform = response.transform;
    let screen_of = |point: &Datapoint| {
        transform.position_from_point(&PlotPoint::new(point.novelty.log10(), point.importance.log10()))
    };

    state.plot.hovered = response.response.hover_pos().and_then(|pointer| {
        let positions = visible.iter().map(|&i| (i, screen_of(&state.plot.points[i])));
        nearest_point(positions, pointer, HOVER_DISTANCE)
    });

    if response.response.clicked() {
        if let Some(index) = state.plot.hovered {
            state.show_point_detail(index);
        }
    }

    if let Some(point) = state.plot.focused() {
        let (pos, side) = tooltip_position(
            screen_of(point),
            POINT_RADIUS,
            TOOLTIP_SIZE,
            ctx.screen_rect().width(),
        );
        egui::Area::new(egui::Id::new("plot_tooltip"))
            .fixed_pos(pos)
            .order(egui::Order::Tooltip)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.set_max_width(TOOLTIP_SIZE.x);
                    let align = match side {
                        TooltipSide::Right => Align::Min,
                        TooltipSide::Left => Align::Max,
                    };
                    ui.with_layout(Layout::top_down(align), |ui| {
                        point_tooltip(ui, point);
                    });
                });
            });
    }
}

fn point_tooltip(ui: &mut Ui, point: &Datapoint) {
    ui.label(RichText::new(point.label()).strong());
    match &point.partner {
        Entity::Target(t) => {
            if let Some(fam) = family_label(t) {
                ui.label(fam);
            }
            ui.horizontal(|ui| {
                if let Some(tdl) = &t.tdl {
                    ui.label(RichText::new(tdl).color(Color32::BLACK).background_color(tdl_color(Some(tdl))));
                }
                let family = t.fam.clone().unwrap_or_else(|| "Uncategorized".to_string());
                ui.label(RichText::new(family).background_color(Color32::DARK_GRAY));
            });
        }
        Entity::Disease(d) => {
            ui.label(&d.doid);
        }
    }
    ui.small(format!(
        "Novelty {:.4}  Importance {:.4}",
        point.novelty, point.importance
    ));
}

fn table_view(ui: &mut Ui, state: &mut AppState) {
    let rows = state.table.visible_rows(&state.plot.points, &state.filters);
    let columns = state.table.columns();
    let mut clicked: Option<usize> = None;

    egui::ScrollArea::horizontal().show(ui, |ui| {
        let mut builder = TableBuilder::new(ui)
            .striped(true)
            .sense(Sense::click())
            .cell_layout(Layout::left_to_right(Align::Center));
        for _ in columns {
            builder = builder.column(Column::auto().resizable(true).clip(true));
        }

        builder
            .header(20.0, |mut header| {
                for name in columns {
                    header.col(|ui| {
                        ui.strong(*name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let table_row = rows[row.index()];
                    for cell in &table_row.cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                    if row.response().clicked() {
                        clicked = Some(table_row.point);
                    }
                });
            });
    });

    if let Some(point) = clicked {
        state.show_point_detail(point);
    }
}

pub fn detail_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.detail.open {
        return;
    }
    let mut open = true;
    let mut go_next = false;
    let mut go_previous = false;

    egui::Window::new(state.detail.title())
        .id(egui::Id::new("detail_window"))
        .open(&mut open)
        .collapsible(false)
        .resizable(true)
        .default_size([560.0, 480.0])
        .show(ctx, |ui| {
            let detail = &state.detail;
            if let Some(disease) = &detail.disease {
                ui.heading(upper_first(&disease.name));
                if let Some(summary) = &disease.summary {
                    ui.label(summary);
                }
            }
            if let Some(target) = &detail.target {
                ui.label(format!(
                    "{} {}",
                    target.sym.as_deref().unwrap_or_default(),
                    target.tdl.as_deref().unwrap_or_default()
                ));
            }
            ui.separator();

            ui.horizontal(|ui| {
                ui.strong("Publications");
                if detail.stats_visible {
                    ui.label(detail.stats());
                }
                if detail.loading {
                    ui.spinner();
                }
            });
            if let Some(err) = &detail.error {
                ui.colored_label(Color32::RED, err);
            }

            egui::ScrollArea::vertical().max_height(360.0).show(ui, |ui| {
                for article in &detail.articles {
                    ui.hyperlink_to(RichText::new(&article.title).strong(), pubmed_url(&article.id));
                    ui.label(&article.authors);
                    ui.weak(&article.journal);
                    if !article.abstract_text.is_empty() {
                        egui::CollapsingHeader::new("Abstract")
                            .id_salt(("abstract", &article.id))
                            .show(ui, |ui| {
                                ui.label(&article.abstract_text);
                            });
                    }
                    ui.add_space(6.0);
                }
            });

            ui.separator();
            ui.horizontal(|ui| {
                go_previous = ui
                    .add_enabled(detail.can_go_previous(), egui::Button::new("Previous"))
                    .clicked();
                go_next = ui
                    .add_enabled(detail.can_go_next(), egui::Button::new("Next"))
                    .clicked();
            });
        });

    if go_previous {
        state.detail_previous_page();
    }
    if go_next {
        state.detail_next_page();
    }
    if !open {
        state.detail.close();
    }
}

pub fn share_window(ctx: &egui::Context, state: &mut AppState) {
    let Some(url) = state.share.url.clone() else {
        return;
    };
    let mut open = state.share.open;
    egui::Window::new("Share this chart")
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                let mut text = url.clone();
                ui.add(egui::TextEdit::singleline(&mut text).desired_width(320.0));
                if ui.button("Copy").clicked() {
                    ctx.copy_text(url.clone());
                }
            });
        });
    state.share.open = open;
}

pub fn about_window(ctx: &egui::Context, state: &mut AppState) {
    egui::Window::new("About TIN-X")
        .open(&mut state.about_open)
        .collapsible(false)
        .default_width(420.0)
        .show(ctx, |ui| {
            ui.label(
                "TIN-X (Target Importance and Novelty eXplorer) plots how novel a drug \
                 target is against how important it is to a disease, using text mining \
                 of the biomedical literature.",
            );
            ui.add_space(8.0);
            ui.label("Novelty: how rarely a target or disease is mentioned in publications.");
            ui.label("Importance: how strongly a target and a disease are co-mentioned.");
            ui.add_space(8.0);
            ui.hyperlink_to("Illuminating the Druggable Genome", "https://druggablegenome.net/");
            ui.hyperlink_to("Disease Ontology", "http://disease-ontology.org/");
        });
}

pub fn log_panel(ui: &mut Ui, state: &mut AppState) {
    state.log_panel_height = ui.available_height();

    ui.horizontal(|ui| {
        ui.heading("Log");
        ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
            if ui.button("Clear").clicked() {
                state.log.clear();
            }
            if ui.button("Hide").clicked() {
                state.log_panel_visible = false;
            }
        });
    });
    ui.separator();

    let mut text = state.log.contents();
    egui::ScrollArea::vertical()
        .stick_to_bottom(true)
        .show(ui, |ui| {
            ui.add(
                egui::TextEdit::multiline(&mut text)
                    .desired_width(f32::INFINITY)
                    .desired_rows(10)
                    .font(egui::TextStyle::Monospace)
                    .interactive(false),
            );
        });
}
