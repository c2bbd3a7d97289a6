use crate::filters::Filters;
use crate::models::{Datapoint, Entity, Mode};

const TARGET_COLUMNS: [&str; 9] = [
    "Name",
    "Sym",
    "Family",
    "Detailed Family",
    "TDL",
    "Uniprot",
    "dtoID",
    "Novelty Score",
    "Importance Score",
];

const DISEASE_COLUMNS: [&str; 5] = ["Name", "DOID", "Summary", "Novelty Score", "Importance Score"];

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub cells: Vec<String>,
    /// Index into the plotted datapoints.
    pub point: usize,
    pub name: String,
}

/// Tabular mirror of the plotted associations.
pub struct TableView {
    pub mode: Mode,
    pub search: String,
    rows: Vec<TableRow>,
}

impl TableView {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            search: String::new(),
            rows: Vec::new(),
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.clear();
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Columns depend on the kind of subject: a disease lists targets.
    pub fn columns(&self) -> &'static [&'static str] {
        match self.mode {
            Mode::Disease => &TARGET_COLUMNS,
            Mode::Target => &DISEASE_COLUMNS,
        }
    }

    pub fn set_data(&mut self, points: &[Datapoint]) {
        self.rows = points
            .iter()
            .enumerate()
            .map(|(index, point)| map_point(index, point))
            .collect();
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows passing the tag filters whose name contains the search text.
    pub fn visible_rows<'a>(&'a self, points: &[Datapoint], filters: &Filters) -> Vec<&'a TableRow> {
        let needle = self.search.trim().to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                points
                    .get(row.point)
                    .is_some_and(|p| filters.matches(&p.partner))
            })
            .filter(|row| needle.is_empty() || row.name.to_lowercase().contains(&needle))
            .collect()
    }
}

fn map_point(index: usize, point: &Datapoint) -> TableRow {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let cells = match &point.partner {
        Entity::Target(t) => vec![
            t.name.clone(),
            text(&t.sym),
            text(&t.fam),
            text(&t.famext),
            text(&t.tdl),
            text(&t.uniprot),
            text(&t.dtoid),
            point.novelty.to_string(),
            point.importance.to_string(),
        ],
        Entity::Disease(d) => vec![
            d.name.clone(),
            d.doid.clone(),
            text(&d.summary),
            point.novelty.to_string(),
            point.importance.to_string(),
        ],
    };

    TableRow {
        cells,
        point: index,
        name: point.partner.name().to_string(),
    }
}
