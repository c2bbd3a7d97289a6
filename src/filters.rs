use crate::models::{Entity, Target};
use std::collections::BTreeSet;

pub const TDL_VALUES: [&str; 4] = ["tclin", "tchem", "tbio", "tdark"];

pub const IDG_VALUES: [&str; 11] = [
    "gpcr",
    "ogpcr",
    "ion",
    "kinase",
    "nr",
    "enzyme",
    "epigenetic",
    "tf",
    "tf; epigenetic",
    "transporter",
    "uncategorized",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Tdl,
    Idg,
}

/// TDL and IDG-family tag filters shared by the plot and the table.
#[derive(Debug, Clone, PartialEq)]
pub struct Filters {
    tdl: BTreeSet<String>,
    idg: BTreeSet<String>,
}

impl Default for Filters {
    fn default() -> Self {
        Self {
            tdl: TDL_VALUES.iter().map(|v| v.to_string()).collect(),
            idg: IDG_VALUES.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl Filters {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set(&self, kind: FilterKind) -> &BTreeSet<String> {
        match kind {
            FilterKind::Tdl => &self.tdl,
            FilterKind::Idg => &self.idg,
        }
    }

    pub fn is_selected(&self, kind: FilterKind, value: &str) -> bool {
        self.set(kind).contains(value)
    }

    pub fn toggle(&mut self, kind: FilterKind, value: &str) {
        let set = match kind {
            FilterKind::Tdl => &mut self.tdl,
            FilterKind::Idg => &mut self.idg,
        };
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// A target without a TDL never matches; one without a family counts as
    /// "uncategorized".
    pub fn matches_target(&self, target: &Target) -> bool {
        let Some(tdl) = &target.tdl else {
            return false;
        };
        if !self.tdl.contains(&tdl.to_lowercase()) {
            return false;
        }
        match &target.fam {
            Some(fam) => self.idg.contains(&fam.to_lowercase()),
            None => self.idg.contains("uncategorized"),
        }
    }

    /// Diseases carry no tags and always pass.
    pub fn matches(&self, entity: &Entity) -> bool {
        match entity {
            Entity::Target(t) => self.matches_target(t),
            Entity::Disease(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Disease;

    fn target(tdl: Option<&str>, fam: Option<&str>) -> Target {
        Target {
            id: 1,
            uniprot: None,
            name: "t".into(),
            sym: None,
            tdl: tdl.map(String::from),
            fam: fam.map(String::from),
            famext: None,
            dtoid: None,
            novelty: None,
        }
    }

    #[test]
    fn defaults_accept_everything_tagged() {
        let filters = Filters::default();
        assert!(filters.matches_target(&target(Some("Tclin"), Some("Kinase"))));
        assert!(filters.matches_target(&target(Some("Tdark"), None)));
        assert!(filters.matches_target(&target(Some("Tbio"), Some("TF; Epigenetic"))));
        assert!(!filters.matches_target(&target(None, Some("Kinase"))));
    }

    #[test]
    fn toggling_removes_and_restores() {
        let mut filters = Filters::default();
        filters.toggle(FilterKind::Tdl, "tclin");
        assert!(!filters.is_selected(FilterKind::Tdl, "tclin"));
        assert!(!filters.matches_target(&target(Some("Tclin"), Some("Kinase"))));
        assert!(!filters.is_default());

        filters.toggle(FilterKind::Tdl, "tclin");
        assert!(filters.is_default());
    }

    #[test]
    fn uncategorized_controls_targets_without_family() {
        let mut filters = Filters::default();
        filters.toggle(FilterKind::Idg, "uncategorized");
        assert!(!filters.matches_target(&target(Some("Tbio"), None)));
        assert!(filters.matches_target(&target(Some("Tbio"), Some("GPCR"))));

        filters.reset();
        assert!(filters.matches_target(&target(Some("Tbio"), None)));
    }

    #[test]
    fn diseases_always_match() {
        let mut filters = Filters::default();
        filters.toggle(FilterKind::Tdl, "tbio");
        let disease = Entity::Disease(Disease {
            id: 1,
            doid: "DOID:1".into(),
            name: "d".into(),
            summary: None,
            parent: None,
        });
        assert!(filters.matches(&disease));
    }
}
