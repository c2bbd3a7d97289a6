use crate::models::{Datapoint, Disease, Entity, Mode, Target};
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Builds the CSV download for the currently plotted associations.
pub struct Exporter {
    pub mode: Mode,
    subject: Option<Entity>,
    data: Vec<Datapoint>,
}

impl Exporter {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            subject: None,
            data: Vec::new(),
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.subject = None;
        self.data.clear();
    }

    pub fn set_data(&mut self, data: &[Datapoint], subject: &Entity) {
        self.data = data.to_vec();
        self.subject = Some(subject.clone());
    }

    pub fn is_enabled(&self) -> bool {
        self.subject.is_some() && !self.data.is_empty()
    }

    pub fn filename(&self) -> String {
        let name = self.subject.as_ref().map(|s| s.name()).unwrap_or_default();
        if name.is_empty() {
            return "export.csv".to_string();
        }

        let mut stem = String::with_capacity(name.len());
        let mut in_space = false;
        for c in name.chars() {
            if c.is_whitespace() {
                if !in_space {
                    stem.push('_');
                }
                in_space = true;
            } else {
                stem.extend(c.to_lowercase());
                in_space = false;
            }
        }
        format!("{}.csv", stem)
    }

    fn to_frame(&self) -> PolarsResult<DataFrame> {
        let columns = match self.mode {
            Mode::Disease => {
                let rows: Vec<(&Datapoint, &Target)> = self
                    .data
                    .iter()
                    .filter_map(|p| p.partner.as_target().map(|t| (p, t)))
                    .collect();
                vec![
                    Column::new("id".into(), rows.iter().map(|(_, t)| t.id).collect::<Vec<i64>>()),
                    Column::new("name".into(), rows.iter().map(|(_, t)| t.name.clone()).collect::<Vec<String>>()),
                    Column::new("sym".into(), rows.iter().map(|(_, t)| t.sym.clone()).collect::<Vec<_>>()),
                    Column::new("fam".into(), rows.iter().map(|(_, t)| t.fam.clone()).collect::<Vec<_>>()),
                    Column::new("famext".into(), rows.iter().map(|(_, t)| t.famext.clone()).collect::<Vec<_>>()),
                    Column::new("tdl".into(), rows.iter().map(|(_, t)| t.tdl.clone()).collect::<Vec<_>>()),
                    Column::new("uniprot".into(), rows.iter().map(|(_, t)| t.uniprot.clone()).collect::<Vec<_>>()),
                    Column::new("dtoid".into(), rows.iter().map(|(_, t)| t.dtoid.clone()).collect::<Vec<_>>()),
                    Column::new("novelty_score".into(), rows.iter().map(|(p, _)| p.novelty).collect::<Vec<f64>>()),
                    Column::new("importance_score".into(), rows.iter().map(|(p, _)| p.importance).collect::<Vec<f64>>()),
                ]
            }
            Mode::Target => {
                let rows: Vec<(&Datapoint, &Disease)> = self
                    .data
                    .iter()
                    .filter_map(|p| p.partner.as_disease().map(|d| (p, d)))
                    .collect();
                vec![
                    Column::new("name".into(), rows.iter().map(|(_, d)| d.name.clone()).collect::<Vec<String>>()),
                    Column::new("doid".into(), rows.iter().map(|(_, d)| d.doid.clone()).collect::<Vec<String>>()),
                    Column::new("summary".into(), rows.iter().map(|(_, d)| d.summary.clone()).collect::<Vec<_>>()),
                    Column::new("novelty_score".into(), rows.iter().map(|(p, _)| p.novelty).collect::<Vec<f64>>()),
                    Column::new("importance_score".into(), rows.iter().map(|(p, _)| p.importance).collect::<Vec<f64>>()),
                ]
            }
        };
        DataFrame::new(columns)
    }

    pub fn to_csv(&self) -> Result<String, ExportError> {
        if !self.is_enabled() {
            return Err(ExportError::Empty);
        }
        let mut df = self.to_frame()?;
        let mut buf = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .finish(&mut df)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let csv = self.to_csv()?;
        std::fs::write(path.as_ref(), csv)?;
        info!(path = %path.as_ref().display(), rows = self.data.len(), "exported csv");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease(name: &str) -> Disease {
        Disease {
            id: 3,
            doid: "DOID:1612".into(),
            name: name.into(),
            summary: Some("A cancer, with a comma".into()),
            parent: None,
        }
    }

    fn target_point() -> Datapoint {
        Datapoint {
            novelty: 0.5,
            importance: 2.0,
            partner: Entity::Target(Target {
                id: 17,
                uniprot: Some("P00519".into()),
                name: "Tyrosine-protein kinase ABL1".into(),
                sym: Some("ABL1".into()),
                tdl: Some("Tclin".into()),
                fam: Some("Kinase".into()),
                famext: None,
                dtoid: None,
                novelty: None,
            }),
        }
    }

    #[test]
    fn disabled_until_data_arrives() {
        let exporter = Exporter::new(Mode::Disease);
        assert!(!exporter.is_enabled());
        assert!(matches!(exporter.to_csv(), Err(ExportError::Empty)));
    }

    #[test]
    fn target_rows_for_a_disease() {
        let mut exporter = Exporter::new(Mode::Disease);
        exporter.set_data(&[target_point()], &Entity::Disease(disease("breast cancer")));

        let csv = exporter.to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,sym,fam,famext,tdl,uniprot,dtoid,novelty_score,importance_score")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("17,Tyrosine-protein kinase ABL1,ABL1,Kinase,,Tclin,P00519,,"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn disease_rows_are_quoted_when_needed() {
        let mut exporter = Exporter::new(Mode::Target);
        let point = Datapoint {
            novelty: 1.0,
            importance: 1.0,
            partner: Entity::Disease(disease("breast cancer")),
        };
        exporter.set_data(&[point], &target_point().partner);

        let csv = exporter.to_csv().unwrap();
        assert!(csv.starts_with("name,doid,summary,novelty_score,importance_score\n"));
        assert!(csv.contains("breast cancer,DOID:1612,\"A cancer, with a comma\","));
    }

    #[test]
    fn filename_from_subject() {
        let mut exporter = Exporter::new(Mode::Disease);
        exporter.set_data(&[target_point()], &Entity::Disease(disease("Breast   Cancer Type 2")));
        assert_eq!(exporter.filename(), "breast_cancer_type_2.csv");

        exporter.set_data(&[target_point()], &Entity::Disease(disease("")));
        assert_eq!(exporter.filename(), "export.csv");
    }

    #[test]
    fn mode_change_disables_export() {
        let mut exporter = Exporter::new(Mode::Disease);
        exporter.set_data(&[target_point()], &Entity::Disease(disease("x")));
        exporter.set_mode(Mode::Target);
        assert!(!exporter.is_enabled());
    }

    #[test]
    fn saves_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut exporter = Exporter::new(Mode::Disease);
        exporter.set_data(&[target_point()], &Entity::Disease(disease("x")));

        exporter.save_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("id,name,"));
    }
}
