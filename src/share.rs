use crate::models::Mode;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct ShareLink {
    pub mode: Mode,
    pub id: String,
}

/// `<origin>?disease=<doid>` or `<origin>?target=<dto id>`.
pub fn share_url(origin: &str, mode: Mode, id: &str) -> String {
    format!("{}?{}={}", origin.trim_end_matches('/'), mode.as_str(), id)
}

/// Reads a share link, or just its query string, as given on the command line.
/// A disease parameter wins over a target parameter.
pub fn parse_share_link(input: &str) -> Option<ShareLink> {
    let input = input.trim();
    let query = match Url::parse(input) {
        Ok(url) => url.query().unwrap_or_default().to_string(),
        Err(_) => input.trim_start_matches('?').to_string(),
    };

    let links: Vec<ShareLink> = url::form_urlencoded::parse(query.as_bytes())
        .filter(|(_, v)| !v.is_empty())
        .filter_map(|(k, v)| {
            Mode::parse(&k).map(|mode| ShareLink {
                mode,
                id: v.into_owned(),
            })
        })
        .collect();

    links
        .iter()
        .find(|link| link.mode == Mode::Disease)
        .or_else(|| links.first())
        .cloned()
}

/// State of the "Share this chart" popover.
#[derive(Debug, Default)]
pub struct ShareChart {
    pub url: Option<String>,
    pub open: bool,
}

impl ShareChart {
    pub fn set_url(&mut self, origin: &str, mode: Mode, id: &str) {
        self.url = Some(share_url(origin, mode, id));
    }

    pub fn close(&mut self) {
        self.open = false;
    }
}
