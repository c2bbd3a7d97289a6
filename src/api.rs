use crate::config::Config;
use crate::models::{Article, Association, Disease, Dto, Listing, Page, Target};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

pub trait OntologyApi: Send + Sync {
    fn get_disease(&self, disease_id: &str) -> ApiResult<Disease>;

    /// Looks a disease up by DOID. Anything but exactly one match is `None`.
    fn get_disease_by_doid(&self, doid: &str) -> ApiResult<Option<Disease>>;

    fn find_disease(&self, query: &str) -> ApiResult<Vec<Disease>>;

    fn get_disease_children(&self, disease_id: i64) -> ApiResult<Vec<Disease>>;

    /// `None` once the root of the ontology is reached.
    fn get_disease_parent(&self, disease_id: i64) -> ApiResult<Option<Disease>>;

    fn get_disease_targets(
        &self,
        disease_id: i64,
        limit: usize,
        offset: usize,
    ) -> ApiResult<Page<Association>>;

    fn get_target_diseases(
        &self,
        target_id: i64,
        limit: usize,
        offset: usize,
    ) -> ApiResult<Page<Association>>;

    fn get_disease_target_articles(
        &self,
        disease_id: i64,
        target_id: i64,
        offset: usize,
        limit: usize,
    ) -> ApiResult<Page<Article>>;

    fn get_dtos(&self, has_parent: Option<bool>) -> ApiResult<Vec<Dto>>;

    fn get_dto(&self, dto_id: &str) -> ApiResult<Dto>;

    fn get_dto_children(&self, dto_id: &str) -> ApiResult<Vec<Dto>>;

    fn get_dto_parent(&self, parent_url: &str) -> ApiResult<Option<Dto>>;

    fn find_target(&self, query: &str, in_dto: bool) -> ApiResult<Vec<Target>>;
}

pub fn substitute_params(endpoint: &str, params: &[(&str, &str)]) -> String {
    let mut out = endpoint.to_string();
    for (key, value) in params {
        let encoded = urlencoding::encode(value).into_owned();
        out = out
            .split(&format!(":{}", key))
            .collect::<Vec<_>>()
            .join(encoded.as_str());
    }
    out
}

/// The API sometimes hands back `http:` parent links; talk https to an https root.
pub fn upgrade_scheme(https_root: bool, url: &str) -> String {
    if https_root && url.starts_with("http:") {
        format!("https:{}", &url[5..])
    } else {
        url.to_string()
    }
}

/// A DOID lookup only counts when it matches exactly one disease.
pub fn exactly_one<T>(mut items: Vec<T>) -> Option<T> {
    if items.len() == 1 { items.pop() } else { None }
}

pub fn decode<T: DeserializeOwned>(url: &str, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

pub struct HttpApi {
    root: String,
    https: bool,
    client: Client,
}

impl HttpApi {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| ApiError::Transport {
                url: config.api_root.clone(),
                source,
            })?;

        Ok(Self {
            root: config.api_root.clone(),
            https: config.uses_https(),
            client,
        })
    }

    fn make_request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = format!("{}{}", self.root, substitute_params(endpoint, params));
        self.make_simple_request(&url, query)
    }

    fn make_simple_request<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        self.fetch(url, query)?
            .ok_or_else(|| ApiError::NotFound(url.to_string()))
    }

    /// Like `make_simple_request`, but a 404 or a JSON `null` is `Ok(None)`.
    fn fetch<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ApiResult<Option<T>> {
        debug!(url, ?query, "GET");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        decode::<Option<T>>(url, &body)
    }

    fn fetch_optional<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ApiResult<Option<T>> {
        let url = format!("{}{}", self.root, substitute_params(endpoint, params));
        self.fetch(&url, &[])
    }
}

impl OntologyApi for HttpApi {
    fn get_disease(&self, disease_id: &str) -> ApiResult<Disease> {
        self.make_request("/diseases/:diseaseId", &[("diseaseId", disease_id)], &[])
    }

    fn get_disease_by_doid(&self, doid: &str) -> ApiResult<Option<Disease>> {
        let listing: Listing<Disease> =
            self.make_request("/diseases/", &[], &[("doid", doid.to_string())])?;
        Ok(exactly_one(listing.into_vec()))
    }

    fn find_disease(&self, query: &str) -> ApiResult<Vec<Disease>> {
        let listing: Listing<Disease> =
            self.make_request("/diseases/", &[], &[("search", query.to_string())])?;
        Ok(listing.into_vec())
    }

    fn get_disease_children(&self, disease_id: i64) -> ApiResult<Vec<Disease>> {
        let id = disease_id.to_string();
        let listing: Listing<Disease> =
            self.make_request("/diseases/:diseaseId/children/", &[("diseaseId", &id)], &[])?;
        Ok(listing.into_vec())
    }

    fn get_disease_parent(&self, disease_id: i64) -> ApiResult<Option<Disease>> {
        let id = disease_id.to_string();
        self.fetch_optional("/diseases/:diseaseId/parent/", &[("diseaseId", &id)])
    }

    fn get_disease_targets(
        &self,
        disease_id: i64,
        limit: usize,
        offset: usize,
    ) -> ApiResult<Page<Association>> {
        let id = disease_id.to_string();
        self.make_request(
            "/diseases/:diseaseId/targets/",
            &[("diseaseId", &id)],
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
    }

    fn get_target_diseases(
        &self,
        target_id: i64,
        limit: usize,
        offset: usize,
    ) -> ApiResult<Page<Association>> {
        let id = target_id.to_string();
        self.make_request(
            "/targets/:targetId/diseases/",
            &[("targetId", &id)],
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
    }

    fn get_disease_target_articles(
        &self,
        disease_id: i64,
        target_id: i64,
        offset: usize,
        limit: usize,
    ) -> ApiResult<Page<Article>> {
        let disease = disease_id.to_string();
        let target = target_id.to_string();
        self.make_request(
            "/diseases/:diseaseId/targets/:targetId/articles",
            &[("diseaseId", &disease), ("targetId", &target)],
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
    }

    fn get_dtos(&self, has_parent: Option<bool>) -> ApiResult<Vec<Dto>> {
        let query: Vec<(&str, String)> = match has_parent {
            Some(flag) => vec![("has_parent", flag.to_string())],
            None => vec![],
        };
        let listing: Listing<Dto> = self.make_request("/dto/", &[], &query)?;
        Ok(listing.into_vec())
    }

    fn get_dto(&self, dto_id: &str) -> ApiResult<Dto> {
        self.make_request("/dto/:dtoId/", &[("dtoId", dto_id)], &[])
    }

    fn get_dto_children(&self, dto_id: &str) -> ApiResult<Vec<Dto>> {
        let listing: Listing<Dto> =
            self.make_request("/dto/:dtoId/children/", &[("dtoId", dto_id)], &[])?;
        Ok(listing.into_vec())
    }

    fn get_dto_parent(&self, parent_url: &str) -> ApiResult<Option<Dto>> {
        let url = upgrade_scheme(self.https, parent_url);
        self.fetch(&url, &[])
    }

    fn find_target(&self, query: &str, in_dto: bool) -> ApiResult<Vec<Target>> {
        let mut data = vec![("search", query.to_string())];
        if in_dto {
            data.push(("in_dto", "2".to_string()));
        }
        let listing: Listing<Target> = self.make_request("/targets/", &[], &data)?;
        Ok(listing.into_vec())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_and_encodes_params() {
        let url = substitute_params(
            "/diseases/:diseaseId/targets/:targetId/articles",
            &[("diseaseId", "12"), ("targetId", "a b/c")],
        );
        assert_eq!(url, "/diseases/12/targets/a%20b%2Fc/articles");
    }

    #[test]
    fn substitutes_repeated_params() {
        assert_eq!(
            substitute_params("/x/:id/y/:id", &[("id", "3")]),
            "/x/3/y/3"
        );
    }

    #[test]
    fn upgrades_http_parent_urls_for_https_roots() {
        assert_eq!(
            upgrade_scheme(true, "http://api.newdrugtargets.org/dto/3/"),
            "https://api.newdrugtargets.org/dto/3/"
        );
        assert_eq!(
            upgrade_scheme(false, "http://localhost:8000/dto/3/"),
            "http://localhost:8000/dto/3/"
        );
        assert_eq!(
            upgrade_scheme(true, "https://api.newdrugtargets.org/dto/3/"),
            "https://api.newdrugtargets.org/dto/3/"
        );
    }

    #[test]
    fn doid_lookup_needs_a_single_match() {
        let listing = |body: &str| decode::<Listing<Disease>>("u", body).unwrap().into_vec();
        let one = r#"{"count": 1, "next": null, "previous": null,
            "results": [{"id": 4, "doid": "DOID:4", "name": "disease"}]}"#;
        let two = r#"[{"id": 4, "doid": "DOID:4", "name": "disease"},
            {"id": 5, "doid": "DOID:4", "name": "duplicate"}]"#;

        assert_eq!(exactly_one(listing(one)).map(|d| d.id), Some(4));
        assert_eq!(exactly_one(listing(two)), None);
        assert_eq!(exactly_one(listing("[]")), None);
    }

    #[test]
    fn fake_doid_lookup_rejects_duplicates() {
        let disease = |id: i64| Disease {
            id,
            doid: "DOID:4".into(),
            name: "disease".into(),
            summary: None,
            parent: None,
        };
        let api = fake::FakeApi {
            diseases: vec![disease(1), disease(2)],
            ..Default::default()
        };
        assert_eq!(api.get_disease_by_doid("DOID:4").unwrap(), None);
        assert_eq!(api.get_disease_by_doid("DOID:9").unwrap(), None);
    }

    #[test]
    fn decode_reports_the_url() {
        let err = decode::<Disease>("https://api.test/diseases/1", "{not json").unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
        assert!(err.to_string().contains("https://api.test/diseases/1"));
    }

    #[test]
    fn decode_null_as_none() {
        let parent: Option<Disease> = decode("u", "null").unwrap();
        assert_eq!(parent, None);
    }
}
