use crate::config::ARTICLES_PER_PAGE;
use crate::models::{Article, Disease, Page, Target};
use crate::tasks::RequestGuard;

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub ticket: u64,
    pub disease_id: i64,
    pub target_id: i64,
    pub start: usize,
    pub limit: usize,
}

pub struct DetailModal {
    pub open: bool,
    pub target: Option<Target>,
    pub disease: Option<Disease>,
    pub articles: Vec<Article>,
    pub loading: bool,
    pub error: Option<String>,
    pub page_start: usize,
    pub page_end: usize,
    pub total: usize,
    pub has_next: bool,
    /// Set once the first page arrived; the "x–y of z" line is hidden before that.
    pub stats_visible: bool,
    per_page: usize,
    guard: RequestGuard,
}

impl Default for DetailModal {
    fn default() -> Self {
        Self {
            open: false,
            target: None,
            disease: None,
            articles: Vec::new(),
            loading: false,
            error: None,
            page_start: 0,
            page_end: 0,
            total: 0,
            has_next: false,
            stats_visible: false,
            per_page: ARTICLES_PER_PAGE,
            guard: RequestGuard::default(),
        }
    }
}

impl DetailModal {
    pub fn show(&mut self, target: Target, disease: Disease) -> PageRequest {
        self.target = Some(target);
        self.disease = Some(disease);
        self.page_start = 0;
        self.page_end = 0;
        self.has_next = false;
        self.stats_visible = false;
        self.articles.clear();
        self.open = true;
        self.load_page(0)
    }

    pub fn close(&mut self) {
        self.open = false;
        self.loading = false;
        self.guard.invalidate();
    }

    fn load_page(&mut self, start: usize) -> PageRequest {
        self.loading = true;
        self.error = None;
        PageRequest {
            ticket: self.guard.issue(),
            disease_id: self.disease.as_ref().map(|d| d.id).unwrap_or_default(),
            target_id: self.target.as_ref().map(|t| t.id).unwrap_or_default(),
            start,
            limit: self.per_page,
        }
    }

    pub fn can_go_previous(&self) -> bool {
        self.page_start > 0
    }

    pub fn can_go_next(&self) -> bool {
        self.has_next
    }

    pub fn next_page(&mut self) -> Option<PageRequest> {
        if !self.open || !self.has_next {
            return None;
        }
        Some(self.load_page(self.page_end))
    }

    pub fn previous_page(&mut self) -> Option<PageRequest> {
        if !self.open || !self.can_go_previous() {
            return None;
        }
        Some(self.load_page(self.page_start.saturating_sub(self.per_page)))
    }

    /// Applies a page of articles unless a newer request superseded it.
    pub fn apply_page(&mut self, request: &PageRequest, result: Result<Page<Article>, String>) -> bool {
        if !self.guard.is_current(request.ticket) {
            return false;
        }
        self.loading = false;

        match result {
            Ok(page) => {
                self.page_start = request.start;
                self.page_end = request.start + page.results.len();
                self.total = page.count;
                self.has_next = page.next.is_some();
                self.articles = page.results;
                self.stats_visible = true;
                true
            }
            Err(err) => {
                self.error = Some(err);
                false
            }
        }
    }

    pub fn title(&self) -> String {
        match (&self.target, &self.disease) {
            (Some(t), Some(d)) => format!("{} and {}", t.name, d.name),
            _ => String::new(),
        }
    }

    /// "first–last of total", one-based.
    pub fn stats(&self) -> String {
        format!("{}–{} of {}", self.page_start + 1, self.page_end, self.total)
    }
}

pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn pubmed_url(article_id: &str) -> String {
    format!("https://www.ncbi.nlm.nih.gov/pubmed/{}/", urlencoding::encode(article_id))
}
