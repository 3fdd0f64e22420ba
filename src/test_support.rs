//! Test doubles shared by the unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::models::PaperRecord;
use crate::provider::{PaperProvider, ProviderError, ProviderResult, SearchCriteria};

/// Mock provider returning canned papers and recording its calls.
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockProviderState>>,
}

#[derive(Default)]
struct MockProviderState {
    search_results: Vec<PaperRecord>,
    lookup_results: Vec<PaperRecord>,
    fail_search: bool,
    fail_lookup: bool,
    search_calls: Vec<SearchCriteria>,
    lookup_calls: Vec<Vec<String>>,
}

impl MockProvider {
    pub fn with_search_results(self, papers: Vec<PaperRecord>) -> Self {
        self.state.lock().unwrap().search_results = papers;
        self
    }

    pub fn with_lookup_results(self, papers: Vec<PaperRecord>) -> Self {
        self.state.lock().unwrap().lookup_results = papers;
        self
    }

    pub fn failing_search(self) -> Self {
        self.state.lock().unwrap().fail_search = true;
        self
    }

    pub fn failing_lookup(self) -> Self {
        self.state.lock().unwrap().fail_lookup = true;
        self
    }

    pub fn search_calls(&self) -> Vec<SearchCriteria> {
        self.state.lock().unwrap().search_calls.clone()
    }

    pub fn lookup_calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().lookup_calls.clone()
    }
}

#[async_trait]
impl PaperProvider for MockProvider {
    async fn search(&self, criteria: &SearchCriteria) -> ProviderResult<Vec<PaperRecord>> {
        let mut state = self.state.lock().unwrap();
        state.search_calls.push(criteria.clone());
        if state.fail_search {
            return Err(ProviderError::Api("search backend down".to_string()));
        }
        Ok(state
            .search_results
            .iter()
            .take(criteria.max_results)
            .cloned()
            .collect())
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> ProviderResult<Vec<PaperRecord>> {
        let mut state = self.state.lock().unwrap();
        state.lookup_calls.push(ids.to_vec());
        if state.fail_lookup {
            return Err(ProviderError::Api("lookup backend down".to_string()));
        }
        Ok(state
            .lookup_results
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A record published on 2023-01-15.
pub fn paper(id: &str, title: &str, authors: &[&str]) -> PaperRecord {
    PaperRecord {
        id: id.to_string(),
        title: title.to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        summary: format!("Summary of {}", title),
        pdf_url: format!("http://arxiv.org/pdf/{}", id),
        published: "2023-01-15".to_string(),
    }
}
