// scraper.rs
use crate::config::Config;
use crate::scraper::models::{RawListing, SearchPage};
use crate::scraper::FetchError;
use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, DNT, REFERER, USER_AGENT};
use serde_json::Value;
use std::time::Duration;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_6) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
];

const FALLBACK_USER_AGENT: &str = "Mozilla/5.0";

/// Anything that can hand back the raw results of one search page.
pub trait ListingSource {
    /// `page` is 1-based.
    fn fetch_page(&self, page: u32) -> Result<Vec<RawListing>, FetchError>;
}

/// Blocking client for the Webmotors car search endpoint.
pub struct WebmotorsClient {
    client: Client,
    endpoint: String,
    search_url: String,
    display_per_page: u32,
    order: u32,
}

impl WebmotorsClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let timeout = match config.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.api_endpoint.clone(),
            search_url: config.search_url.clone(),
            display_per_page: config.display_per_page,
            order: config.order,
        })
    }

    fn headers() -> HeaderMap {
        let agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(FALLBACK_USER_AGENT);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(agent));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.8"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers
    }

    fn query(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("url", self.search_url.clone()),
            ("actualPage", page.to_string()),
            ("displayPerPage", self.display_per_page.to_string()),
            ("order", self.order.to_string()),
            ("showMenu", "true".to_string()),
            ("showCount", "true".to_string()),
            ("showBreadCrumb", "true".to_string()),
            ("testAB", "false".to_string()),
            ("returnUrl", "false".to_string()),
        ]
    }
}

impl ListingSource for WebmotorsClient {
    fn fetch_page(&self, page: u32) -> Result<Vec<RawListing>, FetchError> {
        let start = std::time::Instant::now();

        let resp = self
            .client
            .get(&self.endpoint)
            .headers(Self::headers())
            .query(&self.query(page))
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("Page {page} answered in {:?}", start.elapsed());
        parse_search_results(&text)
    }
}

/// Pulls the `SearchResults` array out of a response body.
pub fn parse_search_results(body: &str) -> Result<Vec<RawListing>, FetchError> {
    let data: Value =
        serde_json::from_str(body).map_err(|e| FetchError::JsonParse(e.to_string()))?;

    if !data.get("SearchResults").map_or(false, Value::is_array) {
        return Err(FetchError::UnexpectedShape(
            "SearchResults array missing".to_string(),
        ));
    }

    let page: SearchPage =
        serde_json::from_value(data).map_err(|e| FetchError::UnexpectedShape(e.to_string()))?;
    Ok(page.search_results)
}

/// Randomized pause inserted between two page requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDelay {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl PageDelay {
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    /// No pause at all.
    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<Duration> {
        if self.max_secs <= 0.0 {
            return None;
        }
        let secs = rng.gen_range(self.min_secs..=self.max_secs);
        Some(Duration::from_secs_f64(secs))
    }
}

/// Fetches pages `1..=total_pages` in order and concatenates their results.
///
/// The page count is trusted as given; the first failing page aborts the run.
pub fn fetch_all_pages<S: ListingSource + ?Sized>(
    source: &S,
    total_pages: u32,
    delay: &PageDelay,
) -> Result<Vec<RawListing>, FetchError> {
    fetch_pages_with(
        source,
        total_pages,
        delay,
        &mut rand::thread_rng(),
        std::thread::sleep,
    )
}

fn fetch_pages_with<S, R, F>(
    source: &S,
    total_pages: u32,
    delay: &PageDelay,
    rng: &mut R,
    mut pause: F,
) -> Result<Vec<RawListing>, FetchError>
where
    S: ListingSource + ?Sized,
    R: Rng,
    F: FnMut(Duration),
{
    let mut all_results = Vec::new();

    for page in 1..=total_pages {
        info!("Fetching page {page}/{total_pages}");
        let results = source.fetch_page(page)?;
        info!("Page {page} returned {} listings", results.len());
        all_results.extend(results);

        // Only between pages, never after the last one.
        if page < total_pages {
            if let Some(wait) = delay.sample(rng) {
                debug!("Sleeping {:?} before next page", wait);
                pause(wait);
            }
        }
    }

    Ok(all_results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::utils::{raw_listing, StubSource};
    use serde_json::json;

    #[test]
    fn parses_search_results_array() {
        let body = json!({
            "SearchResults": [{"UniqueId": 1}, {"UniqueId": 2}],
            "Count": 2
        })
        .to_string();

        let results = parse_search_results(&body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].unique_id(), Some(2));
    }

    #[test]
    fn rejects_body_without_search_results() {
        let err = parse_search_results(r#"{"Results": []}"#).unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape(_)));

        let err = parse_search_results(r#"{"SearchResults": {"a": 1}}"#).unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape(_)));
    }

    #[test]
    fn rejects_non_json_body() {
        let err = parse_search_results("<html>blocked</html>").unwrap_err();
        assert!(matches!(err, FetchError::JsonParse(_)));
    }

    #[test]
    fn delay_samples_stay_inside_interval() {
        let delay = PageDelay::new(1.0, 5.0);
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let d = delay.sample(&mut rng).unwrap().as_secs_f64();
            assert!((1.0..=5.0).contains(&d));
        }
        assert_eq!(PageDelay::none().sample(&mut rng), None);
    }

    #[test]
    fn query_carries_page_and_flags() {
        let client = WebmotorsClient::new(&Config::default()).unwrap();
        let query = client.query(3);
        assert!(query.contains(&("actualPage", "3".to_string())));
        assert!(query.contains(&("displayPerPage", "24".to_string())));
        assert!(query.contains(&("testAB", "false".to_string())));
    }

    #[test]
    fn headers_mimic_a_browser() {
        let headers = WebmotorsClient::headers();

        let agent = headers[USER_AGENT].to_str().unwrap();
        assert!(USER_AGENTS.contains(&agent));
        assert_eq!(headers[ACCEPT_LANGUAGE], "pt-BR,pt;q=0.8");
        assert_eq!(headers[REFERER], "https://www.google.com/");
        assert_eq!(headers[DNT], "1");
        assert!(headers[ACCEPT].to_str().unwrap().starts_with("text/html"));
    }

    #[test]
    fn user_agent_varies_between_requests() {
        let agents: std::collections::HashSet<String> = (0..50)
            .map(|_| {
                WebmotorsClient::headers()[USER_AGENT]
                    .to_str()
                    .unwrap()
                    .to_string()
            })
            .collect();
        assert!(agents.len() > 1);
    }

    #[test]
    fn pauses_only_between_pages() {
        let source = StubSource::with_pages(vec![
            vec![raw_listing(1, "a")],
            vec![raw_listing(2, "b")],
            vec![raw_listing(3, "c")],
        ]);
        let mut pauses = Vec::new();

        let raw = fetch_pages_with(
            &source,
            3,
            &PageDelay::new(1.0, 5.0),
            &mut rand::thread_rng(),
            |d| pauses.push(d),
        )
        .unwrap();

        assert_eq!(raw.len(), 3);
        assert_eq!(pauses.len(), 2);
        for d in &pauses {
            assert!((1.0..=5.0).contains(&d.as_secs_f64()));
        }
    }

    #[test]
    fn single_page_never_pauses() {
        let source = StubSource::with_pages(vec![vec![raw_listing(1, "a")]]);
        let mut pauses = 0;

        fetch_pages_with(
            &source,
            1,
            &PageDelay::new(1.0, 5.0),
            &mut rand::thread_rng(),
            |_| pauses += 1,
        )
        .unwrap();

        assert_eq!(pauses, 0);
    }

    #[test]
    fn failed_page_stops_before_pausing() {
        let mut source = StubSource::with_pages(vec![vec![raw_listing(1, "a")], vec![]]);
        source.failing_page = Some(1);
        let mut pauses = 0;

        let err = fetch_pages_with(
            &source,
            2,
            &PageDelay::new(1.0, 5.0),
            &mut rand::thread_rng(),
            |_| pauses += 1,
        )
        .unwrap_err();

        assert!(matches!(err, FetchError::Http { status: 403, .. }));
        assert_eq!(pauses, 0);
        assert_eq!(*source.requested.borrow(), vec![1]);
    }
}
