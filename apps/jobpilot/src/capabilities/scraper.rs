//! Job board scraper: pulls postings out of an HTML page fetched over HTTP(S) or read
//! from a `file://` URL.
//!
//! Postings are `div.job-listing` blocks with `h2.job-title`, `p.company-name`,
//! a link, and `div.job-description` children. Anything missing gets a placeholder.

use std::path::PathBuf;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

/// Network fetches use a fixed timeout, independent of the controller's own.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DESCRIPTION_LIMIT: usize = 250;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme '{0}'; supported schemes are http, https and file")]
    UnsupportedScheme(String),

    #[error("local file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed for {url}: {reason}")]
    Http { url: String, reason: String },

    #[error("invalid selector '{0}'")]
    Selector(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub url: String,
    pub description: String,
}

struct PostingSelectors {
    listing: Selector,
    title: Selector,
    company: Selector,
    link: Selector,
    description: Selector,
}

impl PostingSelectors {
    fn new() -> Result<Self, ScrapeError> {
        let parse = |css: &str| Selector::parse(css).map_err(|_| ScrapeError::Selector(css.to_string()));
        Ok(Self {
            listing: parse("div.job-listing")?,
            title: parse("h2.job-title")?,
            company: parse("p.company-name")?,
            link: parse("a[href]")?,
            description: parse("div.job-description")?,
        })
    }
}

pub struct JobBoardScraper {
    client: reqwest::Client,
    selectors: PostingSelectors,
}

impl JobBoardScraper {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ScrapeError::Http {
                url: String::new(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            selectors: PostingSelectors::new()?,
        })
    }

    /// Scrapes postings from `url`, keeping only titles that contain any of
    /// `title_keywords` (case-insensitive). No keywords keeps everything.
    pub async fn scrape(
        &self,
        url: &str,
        title_keywords: &[String],
    ) -> Result<Vec<JobPosting>, ScrapeError> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let html = match parsed.scheme() {
            "file" => self.read_local(&parsed).await?,
            "http" | "https" => self.fetch(&parsed).await?,
            other => {
                warn!("Refusing to scrape {url}: unsupported scheme");
                return Err(ScrapeError::UnsupportedScheme(other.to_string()));
            }
        };

        let postings = self.extract_postings(&html, &parsed, title_keywords);
        info!(
            "Scraped {} posting(s) from {} (keywords: {:?})",
            postings.len(),
            url,
            title_keywords
        );
        Ok(postings)
    }

    async fn read_local(&self, url: &Url) -> Result<String, ScrapeError> {
        let path = url.to_file_path().map_err(|_| ScrapeError::InvalidUrl {
            url: url.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| match source.kind() {
                std::io::ErrorKind::NotFound => ScrapeError::FileNotFound(path.clone()),
                _ => ScrapeError::Io {
                    path: path.clone(),
                    source,
                },
            })
    }

    async fn fetch(&self, url: &Url) -> Result<String, ScrapeError> {
        let http_err = |e: reqwest::Error| ScrapeError::Http {
            url: url.to_string(),
            reason: e.to_string(),
        };
        self.client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)
    }

    /// Parses postings out of `html` in document order. Links resolve against `base`.
    pub fn extract_postings(
        &self,
        html: &str,
        base: &Url,
        title_keywords: &[String],
    ) -> Vec<JobPosting> {
        let document = Html::parse_document(html);
        let keywords: Vec<String> = title_keywords.iter().map(|k| k.to_lowercase()).collect();

        document
            .select(&self.selectors.listing)
            .enumerate()
            .filter_map(|(i, listing)| {
                let title = first_text(listing, &self.selectors.title)
                    .unwrap_or_else(|| format!("Job Title N/A {}", i + 1));

                if !keywords.is_empty() {
                    let title_lower = title.to_lowercase();
                    if !keywords.iter().any(|k| title_lower.contains(k.as_str())) {
                        return None;
                    }
                }

                let company = first_text(listing, &self.selectors.company)
                    .unwrap_or_else(|| "Company N/A".to_string());
                let url = listing
                    .select(&self.selectors.link)
                    .find_map(|a| a.value().attr("href"))
                    .map(|href| {
                        base.join(href)
                            .map(String::from)
                            .unwrap_or_else(|_| href.to_string())
                    })
                    .unwrap_or_else(|| "N/A".to_string());
                let description = first_text(listing, &self.selectors.description)
                    .unwrap_or_else(|| "No description available.".to_string());

                Some(JobPosting {
                    title,
                    company,
                    url,
                    description: truncate_description(&description),
                })
            })
            .collect()
    }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Cuts descriptions at a fixed character count and appends "..." when anything was cut.
pub fn truncate_description(text: &str) -> String {
    if text.chars().count() > DESCRIPTION_LIMIT {
        let mut cut: String = text.chars().take(DESCRIPTION_LIMIT).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
    <html><head><title>Test Jobs</title></head><body>
        <h1>Job Listings</h1>
        <div class="job-listing">
            <h2 class="job-title">Software Engineer</h2>
            <p class="company-name">TestCorp</p>
            <a href="details/swe.html">View SWE Job</a>
            <div class="job-description">We are looking for a skilled Software Engineer proficient in Python and AI.</div>
        </div>
        <div class="job-listing">
            <h2 class="job-title">Data Analyst</h2>
            <p class="company-name">AnalyzeIt Inc.</p>
            <a href="https://example.com/jobs/data-analyst-123">View Data Analyst Job</a>
            <div class="job-description">Seeking a Data Analyst to work with large datasets. SQL and Python required.</div>
        </div>
    </body></html>
    "#;

    fn fixture_url(dir: &tempfile::TempDir, html: &str) -> Url {
        let path = dir.path().join("jobs.html");
        std::fs::write(&path, html).unwrap();
        Url::from_file_path(&path).unwrap()
    }

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_scrape_local_fixture_in_document_order() {
        let dir = tempfile::tempdir().unwrap();
        let url = fixture_url(&dir, FIXTURE);
        let scraper = JobBoardScraper::new().unwrap();

        let postings = scraper.scrape(url.as_str(), &[]).await.unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].title, "Software Engineer");
        assert_eq!(postings[0].company, "TestCorp");
        assert_eq!(postings[1].title, "Data Analyst");
        assert_eq!(postings[1].url, "https://example.com/jobs/data-analyst-123");
    }

    #[tokio::test]
    async fn test_scrape_filters_titles_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let url = fixture_url(&dir, FIXTURE);
        let scraper = JobBoardScraper::new().unwrap();

        for kw in ["Analyst", "analyst", "ANALYST"] {
            let postings = scraper.scrape(url.as_str(), &keywords(&[kw])).await.unwrap();
            assert_eq!(postings.len(), 1, "keyword {kw}");
            assert!(postings[0].title.to_lowercase().contains("analyst"));
        }

        let postings = scraper
            .scrape(url.as_str(), &keywords(&["designer", "engineer"]))
            .await
            .unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Software Engineer");
    }

    #[tokio::test]
    async fn test_relative_links_resolve_against_page() {
        let dir = tempfile::tempdir().unwrap();
        let url = fixture_url(&dir, FIXTURE);
        let scraper = JobBoardScraper::new().unwrap();

        let postings = scraper.scrape(url.as_str(), &[]).await.unwrap();
        let expected = Url::from_file_path(dir.path().join("details/swe.html")).unwrap();
        assert_eq!(postings[0].url, expected.as_str());
    }

    #[tokio::test]
    async fn test_unsupported_scheme_returns_error_without_postings() {
        let scraper = JobBoardScraper::new().unwrap();
        let err = scraper
            .scrape("ftp://jobs.example.com/list.html", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::UnsupportedScheme(s) if s == "ftp"));
    }

    #[tokio::test]
    async fn test_missing_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("absent.html")).unwrap();
        let scraper = JobBoardScraper::new().unwrap();

        let err = scraper.scrape(url.as_str(), &[]).await.unwrap_err();
        assert!(matches!(err, ScrapeError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let scraper = JobBoardScraper::new().unwrap();
        let err = scraper.scrape("not a url", &[]).await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidUrl { .. }));
    }

    #[test]
    fn test_page_without_listings_is_empty_not_error() {
        let scraper = JobBoardScraper::new().unwrap();
        let base = Url::parse("https://example.com/jobs").unwrap();
        let postings = scraper.extract_postings("<html><body><p>No jobs</p></body></html>", &base, &[]);
        assert!(postings.is_empty());
    }

    #[test]
    fn test_missing_fields_get_placeholders() {
        let scraper = JobBoardScraper::new().unwrap();
        let base = Url::parse("https://example.com/jobs").unwrap();
        let html = r#"<div class="job-listing"></div><div class="job-listing"><h2 class="job-title">QA</h2></div>"#;

        let postings = scraper.extract_postings(html, &base, &[]);
        assert_eq!(postings[0].title, "Job Title N/A 1");
        assert_eq!(postings[0].company, "Company N/A");
        assert_eq!(postings[0].url, "N/A");
        assert_eq!(postings[0].description, "No description available.");
        assert_eq!(postings[1].title, "QA");
    }

    #[test]
    fn test_truncate_description() {
        let short = "a".repeat(DESCRIPTION_LIMIT);
        assert_eq!(truncate_description(&short), short);

        let long = "é".repeat(DESCRIPTION_LIMIT + 1);
        let cut = truncate_description(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), DESCRIPTION_LIMIT + 3);
    }
}
