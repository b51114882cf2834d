//! Paginated HTML block scraper.
//!
//! Fetches numbered listing pages and extracts every element matching a
//! block selector. Pagination ends at the first page that yields zero
//! blocks; any HTTP failure along the way aborts the whole scrape.

use scraper::{ElementRef, Html, Selector};

use crate::download::download_bytes;
use crate::{ScrapeConfig, ScrapeError};

/// One text block extracted from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedBlock {
    /// Whitespace-collapsed text of the block.
    pub text: String,
    /// Title found next to the block, if any.
    pub title: Option<String>,
    /// Machine-readable timestamp found next to the block, if any.
    pub datetime: Option<String>,
}

/// Result of fetching a single page.
#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    /// Blocks extracted from this page.
    pub blocks: Vec<ScrapedBlock>,
    /// Page number that produced these blocks.
    pub page_number: u32,
}

/// Trait for fetching pages of blocks from a listing site.
pub trait Scraper: Send + Sync {
    /// Fetches a single page.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the HTTP request or response parsing fails.
    fn fetch_page(
        &self,
        page: u32,
    ) -> impl std::future::Future<Output = Result<ScrapedPage, ScrapeError>> + Send;

    /// Returns the name of the scraping strategy.
    fn strategy(&self) -> &str;
}

/// Scraper that extracts blocks matching a CSS selector from HTML pages.
#[derive(Debug, Clone)]
pub struct HtmlBlockScraper {
    client: reqwest::Client,
    config: ScrapeConfig,
    block_selector: Selector,
    title_selector: Option<Selector>,
    date_selector: Option<Selector>,
}

/// Parses a CSS selector string, returning a [`ScrapeError`] on failure.
fn parse_selector(selector: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(selector)
        .map_err(|e| ScrapeError::Parse(format!("invalid CSS selector '{selector}': {e}")))
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

impl HtmlBlockScraper {
    /// Creates a scraper for the given client, pagination config, and block
    /// selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Parse`] if `block_selector` is not valid CSS.
    pub fn new(
        client: reqwest::Client,
        config: ScrapeConfig,
        block_selector: &str,
    ) -> Result<Self, ScrapeError> {
        Ok(Self {
            client,
            config,
            block_selector: parse_selector(block_selector)?,
            title_selector: None,
            date_selector: None,
        })
    }

    /// Looks up a title for each block with `selector`, searched within the
    /// block's parent element.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Parse`] if `selector` is not valid CSS.
    pub fn with_title_selector(mut self, selector: &str) -> Result<Self, ScrapeError> {
        self.title_selector = Some(parse_selector(selector)?);
        Ok(self)
    }

    /// Looks up a timestamp for each block with `selector`, searched within
    /// the block's parent element. The `datetime` attribute is preferred
    /// over the element text.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Parse`] if `selector` is not valid CSS.
    pub fn with_date_selector(mut self, selector: &str) -> Result<Self, ScrapeError> {
        self.date_selector = Some(parse_selector(selector)?);
        Ok(self)
    }

    /// Extracts every non-empty block from an HTML document.
    #[must_use]
    pub fn parse_blocks(&self, html: &str) -> Vec<ScrapedBlock> {
        let document = Html::parse_document(html);

        document
            .select(&self.block_selector)
            .filter_map(|block| {
                let text = collapse_text(block);
                if text.is_empty() {
                    return None;
                }

                let scope = block.parent().and_then(ElementRef::wrap).unwrap_or(block);

                let title = self
                    .title_selector
                    .as_ref()
                    .and_then(|sel| scope.select(sel).next())
                    .map(collapse_text)
                    .filter(|t| !t.is_empty());

                let datetime = self
                    .date_selector
                    .as_ref()
                    .and_then(|sel| scope.select(sel).next())
                    .map(|el| {
                        el.value()
                            .attr("datetime")
                            .map_or_else(|| collapse_text(el), |v| v.trim().to_owned())
                    })
                    .filter(|d| !d.is_empty());

                Some(ScrapedBlock {
                    text,
                    title,
                    datetime,
                })
            })
            .collect()
    }
}

impl Scraper for HtmlBlockScraper {
    async fn fetch_page(&self, page: u32) -> Result<ScrapedPage, ScrapeError> {
        let url = self.config.page_url(page);
        let body = download_bytes(&self.client, &url).await?;
        let html = String::from_utf8_lossy(&body);
        let blocks = self.parse_blocks(&html);

        log::debug!("Page {page}: {} blocks from {url}", blocks.len());

        Ok(ScrapedPage {
            blocks,
            page_number: page,
        })
    }

    fn strategy(&self) -> &str {
        "html_blocks"
    }
}

/// Fetches pages starting at `config.first_page` until one yields zero
/// blocks or `config.max_pages` pages have been read.
///
/// # Errors
///
/// Returns the first [`ScrapeError`] encountered. Blocks from earlier pages
/// are discarded.
pub async fn scrape_until_empty<S: Scraper>(
    scraper: &S,
    config: &ScrapeConfig,
) -> Result<Vec<ScrapedBlock>, ScrapeError> {
    let mut all_blocks = Vec::new();
    let mut page = config.first_page;
    let mut fetched: u32 = 0;

    loop {
        if let Some(max) = config.max_pages
            && fetched >= max
        {
            log::info!("Reached max pages ({max}), stopping");
            break;
        }

        if fetched > 0
            && let Some(ms) = config.delay_ms
        {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        log::debug!("Fetching page {page} ({})", scraper.strategy());
        let result = scraper.fetch_page(page).await?;
        fetched += 1;

        if result.blocks.is_empty() {
            log::debug!("Page {} is empty, stopping", result.page_number);
            break;
        }

        all_blocks.extend(result.blocks);
        page += 1;
    }

    log::info!(
        "Scrape complete: {} blocks over {fetched} pages",
        all_blocks.len()
    );
    Ok(all_blocks)
}
