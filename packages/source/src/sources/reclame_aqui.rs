//! Reclame Aqui complaint listings.
//!
//! Scrapes the company-scoped listing pages (`/empresa/{slug}/pagina/{n}/`)
//! until a page yields no complaint blocks. Every block on a company page
//! belongs to that company, so no row filter is applied and `raw_brand` is
//! the query itself. A failed request on any page fails the whole fetch.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use spotlight_complaint_models::FetchResult;
use spotlight_scraper::ScrapeConfig;
use spotlight_scraper::html_blocks::{HtmlBlockScraper, ScrapedBlock, scrape_until_empty};

use crate::matching::CompanyQuery;
use crate::parsing::date_or_now;
use crate::progress::ProgressCallback;
use crate::sources::{Collector, SourceInfo};
use crate::{ComplaintSource, FetchError, SourceError};

/// Category given to blocks without a title.
pub const DEFAULT_CATEGORY: &str = "RECLAME AQUI";

/// CSS selectors locating the parts of a complaint card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSelectors {
    /// Complaint text block.
    pub block: String,
    /// Complaint title, searched next to the block.
    pub title: Option<String>,
    /// Complaint timestamp, searched next to the block.
    pub date: Option<String>,
}

/// Reclame Aqui listing scraper.
#[derive(Debug, Clone)]
pub struct ReclameAquiSource {
    info: SourceInfo,
    url_template: String,
    selectors: CardSelectors,
    timeout: Duration,
    delay_ms: Option<u64>,
    max_pages: Option<u32>,
}

impl ReclameAquiSource {
    /// Creates the scraper. `url_template` must contain `{slug}` and
    /// `{page}` placeholders.
    #[must_use]
    pub fn new(
        info: SourceInfo,
        url_template: &str,
        selectors: CardSelectors,
        timeout: Duration,
        delay_ms: Option<u64>,
        max_pages: Option<u32>,
    ) -> Self {
        Self {
            info,
            url_template: url_template.to_owned(),
            selectors,
            timeout,
            delay_ms,
            max_pages,
        }
    }

    /// Pagination config for `query`'s company page.
    #[must_use]
    pub fn scrape_config(&self, query: &CompanyQuery) -> ScrapeConfig {
        let mut config = ScrapeConfig::new(&self.url_template.replace("{slug}", &query.slug()));
        if let Some(ms) = self.delay_ms {
            config = config.with_delay_ms(ms);
        }
        if let Some(max) = self.max_pages {
            config = config.with_max_pages(max);
        }
        config
    }

    async fn run(
        &self,
        company: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchResult, SourceError> {
        let query = CompanyQuery::new(company)?;
        let label = self.info.label();
        let client = self.info.client(self.timeout)?;
        let config = self.scrape_config(&query);

        log::info!("[{label}] Scraping {}", config.url_template);
        progress.set_message(format!("{label}: scraping pages"));

        let mut scraper = HtmlBlockScraper::new(client, config.clone(), &self.selectors.block)?;
        if let Some(title) = &self.selectors.title {
            scraper = scraper.with_title_selector(title)?;
        }
        if let Some(date) = &self.selectors.date {
            scraper = scraper.with_date_selector(date)?;
        }

        let blocks = scrape_until_empty(&scraper, &config).await?;
        progress.inc(blocks.len() as u64);

        parse_blocks(&blocks, &query, &label)
    }
}

/// Turns scraped blocks into complaints.
///
/// Category is the card title (or [`DEFAULT_CATEGORY`]), the date is the
/// card timestamp (or the current time), and `total_raw` is the number of
/// blocks scraped.
///
/// # Errors
///
/// Returns [`SourceError::Validation`] if `query` cannot name a result.
pub fn parse_blocks(
    blocks: &[ScrapedBlock],
    query: &CompanyQuery,
    label: &str,
) -> Result<FetchResult, SourceError> {
    let mut collector = Collector::new(label);

    for block in blocks {
        let date = block
            .datetime
            .as_deref()
            .map_or_else(Utc::now, |d| date_or_now(label, d));
        collector.push(
            date,
            block.title.as_deref().unwrap_or(DEFAULT_CATEGORY),
            &block.text,
            query.text(),
        );
    }

    collector.finish(query.text(), blocks.len() as u64)
}

#[async_trait]
impl ComplaintSource for ReclameAquiSource {
    fn id(&self) -> &str {
        &self.info.id
    }

    fn name(&self) -> &str {
        &self.info.name
    }

    async fn fetch_with_progress(
        &self,
        company: &str,
        progress: Arc<dyn ProgressCallback>,
    ) -> Result<FetchResult, FetchError> {
        self.run(company, progress)
            .await
            .map_err(|e| e.in_fetch(&self.info.label(), company))
    }
}
