//! Scraping of the external news-listing page.
//!
//! One scrape fetches the configured front page, parses its listing rows into
//! a batch of [`Item`]s and stamps the whole batch with a single retrieval
//! timestamp. Transport and parse failures never escape: they are logged and
//! collapsed into [`ScrapeOutcome::NoUpdate`] so a broken upstream degrades
//! into stale reads instead of failed requests.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// One ingested news entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  /// Listing-side identifier, unique within a batch
  pub id: String,
  pub title: String,
  pub url: String,
  /// Retrieval timestamp, shared by every item of the batch
  pub now: DateTime<Utc>,
}

/// Outcome of one scrape attempt.
///
/// `NoUpdate` means the scrape did not produce a usable batch and the cache
/// should be left untouched. It is distinct from `Batch(vec![])`, which means
/// the page was fetched successfully but contained no rows and the cache
/// should be emptied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
  Batch(Vec<Item>),
  NoUpdate,
}

#[derive(Debug, Error)]
pub enum ScrapeError {
  #[error("failed to fetch {url}: {source}")]
  Fetch {
    url: String,
    source: reqwest::Error,
  },
  #[error("failed to read response body from {url}: {source}")]
  Body {
    url: String,
    source: reqwest::Error,
  },
}

static ROW_SELECTOR: LazyLock<Selector> =
  LazyLock::new(|| Selector::parse("tr.athing").expect("static selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
  LazyLock::new(|| Selector::parse("span.titleline > a").expect("static selector"));

/// Scraper for one configured listing page.
#[derive(Debug, Clone)]
pub struct Scraper {
  client: reqwest::Client,
  target: String,
  memory_depth: usize,
}

impl Scraper {
  /// Create a scraper for `target`, collecting at most `memory_depth` items
  /// per scrape.
  pub fn new(target: impl Into<String>, memory_depth: usize) -> Self {
    Self {
      client: reqwest::Client::new(),
      target: target.into(),
      memory_depth,
    }
  }

  /// Perform one scrape of the target page.
  ///
  /// Failures are logged at error level and reported as
  /// [`ScrapeOutcome::NoUpdate`], never raised to the caller. Cancellation is
  /// not caught: dropping the returned future aborts the in-flight fetch.
  pub async fn scrape(&self) -> ScrapeOutcome {
    match self.try_scrape().await {
      Ok(items) => {
        tracing::debug!(count = items.len(), "scraped {}", self.target);
        ScrapeOutcome::Batch(items)
      }
      Err(e) => {
        tracing::error!("scrape failed, keeping previous cache contents: {e}");
        ScrapeOutcome::NoUpdate
      }
    }
  }

  async fn try_scrape(&self) -> Result<Vec<Item>, ScrapeError> {
    let response = self
      .client
      .get(&self.target)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|source| ScrapeError::Fetch {
        url: self.target.clone(),
        source,
      })?;

    let html = response.text().await.map_err(|source| ScrapeError::Body {
      url: self.target.clone(),
      source,
    })?;

    Ok(parse_front_page(&html, self.memory_depth))
  }
}

/// Parse listing rows out of a front-page document.
///
/// Collects at most `memory_depth` items even if the page offers more. Rows
/// missing an id, a title or a link are skipped. Every item of the returned
/// batch carries the same retrieval timestamp.
pub fn parse_front_page(html: &str, memory_depth: usize) -> Vec<Item> {
  let document = Html::parse_document(html);
  let now = Utc::now();

  let mut items = Vec::new();
  for row in document.select(&ROW_SELECTOR) {
    if items.len() >= memory_depth {
      break;
    }

    let Some(id) = row.value().attr("id") else {
      tracing::debug!("skipping listing row without an id attribute");
      continue;
    };
    let Some(link) = row.select(&TITLE_SELECTOR).next() else {
      tracing::debug!("skipping listing row {id} without a title link");
      continue;
    };
    let Some(url) = link.value().attr("href") else {
      tracing::debug!("skipping listing row {id} without an href");
      continue;
    };

    items.push(Item {
      id: id.to_string(),
      title: link.text().collect::<String>().trim().to_string(),
      url: url.to_string(),
      now,
    });
  }

  items
}

#[cfg(test)]
mod tests {
  use super::*;

  const FIXTURE: &str = include_str!("../../tests/fixtures/front_page.html");

  #[test]
  fn test_parse_front_page() {
    let items = parse_front_page(FIXTURE, 30);

    assert_eq!(items.len(), 6);
    assert_eq!(items[0].id, "23519439");
    assert_eq!(items[0].title, "A");
    assert_eq!(items[0].url, "https://callumprentice.github.io/apps");
  }

  #[test]
  fn test_parse_stops_at_memory_depth() {
    let items = parse_front_page(FIXTURE, 3);
    assert_eq!(items.len(), 3);
  }

  #[test]
  fn test_batch_shares_one_timestamp() {
    let items = parse_front_page(FIXTURE, 30);
    assert!(items.iter().all(|item| item.now == items[0].now));
  }

  #[test]
  fn test_rows_without_title_link_are_skipped() {
    let html = r#"
      <table>
        <tr class="athing" id="1"><td>no link here</td></tr>
        <tr class="athing" id="2">
          <td><span class="titleline"><a href="https://example.com/2">Two</a></span></td>
        </tr>
      </table>
    "#;

    let items = parse_front_page(html, 30);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "2");
  }

  #[test]
  fn test_empty_page_yields_empty_batch() {
    assert!(parse_front_page("<html><body></body></html>", 30).is_empty());
  }

  #[tokio::test]
  async fn test_unreachable_target_reports_no_update() {
    // Port 9 (discard) is never bound in CI, the connection is refused.
    let scraper = Scraper::new("http://127.0.0.1:9/news", 30);
    assert_eq!(scraper.scrape().await, ScrapeOutcome::NoUpdate);
  }
}
