//! HTTP surface: the `/posts` endpoint.
//!
//! Each request walks one state machine: refresh the cache from the scraper,
//! validate the query contract, sort and slice the cached items, respond.
//! A failed refresh is not a failed request: the handler serves whatever the
//! cache already holds.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

use crate::cache::CacheRepository;
use crate::scraper::{Item, ScrapeOutcome, Scraper};

/// Default `limit` when the query does not supply one.
const DEFAULT_LIMIT: usize = 5;

/// Shared state handed to every request handler.
pub struct AppState {
  pub repo: Arc<CacheRepository>,
  pub scraper: Scraper,
  pub memory_depth: usize,
}

pub fn router(state: Arc<AppState>) -> Router {
  Router::new()
    .route("/posts", get(posts))
    .with_state(state)
}

/// Raw query parameters. Kept as strings so out-of-contract values become a
/// 400 through our own validation instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PostsQuery {
  order: Option<String>,
  offset: Option<String>,
  limit: Option<String>,
}

/// Sortable item fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
  Id,
  Title,
  Url,
  Now,
}

impl SortOrder {
  fn parse(raw: &str) -> Option<Self> {
    match raw {
      "id" => Some(SortOrder::Id),
      "title" => Some(SortOrder::Title),
      "url" => Some(SortOrder::Url),
      "now" => Some(SortOrder::Now),
      _ => None,
    }
  }
}

/// Validated query contract for `/posts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PostsParams {
  order: SortOrder,
  offset: usize,
  limit: usize,
}

#[derive(Debug, Error)]
enum ValidationError {
  #[error("unknown order field {0:?}")]
  UnknownOrderField(String),
  #[error("{name} must be a non-negative integer, got {value:?}")]
  NotAnInteger { name: &'static str, value: String },
  #[error("{name}={value} exceeds memory_depth={memory_depth}")]
  OutOfBounds {
    name: &'static str,
    value: usize,
    memory_depth: usize,
  },
}

fn validate(query: &PostsQuery, memory_depth: usize) -> Result<PostsParams, ValidationError> {
  let order = match query.order.as_deref() {
    None => SortOrder::Id,
    Some(raw) => {
      SortOrder::parse(raw).ok_or_else(|| ValidationError::UnknownOrderField(raw.to_string()))?
    }
  };
  let offset = parse_bound("offset", query.offset.as_deref(), 0, memory_depth)?;
  let limit = parse_bound("limit", query.limit.as_deref(), DEFAULT_LIMIT, memory_depth)?;

  Ok(PostsParams {
    order,
    offset,
    limit,
  })
}

fn parse_bound(
  name: &'static str,
  raw: Option<&str>,
  default: usize,
  memory_depth: usize,
) -> Result<usize, ValidationError> {
  let Some(raw) = raw else {
    return Ok(default);
  };
  // A negative value fails the usize parse, which is exactly the contract
  let value: usize = raw.parse().map_err(|_| ValidationError::NotAnInteger {
    name,
    value: raw.to_string(),
  })?;
  if value > memory_depth {
    return Err(ValidationError::OutOfBounds {
      name,
      value,
      memory_depth,
    });
  }
  Ok(value)
}

/// Stable ascending sort; items with equal keys keep their cache order.
fn sort_items(items: &mut [Item], order: SortOrder) {
  match order {
    SortOrder::Id => items.sort_by(|a, b| a.id.cmp(&b.id)),
    SortOrder::Title => items.sort_by(|a, b| a.title.cmp(&b.title)),
    SortOrder::Url => items.sort_by(|a, b| a.url.cmp(&b.url)),
    SortOrder::Now => items.sort_by(|a, b| a.now.cmp(&b.now)),
  }
}

/// `GET /posts?order=<field>&offset=<int>&limit=<int>`
async fn posts(State(state): State<Arc<AppState>>, Query(query): Query<PostsQuery>) -> Response {
  // Refreshing: every request triggers its own upstream fetch; a NoUpdate
  // outcome leaves the cache as-is so stale contents stay servable.
  let outcome = state.scraper.scrape().await;
  let refreshed = matches!(outcome, ScrapeOutcome::Batch(_));
  state.repo.replace(outcome).await;

  // Validating: the rejection detail stays in the logs, not in the response
  let params = match validate(&query, state.memory_depth) {
    Ok(params) => params,
    Err(e) => {
      tracing::debug!("rejected /posts query: {e}");
      return StatusCode::BAD_REQUEST.into_response();
    }
  };

  // Querying
  let Some(mut items) = state.repo.snapshot().await else {
    tracing::error!("cache read failed after validation passed");
    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
  };
  if items.is_empty() && !refreshed {
    tracing::error!("nothing to serve: cache is empty and the refresh failed");
    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
  }
  sort_items(&mut items, params.order);

  // Responding
  let start = params.offset.min(items.len());
  let end = params.offset.saturating_add(params.limit).min(items.len());
  Json(items[start..end].to_vec()).into_response()
}
