//! Maps raw provider records into the catalog's uniform `VideoSummary`
//! shape.
//!
//! Detail lookups for a page are fanned out concurrently; an item whose
//! lookup fails is dropped from the batch rather than failing the page, so a
//! page of N raw results may yield fewer than N summaries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::provider::{SearchItem, SearchProvider, ThumbnailSet, VideoItem};

const PLACEHOLDER_AVATAR_BASE: &str = "https://placehold.co/40";

/// Uploader identity attached to every summary. The search snippet carries
/// no avatar, so one is synthesized from the display-name initial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Uploader {
    pub id: String,
    pub display_name: String,
    pub avatar: String,
}

/// The application's uniform video record. Immutable once committed to the
/// catalog state; view counts stay raw here, display abbreviation happens at
/// presentation time via [`format_view_count`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub duration: String,
    pub views: u64,
    pub uploader: Uploader,
    pub created_at: Option<DateTime<Utc>>,
}

/// Converts the provider's interval notation (`PT1H5M30S`) to a clock
/// display. The hour field is omitted when zero; minutes are only zero-padded
/// under an hour field; seconds always pad to two digits. Anything that does
/// not match the grammar yields `"0:00"`.
pub fn format_duration(raw: &str) -> String {
    match parse_interval(raw) {
        Some((hours, minutes, seconds)) if hours > 0 => {
            format!("{hours}:{minutes:02}:{seconds:02}")
        }
        Some((_, minutes, seconds)) => format!("{minutes}:{seconds:02}"),
        None => "0:00".to_owned(),
    }
}

fn parse_interval(raw: &str) -> Option<(u64, u64, u64)> {
    let rest = raw.strip_prefix("PT")?;
    if rest.is_empty() {
        return None;
    }

    let (mut hours, mut minutes, mut seconds) = (0u64, 0u64, 0u64);
    let mut digits = String::new();
    for ch in rest.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();
        match ch {
            'H' => hours = value,
            'M' => minutes = value,
            'S' => seconds = value,
            _ => return None,
        }
    }

    // Trailing digits without a unit letter make the whole string invalid.
    if !digits.is_empty() {
        return None;
    }

    Some((hours, minutes, seconds))
}

/// Display-time view abbreviation: `1.5K` / `2.5M` with one decimal place,
/// thresholds inclusive at exactly 1,000 and 1,000,000.
pub fn format_view_count(views: u64) -> String {
    if views >= 1_000_000 {
        format!("{:.1}M", views as f64 / 1_000_000.0)
    } else if views >= 1_000 {
        format!("{:.1}K", views as f64 / 1_000.0)
    } else {
        views.to_string()
    }
}

fn best_thumbnail(thumbnails: &ThumbnailSet) -> String {
    thumbnails
        .high
        .as_ref()
        .or(thumbnails.default.as_ref())
        .map(|thumb| thumb.url.clone())
        .unwrap_or_default()
}

fn synthesized_avatar(display_name: &str) -> String {
    let initial = display_name.chars().next().unwrap_or('?');
    format!("{PLACEHOLDER_AVATAR_BASE}?text={initial}")
}

/// Combines one search result with its detail record. Returns `None` when
/// the search item carries no video id.
pub fn summarize(item: &SearchItem, details: &VideoItem) -> Option<VideoSummary> {
    let id = item.id.video_id.clone()?;
    let snippet = &item.snippet;

    Some(VideoSummary {
        id,
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        thumbnail: best_thumbnail(&snippet.thumbnails),
        duration: duration_of(details),
        views: views_of(details),
        uploader: Uploader {
            id: snippet.channel_id.clone(),
            display_name: snippet.channel_title.clone(),
            avatar: synthesized_avatar(&snippet.channel_title),
        },
        created_at: snippet.published_at,
    })
}

/// Builds a summary straight from a detail record, for single-video lookups
/// where no search snippet exists.
pub fn summarize_detail(details: &VideoItem) -> VideoSummary {
    let snippet = &details.snippet;

    VideoSummary {
        id: details.id.clone(),
        title: snippet.title.clone(),
        description: snippet.description.clone(),
        thumbnail: best_thumbnail(&snippet.thumbnails),
        duration: duration_of(details),
        views: views_of(details),
        uploader: Uploader {
            id: snippet.channel_id.clone(),
            display_name: snippet.channel_title.clone(),
            avatar: synthesized_avatar(&snippet.channel_title),
        },
        created_at: snippet.published_at,
    }
}

fn duration_of(details: &VideoItem) -> String {
    details
        .content_details
        .as_ref()
        .and_then(|content| content.duration.as_deref())
        .map(format_duration)
        .unwrap_or_else(|| "0:00".to_owned())
}

fn views_of(details: &VideoItem) -> u64 {
    details
        .statistics
        .as_ref()
        .and_then(|stats| stats.view_count.as_deref())
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

/// Issues the per-item detail lookups for a page concurrently and collects
/// the survivors in their original order. Lookup failures drop the item.
pub async fn normalize_batch(
    provider: Arc<dyn SearchProvider>,
    items: Vec<SearchItem>,
) -> Vec<VideoSummary> {
    let mut lookups = Vec::with_capacity(items.len());
    for item in items {
        let provider = provider.clone();
        lookups.push(task::spawn_blocking(move || {
            let Some(video_id) = item.id.video_id.clone() else {
                return None;
            };
            match provider.video_details(&video_id) {
                Ok(details) => summarize(&item, &details),
                Err(err) => {
                    tracing::debug!(%video_id, error = %err, "dropping result with failed detail lookup");
                    None
                }
            }
        }));
    }

    let mut summaries = Vec::with_capacity(lookups.len());
    for lookup in lookups {
        match lookup.await {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => {}
            Err(err) => tracing::warn!(error = %err, "detail lookup task failed"),
        }
    }

    summaries
}
