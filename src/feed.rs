//! Feed renderer: deterministic RSS 2.0 projection of the episode history.
//!
//! Rendering is a pure function of the channel config and the episode list:
//! identical input produces byte-identical output, so a regenerated feed only
//! diffs when an episode actually changed. Retention truncates the rendered
//! view to the newest N episodes; the underlying store keeps full history.

use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::episodes::Episode;
use crate::error::FeedError;

/// Channel-level metadata rendered into the feed head.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub title: String,
    pub description: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub author: String,
    pub owner_email: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub explicit: bool,
    pub site_url: String,
    pub artwork_url: String,
}

fn default_language() -> String {
    "en-us".to_owned()
}

fn default_category() -> String {
    "Science".to_owned()
}

/// Render the feed document from episodes already sorted by `published_at`
/// descending. At most `retention` items are emitted.
pub fn render(channel: &ChannelConfig, episodes: &[Episode], retention: usize) -> String {
    let items: String = episodes
        .iter()
        .take(retention)
        .map(render_item)
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>{title}</title>
    <description>{description}</description>
    <language>{language}</language>
    <link>{link}</link>
    <itunes:author>{author}</itunes:author>
    <itunes:owner>
      <itunes:name>{author}</itunes:name>
      <itunes:email>{email}</itunes:email>
    </itunes:owner>
    <itunes:explicit>{explicit}</itunes:explicit>
    <itunes:category text="{category}"/>
    <itunes:image href="{artwork}"/>
{items}  </channel>
</rss>
"#,
        title = xml_escape(&channel.title),
        description = xml_escape(&channel.description),
        language = xml_escape(&channel.language),
        link = xml_escape(&channel.site_url),
        author = xml_escape(&channel.author),
        email = xml_escape(&channel.owner_email),
        explicit = if channel.explicit { "true" } else { "false" },
        category = xml_escape(&channel.category),
        artwork = xml_escape(&channel.artwork_url),
        items = items,
    )
}

fn render_item(episode: &Episode) -> String {
    format!(
        r#"    <item>
      <title>{title}</title>
      <description>{description}</description>
      <link>{link}</link>
      <enclosure url="{url}" length="{length}" type="audio/mpeg"/>
      <guid isPermaLink="false">{guid}</guid>
      <pubDate>{pubdate}</pubDate>
      <itunes:duration>{duration}</itunes:duration>
    </item>
"#,
        title = xml_escape(&episode.title),
        description = xml_escape(&episode.description),
        link = xml_escape(&episode.audio_url),
        url = xml_escape(&episode.audio_url),
        length = episode.size_bytes,
        guid = xml_escape(&episode.guid),
        pubdate = rfc822(&episode.published_at),
        duration = itunes_duration(episode.duration_seconds),
    )
}

/// Atomically replace the feed document on disk (write temp, then rename),
/// so a consumer never reads a partially written feed.
pub fn write_atomic(path: &Path, xml: &str) -> Result<(), FeedError> {
    let parent = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(xml.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    info!(path = %path.display(), bytes = xml.len(), "feed document written");
    Ok(())
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// RFC 822 timestamp as expected in `pubDate`, always in GMT.
fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn itunes_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
