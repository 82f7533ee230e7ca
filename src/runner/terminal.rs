//! Interactive prompts feeding the runner.

use dialoguer::Input;
use tracing::warn;

use crate::exclusion::ExclusionSet;
use crate::record::{BatchMetadata, RawFactInput};
use crate::runner::QUIT_SENTINEL;

/// Prompts the operator for one fact per iteration.
///
/// Yields `None` when the terminal goes away. A `quit` on the fact prompt is
/// passed through to the runner, which ends the session. An excluded source
/// URL ends the entry right after the URL prompt.
#[derive(Debug)]
pub struct TerminalEntries<'a> {
    exclusions: &'a ExclusionSet,
    done: bool,
}

impl<'a> TerminalEntries<'a> {
    pub fn new(exclusions: &'a ExclusionSet) -> Self {
        Self {
            exclusions,
            done: false,
        }
    }

    fn prompt_entry(&self) -> dialoguer::Result<RawFactInput> {
        let url = ask("Source URL (or leave blank)")?;
        if let Some(entry) = excluded_entry(self.exclusions, &url) {
            return Ok(entry);
        }

        let fact = ask(&format!("Fact text (or '{QUIT_SENTINEL}' to exit)"))?;
        if fact.trim().eq_ignore_ascii_case(QUIT_SENTINEL) {
            return Ok(RawFactInput {
                fact,
                ..Default::default()
            });
        }

        Ok(RawFactInput {
            url,
            fact,
            title: ask("Title (optional)")?,
            tags: ask("Tags for this fact (comma-separated, optional)")?,
            source_type: ask("Source type (default: manual)")?,
            confidence: ask("Confidence 0-1 (default: 1.0)")?,
            related_entities: ask("Related entities (comma-separated, optional)")?,
        })
    }
}

impl Iterator for TerminalEntries<'_> {
    type Item = RawFactInput;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.prompt_entry() {
            Ok(entry) => {
                if entry.fact.trim().eq_ignore_ascii_case(QUIT_SENTINEL) {
                    self.done = true;
                }
                Some(entry)
            }
            Err(e) => {
                warn!(error = %e, "Terminal input closed");
                self.done = true;
                None
            }
        }
    }
}

/// Ask once for the tags and related entities shared by a scrape batch.
pub fn prompt_batch_metadata() -> dialoguer::Result<BatchMetadata> {
    let tags = ask("Tags for this batch (comma-separated, optional)")?;
    let related = ask("Related entities for this batch (comma-separated, optional)")?;
    Ok(BatchMetadata::from_raw(&tags, &related))
}

/// A URL-only entry when `url` points at an excluded host; the runner skips
/// it without asking for the rest.
fn excluded_entry(exclusions: &ExclusionSet, url: &str) -> Option<RawFactInput> {
    exclusions.is_url_excluded(url).then(|| RawFactInput {
        url: url.to_string(),
        ..Default::default()
    })
}

fn ask(prompt: &str) -> dialoguer::Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
}
