//! Line-oriented reader for calendar feeds.
//!
//! Feeds from event-discovery sites fold long `DESCRIPTION` values across
//! physical lines without the leading-space marker the calendar format asks
//! for, so a continuation line looks just like any other line. The reader
//! therefore tracks its position explicitly and only leaves a description
//! when a line opens one of the fields in [`KNOWN_FIELDS`].

use crate::types::{RawRecord, Result, ScoutError};
use tracing::{debug, warn};

pub const BEGIN_EVENT: &str = "BEGIN:VEVENT";
pub const END_EVENT: &str = "END:VEVENT";
pub const BEGIN_CALENDAR: &str = "BEGIN:VCALENDAR";

/// Field whose value may continue over several lines.
pub const LONG_TEXT_FIELD: &str = "DESCRIPTION";

/// Fields that terminate a folded description when they start a line.
pub const KNOWN_FIELDS: &[&str] = &[
    "LOCATION",
    "DTSTART",
    "DTEND",
    "SUMMARY",
    "ORGANIZER",
    "URL",
    "UID",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerState {
    /// Between records; everything but a begin marker is ignored.
    Outside,
    /// Inside a record, expecting `KEY:value` lines.
    InRecord,
    /// Inside a record, accumulating a folded description.
    InContinuation,
}

/// What a single trimmed line means, independent of state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    Begin,
    End,
    Field { key: &'a str, value: &'a str, known: bool },
    Text,
}

fn classify_line(line: &str) -> LineKind<'_> {
    if line == BEGIN_EVENT {
        return LineKind::Begin;
    }
    if line == END_EVENT {
        return LineKind::End;
    }
    match line.split_once(':') {
        Some((name, value)) => {
            // Parameters (`DTSTART;TZID=...`) are not part of the key.
            let key = name.split(';').next().unwrap_or(name).trim();
            LineKind::Field {
                key,
                value: value.trim(),
                known: starts_known_field(line),
            }
        }
        None => LineKind::Text,
    }
}

/// True when the line opens one of [`KNOWN_FIELDS`], with or without parameters.
pub fn starts_known_field(line: &str) -> bool {
    KNOWN_FIELDS.iter().any(|field| {
        line.strip_prefix(field)
            .map(|rest| rest.starts_with(':') || rest.starts_with(';'))
            .unwrap_or(false)
    })
}

/// Incremental tokenizer. Feed it lines, then call [`Tokenizer::finish`].
#[derive(Debug)]
pub struct Tokenizer {
    state: TokenizerState,
    current: RawRecord,
    buffer: String,
    records: Vec<RawRecord>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: TokenizerState::Outside,
            current: RawRecord::new(),
            buffer: String::new(),
            records: Vec::new(),
        }
    }

    pub fn state(&self) -> TokenizerState {
        self.state
    }

    pub fn feed_line(&mut self, raw_line: &str) {
        let line = raw_line.trim();
        let kind = classify_line(line);

        match (self.state, kind) {
            (_, LineKind::Begin) => self.open_record(),

            (TokenizerState::Outside, _) => {}

            (TokenizerState::InRecord, LineKind::End) => self.close_record(),
            (TokenizerState::InRecord, LineKind::Field { key, value, .. }) => {
                self.start_field(key, value)
            }
            (TokenizerState::InRecord, LineKind::Text) => {
                debug!("Ignoring stray line inside record: {:?}", line);
            }

            (TokenizerState::InContinuation, LineKind::End) => {
                self.flush_description();
                self.close_record();
            }
            (TokenizerState::InContinuation, LineKind::Field { key, value, known: true }) => {
                self.flush_description();
                self.start_field(key, value);
            }
            (TokenizerState::InContinuation, _) => {
                self.buffer.push_str(line);
            }
        }
    }

    pub fn finish(self) -> Vec<RawRecord> {
        if self.state != TokenizerState::Outside {
            warn!(
                "Feed ended inside an unterminated record; dropping {} buffered fields",
                self.current.len()
            );
        }
        self.records
    }

    fn open_record(&mut self) {
        if self.state != TokenizerState::Outside {
            warn!("Record opened before the previous one was closed; discarding it");
        }
        self.current = RawRecord::new();
        self.buffer.clear();
        self.state = TokenizerState::InRecord;
    }

    fn close_record(&mut self) {
        let record = std::mem::take(&mut self.current);
        self.records.push(record);
        self.state = TokenizerState::Outside;
    }

    fn start_field(&mut self, key: &str, value: &str) {
        if key == LONG_TEXT_FIELD {
            self.buffer.clear();
            self.buffer.push_str(value);
            self.state = TokenizerState::InContinuation;
        } else {
            self.current.insert(key, value);
            self.state = TokenizerState::InRecord;
        }
    }

    fn flush_description(&mut self) {
        let description = std::mem::take(&mut self.buffer);
        self.current.insert(LONG_TEXT_FIELD, description.trim());
        self.state = TokenizerState::InRecord;
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Split raw calendar text into one [`RawRecord`] per `BEGIN:VEVENT`/`END:VEVENT` pair.
pub fn tokenize(raw_text: &str) -> Vec<RawRecord> {
    let mut tokenizer = Tokenizer::new();
    for line in raw_text.lines() {
        tokenizer.feed_line(line);
    }
    tokenizer.finish()
}

/// Like [`tokenize`], but rejects text that is not a calendar at all.
pub fn tokenize_feed(raw_text: &str) -> Result<Vec<RawRecord>> {
    let records = tokenize(raw_text);
    if records.is_empty() && !raw_text.lines().any(|l| l.trim() == BEGIN_CALENDAR) {
        return Err(ScoutError::FeedParse(format!(
            "no {} or {} marker found in {} bytes of feed text",
            BEGIN_CALENDAR,
            BEGIN_EVENT,
            raw_text.len()
        )));
    }
    debug!("Tokenized {} records", records.len());
    Ok(records)
}
