//! Text search over the visible document text.
//!
//! Two entry points share one matcher: [`find_offsets`] returns byte offsets
//! into the whole content, [`find_in_lines`] returns `(line, column)` pairs over
//! the `\n`-split content and backs interactive find next/previous. Matches are
//! non-overlapping and reported in document order.

use memchr::memmem;
use regex::{Regex, RegexBuilder};
use tracing::error;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { case_sensitive: true, use_regex: false }
    }
}

/// Query being composed in search mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub pattern: String,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl SearchQuery {
    pub fn new(options: SearchOptions) -> Self {
        Self {
            pattern: String::new(),
            case_sensitive: options.case_sensitive,
            use_regex: options.use_regex,
        }
    }

    pub fn options(&self) -> SearchOptions {
        SearchOptions { case_sensitive: self.case_sensitive, use_regex: self.use_regex }
    }
}

/// One match in line coordinates. `column` and `len` are byte counts within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub line: usize,
    pub column: usize,
    pub len: usize,
}

enum Matcher {
    Literal(memmem::Finder<'static>),
    Regex(Regex),
}

impl Matcher {
    /// `Ok(None)` for an empty query.
    fn build(query: &str, options: SearchOptions) -> Result<Option<Self>, AppError> {
        if query.is_empty() {
            return Ok(None);
        }
        if !options.use_regex && options.case_sensitive {
            return Ok(Some(Self::Literal(memmem::Finder::new(query).into_owned())));
        }
        let pattern = if options.use_regex { query.to_string() } else { regex::escape(query) };
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(!options.case_sensitive)
            .build()
            .map_err(|source| AppError::InvalidPattern { pattern: query.to_string(), source })?;
        Ok(Some(Self::Regex(regex)))
    }

    fn ranges<'h>(&'h self, haystack: &'h str) -> Box<dyn Iterator<Item = (usize, usize)> + 'h> {
        match self {
            Self::Literal(finder) => {
                let len = finder.needle().len();
                Box::new(finder.find_iter(haystack.as_bytes()).map(move |start| (start, start + len)))
            }
            Self::Regex(regex) => Box::new(regex.find_iter(haystack).map(|m| (m.start(), m.end()))),
        }
    }
}

/// Start offsets of every match in `content`.
pub fn try_find_offsets(
    content: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<usize>, AppError> {
    let Some(matcher) = Matcher::build(query, options)? else {
        return Ok(Vec::new());
    };
    Ok(matcher.ranges(content).map(|(start, _)| start).collect())
}

/// Like [`try_find_offsets`], but an invalid pattern is logged and yields no matches.
pub fn find_offsets(content: &str, query: &str, options: SearchOptions) -> Vec<usize> {
    match try_find_offsets(content, query, options) {
        Ok(positions) => positions,
        Err(error) => {
            error!(%error, "search failed");
            Vec::new()
        }
    }
}

/// Matches per line of `content`, in document order. Empty matches are skipped.
pub fn find_in_lines(
    content: &str,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, AppError> {
    let Some(matcher) = Matcher::build(query, options)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    for (line_idx, line) in content.split('\n').enumerate() {
        out.extend(matcher.ranges(line).filter(|(start, end)| end > start).map(|(start, end)| {
            SearchMatch { line: line_idx, column: start, len: end - start }
        }));
    }
    Ok(out)
}

/// Match sequence with a cursor that wraps in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    matches: Vec<SearchMatch>,
    current: usize,
}

impl SearchResults {
    pub fn new(matches: Vec<SearchMatch>) -> Self {
        Self { matches, current: 0 }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&SearchMatch> {
        self.matches.get(self.current)
    }

    pub fn select_next(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.matches.len();
        self.current()
    }

    pub fn select_previous(&mut self) -> Option<&SearchMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let len = self.matches.len();
        self.current = (self.current + len - 1) % len;
        self.current()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Idle,
    Composing,
    Browsing,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The query was empty; nothing ran.
    Empty,
    Found(usize),
    NotFound,
    Failed(AppError),
}

/// Search mode state machine: `Idle -> Composing -> Browsing`.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub mode: SearchMode,
    pub query: SearchQuery,
    pub results: SearchResults,
    defaults: SearchOptions,
    max_query_len: usize,
}

impl SearchState {
    pub fn new(defaults: SearchOptions, max_query_len: usize) -> Self {
        Self {
            mode: SearchMode::Idle,
            query: SearchQuery::new(defaults),
            results: SearchResults::default(),
            defaults,
            max_query_len,
        }
    }

    /// Enter `Composing`, dropping any previous query and results.
    pub fn begin(&mut self) {
        self.query = SearchQuery::new(self.query.options());
        self.results = SearchResults::default();
        self.mode = SearchMode::Composing;
    }

    pub fn push_char(&mut self, ch: char) {
        if self.mode != SearchMode::Composing {
            return;
        }
        if self.query.pattern.len() + ch.len_utf8() <= self.max_query_len {
            self.query.pattern.push(ch);
        }
    }

    pub fn backspace(&mut self) {
        if self.mode == SearchMode::Composing {
            self.query.pattern.pop();
        }
    }

    pub fn toggle_regex(&mut self) {
        self.query.use_regex = !self.query.use_regex;
    }

    pub fn toggle_case(&mut self) {
        self.query.case_sensitive = !self.query.case_sensitive;
    }

    /// Back to `Idle`, clearing the query and results.
    pub fn cancel(&mut self) {
        self.query = SearchQuery::new(self.defaults);
        self.results = SearchResults::default();
        self.mode = SearchMode::Idle;
    }

    /// Run the composed query against `content`.
    pub fn submit(&mut self, content: &str) -> SubmitOutcome {
        if self.query.pattern.is_empty() {
            self.cancel();
            return SubmitOutcome::Empty;
        }
        self.mode = SearchMode::Browsing;
        match find_in_lines(content, &self.query.pattern, self.query.options()) {
            Ok(matches) => {
                self.results = SearchResults::new(matches);
                if self.results.is_empty() {
                    SubmitOutcome::NotFound
                } else {
                    SubmitOutcome::Found(self.results.len())
                }
            }
            Err(error) => {
                self.results = SearchResults::default();
                SubmitOutcome::Failed(error)
            }
        }
    }

    /// Positions are stale once the document changes.
    pub fn invalidate(&mut self) {
        self.results = SearchResults::default();
        if self.mode == SearchMode::Browsing {
            self.mode = SearchMode::Idle;
        }
    }

    /// Short label for the status line, e.g. `Search [regex, i]: foo`.
    pub fn prompt(&self) -> String {
        let mut flags = Vec::new();
        if self.query.use_regex {
            flags.push("regex");
        }
        if !self.query.case_sensitive {
            flags.push("i");
        }
        if flags.is_empty() {
            format!("Search: {}", self.query.pattern)
        } else {
            format!("Search [{}]: {}", flags.join(", "), self.query.pattern)
        }
    }
}
