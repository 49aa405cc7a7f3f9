use std::{
    collections::BTreeMap,
    env, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    time::Duration,
};

use crate::catalog::{scan, CatalogEntry, ScanOptions, DEFAULT_WALK_TIMEOUT};
use crate::colors::{ColorTheme, ThemeOverrides};
use crate::document::{load_document, ColorizedDocument};
use crate::error::{catch_panic, AppError};
use crate::logging;
use crate::search::SearchOptions;
use crate::tui::{Action, PaneSlot, Tui, TuiConfig};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde::Deserialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = ".jsonscope.json";
const TUI_TICK_MS: u64 = 50;
const DEFAULT_MAX_QUERY_LEN: usize = 265;

pub type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
enum UiEvent {
    Catalog { request: u64, result: Result<Vec<CatalogEntry>, AppError> },
    Document {
        slot: PaneSlot,
        index: usize,
        request: u64,
        result: Result<ColorizedDocument, AppError>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "jsonscope", version, about = "Browse, colorize and search JSON files")]
struct Cli {
    /// Directory to scan for .json files.
    #[arg(long)]
    root: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory receiving info.log and error.log.
    #[arg(long)]
    log_dir: Option<PathBuf>,
    #[arg(long)]
    walk_timeout_ms: Option<u64>,
    /// Start searches in regex mode.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    regex: bool,
    #[arg(long, action = clap::ArgAction::SetTrue)]
    ignore_case: bool,
}

#[derive(Debug, Clone)]
struct Config {
    root: PathBuf,
    log_dir: PathBuf,
    walk_timeout: Duration,
    case_sensitive: bool,
    regex: bool,
    max_query_len: usize,
    theme: ColorTheme,
}

#[derive(Debug, Default, Clone)]
struct PartialConfig {
    root: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    walk_timeout_ms: Option<u64>,
    case_sensitive: Option<bool>,
    regex: Option<bool>,
    max_query_len: Option<usize>,
    theme: ThemeOverrides,
}

impl PartialConfig {
    fn merge(&mut self, other: PartialConfig) {
        if other.root.is_some() {
            self.root = other.root;
        }
        if other.log_dir.is_some() {
            self.log_dir = other.log_dir;
        }
        if other.walk_timeout_ms.is_some() {
            self.walk_timeout_ms = other.walk_timeout_ms;
        }
        if other.case_sensitive.is_some() {
            self.case_sensitive = other.case_sensitive;
        }
        if other.regex.is_some() {
            self.regex = other.regex;
        }
        if other.max_query_len.is_some() {
            self.max_query_len = other.max_query_len;
        }
        self.theme.merge(other.theme);
    }
}

impl Config {
    /// Relative paths resolve against `cwd`.
    fn from_partial(partial: PartialConfig, cwd: &Path) -> Result<Self, ConfigError> {
        let theme = partial.theme.resolve().map_err(ConfigError::InvalidTheme)?;
        Ok(Self {
            root: partial.root.map(|root| cwd.join(root)).unwrap_or_else(|| cwd.to_path_buf()),
            log_dir: partial.log_dir.map(|dir| cwd.join(dir)).unwrap_or_else(|| cwd.to_path_buf()),
            walk_timeout: partial
                .walk_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_WALK_TIMEOUT),
            case_sensitive: partial.case_sensitive.unwrap_or(true),
            regex: partial.regex.unwrap_or(false),
            max_query_len: partial.max_query_len.unwrap_or(DEFAULT_MAX_QUERY_LEN),
            theme,
        })
    }

    fn tui_config(&self) -> TuiConfig {
        TuiConfig {
            root: self.root.clone(),
            search: SearchOptions { case_sensitive: self.case_sensitive, use_regex: self.regex },
            max_query_len: self.max_query_len,
            theme: self.theme,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    root: Option<PathBuf>,
    #[serde(alias = "logDir")]
    log_dir: Option<PathBuf>,
    #[serde(alias = "walkTimeoutMs")]
    walk_timeout_ms: Option<u64>,
    #[serde(alias = "caseSensitive")]
    case_sensitive: Option<bool>,
    regex: Option<bool>,
    #[serde(alias = "maxQueryLen")]
    max_query_len: Option<usize>,
    theme: Option<ThemeOverrides>,
}

impl FileConfig {
    /// Relative paths in the file are taken relative to the file's directory.
    fn into_partial(self, base: &Path) -> PartialConfig {
        PartialConfig {
            root: self.root.map(|root| base.join(root)),
            log_dir: self.log_dir.map(|dir| base.join(dir)),
            walk_timeout_ms: self.walk_timeout_ms,
            case_sensitive: self.case_sensitive,
            regex: self.regex,
            max_query_len: self.max_query_len,
            theme: self.theme.unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
    #[error("config file not found: {path}")]
    MissingConfig { path: PathBuf },
    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
    #[error("invalid theme: {0}")]
    InvalidTheme(String),
}

fn cli_overrides(cli: &Cli) -> PartialConfig {
    PartialConfig {
        root: cli.root.clone(),
        log_dir: cli.log_dir.clone(),
        walk_timeout_ms: cli.walk_timeout_ms,
        case_sensitive: cli.ignore_case.then_some(false),
        regex: cli.regex.then_some(true),
        ..PartialConfig::default()
    }
}

fn env_overrides(env: &BTreeMap<String, String>) -> Result<PartialConfig, ConfigError> {
    let mut partial = PartialConfig::default();
    if let Some(root) = env.get("JSONSCOPE_ROOT") {
        partial.root = Some(PathBuf::from(root));
    }
    if let Some(dir) = env.get("JSONSCOPE_LOG_DIR") {
        partial.log_dir = Some(PathBuf::from(dir));
    }
    if let Some(value) = env.get("JSONSCOPE_WALK_TIMEOUT_MS") {
        partial.walk_timeout_ms = Some(parse_u64("JSONSCOPE_WALK_TIMEOUT_MS", value)?);
    }
    if let Some(value) = env.get("JSONSCOPE_CASE_SENSITIVE") {
        partial.case_sensitive = Some(parse_bool("JSONSCOPE_CASE_SENSITIVE", value)?);
    }
    if let Some(value) = env.get("JSONSCOPE_REGEX") {
        partial.regex = Some(parse_bool("JSONSCOPE_REGEX", value)?);
    }
    if let Some(value) = env.get("JSONSCOPE_MAX_QUERY_LEN") {
        partial.max_query_len = Some(parse_usize("JSONSCOPE_MAX_QUERY_LEN", value)?);
    }
    Ok(partial)
}

fn parse_usize(name: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnv { name: name.to_string(), value: value.to_string() })
}

fn parse_u64(name: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidEnv { name: name.to_string(), value: value.to_string() })
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv { name: name.to_string(), value: value.to_string() }),
    }
}

fn load_config_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    let parsed: FileConfig = serde_json::from_str(&contents)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(parsed.into_partial(base))
}

fn find_config_path(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}

fn resolve_config(
    cli: &Cli,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(Config, Option<PathBuf>), ConfigError> {
    let mut partial = PartialConfig::default();

    let config_path = if let Some(path) = &cli.config {
        let path = cwd.join(path);
        if !path.is_file() {
            return Err(ConfigError::MissingConfig { path });
        }
        Some(path)
    } else {
        find_config_path(cwd)
    };

    if let Some(path) = config_path.as_ref() {
        let file_partial = load_config_file(path)?;
        partial.merge(file_partial);
    }

    let env_partial = env_overrides(env)?;
    partial.merge(env_partial);

    let cli_partial = cli_overrides(cli);
    partial.merge(cli_partial);

    let config = Config::from_partial(partial, cwd)?;
    Ok((config, config_path))
}

/// Runs scans and loads on the blocking pool and reports back over `tx`.
struct BackgroundWork {
    handle: Handle,
    tx: mpsc::Sender<UiEvent>,
    root: PathBuf,
    walk_timeout: Duration,
    theme: ColorTheme,
    scan_cancel: Option<Arc<AtomicBool>>,
}

impl BackgroundWork {
    fn new(handle: Handle, tx: mpsc::Sender<UiEvent>, config: &Config) -> Self {
        Self {
            handle,
            tx,
            root: config.root.clone(),
            walk_timeout: config.walk_timeout,
            theme: config.theme,
            scan_cancel: None,
        }
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::None | Action::Quit => {}
            Action::Scan { request } => self.spawn_scan(request),
            Action::Load { slot, index, path, request } => {
                self.spawn_load(slot, index, path, request)
            }
        }
    }

    /// A new scan supersedes the one in flight.
    fn spawn_scan(&mut self, request: u64) {
        self.cancel_scan();
        let cancel = Arc::new(AtomicBool::new(false));
        self.scan_cancel = Some(cancel.clone());

        let options =
            ScanOptions { timeout: self.walk_timeout, cancel: Some(cancel), follow_links: false };
        let root = self.root.clone();
        let tx = self.tx.clone();
        info!(root = %root.display(), request, "scanning for JSON files");
        self.handle.spawn_blocking(move || {
            let result = catch_panic("scan", move || scan(&root, &options));
            if tx.send(UiEvent::Catalog { request, result }).is_err() {
                debug!(request, "ui closed before scan finished");
            }
        });
    }

    fn spawn_load(&self, slot: PaneSlot, index: usize, path: PathBuf, request: u64) {
        let theme = self.theme;
        let tx = self.tx.clone();
        debug!(path = %path.display(), ?slot, request, "loading document");
        self.handle.spawn_blocking(move || {
            let result = catch_panic("load", move || load_document(&path, &theme));
            if tx.send(UiEvent::Document { slot, index, request, result }).is_err() {
                debug!(request, "ui closed before load finished");
            }
        });
    }

    fn cancel_scan(&mut self) {
        if let Some(previous) = self.scan_cancel.take() {
            previous.store(true, Ordering::SeqCst);
        }
    }
}

fn apply_event(tui: &mut Tui, event: UiEvent) {
    match event {
        UiEvent::Catalog { request, result } => tui.apply_catalog(request, result),
        UiEvent::Document { slot, index, request, result } => {
            tui.apply_document(slot, index, request, result)
        }
    }
}

fn run_tui_loop(config: Config, handle: Handle) -> Result<(), DynError> {
    let _guard = TerminalGuard::enter()?;
    let stdout = io::stdout();
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let (tx, rx) = mpsc::channel::<UiEvent>();
    let mut work = BackgroundWork::new(handle, tx, &config);
    let mut tui = Tui::new(config.tui_config());
    work.dispatch(tui.request_scan());

    loop {
        while let Ok(event) = rx.try_recv() {
            apply_event(&mut tui, event);
        }

        terminal.draw(|frame| {
            tui.render(frame);
        })?;

        if event::poll(Duration::from_millis(TUI_TICK_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let action = tui.handle_key(key);
                    if action == Action::Quit {
                        break;
                    }
                    work.dispatch(action);
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    work.cancel_scan();
    terminal.show_cursor()?;
    Ok(())
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, DynError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

pub async fn run() -> Result<(), DynError> {
    let cli = Cli::parse();
    let cwd = env::current_dir()?;
    let env_map: BTreeMap<String, String> = env::vars().collect();
    let (config, config_path) = resolve_config(&cli, &cwd, &env_map)?;

    let _log_guards = logging::init(&config.log_dir)?;

    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded config file");
    } else {
        warn!("no {CONFIG_FILE} found, using defaults and env/cli overrides");
    }

    info!(
        root = %config.root.display(),
        log_dir = %config.log_dir.display(),
        walk_timeout_ms = config.walk_timeout.as_millis() as u64,
        case_sensitive = config.case_sensitive,
        regex = config.regex,
        max_query_len = config.max_query_len,
        "resolved config"
    );

    let handle = Handle::current();
    tokio::task::spawn_blocking(move || run_tui_loop(config, handle)).await??;

    info!("session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn bare_cli() -> Cli {
        Cli {
            root: None,
            config: None,
            log_dir: None,
            walk_timeout_ms: None,
            regex: false,
            ignore_case: false,
        }
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from([
            "jsonscope",
            "--root",
            "data",
            "--config",
            "config.json",
            "--log-dir",
            "logs",
            "--walk-timeout-ms",
            "500",
            "--regex",
            "--ignore-case",
        ]);

        assert_eq!(cli.root.as_deref(), Some(Path::new("data")));
        assert_eq!(cli.config.as_deref(), Some(Path::new("config.json")));
        assert_eq!(cli.log_dir.as_deref(), Some(Path::new("logs")));
        assert_eq!(cli.walk_timeout_ms, Some(500));
        assert!(cli.regex);
        assert!(cli.ignore_case);
    }

    #[test]
    fn defaults_without_any_overrides() {
        let temp = tempfile::tempdir().expect("tempdir");
        let (config, path) = resolve_config(&bare_cli(), temp.path(), &BTreeMap::new()).unwrap();
        assert!(path.is_none());
        assert_eq!(config.root, temp.path());
        assert_eq!(config.log_dir, temp.path());
        assert_eq!(config.walk_timeout, DEFAULT_WALK_TIMEOUT);
        assert!(config.case_sensitive);
        assert!(!config.regex);
        assert_eq!(config.max_query_len, DEFAULT_MAX_QUERY_LEN);
        assert_eq!(config.theme, ColorTheme::default());
    }

    #[test]
    fn resolves_config_in_order() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        let child = root.join("nested");
        fs::create_dir_all(&child).expect("create nested dir");

        let config_path = root.join(CONFIG_FILE);
        fs::write(
            &config_path,
            r#"{
  "root": "data",
  "log_dir": "logs",
  "walk_timeout_ms": 1000,
  "regex": true,
  "max_query_len": 32,
  "theme": { "key": "Purple", "null": "gray" }
}"#,
        )
        .expect("write config");

        let mut env_map = BTreeMap::new();
        env_map.insert("JSONSCOPE_WALK_TIMEOUT_MS".to_string(), "2000".to_string());
        env_map.insert("JSONSCOPE_REGEX".to_string(), "off".to_string());
        env_map.insert("JSONSCOPE_CASE_SENSITIVE".to_string(), "yes".to_string());

        let cli = Cli { log_dir: Some(PathBuf::from("cli-logs")), ignore_case: true, ..bare_cli() };

        let (config, resolved_path) = resolve_config(&cli, &child, &env_map).unwrap();

        assert_eq!(resolved_path.as_deref(), Some(config_path.as_path()));
        assert_eq!(config.root, root.join("data"));
        assert_eq!(config.log_dir, child.join("cli-logs"));
        assert_eq!(config.walk_timeout, Duration::from_millis(2000));
        assert!(!config.regex);
        assert!(!config.case_sensitive);
        assert_eq!(config.max_query_len, 32);
        assert_eq!(config.theme.key, "purple");
        assert_eq!(config.theme.null, "gray");
        assert_eq!(config.theme.string, ColorTheme::default().string);
    }

    #[test]
    fn unknown_theme_color_is_rejected() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(CONFIG_FILE), r#"{"theme": {"string": "chartreuse"}}"#)
            .expect("write config");
        let err = resolve_config(&bare_cli(), temp.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTheme(_)));
        assert!(err.to_string().contains("theme.string"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cli = Cli { config: Some(PathBuf::from("missing.json")), ..bare_cli() };
        let err = resolve_config(&cli, temp.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig { .. }));
    }

    #[test]
    fn parse_bool_accepts_and_rejects_values() {
        assert!(parse_bool("FLAG", "true").unwrap());
        assert!(parse_bool("FLAG", "1").unwrap());
        assert!(!parse_bool("FLAG", "0").unwrap());
        assert!(!parse_bool("FLAG", "off").unwrap());

        let err = parse_bool("FLAG", "maybe").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn invalid_env_number_is_rejected() {
        let mut env_map = BTreeMap::new();
        env_map.insert("JSONSCOPE_MAX_QUERY_LEN".to_string(), "lots".to_string());
        let err = env_overrides(&env_map).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn find_config_path_none_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(find_config_path(temp.path()).is_none());
    }

    #[test]
    fn load_config_file_invalid_json() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "{not valid json").expect("write");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn background_work_reports_scan_and_load() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("a.json"), r#"{"k": [1, "v"]}"#).expect("write");
        fs::write(temp.path().join("b.json"), "{broken").expect("write");

        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let (tx, rx) = mpsc::channel();
        let config = Config::from_partial(
            PartialConfig { root: Some(temp.path().to_path_buf()), ..PartialConfig::default() },
            temp.path(),
        )
        .unwrap();
        let mut work = BackgroundWork::new(runtime.handle().clone(), tx, &config);
        let mut tui = Tui::new(config.tui_config());
        let timeout = Duration::from_secs(10);

        work.dispatch(tui.request_scan());
        apply_event(&mut tui, rx.recv_timeout(timeout).expect("scan event"));
        assert_eq!(tui.state.entries.len(), 2);

        let open = crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Enter);
        work.dispatch(tui.handle_key(open));
        apply_event(&mut tui, rx.recv_timeout(timeout).expect("load event"));
        let document = tui.state.primary.document.as_ref().expect("document");
        assert!(document.marked_up.contains("[yellow]1[-]"));

        tui.state.focus = crate::tui::FocusPane::Files;
        tui.handle_key(crossterm::event::KeyEvent::from(crossterm::event::KeyCode::Down));
        work.dispatch(tui.handle_key(open));
        apply_event(&mut tui, rx.recv_timeout(timeout).expect("load event"));
        assert_eq!(tui.state.status.text, "Invalid JSON. Check error log for details.");
        assert_eq!(tui.state.primary.title(), "a.json");
    }
}
