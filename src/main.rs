use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin, Read},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use typinger::{
    app::{Flow, PracticeApp, Screen},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    keymap::{self, codec, hid, store::KeymapStore, Keymap, Preset},
    persist::{CsvLogger, LogIndex},
    registry::SessionRegistry,
    runtime::{classify_key, CrosstermEventSource, PracticeEvent, Runner},
    scenario::{Pick, ScenarioStore, Sentence},
};

const TICK_RATE_MS: u64 = 100;

/// romaji typing practice with per-keystroke judgment and session logs
#[derive(Parser, Debug)]
#[clap(
    version,
    about,
    long_about = "A typing trainer for Japanese romaji input. Practise scenario sentences in the terminal, get accuracy and speed statistics, and keep CSV logs of every session. Also converts keyboard keymaps between JSON and their compact binary form."
)]
pub struct Cli {
    /// config file to use instead of the default location
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    /// directory with scenario json files
    #[clap(long, global = true)]
    scenario_dir: Option<PathBuf>,

    /// directory csv session logs are written to
    #[clap(long, global = true)]
    output_dir: Option<PathBuf>,

    /// directory with saved keymaps
    #[clap(long, global = true)]
    keymap_dir: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// practise a scenario (default)
    Practice(PracticeArgs),
    /// inspect, convert and store keymaps
    Keymap {
        #[clap(subcommand)]
        action: KeymapCommand,
    },
    /// browse and prune csv session logs
    Logs {
        #[clap(subcommand)]
        action: LogsCommand,
    },
    /// list available scenarios
    Scenarios,
}

#[derive(Args, Debug, Default)]
struct PracticeArgs {
    /// scenario file name, e.g. beginner.json
    #[clap(short, long)]
    scenario: Option<String>,

    /// start at a random sentence
    #[clap(short, long, conflicts_with = "index")]
    random: bool,

    /// start at this sentence (0-based)
    #[clap(short, long)]
    index: Option<usize>,

    /// practise this text instead of a scenario
    #[clap(long, requires = "phonetic")]
    text: Option<String>,

    /// romaji to type for --text
    #[clap(long, requires = "text")]
    phonetic: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum KeymapFormat {
    Json,
    Hex,
    Base64,
}

#[derive(Subcommand, Debug)]
enum KeymapCommand {
    /// build a preset layout
    Preset {
        #[clap(value_enum)]
        preset: Preset,
        /// number of keys, padded or truncated
        #[clap(short, long)]
        keys: Option<usize>,
        #[clap(short, long, value_enum, default_value_t = KeymapFormat::Json)]
        format: KeymapFormat,
        /// also save into the keymap directory under this name
        #[clap(long)]
        save: Option<String>,
    },
    /// convert between json, hex and base64 (input: text, @file or - for stdin)
    Convert {
        input: String,
        #[clap(long, value_enum)]
        from: KeymapFormat,
        #[clap(long, value_enum)]
        to: KeymapFormat,
    },
    /// show the header of a binary keymap
    Info {
        input: String,
        #[clap(long, value_enum, default_value_t = KeymapFormat::Hex)]
        from: KeymapFormat,
    },
    /// check a json keymap for out-of-range codes and modifiers
    Validate { input: String },
    /// search the HID key name table
    Keys {
        query: Option<String>,
        #[clap(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// list saved keymaps
    List,
    /// save a keymap into the keymap directory (input: text, @file or - for stdin)
    Save {
        name: String,
        input: String,
        #[clap(long, value_enum, default_value_t = KeymapFormat::Json)]
        from: KeymapFormat,
    },
    /// print a saved keymap
    Show {
        name: String,
        #[clap(short, long, value_enum, default_value_t = KeymapFormat::Json)]
        format: KeymapFormat,
    },
    /// delete a saved keymap
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
enum LogsCommand {
    /// list csv logs, newest first
    List,
    /// print one csv log
    Show { name: String },
    /// delete one csv log
    Delete { name: String },
    /// file counts, total size and the newest session summary, as json
    Summary,
    /// every session summary keyed by its file stamp, as json
    Export,
}

fn load_config(cli: &Cli) -> Config {
    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = store.load().with_env_overrides();
    if let Some(dir) = &cli.scenario_dir {
        config.scenario_dir = dir.clone();
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &cli.keymap_dir {
        config.keymap_dir = dir.clone();
    }
    config
}

/// `RUST_LOG` wins over the configured level. The practice screen owns the
/// terminal, so it logs to a file instead of stderr.
fn init_logging(level: &str, to_file: bool) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if to_file {
        let path = AppDirs::log_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli);
    let is_practice = matches!(cli.command, None | Some(Command::Practice(_)));
    init_logging(&config.log_level, is_practice)?;

    match cli.command {
        None => run_practice(&config, PracticeArgs::default()),
        Some(Command::Practice(args)) => run_practice(&config, args),
        Some(Command::Keymap { action }) => run_keymap(&config, action),
        Some(Command::Logs { action }) => run_logs(&config, action),
        Some(Command::Scenarios) => run_scenarios(&config),
    }
}

fn run_practice(config: &Config, args: PracticeArgs) -> Result<(), Box<dyn Error>> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let registry = Arc::new(SessionRegistry::new(
        Arc::new(ScenarioStore::new(&config.scenario_dir)),
        Arc::new(CsvLogger::new(&config.output_dir)),
    ));

    let mut app = match (args.text, args.phonetic) {
        (Some(text), Some(phonetic)) => {
            PracticeApp::inline(registry, Sentence::new(text, phonetic))?
        }
        _ => {
            let name = args.scenario.unwrap_or_else(|| config.default_scenario.clone());
            let pick = match (args.random, args.index) {
                (true, _) => Pick::Random,
                (false, Some(i)) => Pick::Index(i),
                (false, None) => Pick::First,
            };
            PracticeApp::from_file(registry, &name, pick)?
        }
    };

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut PracticeApp,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        Duration::from_millis(TICK_RATE_MS),
    );

    terminal.draw(|f| ui(app, f))?;
    loop {
        match runner.step() {
            PracticeEvent::Tick => continue,
            PracticeEvent::Resize => {}
            PracticeEvent::Key(key) => {
                if app.on_key(classify_key(key), Instant::now())? == Flow::Quit {
                    break;
                }
            }
        }
        terminal.draw(|f| ui(app, f))?;
    }

    Ok(())
}

fn ui(app: &PracticeApp, f: &mut Frame) {
    match app.screen() {
        Screen::Practice(view) => f.render_widget(view, f.area()),
        Screen::Results(view) => f.render_widget(view, f.area()),
    }
}

/// Text argument, `@path` for a file or `-` for stdin.
fn read_input(input: &str) -> io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else if let Some(path) = input.strip_prefix('@') {
        fs::read_to_string(path)
    } else {
        Ok(input.to_string())
    }
}

fn parse_keymap(text: &str, format: KeymapFormat) -> Result<Keymap, Box<dyn Error>> {
    Ok(match format {
        KeymapFormat::Json => Keymap::from_json(text)?,
        KeymapFormat::Hex => codec::keymap_from_hex(text)?,
        KeymapFormat::Base64 => codec::keymap_from_base64(text)?,
    })
}

fn render_keymap(keymap: &Keymap, format: KeymapFormat) -> Result<String, Box<dyn Error>> {
    Ok(match format {
        KeymapFormat::Json => keymap.to_json()?,
        KeymapFormat::Hex => codec::keymap_to_hex(keymap)?,
        KeymapFormat::Base64 => codec::keymap_to_base64(keymap)?,
    })
}

fn run_keymap(config: &Config, action: KeymapCommand) -> Result<(), Box<dyn Error>> {
    let store = KeymapStore::new(&config.keymap_dir);

    match action {
        KeymapCommand::Preset {
            preset,
            keys,
            format,
            save,
        } => {
            let keymap = preset.build(keys.unwrap_or_else(|| preset.default_key_count()));
            if let Some(name) = save {
                let path = store.save(&name, &keymap)?;
                eprintln!("saved {}", path.display());
            }
            println!("{}", render_keymap(&keymap, format)?);
        }
        KeymapCommand::Convert { input, from, to } => {
            let keymap = parse_keymap(&read_input(&input)?, from)?;
            println!("{}", render_keymap(&keymap, to)?);
        }
        KeymapCommand::Info { input, from } => {
            let text = read_input(&input)?;
            let bytes = match from {
                KeymapFormat::Hex => codec::from_hex(&text)?,
                KeymapFormat::Base64 => codec::from_base64(&text)?,
                KeymapFormat::Json => codec::encode(&Keymap::from_json(&text)?)?,
            };
            let info = keymap::binary_info(&bytes)
                .ok_or_else(|| format!("{} bytes is shorter than the keymap header", bytes.len()))?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        KeymapCommand::Validate { input } => {
            let keymap = Keymap::from_json(&read_input(&input)?)?;
            let issues = keymap::validate(&keymap);
            if !issues.is_empty() {
                for issue in &issues {
                    println!("{issue}");
                }
                return Err(format!("{} problem(s) found", issues.len()).into());
            }
            println!("ok: {} keys", keymap.len());
        }
        KeymapCommand::Keys { query, limit } => {
            let hits = match query {
                Some(q) => hid::search(&q, limit),
                None => hid::HID_KEYS.iter().take(limit).copied().collect(),
            };
            for (name, code) in hits {
                println!("{name}\t{code}");
            }
        }
        KeymapCommand::List => {
            for name in store.list()? {
                println!("{name}");
            }
        }
        KeymapCommand::Save { name, input, from } => {
            let keymap = parse_keymap(&read_input(&input)?, from)?;
            let path = store.save(&name, &keymap)?;
            println!("{}", path.display());
        }
        KeymapCommand::Show { name, format } => {
            println!("{}", render_keymap(&store.load(&name)?, format)?);
        }
        KeymapCommand::Delete { name } => {
            if !store.delete(&name)? {
                return Err(format!("no saved keymap named {name}").into());
            }
        }
    }
    Ok(())
}

fn run_logs(config: &Config, action: LogsCommand) -> Result<(), Box<dyn Error>> {
    let index = LogIndex::new(&config.output_dir);

    match action {
        LogsCommand::List => {
            for file in index.list()? {
                println!(
                    "{}\t{}\t{}\t{}",
                    file.name,
                    file.kind,
                    file.size,
                    file.modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        LogsCommand::Show { name } => {
            let contents = index.read(&name)?;
            println!("{}", contents.headers.join(","));
            for row in contents.rows {
                println!("{}", row.join(","));
            }
        }
        LogsCommand::Delete { name } => index.delete(&name)?,
        LogsCommand::Summary => println!("{}", serde_json::to_string_pretty(&index.summary()?)?),
        LogsCommand::Export => println!("{}", serde_json::to_string_pretty(&index.export()?)?),
    }
    Ok(())
}

fn run_scenarios(config: &Config) -> Result<(), Box<dyn Error>> {
    let store = ScenarioStore::new(&config.scenario_dir);
    for name in store.list()? {
        match store.info(&name) {
            Ok(info) => println!(
                "{}\t{}\t{}{}",
                info.name,
                info.title,
                info.sentence_count,
                if info.builtin { "\tbuilt-in" } else { "" }
            ),
            Err(e) => println!("{name}\t(unreadable: {e})"),
        }
    }
    Ok(())
}
