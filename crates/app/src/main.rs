use std::fmt;
use std::path::{Path, PathBuf};

use quiz_core::model::{BookId, SectionId, SessionSummary, UserId};
use services::{AppServices, ChatReply, ChatService, Clock};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
const DEFAULT_FILES_DIR: &str = "./files";
const DEFAULT_HISTORY_LIMIT: u32 = 10;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingFlag { flag: &'static str },
    UnknownArg(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app chat     --book <id> --section <id>... [--user <id>] [--seed <n>]");
    eprintln!("  app history  --book <id> --section <id>... [--user <id>] [--limit <n>] [--offset <n>]");
    eprintln!("  app sections --book <id>");
    eprintln!("  app upload   --title <title> --file <path> [--kind <type>] [--user <id>]");
    eprintln!("  app books    [--user <id>]");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>   (default {DEFAULT_DB_URL})");
    eprintln!("  --files <dir>       (default {DEFAULT_FILES_DIR})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_FILES_DIR, QUIZ_USER_ID");
    eprintln!("  QUIZ_AI_API_KEY, QUIZ_AI_BASE_URL, QUIZ_AI_MODEL, QUIZ_AI_TIMEOUT_SECS");
    eprintln!("  RUST_LOG (default app=info,services=info,storage=warn)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Chat,
    History,
    Sections,
    Upload,
    Books,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "chat" => Some(Self::Chat),
            "history" => Some(Self::History),
            "sections" => Some(Self::Sections),
            "upload" => Some(Self::Upload),
            "books" => Some(Self::Books),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    files_dir: PathBuf,
    user_id: Option<UserId>,
    book_id: Option<BookId>,
    section_ids: Vec<SectionId>,
    limit: u32,
    offset: u32,
    seed: Option<u64>,
    title: Option<String>,
    kind: String,
    file: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("QUIZ_DB_URL")
                .ok()
                .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url),
            files_dir: std::env::var("QUIZ_FILES_DIR")
                .map_or_else(|_| PathBuf::from(DEFAULT_FILES_DIR), PathBuf::from),
            user_id: std::env::var("QUIZ_USER_ID")
                .ok()
                .and_then(|value| value.parse().ok()),
            book_id: None,
            section_ids: Vec::new(),
            limit: DEFAULT_HISTORY_LIMIT,
            offset: 0,
            seed: None,
            title: None,
            kind: "pdf".into(),
            file: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--files" => parsed.files_dir = PathBuf::from(require_value(args, "--files")?),
                "--user" => parsed.user_id = Some(parse_id("--user", require_value(args, "--user")?)?),
                "--book" => parsed.book_id = Some(parse_id("--book", require_value(args, "--book")?)?),
                "--section" => parsed
                    .section_ids
                    .push(parse_id("--section", require_value(args, "--section")?)?),
                "--limit" => parsed.limit = parse_number("--limit", require_value(args, "--limit")?)?,
                "--offset" => {
                    parsed.offset = parse_number("--offset", require_value(args, "--offset")?)?;
                }
                "--seed" => parsed.seed = Some(parse_number("--seed", require_value(args, "--seed")?)?),
                "--title" => parsed.title = Some(require_value(args, "--title")?),
                "--kind" => parsed.kind = require_value(args, "--kind")?,
                "--file" => parsed.file = Some(PathBuf::from(require_value(args, "--file")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn user(&self) -> Result<UserId, ArgsError> {
        self.user_id.ok_or(ArgsError::MissingFlag { flag: "--user" })
    }

    fn book(&self) -> Result<BookId, ArgsError> {
        self.book_id.ok_or(ArgsError::MissingFlag { flag: "--book" })
    }

    fn sections(&self) -> Result<Vec<SectionId>, ArgsError> {
        if self.section_ids.is_empty() {
            return Err(ArgsError::MissingFlag { flag: "--section" });
        }
        Ok(self.section_ids.clone())
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("app=info,services=info,storage=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn print_summary(summary: &SessionSummary) {
    println!(
        "{}  score {:.1}  answered {}/{}  [{}]",
        summary.created_at.format("%Y-%m-%d %H:%M"),
        summary.overall_score,
        summary.number_of_answered_questions,
        summary.number_of_questions,
        summary.section_titles.join(", ")
    );
}

async fn run_chat(mut chat: ChatService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(seed) = args.seed {
        chat = chat.with_shuffle_seed(seed);
    }
    chat.start(args.user()?, args.book()?, args.sections()?)
        .await?;

    match chat.next_question() {
        Some(question) => println!("{}", question.text()),
        None => println!("No questions in the selected sections. Type 'next' to finish."),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") {
            break;
        }
        match chat.submit(line).await {
            Ok(ChatReply::Complete) => {
                println!("All questions answered.");
                break;
            }
            Ok(ChatReply::Idle) => println!("No question is active. Type 'next' or 'quit'."),
            Ok(reply) => {
                if let Some(text) = reply.text() {
                    println!("{text}");
                }
            }
            Err(err) => eprintln!("error: {err}. Please try again."),
        }
        if let Some(progress) = chat.progress() {
            tracing::debug!(answered = progress.answered, total = progress.total, "progress");
        }
    }

    chat.finish().await?;
    if let Some(summary) = chat.summarize().await? {
        print_summary(&summary);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, &args.files_dir, Clock::system()).await?;

    match cmd {
        Command::Chat => run_chat(services.chat_service(), &args).await,
        Command::History => {
            let summaries = services
                .chat_service()
                .list_summaries(
                    args.user()?,
                    args.book()?,
                    args.sections()?,
                    args.limit,
                    args.offset,
                )
                .await?;
            if summaries.is_empty() {
                println!("No sessions yet.");
            }
            for summary in &summaries {
                print_summary(summary);
            }
            Ok(())
        }
        Command::Sections => {
            let sections = services
                .book_service()
                .book_sections(args.book()?, false)
                .await?;
            for section in &sections {
                println!(
                    "{}  {}  ({} questions)",
                    section.id(),
                    section.title(),
                    section.questions().len()
                );
            }
            Ok(())
        }
        Command::Upload => {
            let title = args
                .title
                .clone()
                .ok_or(ArgsError::MissingFlag { flag: "--title" })?;
            let file = args
                .file
                .clone()
                .ok_or(ArgsError::MissingFlag { flag: "--file" })?;
            let bytes = tokio::fs::read(&file).await?;
            let book = services
                .book_service()
                .upload_book(bytes, &title, &args.kind, args.user()?)
                .await?;
            println!("{}  {}  ({} pages)", book.id(), book.title(), book.metadata().pages);
            Ok(())
        }
        Command::Books => {
            for book in services.book_service().list_books(args.user()?).await? {
                println!(
                    "{}  {}  ({} pages, {:.2} MB)",
                    book.id(),
                    book.title(),
                    book.metadata().pages,
                    book.metadata().size_mb
                );
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|s| (*s).to_string());
        Args::parse(&mut iter)
    }

    #[test]
    fn repeated_sections_are_collected() {
        let a = SectionId::new_v4();
        let b = SectionId::new_v4();
        let args = parse(&[
            "--section",
            &a.to_string(),
            "--section",
            &b.to_string(),
            "--seed",
            "7",
        ])
        .unwrap();
        assert_eq!(args.section_ids, vec![a, b]);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.sections().unwrap(), vec![a, b]);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            parse(&["--book", "not-a-uuid"]),
            Err(ArgsError::InvalidId { flag: "--book", .. })
        ));
        assert!(matches!(
            parse(&["--limit", "many"]),
            Err(ArgsError::InvalidNumber { flag: "--limit", .. })
        ));
        assert!(matches!(
            parse(&["--seed"]),
            Err(ArgsError::MissingValue { flag: "--seed" })
        ));
        assert!(matches!(parse(&["--bogus"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn sections_flag_is_required_for_chat() {
        let args = parse(&[]).unwrap();
        assert!(matches!(
            args.sections(),
            Err(ArgsError::MissingFlag { flag: "--section" })
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }
}
