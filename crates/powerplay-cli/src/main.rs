//! powerplay CLI — terminal front end for the lesson browser.
//!
//! Commands:
//!   powerplay                       Interactive browser (same as `browse`)
//!   powerplay browse                Gate prompt, then the interactive browser
//!   powerplay subjects              Show configured subjects
//!   powerplay catalog <subject>     Print a subject's parsed catalog as JSON
//!   powerplay videos <subject> <paper> [chapter]
//!                                   Print the playlist for a selection
//!
//! Environment:
//!   POWERPLAY_ROOT     catalog root, directory or http(s) URL (default .)
//!   POWERPLAY_CONFIG   config JSON
//!   POWERPLAY_CACHE    offline cache directory (default ~/.powerplay/cache)
//!   POWERPLAY_SESSION  history session file (default ~/.powerplay/session.json)

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use powerplay_core::effects::{self, CachingFetcher, Fetcher, PlayerSurface};
use powerplay_core::{AppConfig, Error, History, MemoryHistory, Navigator, Page, PopOutcome};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = load_config();
    let fetcher = open_fetcher();

    match args.first().map(String::as_str) {
        None | Some("browse") => cmd_browse(config, fetcher),
        Some("subjects") => cmd_subjects(&config),
        Some("catalog") => cmd_catalog(fetcher.as_ref(), &args[1..]),
        Some("videos") => cmd_videos(fetcher.as_ref(), &args[1..]),
        Some("help") | Some("--help") | Some("-h") => print_usage(),
        Some(other) => {
            eprintln!("unknown command: {}", other);
            print_usage();
        }
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".powerplay")
}

fn load_config() -> AppConfig {
    match std::env::var("POWERPLAY_CONFIG") {
        Ok(path) => AppConfig::load_or_default(&PathBuf::from(path)),
        Err(_) => AppConfig::default(),
    }
}

fn open_fetcher() -> Arc<dyn Fetcher> {
    let root = std::env::var("POWERPLAY_ROOT").unwrap_or_else(|_| ".".into());
    let cache = std::env::var("POWERPLAY_CACHE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join("cache"));
    // One cache generation per release, so offline copies survive restarts.
    let version = env!("CARGO_PKG_VERSION");
    Arc::new(CachingFetcher::with_version(effects::fetcher_for_root(&root), cache, version))
}

fn session_path() -> PathBuf {
    std::env::var("POWERPLAY_SESSION")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join("session.json"))
}

/// Prints what an embedded player would show.
#[derive(Default)]
struct TerminalPlayer {
    fullscreen: AtomicBool,
}

impl PlayerSurface for TerminalPlayer {
    fn load(&self, embed_url: &str) {
        println!("  ▶ {}", embed_url);
    }

    fn stop(&self) {
        log::debug!("powerplay: player source cleared");
    }

    fn is_fullscreen(&self) -> bool {
        self.fullscreen.load(Ordering::SeqCst)
    }

    fn exit_fullscreen(&self) {
        self.fullscreen.store(false, Ordering::SeqCst);
        println!("  (left fullscreen)");
    }
}

// ---------------------------------------------------------------------------
// Interactive browser
// ---------------------------------------------------------------------------

fn cmd_browse(config: AppConfig, fetcher: Arc<dyn Fetcher>) {
    let session = session_path();
    let history = MemoryHistory::load(&session).unwrap_or_else(|e| {
        log::warn!("powerplay: discarding session {}: {}", session.display(), e);
        MemoryHistory::new()
    });
    let player = Arc::new(TerminalPlayer::default());
    let mut nav = Navigator::new(config, fetcher, history).with_player(player.clone());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    while !nav.is_unlocked() {
        prompt("passphrase: ");
        let Some(Ok(line)) = lines.next() else { return };
        if let Err(e) = nav.unlock(&line) {
            eprintln!("{}", e);
        }
    }
    render(&mut nav);

    loop {
        prompt("> ");
        let Some(Ok(line)) = lines.next() else { break };
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, rest)) = words.split_first() else { continue };
        let rest = rest.join(" ");

        let result = match command {
            "subjects" | "home" => nav.go_home(),
            "open" => nav.open_subject(&rest),
            "paper" => nav.open_paper(&label("Paper", &rest)),
            "chapter" => nav.open_chapter(&label("Chapter", &rest)),
            "back" => {
                let outcome = nav.back();
                if report_pop(&mut nav, outcome) {
                    break;
                }
                Ok(())
            }
            "forward" => {
                let outcome = nav.forward();
                if report_pop(&mut nav, outcome) {
                    break;
                }
                Ok(())
            }
            "list" => {
                print_playlist(&nav);
                continue;
            }
            "play" => {
                match rest.parse::<usize>() {
                    Ok(n) if n > 0 && nav.play(n - 1) => {}
                    _ => eprintln!("usage: play <1..{}>", nav.playlist().active_len()),
                }
                Ok(())
            }
            "next" => {
                nav.next();
                Ok(())
            }
            "prev" => {
                nav.previous();
                Ok(())
            }
            "search" => {
                nav.search(&rest);
                print_playlist(&nav);
                continue;
            }
            "shuffle" => {
                nav.shuffle();
                print_playlist(&nav);
                continue;
            }
            "clear" => {
                nav.clear_search();
                print_playlist(&nav);
                continue;
            }
            "fullscreen" => {
                if nav.page() == Some(Page::Player) {
                    player.fullscreen.store(true, Ordering::SeqCst);
                    println!("  (fullscreen, back to leave)");
                }
                continue;
            }
            "where" => {
                print_where(&nav);
                continue;
            }
            "help" => {
                print_commands();
                continue;
            }
            "quit" | "exit" => break,
            other => {
                eprintln!("unknown command: {} (try help)", other);
                continue;
            }
        };

        match result {
            // Already queued as a notice.
            Err(Error::CatalogNotFound { .. }) => {}
            Err(e) => eprintln!("{}", e),
            Ok(()) => {}
        }
        render(&mut nav);
    }

    if let Err(e) = nav.history().save(&session) {
        eprintln!("could not save session: {}", e);
    }
}

/// Returns true when the app should exit.
fn report_pop<H: History>(nav: &mut Navigator<H>, outcome: PopOutcome) -> bool {
    match outcome {
        PopOutcome::Exit => {
            print_notices(nav);
            true
        }
        PopOutcome::Ignored => {
            println!("  (nothing there)");
            false
        }
        _ => false,
    }
}

/// `3` → `Paper 3`; anything else is taken as the label itself.
fn label(kind: &str, arg: &str) -> String {
    match arg.parse::<u32>() {
        Ok(n) => format!("{} {}", kind, n),
        Err(_) => arg.to_string(),
    }
}

// ---------------------------------------------------------------------------
// One-shot commands
// ---------------------------------------------------------------------------

fn cmd_subjects(config: &AppConfig) {
    for subject in &config.subjects {
        if subject.chapters > 0 {
            println!("{}  {} papers × {} chapters", subject.name, subject.papers, subject.chapters);
        } else {
            println!("{}  {} papers", subject.name, subject.papers);
        }
    }
}

fn cmd_catalog(fetcher: &dyn Fetcher, args: &[String]) {
    if args.is_empty() {
        eprintln!("usage: powerplay catalog <subject>");
        return;
    }
    match effects::load_catalog(fetcher, &args.join(" ")) {
        Ok(catalog) => println!("{}", serde_json::to_string_pretty(&catalog).unwrap_or_default()),
        Err(e) => eprintln!("{}", e),
    }
}

fn cmd_videos(fetcher: &dyn Fetcher, args: &[String]) {
    if args.len() < 2 {
        eprintln!("usage: powerplay videos <subject> <paper> [chapter]");
        return;
    }
    let catalog = match effects::load_catalog(fetcher, &args[0]) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    let paper = label("Paper", &args[1]);
    let chapter = args.get(2).map(|c| label("Chapter", c));
    let videos = catalog.videos_for(&paper, chapter.as_deref());
    if videos.is_empty() {
        println!("no videos");
        return;
    }
    for (i, video) in videos.iter().enumerate() {
        println!("{:>3}. {}  {} — {}", i + 1, video.id, video.list_title(), video.list_subtitle());
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn prompt(text: &str) {
    print!("{}", text);
    std::io::stdout().flush().ok();
}

fn render<H: History>(nav: &mut Navigator<H>) {
    print_notices(nav);
    let view = nav.view();
    match view.page {
        Some(Page::Home) => println!("Subjects: {}", view.cards.join(", ")),
        Some(Page::Papers) | Some(Page::Chapters) => {
            println!("{}", view.heading);
            for (i, card) in view.cards.iter().enumerate() {
                println!("  {}. {}", i + 1, card);
            }
        }
        Some(Page::Player) => {
            println!("{} {}", view.now_playing.title, view.subtitle);
            println!("  {}", view.now_playing.meta);
            print_playlist(nav);
        }
        None => {}
    }
}

fn print_notices<H: History>(nav: &mut Navigator<H>) {
    for notice in nav.take_notices() {
        println!("! {}", notice.message());
    }
}

fn print_playlist<H: History>(nav: &Navigator<H>) {
    let playlist = nav.playlist_view();
    if !playlist.query.is_empty() {
        println!("  search: {}", playlist.query);
    }
    for (i, row) in playlist.rows.iter().enumerate() {
        let marker = if row.active { "▶" } else { " " };
        println!("  {} {:>3}. {} — {}", marker, i + 1, row.title, row.subtitle);
    }
    println!("  {} videos", playlist.total);
}

fn print_where<H: History>(nav: &Navigator<H>) {
    match nav.state() {
        Some(state) => println!("  {}", serde_json::to_string(state).unwrap_or_default()),
        None => println!("  (no state)"),
    }
}

fn print_commands() {
    println!("commands:");
    println!("  subjects | home        Subject list");
    println!("  open <subject>         Open a subject");
    println!("  paper <n|label>        Open a paper");
    println!("  chapter <n|label>      Open a chapter");
    println!("  back | forward         Walk the history");
    println!("  list                   Show the playlist");
    println!("  play <n>               Play row n");
    println!("  next | prev            Step through the playlist");
    println!("  search <query>         Filter the playlist");
    println!("  shuffle                Shuffle the playlist");
    println!("  clear                  Clear search and order");
    println!("  fullscreen             Enter fullscreen on the player");
    println!("  where                  Show the current history state");
    println!("  quit                   Save the session and exit");
}

fn print_usage() {
    println!("powerplay - lesson video browser");
    println!();
    println!("usage: powerplay [command] [args]");
    println!();
    println!("commands:");
    println!("  browse                          Interactive browser (default)");
    println!("  subjects                        Show configured subjects");
    println!("  catalog <subject>               Print a parsed catalog as JSON");
    println!("  videos <subject> <paper> [ch]   Print the playlist for a selection");
}
