use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use log::{error, info};
use serde_json::Map;
use simplelog::{Config, LevelFilter, WriteLogger};

use lectio::annotation_store::LocalAnnotationStore;
use lectio::controller::{SelectionOutcome, SelectionState};
use lectio::highlights::{
    AnnotationStore, HighlightColor, HighlightFilter, HighlightId, NewHighlight,
};
use lectio::notes::{NoteFilter, NoteId};
use lectio::overlay::RunKind;
use lectio::panic_handler;
use lectio::reader::Reader;
use lectio::segments::{Segment, SegmentList, SegmentSource};
use lectio::session::Session;
use lectio::settings::{self, Settings};
use lectio::surface::TreeSurface;
use lectio::theme::{Base16Palette, ThemeId};
use lectio::tokenizer::{self, TokenKind};
use lectio::tutor::HttpTutorGateway;
use lectio::tutor_worker::TutorWorker;

#[derive(Parser)]
#[command(name = "lectio")]
#[command(about = "Read, highlight and translate classical texts", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Settings file (default: <config dir>/lectio/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Annotation directory (overrides settings and LECTIO_ANNOTATIONS_DIR)
    #[arg(long)]
    annotations_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a text with its highlights
    Render {
        /// Text file (JSON)
        text: PathBuf,

        /// Only this segment reference
        #[arg(short, long)]
        segment: Option<String>,

        /// Color theme
        #[arg(long)]
        theme: Option<String>,
    },

    /// Show the tokens of a segment and the word each click would report
    Tokens {
        text: PathBuf,
        reference: String,
    },

    /// Manage highlights
    Highlight {
        #[command(subcommand)]
        action: HighlightAction,
    },

    /// Manage personal notes on words
    Note {
        #[command(subcommand)]
        action: NoteAction,
    },

    /// Ask the tutor to translate part of a segment
    Ask {
        text: PathBuf,
        reference: String,

        /// First char of the selection
        start: usize,

        /// Char after the selection
        end: usize,

        /// Your own translation attempt
        #[arg(long)]
        draft: Option<String>,
    },
}

#[derive(Subcommand)]
enum HighlightAction {
    /// Highlight chars START..END of a segment
    Add {
        text: PathBuf,
        reference: String,
        start: usize,
        end: usize,

        /// yellow, green, blue or pink
        #[arg(short, long)]
        color: Option<String>,
    },

    /// Delete a highlight
    Delete {
        text: PathBuf,
        id: u64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List highlights
    List {
        text: PathBuf,

        #[arg(short, long)]
        segment: Option<String>,

        /// Exact selected text
        #[arg(short, long)]
        word: Option<String>,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(long, default_value = "100")]
        limit: usize,
    },

    /// Count highlights and show the most highlighted selections
    Summary { text: PathBuf },
}

#[derive(Subcommand)]
enum NoteAction {
    /// Attach a note to a word of a segment
    Add {
        text: PathBuf,
        reference: String,
        word: String,
        note: String,
    },

    /// Replace the text of a note
    Edit {
        text: PathBuf,
        id: u64,
        note: String,
    },

    /// Delete a note
    Delete { text: PathBuf, id: u64 },

    /// List notes, newest first
    List {
        text: PathBuf,

        #[arg(short, long)]
        segment: Option<String>,

        #[arg(short, long)]
        word: Option<String>,

        #[arg(long, default_value = "0")]
        skip: usize,

        #[arg(long, default_value = "100")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    panic_handler::initialize_panic_handler();
    let cli = Cli::parse();

    let level = LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Info);
    WriteLogger::init(level, Config::default(), File::create("lectio.log")?)?;

    info!("Starting lectio");

    let mut settings = settings::load_settings(cli.config.as_deref());
    settings.apply_env_overrides();

    let res = run(&cli, &settings);
    if let Err(err) = &res {
        error!("Command failed: {err:?}");
    }

    info!("Shutting down lectio");
    res
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    match &cli.command {
        Commands::Render {
            text,
            segment,
            theme,
        } => {
            let theme = match theme {
                Some(name) => ThemeId::from_name(name)
                    .with_context(|| format!("Unknown theme {name:?}"))?,
                None => settings.theme_id(),
            };
            let reader = open_reader(cli, settings, text)?;
            render(&reader, segment.as_deref(), theme.palette())
        }
        Commands::Tokens { text, reference } => {
            let segments = SegmentList::load_from_file(text)?;
            let segment = find_segment(&segments, reference)?;
            print_tokens(segment);
            Ok(())
        }
        Commands::Highlight { action } => run_highlight(cli, settings, action),
        Commands::Note { action } => run_note(cli, settings, action),
        Commands::Ask {
            text,
            reference,
            start,
            end,
            draft,
        } => ask(cli, settings, text, reference, *start, *end, draft.clone()),
    }
}

fn run_highlight(cli: &Cli, settings: &Settings, action: &HighlightAction) -> Result<()> {
    match action {
        HighlightAction::Add {
            text,
            reference,
            start,
            end,
            color,
        } => {
            let color = match color {
                Some(color) => HighlightColor::from_str(color)?,
                None => settings.default_highlight_color,
            };
            let segments = SegmentList::load_from_file(text)?;
            let segment = find_segment(&segments, reference)?;
            let new_highlight =
                NewHighlight::for_range(segments.text().id, segment, *start, *end, color)?;

            let mut store = open_store(cli, settings, &segments)?;
            let stored = store.create_highlight(new_highlight)?;
            println!(
                "Added highlight {} on {}: {}",
                stored.id,
                segment.reference,
                stored.selected_text.as_str().bold()
            );
            Ok(())
        }
        HighlightAction::Delete { text, id, yes } => {
            let mut reader = open_reader(cli, settings, text)?;
            let id = HighlightId(*id);
            if !reader.request_deletion(id) {
                bail!("No highlight {id} in this text");
            }
            if let Some(pending) = reader.pending_deletion() {
                println!("Highlight {id}: {}", pending.selected_text);
            }
            if !*yes && !confirm("Delete this highlight?")? {
                reader.cancel_deletion();
                println!("Kept highlight {id}");
                return Ok(());
            }
            reader.confirm_deletion()?;
            println!("Deleted highlight {id}");
            Ok(())
        }
        HighlightAction::List {
            text,
            segment,
            word,
            skip,
            limit,
        } => {
            let segments = SegmentList::load_from_file(text)?;
            let segment_id = match segment {
                Some(reference) => Some(find_segment(&segments, reference)?.id),
                None => None,
            };
            let store = open_store(cli, settings, &segments)?;
            let filter = HighlightFilter {
                text_id: Some(segments.text().id),
                segment_id,
                word: word.clone(),
                skip: *skip,
                limit: *limit,
            };
            for h in store.list_highlights(&filter)? {
                let reference = segments
                    .segment(h.segment_id)
                    .map(|s| s.reference.as_str())
                    .unwrap_or("?");
                println!(
                    "{:>5}  {:<8} {:>4}..{:<4} {:<6} {}",
                    h.id.0,
                    reference,
                    h.start_offset,
                    h.end_offset,
                    h.color,
                    h.selected_text
                );
            }
            Ok(())
        }
        HighlightAction::Summary { text } => {
            let segments = SegmentList::load_from_file(text)?;
            let store = open_store(cli, settings, &segments)?;
            let summary = store.summarize();
            println!(
                "{}: {} highlights",
                segments.text().title.as_str().bold(),
                summary.total
            );
            for (selection, count) in summary.most_highlighted {
                println!("  {count:>4}  {selection}");
            }
            Ok(())
        }
    }
}

fn run_note(cli: &Cli, settings: &Settings, action: &NoteAction) -> Result<()> {
    match action {
        NoteAction::Add {
            text,
            reference,
            word,
            note,
        } => {
            let mut reader = open_reader(cli, settings, text)?;
            let segment_id = find_segment(reader.segments(), reference)?.id;
            let stored = reader.add_note(segment_id, word, note)?;
            println!(
                "Added note {} on {} {}",
                stored.id,
                reference,
                stored.word.as_str().bold()
            );
            Ok(())
        }
        NoteAction::Edit { text, id, note } => {
            let mut reader = open_reader(cli, settings, text)?;
            let stored = reader.update_note(NoteId(*id), note)?;
            println!("Updated note {}: {}", stored.id, stored.note);
            Ok(())
        }
        NoteAction::Delete { text, id } => {
            let mut reader = open_reader(cli, settings, text)?;
            reader.delete_note(NoteId(*id))?;
            println!("Deleted note {id}");
            Ok(())
        }
        NoteAction::List {
            text,
            segment,
            word,
            skip,
            limit,
        } => {
            let segments = SegmentList::load_from_file(text)?;
            let segment_id = match segment {
                Some(reference) => Some(find_segment(&segments, reference)?.id),
                None => None,
            };
            let store = open_store(cli, settings, &segments)?;
            let filter = NoteFilter {
                text_id: Some(segments.text().id),
                segment_id,
                word: word.clone(),
                skip: *skip,
                limit: *limit,
            };
            for n in store.list_notes(&filter)? {
                let reference = segments
                    .segment(n.segment_id)
                    .map(|s| s.reference.as_str())
                    .unwrap_or("?");
                let edited = if n.updated_at.is_some() { " (edited)" } else { "" };
                println!(
                    "{:>5}  {:<8} {}: {}{}",
                    n.id.0,
                    reference,
                    n.word.as_str().bold(),
                    n.note,
                    edited.dark_grey()
                );
            }
            Ok(())
        }
    }
}

fn ask(
    cli: &Cli,
    settings: &Settings,
    text: &Path,
    reference: &str,
    start: usize,
    end: usize,
    draft: Option<String>,
) -> Result<()> {
    let mut reader = open_reader(cli, settings, text)?;
    let segment_id = find_segment(reader.segments(), reference)?.id;

    let mut surface = TreeSurface::new(reader.render());
    if !surface.select_content(segment_id, start, end) {
        bail!("{start}..{end} is outside segment {reference}");
    }
    match reader.on_selection(&surface) {
        SelectionOutcome::Selected => {}
        SelectionOutcome::Disabled => bail!("Tutor suggestions are disabled"),
        SelectionOutcome::Ignored(e) => bail!("Cannot use this selection: {e}"),
    }

    let Some(dispatch) = reader.ask_tutor(Map::new(), draft) else {
        bail!("No selection to ask about");
    };
    println!("{} {}", reference.dark_grey(), dispatch.request.selection.as_str().bold());

    let timeout = Duration::from_secs(settings.request_timeout_secs);
    let session = Arc::new(Session::from_settings(settings));
    let gateway = HttpTutorGateway::new(session, timeout)?;
    let worker = TutorWorker::spawn(Box::new(gateway));
    worker.dispatch(dispatch)?;

    let response = worker
        .recv_timeout(timeout + Duration::from_secs(5))
        .context("Timed out waiting for the tutor")?;
    reader.apply_tutor_response(response);

    match reader.controller().state() {
        SelectionState::Resolved { suggestion, .. } => {
            println!("{}", suggestion.translation.as_str().bold());
            if let Some(gloss) = &suggestion.literal_gloss {
                println!("literal: {gloss}");
            }
            println!("{}", suggestion.rationale);
            println!("confidence: {:.0}%", suggestion.confidence * 100.0);
            Ok(())
        }
        SelectionState::Failed { detail, .. } => bail!("{detail}"),
        other => bail!("Unexpected tutor state {}", other.name()),
    }
}

fn open_store(
    cli: &Cli,
    settings: &Settings,
    segments: &SegmentList,
) -> Result<LocalAnnotationStore> {
    let dir = match &cli.annotations_dir {
        Some(dir) => dir.clone(),
        None => LocalAnnotationStore::resolve_dir(settings.annotations_dir.as_deref())?,
    };
    LocalAnnotationStore::new(segments.text(), &dir)
}

fn open_reader(cli: &Cli, settings: &Settings, text: &Path) -> Result<Reader> {
    let segments = SegmentList::load_from_file(text)?;
    let store = open_store(cli, settings, &segments)?;
    Reader::open(
        segments,
        Box::new(store),
        settings.tutor_enabled,
        settings.default_language.clone(),
    )
}

fn find_segment<'a>(segments: &'a SegmentList, reference: &str) -> Result<&'a Segment> {
    segments
        .segments()
        .iter()
        .find(|s| s.reference == reference)
        .with_context(|| format!("No segment {reference:?} in {}", segments.text().urn))
}

fn render(reader: &Reader, only: Option<&str>, palette: &Base16Palette) -> Result<()> {
    let text = reader.text();
    println!("{}", text.title.as_str().bold().with(palette.plain_foreground()));
    if !text.author.is_empty() {
        println!("{}", text.author.as_str().with(palette.reference_foreground()));
    }
    println!();

    let mut printed = false;
    for segment in reader.segments().segments() {
        if only.is_some_and(|r| r != segment.reference) {
            continue;
        }
        printed = true;

        let mut line = format!("{:>8}  ", segment.reference)
            .with(palette.reference_foreground())
            .to_string();
        for run in reader.runs(segment.id) {
            let styled = match run.kind {
                RunKind::Plain => run.text.as_str().with(palette.plain_foreground()),
                RunKind::Highlighted { color, .. } => {
                    let style = palette.highlight_style(color);
                    run.text
                        .as_str()
                        .with(style.foreground)
                        .on(style.background)
                }
            };
            line.push_str(&styled.to_string());
        }
        println!("{line}");
    }

    if let Some(reference) = only {
        if !printed {
            bail!("No segment {reference:?} in {}", text.urn);
        }
    }
    Ok(())
}

fn print_tokens(segment: &Segment) {
    for token in tokenizer::tokenize(&segment.content) {
        match token.kind {
            TokenKind::Whitespace => {
                println!("{:>4}  {:<10} {:?}", token.offset, "space", token.text)
            }
            TokenKind::Word => {
                let clicked = tokenizer::clicked_word(token.text).unwrap_or("-");
                println!("{:>4}  {:<10} {:<16} {clicked}", token.offset, "word", token.text)
            }
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
