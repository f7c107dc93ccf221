// src/main.rs

use std::fmt::Write as FmtWrite;
use std::io::{stdout, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{
        self, disable_raw_mode, enable_raw_mode, BeginSynchronizedUpdate, Clear, ClearType,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use tracing::info;

use lightscope::audio::{CaptureStream, InputDevice};
use lightscope::render::terminal::render_frame;
use lightscope::render::ColouredScope;
use lightscope::{telemetry, CaptureProcessor, FileView, ScopeConfig, ScopeEditor, SharedCapture};

const DEFAULT_CONFIG_PATH: &str = "lightscope.json";

struct Args {
    config: PathBuf,
    file: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut config = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut file = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| anyhow!("--config needs a path"))?;
            }
            _ => file = Some(PathBuf::from(arg)),
        }
    }
    Ok(Args { config, file })
}

enum Mode {
    Live {
        editor: ScopeEditor,
        _stream: CaptureStream,
    },
    File(FileView),
}

impl Mode {
    fn live(config: &ScopeConfig) -> Result<Self> {
        let input = InputDevice::default_input()?;
        let sample_rate = input.sample_rate();
        let shared = SharedCapture::new(config.capture_capacity(sample_rate));
        let processor = CaptureProcessor::new(
            shared.clone(),
            sample_rate as f32,
            config.low_crossover_hz,
            config.high_crossover_hz,
        );
        let stream = CaptureStream::start(input, processor)?;
        Ok(Mode::Live {
            editor: ScopeEditor::new(shared, config),
            _stream: stream,
        })
    }

    fn file(config: &ScopeConfig, path: &Path) -> Result<Self> {
        let mut view = FileView::new(config);
        view.open(path)?;
        Ok(Mode::File(view))
    }
}

struct Screen {
    draw_buffer: String,
}

impl Screen {
    fn draw(&mut self, mode: &mut Mode) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let width = cols as f32;
        let scope_rows = rows.saturating_sub(1) as usize;

        self.draw_buffer.clear();
        let status = match mode {
            Mode::Live { editor, .. } => {
                let half = scope_rows / 2;
                let report = editor.tick(width, half as f32, 1.0);
                self.push_scope(editor.left(), half, 0);
                self.push_scope(editor.right(), half, half as u16);
                format!(
                    "live | {} frames | max wait {:?}{} | [Q] Quit",
                    report.frames_written,
                    report.max_wait,
                    if report.long_wait { " (late)" } else { "" }
                )
            }
            Mode::File(view) => {
                view.tick(width, scope_rows as f32, 1.0);
                self.push_scope(view.scope(), scope_rows, 0);
                let source = view.source();
                let rate = source.sample_rate().unwrap_or(1).max(1) as f64;
                format!(
                    "file | {:.2}s / {:.2}s | [←/→] Seek | [Q] Quit",
                    source.offset() as f64 / rate,
                    source.file_length().unwrap_or(0) as f64 / rate
                )
            }
        };

        let _ = write!(self.draw_buffer, "{}", MoveTo(0, rows.saturating_sub(1)));
        let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        let _ = write!(self.draw_buffer, "{status}");

        let mut stdout = stdout();
        execute!(stdout, BeginSynchronizedUpdate)?;
        stdout.write_all(self.draw_buffer.as_bytes())?;
        execute!(stdout, EndSynchronizedUpdate)?;
        stdout.flush()?;
        Ok(())
    }

    fn push_scope(&mut self, scope: &ColouredScope, rows: usize, top: u16) {
        if rows == 0 {
            return;
        }
        for (i, line) in render_frame(scope.frame(), rows, &scope.style).iter().enumerate() {
            let _ = write!(self.draw_buffer, "{}{}", MoveTo(0, top + i as u16), line);
            let _ = write!(self.draw_buffer, "{}", Clear(ClearType::UntilNewLine));
        }
    }
}

fn run(mut mode: Mode, tick: Duration) -> Result<()> {
    let mut screen = Screen {
        draw_buffer: String::new(),
    };
    screen.draw(&mut mode)?;

    loop {
        if event::poll(tick)? {
            if let Event::Key(ev) = event::read()? {
                if ev.kind != KeyEventKind::Press {
                    continue;
                }
                if ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
                match (ev.code, &mut mode) {
                    (KeyCode::Char('q') | KeyCode::Esc, _) => break,
                    (KeyCode::Right, Mode::File(view)) => view.seek(1),
                    (KeyCode::Left, Mode::File(view)) => view.seek(-1),
                    _ => {}
                }
            }
        }
        screen.draw(&mut mode)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    telemetry::init();
    let args = parse_args()?;
    let config = ScopeConfig::load_or_default(&args.config);

    let mode = match &args.file {
        Some(path) => Mode::file(&config, path)?,
        None => Mode::live(&config)?,
    };
    let tick = Duration::from_secs_f64(1.0 / config.tick_hz.max(1) as f64);

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, Hide)?;

    let result = run(mode, tick);

    execute!(stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    info!("exiting");
    result
}
