//! Terminal output for cchub.
//!
//! Colors are on only when every check allows them: no `--no-color`, no
//! `NO_COLOR`, `TERM` is not `dumb`, and `--color` is `always` or stdout is a
//! terminal. Table cells are colored through comfy-table so column widths stay
//! right.

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

use crate::drift::DriftKind;
use crate::manifest::ShareMode;
use crate::symlink::LinkInfo;

/// `--color` values
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

/// What a piece of output means; each tone has one color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Good,
    Notice,
    Bad,
    Accent,
    Muted,
}

impl Tone {
    fn ansi(self) -> AnsiColor {
        match self {
            Tone::Good => AnsiColor::Green,
            Tone::Notice => AnsiColor::Yellow,
            Tone::Bad => AnsiColor::Red,
            Tone::Accent => AnsiColor::Cyan,
            Tone::Muted => AnsiColor::BrightBlack,
        }
    }

    fn table_color(self) -> comfy_table::Color {
        match self {
            Tone::Good => comfy_table::Color::Green,
            Tone::Notice => comfy_table::Color::Yellow,
            Tone::Bad => comfy_table::Color::Red,
            Tone::Accent => comfy_table::Color::Cyan,
            Tone::Muted => comfy_table::Color::DarkGrey,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both color and a terminal
    pub spinner_enabled: bool,
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let color_enabled =
            color_wanted(mode, force_no_color, is_tty, |key| std::env::var(key).ok());

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled: color_enabled && is_tty,
        }
    }

    fn print_tagged(&self, tag: &str, tone: Tone, msg: &str) {
        let style = if self.color_enabled {
            Style::new().fg_color(Some(Color::Ansi(tone.ansi()))).bold()
        } else {
            Style::new()
        };
        if tone == Tone::Bad {
            eprintln!("{style}{tag}{style:#} {msg}");
        } else {
            println!("{style}{tag}{style:#} {msg}");
        }
    }

    pub fn ok(&self, msg: impl AsRef<str>) {
        self.print_tagged("OK", Tone::Good, msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        self.print_tagged("WARN", Tone::Notice, msg.as_ref());
    }

    /// Goes to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        self.print_tagged("ERROR", Tone::Bad, msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        self.print_tagged("INFO", Tone::Accent, msg.as_ref());
    }

    fn styled(&self, s: &str, style: Style) -> String {
        if self.color_enabled {
            format!("{style}{s}{style:#}")
        } else {
            s.to_string()
        }
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(s, Tone::Muted)
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.styled(s.as_ref(), Style::new().bold())
    }

    /// Inline text in the color of `tone`
    pub fn paint(&self, s: impl AsRef<str>, tone: Tone) -> String {
        self.styled(s.as_ref(), Style::new().fg_color(Some(Color::Ansi(tone.ansi()))))
    }

    fn mark(&self, fancy: &'static str, plain: &'static str) -> &'static str {
        if self.color_enabled { fancy } else { plain }
    }

    pub fn icon_ok(&self) -> &'static str {
        self.mark("✓", "[OK]")
    }

    pub fn icon_warn(&self) -> &'static str {
        self.mark("⚠", "[!]")
    }

    pub fn icon_err(&self) -> &'static str {
        self.mark("✗", "[X]")
    }

    pub fn icon_info(&self) -> &'static str {
        self.mark("•", "-")
    }

    /// Borderless table that wraps to the terminal width
    pub fn simple_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    pub fn header_cell(&self, content: impl Into<String>) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    pub fn tone_cell(&self, content: impl Into<String>, tone: Tone) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.fg(tone.table_color())
        } else {
            cell
        }
    }

    pub fn drift_kind_cell(&self, kind: DriftKind) -> Cell {
        let tone = match kind {
            DriftKind::Missing | DriftKind::Broken => Tone::Bad,
            DriftKind::Mismatched => Tone::Notice,
            DriftKind::Extra => Tone::Accent,
        };
        self.tone_cell(kind.to_string(), tone)
    }

    pub fn share_mode_cell(&self, mode: ShareMode) -> Cell {
        match mode {
            ShareMode::Shared => self.tone_cell(mode.to_string(), Tone::Accent),
            ShareMode::Isolated => self.cell(mode.to_string()),
        }
    }

    /// State of a well-known link such as `~/.claude`
    pub fn link_cell(&self, info: &LinkInfo) -> Cell {
        if !info.exists {
            return self.tone_cell("missing", Tone::Notice);
        }
        if !info.is_symlink {
            return self.tone_cell("not a symlink (unmanaged)", Tone::Notice);
        }
        match &info.target {
            None => self.tone_cell("unreadable symlink", Tone::Bad),
            Some(target) if info.broken => {
                self.tone_cell(format!("broken symlink → {}", target.display()), Tone::Bad)
            }
            Some(target) => self.cell(format!("symlink → {}", target.display())),
        }
    }

    /// Spinner for a slow step; hidden when spinners are off
    pub fn spinner(&self, message: impl Into<String>) -> ProgressBar {
        let pb = if self.spinner_enabled {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style("{spinner:.cyan} {msg}").tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.into());
        pb
    }

    /// Replace the spinner with a final status line
    pub fn spinner_done(&self, pb: &ProgressBar, success: bool, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.spinner_enabled {
            pb.finish_and_clear();
            if success { self.ok(msg) } else { self.err(msg) }
            return;
        }

        let icon = if success {
            self.paint("✓", Tone::Good)
        } else {
            self.paint("✗", Tone::Bad)
        };
        pb.set_style(spinner_style("{msg}"));
        pb.finish_with_message(format!("{icon} {msg}"));
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}

/// Whether to emit color; `env` looks up environment variables
fn color_wanted(
    mode: ColorMode,
    force_no_color: bool,
    is_tty: bool,
    env: impl Fn(&str) -> Option<String>,
) -> bool {
    if force_no_color || env("NO_COLOR").is_some() || env("TERM").as_deref() == Some("dumb") {
        return false;
    }
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

fn spinner_style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
