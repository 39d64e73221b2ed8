use std::io::IsTerminal;

use anstyle::{AnsiColor, Effects, Style};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Status {
    Ok,
    Warn,
    Err,
    Info,
}

impl Status {
    fn badge(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Warn => "[WARN]",
            Self::Err => "[ERR]",
            Self::Info => "[..]",
        }
    }

    fn style(self) -> Style {
        let color = match self {
            Self::Ok => AnsiColor::BrightGreen,
            Self::Warn => AnsiColor::BrightYellow,
            Self::Err => AnsiColor::BrightRed,
            Self::Info => AnsiColor::BrightBlack,
        };
        Style::new().fg_color(Some(color.into())).effects(Effects::BOLD)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct StatusLine {
    pub(crate) status: Status,
    pub(crate) message: String,
}

impl StatusLine {
    pub(crate) fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct TerminalRenderer {
    style: OutputStyle,
}

impl TerminalRenderer {
    pub(crate) fn current(plain: bool) -> Self {
        Self {
            style: current_output_style(plain),
        }
    }

    pub(crate) fn print_section(self, title: &str) {
        if self.style == OutputStyle::Rich {
            println!("{}", colorize(section_style(), &format!("== {title} ==")));
        }
    }

    pub(crate) fn print_lines(self, lines: &[StatusLine]) {
        for line in lines {
            println!("{}", paint_status_line(self.style, line));
        }
    }
}

pub(crate) fn current_output_style(plain: bool) -> OutputStyle {
    resolve_output_style(plain, std::io::stdout().is_terminal())
}

pub(crate) fn resolve_output_style(plain: bool, stdout_is_tty: bool) -> OutputStyle {
    if !plain && stdout_is_tty {
        OutputStyle::Rich
    } else {
        OutputStyle::Plain
    }
}

/// The uncoloured form of a status line, as written to pipes and logs.
pub(crate) fn render_status_line(style: OutputStyle, line: &StatusLine) -> String {
    match style {
        OutputStyle::Plain => line.message.clone(),
        OutputStyle::Rich => format!("{} {}", line.status.badge(), line.message),
    }
}

/// Rich lines get their badge coloured.
pub(crate) fn paint_status_line(style: OutputStyle, line: &StatusLine) -> String {
    let rendered = render_status_line(style, line);
    if style == OutputStyle::Plain {
        return rendered;
    }
    let badge = line.status.badge();
    match rendered.strip_prefix(badge) {
        Some(rest) => format!("{}{rest}", colorize(line.status.style(), badge)),
        None => rendered,
    }
}

fn section_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightBlue.into()))
        .effects(Effects::BOLD)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}
