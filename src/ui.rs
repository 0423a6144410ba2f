use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::romaji::RomajiConverter;
use crate::session::ProgressSnapshot;
use crate::stats::SessionStatistics;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

/// Everything the practice screen draws, copied out of the live session.
#[derive(Debug, Clone)]
pub struct PracticeView {
    pub title: String,
    pub target_text: String,
    pub phonetic: Vec<char>,
    pub snapshot: ProgressSnapshot,
    /// Last wrong character, cleared by the next correct one.
    pub last_miss: Option<char>,
}

impl PracticeView {
    pub fn new(title: impl Into<String>, target_text: impl Into<String>, phonetic: &str) -> Self {
        let phonetic: Vec<char> = phonetic.chars().collect();
        let snapshot = ProgressSnapshot {
            cursor: 0,
            target_len: phonetic.len(),
            correct_count: 0,
            incorrect_count: 0,
            backspace_count: 0,
            accuracy_ratio: 1.0,
            progress_percent: 0.0,
            is_completed: phonetic.is_empty(),
        };
        Self {
            title: title.into(),
            target_text: target_text.into(),
            phonetic,
            snapshot,
            last_miss: None,
        }
    }

    /// Record the outcome of a keystroke. A rise in the incorrect count marks a miss.
    pub fn update(&mut self, snapshot: ProgressSnapshot, typed: Option<char>) {
        if snapshot.incorrect_count > self.snapshot.incorrect_count {
            self.last_miss = typed;
        } else if snapshot.cursor != self.snapshot.cursor {
            self.last_miss = None;
        }
        self.snapshot = snapshot;
    }

    pub fn typed(&self) -> String {
        self.phonetic[..self.snapshot.cursor.min(self.phonetic.len())]
            .iter()
            .collect()
    }

    /// Kana for the typed romaji, with any unconverted tail left as-is.
    pub fn kana_echo(&self, converter: &RomajiConverter) -> String {
        let (kana, rest) = converter.convert_greedy(&self.typed());
        kana + &rest
    }

    pub fn status_line(&self) -> String {
        format!(
            "{:.0}%   {:.1}% acc   {} miss   {} bs",
            self.snapshot.progress_percent,
            self.snapshot.accuracy_ratio * 100.0,
            self.snapshot.incorrect_count,
            self.snapshot.backspace_count,
        )
    }
}

impl Widget for &PracticeView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let green_bold = bold().fg(Color::Green);
        let underlined_dim_bold = dim_bold().add_modifier(Modifier::UNDERLINED);
        let red_underlined = bold().fg(Color::Red).add_modifier(Modifier::UNDERLINED);

        let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
        let phonetic_lines = (self.phonetic.len().div_ceil(max_width)).max(1) as u16;
        let body = 5 + phonetic_lines;
        let pad = area.height.saturating_sub(body) / 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(pad),
                    Constraint::Length(1),              // title
                    Constraint::Length(1),              // target text
                    Constraint::Length(phonetic_lines), // romaji
                    Constraint::Length(1),              // kana echo
                    Constraint::Length(1),              // status
                    Constraint::Min(0),
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        Paragraph::new(Span::styled(
            self.title.as_str(),
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

        Paragraph::new(Span::styled(self.target_text.as_str(), bold()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        let cursor = self.snapshot.cursor.min(self.phonetic.len());
        let mut spans = vec![Span::styled(self.typed(), green_bold)];
        if let Some(&expected) = self.phonetic.get(cursor) {
            let style = if self.last_miss.is_some() {
                red_underlined
            } else {
                underlined_dim_bold
            };
            spans.push(Span::styled(expected.to_string(), style));
            spans.push(Span::styled(
                self.phonetic[cursor + 1..].iter().collect::<String>(),
                dim_bold(),
            ));
        }
        Paragraph::new(Line::from(spans))
            .alignment(if phonetic_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        let echo = self.kana_echo(&RomajiConverter::new());
        Paragraph::new(Span::styled(echo, Style::default().fg(Color::Cyan)))
            .alignment(Alignment::Center)
            .render(chunks[4], buf);

        let mut status = vec![Span::styled(self.status_line(), dim_bold())];
        if let Some(miss) = self.last_miss {
            status.push(Span::styled(
                format!("   typed '{miss}'"),
                Style::default().fg(Color::Red),
            ));
        }
        Paragraph::new(Line::from(status))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);

        Paragraph::new(Span::styled(
            "(enter) finish / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[7], buf);
    }
}

/// Results of a finished session.
#[derive(Debug, Clone)]
pub struct ResultsView {
    pub target_text: String,
    pub statistics: SessionStatistics,
    pub intervals: Vec<u64>,
    pub persisted: Vec<String>,
}

/// Upper x and y bounds for the interval chart, with 10% headroom on y.
pub fn chart_bounds(intervals: &[u64]) -> (f64, f64) {
    let x = intervals.len().max(1) as f64;
    let y = intervals.iter().copied().max().unwrap_or(0).max(1);
    (x, (y + y.div_ceil(10)) as f64)
}

impl ResultsView {
    pub fn summary_line(&self) -> String {
        let s = &self.statistics;
        format!(
            "{:.1} wpm   {:.0} cpm   {:.1}% acc   {:.1}s",
            s.wpm_correct,
            s.cpm_correct,
            s.accuracy_percent,
            s.total_duration_ms as f64 / 1000.0
        )
    }

    pub fn detail_line(&self) -> String {
        let s = &self.statistics;
        format!(
            "{}   {} ok / {} miss / {} bs   interval {}-{} ms (avg {:.0}, sd {:.0})",
            s.status,
            s.correct_count,
            s.incorrect_count,
            s.backspace_count,
            s.min_interval_ms,
            s.max_interval_ms,
            s.avg_interval_ms,
            s.interval_std_dev_ms
        )
    }
}

impl Widget for &ResultsView {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints(
                [
                    Constraint::Length(1), // target
                    Constraint::Min(1),    // chart
                    Constraint::Length(1), // summary
                    Constraint::Length(1), // detail
                    Constraint::Length(self.persisted.len().min(2) as u16),
                    Constraint::Length(1), // padding
                    Constraint::Length(1), // legend
                ]
                .as_ref(),
            )
            .split(area);

        let title_width = self.target_text.width() as u16;
        let title_align = if title_width < chunks[0].width {
            Alignment::Center
        } else {
            Alignment::Left
        };
        Paragraph::new(Span::styled(self.target_text.as_str(), bold()))
            .alignment(title_align)
            .render(chunks[0], buf);

        let (max_x, max_y) = chart_bounds(&self.intervals);
        let points: Vec<(f64, f64)> = self
            .intervals
            .iter()
            .enumerate()
            .map(|(i, &ms)| ((i + 1) as f64, ms as f64))
            .collect();
        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("key")
                    .bounds([1.0, max_x])
                    .labels(vec![
                        Span::styled("1", bold()),
                        Span::styled(format!("{max_x:.0}"), bold()),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("ms")
                    .bounds([0.0, max_y])
                    .labels(vec![
                        Span::styled("0", bold()),
                        Span::styled(format!("{max_y:.0}"), bold()),
                    ]),
            )
            .render(chunks[1], buf);

        Paragraph::new(Span::styled(self.summary_line(), bold()))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            self.detail_line(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

        let files: Vec<Line> = self
            .persisted
            .iter()
            .map(|p| Line::from(Span::styled(p.as_str(), Style::default().fg(Color::Gray))))
            .collect();
        Paragraph::new(files).render(chunks[4], buf);

        Paragraph::new(Span::styled(
            "(r)etry / (n)ext / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[6], buf);
    }
}
