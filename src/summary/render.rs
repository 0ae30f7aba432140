use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::Result;
use bytesize::ByteSize;
use indexmap::IndexMap;
use ratatui::{
    backend::{CrosstermBackend, TestBackend},
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal, TerminalOptions, Viewport,
};

use super::tally::Tally;
use crate::chunk::chunk_map;

const CATEGORY_COLUMNS: usize = 3;
const FALLBACK_WIDTH: u16 = 100;

/// Draws the summary below the current cursor line, or as plain text when
/// stdout is not a terminal.
pub fn print_summary(tally: &Tally, store: &Path) -> Result<()> {
    let footer = footer_text(tally, store);
    let height = summary_height(tally);

    if io::stdout().is_terminal() {
        let mut terminal = Terminal::with_options(
            CrosstermBackend::new(io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        )?;
        terminal.draw(|frame| {
            let area = frame.area();
            draw_summary(frame, tally, &footer);
            frame.set_cursor_position((0, area.bottom().saturating_sub(1)));
        })?;
        println!();
    } else {
        let width = crossterm::terminal::size()
            .map_or(FALLBACK_WIDTH, |(w, _)| w)
            .max(FALLBACK_WIDTH);
        for line in render_lines(tally, &footer, width)? {
            println!("{line}");
        }
    }

    Ok(())
}

/// Renders the summary into an off-screen buffer and returns it row by row.
pub fn render_lines(tally: &Tally, footer: &str, width: u16) -> Result<Vec<String>> {
    let height = summary_height(tally);
    let mut terminal = Terminal::new(TestBackend::new(width, height))?;
    terminal.draw(|frame| draw_summary(frame, tally, footer))?;

    let buffer = terminal.backend().buffer();
    let lines = (0..height)
        .map(|y| {
            let row: String = (0..width).map(|x| buffer[(x, y)].symbol()).collect();
            row.trim_end().to_string()
        })
        .collect();
    Ok(lines)
}

pub fn draw_summary(frame: &mut Frame, tally: &Tally, footer: &str) {
    let sources = tally.sources();
    let categories = tally.categories();

    let [sources_area, categories_area, footer_area] = Layout::vertical([
        Constraint::Length(sources_height(sources.len())),
        Constraint::Length(categories_height(categories.len())),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    if !sources.is_empty() {
        let total: usize = sources.values().sum();
        let block = panel(format!(" Sources (Total: {total}) "));
        let inner = block.inner(sources_area);
        frame.render_widget(block, sources_area);
        frame.render_widget(count_table(sources.iter()), inner);
    }

    if !categories.is_empty() {
        draw_categories(frame, &categories, categories_area);
    }

    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            footer.to_string(),
            Style::default().fg(Color::DarkGray),
        ))),
        footer_area,
    );
}

/// Categories are spread over side-by-side columns of equal height.
fn draw_categories(frame: &mut Frame, categories: &IndexMap<String, usize>, area: Rect) {
    let total: usize = categories.values().sum();
    let block = panel(format!(" Categories (Total: {total}) "));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let columns = Layout::horizontal(vec![Constraint::Fill(1); CATEGORY_COLUMNS])
        .spacing(1)
        .split(inner);

    let per_column = rows_per_column(categories.len());
    let chunks = chunk_map(categories, per_column).into_iter().flatten();
    for (chunk, column) in chunks.zip(columns.iter()) {
        frame.render_widget(count_table(chunk.into_iter()), *column);
    }
}

fn panel(title: String) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            title,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
}

fn count_table<'a, K, V>(rows: impl Iterator<Item = (K, V)>) -> Table<'a>
where
    K: AsRef<str>,
    V: std::borrow::Borrow<usize>,
{
    let rows: Vec<Row> = rows
        .map(|(name, count)| {
            Row::new(vec![
                Cell::from(name.as_ref().to_string()).style(Style::default().fg(Color::LightBlue)),
                Cell::from(count.borrow().to_string()).style(Style::default().fg(Color::Yellow)),
            ])
        })
        .collect();
    Table::new(rows, [Constraint::Fill(1), Constraint::Length(8)])
}

/// A third of the rows plus one, so the chunks never need a fourth column.
const fn rows_per_column(len: usize) -> usize {
    len / CATEGORY_COLUMNS + 1
}

fn sources_height(len: usize) -> u16 {
    if len == 0 {
        0
    } else {
        u16::try_from(len + 2).unwrap_or(u16::MAX)
    }
}

fn categories_height(len: usize) -> u16 {
    if len == 0 {
        0
    } else {
        u16::try_from(rows_per_column(len) + 2).unwrap_or(u16::MAX)
    }
}

fn summary_height(tally: &Tally) -> u16 {
    sources_height(tally.by_source.len())
        .saturating_add(categories_height(tally.categories().len()))
        .saturating_add(1)
}

fn footer_text(tally: &Tally, store: &Path) -> String {
    let size = std::fs::metadata(store).map_or(0, |m| m.len());
    let mut footer = if tally.written() == 0 {
        format!("No records written to {}", store.display())
    } else {
        format!(
            "Store: {} ({})  Time: {:.1}s",
            store.display(),
            ByteSize::b(size),
            tally.elapsed_secs()
        )
    };
    if tally.uncategorized() > 0 {
        footer.push_str(&format!("  Uncategorized: {}", tally.uncategorized()));
    }
    if tally.malformed_inputs > 0 {
        footer.push_str(&format!("  Malformed inputs: {}", tally.malformed_inputs));
    }
    footer
}
