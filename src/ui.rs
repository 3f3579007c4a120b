//! Rendering: sidebar, topbar, table, status line and the centered modals.
//! Pure over the [`UiData`] snapshot, no state of its own.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
};

use crate::domain::CmdMode;
use crate::model::{Modus, UiData};
use crate::notify::ToastLevel;

const SIDEBAR_WIDTH: u16 = 22;
const TOPBAR_HEIGHT: u16 = 1;
const STATUSLINE_HEIGHT: u16 = 1;

pub fn draw(data: &UiData, frame: &mut Frame) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(TOPBAR_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(outer[1]);

    draw_topbar(data, frame, outer[0]);
    draw_sidebar(data, frame, middle[0]);
    draw_table(data, frame, middle[1]);
    draw_statusline(data, frame, outer[2]);

    match data.modus {
        Modus::Form => draw_form(data, frame),
        // Keep the modal visible while one of its fields is being edited.
        Modus::CmdInput if matches!(data.cmd_mode, Some(CmdMode::FormField)) => {
            draw_form(data, frame)
        }
        Modus::Confirm => draw_confirm(data, frame),
        Modus::Popup => draw_popup(data, frame),
        _ => {}
    }
}

fn draw_topbar(data: &UiData, frame: &mut Frame, area: Rect) {
    let left = format!(" vetdesk · {}", data.api_target);
    let right = format!("{} ({}) ", data.user, data.role);
    let pad = (area.width as usize).saturating_sub(left.len() + right.len());
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::styled(right, Style::default().add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(line).on_dark_gray(), area);
}

fn draw_sidebar(data: &UiData, frame: &mut Frame, area: Rect) {
    let mut lines = Vec::new();
    for (section, entries) in &data.sidebar {
        lines.push(Line::from(Span::styled(
            section.to_uppercase(),
            Style::default().fg(Color::DarkGray),
        )));
        for (title, active) in entries {
            let style = if *active {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let marker = if *active { "▸ " } else { "  " };
            lines.push(Line::from(Span::styled(format!("{marker}{title}"), style)));
        }
        lines.push(Line::from(""));
    }
    let block = Block::bordered().border_set(border::PLAIN);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_table(data: &UiData, frame: &mut Frame, area: Rect) {
    let header = Row::new(
        std::iter::once(Cell::from(" "))
            .chain(data.columns.iter().map(|c| Cell::from(c.as_str())))
            .collect::<Vec<Cell>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));

    let rows: Vec<Row> = data
        .rows
        .iter()
        .enumerate()
        .map(|(ridx, row)| {
            let marker = if row.selected { "✓" } else { " " };
            let cells = std::iter::once(Cell::from(marker)).chain(
                row.cells.iter().enumerate().map(|(cidx, value)| {
                    let mut style = Style::default();
                    if ridx == data.cursor_row && cidx == data.cursor_column {
                        style = style.bg(Color::Blue).fg(Color::White);
                    }
                    Cell::from(value.as_str()).style(style)
                }),
            );
            let mut row_style = Style::default();
            if ridx == data.cursor_row {
                row_style = row_style.add_modifier(Modifier::REVERSED);
            }
            Row::new(cells.collect::<Vec<Cell>>()).style(row_style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(1)];
    widths.extend(
        data.columns
            .iter()
            .map(|_| Constraint::Ratio(1, data.columns.len().max(1) as u32)),
    );

    let footer = if data.loading {
        " loading … ".to_string()
    } else {
        format!(
            " page {}/{} · {} rows · {} selected ",
            data.page,
            data.total_pages.max(1),
            data.filtered_len,
            data.selected_count
        )
    };
    let mut title = format!(" {} ", data.title);
    if !data.search_term.is_empty() {
        title = format!(" {} /{} ", data.title, data.search_term);
    }
    let block = Block::bordered()
        .title(Line::from(title.bold()))
        .title_bottom(Line::from(footer).right_aligned())
        .border_set(border::THICK);

    let table = Table::new(rows, widths).header(header).block(block);
    frame.render_widget(table, area);
}

fn draw_statusline(data: &UiData, frame: &mut Frame, area: Rect) {
    if data.modus == Modus::CmdInput {
        let prompt = match data.cmd_mode {
            Some(CmdMode::SearchTable) => "search: ",
            Some(CmdMode::FormField) => "value: ",
            Some(CmdMode::ImportFile) => "csv file: ",
            Some(CmdMode::UploadFile) => "image file: ",
            None => ": ",
        };
        let at = data
            .cmdinput
            .input
            .char_indices()
            .nth(data.cmdinput.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(data.cmdinput.input.len());
        let (before, after) = data.cmdinput.input.split_at(at);
        let line = Line::from(vec![
            Span::styled(prompt, Style::default().fg(Color::Yellow)),
            Span::raw(before.to_string()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
            Span::raw(after.to_string()),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    }
    if let Some(toast) = &data.toast {
        let style = match toast.level {
            ToastLevel::Info => Style::default().fg(Color::Cyan),
            ToastLevel::Success => Style::default().fg(Color::Green),
            ToastLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        };
        frame.render_widget(
            Paragraph::new(Span::styled(format!(" {}", toast.message), style)),
            area,
        );
        return;
    }
    let hints = " ?:help  /:search  Space:select  d:delete  c:new  e:edit  q:quit";
    frame.render_widget(
        Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray))),
        area,
    );
}

fn draw_form(data: &UiData, frame: &mut Frame) {
    let Some(form) = &data.form else {
        return;
    };
    let height = (form.fields.len() as u16 + 6).min(frame.area().height);
    let area = centered(frame.area(), 60, height);
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    for (idx, field) in form.fields.iter().enumerate() {
        let cursor = if idx == form.cursor { "▸ " } else { "  " };
        let mut spans = vec![
            Span::raw(cursor.to_string()),
            Span::styled(format!("{:<12}", field.label), Style::default().bold()),
            Span::raw(field.value.clone()),
        ];
        if let Some(error) = &field.error {
            spans.push(Span::styled(
                format!("  ← {error}"),
                Style::default().fg(Color::Red),
            ));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    if let Some(error) = &form.server_error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else if form.submitting {
        lines.push(Line::from(Span::styled(
            "saving …",
            Style::default().fg(Color::Yellow),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Enter: edit field · Ctrl-s: save · Esc: cancel",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let title = if form.editing { " Edit record " } else { " New record " };
    let block = Block::bordered()
        .title(Line::from(title.bold()).centered())
        .border_set(border::DOUBLE);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_confirm(data: &UiData, frame: &mut Frame) {
    let area = centered(frame.area(), 46, 5);
    frame.render_widget(Clear, area);
    let lines = vec![
        Line::from(format!("Delete {} selected records?", data.confirm_count)).centered(),
        Line::from(""),
        Line::from(Span::styled(
            "y: delete · n: cancel",
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ];
    let block = Block::bordered()
        .title(Line::from(" Confirm ".bold()).centered())
        .border_style(Style::default().fg(Color::Red))
        .border_set(border::DOUBLE);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_popup(data: &UiData, frame: &mut Frame) {
    let height = (data.popup_message.lines().count() as u16 + 2).min(frame.area().height);
    let area = centered(frame.area(), 52, height);
    frame.render_widget(Clear, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_set(border::DOUBLE);
    frame.render_widget(
        Paragraph::new(data.popup_message.as_str()).block(block),
        area,
    );
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_fits_inside() {
        let outer = Rect::new(0, 0, 80, 24);
        let inner = centered(outer, 60, 10);
        assert!(inner.x >= outer.x && inner.right() <= outer.right());
        assert!(inner.y >= outer.y && inner.bottom() <= outer.bottom());
    }

    #[test]
    fn centered_clamps_to_small_terminals() {
        let outer = Rect::new(0, 0, 10, 4);
        let inner = centered(outer, 60, 10);
        assert_eq!(inner.width, 10);
        assert_eq!(inner.height, 4);
    }
}
