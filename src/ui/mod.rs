//! UI module - Ratatui-based terminal interface

mod widgets;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Focus, Status};
use crate::llm::Source;

pub use widgets::*;

/// Draw the main UI
pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),      // Title
            Constraint::Length(3),      // Input
            Constraint::Percentage(45), // Raw answers
            Constraint::Min(6),         // Merged answer
            Constraint::Length(3),      // Agreement bar
            Constraint::Length(1),      // Status bar
        ])
        .split(frame.area());

    draw_title(frame, app, chunks[0]);
    draw_input(frame, app, chunks[1]);
    draw_answers(frame, app, chunks[2]);
    draw_merged(frame, app, chunks[3]);
    draw_agreement(frame, app, chunks[4]);
    draw_status_bar(frame, app, chunks[5]);
}

fn pane_style(app: &App, focus: Focus, active: Color) -> Style {
    if app.focus == focus {
        Style::default().fg(active)
    } else {
        Style::default().fg(Color::Gray)
    }
}

fn draw_title(frame: &mut Frame, app: &App, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            format!("  {}  ", app.config.ui.title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" - scoring: {:?}", app.panel.strategy()).to_lowercase()),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(Paragraph::new(title).block(block), area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Enter your question ")
        .borders(Borders::ALL)
        .border_style(pane_style(app, Focus::Input, Color::Yellow));

    frame.render_widget(Paragraph::new(app.input.as_str()).block(block), area);

    if app.focus == Focus::Input {
        let cursor_x = area.x + 1 + app.cursor_column();
        let cursor_y = area.y + 1;
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

fn draw_answers(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    for (i, source) in Source::ALL.into_iter().enumerate() {
        let answer = app
            .report
            .as_ref()
            .and_then(|r| r.answers.iter().find(|a| a.source == source));

        let (text, text_style) = match answer {
            Some(a) if a.is_ok() => (a.display_text(), Style::default()),
            Some(a) => (a.display_text(), Style::default().fg(Color::Red)),
            None => (String::new(), Style::default()),
        };

        let block = Block::default()
            .title(format!(" {} Response ", source))
            .borders(Borders::ALL)
            .border_style(pane_style(app, Focus::Answers, Color::Blue));

        let paragraph = Paragraph::new(text)
            .style(text_style)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((app.answer_scroll, 0));

        frame.render_widget(paragraph, columns[i]);
    }
}

fn draw_merged(frame: &mut Frame, app: &App, area: Rect) {
    let (text, text_style) = match app.report.as_ref().map(|r| &r.merged) {
        Some(merged) if merged.outcome.is_ok() => (merged.display_text(), Style::default()),
        Some(merged) => (merged.display_text(), Style::default().fg(Color::Red)),
        None => (String::new(), Style::default()),
    };

    let block = Block::default()
        .title(" Final Best Answer ")
        .borders(Borders::ALL)
        .border_style(pane_style(app, Focus::Merged, Color::Green));

    let paragraph = Paragraph::new(text)
        .style(text_style)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.merged_scroll, 0));

    frame.render_widget(paragraph, area);
}

fn draw_agreement(frame: &mut Frame, app: &App, area: Rect) {
    let Some(report) = app.report.as_ref() else {
        let block = Block::default().title(" Similarity ").borders(Borders::ALL);
        frame.render_widget(block, area);
        return;
    };

    let block = Block::default()
        .title(format!(" {} ", report.score_label()))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.config.ui.show_bar && report.score.is_available() {
        frame.render_widget(AgreementBar::new(report.score.value), inner);
    }
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let (status_text, status_color) = match app.status {
        Status::Idle => ("Ready - Press Enter to ask", Color::Gray),
        Status::Working => ("Asking Gemini, Cypher and DeepSeek...", Color::Yellow),
        Status::Complete => ("Done! Ask another question or press Esc to quit", Color::Green),
        Status::Rejected => ("Please enter a question first", Color::Red),
    };

    let status = Line::from(vec![
        Span::raw(" Status: "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(" | "),
        Span::raw("[Tab] Switch focus | [Enter] Ask | [Esc] Quit"),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();

        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_draw_idle_screen() {
        let app = App::new(Config::default(), Some("What is the capital of France?".into()));
        let text = screen_text(&app);

        assert!(text.contains("Chatbot Response Comparator"));
        assert!(text.contains("What is the capital of France?"));
        assert!(text.contains("Gemini Response"));
        assert!(text.contains("Cypher Response"));
        assert!(text.contains("DeepSeek Response"));
        assert!(text.contains("Final Best Answer"));
        assert!(text.contains("Ready - Press Enter to ask"));
    }

    #[test]
    fn test_draw_rejected_status() {
        let mut app = App::new(Config::default(), None);
        assert!(app.begin_submit().is_none());

        assert!(screen_text(&app).contains("Please enter a question first"));
    }
}
