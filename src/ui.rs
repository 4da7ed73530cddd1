use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use dockhand_core::{Artifact, Sender};
use crate::app::App;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.in_gate() {
        render_gate(app, frame, body_area);
    } else if app.session().is_some() {
        render_chat(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let link = app
        .session()
        .and_then(|s| s.repository_link())
        .map(|link| format!(" [{}]", link))
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" dockhand ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(link, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, hints) = if app.in_gate() {
        (" LINK ", " Enter: continue (leave blank to skip)  Esc: quit ")
    } else {
        (" CHAT ", " Enter: send  Ctrl-F: finalize  Ctrl-L: change repository  ↑/↓: scroll  Esc: quit ")
    };

    let mut spans = vec![
        Span::styled(mode_text, Style::default().bg(Color::Blue).fg(Color::White)),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::styled(
            format!(" {} ", status),
            Style::default().fg(Color::Yellow),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_gate(app: &App, frame: &mut Frame, area: Rect) {
    let [_, prompt_area, input_area, _] = Layout::vertical([
        Constraint::Percentage(30),
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let prompt = Paragraph::new(Text::from(vec![
        Line::from(Span::styled(
            "Which repository is this Dockerfile for?",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Paste a GitHub link, or press Enter to continue without one.",
            Style::default().fg(Color::DarkGray),
        )),
    ]))
    .wrap(Wrap { trim: true });
    frame.render_widget(prompt, prompt_area);

    render_input(app, frame, input_area, " Repository link ");
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let artifact = app.session().and_then(|s| s.artifact()).cloned();

    // Dockerfile panel on the right once there is one
    let [chat_column, artifact_area] = if artifact.is_some() {
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area)
    } else {
        Layout::horizontal([Constraint::Percentage(100), Constraint::Length(0)]).areas(area)
    };

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_transcript(app, frame, chat_area);
    render_input(app, frame, input_area, " Message ");

    if let Some(artifact) = artifact {
        render_artifact(&artifact, frame, artifact_area);
    }
}

fn render_transcript(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Conversation ");

    let loading = app.is_loading();
    let text = if app.messages().is_empty() && !loading {
        Text::from(Span::styled(
            "Describe the app you want to containerize...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.messages() {
            let (label, color) = match msg.sender {
                Sender::User => ("You:", Color::Cyan),
                Sender::Ai => ("AI:", Color::Yellow),
            };
            lines.push(Line::from(Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )));
            for line in msg.text.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_artifact(artifact: &Artifact, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Generated Dockerfile (Ctrl-F to finalize) ");

    let mut lines: Vec<Line> = artifact
        .dockerfile
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();

    if let Some(command) = &artifact.run_command {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Command to run:",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        for line in command.lines() {
            lines.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Green),
            )));
        }
    }

    let panel = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, title: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title.to_string());

    // Horizontal scroll so the cursor stays visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    let cursor_x = (app.cursor - scroll_offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}
