use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use floatchat_core::{ChatRole, Message, ServiceStatus};
use crate::app::{App, InputMode};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn status_color(status: ServiceStatus) -> Color {
    match status {
        ServiceStatus::Checking => Color::Yellow,
        ServiceStatus::Connected => Color::Green,
        ServiceStatus::Offline => Color::Red,
        ServiceStatus::Degraded => Color::LightMagenta,
    }
}

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
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = app.service_status();

    let title = Line::from(vec![
        Span::styled(" FloatChat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("● ", Style::default().fg(status_color(status))),
        Span::styled(status.display_name(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(app.base_url().to_string(), Style::default().fg(Color::Gray)),
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
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" VIEW ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if let Some(notice) = &app.notice {
        vec![Span::styled(format!(" {} ", notice), Style::default().bg(Color::Black).fg(Color::Yellow))]
    } else {
        match app.input_mode {
            InputMode::Normal => {
                let mut hints = vec![
                    Span::styled(" j/k ", key_style),
                    Span::styled(" scroll ", label_style),
                ];
                if !app.session.carousel_positions().is_empty() {
                    hints.extend(vec![
                        Span::styled(" [/] ", key_style),
                        Span::styled(" carousel ", label_style),
                        Span::styled(" h/l ", key_style),
                        Span::styled(" image ", label_style),
                    ]);
                }
                hints.extend(vec![
                    Span::styled(" s ", key_style),
                    Span::styled(" save ", label_style),
                    Span::styled(" c ", key_style),
                    Span::styled(" copy url ", label_style),
                    Span::styled(" i ", key_style),
                    Span::styled(" ask ", label_style),
                    Span::styled(" q ", key_style),
                    Span::styled(" quit ", label_style),
                ]);
                hints
            }
            InputMode::Editing => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" stop typing ", label_style),
            ],
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn role_line(role: ChatRole) -> Line<'static> {
    let color = match role {
        ChatRole::User => Color::Cyan,
        ChatRole::Assistant => Color::Yellow,
    };
    Line::from(Span::styled(
        format!("{}:", role.label()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Image lines for one message: a single plot, or the current carousel frame
fn image_lines(message: &Message, carousel_index: Option<usize>, selected: bool) -> Vec<Line<'static>> {
    let url_style = Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC);
    let mut lines = Vec::new();

    match carousel_index {
        Some(index) => {
            let Some(image) = message.images.get(index) else {
                return lines;
            };
            let marker = if selected { "▸ " } else { "  " };
            let frame_style = if selected {
                Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Magenta)
            };
            lines.push(Line::from(vec![
                Span::styled(marker, frame_style),
                Span::styled(format!("◀ [{}/{}] ▶ ", index + 1, message.images.len()), frame_style),
                Span::raw(image.caption.clone()),
            ]));
            lines.push(Line::from(Span::styled(format!("    {}", image.url), url_style)));
        }
        None => {
            for image in &message.images {
                lines.push(Line::from(vec![
                    Span::styled("  [plot] ", Style::default().fg(Color::Magenta)),
                    Span::raw(image.caption.clone()),
                ]));
                lines.push(Line::from(Span::styled(format!("    {}", image.url), url_style)));
            }
        }
    }

    lines
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    // Creates carousel entries the first time a multi-image reply is drawn
    let carousel_indices: Vec<Option<usize>> = (0..app.session.messages().len())
        .map(|position| app.session.carousel_index(position).ok().flatten())
        .collect();

    let border_color = if app.input_mode == InputMode::Normal { Color::Cyan } else { Color::DarkGray };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Ocean data chat ");

    let messages = app.session.messages();
    let lines: Vec<Line<'static>> = if messages.is_empty() && !app.is_loading() {
        vec![Line::from(Span::styled(
            "Ask about Argo floats, temperature or salinity in the Indian Ocean...",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();

        for (position, msg) in messages.iter().enumerate() {
            lines.push(role_line(msg.role));
            match msg.role {
                ChatRole::User => lines.push(Line::from(msg.text.clone())),
                ChatRole::Assistant => {
                    for line in msg.body().lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    if let Some(diagnostic) = &msg.diagnostics {
                        lines.push(Line::from(Span::styled(
                            format!("⚠ Service note: {}", diagnostic),
                            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
                        )));
                    }
                    let selected = app.selected_carousel == Some(position);
                    lines.extend(image_lines(msg, carousel_indices[position], selected));
                }
            }
            lines.push(Line::default());
        }

        if app.is_loading() {
            lines.push(role_line(ChatRole::Assistant));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Analyzing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        lines
    };

    // Word wrapping can take more rows than chars / width; count what ratatui draws
    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    let total_lines = u16::try_from(chat.line_count(app.chat_width)).unwrap_or(u16::MAX);
    app.fit_scroll(total_lines);

    let chat = chat.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, chat_area);

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let (title, border_color) = if app.is_loading() {
        (" Waiting for the analysis service... ", Color::DarkGray)
    } else if app.input_mode == InputMode::Editing {
        (" Ask (Enter to send) ", Color::Yellow)
    } else {
        (" Ask (i to type) ", Color::DarkGray)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if app.is_loading() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let input = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floatchat_core::{Config, ImageRef};
    use ratatui::{backend::TestBackend, Terminal};

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_parse_markdown_bold() {
        let line = parse_markdown_line("Mean **28.4°C** at surface");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "28.4°C");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(plain(&line), "Mean 28.4°C at surface");
    }

    #[test]
    fn test_parse_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("**unclosed");
        assert_eq!(plain(&line), "**unclosed");
        assert!(parse_markdown_line("").spans.is_empty());
    }

    fn screen_rows(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    fn long_fallback_app() -> App {
        let mut app = App::new("http://127.0.0.1:9/api", &Config::new());
        let word = "c".repeat(12);
        let paragraph = vec![word.as_str(); 8].join(" ");
        let body = vec![paragraph.as_str(); 3].join("\n");
        let reply = Message::assistant(body, Vec::new())
            .with_diagnostic("analysis service unavailable: connection refused");

        let ticket = app.session.begin_submission("temperature trends").unwrap();
        app.session.complete_submission(ticket, reply).unwrap();
        app
    }

    #[test]
    fn test_word_wrapped_reply_keeps_service_note_reachable() {
        let mut app = long_fallback_app();
        let mut terminal = Terminal::new(TestBackend::new(24, 20)).unwrap();

        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(
            screen_rows(&terminal).iter().any(|row| row.contains("Service note")),
            "bottom of the transcript should show the service note"
        );

        app.scroll_to_top();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        for _ in 0..50 {
            app.scroll_down(5);
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }
        assert!(screen_rows(&terminal).iter().any(|row| row.contains("Service note")));
        assert!(app.follow_bottom);
    }

    #[test]
    fn test_carousel_frame_shows_position() {
        let msg = Message::assistant(
            "two plots",
            vec![
                ImageRef::new("http://h/api/plots/a.png", "first"),
                ImageRef::new("http://h/api/plots/b.png", "second"),
            ],
        );
        let lines = image_lines(&msg, Some(1), true);
        assert_eq!(lines.len(), 2);
        assert!(plain(&lines[0]).contains("[2/2]"));
        assert!(plain(&lines[0]).contains("second"));
        assert!(plain(&lines[1]).ends_with("b.png"));
    }

    #[test]
    fn test_single_image_lists_plot() {
        let msg = Message::assistant("map", vec![ImageRef::new("assets/fallback/map.png", "Float map")]);
        let lines = image_lines(&msg, None, false);
        assert_eq!(lines.len(), 2);
        assert!(plain(&lines[0]).contains("Float map"));
    }
}
