use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::warn;
use floatchat_core::Direction;
use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key)?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    app.notice = None;

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the input box
        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        // Carousels
        KeyCode::Char(']') => app.select_next_carousel(),
        KeyCode::Char('[') => app.select_prev_carousel(),
        KeyCode::Char('l') | KeyCode::Right => app.navigate_carousel(Direction::Next),
        KeyCode::Char('h') | KeyCode::Left => app.navigate_carousel(Direction::Prev),

        // Image actions
        KeyCode::Char('s') => app.save_focused_image(),
        KeyCode::Char('c') => match app.focused_image() {
            Some(image) => {
                copy_to_clipboard(&image.url);
                app.notice = Some(format!("Copied {}", image.url));
            }
            None => app.notice = Some("No image to copy".to_string()),
        },

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.input_mode != InputMode::Editing {
        return;
    }
    // The input box is a single line
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let byte_pos = char_to_byte_index(&app.input, app.cursor);
    app.input.insert_str(byte_pos, &flattened);
    app.cursor += flattened.chars().count();
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

fn copy_to_clipboard(text: &str) {
    #[cfg(target_os = "macos")]
    let (program, args): (&str, &[&str]) = ("pbcopy", &[]);
    #[cfg(not(target_os = "macos"))]
    let (program, args): (&str, &[&str]) = ("xclip", &["-selection", "clipboard"]);

    match pipe_to(program, args, text) {
        Ok(status) if !status.success() => warn!(program, %status, "clipboard helper failed"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, program, "clipboard helper unavailable"),
    }
}

/// Feed `text` to a helper's stdin and reap it
fn pipe_to(program: &str, args: &[&str], text: &str) -> std::io::Result<ExitStatus> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    // stdin must be closed before waiting or the helper never sees EOF
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(text.as_bytes()) {
            let _ = child.wait();
            return Err(e);
        }
    }
    child.wait()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use floatchat_core::Config;

    // Closed local port, whatever FLOATCHAT_API_URL says
    const UNREACHABLE_API: &str = "http://127.0.0.1:9/api";

    fn test_app() -> App {
        App::new(UNREACHABLE_API, &Config::new())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c))).unwrap();
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_pipe_to_waits_for_helper() {
        let status = pipe_to("cat", &[], "http://127.0.0.1:9/api/plots/a.png").unwrap();
        assert!(status.success());

        let status = pipe_to("sh", &["-c", "exit 3"], "").unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn test_pipe_to_missing_helper_is_an_error() {
        assert!(pipe_to("floatchat-no-such-clipboard-helper", &[], "x").is_err());
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "Tº salinity";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 2), 3);
        assert_eq!(char_to_byte_index(s, 100), s.len());
    }

    #[test]
    fn test_cursor_editing() {
        let mut app = test_app();
        type_text(&mut app, "salnity");
        for _ in 0..4 {
            handle_key(&mut app, key(KeyCode::Left)).unwrap();
        }
        type_text(&mut app, "i");
        assert_eq!(app.input, "salinity");

        handle_key(&mut app, key(KeyCode::Home)).unwrap();
        handle_key(&mut app, key(KeyCode::Delete)).unwrap();
        assert_eq!(app.input, "alinity");
        handle_key(&mut app, key(KeyCode::End)).unwrap();
        handle_key(&mut app, key(KeyCode::Backspace)).unwrap();
        assert_eq!(app.input, "alinit");
    }

    #[test]
    fn test_escape_then_quit() {
        let mut app = test_app();
        type_text(&mut app, "q");
        assert!(!app.should_quit);

        handle_key(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_key(&mut app, key(KeyCode::Char('q'))).unwrap();
        assert!(app.should_quit);
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut app = test_app();
        handle_paste(&mut app, "temperature\nin Arabian Sea");
        assert_eq!(app.input, "temperature in Arabian Sea");
        assert_eq!(app.cursor, app.input.chars().count());

        app.input_mode = InputMode::Normal;
        handle_paste(&mut app, "ignored");
        assert_eq!(app.input, "temperature in Arabian Sea");
    }

    #[test]
    fn test_copy_without_images_sets_notice() {
        let mut app = test_app();
        app.input_mode = InputMode::Normal;
        handle_key(&mut app, key(KeyCode::Char('c'))).unwrap();
        assert_eq!(app.notice.as_deref(), Some("No image to copy"));
    }

    #[tokio::test]
    async fn test_enter_submits_and_clears_input() {
        let mut app = test_app();
        type_text(&mut app, "argo floats");
        handle_key(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);
        assert!(app.is_loading());
        assert_eq!(app.session.messages().len(), 1);
    }
}
