use std::path::PathBuf;
use std::time::Duration;
use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use floatchat_core::{
    ChatSession, Config, Direction, FallbackResponder, FloatChatClient, ImageRef, Message,
    PendingSubmission, QueryDispatcher, ServiceStatus, ServiceStatusMonitor, SessionError,
    StatusHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// A dispatch running in the background, with the ticket for its reply slot
pub struct InFlightQuery {
    pub ticket: PendingSubmission,
    pub task: JoinHandle<Message>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Conversation
    pub session: ChatSession,
    pub dispatcher: QueryDispatcher,
    pub query: Option<InFlightQuery>,
    pub selected_carousel: Option<usize>,

    // Service status
    pub status: StatusHandle,
    pub status_task: Option<JoinHandle<ServiceStatus>>,

    // Plot saving
    pub plots_dir: PathBuf,
    pub save_task: Option<JoinHandle<anyhow::Result<PathBuf>>>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the chat area
    pub chat_width: u16,  // inner width of the chat area
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    // Footer notice (cleared on next key press)
    pub notice: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    /// `base_url` is resolved by the caller, see [`Config::api_base_url`]
    pub fn new(base_url: &str, config: &Config) -> Self {
        let client = FloatChatClient::new(base_url);
        let status = StatusHandle::new();
        let fallback = FallbackResponder::new(&config.fallback_assets_dir());
        let dispatcher = QueryDispatcher::new(client, fallback, status.clone());

        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            input: String::new(),
            cursor: 0,

            session: ChatSession::new(),
            dispatcher,
            query: None,
            selected_carousel: None,

            status,
            status_task: None,

            plots_dir: config.plots_dir(),
            save_task: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_bottom: true,
            chat_area: None,

            notice: None,

            animation_frame: 0,
        }
    }

    pub fn base_url(&self) -> &str {
        self.dispatcher.client().base_url()
    }

    pub fn service_status(&self) -> ServiceStatus {
        self.status.get()
    }

    pub fn is_loading(&self) -> bool {
        self.query.is_some()
    }

    /// Probe the service in the background; the result lands in `status`
    pub fn start_status_check(&mut self, timeout: Duration) {
        let monitor = ServiceStatusMonitor::new(
            self.dispatcher.client().clone(),
            timeout,
            self.status.clone(),
        );
        self.status_task = Some(tokio::spawn(async move { monitor.check_once().await }));
    }

    /// Send the input box contents as a new question
    pub fn submit_input(&mut self) {
        let ticket = match self.session.begin_submission(&self.input) {
            Ok(ticket) => ticket,
            Err(SessionError::EmptyMessage) => return,
            Err(SessionError::SubmissionPending) => {
                self.notice = Some("Still waiting for the previous answer...".to_string());
                return;
            }
            Err(e) => {
                warn!(error = %e, "submission rejected");
                self.notice = Some(e.to_string());
                return;
            }
        };

        self.input.clear();
        self.cursor = 0;
        self.follow_bottom = true;

        let dispatcher = self.dispatcher.clone();
        let text = ticket.text().to_string();
        let task = tokio::spawn(async move { dispatcher.dispatch(&text).await });
        self.query = Some(InFlightQuery { ticket, task });
    }

    /// Collect results from finished background tasks
    pub async fn poll_tasks(&mut self) {
        if self.query.as_ref().is_some_and(|q| q.task.is_finished()) {
            if let Some(InFlightQuery { ticket, task }) = self.query.take() {
                let reply = match task.await {
                    Ok(reply) => reply,
                    Err(e) => {
                        error!(error = %e, "dispatch task failed");
                        self.dispatcher
                            .fallback()
                            .respond(ticket.text(), &format!("request task failed: {}", e))
                    }
                };
                self.record_reply(ticket, reply);
            }
        }

        if self.status_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.status_task.take() {
                match task.await {
                    Ok(status) => info!(status = status.as_str(), "startup probe finished"),
                    Err(e) => error!(error = %e, "status probe task failed"),
                }
            }
        }

        if self.save_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.save_task.take() {
                self.notice = Some(match task.await {
                    Ok(Ok(path)) => format!("Saved {}", path.display()),
                    Ok(Err(e)) => format!("Could not save image: {}", e),
                    Err(e) => format!("Could not save image: {}", e),
                });
            }
        }
    }

    fn record_reply(&mut self, ticket: PendingSubmission, reply: Message) {
        match self.session.complete_submission(ticket, reply) {
            Ok(position) => {
                // Newest carousel takes the arrow keys
                if self.session.messages()[position].is_carousel() {
                    self.selected_carousel = Some(position);
                }
                self.follow_bottom = true;
            }
            Err(e) => error!(error = %e, "reply could not be recorded"),
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Carousel selection
    pub fn select_next_carousel(&mut self) {
        let positions = self.session.carousel_positions();
        self.selected_carousel = match self.selected_carousel {
            Some(current) => positions.iter().copied().find(|&p| p > current).or(positions.first().copied()),
            None => positions.last().copied(),
        };
    }

    pub fn select_prev_carousel(&mut self) {
        let positions = self.session.carousel_positions();
        self.selected_carousel = match self.selected_carousel {
            Some(current) => positions.iter().rev().copied().find(|&p| p < current).or(positions.last().copied()),
            None => positions.last().copied(),
        };
    }

    pub fn navigate_carousel(&mut self, direction: Direction) {
        let Some(position) = self.selected_carousel else {
            self.notice = Some("No image carousel to browse".to_string());
            return;
        };
        if let Err(e) = self.session.navigate_carousel(position, direction) {
            error!(error = %e, position, "carousel navigation failed");
            self.selected_carousel = None;
        }
    }

    /// The image the user is looking at: the selected carousel's current
    /// image, else the most recent image in the conversation
    pub fn focused_image(&mut self) -> Option<ImageRef> {
        if let Some(position) = self.selected_carousel {
            if let Ok(Some(index)) = self.session.carousel_index(position) {
                return self.session.messages()[position].images.get(index).cloned();
            }
        }
        self.session
            .messages()
            .iter()
            .rev()
            .find_map(|m| m.images.first().cloned())
    }

    /// Download (or copy) the focused image into the plots directory
    pub fn save_focused_image(&mut self) {
        if self.save_task.is_some() {
            self.notice = Some("Already saving an image...".to_string());
            return;
        }
        let Some(image) = self.focused_image() else {
            self.notice = Some("No image to save".to_string());
            return;
        };

        let client = self.dispatcher.client().clone();
        let target = self.plots_dir.join(image.file_name());
        self.notice = Some(format!("Saving {}...", image.file_name()));
        self.save_task = Some(tokio::spawn(async move {
            let bytes = client.fetch_plot(&image).await?;
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, bytes).await?;
            info!(path = %target.display(), "plot saved");
            Ok::<_, anyhow::Error>(target)
        }));
    }

    // Chat scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    /// Clamp scroll to the rendered transcript height
    pub fn fit_scroll(&mut self, total_lines: u16) {
        let max_scroll = total_lines.saturating_sub(self.chat_height);
        if self.follow_bottom || self.chat_scroll > max_scroll {
            self.chat_scroll = max_scroll;
        }
        if self.chat_scroll == max_scroll {
            self.follow_bottom = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Closed local port, whatever FLOATCHAT_API_URL says
    const UNREACHABLE_API: &str = "http://127.0.0.1:9/api";

    fn test_app() -> App {
        App::new(UNREACHABLE_API, &Config::new())
    }

    #[test]
    fn test_base_url_comes_from_caller() {
        let config = Config {
            api_base_url: Some("http://analysis.example:5000/api".to_string()),
            ..Config::new()
        };
        let app = App::new(UNREACHABLE_API, &config);
        assert_eq!(app.base_url(), UNREACHABLE_API);
    }

    fn images(n: usize) -> Vec<ImageRef> {
        (0..n)
            .map(|i| ImageRef::new(format!("http://127.0.0.1:9/api/plots/p{}.png", i), format!("p{}", i)))
            .collect()
    }

    fn add_exchange(app: &mut App, question: &str, reply: Message) -> usize {
        let ticket = app.session.begin_submission(question).unwrap();
        app.session.complete_submission(ticket, reply).unwrap()
    }

    #[test]
    fn test_carousel_selection_cycles() {
        let mut app = test_app();
        let first = add_exchange(&mut app, "a", Message::assistant("two", images(2)));
        add_exchange(&mut app, "b", Message::assistant("none", Vec::new()));
        let second = add_exchange(&mut app, "c", Message::assistant("three", images(3)));

        app.select_next_carousel();
        assert_eq!(app.selected_carousel, Some(second));
        app.select_next_carousel();
        assert_eq!(app.selected_carousel, Some(first));
        app.select_prev_carousel();
        assert_eq!(app.selected_carousel, Some(second));
    }

    #[test]
    fn test_focused_image_follows_carousel() {
        let mut app = test_app();
        let position = add_exchange(&mut app, "a", Message::assistant("three", images(3)));
        app.selected_carousel = Some(position);

        app.navigate_carousel(Direction::Prev);
        let image = app.focused_image().unwrap();
        assert_eq!(image.caption, "p2");
    }

    #[test]
    fn test_focused_image_without_carousel_is_latest() {
        let mut app = test_app();
        add_exchange(&mut app, "a", Message::assistant("one", images(1)));
        add_exchange(&mut app, "b", Message::assistant("none", Vec::new()));
        assert_eq!(app.focused_image().unwrap().caption, "p0");
    }

    #[test]
    fn test_navigate_without_selection_sets_notice() {
        let mut app = test_app();
        app.navigate_carousel(Direction::Next);
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_fit_scroll_follows_bottom() {
        let mut app = test_app();
        app.chat_height = 10;
        app.fit_scroll(30);
        assert_eq!(app.chat_scroll, 20);

        app.scroll_up(5);
        app.fit_scroll(40);
        assert_eq!(app.chat_scroll, 15);
        assert!(!app.follow_bottom);

        app.scroll_to_bottom();
        app.fit_scroll(40);
        assert_eq!(app.chat_scroll, 30);
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected_while_pending() {
        let mut app = test_app();
        app.input = "first question".to_string();
        app.submit_input();
        assert!(app.is_loading());
        assert_eq!(app.session.messages().len(), 1);

        app.input = "second question".to_string();
        app.submit_input();
        assert_eq!(app.session.messages().len(), 1);
        assert_eq!(app.input, "second question");
        assert!(app.notice.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_service_still_answers() {
        let mut app = test_app();
        app.input = "salinity near Chennai".to_string();
        app.submit_input();

        while app.is_loading() {
            tokio::time::sleep(Duration::from_millis(20)).await;
            app.poll_tasks().await;
        }

        let messages = app.session.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].text.contains("Bay of Bengal"));
        assert!(messages[1].diagnostics.is_some());
    }
}
