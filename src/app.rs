use dockhand_core::{Message, PendingSession, Session, SessionError, SessionStart};

/// Where the user is in the flow
pub enum Phase {
    /// Waiting on the repository link prompt
    Gate(PendingSession),
    Chat(Session),
    /// Between phases, and after shutdown
    Closed,
}

pub struct App {
    pub should_quit: bool,
    pub phase: Phase,

    // Input line, shared by the gate prompt and the chat box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view state
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub follow_chat: bool,

    pub status: Option<String>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(start: SessionStart) -> Self {
        let phase = match start {
            SessionStart::Ready(session) => Phase::Chat(session),
            SessionStart::Gated(pending) => Phase::Gate(pending),
        };

        Self {
            should_quit: false,
            phase,
            input: String::new(),
            cursor: 0,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            follow_chat: true,
            status: None,
            animation_frame: 0,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Chat(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        match &mut self.phase {
            Phase::Chat(session) => Some(session),
            _ => None,
        }
    }

    pub fn in_gate(&self) -> bool {
        matches!(self.phase, Phase::Gate(_))
    }

    pub fn messages(&self) -> &[Message] {
        self.session().map(Session::messages).unwrap_or(&[])
    }

    pub fn is_loading(&self) -> bool {
        self.session().is_some_and(|s| s.in_flight() > 0)
    }

    /// Keep the session's pending input in step with the edit buffer
    pub fn sync_pending_input(&mut self) {
        let text = self.input.clone();
        if let Some(session) = self.session_mut() {
            session.set_pending_input(text);
        }
    }

    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    /// Answer the repository link prompt with whatever was typed
    pub fn submit_gate(&mut self) {
        if let Phase::Gate(pending) = std::mem::replace(&mut self.phase, Phase::Closed) {
            let session = pending.submit_link(&self.input);
            self.status = session
                .repository_link()
                .map(|link| format!("Repository: {}", link));
            self.phase = Phase::Chat(session);
            self.clear_input();
        }
    }

    /// Send the chat box contents. Blank input is ignored.
    pub fn send_input(&mut self) {
        self.sync_pending_input();
        let sent = self.session_mut().is_some_and(Session::submit_pending);
        if sent {
            self.clear_input();
            self.follow_chat = true;
            self.scroll_chat_to_bottom();
        }
    }

    pub fn finalize(&mut self) {
        let Some(session) = self.session() else {
            return;
        };

        self.status = Some(match session.finalize() {
            Ok(_) => "Finalize requested".to_string(),
            Err(SessionError::NoArtifact) => "No Dockerfile to finalize yet".to_string(),
        });
    }

    /// Forget the repository link and go back to the prompt
    pub fn reset_link(&mut self) {
        if let Phase::Chat(session) = std::mem::replace(&mut self.phase, Phase::Closed) {
            self.phase = Phase::Gate(session.reset_link());
            self.clear_input();
            self.chat_scroll = 0;
            self.status = Some("Repository link cleared".to_string());
        }
    }

    pub fn awaiting_reply(&self) -> bool {
        self.is_loading()
    }

    /// Wait for the next backend reply and fold it into the session
    pub async fn next_reply(&mut self) {
        let applied = match self.session_mut() {
            Some(session) => session.next_reply().await,
            None => false,
        };
        if applied && self.follow_chat {
            self.scroll_chat_to_bottom();
        }
    }

    pub fn shutdown(&mut self) {
        if let Phase::Chat(session) = std::mem::replace(&mut self.phase, Phase::Closed) {
            session.teardown();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_chat_up(&mut self) {
        self.follow_chat = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_chat_scroll());
        self.follow_chat = self.chat_scroll == self.max_chat_scroll();
    }

    /// Scroll chat to bottom so the newest turn is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_line_count().saturating_sub(visible_height)
    }

    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };
        transcript_line_count(self.messages(), wrap_width, self.is_loading())
    }
}

/// Rendered height of the transcript at `wrap_width`, clamped to `u16::MAX`
fn transcript_line_count(messages: &[Message], wrap_width: usize, loading: bool) -> u16 {
    let wrap_width = wrap_width.max(1);

    let mut total_lines: usize = 0;
    for msg in messages {
        total_lines = total_lines.saturating_add(2); // Sender line + blank line after
        for line in msg.text.lines() {
            let char_count = line.chars().count();
            total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
        }
    }

    if loading {
        total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
    }
    u16::try_from(total_lines).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_count_wraps_long_lines() {
        let messages = vec![Message::user("a".repeat(120)), Message::ai("ok")];

        // 120 chars at width 50: 3 rows, plus label and blank line for each message
        assert_eq!(transcript_line_count(&messages, 50, false), 3 + 2 + 1 + 2);
        assert_eq!(transcript_line_count(&messages, 50, true), 3 + 2 + 1 + 2 + 2);
    }

    #[test]
    fn test_line_count_clamps_huge_transcripts() {
        let messages = vec![Message::ai("x".repeat(70_000))];
        assert_eq!(transcript_line_count(&messages, 1, false), u16::MAX);

        let many: Vec<Message> = (0..40_000).map(|_| Message::user("hi")).collect();
        assert_eq!(transcript_line_count(&many, 80, true), u16::MAX);
    }
}
