use pl_core::{ParleyError, RandomSource};
use pl_dialogue::Dialogue;

use crate::run_talk_with_io;

pub(crate) fn run_talk_line_mode(
    dialogue: &Dialogue,
    rng: &mut dyn RandomSource,
) -> Result<i32, ParleyError> {
    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let mut writer = std::io::stdout();
    run_talk_with_io(dialogue, rng, &mut reader, &mut writer)
}

#[cfg(coverage)]
pub(crate) fn run_talk_terminal(
    dialogue: &Dialogue,
    rng: &mut dyn RandomSource,
) -> Result<i32, ParleyError> {
    run_talk_line_mode(dialogue, rng)
}

#[cfg(not(coverage))]
mod rich {
    use std::collections::VecDeque;
    use std::io;
    use std::time::{Duration, Instant};

    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
    use crossterm::terminal::{
        disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
    };
    use crossterm::ExecutableCommand;
    use pl_core::{ParleyError, RandomSource};
    use pl_dialogue::{Dialogue, InputRequired};
    use ratatui::backend::CrosstermBackend;
    use ratatui::style::{Color, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Paragraph, Wrap};
    use ratatui::{Frame, Terminal};

    use crate::{map_tui_io, TalkSession};

    const REVEAL_CHARS_PER_SECOND: u64 = 60;
    const REVEAL_TICK: Duration = Duration::from_millis(1000 / REVEAL_CHARS_PER_SECOND);
    const ELLIPSIS: char = '…';

    /// NPC speech revealed one line at a time, a character per tick.
    #[derive(Debug, Default)]
    struct Typewriter {
        queue: VecDeque<String>,
        /// Line being revealed and how many of its characters are shown.
        current: Option<(String, usize)>,
    }

    impl Typewriter {
        fn speak(&mut self, lines: impl IntoIterator<Item = String>) {
            self.queue.extend(lines);
        }

        fn is_speaking(&self) -> bool {
            self.current.is_some() || !self.queue.is_empty()
        }

        /// Reveals one more character; a finished line is handed to `transcript`.
        fn tick(&mut self, transcript: &mut Vec<String>) -> bool {
            match self.current.take() {
                Some((line, shown)) if shown < line.chars().count() => {
                    self.current = Some((line, shown + 1));
                    true
                }
                Some((line, _)) => {
                    transcript.push(line);
                    true
                }
                None => match self.queue.pop_front() {
                    Some(line) if line.is_empty() => {
                        transcript.push(line);
                        true
                    }
                    Some(line) => {
                        self.current = Some((line, 1));
                        true
                    }
                    None => false,
                },
            }
        }

        fn finish(&mut self, transcript: &mut Vec<String>) {
            transcript.extend(self.current.take().map(|(line, _)| line));
            transcript.extend(self.queue.drain(..));
        }

        fn partial(&self) -> Option<String> {
            self.current
                .as_ref()
                .map(|(line, shown)| line.chars().take(*shown).collect())
        }
    }

    #[derive(Debug, Default)]
    struct TalkUiState {
        transcript: Vec<String>,
        speech: Typewriter,
        input_buffer: String,
        status: String,
    }

    impl TalkUiState {
        fn typing_in_progress(&self) -> bool {
            self.speech.is_speaking()
        }

        fn advance_typewriter(&mut self) -> bool {
            self.speech.tick(&mut self.transcript)
        }

        fn skip_typewriter(&mut self) {
            self.speech.finish(&mut self.transcript);
        }
    }

    /// Raw mode plus alternate screen for as long as the talk window is open.
    struct TalkScreen {
        terminal: Terminal<CrosstermBackend<io::Stdout>>,
    }

    impl TalkScreen {
        fn open() -> Result<Self, ParleyError> {
            enable_raw_mode().map_err(map_tui_io)?;
            let mut stdout = io::stdout();
            stdout.execute(EnterAlternateScreen).map_err(map_tui_io)?;
            let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(map_tui_io)?;
            Ok(Self { terminal })
        }

        fn draw(&mut self, ui: &TalkUiState, session: &TalkSession<'_>) -> Result<(), ParleyError> {
            self.terminal
                .draw(|frame| render_talk(frame, ui, session))
                .map(|_| ())
                .map_err(map_tui_io)
        }
    }

    impl Drop for TalkScreen {
        fn drop(&mut self) {
            let _ = disable_raw_mode();
            let _ = io::stdout().execute(LeaveAlternateScreen);
            let _ = self.terminal.show_cursor();
        }
    }

    pub(super) fn run_talk_ratatui_mode(
        dialogue: &Dialogue,
        rng: &mut dyn RandomSource,
    ) -> Result<i32, ParleyError> {
        let mut screen = TalkScreen::open()?;
        let mut session = TalkSession::new(dialogue, rng);
        let mut ui = TalkUiState {
            status: "talking".to_string(),
            ..TalkUiState::default()
        };
        ui.speech.speak(session.begin());

        let mut last_tick = Instant::now();
        loop {
            screen.draw(&ui, &session)?;

            if last_tick.elapsed() >= REVEAL_TICK && ui.advance_typewriter() {
                last_tick = Instant::now();
            }

            let timeout = REVEAL_TICK.saturating_sub(last_tick.elapsed());
            if !event::poll(timeout).map_err(map_tui_io)? {
                continue;
            }
            if let Event::Key(key) = event::read().map_err(map_tui_io)? {
                if key.kind == KeyEventKind::Press && handle_key(key, &mut session, &mut ui) {
                    break;
                }
            }
        }

        let outcome = session.outcome();
        drop(screen);
        println!("RESULT:{}", outcome);
        Ok(0)
    }

    fn input_limit(required: InputRequired) -> usize {
        match required {
            InputRequired::Nothing => 0,
            InputRequired::Character => 1,
            InputRequired::Text { max_len } => max_len,
        }
    }

    /// `true` once the window should close.
    fn handle_key(
        key: crossterm::event::KeyEvent,
        session: &mut TalkSession<'_>,
        ui: &mut TalkUiState,
    ) -> bool {
        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc || ctrl_c {
            session.hang_up();
            return true;
        }
        if session.is_done() {
            return matches!(key.code, KeyCode::Enter | KeyCode::Char('q'));
        }

        match key.code {
            KeyCode::Backspace | KeyCode::Delete => {
                ui.input_buffer.pop();
            }
            KeyCode::Enter => {
                if ui.typing_in_progress() {
                    ui.skip_typewriter();
                    return false;
                }
                let raw = std::mem::take(&mut ui.input_buffer);
                ui.transcript.push(format!("{}{}", session.prompt(), raw));
                ui.speech.speak(session.submit(&raw));
                ui.status = if session.is_done() {
                    format!("conversation over ({}), enter to close", session.outcome())
                } else {
                    format!("state {:?}", session.state())
                };
            }
            KeyCode::Char(ch)
                if !key.modifiers.contains(KeyModifiers::CONTROL)
                    && !key.modifiers.contains(KeyModifiers::ALT) =>
            {
                if ui.input_buffer.chars().count() < input_limit(session.input_required()) {
                    ui.input_buffer.push(ch);
                }
            }
            _ => {}
        }
        false
    }

    /// Clips `value` to `width` characters, marking the cut with an ellipsis.
    fn truncate_to_width(value: &str, width: usize) -> String {
        match value.char_indices().nth(width) {
            None => value.to_string(),
            Some(_) if width == 0 => String::new(),
            Some(_) => {
                let mut out: String = value.chars().take(width - 1).collect();
                out.push(ELLIPSIS);
                out
            }
        }
    }

    /// Breaks speech at spaces; a word longer than the row is split.
    fn wrap_line_to_width(value: &str, width: usize) -> Vec<String> {
        if width == 0 {
            return vec![String::new()];
        }
        let mut rows = Vec::new();
        let mut row = String::new();
        let mut row_len = 0usize;
        for word in value.split_whitespace() {
            let mut word_chars: Vec<char> = word.chars().collect();
            let needed = if row_len == 0 {
                word_chars.len()
            } else {
                row_len + 1 + word_chars.len()
            };
            if needed <= width {
                if row_len > 0 {
                    row.push(' ');
                    row_len += 1;
                }
                row.extend(word_chars.iter());
                row_len += word_chars.len();
                continue;
            }
            if row_len > 0 {
                rows.push(std::mem::take(&mut row));
                row_len = 0;
            }
            while word_chars.len() > width {
                let rest = word_chars.split_off(width);
                rows.push(word_chars.into_iter().collect());
                word_chars = rest;
            }
            row_len = word_chars.len();
            row = word_chars.into_iter().collect();
        }
        if row_len > 0 || rows.is_empty() {
            rows.push(row);
        }
        rows
    }

    fn render_talk(frame: &mut Frame<'_>, ui: &TalkUiState, session: &TalkSession<'_>) {
        let terminal_width = frame.area().width as usize;
        let terminal_rows = frame.area().height as usize;
        let content_width = (terminal_width.saturating_sub(2)).max(16);

        let wrapped_text_rows = ui
            .transcript
            .iter()
            .cloned()
            .chain(ui.speech.partial())
            .flat_map(|line| wrap_line_to_width(&line, content_width))
            .collect::<Vec<_>>();

        // header, status, divider, input, keys
        let reserved_rows = 5usize;
        let visible_text_rows = terminal_rows.saturating_sub(reserved_rows).max(1);
        let clipped_text_rows = if wrapped_text_rows.len() <= visible_text_rows {
            wrapped_text_rows
        } else {
            wrapped_text_rows[wrapped_text_rows.len() - visible_text_rows..].to_vec()
        };

        let dialogue = session.dialogue();
        let header_text = truncate_to_width(
            format!("talking to {} | {:?}", dialogue.name(), session.state()).as_str(),
            content_width,
        );
        let status_text =
            truncate_to_width(format!("status: {}", ui.status).as_str(), content_width);
        let input_text = if session.is_done() || ui.typing_in_progress() {
            " ".to_string()
        } else {
            truncate_to_width(
                format!("{}{}", session.prompt(), ui.input_buffer).as_str(),
                content_width,
            )
        };
        let key_text = truncate_to_width(
            "keys: type+backspace input | enter submit/skip | esc leave",
            content_width,
        );

        let mut lines_out: Vec<Line<'_>> = Vec::new();
        lines_out.push(Line::from(header_text));
        lines_out.push(Line::from(Span::styled(
            status_text,
            Style::default().fg(Color::Gray),
        )));
        for row in clipped_text_rows {
            lines_out.push(Line::from(row));
        }
        lines_out.push(Line::from(Span::styled(
            "─".repeat(content_width),
            Style::default().fg(Color::Gray),
        )));
        lines_out.push(Line::from(Span::styled(
            input_text,
            Style::default().fg(Color::Green),
        )));
        lines_out.push(Line::from(Span::styled(
            key_text,
            Style::default().fg(Color::Yellow),
        )));

        let paragraph = Paragraph::new(lines_out).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, frame.area());
    }

    #[cfg(test)]
    mod rich_tests {
        use super::*;
        use crossterm::event::KeyEvent;
        use pl_core::SeededRandom;
        use pl_dialogue::Response;

        fn press(code: KeyCode) -> KeyEvent {
            KeyEvent::new(code, KeyModifiers::NONE)
        }

        #[test]
        fn typewriter_reveals_lines_one_character_at_a_time() {
            let mut ui = TalkUiState::default();
            ui.speech.speak(["ab".to_string(), String::new()]);
            assert!(ui.advance_typewriter());
            assert_eq!(ui.speech.partial().as_deref(), Some("a"));
            assert!(ui.advance_typewriter());
            assert_eq!(ui.speech.partial().as_deref(), Some("ab"));
            assert!(ui.advance_typewriter());
            assert_eq!(ui.transcript, vec!["ab".to_string()]);
            assert!(ui.advance_typewriter());
            assert!(!ui.advance_typewriter());
            assert_eq!(ui.transcript.len(), 2);
            assert!(!ui.typing_in_progress());
        }

        #[test]
        fn skipping_flushes_the_line_being_spoken_and_the_queue() {
            let mut ui = TalkUiState::default();
            let lines = ["Hail.".to_string(), "Well met.".to_string()];
            ui.speech.speak(lines);
            ui.advance_typewriter();
            ui.skip_typewriter();
            assert_eq!(ui.transcript, vec!["Hail.", "Well met."]);
            assert!(ui.speech.partial().is_none());
        }

        #[test]
        fn width_helpers_clip_and_wrap() {
            assert_eq!(truncate_to_width("abcdef", 4), "abc…");
            assert_eq!(truncate_to_width("abc", 4), "abc");
            assert_eq!(truncate_to_width("abc", 0), "");
            assert_eq!(truncate_to_width("abc", 1), "…");
            assert_eq!(
                wrap_line_to_width("I make fine bows", 10),
                vec!["I make", "fine bows"]
            );
            assert_eq!(wrap_line_to_width("abcde", 2), vec!["ab", "cd", "e"]);
            assert_eq!(
                wrap_line_to_width("ok abcdefg", 4),
                vec!["ok", "abcd", "efg"]
            );
            assert_eq!(wrap_line_to_width("", 2), vec![String::new()]);
        }

        #[test]
        fn keys_fill_input_within_the_state_limit_and_submit() {
            let mut dialogue = Dialogue::new("Iolo");
            dialogue.add_keyword("job", Response::new("I make bows."));
            let mut rng = SeededRandom::default();
            let mut session = TalkSession::new(&dialogue, &mut rng);
            let mut ui = TalkUiState::default();
            ui.speech.speak(session.begin());

            assert!(!handle_key(press(KeyCode::Enter), &mut session, &mut ui));
            assert!(!ui.typing_in_progress());

            for ch in "jobs and more".chars() {
                handle_key(press(KeyCode::Char(ch)), &mut session, &mut ui);
            }
            assert_eq!(ui.input_buffer, "jobs and more");
            handle_key(press(KeyCode::Backspace), &mut session, &mut ui);
            assert_eq!(ui.input_buffer, "jobs and mor");

            handle_key(press(KeyCode::Enter), &mut session, &mut ui);
            assert!(ui.input_buffer.is_empty());
            assert_eq!(
                ui.speech.queue.front().map(String::as_str),
                Some("I make bows.")
            );

            assert!(handle_key(press(KeyCode::Esc), &mut session, &mut ui));
            assert!(session.is_done());
        }
    }
}

#[cfg(not(coverage))]
pub(crate) fn run_talk_terminal(
    dialogue: &Dialogue,
    rng: &mut dyn RandomSource,
) -> Result<i32, ParleyError> {
    use std::io::IsTerminal;

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        return run_talk_line_mode(dialogue, rng);
    }
    rich::run_talk_ratatui_mode(dialogue, rng)
}
