use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::Display;

/// Reader-level input intents. They sit on top of the chapter session: scroll
/// commands only move the viewport, chapter commands route to `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum ReaderCommand {
    Close,
    ScrollForward,
    ScrollBack,
    Top,
    Bottom,
    NextChapter,
    PrevChapter,
    ToggleControls,
}

type KeyChord = (KeyCode, KeyModifiers);

/// Maps key events to reader commands.
#[derive(Debug, Clone)]
pub struct ReaderKeyMap {
    bindings: HashMap<KeyChord, ReaderCommand>,
}

impl ReaderKeyMap {
    pub fn empty() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Default reader layout.
    pub fn new() -> Self {
        let mut map = Self::empty();
        let defaults = [
            ("Esc", ReaderCommand::Close),
            ("Right", ReaderCommand::ScrollForward),
            ("d", ReaderCommand::ScrollForward),
            ("PageDown", ReaderCommand::ScrollForward),
            ("Left", ReaderCommand::ScrollBack),
            ("a", ReaderCommand::ScrollBack),
            ("PageUp", ReaderCommand::ScrollBack),
            ("Home", ReaderCommand::Top),
            ("g", ReaderCommand::Top),
            ("End", ReaderCommand::Bottom),
            ("G", ReaderCommand::Bottom),
            ("n", ReaderCommand::NextChapter),
            ("p", ReaderCommand::PrevChapter),
            ("h", ReaderCommand::ToggleControls),
        ];
        for (key, command) in defaults {
            if let Some(event) = parse_key_str(key) {
                map.add_binding(event, command);
            }
        }
        map
    }

    pub fn add_binding(&mut self, key: KeyEvent, command: ReaderCommand) {
        self.bindings.insert(chord(&key), command);
    }

    /// Command bound to a key press. Releases and repeats are ignored.
    pub fn command_for(&self, key: &KeyEvent) -> Option<ReaderCommand> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        self.bindings.get(&chord(key)).copied()
    }

    /// Merge custom keybindings from configuration
    pub fn merge_config(&mut self, overrides: &HashMap<String, ReaderCommand>) {
        for (key_str, command) in overrides {
            match parse_key_str(key_str) {
                Some(key_event) => self.add_binding(key_event, *command),
                None => tracing::warn!("Invalid key string in config: {}", key_str),
            }
        }
    }
}

impl Default for ReaderKeyMap {
    fn default() -> Self {
        Self::new()
    }
}

// Shift is implied by the character itself ('G' vs 'g'), so drop it for chars.
fn chord(key: &KeyEvent) -> KeyChord {
    let modifiers = match key.code {
        KeyCode::Char(_) => key.modifiers - KeyModifiers::SHIFT,
        _ => key.modifiers,
    };
    (key.code, modifiers)
}

/// Parse a key string into a KeyEvent
/// Supported formats:
/// - Single char: "j", "k", "1"
/// - Special keys: "Enter", "Tab", "Esc", "Up", "Down", "Left", "Right"
/// - With modifiers: "Ctrl+C", "Shift+Tab"
pub fn parse_key_str(key_str: &str) -> Option<KeyEvent> {
    let parts: Vec<&str> = key_str.split('+').collect();

    let mut modifiers = KeyModifiers::empty();
    let key_part = match parts.split_last() {
        Some((last, mods)) => {
            for modifier in mods {
                match modifier.to_lowercase().as_str() {
                    "ctrl" => modifiers |= KeyModifiers::CONTROL,
                    "shift" => modifiers |= KeyModifiers::SHIFT,
                    "alt" => modifiers |= KeyModifiers::ALT,
                    _ => return None,
                }
            }
            *last
        }
        None => return None,
    };

    let code = match key_part {
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "Esc" => KeyCode::Esc,
        "Space" => KeyCode::Char(' '),
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None,
            }
        }
    };

    Some(KeyEvent::new(code, modifiers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[test]
    fn test_parse_simple_char() {
        let key = parse_key_str("j").unwrap();
        assert_eq!(key.code, KeyCode::Char('j'));
        assert_eq!(key.modifiers, KeyModifiers::empty());
    }

    #[test]
    fn test_parse_with_modifier() {
        let key = parse_key_str("Ctrl+d").unwrap();
        assert_eq!(key.code, KeyCode::Char('d'));
        assert!(key.modifiers.contains(KeyModifiers::CONTROL));
        assert!(parse_key_str("Hyper+d").is_none());
        assert!(parse_key_str("NotAKey").is_none());
    }

    #[test]
    fn test_default_reader_layout() {
        let map = ReaderKeyMap::new();
        assert_eq!(map.command_for(&press(KeyCode::Esc)), Some(ReaderCommand::Close));
        assert_eq!(
            map.command_for(&press(KeyCode::Right)),
            Some(ReaderCommand::ScrollForward)
        );
        assert_eq!(
            map.command_for(&press(KeyCode::Char('a'))),
            Some(ReaderCommand::ScrollBack)
        );
        assert_eq!(map.command_for(&press(KeyCode::Home)), Some(ReaderCommand::Top));
        assert_eq!(map.command_for(&press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_shift_is_implied_for_chars() {
        let map = ReaderKeyMap::new();
        let shifted = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(map.command_for(&shifted), Some(ReaderCommand::Bottom));
    }

    #[test]
    fn test_release_events_ignored() {
        let map = ReaderKeyMap::new();
        let mut key = press(KeyCode::Esc);
        key.kind = KeyEventKind::Release;
        assert_eq!(map.command_for(&key), None);
    }

    #[test]
    fn test_merge_config_overrides() {
        let mut map = ReaderKeyMap::new();
        let mut overrides = HashMap::new();
        overrides.insert("j".to_string(), ReaderCommand::ScrollForward);
        overrides.insert("Esc".to_string(), ReaderCommand::ToggleControls);
        overrides.insert("Bogus+x".to_string(), ReaderCommand::Close);
        map.merge_config(&overrides);

        assert_eq!(
            map.command_for(&press(KeyCode::Char('j'))),
            Some(ReaderCommand::ScrollForward)
        );
        assert_eq!(
            map.command_for(&press(KeyCode::Esc)),
            Some(ReaderCommand::ToggleControls)
        );
    }
}
