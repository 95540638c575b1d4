//! Light/dark preference, stored under its own key.

use crate::error::Result;
use crate::storage::{KeyValueStore, THEME_KEY};
use ratatui::style::Color;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colors used by the terminal UI.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg: Color,
    pub bg: Color,
    pub accent: Color,
    pub muted: Color,
    pub high: Color,
    pub medium: Color,
    pub low: Color,
}

impl Theme {
    /// Reads the stored preference; anything but `"dark"` is light.
    pub fn load(kv: &dyn KeyValueStore) -> Self {
        match kv.get(THEME_KEY) {
            Ok(Some(value)) if value.trim() == "dark" => Self::Dark,
            Ok(_) => Self::Light,
            Err(err) => {
                warn!(error = %err, "could not read theme preference");
                Self::Light
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    pub fn save(self, kv: &mut dyn KeyValueStore) -> Result<()> {
        kv.set(THEME_KEY, self.as_str())
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub const fn palette(self) -> Palette {
        match self {
            Self::Light => Palette {
                fg: Color::Black,
                bg: Color::White,
                accent: Color::Blue,
                muted: Color::DarkGray,
                high: Color::Red,
                medium: Color::Yellow,
                low: Color::Green,
            },
            Self::Dark => Palette {
                fg: Color::White,
                bg: Color::Black,
                accent: Color::Cyan,
                muted: Color::Gray,
                high: Color::LightRed,
                medium: Color::LightYellow,
                low: Color::LightGreen,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn missing_preference_is_light() {
        assert_eq!(Theme::load(&MemoryStore::new()), Theme::Light);
    }

    #[test]
    fn toggled_theme_is_remembered() {
        let mut kv = MemoryStore::new();
        let theme = Theme::default().toggled();
        theme.save(&mut kv).unwrap();
        assert_eq!(kv.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert_eq!(Theme::load(&kv), Theme::Dark);

        theme.toggled().save(&mut kv).unwrap();
        assert_eq!(Theme::load(&kv), Theme::Light);
    }
}
