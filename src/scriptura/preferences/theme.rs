//! Applying the theme preference to whatever presentation layer is attached.
//!
//! The controller remembers the selected [`Theme`] and the OS dark-mode
//! flag. While `System` is selected, an OS change re-applies the theme; with
//! an explicit light/dark selection OS changes are ignored.

use crate::model::Theme;
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Appearance {
    Light,
    Dark,
}

/// The presentation layer hook. Called every time the effective appearance is (re)applied.
pub trait ThemeSink {
    fn apply(&self, appearance: Appearance);
}

/// A sink for clients with nothing to restyle.
pub struct NullSink;

impl ThemeSink for NullSink {
    fn apply(&self, _appearance: Appearance) {}
}

pub fn resolve_appearance(theme: Theme, system_dark: bool) -> Appearance {
    match theme {
        Theme::Light => Appearance::Light,
        Theme::Dark => Appearance::Dark,
        Theme::System if system_dark => Appearance::Dark,
        Theme::System => Appearance::Light,
    }
}

pub struct ThemeController {
    selected: Cell<Theme>,
    system_dark: Cell<bool>,
    applied: Cell<Option<Appearance>>,
    sink: Box<dyn ThemeSink>,
}

impl ThemeController {
    pub fn new(sink: Box<dyn ThemeSink>) -> Self {
        Self {
            selected: Cell::new(Theme::System),
            system_dark: Cell::new(false),
            applied: Cell::new(None),
            sink,
        }
    }

    pub fn with_system_dark(self, dark: bool) -> Self {
        self.system_dark.set(dark);
        self
    }

    /// Select `theme` and apply it immediately.
    pub fn apply(&self, theme: Theme) {
        self.selected.set(theme);
        self.push();
    }

    /// Notify the controller that the OS light/dark preference changed.
    pub fn system_preference_changed(&self, dark: bool) {
        self.system_dark.set(dark);
        if self.selected.get() == Theme::System {
            self.push();
        }
    }

    pub fn selected(&self) -> Theme {
        self.selected.get()
    }

    /// The appearance most recently pushed to the sink, if any.
    pub fn applied(&self) -> Option<Appearance> {
        self.applied.get()
    }

    fn push(&self) {
        let appearance = resolve_appearance(self.selected.get(), self.system_dark.get());
        tracing::debug!(theme = %self.selected.get(), ?appearance, "Applying theme");
        self.applied.set(Some(appearance));
        self.sink.apply(appearance);
    }
}

impl Default for ThemeController {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn explicit_theme_applies_immediately() {
        let sink = RecordingSink::default();
        let controller = ThemeController::new(Box::new(sink.clone()));
        controller.apply(Theme::Dark);
        assert_eq!(*sink.0.borrow(), vec![Appearance::Dark]);
        assert_eq!(controller.applied(), Some(Appearance::Dark));
    }

    #[test]
    fn system_theme_follows_os_changes() {
        let sink = RecordingSink::default();
        let controller = ThemeController::new(Box::new(sink.clone()));
        controller.apply(Theme::System);
        controller.system_preference_changed(true);
        controller.system_preference_changed(false);
        assert_eq!(
            *sink.0.borrow(),
            vec![Appearance::Light, Appearance::Dark, Appearance::Light]
        );
    }

    #[test]
    fn explicit_theme_ignores_os_changes() {
        let sink = RecordingSink::default();
        let controller = ThemeController::new(Box::new(sink.clone())).with_system_dark(true);
        controller.apply(Theme::Light);
        controller.system_preference_changed(false);
        controller.system_preference_changed(true);
        assert_eq!(*sink.0.borrow(), vec![Appearance::Light]);
    }
}
