//! ANSI styling that can be switched off.

/// Environment variable that disables color when set to any non-empty value.
pub const NO_COLOR: &str = "NO_COLOR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Color unless `no_color` is set or `NO_COLOR` is present in the environment.
    pub fn from_env(no_color: bool) -> Self {
        let env_disabled = std::env::var_os(NO_COLOR).is_some_and(|v| !v.is_empty());
        Self::new(!no_color && !env_disabled)
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}
