use aho_corasick::AhoCorasick;
use anyhow::Result;

/// The HTML pages the server renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Index,
    Navigated,
    Error,
}

impl Page {
    const fn source(self) -> &'static str {
        match self {
            Self::Index => include_str!("../data/index.html"),
            Self::Navigated => include_str!("../data/navigated.html"),
            Self::Error => include_str!("../data/error.html"),
        }
    }

    /// Replaces every `{key}` placeholder with its value.
    pub fn render(self, values: &TemplateValues) -> Result<String> {
        let (patterns, replacements): (Vec<String>, Vec<&str>) = values
            .entries
            .iter()
            .map(|(key, value)| (format!("{{{key}}}"), value.as_str()))
            .unzip();

        let ac = AhoCorasick::new(&patterns)?;
        Ok(ac.replace_all(self.source(), &replacements))
    }
}

/// Placeholder values for one page render
#[derive(Debug, Clone, Default)]
pub struct TemplateValues {
    entries: Vec<(String, String)>,
}

impl TemplateValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, HTML-escaped
    pub fn text(mut self, key: &str, value: impl AsRef<str>) -> Self {
        let escaped = html_escape::encode_double_quoted_attribute(value.as_ref()).to_string();
        self.entries.push((key.to_string(), escaped));
        self
    }

    /// Adds markup that is inserted as-is
    pub fn html(mut self, key: &str, markup: String) -> Self {
        self.entries.push((key.to_string(), markup));
        self
    }
}
