//! OSC 8 hyperlinks
//!
//! `ESC ] 8 ; params ; url ST` opens a link and `ESC ] 8 ; ; ST` closes it.
//! Params are `key=value` pairs separated by `:`.

/// An open hyperlink attached to written text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub url: String,
    pub params: Vec<(String, String)>,
}

/// What clicking a link should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Run a snippet of code in the console
    Run(String),
    /// Show a help topic
    Help(String),
    /// Open a vignette
    Vignette(String),
    /// Open a local file, optionally at a position
    OpenFile {
        path: String,
        line: Option<u32>,
        col: Option<u32>,
    },
    /// Navigate to an arbitrary url
    Browse(String),
}

impl LinkAction {
    /// Short name used in markup `data-action` attributes
    pub fn kind(&self) -> &'static str {
        match self {
            LinkAction::Run(_) => "run",
            LinkAction::Help(_) => "help",
            LinkAction::Vignette(_) => "vignette",
            LinkAction::OpenFile { .. } => "file",
            LinkAction::Browse(_) => "browse",
        }
    }

    /// Whether the action is handled by the console itself rather than by navigation
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            LinkAction::Run(_) | LinkAction::Help(_) | LinkAction::Vignette(_)
        )
    }
}

impl Hyperlink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
        }
    }

    /// Parse the body of an OSC 8 sequence (everything after `8;`).
    ///
    /// Returns `None` for the closing form, which has an empty url.
    pub fn parse(body: &str) -> Option<Self> {
        let (params, url) = body.split_once(';').unwrap_or(("", body));
        if url.is_empty() {
            return None;
        }

        let params = params
            .split(':')
            .filter(|p| !p.is_empty())
            .map(|p| match p.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (p.to_string(), String::new()),
            })
            .collect();

        Some(Self {
            url: url.to_string(),
            params,
        })
    }

    /// Look up a parameter by key
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Derive the click action from the url scheme
    pub fn action(&self) -> LinkAction {
        let url = self.url.as_str();

        if let Some(code) = strip_scheme(url, "run") {
            return LinkAction::Run(code.to_string());
        }
        if let Some(topic) = strip_scheme(url, "help") {
            return LinkAction::Help(topic.to_string());
        }
        if let Some(topic) = strip_scheme(url, "vignette") {
            return LinkAction::Vignette(topic.to_string());
        }

        if let Some(path) = url.strip_prefix("file://") {
            return LinkAction::OpenFile {
                path: path.to_string(),
                line: self.param("line").and_then(|v| v.parse().ok()),
                col: self.param("col").and_then(|v| v.parse().ok()),
            };
        }

        LinkAction::Browse(self.url.clone())
    }
}

/// Strip `x-r-<verb>:` or `ide:<verb>:` from a url
fn strip_scheme<'a>(url: &'a str, verb: &str) -> Option<&'a str> {
    for prefix in ["x-r-", "ide:"] {
        if let Some(rest) = url
            .strip_prefix(prefix)
            .and_then(|r| r.strip_prefix(verb))
            .and_then(|r| r.strip_prefix(':'))
        {
            return Some(rest);
        }
    }
    None
}
