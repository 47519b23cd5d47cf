//! Runtime context classification and navigation URLs.
//!
//! A relay id usually travels as navigation state, so the receiving page
//! can start polling. Where that page lives depends on whether the UI runs
//! inside the internal workspace or an external experience site.

use cloudfiles_protocol::constants::CONFIG_ID_STATE_KEY;
use percent_encoding::{AsciiSet, CONTROLS, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in a single path component.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters escaped in a multi-segment path.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Characters escaped in query keys and values (space becomes `+`).
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

const PREVIEW_HOSTS: &[&str] = &[
    ".builder.salesforce-communities.com",
    ".preview.salesforce-communities.com",
    ".livepreview.salesforce-communities.com",
    ".builder.salesforce-experience.com",
    ".preview.salesforce-experience.com",
    ".livepreview.salesforce-experience.com",
];
const PREVIEW_HOST_MARKERS: &[&str] = &["--sitestudio", "--sitepreview", "--livepreview"];
const PREVIEW_HREF_MARKERS: &[&str] = &["sitepreview", "livepreview", "live-preview", ".builder."];
const EXPERIENCE_HOSTS: &[&str] = &[".salesforce-communities.com", ".salesforce-experience.com"];

/// Where the UI is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    /// Internal workspace (`/lightning/...`).
    Workspace,
    /// Published external experience site.
    Experience,
    /// Builder or live preview of an experience site.
    SitePreview,
}

impl ContextKind {
    pub fn is_external(self) -> bool {
        matches!(self, ContextKind::Experience | ContextKind::SitePreview)
    }
}

/// Pages that receive relayed config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    AllFiles,
    FileDetails,
}

impl Page {
    /// Component name in the workspace, path name on experience sites.
    pub fn name_for(self, kind: ContextKind) -> &'static str {
        match (self, kind.is_external()) {
            (Page::AllFiles, false) => "c__googleCloudRelatedAttachments",
            (Page::FileDetails, false) => "c__googleCloudFilePageDetails",
            (Page::AllFiles, true) => "gview-all-files",
            (Page::FileDetails, true) => "gfile-details",
        }
    }
}

/// Opens pages on behalf of the relay's caller.
pub trait NavigationCapability: Send + Sync {
    /// Opens `component` as a workspace tab. Returns `false` when no
    /// workspace tab host is available, in which case a URL is opened.
    fn open_tab(&self, _component: &str, _state: &[(String, String)]) -> bool {
        false
    }

    fn open_url(&self, url: &str, new_window: bool);
}

/// Location of the running UI, passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    pub href: String,
    pub hostname: String,
    pub pathname: String,
}

impl RuntimeContext {
    pub fn new(
        href: impl Into<String>,
        hostname: impl Into<String>,
        pathname: impl Into<String>,
    ) -> Self {
        Self {
            href: href.into(),
            hostname: hostname.into(),
            pathname: pathname.into(),
        }
    }

    /// Splits an absolute `href` into host and path.
    pub fn parse(href: &str) -> Self {
        let rest = href.split_once("://").map(|(_, r)| r).unwrap_or(href);
        let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (authority, tail) = rest.split_at(authority_len);
        let hostname = authority
            .rsplit('@')
            .next()
            .unwrap_or_default()
            .split(':')
            .next()
            .unwrap_or_default();
        let pathname = tail.split(['?', '#']).next().filter(|p| !p.is_empty()).unwrap_or("/");
        Self::new(href, hostname, pathname)
    }

    pub fn classify(&self) -> ContextKind {
        let path = self.pathname.to_lowercase();
        if path.starts_with("/lightning") {
            return ContextKind::Workspace;
        }
        if self.is_site_preview() {
            return ContextKind::SitePreview;
        }
        if has_path_segment(&path, "s") {
            return ContextKind::Experience;
        }
        let host = self.hostname.to_lowercase();
        if EXPERIENCE_HOSTS.iter().any(|h| host.contains(h)) {
            return ContextKind::Experience;
        }
        ContextKind::Workspace
    }

    fn is_site_preview(&self) -> bool {
        let host = self.hostname.to_lowercase();
        let href = self.href.to_lowercase();
        PREVIEW_HOSTS.iter().any(|h| host.contains(h))
            || PREVIEW_HOST_MARKERS.iter().any(|m| host.contains(m))
            || PREVIEW_HREF_MARKERS.iter().any(|m| href.contains(m))
    }

    /// `scheme://authority` of `href`, empty when `href` is not absolute.
    pub fn origin(&self) -> &str {
        let Some(scheme_end) = self.href.find("://") else {
            return "";
        };
        let rest = &self.href[scheme_end + 3..];
        let authority_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        &self.href[..scheme_end + 3 + authority_len]
    }

    /// Path prefix of the experience site (`/partners` in `/partners/s/x`).
    pub fn site_prefix(&self) -> String {
        let path = self.pathname.to_lowercase();
        if let Some(idx) = path.find("/s/")
            && idx > 0
        {
            return path[..idx].to_string();
        }
        match path.strip_suffix("/s") {
            Some(prefix) if !prefix.is_empty() && prefix != "/" => prefix.to_string(),
            _ => String::new(),
        }
    }

    /// Absolute URL that opens `page` with `state` as query parameters.
    ///
    /// Experience contexts get `<prefix>/s/<page>`, everything else
    /// `/lightning/cmp/<page>`. Empty state values are dropped.
    pub fn navigation_url(&self, page: &str, state: &[(String, String)]) -> String {
        let path = if self.classify().is_external() {
            utf8_percent_encode(&self.experience_path(page), PATH).to_string()
        } else {
            format!(
                "/lightning/cmp/{}",
                utf8_percent_encode(page.trim(), COMPONENT)
            )
        };

        let query = state
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| format!("{}={}", form_encode(key), form_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        if query.is_empty() {
            format!("{}{path}", self.origin())
        } else {
            format!("{}{path}?{query}", self.origin())
        }
    }

    fn experience_path(&self, page: &str) -> String {
        let prefix = self.site_prefix();
        let mut path = page.trim().to_string();
        if path.is_empty() || path == "/" {
            return format!("{prefix}/s/");
        }
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        if has_path_segment(&path.to_lowercase(), "s") {
            if !prefix.is_empty() && path.to_lowercase().starts_with(&format!("{prefix}/")) {
                return path;
            }
            return format!("{prefix}{path}");
        }
        format!("{prefix}/s{path}")
    }

    /// Opens `page` through `nav`, preferring a workspace tab when the
    /// context allows it. Returns the URL when one was opened.
    pub fn navigate(
        &self,
        nav: &dyn NavigationCapability,
        page: Page,
        state: &[(String, String)],
        new_window: bool,
    ) -> Option<String> {
        let kind = self.classify();
        let name = page.name_for(kind);
        let state: Vec<(String, String)> = state
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .cloned()
            .collect();

        if !kind.is_external() && nav.open_tab(name, &state) {
            return None;
        }
        let url = self.navigation_url(name, &state);
        nav.open_url(&url, new_window);
        Some(url)
    }
}

/// Navigation state that carries a relay id to the receiving page.
pub fn config_state(config_id: &str) -> Vec<(String, String)> {
    vec![(CONFIG_ID_STATE_KEY.to_string(), config_id.to_string())]
}

fn has_path_segment(path: &str, segment: &str) -> bool {
    path.split('/').any(|s| s == segment)
}

fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY)
        .to_string()
        .replace("%20", "+")
}
