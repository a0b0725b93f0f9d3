use foundation::{LatLng, SubId};
use runtime::Generation;
use tracing::debug;

/// Opaque reference to generated download content (an object URL in a browser).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DownloadHandle(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadError {
    Unavailable(String),
    UnknownHandle(DownloadHandle),
}

impl std::fmt::Display for DownloadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DownloadError::Unavailable(msg) => write!(f, "download unavailable: {msg}"),
            DownloadError::UnknownHandle(h) => write!(f, "unknown download handle {}", h.0),
        }
    }
}

impl std::error::Error for DownloadError {}

/// Creates and revokes downloadable content.
pub trait DownloadStore {
    fn create(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<DownloadHandle, DownloadError>;
    fn revoke(&mut self, handle: &DownloadHandle) -> Result<(), DownloadError>;
}

/// The single map popup.
///
/// `open` shows it at a position, moving it if it is already shown.
pub trait PopupSurface {
    fn open(&mut self, at: LatLng, html: &str);
    fn set_content(&mut self, html: &str);
    fn close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub handle: DownloadHandle,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupContent {
    /// Shown immediately on click, before any detail arrives.
    Summary { subid: SubId },
    Detail {
        subid: SubId,
        download: Option<Download>,
    },
    Error { message: String },
}

impl PopupContent {
    pub const DETAIL_FAILED: &'static str = "Failed to fetch GeoJSON";

    pub fn render_html(&self) -> String {
        match self {
            PopupContent::Summary { subid } => {
                format!("<strong>SubId:</strong> {}", escape(subid.as_str()))
            }
            PopupContent::Detail { subid, download } => {
                let mut html = format!(
                    "<div class=\"popup-detail\"><strong>SubId:</strong> {}",
                    escape(subid.as_str())
                );
                if let Some(d) = download {
                    html.push_str(&format!(
                        "<br /><a href=\"{}\" download=\"{}\">Download GeoJSON</a>",
                        escape(&d.handle.0),
                        escape(&d.file_name)
                    ));
                }
                html.push_str("</div>");
                html
            }
            PopupContent::Error { message } => {
                format!("<div class=\"popup-error\">{}</div>", escape(message))
            }
        }
    }

    fn download(&self) -> Option<&DownloadHandle> {
        match self {
            PopupContent::Detail {
                download: Some(d), ..
            } => Some(&d.handle),
            _ => None,
        }
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
struct OpenPopup {
    generation: Generation,
    content: PopupContent,
}

/// Owns the one popup and the resources behind its content.
///
/// Content is replaced only for the click generation it was opened for, and
/// every download handle is revoked exactly once, when its content is
/// replaced or the popup closes.
#[derive(Debug, Default)]
pub struct PopupPresenter {
    open: Option<OpenPopup>,
}

impl PopupPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn content(&self) -> Option<&PopupContent> {
        self.open.as_ref().map(|p| &p.content)
    }

    pub fn generation(&self) -> Option<Generation> {
        self.open.as_ref().map(|p| p.generation)
    }

    /// Opens the popup for a click, superseding whatever it showed before.
    pub fn open(
        &mut self,
        generation: Generation,
        at: LatLng,
        content: PopupContent,
        surface: &mut dyn PopupSurface,
        downloads: &mut dyn DownloadStore,
    ) {
        if let Some(previous) = self.open.take() {
            release(&previous.content, downloads);
        }
        surface.open(at, &content.render_html());
        self.open = Some(OpenPopup {
            generation,
            content,
        });
    }

    /// Replaces the content if the popup still belongs to `generation`.
    ///
    /// Content that is not shown is released before returning `false`.
    pub fn update(
        &mut self,
        generation: Generation,
        content: PopupContent,
        surface: &mut dyn PopupSurface,
        downloads: &mut dyn DownloadStore,
    ) -> bool {
        let Some(open) = self.open.as_mut().filter(|p| p.generation == generation) else {
            release(&content, downloads);
            return false;
        };
        surface.set_content(&content.render_html());
        let previous = std::mem::replace(&mut open.content, content);
        release(&previous, downloads);
        true
    }

    pub fn close(
        &mut self,
        surface: &mut dyn PopupSurface,
        downloads: &mut dyn DownloadStore,
    ) -> bool {
        let Some(previous) = self.open.take() else {
            return false;
        };
        surface.close();
        release(&previous.content, downloads);
        true
    }
}

fn release(content: &PopupContent, downloads: &mut dyn DownloadStore) {
    if let Some(handle) = content.download() {
        if let Err(err) = downloads.revoke(handle) {
            debug!(error = %err, "download release failed");
        }
    }
}
