//! In-process surfaces for hosts without a browser, and for tests.
//!
//! Each type is a cheap handle over shared state, so a host can keep a clone
//! for inspection after handing one to the engine.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::{FeatureKind, FeatureUid, LatLng};
use layers::{FeatureLayer, FeatureStyle, LayerError, RecordingLayer};

use crate::cursor::Viewport;
use crate::popup::{DownloadError, DownloadHandle, DownloadStore, PopupSurface};

#[derive(Debug, Clone, Default)]
pub struct SharedLayer(Rc<RefCell<RecordingLayer>>);

impl SharedLayer {
    pub fn new(layer: RecordingLayer) -> Self {
        Self(Rc::new(RefCell::new(layer)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&RecordingLayer) -> R) -> R {
        f(&self.0.borrow())
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut RecordingLayer) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn style_of(&self, uid: &str) -> Option<FeatureStyle> {
        self.0.borrow().style_of(&FeatureUid::new(uid)).cloned()
    }
}

impl FeatureLayer for SharedLayer {
    fn set_feature_style(
        &mut self,
        uid: &FeatureUid,
        style: &FeatureStyle,
    ) -> Result<(), LayerError> {
        self.0.borrow_mut().set_feature_style(uid, style)
    }

    fn reset_feature_style(&mut self, uid: &FeatureUid) -> Result<(), LayerError> {
        self.0.borrow_mut().reset_feature_style(uid)
    }

    fn kind_of(&self, uid: &FeatureUid) -> Option<FeatureKind> {
        self.0.borrow().kind_of(uid)
    }
}

#[derive(Debug, Default)]
struct ViewportState {
    cursor: Option<String>,
    writes: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessViewport(Rc<RefCell<ViewportState>>);

impl HeadlessViewport {
    pub fn cursor(&self) -> Option<String> {
        self.0.borrow().cursor.clone()
    }

    pub fn writes(&self) -> u64 {
        self.0.borrow().writes
    }
}

impl Viewport for HeadlessViewport {
    fn set_cursor(&mut self, token: &str) {
        let mut s = self.0.borrow_mut();
        s.cursor = Some(token.to_string());
        s.writes += 1;
    }
}

#[derive(Debug, Default)]
struct PopupState {
    visible: bool,
    at: Option<LatLng>,
    html: String,
    opens: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessPopup(Rc<RefCell<PopupState>>);

impl HeadlessPopup {
    /// Number of popups on screen: 0 or 1.
    pub fn visible_count(&self) -> usize {
        usize::from(self.0.borrow().visible)
    }

    pub fn html(&self) -> Option<String> {
        let s = self.0.borrow();
        s.visible.then(|| s.html.clone())
    }

    pub fn position(&self) -> Option<LatLng> {
        let s = self.0.borrow();
        if s.visible { s.at } else { None }
    }

    pub fn open_count(&self) -> u64 {
        self.0.borrow().opens
    }
}

impl PopupSurface for HeadlessPopup {
    fn open(&mut self, at: LatLng, html: &str) {
        let mut s = self.0.borrow_mut();
        s.visible = true;
        s.at = Some(at);
        s.html = html.to_string();
        s.opens += 1;
    }

    fn set_content(&mut self, html: &str) {
        self.0.borrow_mut().html = html.to_string();
    }

    fn close(&mut self) {
        self.0.borrow_mut().visible = false;
    }
}

#[derive(Debug, Default)]
struct DownloadState {
    next: u64,
    live: BTreeMap<DownloadHandle, (String, Vec<u8>)>,
    revoked: Vec<DownloadHandle>,
    fail_revokes: bool,
}

/// Download store keeping content in memory under `blob:explorer/<n>` handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryDownloads(Rc<RefCell<DownloadState>>);

impl MemoryDownloads {
    pub fn live_count(&self) -> usize {
        self.0.borrow().live.len()
    }

    pub fn revoked(&self) -> Vec<DownloadHandle> {
        self.0.borrow().revoked.clone()
    }

    pub fn content(&self, handle: &DownloadHandle) -> Option<(String, Vec<u8>)> {
        self.0.borrow().live.get(handle).cloned()
    }

    pub fn fail_revokes(&self, fail: bool) {
        self.0.borrow_mut().fail_revokes = fail;
    }
}

impl DownloadStore for MemoryDownloads {
    fn create(&mut self, file_name: &str, bytes: Vec<u8>) -> Result<DownloadHandle, DownloadError> {
        let mut s = self.0.borrow_mut();
        s.next += 1;
        let handle = DownloadHandle(format!("blob:explorer/{}", s.next));
        s.live.insert(handle.clone(), (file_name.to_string(), bytes));
        Ok(handle)
    }

    fn revoke(&mut self, handle: &DownloadHandle) -> Result<(), DownloadError> {
        let mut s = self.0.borrow_mut();
        if s.fail_revokes {
            return Err(DownloadError::Unavailable("revoke disabled".to_string()));
        }
        if s.live.remove(handle).is_none() {
            return Err(DownloadError::UnknownHandle(handle.clone()));
        }
        s.revoked.push(handle.clone());
        Ok(())
    }
}
