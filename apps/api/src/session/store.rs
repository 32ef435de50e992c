//! Session State Store — one in-memory `Session` per interactive user.
//!
//! Report and career data are owned values; every snapshot or rollback is a
//! full clone, so the working copy and the saved copy never share storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::models::career::MessageKind;
use crate::models::{Attachment, CareerData, ReportData, StudentInfo, UploadForm, UserMessage};

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Last user-visible message produced by a transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// The career workflow's own banner, shown at its level.
impl From<&UserMessage> for Notice {
    fn from(message: &UserMessage) -> Self {
        let level = match message.kind {
            MessageKind::Success => NoticeLevel::Success,
            MessageKind::Warning => NoticeLevel::Warning,
            MessageKind::Info => NoticeLevel::Info,
        };
        let text = match (message.title.trim(), message.message.trim()) {
            ("", body) => body.to_string(),
            (title, "") => title.to_string(),
            (title, body) => format!("{title}: {body}"),
        };
        Self {
            level,
            message: text,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    form_submitted: bool,
    report_data: Option<ReportData>,
    original_report_data: Option<ReportData>,
    career_data: Option<CareerData>,
    original_career_data: Option<CareerData>,
    edit_mode: bool,
    career_analysis_requested: bool,
    form: Option<UploadForm>,
    attachments: Vec<Attachment>,
    notice: Option<Notice>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            form_submitted: false,
            report_data: None,
            original_report_data: None,
            career_data: None,
            original_career_data: None,
            edit_mode: false,
            career_analysis_requested: false,
            form: None,
            attachments: Vec::new(),
            notice: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ── Accessors ──────────────────────────────────────────────────────────

    pub fn form_submitted(&self) -> bool {
        self.form_submitted
    }

    pub fn report_data(&self) -> Option<&ReportData> {
        self.report_data.as_ref()
    }

    pub fn report_data_mut(&mut self) -> Option<&mut ReportData> {
        self.touch();
        self.report_data.as_mut()
    }

    pub fn original_report_data(&self) -> Option<&ReportData> {
        self.original_report_data.as_ref()
    }

    pub fn career_data(&self) -> Option<&CareerData> {
        self.career_data.as_ref()
    }

    pub fn career_data_mut(&mut self) -> Option<&mut CareerData> {
        self.touch();
        self.career_data.as_mut()
    }

    pub fn original_career_data(&self) -> Option<&CareerData> {
        self.original_career_data.as_ref()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn career_analysis_requested(&self) -> bool {
        self.career_analysis_requested
    }

    pub fn form(&self) -> Option<&UploadForm> {
        self.form.as_ref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // ── Flags ──────────────────────────────────────────────────────────────

    pub fn set_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
        self.touch();
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
        self.touch();
    }

    pub fn set_career_analysis_requested(&mut self, requested: bool) {
        self.career_analysis_requested = requested;
        self.touch();
    }

    // ── Form data ──────────────────────────────────────────────────────────

    /// Records an accepted upload form and marks it submitted.
    pub fn store_form_data(&mut self, form: UploadForm, attachments: Vec<Attachment>) {
        self.form = Some(form);
        self.attachments = attachments;
        self.form_submitted = true;
        self.touch();
    }

    /// Returns to the upload form after a failed processing step.
    pub fn reset_form(&mut self) {
        self.form_submitted = false;
        self.touch();
    }

    /// Hands the uploaded files to the processing step; they are not kept.
    pub fn take_attachments(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.attachments)
    }

    /// Student details from the report, falling back to the submitted form.
    pub fn student_info(&self) -> StudentInfo {
        if let Some(info) = self.report_data.as_ref().and_then(|r| r.student_info.clone()) {
            return info;
        }
        match &self.form {
            Some(form) => StudentInfo {
                name: form.name.clone(),
                age: form.age,
                grade: form.grade.clone(),
            },
            None => StudentInfo {
                name: UNKNOWN.to_string(),
                age: 0,
                grade: UNKNOWN.to_string(),
            },
        }
    }

    // ── Report / career data ───────────────────────────────────────────────

    /// Stores a fresh report and snapshots it as the saved original.
    pub fn store_report_data(&mut self, data: ReportData) {
        self.original_report_data = Some(data.clone());
        self.report_data = Some(data);
        self.touch();
    }

    /// Stores a career result (snapshotting it when present) and clears the
    /// outstanding request flag.
    pub fn store_career_data(&mut self, data: Option<CareerData>) {
        if let Some(data) = &data {
            self.original_career_data = Some(data.clone());
        }
        self.career_data = data;
        self.career_analysis_requested = false;
        self.touch();
    }

    pub fn request_career_analysis(&mut self) {
        self.career_analysis_requested = true;
        self.touch();
    }

    /// Drops the current career result so a new analysis can run.
    pub fn request_career_reanalysis(&mut self) {
        self.career_data = None;
        self.career_analysis_requested = true;
        self.touch();
    }

    // ── Edit snapshots ─────────────────────────────────────────────────────

    /// Restores the working copies from the last saved snapshots.
    pub fn reset_changes(&mut self) {
        if let Some(original) = &self.original_report_data {
            self.report_data = Some(original.clone());
        }
        if let Some(original) = &self.original_career_data {
            self.career_data = Some(original.clone());
        }
        self.touch();
    }

    /// Snapshots the working copies and leaves edit mode.
    pub fn save_changes(&mut self) {
        if let Some(current) = &self.report_data {
            self.original_report_data = Some(current.clone());
        }
        if let Some(current) = &self.career_data {
            self.original_career_data = Some(current.clone());
        }
        self.edit_mode = false;
        self.touch();
    }

    /// Discards everything, as for a brand new session.
    pub fn reset_all(&mut self) {
        *self = Session::new();
    }
}

/// Process-local registry of sessions. Sessions share nothing; each one is
/// behind its own async mutex so a session runs one action at a time.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    epoch: Instant,
}

struct Entry {
    session: Arc<Mutex<Session>>,
    /// Milliseconds since the store's epoch at the last create or lookup.
    last_access_ms: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: Arc::default(),
            epoch: Instant::now(),
        }
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub async fn create(&self) -> (Uuid, Arc<Mutex<Session>>) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new()));
        let entry = Entry {
            session: session.clone(),
            last_access_ms: AtomicU64::new(self.now_ms()),
        };
        self.sessions.write().await.insert(id, entry);
        info!("Created session {id}");
        (id, session)
    }

    /// Looks a session up and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&id)?;
        entry.last_access_ms.store(self.now_ms(), Ordering::Relaxed);
        Some(entry.session.clone())
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            debug!("Removed session {id}");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session not looked up for at least `ttl`. A session with an
    /// action in flight is kept. Returns the number evicted.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let now = self.now_ms();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let idle_ms = now.saturating_sub(entry.last_access_ms.load(Ordering::Relaxed));
            let busy = entry.session.try_lock().is_err();
            let keep = busy || idle_ms < ttl_ms;
            if !keep {
                debug!("Evicting session {id} after {}s idle", idle_ms / 1000);
            }
            keep
        });
        before - sessions.len()
    }

    /// Runs `evict_idle` every `sweep_interval` until the handle is aborted.
    pub fn spawn_sweeper(&self, config: SessionConfig) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(config.sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_idle(config.idle_ttl).await;
                if evicted > 0 {
                    info!("Evicted {evicted} idle session(s)");
                }
            }
        })
    }
}
