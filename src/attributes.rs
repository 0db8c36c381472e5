// src/attributes.rs - Job attribute sets and the submission-time merge
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::document::{Document, Payload};

/// Job name used when neither the caller nor the document names the job.
pub const DEFAULT_JOB_NAME: &str = "Virtual Print Job";

/// Category an [`Attribute`] belongs to. A set holds at most one value per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKind {
    JobName,
    DocumentName,
    RequestingUserName,
    JobOriginatingUserName,
    Copies,
    Sides,
    OrientationRequested,
    Media,
    JobPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sides {
    OneSided,
    TwoSidedLongEdge,
    TwoSidedShortEdge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
    ReversePortrait,
    ReverseLandscape,
}

/// A single printing attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    JobName(String),
    DocumentName(String),
    RequestingUserName(String),
    JobOriginatingUserName(String),
    Copies(u32),
    Sides(Sides),
    OrientationRequested(Orientation),
    Media(String),
    JobPriority(u8),
}

impl Attribute {
    pub fn kind(&self) -> AttributeKind {
        match self {
            Attribute::JobName(_) => AttributeKind::JobName,
            Attribute::DocumentName(_) => AttributeKind::DocumentName,
            Attribute::RequestingUserName(_) => AttributeKind::RequestingUserName,
            Attribute::JobOriginatingUserName(_) => AttributeKind::JobOriginatingUserName,
            Attribute::Copies(_) => AttributeKind::Copies,
            Attribute::Sides(_) => AttributeKind::Sides,
            Attribute::OrientationRequested(_) => AttributeKind::OrientationRequested,
            Attribute::Media(_) => AttributeKind::Media,
            Attribute::JobPriority(_) => AttributeKind::JobPriority,
        }
    }

    /// Text value for the name-like attributes.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Attribute::JobName(s)
            | Attribute::DocumentName(s)
            | Attribute::RequestingUserName(s)
            | Attribute::JobOriginatingUserName(s)
            | Attribute::Media(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attribute::Copies(n) => write!(f, "copies={}", n),
            Attribute::Sides(s) => write!(f, "sides={:?}", s),
            Attribute::OrientationRequested(o) => write!(f, "orientation={:?}", o),
            Attribute::JobPriority(p) => write!(f, "job-priority={}", p),
            other => write!(f, "{:?}={}", other.kind(), other.as_text().unwrap_or_default()),
        }
    }
}

/// Mutable attribute collection keyed by [`AttributeKind`]; adding a value of
/// an existing kind replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: BTreeMap<AttributeKind, Attribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `attribute`, returning the value it replaced.
    pub fn add(&mut self, attribute: Attribute) -> Option<Attribute> {
        self.entries.insert(attribute.kind(), attribute)
    }

    /// Builder-style [`AttributeSet::add`].
    pub fn with(mut self, attribute: Attribute) -> Self {
        self.add(attribute);
        self
    }

    pub fn add_all(&mut self, other: &AttributeSet) {
        for attribute in other.iter() {
            self.add(attribute.clone());
        }
    }

    pub fn get(&self, kind: AttributeKind) -> Option<&Attribute> {
        self.entries.get(&kind)
    }

    pub fn text(&self, kind: AttributeKind) -> Option<&str> {
        self.get(kind).and_then(Attribute::as_text)
    }

    pub fn remove(&mut self, kind: AttributeKind) -> Option<Attribute> {
        self.entries.remove(&kind)
    }

    pub fn contains(&self, kind: AttributeKind) -> bool {
        self.entries.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.entries.values()
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for attribute in iter {
            set.add(attribute);
        }
        set
    }
}

/// Read-only, cheaply cloneable attribute set fixed at submission time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobAttributes(Arc<AttributeSet>);

impl JobAttributes {
    pub fn job_name(&self) -> &str {
        self.0.text(AttributeKind::JobName).unwrap_or_default()
    }

    pub fn originating_user(&self) -> &str {
        self.0.text(AttributeKind::JobOriginatingUserName).unwrap_or_default()
    }

    pub fn copies(&self) -> u32 {
        match self.0.get(AttributeKind::Copies) {
            Some(Attribute::Copies(n)) => *n,
            _ => 1,
        }
    }
}

impl From<AttributeSet> for JobAttributes {
    fn from(set: AttributeSet) -> Self {
        Self(Arc::new(set))
    }
}

impl Deref for JobAttributes {
    type Target = AttributeSet;

    fn deref(&self) -> &AttributeSet {
        &self.0
    }
}

/// Values the submitting process contributes to every job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobEnvironment {
    pub user_name: Option<String>,
}

impl JobEnvironment {
    /// Reads the login name of the current process from `USER`/`USERNAME`.
    pub fn from_system() -> Self {
        let user_name = ["USER", "USERNAME"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|value| !value.trim().is_empty());
        Self { user_name }
    }

    pub fn with_user(user_name: impl Into<String>) -> Self {
        Self {
            user_name: Some(user_name.into()),
        }
    }
}

/// Builds the job attribute set for one submission.
///
/// Priority, lowest first: derived environment values, document attributes,
/// request attributes. A job name or originating user the caller supplied is
/// kept as-is; otherwise it is derived:
///
/// * job name: the document name, else the URL of a URL payload, else
///   [`DEFAULT_JOB_NAME`];
/// * originating user: the environment user, else the requesting user name,
///   else the empty string.
pub fn merge_job_attributes(
    document: &dyn Document,
    request: Option<&AttributeSet>,
    environment: &JobEnvironment,
) -> AttributeSet {
    let mut merged = AttributeSet::new();
    if let Some(doc_attributes) = document.attributes() {
        merged.add_all(doc_attributes);
    }
    if let Some(request) = request {
        merged.add_all(request);
    }

    if !has_text(&merged, AttributeKind::JobName) {
        let job_name = match merged.text(AttributeKind::DocumentName) {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => match document.payload() {
                Payload::Url(url) => url.clone(),
                _ => DEFAULT_JOB_NAME.to_string(),
            },
        };
        merged.add(Attribute::JobName(job_name));
    }

    if !has_text(&merged, AttributeKind::JobOriginatingUserName) {
        let user = environment
            .user_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| merged.text(AttributeKind::RequestingUserName))
            .unwrap_or_default()
            .to_string();
        merged.add(Attribute::JobOriginatingUserName(user));
    }

    merged
}

fn has_text(set: &AttributeSet, kind: AttributeKind) -> bool {
    set.text(kind).is_some_and(|value| !value.trim().is_empty())
}
