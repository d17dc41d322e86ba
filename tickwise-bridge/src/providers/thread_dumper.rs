//! Thread selection for sampling.
//!
//! A [`ThreadDumper`] decides which threads a sample covers and reads their
//! latest state from the host's thread registry. It never signals or waits on
//! the sampled threads.

use std::fmt;
use std::thread::{self, ThreadId};

use regex::Regex;
use serde::Serialize;

use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadState {
    Running,
    Waiting,
    Blocked,
    Sleeping,
    Unknown,
}

/// Point-in-time view of one thread as recorded by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    /// Innermost frame first.
    pub frames: Vec<String>,
}

/// Describes a dumper for inclusion in profile metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThreadDumperMetadata {
    All,
    Specific { ids: Vec<String>, names: Vec<String> },
    Pattern { patterns: Vec<String> },
}

pub trait ThreadDumper: Send + Sync {
    fn is_thread_included(&self, id: ThreadId, name: &str) -> bool;

    fn metadata(&self) -> ThreadDumperMetadata;

    /// Snapshots of every included thread known to the host.
    fn dump_threads(&self, host: &dyn Host) -> Vec<ThreadSnapshot> {
        host.threads()
            .into_iter()
            .filter(|t| self.is_thread_included(t.id, &t.name))
            .collect()
    }
}

/// Includes every thread.
#[derive(Debug, Default, Clone)]
pub struct AllThreads;

impl ThreadDumper for AllThreads {
    fn is_thread_included(&self, _id: ThreadId, _name: &str) -> bool {
        true
    }

    fn metadata(&self) -> ThreadDumperMetadata {
        ThreadDumperMetadata::All
    }
}

/// Includes an explicit set of threads, matched by id or by exact name.
#[derive(Debug, Clone, Default)]
pub struct SpecificThreads {
    ids: Vec<ThreadId>,
    names: Vec<String>,
}

impl SpecificThreads {
    pub fn new(ids: Vec<ThreadId>, names: Vec<String>) -> Self {
        Self { ids, names }
    }

    /// Targets the calling thread. Used at enable to capture the game thread.
    pub fn current() -> Self {
        Self::for_thread(thread::current().id())
    }

    pub fn for_thread(id: ThreadId) -> Self {
        Self {
            ids: vec![id],
            names: Vec::new(),
        }
    }

    pub fn named(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            ids: Vec::new(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl ThreadDumper for SpecificThreads {
    fn is_thread_included(&self, id: ThreadId, name: &str) -> bool {
        self.ids.contains(&id) || self.names.iter().any(|n| n == name)
    }

    fn metadata(&self) -> ThreadDumperMetadata {
        ThreadDumperMetadata::Specific {
            ids: self.ids.iter().map(|id| format!("{:?}", id)).collect(),
            names: self.names.clone(),
        }
    }
}

/// Includes threads whose name matches any of a set of patterns (case-insensitive).
#[derive(Clone)]
pub struct PatternThreads {
    patterns: Vec<Regex>,
}

impl PatternThreads {
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Self, regex::Error> {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(&format!("(?i){}", p)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl fmt::Debug for PatternThreads {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternThreads")
            .field("patterns", &self.patterns.iter().map(Regex::as_str).collect::<Vec<_>>())
            .finish()
    }
}

impl ThreadDumper for PatternThreads {
    fn is_thread_included(&self, _id: ThreadId, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    fn metadata(&self) -> ThreadDumperMetadata {
        ThreadDumperMetadata::Pattern {
            patterns: self
                .patterns
                .iter()
                .map(|p| p.as_str().trim_start_matches("(?i)").to_string())
                .collect(),
        }
    }
}
