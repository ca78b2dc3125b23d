//! Event handlers of the review surface.
//!
//! Components register their handlers on a [`HandlerRegistry`] built at
//! startup. [`HandlerRegistry::attach`] consumes the registry and returns the
//! [`Dispatcher`] that the front end drives, so nothing can register once
//! events start flowing.

use crate::data_loading::DaySource;
use crate::day_window::DayWindow;
use crate::file_manager::FileManager;
use crate::minor_files::StatusKind;
use anyhow::Result;
use log::{debug, info};

/// State shared by every handler for one subject.
pub struct Session {
    pub file_manager: FileManager,
    pub recording: Box<dyn DaySource>,
}

impl Session {
    pub fn new(file_manager: FileManager, recording: Box<dyn DaySource>) -> Self {
        Self {
            file_manager,
            recording,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadFiles { evaluator: Option<String> },
    /// A day was picked; `range` overrides the stored sleep window.
    DaySelected { day: usize, range: Option<[i64; 2]> },
    RangeCommitted { day: usize, range: [i64; 2] },
    SwitchToggled { day: usize, kind: StatusKind, on: bool },
    CompletionChecked { done: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    LoadFiles,
    DaySelected,
    RangeCommitted,
    SwitchToggled,
    CompletionChecked,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::LoadFiles { .. } => EventKind::LoadFiles,
            Event::DaySelected { .. } => EventKind::DaySelected,
            Event::RangeCommitted { .. } => EventKind::RangeCommitted,
            Event::SwitchToggled { .. } => EventKind::SwitchToggled,
            Event::CompletionChecked { .. } => EventKind::CompletionChecked,
        }
    }
}

/// Onset, offset and duration text shown under the plot, plus the slider
/// position they correspond to.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepLabels {
    pub onset: String,
    pub offset: String,
    pub duration: String,
    pub slider: [i64; 2],
}

#[derive(Debug, Clone)]
pub enum Reply {
    Loaded {
        identifier: String,
        days: usize,
        dst_warning: Option<String>,
    },
    MissingEvaluator,
    Figure(Box<DayWindow>),
    SleepLabels(SleepLabels),
    Switches {
        multiple_sleep: bool,
        missing_sleep: bool,
        review_night: bool,
    },
    Toggled {
        kind: StatusKind,
        day: usize,
        on: bool,
    },
    Completion {
        done: bool,
    },
}

pub type Handler = Box<dyn Fn(&Session, &Event) -> Result<Option<Reply>>>;

/// Wraps `handler` so each call is logged with its registered name. The
/// wrapped handler's result is returned unchanged.
pub fn logged<F>(name: &'static str, handler: F) -> Handler
where
    F: Fn(&Session, &Event) -> Result<Option<Reply>> + 'static,
{
    Box::new(move |session, event| {
        info!("Calling handler: {}", name);
        handler(session, event)
    })
}

struct Registration {
    name: &'static str,
    kind: EventKind,
    handler: Handler,
}

#[derive(Default)]
pub struct HandlerRegistry {
    registrations: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, kind: EventKind, handler: F)
    where
        F: Fn(&Session, &Event) -> Result<Option<Reply>> + 'static,
    {
        debug!("Registering handler: {}", name);
        self.registrations.push(Registration {
            name,
            kind,
            handler: logged(name, handler),
        });
    }

    pub fn attach(self) -> Dispatcher {
        for registration in &self.registrations {
            debug!("Attaching handler: {}", registration.name);
        }
        Dispatcher {
            registrations: self.registrations,
        }
    }
}

pub struct Dispatcher {
    registrations: Vec<Registration>,
}

impl Dispatcher {
    /// Runs every handler subscribed to the event, in registration order, and
    /// collects their replies.
    pub fn dispatch(&self, session: &Session, event: &Event) -> Result<Vec<Reply>> {
        let kind = event.kind();
        let mut replies = Vec::new();
        for registration in self.registrations.iter().filter(|r| r.kind == kind) {
            if let Some(reply) = (registration.handler)(session, event)? {
                replies.push(reply);
            }
        }
        Ok(replies)
    }

    pub fn handler_names(&self, kind: EventKind) -> Vec<&'static str> {
        self.registrations
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| r.name)
            .collect()
    }
}
