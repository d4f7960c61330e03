use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// Election title.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// First instant at which votes are accepted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    /// Last instant at which votes are accepted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
}

/// Where a point in time falls relative to an election's voting window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WindowPosition {
    NotStarted,
    Open,
    Closed,
}

impl ElectionCore {
    /// Locate `now` relative to the voting window. Both ends are inclusive.
    pub fn window_position(&self, now: DateTime<Utc>) -> WindowPosition {
        if now < self.start_time {
            WindowPosition::NotStarted
        } else if now > self.end_time {
            WindowPosition::Closed
        } else {
            WindowPosition::Open
        }
    }

    /// Is the election accepting votes at `now`?
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.window_position(now) == WindowPosition::Open
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Election {
    /// Attach a fresh ID to a new election.
    pub fn from_new(election: NewElection) -> Self {
        Self {
            id: Id::new(),
            election,
        }
    }
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}
