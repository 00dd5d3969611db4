use std::collections::HashSet;

use tracing::{debug, warn};

use crate::actions::ShortlistOp;
use crate::api::ApiError;
use crate::models::{JobApplication, JobId, UserId};

type ApplicationKey = (UserId, JobId);

/// Applications reconciled through one merge keyed by (employee, job).
///
/// A fetched list is authoritative. Entries recorded locally after a
/// successful apply survive refreshes until a fetched list contains them.
#[derive(Debug, Clone, Default)]
pub struct Applications {
    entries: Vec<JobApplication>,
    unconfirmed: HashSet<ApplicationKey>,
    loading: bool,
    error: Option<String>,
    generation: u64,
}

impl Applications {
    pub fn entries(&self) -> &[JobApplication] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_applied(&self, job_id: JobId) -> bool {
        self.entries.iter().any(|app| app.job_id == job_id)
    }

    /// Adds a locally built application. Returns false if one with the same
    /// key is already present.
    pub fn record(&mut self, application: JobApplication) -> bool {
        let key = application.key();
        if self.entries.iter().any(|app| app.key() == key) {
            return false;
        }
        self.unconfirmed.insert(key);
        self.entries.push(application);
        true
    }

    pub fn begin_refresh(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }

    pub fn finish_refresh(
        &mut self,
        generation: u64,
        result: Result<Vec<JobApplication>, ApiError>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.loading = false;
        match result {
            Ok(fetched) => {
                self.merge(fetched);
                self.error = None;
            }
            Err(err) => {
                warn!("Failed to fetch applications: {}", err);
                self.error = Some(format!(
                    "Failed to load applications: {}",
                    err.user_message()
                ));
            }
        }
        true
    }

    fn merge(&mut self, fetched: Vec<JobApplication>) {
        let mut merged: Vec<JobApplication> = Vec::with_capacity(fetched.len());
        for app in fetched {
            if !merged.iter().any(|existing| existing.key() == app.key()) {
                merged.push(app);
            }
        }

        let confirmed: HashSet<ApplicationKey> = merged.iter().map(|app| app.key()).collect();
        self.unconfirmed.retain(|key| !confirmed.contains(key));

        let pending: Vec<JobApplication> = self
            .entries
            .drain(..)
            .filter(|app| self.unconfirmed.contains(&app.key()))
            .collect();
        if !pending.is_empty() {
            debug!("Keeping {} unconfirmed application(s)", pending.len());
        }
        merged.extend(pending);
        self.entries = merged;
    }
}

/// Ids of shortlisted jobs, fetched once per login and then kept in step by
/// the toggle.
#[derive(Debug, Clone, Default)]
pub struct Shortlist {
    ids: HashSet<JobId>,
}

impl Shortlist {
    pub fn contains(&self, job_id: JobId) -> bool {
        self.ids.contains(&job_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn replace(&mut self, ids: impl IntoIterator<Item = JobId>) {
        self.ids = ids.into_iter().collect();
    }

    /// The operation a toggle on `job_id` performs.
    pub fn toggle_op(&self, job_id: JobId) -> ShortlistOp {
        if self.contains(job_id) {
            ShortlistOp::Remove
        } else {
            ShortlistOp::Add
        }
    }

    pub fn apply(&mut self, op: ShortlistOp, job_id: JobId) {
        match op {
            ShortlistOp::Add => self.ids.insert(job_id),
            ShortlistOp::Remove => self.ids.remove(&job_id),
        };
    }
}
