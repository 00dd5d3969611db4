use std::collections::{HashMap, HashSet};

use crate::models::JobId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Details,
    Recommendations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortlistOp {
    Add,
    Remove,
}

impl ShortlistOp {
    pub fn delta(self) -> i32 {
        match self {
            ShortlistOp::Add => 1,
            ShortlistOp::Remove => -1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobActions {
    applying: HashSet<JobId>,
    shortlisting: HashSet<JobId>,
    disliking: HashSet<JobId>,
    panels: HashMap<JobId, Panel>,
}

impl JobActions {
    /// Marks `job_id` as applying. Returns false if an application for it is
    /// already in flight.
    pub fn start_apply(&mut self, job_id: JobId) -> bool {
        self.applying.insert(job_id)
    }

    pub fn finish_apply(&mut self, job_id: JobId) {
        self.applying.remove(&job_id);
    }

    pub fn is_applying(&self, job_id: JobId) -> bool {
        self.applying.contains(&job_id)
    }

    pub fn start_shortlist(&mut self, job_id: JobId) -> bool {
        self.shortlisting.insert(job_id)
    }

    pub fn finish_shortlist(&mut self, job_id: JobId) {
        self.shortlisting.remove(&job_id);
    }

    pub fn is_shortlisting(&self, job_id: JobId) -> bool {
        self.shortlisting.contains(&job_id)
    }

    pub fn start_dislike(&mut self, job_id: JobId) -> bool {
        self.disliking.insert(job_id)
    }

    pub fn finish_dislike(&mut self, job_id: JobId) {
        self.disliking.remove(&job_id);
        self.panels.remove(&job_id);
    }

    pub fn is_disliking(&self, job_id: JobId) -> bool {
        self.disliking.contains(&job_id)
    }

    pub fn panel(&self, job_id: JobId) -> Option<Panel> {
        self.panels.get(&job_id).copied()
    }

    /// Opens `panel` for the job, replacing the other one, or closes it if it
    /// is already open. Returns the panel now showing.
    pub fn toggle_panel(&mut self, job_id: JobId, panel: Panel) -> Option<Panel> {
        if self.panels.get(&job_id) == Some(&panel) {
            self.panels.remove(&job_id);
            None
        } else {
            self.panels.insert(job_id, panel);
            Some(panel)
        }
    }

    pub fn collapse_all(&mut self) {
        self.panels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_markers_are_per_job() {
        let mut actions = JobActions::default();
        assert!(actions.start_shortlist(1));
        assert!(!actions.start_shortlist(1));
        assert!(actions.start_shortlist(2));
        actions.finish_shortlist(1);
        assert!(!actions.is_shortlisting(1));
        assert!(actions.is_shortlisting(2));

        assert!(actions.start_apply(1));
        assert!(actions.is_applying(1));
        actions.finish_apply(1);
        assert!(!actions.is_applying(1));
    }

    #[test]
    fn test_panels_exclusive_per_job_independent_across_jobs() {
        let mut actions = JobActions::default();
        assert_eq!(actions.toggle_panel(1, Panel::Details), Some(Panel::Details));
        assert_eq!(
            actions.toggle_panel(1, Panel::Recommendations),
            Some(Panel::Recommendations)
        );
        assert_eq!(actions.panel(1), Some(Panel::Recommendations));

        actions.toggle_panel(2, Panel::Details);
        assert_eq!(actions.panel(1), Some(Panel::Recommendations));
        assert_eq!(actions.panel(2), Some(Panel::Details));

        assert_eq!(actions.toggle_panel(2, Panel::Details), None);
        assert_eq!(actions.panel(2), None);

        actions.collapse_all();
        assert_eq!(actions.panel(1), None);
    }

    #[test]
    fn test_finish_dislike_drops_panel() {
        let mut actions = JobActions::default();
        actions.toggle_panel(42, Panel::Details);
        actions.start_dislike(42);
        actions.finish_dislike(42);
        assert!(!actions.is_disliking(42));
        assert_eq!(actions.panel(42), None);
    }
}
