use tracing::{debug, warn};

use crate::api::{ApiError, JobQuery};
use crate::filters::FilterCriteria;
use crate::models::{Job, JobId, UserId};
use crate::pagination::Pagination;

/// Work for one page navigation: a search request and a count request, both
/// tagged with the same generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub generation: u64,
    pub query: JobQuery,
}

#[derive(Debug, Clone, Default)]
pub struct JobListing {
    jobs: Vec<Job>,
    pagination: Pagination,
    loading: bool,
    error: Option<String>,
    generation: u64,
    // page asked for by the in-flight fetch; the cursor moves only once it loads
    requested_page: usize,
}

impl JobListing {
    pub fn new(page_size: usize) -> Self {
        Self {
            pagination: Pagination::new(page_size),
            ..Default::default()
        }
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn job(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.job_id == job_id)
    }

    /// Builds the request for `page`. Any response from an earlier fetch is
    /// discarded from now on.
    pub fn begin_fetch(
        &mut self,
        page: usize,
        filters: &FilterCriteria,
        viewer: Option<UserId>,
    ) -> PageRequest {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.requested_page = page;
        debug!("Fetching page {} (generation {})", page, self.generation);
        PageRequest {
            generation: self.generation,
            query: JobQuery {
                filters: filters.clone(),
                page,
                page_size: self.pagination.page_size(),
                user_id: viewer,
            },
        }
    }

    /// Replaces the visible jobs with a fetched page and moves the cursor to
    /// it. A failed fetch keeps both the old rows and the old cursor. Returns
    /// false for a stale response.
    pub fn finish_page(&mut self, generation: u64, result: Result<Vec<Job>, ApiError>) -> bool {
        if generation != self.generation {
            debug!("Dropping stale page (generation {} < {})", generation, self.generation);
            return false;
        }
        self.loading = false;
        match result {
            Ok(jobs) => {
                self.jobs = jobs;
                self.error = None;
                self.pagination.set_current(self.requested_page);
            }
            Err(err) => {
                warn!("Job search failed: {}", err);
                self.error = Some(format!("Failed to load jobs: {}", err.user_message()));
            }
        }
        true
    }

    /// Records the total count. A failed count is logged and leaves the old
    /// total in place.
    pub fn finish_count(&mut self, generation: u64, result: Result<u64, ApiError>) -> bool {
        if generation != self.generation {
            return false;
        }
        match result {
            Ok(total) => self.pagination.set_total(total),
            Err(err) => warn!("Job count failed: {}", err),
        }
        true
    }

    pub fn remove_job(&mut self, job_id: JobId) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.job_id == job_id)?;
        Some(self.jobs.remove(index))
    }

    pub fn increment_apply_count(&mut self, job_id: JobId) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.job_id == job_id) {
            job.apply_count = Some(job.apply_count.unwrap_or(0) + 1);
        }
    }

    /// Adds `delta` to the local shortlist counter, never going below zero.
    pub fn adjust_shortlist_count(&mut self, job_id: JobId, delta: i32) {
        if let Some(job) = self.jobs.iter_mut().find(|job| job.job_id == job_id) {
            let current = job.shortlist_count.unwrap_or(0) as i64;
            job.shortlist_count = Some((current + delta as i64).max(0) as u32);
        }
    }

    /// Empties the visible list ahead of a new search.
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.error = None;
        self.requested_page = 0;
        self.pagination.reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::WorkType;

    pub(crate) fn job(job_id: JobId) -> Job {
        Job {
            job_id,
            title: format!("Job {}", job_id),
            description: "Does things".to_string(),
            min_salary: 50.0,
            max_salary: 80.0,
            work_type: WorkType::FullTime,
            city_name: "Ottawa".to_string(),
            country_name: Some("Canada".to_string()),
            company_name: "Acme".to_string(),
            is_active: true,
            post_date: None,
            apply_count: None,
            dislike_count: None,
            shortlist_count: Some(1),
        }
    }

    #[test]
    fn test_fetch_requests_page_with_committed_filters() {
        let mut listing = JobListing::new(75);
        let filters = FilterCriteria {
            city_id: Some(4),
            ..Default::default()
        };
        let request = listing.begin_fetch(2, &filters, Some(9));
        assert_eq!(request.query.page, 2);
        assert_eq!(request.query.page_size, 75);
        assert_eq!(request.query.filters, filters);
        assert_eq!(request.query.user_id, Some(9));
        assert!(listing.is_loading());
        assert_eq!(listing.pagination().current_page(), 0);

        listing.finish_page(request.generation, Ok(vec![job(1)]));
        assert_eq!(listing.pagination().current_page(), 2);
    }

    #[test]
    fn test_failed_page_keeps_cursor_and_rows() {
        let mut listing = JobListing::new(75);
        let filters = FilterCriteria::default();
        let first = listing.begin_fetch(0, &filters, None);
        listing.finish_page(first.generation, Ok((1..=75).map(job).collect()));
        listing.finish_count(first.generation, Ok(200));

        let second = listing.begin_fetch(1, &filters, None);
        listing.finish_page(
            second.generation,
            Err(ApiError::Status {
                url: "http://test/jobs/search".to_string(),
                status: 500,
                body: String::new(),
            }),
        );
        assert_eq!(listing.pagination().current_page(), 0);
        assert_eq!(listing.jobs()[0].job_id, 1);
        assert!(listing.error().is_some());
        assert_eq!(listing.pagination().next_page(), Some(1));
    }

    #[test]
    fn test_first_page_then_next() {
        let mut listing = JobListing::new(75);
        let filters = FilterCriteria::default();
        let request = listing.begin_fetch(0, &filters, None);
        let jobs: Vec<Job> = (1..=75).map(job).collect();
        assert!(listing.finish_page(request.generation, Ok(jobs)));
        assert!(listing.finish_count(request.generation, Ok(200)));
        assert_eq!(listing.pagination().total_pages(), 3);

        let next = listing.pagination().next_page().unwrap();
        let request = listing.begin_fetch(next, &filters, None);
        assert_eq!(request.query.page, 1);
        assert_eq!(request.query.page_size, 75);
    }

    #[test]
    fn test_stale_responses_are_dropped() {
        let mut listing = JobListing::new(75);
        let filters = FilterCriteria::default();
        let old = listing.begin_fetch(0, &filters, None);
        let new = listing.begin_fetch(1, &filters, None);

        assert!(listing.finish_page(new.generation, Ok(vec![job(2)])));
        assert!(!listing.finish_page(old.generation, Ok(vec![job(1)])));
        assert!(!listing.finish_count(old.generation, Ok(1)));
        assert_eq!(listing.jobs()[0].job_id, 2);
    }

    #[test]
    fn test_count_failure_keeps_page() {
        let mut listing = JobListing::new(75);
        let request = listing.begin_fetch(0, &FilterCriteria::default(), None);
        listing.finish_page(request.generation, Ok(vec![job(1)]));
        listing.finish_count(
            request.generation,
            Err(ApiError::Status {
                url: "http://test/jobs/count".to_string(),
                status: 500,
                body: String::new(),
            }),
        );
        assert_eq!(listing.jobs().len(), 1);
        assert!(listing.error().is_none());
    }

    #[test]
    fn test_counter_adjustments() {
        let mut listing = JobListing::new(75);
        let request = listing.begin_fetch(0, &FilterCriteria::default(), None);
        listing.finish_page(request.generation, Ok(vec![job(1), job(2)]));

        listing.increment_apply_count(1);
        assert_eq!(listing.job(1).unwrap().apply_count, Some(1));

        listing.adjust_shortlist_count(2, -1);
        listing.adjust_shortlist_count(2, -1);
        assert_eq!(listing.job(2).unwrap().shortlist_count, Some(0));
        listing.adjust_shortlist_count(2, 1);
        assert_eq!(listing.job(2).unwrap().shortlist_count, Some(1));

        assert_eq!(listing.remove_job(1).map(|j| j.job_id), Some(1));
        assert!(listing.remove_job(1).is_none());
        assert_eq!(listing.jobs().len(), 1);
    }
}
