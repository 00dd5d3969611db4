use std::collections::{HashMap, VecDeque};

use chrono::Local;
use tracing::{info, warn};

use crate::actions::{JobActions, Panel, ShortlistOp};
use crate::api::{ApiError, ApplyOutcome};
use crate::applications::{Applications, Shortlist};
use crate::dispatch::{Command, Completion};
use crate::filters::{FilterField, FilterState};
use crate::forms::{
    company_options, location_options, resolve_option, FormError, PostJobForm,
};
use crate::listing::JobListing;
use crate::loadable::Loadable;
use crate::models::{
    ApplicationStatus, Company, CompanyStats, Job, JobApplication, JobId, Location,
    LocationSalary, LocationStats, Role, SalaryMetric, ShortlistRatio, UserId, UserProfile,
};
use crate::pagination::Pagination;
use crate::view::Tab;

pub const SALARY_ROWS_PER_PAGE: usize = 10;

/// Analysis tab state.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub salary_metric: SalaryMetric,
    pub salaries: Loadable<Vec<LocationSalary>>,
    pub salary_pages: Pagination,
    pub location_stats: Loadable<LocationStats>,
    pub company_stats: Loadable<CompanyStats>,
    pub shortlist_ratio: Loadable<Vec<ShortlistRatio>>,
    pub city_input: String,
    pub company_input: String,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            salary_metric: SalaryMetric::Min,
            salaries: Loadable::default(),
            salary_pages: Pagination::new(SALARY_ROWS_PER_PAGE),
            location_stats: Loadable::default(),
            company_stats: Loadable::default(),
            shortlist_ratio: Loadable::default(),
            city_input: String::new(),
            company_input: String::new(),
        }
    }
}

impl Analysis {
    /// The salary rows on the current table page.
    pub fn salary_rows(&self) -> &[LocationSalary] {
        let Some(rows) = self.salaries.data() else {
            return &[];
        };
        let start = (self.salary_pages.current_page() * SALARY_ROWS_PER_PAGE).min(rows.len());
        let end = (start + SALARY_ROWS_PER_PAGE).min(rows.len());
        &rows[start..end]
    }
}

// Created from a verified login and dropped whole on sign-out.
#[derive(Debug)]
pub struct Session {
    profile: UserProfile,
    user_id: UserId,
    role: Role,
    filters: FilterState,
    listing: JobListing,
    actions: JobActions,
    applications: Applications,
    shortlist: Shortlist,
    shortlisted_jobs: Loadable<Vec<Job>>,
    recommendations: HashMap<JobId, Loadable<Vec<Job>>>,
    applicants: Loadable<Vec<JobApplication>>,
    analysis: Analysis,
    pub post_job: PostJobForm,
    alerts: VecDeque<String>,
}

impl Session {
    pub fn new(profile: UserProfile, user_id: UserId, role: Role, page_size: usize) -> Self {
        Self {
            profile,
            user_id,
            role,
            filters: FilterState::default(),
            listing: JobListing::new(page_size),
            actions: JobActions::default(),
            applications: Applications::default(),
            shortlist: Shortlist::default(),
            shortlisted_jobs: Loadable::default(),
            recommendations: HashMap::new(),
            applicants: Loadable::default(),
            analysis: Analysis::default(),
            post_job: PostJobForm::default(),
            alerts: VecDeque::new(),
        }
    }

    // --- Accessors ---

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn listing(&self) -> &JobListing {
        &self.listing
    }

    pub fn actions(&self) -> &JobActions {
        &self.actions
    }

    pub fn applications(&self) -> &Applications {
        &self.applications
    }

    pub fn shortlist(&self) -> &Shortlist {
        &self.shortlist
    }

    pub fn shortlisted_jobs(&self) -> &Loadable<Vec<Job>> {
        &self.shortlisted_jobs
    }

    pub fn recommendations(&self, job_id: JobId) -> Option<&Loadable<Vec<Job>>> {
        self.recommendations.get(&job_id)
    }

    pub fn applicants(&self) -> &Loadable<Vec<JobApplication>> {
        &self.applicants
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn analysis_mut(&mut self) -> &mut Analysis {
        &mut self.analysis
    }

    pub fn has_applied(&self, job_id: JobId) -> bool {
        self.applications.has_applied(job_id)
    }

    // --- Alerts ---

    pub fn alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    pub fn dismiss_alert(&mut self) {
        self.alerts.pop_front();
    }

    fn push_alert(&mut self, message: impl Into<String>) {
        self.alerts.push_back(message.into());
    }

    // --- Lifecycle ---

    /// Work to do right after login.
    pub fn start(&mut self) -> Command {
        info!("Session started for user {} ({})", self.user_id, self.role.as_str());
        match self.role {
            Role::Employee => Command::batch([
                self.fetch_page(0),
                self.refresh_applications(),
                Command::LoadShortlistIds {
                    employee_id: self.user_id,
                },
            ]),
            Role::Employer => Command::None,
        }
    }

    pub fn activate_tab(&mut self, tab: Tab) -> Command {
        match tab {
            Tab::Jobs if self.listing.jobs().is_empty() && !self.listing.is_loading() => {
                self.fetch_page(self.listing.pagination().current_page())
            }
            Tab::Applications => self.refresh_applications(),
            Tab::Shortlist => Command::LoadShortlistedJobs {
                generation: self.shortlisted_jobs.begin(),
                employee_id: self.user_id,
            },
            Tab::Applicants => self.refresh_applicants(),
            Tab::Analysis => {
                let salaries = if self.analysis.salaries.data().is_none() {
                    self.load_salaries()
                } else {
                    Command::None
                };
                let ratio = match self.role {
                    Role::Employer => Command::LoadShortlistRatio {
                        generation: self.analysis.shortlist_ratio.begin(),
                        employer_id: self.user_id,
                    },
                    Role::Employee => Command::None,
                };
                Command::batch([salaries, ratio])
            }
            _ => Command::None,
        }
    }

    fn viewer(&self) -> Option<UserId> {
        match self.role {
            Role::Employee => Some(self.user_id),
            Role::Employer => None,
        }
    }

    // --- Filters and paging ---

    /// Edits a filter input. Any change collapses the panels of the jobs on
    /// screen.
    pub fn set_filter_input(&mut self, field: FilterField, value: impl Into<String>) {
        if self.filters.set_input(field, value) {
            self.actions.collapse_all();
        }
    }

    pub fn search(&mut self, locations: &[Location], companies: &[Company]) -> Command {
        if let Err(err) = self.filters.commit(locations, companies) {
            self.push_alert(err.to_string());
            return Command::None;
        }
        self.listing.clear();
        self.actions.collapse_all();
        self.fetch_page(0)
    }

    pub fn reset_filters(&mut self) -> Command {
        self.filters.reset();
        self.listing.clear();
        self.actions.collapse_all();
        self.fetch_page(0)
    }

    pub fn fetch_page(&mut self, page: usize) -> Command {
        let viewer = self.viewer();
        let request = self.listing.begin_fetch(page, self.filters.committed(), viewer);
        Command::FetchPage {
            generation: request.generation,
            query: request.query,
        }
    }

    pub fn next_page(&mut self) -> Command {
        match self.listing.pagination().next_page() {
            Some(page) => self.fetch_page(page),
            None => Command::None,
        }
    }

    pub fn prev_page(&mut self) -> Command {
        match self.listing.pagination().prev_page() {
            Some(page) => self.fetch_page(page),
            None => Command::None,
        }
    }

    pub fn go_to_page(&mut self, page: usize) -> Command {
        if page >= self.listing.pagination().total_pages() {
            return Command::None;
        }
        self.fetch_page(page)
    }

    /// Jumps to a page typed by the user, counting from 1.
    pub fn go_to_page_input(&mut self, text: &str) -> Command {
        let total = self.listing.pagination().total_pages();
        match text.trim().parse::<usize>() {
            Ok(page) if (1..=total).contains(&page) => self.go_to_page(page - 1),
            _ if total == 0 => Command::None,
            _ => {
                self.push_alert(format!("Enter a page number between 1 and {}", total));
                Command::None
            }
        }
    }

    pub fn refresh_jobs(&mut self) -> Command {
        self.fetch_page(self.listing.pagination().current_page())
    }

    // --- Per-job actions ---

    pub fn apply(&mut self, job_id: JobId) -> Command {
        if self.role != Role::Employee {
            self.push_alert("Only job seekers can apply for jobs");
            return Command::None;
        }
        if self.has_applied(job_id) {
            self.push_alert("You have already applied for this job");
            return Command::None;
        }
        if !self.actions.start_apply(job_id) {
            return Command::None;
        }
        Command::Apply {
            employee_id: self.user_id,
            job_id,
        }
    }

    pub fn toggle_shortlist(&mut self, job_id: JobId) -> Command {
        if !self.actions.start_shortlist(job_id) {
            return Command::None;
        }
        Command::Shortlist {
            op: self.shortlist.toggle_op(job_id),
            employee_id: self.user_id,
            job_id,
        }
    }

    pub fn dislike(&mut self, job_id: JobId) -> Command {
        if !self.actions.start_dislike(job_id) {
            return Command::None;
        }
        Command::Dislike {
            employee_id: self.user_id,
            job_id,
        }
    }

    pub fn toggle_details(&mut self, job_id: JobId) {
        self.actions.toggle_panel(job_id, Panel::Details);
    }

    /// Opens or closes the recommendations panel, fetching them the first
    /// time (or again after a failure).
    pub fn toggle_recommendations(&mut self, job_id: JobId) -> Command {
        if self.actions.toggle_panel(job_id, Panel::Recommendations).is_none() {
            return Command::None;
        }
        let entry = self.recommendations.entry(job_id).or_default();
        if entry.loading || (entry.data().is_some() && entry.error.is_none()) {
            return Command::None;
        }
        Command::LoadRecommendations {
            generation: entry.begin(),
            job_id,
            user_id: self.user_id,
        }
    }

    // --- Applications ---

    pub fn refresh_applications(&mut self) -> Command {
        if self.role != Role::Employee {
            return Command::None;
        }
        Command::LoadApplications {
            generation: self.applications.begin_refresh(),
            employee_id: self.user_id,
        }
    }

    pub fn refresh_applicants(&mut self) -> Command {
        Command::LoadApplicants {
            generation: self.applicants.begin(),
        }
    }

    pub fn change_applicant_status(
        &mut self,
        employee_id: UserId,
        job_id: JobId,
        status: ApplicationStatus,
    ) -> Command {
        Command::ChangeStatus {
            employee_id,
            job_id,
            status,
        }
    }

    // --- Employer ---

    pub fn submit_post_job(&mut self, locations: &[Location]) -> Command {
        match self.post_job.validate(locations) {
            Ok(job) => Command::PostJob {
                employer_id: self.user_id,
                job,
            },
            Err(err) => {
                self.push_alert(err.to_string());
                Command::None
            }
        }
    }

    // --- Analysis ---

    fn load_salaries(&mut self) -> Command {
        self.analysis.salary_pages.reset();
        Command::LoadSalaries {
            generation: self.analysis.salaries.begin(),
            metric: self.analysis.salary_metric,
        }
    }

    pub fn set_salary_metric(&mut self, metric: SalaryMetric) -> Command {
        self.analysis.salary_metric = metric;
        self.load_salaries()
    }

    pub fn toggle_salary_metric(&mut self) -> Command {
        let metric = match self.analysis.salary_metric {
            SalaryMetric::Min => SalaryMetric::Max,
            SalaryMetric::Max => SalaryMetric::Min,
        };
        self.set_salary_metric(metric)
    }

    pub fn next_salary_page(&mut self) {
        if let Some(page) = self.analysis.salary_pages.next_page() {
            self.analysis.salary_pages.set_current(page);
        }
    }

    pub fn prev_salary_page(&mut self) {
        if let Some(page) = self.analysis.salary_pages.prev_page() {
            self.analysis.salary_pages.set_current(page);
        }
    }

    pub fn load_location_stats(&mut self, locations: &[Location]) -> Command {
        let city = resolve_option(&location_options(locations), &self.analysis.city_input, "location");
        match city {
            Ok(city_id) => Command::LoadLocationStats {
                generation: self.analysis.location_stats.begin(),
                city_id,
            },
            Err(err) => self.form_error(err),
        }
    }

    pub fn load_company_stats(&mut self, companies: &[Company]) -> Command {
        let company = resolve_option(&company_options(companies), &self.analysis.company_input, "company");
        match company {
            Ok(company_id) => Command::LoadCompanyStats {
                generation: self.analysis.company_stats.begin(),
                company_id,
            },
            Err(err) => self.form_error(err),
        }
    }

    fn form_error(&mut self, err: FormError) -> Command {
        self.push_alert(err.to_string());
        Command::None
    }

    // --- Profile ---

    pub fn update_resume(&mut self, resume_url: &str) -> Command {
        let resume_url = resume_url.trim();
        if resume_url.is_empty() {
            self.push_alert("Please enter a resume URL");
            return Command::None;
        }
        Command::UpdateResume {
            user_id: self.user_id,
            resume_url: resume_url.to_string(),
        }
    }

    // --- Completions ---

    /// Folds a finished request into the session. Returns any follow-up
    /// work.
    pub fn apply_completion(&mut self, completion: Completion) -> Command {
        match completion {
            Completion::Page { generation, result } => {
                self.listing.finish_page(generation, result);
            }
            Completion::Count { generation, result } => {
                self.listing.finish_count(generation, result);
            }
            Completion::Applications { generation, result } => {
                self.applications.finish_refresh(generation, result);
            }
            Completion::ShortlistIds(result) => match result {
                Ok(jobs) => self.shortlist.replace(jobs.iter().map(|job| job.job_id)),
                Err(err) => warn!("Failed to fetch shortlist: {}", err),
            },
            Completion::ShortlistedJobs { generation, result } => {
                self.shortlisted_jobs.finish(generation, result, "shortlisted jobs");
            }
            Completion::Applied {
                employee_id,
                job_id,
                result,
            } => self.finish_apply(employee_id, job_id, result),
            Completion::Shortlisted { op, job_id, result } => {
                self.finish_shortlist(op, job_id, result)
            }
            Completion::Disliked { job_id, result } => {
                self.actions.finish_dislike(job_id);
                match result {
                    Ok(()) => {
                        self.listing.remove_job(job_id);
                    }
                    Err(err) => {
                        warn!("Dislike of job {} failed: {}", job_id, err);
                        self.push_alert(format!("Failed to dislike job: {}", err.user_message()));
                    }
                }
            }
            Completion::Recommendations {
                generation,
                job_id,
                result,
            } => {
                if let Some(entry) = self.recommendations.get_mut(&job_id) {
                    entry.finish(generation, result, "recommendations");
                }
            }
            Completion::JobPosted(result) => match result {
                Ok(_) => {
                    info!("Job '{}' posted", self.post_job.title.trim());
                    self.post_job = PostJobForm::default();
                    self.push_alert("Job posted successfully!");
                }
                Err(err) => {
                    warn!("Posting job failed: {}", err);
                    self.push_alert("Failed to post job. Please try again.");
                }
            },
            Completion::Applicants { generation, result } => {
                self.applicants.finish(generation, result, "applicants");
            }
            Completion::StatusChanged {
                employee_id,
                job_id,
                status,
                result,
            } => match result {
                Ok(_) => {
                    self.push_alert(format!("Application status updated to {}", status));
                    return self.refresh_applicants();
                }
                Err(err) => {
                    warn!(
                        "Status change for ({}, {}) failed: {}",
                        employee_id, job_id, err
                    );
                    self.push_alert(format!(
                        "Failed to update application status: {}",
                        err.user_message()
                    ));
                }
            },
            Completion::Salaries { generation, result } => {
                if self.analysis.salaries.finish(generation, result, "salary statistics") {
                    let rows = self.analysis.salaries.data().map_or(0, Vec::len);
                    self.analysis.salary_pages.set_total(rows as u64);
                }
            }
            Completion::LocationStats { generation, result } => {
                self.analysis
                    .location_stats
                    .finish(generation, result, "location statistics");
            }
            Completion::CompanyStats { generation, result } => {
                self.analysis
                    .company_stats
                    .finish(generation, result, "company statistics");
            }
            Completion::ShortlistRatio { generation, result } => {
                self.analysis
                    .shortlist_ratio
                    .finish(generation, result, "shortlist ratios");
            }
            Completion::ResumeUpdated { resume_url, result } => match result {
                Ok(_) => {
                    self.profile.resume_url = Some(resume_url);
                    self.push_alert("Resume URL updated successfully");
                }
                Err(err) => {
                    warn!("Resume update failed: {}", err);
                    self.push_alert("Failed to update resume URL");
                }
            },
            Completion::Locations(_)
            | Completion::Companies(_)
            | Completion::LoggedIn { .. }
            | Completion::SignedUp { .. } => {}
        }
        Command::None
    }

    fn finish_apply(
        &mut self,
        employee_id: UserId,
        job_id: JobId,
        result: Result<ApplyOutcome, ApiError>,
    ) {
        self.actions.finish_apply(job_id);
        match result {
            Ok(ApplyOutcome::Applied) => {
                let job = self.listing.job(job_id);
                let application = JobApplication {
                    employee_id,
                    job_id,
                    application_date: Some(Local::now().format("%Y-%m-%d").to_string()),
                    status: ApplicationStatus::Pending,
                    job_title: job.map(|j| j.title.clone()),
                    company_name: job.map(|j| j.company_name.clone()),
                    employee_name: Some(self.profile.user_name.clone()),
                };
                if self.applications.record(application) {
                    self.listing.increment_apply_count(job_id);
                }
                info!("Applied to job {}", job_id);
                self.push_alert("Application submitted successfully!");
            }
            Ok(ApplyOutcome::AlreadyApplied) => {
                self.push_alert("You have already applied for this job");
            }
            Err(err) => {
                warn!("Apply to job {} failed: {}", job_id, err);
                self.push_alert("Failed to apply for the job. Please try again.");
            }
        }
    }

    fn finish_shortlist(&mut self, op: ShortlistOp, job_id: JobId, result: Result<(), ApiError>) {
        self.actions.finish_shortlist(job_id);
        match result {
            Ok(()) => {
                self.shortlist.apply(op, job_id);
                self.listing.adjust_shortlist_count(job_id, op.delta());
                if op == ShortlistOp::Remove {
                    if let Some(jobs) = self.shortlisted_jobs.data.as_mut() {
                        jobs.retain(|job| job.job_id != job_id);
                    }
                }
            }
            Err(err) => {
                warn!("Shortlist {:?} for job {} failed: {}", op, job_id, err);
                let message = match op {
                    ShortlistOp::Add => "Failed to add job to shortlist",
                    ShortlistOp::Remove => "Failed to remove job from shortlist",
                };
                self.push_alert(message);
            }
        }
    }
}
