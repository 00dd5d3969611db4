use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::actions::ShortlistOp;
use crate::api::{ApiClient, ApiResult, ApplyOutcome, JobQuery};
use crate::models::{
    ApplicationStatus, Company, CompanyStats, Job, JobApplication, JobId, Location,
    LocationSalary, LocationStats, LoginRequest, NewJob, Role, SalaryMetric, ShortlistRatio,
    SignupRequest, UserId, UserProfile,
};

pub const DEFAULT_DISLIKE_DELAY: Duration = Duration::from_millis(400);

// State code never awaits. It returns a Command and the Dispatcher runs it,
// sending each Completion back tagged with the session serial that asked.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    None,
    Batch(Vec<Command>),
    LoadLocations,
    LoadCompanies,
    Login {
        role: Role,
        request: LoginRequest,
    },
    Signup {
        role: Role,
        request: SignupRequest,
    },
    /// Search and count for one page, issued together.
    FetchPage {
        generation: u64,
        query: JobQuery,
    },
    LoadApplications {
        generation: u64,
        employee_id: UserId,
    },
    LoadShortlistIds {
        employee_id: UserId,
    },
    LoadShortlistedJobs {
        generation: u64,
        employee_id: UserId,
    },
    Apply {
        employee_id: UserId,
        job_id: JobId,
    },
    Shortlist {
        op: ShortlistOp,
        employee_id: UserId,
        job_id: JobId,
    },
    Dislike {
        employee_id: UserId,
        job_id: JobId,
    },
    LoadRecommendations {
        generation: u64,
        job_id: JobId,
        user_id: UserId,
    },
    PostJob {
        employer_id: UserId,
        job: NewJob,
    },
    LoadApplicants {
        generation: u64,
    },
    ChangeStatus {
        employee_id: UserId,
        job_id: JobId,
        status: ApplicationStatus,
    },
    LoadSalaries {
        generation: u64,
        metric: SalaryMetric,
    },
    LoadLocationStats {
        generation: u64,
        city_id: i64,
    },
    LoadCompanyStats {
        generation: u64,
        company_id: i64,
    },
    LoadShortlistRatio {
        generation: u64,
        employer_id: UserId,
    },
    UpdateResume {
        user_id: UserId,
        resume_url: String,
    },
}

impl Command {
    pub fn batch(commands: impl IntoIterator<Item = Command>) -> Command {
        let commands: Vec<Command> = commands
            .into_iter()
            .filter(|c| !c.is_none())
            .collect();
        match commands.len() {
            0 => Command::None,
            1 => commands.into_iter().next().unwrap_or(Command::None),
            _ => Command::Batch(commands),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Command::None)
    }

    /// Flattens nested batches into the individual requests to run.
    pub fn into_list(self) -> Vec<Command> {
        match self {
            Command::None => Vec::new(),
            Command::Batch(commands) => commands.into_iter().flat_map(Command::into_list).collect(),
            other => vec![other],
        }
    }
}

#[derive(Debug)]
pub enum Completion {
    Locations(ApiResult<Vec<Location>>),
    Companies(ApiResult<Vec<Company>>),
    LoggedIn {
        role: Role,
        result: ApiResult<UserProfile>,
    },
    SignedUp {
        role: Role,
        result: ApiResult<String>,
    },
    Page {
        generation: u64,
        result: ApiResult<Vec<Job>>,
    },
    Count {
        generation: u64,
        result: ApiResult<u64>,
    },
    Applications {
        generation: u64,
        result: ApiResult<Vec<JobApplication>>,
    },
    ShortlistIds(ApiResult<Vec<Job>>),
    ShortlistedJobs {
        generation: u64,
        result: ApiResult<Vec<Job>>,
    },
    Applied {
        employee_id: UserId,
        job_id: JobId,
        result: ApiResult<ApplyOutcome>,
    },
    Shortlisted {
        op: ShortlistOp,
        job_id: JobId,
        result: ApiResult<()>,
    },
    /// Sent after the dislike delay when the call succeeded, at once when it
    /// failed.
    Disliked {
        job_id: JobId,
        result: ApiResult<()>,
    },
    Recommendations {
        generation: u64,
        job_id: JobId,
        result: ApiResult<Vec<Job>>,
    },
    JobPosted(ApiResult<String>),
    Applicants {
        generation: u64,
        result: ApiResult<Vec<JobApplication>>,
    },
    StatusChanged {
        employee_id: UserId,
        job_id: JobId,
        status: ApplicationStatus,
        result: ApiResult<String>,
    },
    Salaries {
        generation: u64,
        result: ApiResult<Vec<LocationSalary>>,
    },
    LocationStats {
        generation: u64,
        result: ApiResult<LocationStats>,
    },
    CompanyStats {
        generation: u64,
        result: ApiResult<CompanyStats>,
    },
    ShortlistRatio {
        generation: u64,
        result: ApiResult<Vec<ShortlistRatio>>,
    },
    ResumeUpdated {
        resume_url: String,
        result: ApiResult<String>,
    },
}

/// A completion tagged with the session serial of the command that caused it.
#[derive(Debug)]
pub struct Envelope {
    pub serial: u64,
    pub completion: Completion,
}

/// Performs every request in `command` in order against the API.
pub async fn execute(api: &ApiClient, command: Command, dislike_delay: Duration) -> Vec<Completion> {
    let mut completions = Vec::new();
    for command in command.into_list() {
        completions.extend(execute_one(api, command, dislike_delay).await);
    }
    completions
}

async fn execute_one(api: &ApiClient, command: Command, dislike_delay: Duration) -> Vec<Completion> {
    let completion = match command {
        Command::None | Command::Batch(_) => return Vec::new(),
        Command::FetchPage { generation, query } => {
            let (page, count) = tokio::join!(api.search_jobs(&query), api.count_jobs(&query.filters));
            return vec![
                Completion::Page {
                    generation,
                    result: page,
                },
                Completion::Count {
                    generation,
                    result: count,
                },
            ];
        }
        Command::Dislike {
            employee_id,
            job_id,
        } => {
            let result = api.dislike(employee_id, job_id).await;
            if result.is_ok() && !dislike_delay.is_zero() {
                tokio::time::sleep(dislike_delay).await;
            }
            Completion::Disliked { job_id, result }
        }
        Command::LoadLocations => Completion::Locations(api.locations().await),
        Command::LoadCompanies => Completion::Companies(api.companies().await),
        Command::Login { role, request } => Completion::LoggedIn {
            role,
            result: api.login(&request).await,
        },
        Command::Signup { role, request } => Completion::SignedUp {
            role,
            result: api.signup(&request).await,
        },
        Command::LoadApplications {
            generation,
            employee_id,
        } => Completion::Applications {
            generation,
            result: api.employee_applications(employee_id).await,
        },
        Command::LoadShortlistIds { employee_id } => {
            Completion::ShortlistIds(api.shortlisted_jobs(employee_id).await)
        }
        Command::LoadShortlistedJobs {
            generation,
            employee_id,
        } => Completion::ShortlistedJobs {
            generation,
            result: api.shortlisted_jobs(employee_id).await,
        },
        Command::Apply {
            employee_id,
            job_id,
        } => Completion::Applied {
            employee_id,
            job_id,
            result: api.apply(employee_id, job_id).await,
        },
        Command::Shortlist {
            op,
            employee_id,
            job_id,
        } => {
            let result = match op {
                ShortlistOp::Add => api.add_to_shortlist(employee_id, job_id).await,
                ShortlistOp::Remove => api.remove_from_shortlist(employee_id, job_id).await,
            };
            Completion::Shortlisted { op, job_id, result }
        }
        Command::LoadRecommendations {
            generation,
            job_id,
            user_id,
        } => Completion::Recommendations {
            generation,
            job_id,
            result: api.recommendations(job_id, user_id).await,
        },
        Command::PostJob { employer_id, job } => {
            Completion::JobPosted(api.post_job(employer_id, &job).await)
        }
        Command::LoadApplicants { generation } => Completion::Applicants {
            generation,
            result: api.all_applications().await,
        },
        Command::ChangeStatus {
            employee_id,
            job_id,
            status,
        } => Completion::StatusChanged {
            employee_id,
            job_id,
            status,
            result: api
                .change_application_status(employee_id, job_id, status)
                .await,
        },
        Command::LoadSalaries { generation, metric } => Completion::Salaries {
            generation,
            result: api.salary_by_location(metric).await,
        },
        Command::LoadLocationStats {
            generation,
            city_id,
        } => Completion::LocationStats {
            generation,
            result: api.location_stats(city_id).await,
        },
        Command::LoadCompanyStats {
            generation,
            company_id,
        } => Completion::CompanyStats {
            generation,
            result: api.company_stats(company_id).await,
        },
        Command::LoadShortlistRatio {
            generation,
            employer_id,
        } => Completion::ShortlistRatio {
            generation,
            result: api.shortlist_ratio(employer_id).await,
        },
        Command::UpdateResume {
            user_id,
            resume_url,
        } => {
            let result = api.update_resume(user_id, &resume_url).await;
            Completion::ResumeUpdated { resume_url, result }
        }
    };
    vec![completion]
}

/// Spawns commands on a tokio runtime and forwards their completions.
pub struct Dispatcher {
    api: ApiClient,
    handle: Handle,
    tx: UnboundedSender<Envelope>,
    dislike_delay: Duration,
}

impl Dispatcher {
    pub fn new(
        api: ApiClient,
        handle: Handle,
        dislike_delay: Duration,
    ) -> (Self, UnboundedReceiver<Envelope>) {
        let (tx, rx) = unbounded_channel();
        let dispatcher = Self {
            api,
            handle,
            tx,
            dislike_delay,
        };
        (dispatcher, rx)
    }

    /// Runs every request in `command` as its own task.
    pub fn run(&self, serial: u64, command: Command) {
        for command in command.into_list() {
            debug!("Dispatching {:?}", command);
            let api = self.api.clone();
            let tx = self.tx.clone();
            let delay = self.dislike_delay;
            self.handle.spawn(async move {
                for completion in execute(&api, command, delay).await {
                    if tx.send(Envelope { serial, completion }).is_err() {
                        warn!("Completion dropped: receiver closed");
                        return;
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterCriteria;
    use mockito::{Matcher, Server};

    fn client(server: &Server) -> ApiClient {
        ApiClient::new(server.url(), None).unwrap()
    }

    #[test]
    fn test_batch_flattening() {
        let command = Command::batch([
            Command::None,
            Command::LoadLocations,
            Command::Batch(vec![Command::LoadCompanies, Command::None]),
        ]);
        assert_eq!(
            command.into_list(),
            vec![Command::LoadLocations, Command::LoadCompanies]
        );
        assert!(Command::batch([Command::None]).is_none());
        assert_eq!(Command::batch([Command::LoadLocations]), Command::LoadLocations);
    }

    #[tokio::test]
    async fn test_fetch_page_yields_page_and_count() {
        let mut server = Server::new_async().await;
        let search = server
            .mock("GET", "/jobs/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "75".into()),
            ]))
            .with_body("[]")
            .create_async()
            .await;
        let count = server
            .mock("GET", "/jobs/count")
            .with_body("200")
            .create_async()
            .await;

        let command = Command::FetchPage {
            generation: 3,
            query: JobQuery {
                filters: FilterCriteria::default(),
                page: 1,
                page_size: 75,
                user_id: None,
            },
        };
        let completions = execute(&client(&server), command, Duration::ZERO).await;

        search.assert_async().await;
        count.assert_async().await;
        assert!(matches!(
            completions[0],
            Completion::Page { generation: 3, result: Ok(ref jobs) } if jobs.is_empty()
        ));
        assert!(matches!(
            completions[1],
            Completion::Count {
                generation: 3,
                result: Ok(200)
            }
        ));
    }

    #[tokio::test]
    async fn test_dislike_failure_reports_immediately() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/jobs/dislike")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let command = Command::Dislike {
            employee_id: 1,
            job_id: 42,
        };
        let started = std::time::Instant::now();
        let completions = execute(&client(&server), command, Duration::from_secs(30)).await;
        assert!(started.elapsed() < Duration::from_secs(30));
        assert!(matches!(
            completions[0],
            Completion::Disliked { job_id: 42, result: Err(_) }
        ));
    }

    #[tokio::test]
    async fn test_dislike_success_waits_before_reporting() {
        let mut server = Server::new_async().await;
        let dislike = server
            .mock("POST", "/jobs/dislike")
            .match_query(Matcher::Any)
            .with_status(200)
            .create_async()
            .await;

        let delay = Duration::from_millis(200);
        let command = Command::Dislike {
            employee_id: 1,
            job_id: 42,
        };
        let started = std::time::Instant::now();
        let completions = execute(&client(&server), command, delay).await;

        dislike.assert_async().await;
        assert!(started.elapsed() >= delay);
        assert!(matches!(
            completions[0],
            Completion::Disliked { job_id: 42, result: Ok(()) }
        ));
    }

    #[tokio::test]
    async fn test_dispatcher_tags_completions_with_serial() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/locations")
            .with_body(r#"[{"cityId": 1, "cityName": "Oslo", "countryName": "Norway"}]"#)
            .create_async()
            .await;

        let (dispatcher, mut rx) =
            Dispatcher::new(client(&server), Handle::current(), Duration::ZERO);
        dispatcher.run(7, Command::LoadLocations);

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.serial, 7);
        match envelope.completion {
            Completion::Locations(Ok(locations)) => assert_eq!(locations[0].city_name, "Oslo"),
            other => panic!("unexpected completion: {:?}", other),
        }
    }
}
