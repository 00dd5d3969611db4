use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::filters::FilterCriteria;
use crate::models::{
    ApplicationStatus, Company, CompanyStats, Job, JobApplication, JobId, Location,
    LocationSalary, LocationStats, LoginRequest, NewJob, SalaryMetric, ShortlistRatio,
    SignupRequest, UserId, UserProfile,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

const USER_ID_HEADER: &str = "user-id";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message for an alert or banner: the server's body for
    /// rejected requests, the transport error otherwise.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { status, body, .. } if !body.trim().is_empty() => {
                format!("{} ({})", body.trim(), status)
            }
            ApiError::Status { status, .. } => format!("Server returned status {}", status),
            ApiError::Transport { .. } => {
                "Network error: backend server not responding".to_string()
            }
            ApiError::Decode { .. } => "Unexpected response from server".to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Outcome of `POST /jobs/apply`. A 409 means the pair already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    AlreadyApplied,
}

/// Query for one page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct JobQuery {
    pub filters: FilterCriteria,
    pub page: usize,
    pub page_size: usize,
    /// Lets the server exclude jobs this viewer has disliked.
    pub user_id: Option<UserId>,
}

impl JobQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = self.filters.query_pairs();
        pairs.push(("page", self.page.to_string()));
        pairs.push(("pageSize", self.page_size.to_string()));
        if let Some(user_id) = self.user_id {
            pairs.push(("userId", user_id.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CountResponse {
    Bare(u64),
    Wrapped {
        #[serde(alias = "totalJobs", alias = "total", alias = "totalCount")]
        count: u64,
    },
}

impl CountResponse {
    fn value(self) -> u64 {
        match self {
            CountResponse::Bare(count) | CountResponse::Wrapped { count } => count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationRequest {
    employee_id: UserId,
    job_id: JobId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResumeUpdate<'a> {
    resume_url: &'a str,
}

// One request per operation. Nothing is retried or cached.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> ApiResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ApiError::Transport {
            url: base_url.clone(),
            source,
        })?;

        Ok(Self { client, base_url })
    }

    // --- Jobs ---

    pub async fn list_jobs(&self) -> ApiResult<Vec<Job>> {
        self.get_json("/jobs", &[]).await
    }

    pub async fn search_jobs(&self, query: &JobQuery) -> ApiResult<Vec<Job>> {
        self.get_json("/jobs/search", &query.query_pairs()).await
    }

    pub async fn count_jobs(&self, filters: &FilterCriteria) -> ApiResult<u64> {
        let count: CountResponse = self.get_json("/jobs/count", &filters.query_pairs()).await?;
        Ok(count.value())
    }

    pub async fn recommendations(&self, job_id: JobId, user_id: UserId) -> ApiResult<Vec<Job>> {
        self.get_json(
            "/jobs/recommendations",
            &[("jobId", job_id.to_string()), ("userId", user_id.to_string())],
        )
        .await
    }

    pub async fn post_job(&self, employer_id: UserId, job: &NewJob) -> ApiResult<String> {
        let request = self
            .request(Method::POST, "/jobs/post")
            .header(USER_ID_HEADER, employer_id.to_string())
            .json(job);
        self.send_text("/jobs/post", request).await
    }

    // --- Applications ---

    pub async fn apply(&self, employee_id: UserId, job_id: JobId) -> ApiResult<ApplyOutcome> {
        let request = self
            .request(Method::POST, "/jobs/apply")
            .json(&ApplicationRequest { employee_id, job_id });
        match self.send_text("/jobs/apply", request).await {
            Ok(_) => Ok(ApplyOutcome::Applied),
            Err(err) if err.status() == Some(StatusCode::CONFLICT.as_u16()) => {
                debug!("Employee {} already applied to job {}", employee_id, job_id);
                Ok(ApplyOutcome::AlreadyApplied)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn employee_applications(&self, employee_id: UserId) -> ApiResult<Vec<JobApplication>> {
        let path = format!("/jobs/applications/employee/{}", employee_id);
        self.get_json(&path, &[]).await
    }

    pub async fn all_applications(&self) -> ApiResult<Vec<JobApplication>> {
        self.get_json("/jobs/applications", &[]).await
    }

    pub async fn change_application_status(
        &self,
        employee_id: UserId,
        job_id: JobId,
        status: ApplicationStatus,
    ) -> ApiResult<String> {
        let path = "/jobs/applications/employer/changestatus/";
        let request = self.request(Method::GET, path).query(&[
            ("employeeId", employee_id.to_string()),
            ("jobId", job_id.to_string()),
            ("status", status.label().to_string()),
        ]);
        self.send_text(path, request).await
    }

    // --- Shortlist / dislike ---

    pub async fn add_to_shortlist(&self, employee_id: UserId, job_id: JobId) -> ApiResult<()> {
        self.pair_action(Method::POST, "/jobs/shortlist", employee_id, job_id).await
    }

    pub async fn remove_from_shortlist(&self, employee_id: UserId, job_id: JobId) -> ApiResult<()> {
        self.pair_action(Method::DELETE, "/jobs/shortlist", employee_id, job_id).await
    }

    pub async fn shortlisted_jobs(&self, employee_id: UserId) -> ApiResult<Vec<Job>> {
        let path = format!("/jobs/shortlist/{}", employee_id);
        self.get_json(&path, &[]).await
    }

    pub async fn dislike(&self, employee_id: UserId, job_id: JobId) -> ApiResult<()> {
        self.pair_action(Method::POST, "/jobs/dislike", employee_id, job_id).await
    }

    // --- Statistics ---

    pub async fn salary_by_location(&self, metric: SalaryMetric) -> ApiResult<Vec<LocationSalary>> {
        let path = format!("/jobs/statistics/location/{}", metric.path_segment());
        self.get_json(&path, &[]).await
    }

    pub async fn location_stats(&self, city_id: i64) -> ApiResult<LocationStats> {
        let path = format!("/jobs/statistics/location/{}", city_id);
        self.get_json(&path, &[]).await
    }

    pub async fn company_stats(&self, company_id: i64) -> ApiResult<CompanyStats> {
        let path = format!("/jobs/statistics/company/{}", company_id);
        self.get_json(&path, &[]).await
    }

    pub async fn shortlist_ratio(&self, employer_id: UserId) -> ApiResult<Vec<ShortlistRatio>> {
        let path = format!("/jobs/statistics/shortlist-ratio/employer/{}", employer_id);
        self.get_json(&path, &[]).await
    }

    // --- Accounts and reference data ---

    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<String> {
        let builder = self.request(Method::POST, "/users/signup").json(request);
        self.send_text("/users/signup", builder).await
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<UserProfile> {
        let builder = self.request(Method::POST, "/users/login").json(request);
        let body = self.send_text("/users/login", builder).await?;
        decode(&self.url("/users/login"), &body)
    }

    pub async fn update_resume(&self, user_id: UserId, resume_url: &str) -> ApiResult<String> {
        let request = self
            .request(Method::PUT, "/employees/profile")
            .header(USER_ID_HEADER, user_id.to_string())
            .json(&ResumeUpdate { resume_url });
        self.send_text("/employees/profile", request).await
    }

    pub async fn locations(&self) -> ApiResult<Vec<Location>> {
        self.get_json("/locations", &[]).await
    }

    pub async fn companies(&self) -> ApiResult<Vec<Company>> {
        self.get_json("/companies", &[]).await
    }

    // --- Plumbing ---

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn pair_action(
        &self,
        method: Method,
        path: &str,
        employee_id: UserId,
        job_id: JobId,
    ) -> ApiResult<()> {
        let request = self.request(method, path).query(&[
            ("employeeId", employee_id.to_string()),
            ("jobId", job_id.to_string()),
        ]);
        self.send_text(path, request).await.map(|_| ())
    }

    async fn get_json<T>(&self, path: &str, query: &[(&str, String)]) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        let mut request = self.request(Method::GET, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        let body = self.send_text(path, request).await?;
        decode(&self.url(path), &body)
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send_text(&self, path: &str, request: RequestBuilder) -> ApiResult<String> {
        let url = self.url(path);
        debug!("Requesting {}", url);

        let response = request.send().await.map_err(|source| {
            warn!("Request to {} failed: {}", url, source);
            ApiError::Transport {
                url: url.clone(),
                source,
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;

        if status.is_success() {
            Ok(body)
        } else {
            debug!("{} returned {}: {}", url, status, body);
            Err(ApiError::Status {
                url,
                status: status.as_u16(),
                body,
            })
        }
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> ApiResult<T> {
    serde_json::from_str(body).map_err(|source| {
        warn!("Failed to decode response from {}: {}", url, source);
        ApiError::Decode {
            url: url.to_string(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, WorkType};
    use mockito::{Matcher, Server};

    const JOB_JSON: &str = r#"{"jobId": 1, "title": "Data Analyst", "minSalary": 50, "maxSalary": 70, "workType": "Contract", "cityName": "Lyon", "companyName": "Acme"}"#;

    fn client(server: &Server) -> ApiClient {
        ApiClient::new(server.url(), None).unwrap()
    }

    #[tokio::test]
    async fn test_search_jobs_sends_filters_and_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/jobs/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("cityId".into(), "3".into()),
                Matcher::UrlEncoded("workType".into(), "Full-time".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("pageSize".into(), "75".into()),
                Matcher::UrlEncoded("userId".into(), "9".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!("[{}]", JOB_JSON))
            .create_async()
            .await;

        let query = JobQuery {
            filters: FilterCriteria {
                city_id: Some(3),
                work_type: Some(WorkType::FullTime),
                ..Default::default()
            },
            page: 1,
            page_size: 75,
            user_id: Some(9),
        };
        let jobs = client(&server).search_jobs(&query).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].work_type, WorkType::Contract);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_count_jobs_accepts_bare_and_wrapped_numbers() {
        let mut bare_server = Server::new_async().await;
        let bare = bare_server
            .mock("GET", "/jobs/count")
            .with_status(200)
            .with_body("200")
            .create_async()
            .await;
        let total = client(&bare_server)
            .count_jobs(&FilterCriteria::default())
            .await
            .unwrap();
        assert_eq!(total, 200);
        bare.assert_async().await;

        let mut wrapped_server = Server::new_async().await;
        let wrapped = wrapped_server
            .mock("GET", "/jobs/count")
            .match_query(Matcher::UrlEncoded("minSalary".into(), "50".into()))
            .with_status(200)
            .with_body(r#"{"totalJobs": 12}"#)
            .create_async()
            .await;
        let filters = FilterCriteria {
            min_salary: Some(50.0),
            ..Default::default()
        };
        assert_eq!(client(&wrapped_server).count_jobs(&filters).await.unwrap(), 12);
        wrapped.assert_async().await;
    }

    #[tokio::test]
    async fn test_apply_conflict_is_already_applied() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/jobs/apply")
            .match_body(Matcher::Json(serde_json::json!({"employeeId": 7, "jobId": 42})))
            .with_status(409)
            .with_body("Already applied")
            .create_async()
            .await;

        let outcome = client(&server).apply(7, 42).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::AlreadyApplied);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_apply_other_failures_are_errors() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/jobs/apply")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let err = client(&server).apply(7, 42).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.user_message(), "boom (500)");
    }

    #[tokio::test]
    async fn test_shortlist_add_and_remove_use_query_pairs() {
        let mut server = Server::new_async().await;
        let pair = Matcher::AllOf(vec![
            Matcher::UrlEncoded("employeeId".into(), "7".into()),
            Matcher::UrlEncoded("jobId".into(), "42".into()),
        ]);
        let add = server
            .mock("POST", "/jobs/shortlist")
            .match_query(pair.clone())
            .with_status(200)
            .create_async()
            .await;
        let remove = server
            .mock("DELETE", "/jobs/shortlist")
            .match_query(pair)
            .with_status(200)
            .create_async()
            .await;

        let api = client(&server);
        api.add_to_shortlist(7, 42).await.unwrap();
        api.remove_from_shortlist(7, 42).await.unwrap();
        add.assert_async().await;
        remove.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_job_sends_user_id_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/jobs/post")
            .match_header("user-id", "69")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "title": "Welder",
                "cityId": 4,
                "workType": "Part-time"
            })))
            .with_status(200)
            .with_body("Job posted successfully")
            .create_async()
            .await;

        let job = NewJob {
            title: "Welder".to_string(),
            description: "Weld things".to_string(),
            city_id: 4,
            min_salary: 30.0,
            max_salary: 40.0,
            work_type: WorkType::PartTime,
            requirements: "Certification".to_string(),
        };
        let message = client(&server).post_job(69, &job).await.unwrap();
        assert_eq!(message, "Job posted successfully");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_decodes_profile_and_surfaces_rejection() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/users/login")
            .match_body(Matcher::PartialJson(serde_json::json!({"identifier": "ada@example.com"})))
            .with_status(200)
            .with_body(r#"{"userId": 5, "userName": "Ada", "role": "employer"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/users/login")
            .match_body(Matcher::PartialJson(serde_json::json!({"identifier": "nobody"})))
            .with_status(400)
            .with_body("Invalid credentials")
            .create_async()
            .await;

        let api = client(&server);
        let profile = api
            .login(&LoginRequest {
                identifier: "ada@example.com".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(profile.role, Some(Role::Employer));

        let err = api
            .login(&LoginRequest {
                identifier: "nobody".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn test_employee_applications_normalizes_casing() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/jobs/applications/employee/7")
            .with_status(200)
            .with_body(r#"[{"EmployeeId": 7, "JobId": 42, "ApplyDate": "2024-01-02", "Status": "Pending", "JobTitle": "Welder"}]"#)
            .create_async()
            .await;

        let apps = client(&server).employee_applications(7).await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].key(), (7, 42));
        assert_eq!(apps[0].job_title.as_deref(), Some("Welder"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/locations")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client(&server).locations().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let api = ApiClient::new("http://127.0.0.1:1", None).unwrap();
        let err = api.companies().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(err.status(), None);
    }
}
