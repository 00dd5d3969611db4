use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type JobId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    #[serde(alias = "Internship")]
    Intern,
    #[serde(other)]
    Other,
}

impl WorkType {
    pub const ALL: [WorkType; 4] = [
        WorkType::FullTime,
        WorkType::PartTime,
        WorkType::Contract,
        WorkType::Intern,
    ];

    pub fn label(self) -> &'static str {
        match self {
            WorkType::FullTime => "Full-time",
            WorkType::PartTime => "Part-time",
            WorkType::Contract => "Contract",
            WorkType::Intern => "Intern",
            WorkType::Other => "Other",
        }
    }
}

impl fmt::Display for WorkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for WorkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '_'], "-").as_str() {
            "full-time" | "fulltime" | "full" => Ok(WorkType::FullTime),
            "part-time" | "parttime" | "part" => Ok(WorkType::PartTime),
            "contract" => Ok(WorkType::Contract),
            "intern" | "internship" => Ok(WorkType::Intern),
            other => Err(format!(
                "Unknown work type '{}'. Expected one of: Full-time, Part-time, Contract, Intern",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_salary: f64,
    #[serde(default)]
    pub max_salary: f64,
    pub work_type: WorkType,
    #[serde(default)]
    pub city_name: String,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub post_date: Option<String>,
    // Counters are only present on some listing endpoints
    #[serde(default)]
    pub apply_count: Option<u32>,
    #[serde(default)]
    pub dislike_count: Option<u32>,
    #[serde(default)]
    pub shortlist_count: Option<u32>,
}

impl Job {
    pub fn location(&self) -> String {
        match self.country_name.as_deref() {
            Some(country) if !country.is_empty() => format!("{}, {}", self.city_name, country),
            _ => self.city_name.clone(),
        }
    }

    pub fn salary_range(&self) -> String {
        format!("${}K - ${}K", self.min_salary.round(), self.max_salary.round())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    #[serde(alias = "pending", alias = "PENDING")]
    Pending,
    #[serde(alias = "accepted", alias = "ACCEPTED")]
    Accepted,
    #[serde(alias = "rejected", alias = "REJECTED")]
    Rejected,
}

impl ApplicationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Accepted => "Accepted",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One application of an employee to a job.
///
/// The applications endpoints disagree on casing (`EmployeeId` vs
/// `employeeId`), so every field accepts both spellings here and nowhere
/// else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    #[serde(rename = "employeeId", alias = "EmployeeId")]
    pub employee_id: UserId,
    #[serde(rename = "jobId", alias = "JobId")]
    pub job_id: JobId,
    #[serde(
        rename = "applicationDate",
        alias = "ApplyDate",
        alias = "applyDate",
        alias = "ApplicationDate",
        default
    )]
    pub application_date: Option<String>,
    #[serde(rename = "status", alias = "Status", default)]
    pub status: ApplicationStatus,
    #[serde(rename = "jobTitle", alias = "JobTitle", alias = "title", alias = "Title", default)]
    pub job_title: Option<String>,
    #[serde(rename = "companyName", alias = "CompanyName", default)]
    pub company_name: Option<String>,
    #[serde(
        rename = "employeeName",
        alias = "EmployeeName",
        alias = "UserName",
        alias = "userName",
        default
    )]
    pub employee_name: Option<String>,
}

impl JobApplication {
    pub fn key(&self) -> (UserId, JobId) {
        (self.employee_id, self.job_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "Employee", alias = "EMPLOYEE")]
    Employee,
    #[serde(alias = "Employer", alias = "EMPLOYER")]
    Employer,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Employee => "Job Seeker",
            Role::Employer => "Employer",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Employer => "employer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "UserId", default)]
    pub user_id: Option<UserId>,
    #[serde(alias = "UserName", default)]
    pub user_name: String,
    #[serde(alias = "CityName", default)]
    pub city_name: Option<String>,
    #[serde(alias = "CountryName", default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub resume_url: Option<String>,
    #[serde(alias = "CompanyName", default)]
    pub company_name: Option<String>,
    #[serde(alias = "Role", default)]
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(alias = "CityId")]
    pub city_id: i64,
    #[serde(alias = "CityName")]
    pub city_name: String,
    #[serde(alias = "CountryName")]
    pub country_name: String,
}

impl Location {
    pub fn label(&self) -> String {
        format!("{} - {}", self.country_name, self.city_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    #[serde(alias = "CompanyId")]
    pub company_id: i64,
    #[serde(alias = "CompanyName")]
    pub company_name: String,
}

// --- Statistics ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalaryMetric {
    Min,
    Max,
}

impl SalaryMetric {
    pub fn label(self) -> &'static str {
        match self {
            SalaryMetric::Min => "Minimum Salary",
            SalaryMetric::Max => "Maximum Salary",
        }
    }

    pub fn path_segment(self) -> &'static str {
        match self {
            SalaryMetric::Min => "minsalary",
            SalaryMetric::Max => "maxsalary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSalary {
    #[serde(rename = "CityName", alias = "cityName")]
    pub city_name: String,
    #[serde(rename = "CountryName", alias = "countryName")]
    pub country_name: String,
    #[serde(rename = "AvgMinSalary", alias = "avgMinSalary", default)]
    pub avg_min_salary: Option<f64>,
    #[serde(rename = "AvgMaxSalary", alias = "avgMaxSalary", default)]
    pub avg_max_salary: Option<f64>,
}

impl LocationSalary {
    pub fn value(&self, metric: SalaryMetric) -> Option<f64> {
        match metric {
            SalaryMetric::Min => self.avg_min_salary,
            SalaryMetric::Max => self.avg_max_salary,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricAverages {
    #[serde(default)]
    pub avg_apply: Option<f64>,
    #[serde(default)]
    pub avg_dislike: Option<f64>,
    #[serde(default)]
    pub avg_shortlist: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopDecile {
    #[serde(default)]
    pub top_apply: Option<f64>,
    #[serde(default)]
    pub top_dislike: Option<f64>,
    #[serde(default)]
    pub top_shortlist: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationStats {
    #[serde(default)]
    pub averages: MetricAverages,
    #[serde(rename = "top_10_percent", default)]
    pub top_decile: TopDecile,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyStats {
    #[serde(default)]
    pub company_averages: MetricAverages,
    #[serde(rename = "industry_top_10_percent", default)]
    pub industry_top_decile: TopDecile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistRatio {
    #[serde(rename = "JobId", alias = "jobId")]
    pub job_id: JobId,
    #[serde(rename = "Title", alias = "title", default)]
    pub title: Option<String>,
    #[serde(rename = "ShortlistCount", alias = "shortlistCount", default)]
    pub shortlist_count: Option<u32>,
    #[serde(rename = "ApplicationCount", alias = "applicationCount", alias = "ApplyCount", default)]
    pub application_count: Option<u32>,
    #[serde(
        rename = "ShortlistToApplicationRatio",
        alias = "shortlistToApplicationRatio",
        default
    )]
    pub ratio: Option<f64>,
}

// --- Request bodies ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub user_name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub city_id: i64,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub city_id: i64,
    pub min_salary: f64,
    pub max_salary: f64,
    pub work_type: WorkType,
    pub requirements: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_decodes_listing_payload() {
        let json = r#"{
            "jobId": 42,
            "title": "Backend Engineer",
            "description": "Build APIs",
            "minSalary": 80.0,
            "maxSalary": 120.0,
            "workType": "Full-time",
            "cityName": "Ottawa",
            "countryName": "Canada",
            "companyName": "Acme",
            "isActive": true,
            "postDate": "2024-03-01",
            "applyCount": 3,
            "shortlistCount": 1
        }"#;
        let job: Job = serde_json::from_str(json).unwrap();
        assert_eq!(job.job_id, 42);
        assert_eq!(job.work_type, WorkType::FullTime);
        assert_eq!(job.apply_count, Some(3));
        assert_eq!(job.dislike_count, None);
        assert_eq!(job.location(), "Ottawa, Canada");
        assert_eq!(job.salary_range(), "$80K - $120K");
    }

    #[test]
    fn test_work_type_accepts_internship_and_unknown() {
        let intern: WorkType = serde_json::from_str(r#""Internship""#).unwrap();
        assert_eq!(intern, WorkType::Intern);
        let other: WorkType = serde_json::from_str(r#""Seasonal""#).unwrap();
        assert_eq!(other, WorkType::Other);
        assert_eq!(serde_json::to_string(&WorkType::PartTime).unwrap(), r#""Part-time""#);
    }

    #[test]
    fn test_work_type_from_str() {
        assert_eq!("full time".parse::<WorkType>().unwrap(), WorkType::FullTime);
        assert_eq!("Part-time".parse::<WorkType>().unwrap(), WorkType::PartTime);
        assert_eq!("internship".parse::<WorkType>().unwrap(), WorkType::Intern);
        assert!("freelance".parse::<WorkType>().is_err());
    }

    #[test]
    fn test_application_decodes_both_casings() {
        let pascal = r#"{"EmployeeId": 7, "JobId": 42, "ApplyDate": "2024-03-02", "Status": "Accepted", "JobTitle": "Backend Engineer", "CompanyName": "Acme"}"#;
        let camel = r#"{"employeeId": 7, "jobId": 42, "applicationDate": "2024-03-02", "status": "Accepted", "title": "Backend Engineer", "companyName": "Acme"}"#;
        let a: JobApplication = serde_json::from_str(pascal).unwrap();
        let b: JobApplication = serde_json::from_str(camel).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key(), (7, 42));
        assert_eq!(a.job_title.as_deref(), Some("Backend Engineer"));
    }

    #[test]
    fn test_application_status_defaults_to_pending() {
        let app: JobApplication = serde_json::from_str(r#"{"EmployeeId": 1, "JobId": 2}"#).unwrap();
        assert_eq!(app.status, ApplicationStatus::Pending);
        assert_eq!(app.application_date, None);
    }

    #[test]
    fn test_user_profile_ignores_server_only_fields() {
        let json = r#"{"userId": 5, "userName": "Ada", "role": "employee", "phone": "555", "passwordHash": "x", "cityId": 3}"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.user_id, Some(5));
        assert_eq!(profile.role, Some(Role::Employee));
        assert_eq!(profile.city_name, None);
    }

    #[test]
    fn test_signup_request_omits_company_for_employees() {
        let request = SignupRequest {
            user_name: "Ada".to_string(),
            phone: "555".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "secret".to_string(),
            city_id: 3,
            role: Role::Employee,
            company_id: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["role"], "employee");
        assert_eq!(value["passwordHash"], "secret");
        assert!(value.get("companyId").is_none());
    }

    #[test]
    fn test_location_stats_decode() {
        let json = r#"{"averages": {"avg_apply": 2.5, "avg_dislike": null, "avg_shortlist": 1.0}, "top_10_percent": {"top_apply": 9.0}}"#;
        let stats: LocationStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.averages.avg_apply, Some(2.5));
        assert_eq!(stats.averages.avg_dislike, None);
        assert_eq!(stats.top_decile.top_apply, Some(9.0));
        assert_eq!(stats.top_decile.top_shortlist, None);
    }
}
