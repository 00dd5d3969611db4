use thiserror::Error;

use crate::models::{
    Company, Location, LoginRequest, NewJob, Role, SignupRequest, WorkType,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("{0}")]
    Required(&'static str),

    #[error("No {what} matches '{input}'")]
    NoMatch { what: &'static str, input: String },

    #[error("'{input}' matches several {what}s: {candidates}")]
    Ambiguous {
        what: &'static str,
        input: String,
        candidates: String,
    },

    #[error("{0} must be a number")]
    NotANumber(&'static str),

    #[error("Minimum salary cannot exceed maximum salary")]
    SalaryRange,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("{0}")]
    WorkType(String),
}

// --- Searchable options ---

#[derive(Debug, Clone, PartialEq)]
pub struct ComboOption {
    pub id: i64,
    pub label: String,
}

pub fn location_options(locations: &[Location]) -> Vec<ComboOption> {
    locations
        .iter()
        .map(|loc| ComboOption {
            id: loc.city_id,
            label: loc.label(),
        })
        .collect()
}

pub fn company_options(companies: &[Company]) -> Vec<ComboOption> {
    companies
        .iter()
        .map(|company| ComboOption {
            id: company.company_id,
            label: company.company_name.clone(),
        })
        .collect()
}

/// Options whose label contains `input` (case-insensitive), closest first.
pub fn filter_options<'a>(options: &'a [ComboOption], input: &str) -> Vec<&'a ComboOption> {
    let needle = input.trim().to_lowercase();
    let mut matches: Vec<(&ComboOption, f64)> = options
        .iter()
        .filter(|opt| opt.label.to_lowercase().contains(&needle))
        .map(|opt| (opt, strsim::jaro_winkler(&opt.label.to_lowercase(), &needle)))
        .collect();
    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    matches.into_iter().map(|(opt, _)| opt).collect()
}

/// Resolves free text to an option id: a numeric id, an exact label (or the
/// trailing part of a "Country - City" label), or a single partial match.
pub fn resolve_option(
    options: &[ComboOption],
    input: &str,
    what: &'static str,
) -> Result<i64, FormError> {
    let input = input.trim();
    if let Ok(id) = input.parse::<i64>() {
        if options.is_empty() || options.iter().any(|opt| opt.id == id) {
            return Ok(id);
        }
    }

    let lower = input.to_lowercase();
    let exact: Vec<&ComboOption> = options
        .iter()
        .filter(|opt| {
            let label = opt.label.to_lowercase();
            label == lower || label.rsplit(" - ").next() == Some(lower.as_str())
        })
        .collect();
    if exact.len() == 1 {
        return Ok(exact[0].id);
    }

    let partial = if exact.is_empty() {
        filter_options(options, input)
    } else {
        exact
    };
    match partial.as_slice() {
        [] => Err(FormError::NoMatch {
            what,
            input: input.to_string(),
        }),
        [single] => Ok(single.id),
        many => Err(FormError::Ambiguous {
            what,
            input: input.to_string(),
            candidates: many
                .iter()
                .take(3)
                .map(|opt| opt.label.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

pub fn parse_amount(field: &'static str, text: &str) -> Result<Option<f64>, FormError> {
    let text = text.trim().trim_start_matches('$');
    if text.is_empty() {
        return Ok(None);
    }
    text.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Some)
        .ok_or(FormError::NotANumber(field))
}

pub fn parse_work_type(text: &str) -> Result<Option<WorkType>, FormError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<WorkType>().map(Some).map_err(FormError::WorkType)
}

// --- Editable field access for the terminal forms ---

/// A form the terminal UI can edit field by field.
pub trait EditableForm {
    fn labels(&self) -> &'static [&'static str];
    fn value(&self, index: usize) -> &str;
    fn value_mut(&mut self, index: usize) -> Option<&mut String>;

    fn is_secret(&self, _index: usize) -> bool {
        false
    }

    fn len(&self) -> usize {
        self.labels().len()
    }
}

// --- Login ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginRequest, FormError> {
        if self.identifier.trim().is_empty() || self.password.trim().is_empty() {
            return Err(FormError::Required(
                "Please enter your phone number/email and password",
            ));
        }
        Ok(LoginRequest {
            identifier: self.identifier.trim().to_string(),
            password: self.password.clone(),
        })
    }
}

impl EditableForm for LoginForm {
    fn labels(&self) -> &'static [&'static str] {
        &["Phone number/email", "Password"]
    }

    fn value(&self, index: usize) -> &str {
        match index {
            0 => &self.identifier,
            _ => &self.password,
        }
    }

    fn value_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.identifier),
            1 => Some(&mut self.password),
            _ => None,
        }
    }

    fn is_secret(&self, index: usize) -> bool {
        index == 1
    }
}

// --- Signup ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignupForm {
    pub user_name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub location: String,
    pub company: String,
}

impl SignupForm {
    pub fn validate(
        &self,
        role: Role,
        locations: &[Location],
        companies: &[Company],
    ) -> Result<SignupRequest, FormError> {
        if self.user_name.trim().is_empty() {
            return Err(FormError::Required("Please enter your name"));
        }
        if self.phone.trim().is_empty() && self.email.trim().is_empty() {
            return Err(FormError::Required("Please enter a phone number or email"));
        }
        if self.password.is_empty() {
            return Err(FormError::Required("Please choose a password"));
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }

        let company_id = match role {
            Role::Employer => {
                if self.company.trim().is_empty() {
                    return Err(FormError::Required("Please select a company"));
                }
                Some(resolve_option(&company_options(companies), &self.company, "company")?)
            }
            Role::Employee => None,
        };

        if self.location.trim().is_empty() {
            return Err(FormError::Required("Please select a location"));
        }
        let city_id = resolve_option(&location_options(locations), &self.location, "location")?;

        Ok(SignupRequest {
            user_name: self.user_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            password_hash: self.password.clone(),
            city_id,
            role,
            company_id,
        })
    }
}

impl EditableForm for SignupForm {
    fn labels(&self) -> &'static [&'static str] {
        &[
            "Name",
            "Phone",
            "Email",
            "Password",
            "Confirm password",
            "Location",
            "Company (employers)",
        ]
    }

    fn value(&self, index: usize) -> &str {
        match index {
            0 => &self.user_name,
            1 => &self.phone,
            2 => &self.email,
            3 => &self.password,
            4 => &self.confirm_password,
            5 => &self.location,
            _ => &self.company,
        }
    }

    fn value_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.user_name),
            1 => Some(&mut self.phone),
            2 => Some(&mut self.email),
            3 => Some(&mut self.password),
            4 => Some(&mut self.confirm_password),
            5 => Some(&mut self.location),
            6 => Some(&mut self.company),
            _ => None,
        }
    }

    fn is_secret(&self, index: usize) -> bool {
        index == 3 || index == 4
    }
}

// --- Post job ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostJobForm {
    pub title: String,
    pub location: String,
    pub work_type: String,
    pub min_salary: String,
    pub max_salary: String,
    pub description: String,
    pub requirements: String,
}

impl PostJobForm {
    pub fn validate(&self, locations: &[Location]) -> Result<NewJob, FormError> {
        if self.title.trim().is_empty() {
            return Err(FormError::Required("Job title is required"));
        }
        if self.location.trim().is_empty() {
            return Err(FormError::Required("Please select a location"));
        }
        let city_id = resolve_option(&location_options(locations), &self.location, "location")?;
        let work_type = parse_work_type(&self.work_type)?
            .ok_or(FormError::Required("Please select a work type"))?;
        let min_salary = parse_amount("Minimum salary", &self.min_salary)?
            .ok_or(FormError::Required("Minimum salary is required"))?;
        let max_salary = parse_amount("Maximum salary", &self.max_salary)?
            .ok_or(FormError::Required("Maximum salary is required"))?;
        if min_salary > max_salary {
            return Err(FormError::SalaryRange);
        }
        if self.description.trim().is_empty() {
            return Err(FormError::Required("Job description is required"));
        }
        if self.requirements.trim().is_empty() {
            return Err(FormError::Required("Requirements are required"));
        }

        Ok(NewJob {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            city_id,
            min_salary,
            max_salary,
            work_type,
            requirements: self.requirements.trim().to_string(),
        })
    }
}

impl EditableForm for PostJobForm {
    fn labels(&self) -> &'static [&'static str] {
        &[
            "Title",
            "Location",
            "Work type",
            "Min salary (K)",
            "Max salary (K)",
            "Description",
            "Requirements",
        ]
    }

    fn value(&self, index: usize) -> &str {
        match index {
            0 => &self.title,
            1 => &self.location,
            2 => &self.work_type,
            3 => &self.min_salary,
            4 => &self.max_salary,
            5 => &self.description,
            _ => &self.requirements,
        }
    }

    fn value_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.title),
            1 => Some(&mut self.location),
            2 => Some(&mut self.work_type),
            3 => Some(&mut self.min_salary),
            4 => Some(&mut self.max_salary),
            5 => Some(&mut self.description),
            6 => Some(&mut self.requirements),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<Location> {
        vec![
            Location {
                city_id: 1,
                city_name: "Ottawa".to_string(),
                country_name: "Canada".to_string(),
            },
            Location {
                city_id: 2,
                city_name: "Toronto".to_string(),
                country_name: "Canada".to_string(),
            },
            Location {
                city_id: 3,
                city_name: "Paris".to_string(),
                country_name: "France".to_string(),
            },
        ]
    }

    fn companies() -> Vec<Company> {
        vec![
            Company {
                company_id: 10,
                company_name: "Acme".to_string(),
            },
            Company {
                company_id: 11,
                company_name: "Globex".to_string(),
            },
        ]
    }

    #[test]
    fn test_filter_options_is_case_insensitive_substring() {
        let options = location_options(&locations());
        let matches = filter_options(&options, "canada");
        assert_eq!(matches.len(), 2);
        let matches = filter_options(&options, "PAR");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, 3);
        assert!(filter_options(&options, "berlin").is_empty());
    }

    #[test]
    fn test_resolve_option_by_id_label_and_city() {
        let options = location_options(&locations());
        assert_eq!(resolve_option(&options, "2", "location"), Ok(2));
        assert_eq!(resolve_option(&options, "France - Paris", "location"), Ok(3));
        assert_eq!(resolve_option(&options, "ottawa", "location"), Ok(1));
        assert_eq!(resolve_option(&options, "tor", "location"), Ok(2));
    }

    #[test]
    fn test_resolve_option_reports_ambiguity_and_misses() {
        let options = location_options(&locations());
        let err = resolve_option(&options, "Canada", "location").unwrap_err();
        assert!(matches!(err, FormError::Ambiguous { .. }));
        let err = resolve_option(&options, "Berlin", "location").unwrap_err();
        assert_eq!(
            err.to_string(),
            "No location matches 'Berlin'"
        );
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("Min", ""), Ok(None));
        assert_eq!(parse_amount("Min", "$1,200"), Ok(Some(1200.0)));
        assert_eq!(parse_amount("Min", "abc"), Err(FormError::NotANumber("Min")));
        assert_eq!(parse_amount("Min", "-5"), Err(FormError::NotANumber("Min")));
    }

    #[test]
    fn test_login_requires_both_fields() {
        let form = LoginForm {
            identifier: "ada@example.com".to_string(),
            password: "  ".to_string(),
        };
        assert!(matches!(form.validate(), Err(FormError::Required(_))));

        let form = LoginForm {
            identifier: " ada@example.com ".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(form.validate().unwrap().identifier, "ada@example.com");
    }

    #[test]
    fn test_signup_validation_order() {
        let mut form = SignupForm {
            user_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "a".to_string(),
            confirm_password: "b".to_string(),
            ..Default::default()
        };
        assert_eq!(
            form.validate(Role::Employee, &locations(), &companies()),
            Err(FormError::PasswordMismatch)
        );

        form.confirm_password = "a".to_string();
        assert_eq!(
            form.validate(Role::Employer, &locations(), &companies()),
            Err(FormError::Required("Please select a company"))
        );
        assert_eq!(
            form.validate(Role::Employee, &locations(), &companies()),
            Err(FormError::Required("Please select a location"))
        );

        form.location = "Paris".to_string();
        form.company = "globex".to_string();
        let request = form.validate(Role::Employer, &locations(), &companies()).unwrap();
        assert_eq!(request.city_id, 3);
        assert_eq!(request.company_id, Some(11));
        assert_eq!(request.role, Role::Employer);

        let request = form.validate(Role::Employee, &locations(), &companies()).unwrap();
        assert_eq!(request.company_id, None);
    }

    #[test]
    fn test_post_job_validation() {
        let mut form = PostJobForm {
            title: "Welder".to_string(),
            location: "Ottawa".to_string(),
            work_type: "Internship".to_string(),
            min_salary: "50".to_string(),
            max_salary: "40".to_string(),
            description: "Weld".to_string(),
            requirements: "Gloves".to_string(),
        };
        assert_eq!(form.validate(&locations()), Err(FormError::SalaryRange));

        form.max_salary = "60".to_string();
        let job = form.validate(&locations()).unwrap();
        assert_eq!(job.city_id, 1);
        assert_eq!(job.work_type, WorkType::Intern);

        form.work_type = "gig".to_string();
        assert!(matches!(form.validate(&locations()), Err(FormError::WorkType(_))));
    }

    #[test]
    fn test_editable_form_field_access() {
        let mut form = LoginForm::default();
        assert_eq!(form.len(), 2);
        form.value_mut(0).unwrap().push_str("ada");
        assert_eq!(form.value(0), "ada");
        assert!(form.is_secret(1));
        assert!(form.value_mut(2).is_none());
    }
}
