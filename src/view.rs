use thiserror::Error;

use crate::models::{Role, UserId, UserProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Jobs,
    Applications,
    Shortlist,
    PostJob,
    Applicants,
    Analysis,
}

impl Tab {
    pub fn for_role(role: Role) -> &'static [Tab] {
        match role {
            Role::Employee => &[Tab::Jobs, Tab::Applications, Tab::Shortlist, Tab::Analysis],
            Role::Employer => &[Tab::PostJob, Tab::Applicants, Tab::Analysis],
        }
    }

    pub fn default_for(role: Role) -> Tab {
        match role {
            Role::Employee => Tab::Jobs,
            Role::Employer => Tab::PostJob,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Tab::Jobs => "Jobs",
            Tab::Applications => "My Applications",
            Tab::Shortlist => "Shortlist",
            Tab::PostJob => "Post Job",
            Tab::Applicants => "Applicants",
            Tab::Analysis => "Analysis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    NoRole,
    Auth { role: Role, mode: AuthMode },
    LoggedIn { role: Role, tab: Tab },
}

impl ViewState {
    /// The tab `offset` steps away from the current one, wrapping around.
    pub fn cycle_tab(self, offset: isize) -> Option<Tab> {
        let ViewState::LoggedIn { role, tab } = self else {
            return None;
        };
        let tabs = Tab::for_role(role);
        let index = tabs.iter().position(|t| *t == tab).unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        Some(tabs[(index + offset).rem_euclid(len) as usize])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid account type")]
    InvalidAccountType,

    #[error("Login response did not include a user id")]
    MissingUserId,
}

/// Checks a login response against the role the user chose.
pub fn verify_login(role: Role, profile: &UserProfile) -> Result<UserId, AuthError> {
    if profile.role != Some(role) {
        return Err(AuthError::InvalidAccountType);
    }
    profile.user_id.ok_or(AuthError::MissingUserId)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(role: Option<Role>, user_id: Option<UserId>) -> UserProfile {
        UserProfile {
            user_id,
            user_name: "Ada".to_string(),
            city_name: None,
            country_name: None,
            resume_url: None,
            company_name: None,
            role,
        }
    }

    #[test]
    fn test_verify_login() {
        assert_eq!(verify_login(Role::Employee, &profile(Some(Role::Employee), Some(4))), Ok(4));
        assert_eq!(
            verify_login(Role::Employee, &profile(Some(Role::Employer), Some(4))),
            Err(AuthError::InvalidAccountType)
        );
        assert_eq!(
            verify_login(Role::Employer, &profile(None, Some(4))),
            Err(AuthError::InvalidAccountType)
        );
        assert_eq!(
            verify_login(Role::Employer, &profile(Some(Role::Employer), None)),
            Err(AuthError::MissingUserId)
        );
        assert_eq!(AuthError::InvalidAccountType.to_string(), "Invalid account type");
    }

    #[test]
    fn test_tabs_per_role() {
        assert_eq!(Tab::default_for(Role::Employee), Tab::Jobs);
        assert_eq!(Tab::default_for(Role::Employer), Tab::PostJob);
        assert!(!Tab::for_role(Role::Employer).contains(&Tab::Jobs));
        assert!(!Tab::for_role(Role::Employee).contains(&Tab::Applicants));
    }

    #[test]
    fn test_cycle_tab_wraps() {
        let view = ViewState::LoggedIn {
            role: Role::Employer,
            tab: Tab::PostJob,
        };
        assert_eq!(view.cycle_tab(1), Some(Tab::Applicants));
        assert_eq!(view.cycle_tab(-1), Some(Tab::Analysis));
        assert_eq!(ViewState::NoRole.cycle_tab(1), None);
    }
}
