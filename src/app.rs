use tracing::{debug, info, warn};

use crate::dispatch::{Command, Completion, Envelope};
use crate::forms::{LoginForm, SignupForm};
use crate::loadable::Loadable;
use crate::models::{Company, Location, Role};
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::session::Session;
use crate::view::{verify_login, AuthMode, Tab, ViewState};

/// Locations and companies used by the selection inputs.
#[derive(Debug, Default)]
pub struct References {
    pub locations: Loadable<Vec<Location>>,
    pub companies: Loadable<Vec<Company>>,
}

impl References {
    pub fn locations(&self) -> &[Location] {
        self.locations.data().map_or(&[], Vec::as_slice)
    }

    pub fn companies(&self) -> &[Company] {
        self.companies.data().map_or(&[], Vec::as_slice)
    }

    /// Requests whatever is not loaded or loading yet.
    fn ensure_loaded(&mut self) -> Command {
        let locations = if self.locations.data().is_none() && !self.locations.loading {
            self.locations.begin();
            Command::LoadLocations
        } else {
            Command::None
        };
        let companies = if self.companies.data().is_none() && !self.companies.loading {
            self.companies.begin();
            Command::LoadCompanies
        } else {
            Command::None
        };
        Command::batch([locations, companies])
    }
}

#[derive(Debug)]
pub struct App {
    view: ViewState,
    session: Option<Session>,
    /// Bumped whenever a session begins or ends; completions carrying an
    /// older serial are dropped.
    serial: u64,
    page_size: usize,
    submitting: bool,
    alert: Option<String>,
    pub login_form: LoginForm,
    pub signup_form: SignupForm,
    pub references: References,
}

impl Default for App {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl App {
    pub fn new(page_size: usize) -> Self {
        Self {
            view: ViewState::NoRole,
            session: None,
            serial: 0,
            page_size,
            submitting: false,
            alert: None,
            login_form: LoginForm::default(),
            signup_form: SignupForm::default(),
            references: References::default(),
        }
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The alert to show, app-level first, then the session's.
    pub fn alert(&self) -> Option<&str> {
        self.alert
            .as_deref()
            .or_else(|| self.session.as_ref().and_then(Session::alert))
    }

    pub fn dismiss_alert(&mut self) {
        if self.alert.take().is_none() {
            if let Some(session) = self.session.as_mut() {
                session.dismiss_alert();
            }
        }
    }

    // --- Role selection and authentication ---

    pub fn select_role(&mut self, role: Role) -> Command {
        if self.view != ViewState::NoRole {
            return Command::None;
        }
        self.view = ViewState::Auth {
            role,
            mode: AuthMode::Login,
        };
        self.references.ensure_loaded()
    }

    /// Leaves the auth screens. An outstanding login is abandoned.
    pub fn back_to_roles(&mut self) {
        if let ViewState::Auth { .. } = self.view {
            self.view = ViewState::NoRole;
            self.serial += 1;
            self.submitting = false;
            self.login_form = LoginForm::default();
            self.signup_form = SignupForm::default();
        }
    }

    pub fn set_auth_mode(&mut self, mode: AuthMode) {
        if let ViewState::Auth { role, .. } = self.view {
            self.view = ViewState::Auth { role, mode };
        }
    }

    pub fn submit_login(&mut self) -> Command {
        let ViewState::Auth { role, .. } = self.view else {
            return Command::None;
        };
        if self.submitting {
            return Command::None;
        }
        match self.login_form.validate() {
            Ok(request) => {
                self.submitting = true;
                Command::Login { role, request }
            }
            Err(err) => {
                self.alert = Some(err.to_string());
                Command::None
            }
        }
    }

    pub fn submit_signup(&mut self) -> Command {
        let ViewState::Auth { role, .. } = self.view else {
            return Command::None;
        };
        if self.submitting {
            return Command::None;
        }
        let result = self.signup_form.validate(
            role,
            self.references.locations(),
            self.references.companies(),
        );
        match result {
            Ok(request) => {
                self.submitting = true;
                Command::Signup { role, request }
            }
            Err(err) => {
                self.alert = Some(err.to_string());
                Command::None
            }
        }
    }

    /// Ends the session. All session state goes at once.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            info!("User {} signed out", session.user_id());
        }
        self.serial += 1;
        self.view = ViewState::NoRole;
        self.submitting = false;
        self.alert = None;
        self.login_form = LoginForm::default();
        self.signup_form = SignupForm::default();
    }

    // --- Navigation ---

    pub fn select_tab(&mut self, tab: Tab) -> Command {
        let ViewState::LoggedIn { role, .. } = self.view else {
            return Command::None;
        };
        if !Tab::for_role(role).contains(&tab) {
            return Command::None;
        }
        self.view = ViewState::LoggedIn { role, tab };
        match self.session.as_mut() {
            Some(session) => session.activate_tab(tab),
            None => Command::None,
        }
    }

    pub fn cycle_tab(&mut self, offset: isize) -> Command {
        match self.view.cycle_tab(offset) {
            Some(tab) => self.select_tab(tab),
            None => Command::None,
        }
    }

    // --- Completions ---

    pub fn handle(&mut self, envelope: Envelope) -> Command {
        let Envelope { serial, completion } = envelope;
        match completion {
            // reference data outlives sessions
            Completion::Locations(result) => {
                let generation = self.references.locations.generation();
                self.references.locations.finish(generation, result, "locations");
                Command::None
            }
            Completion::Companies(result) => {
                let generation = self.references.companies.generation();
                self.references.companies.finish(generation, result, "companies");
                Command::None
            }
            _ if serial != self.serial => {
                debug!("Dropping completion from ended session {}", serial);
                Command::None
            }
            Completion::LoggedIn { role, result } => {
                self.submitting = false;
                let profile = match result {
                    Ok(profile) => profile,
                    Err(err) => {
                        warn!("Login failed: {}", err);
                        self.alert = Some(match err.status() {
                            Some(_) => err.user_message(),
                            None => "Login failed. Please try again.".to_string(),
                        });
                        return Command::None;
                    }
                };
                let user_id = match verify_login(role, &profile) {
                    Ok(user_id) => user_id,
                    Err(err) => {
                        warn!("Login rejected: {}", err);
                        self.alert = Some(err.to_string());
                        return Command::None;
                    }
                };
                info!("User {} logged in as {}", user_id, role.as_str());
                self.serial += 1;
                self.login_form = LoginForm::default();
                self.view = ViewState::LoggedIn {
                    role,
                    tab: Tab::default_for(role),
                };
                let session = self
                    .session
                    .insert(Session::new(profile, user_id, role, self.page_size));
                session.start()
            }
            Completion::SignedUp { role, result } => {
                self.submitting = false;
                match result {
                    Ok(_) => {
                        info!("Signed up a new {} account", role.as_str());
                        self.signup_form = SignupForm::default();
                        self.set_auth_mode(AuthMode::Login);
                        self.alert = Some("Signup successful! Please log in.".to_string());
                    }
                    Err(err) => {
                        warn!("Signup failed: {}", err);
                        self.alert = Some(match err.status() {
                            Some(_) => err.user_message(),
                            None => "Failed to sign up. Please try again.".to_string(),
                        });
                    }
                }
                Command::None
            }
            other => match self.session.as_mut() {
                Some(session) => session.apply_completion(other),
                None => Command::None,
            },
        }
    }
}
