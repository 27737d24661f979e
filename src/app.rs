//! Application state: the requested route, the screen built for it, and the
//! handlers that turn screen actions into session and directory calls.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, error, info, warn};
use tui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame,
};
use uuid::Uuid;

use crate::backend::{BackendError, Services};
use crate::directory::{ClientDirectory, DirectoryError};
use crate::guard::{guard, Guarded};
use crate::models::{ClientDraft, Identity, Role};
use crate::routes::{Access, Route};
use crate::session::SessionStore;
use crate::ui::{
    self,
    client_wizard::{self, ClientWizardAction, ClientWizardState},
    clients::{self, ClientAction, ClientsState},
    dashboard::{self, DashboardAction, DashboardState},
    login::{self, LoginAction, LoginState},
    notice::Notice,
    register::{self, RegisterAction, RegisterState},
    supervisor::{self, SupervisorAction, SupervisorState},
    unauthorized::{self, UnauthorizedAction},
};

// Represents the screen currently on display
pub enum Screen {
    Loading,
    Login(LoginState),
    Register(RegisterState),
    Dashboard(DashboardState),
    Clients(ClientsState),
    ClientWizard(ClientWizardState),
    Supervisor(SupervisorState),
    Unauthorized,
}

fn public_screen(route: Route) -> Screen {
    match route {
        Route::Login => Screen::Login(LoginState::new()),
        Route::Register => Screen::Register(RegisterState::new()),
        Route::Unauthorized => Screen::Unauthorized,
        Route::Dashboard | Route::Clients | Route::NewClient | Route::Supervisor => Screen::Loading,
    }
}

pub struct App {
    services: Services,
    directory: ClientDirectory,
    session: SessionStore,
    route: Route,
    screen: Screen,
    notice: Option<Notice>,
}

impl App {
    pub fn new(services: Services, start: Route) -> Self {
        let session = SessionStore::start(services.auth.clone(), services.profiles.clone());
        Self {
            directory: ClientDirectory::new(&services),
            services,
            session,
            route: start,
            screen: Screen::Loading,
            notice: None,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Apply the initial session state and build the first screen.
    pub async fn open(&mut self) {
        self.session.sync().await;
        self.resolve().await;
    }

    /// Apply a pending auth notification; a guarded route is re-evaluated
    /// whenever the session changes.
    pub async fn refresh_session(&mut self) {
        if self.session.sync().await && matches!(self.route.access(), Access::Guarded { .. }) {
            self.resolve().await;
        }
    }

    pub async fn navigate(&mut self, route: Route) {
        self.route = route;
        self.resolve().await;
    }

    /// Build the screen for the current route. Guarded routes go through the
    /// guard first; protected screens are only constructed once it has
    /// produced an identity.
    async fn resolve(&mut self) {
        let required_role = match self.route.access() {
            Access::Public => {
                self.screen = public_screen(self.route);
                return;
            }
            Access::Guarded { required_role } => required_role,
        };

        let identity = match guard(self.session.state(), required_role) {
            Guarded::Placeholder => {
                self.screen = Screen::Loading;
                return;
            }
            Guarded::Redirect(target) => {
                debug!(from = self.route.path(), to = target.path(), "guard redirect");
                self.route = target;
                self.screen = public_screen(target);
                return;
            }
            Guarded::Render(identity) => identity.clone(),
        };

        self.screen = self.build_protected(&identity).await;
    }

    async fn build_protected(&mut self, identity: &Identity) -> Screen {
        match self.route {
            Route::Dashboard => {
                let mut state = DashboardState::new(identity);
                match self.directory.dashboard().await {
                    Ok(summary) => state.set_summary(summary),
                    Err(err) => self.report("Could not load dashboard data", &err),
                }
                Screen::Dashboard(state)
            }
            Route::Clients => {
                let mut state = ClientsState::new(Vec::new());
                match self.directory.list().await {
                    Ok(list) => state.replace(list),
                    Err(err) => self.report("Could not load clients", &err),
                }
                Screen::Clients(state)
            }
            Route::NewClient => Screen::ClientWizard(ClientWizardState::new(identity)),
            Route::Supervisor => {
                let mut state = SupervisorState::new();
                match self.directory.creators().await {
                    Ok(summary) => state.set_summary(summary),
                    Err(err) => self.report("Could not load team activity", &err),
                }
                Screen::Supervisor(state)
            }
            Route::Login | Route::Register | Route::Unauthorized => public_screen(self.route),
        }
    }

    fn report(&mut self, message: &str, err: &DirectoryError) {
        error!(error = %err, "{}", message);
        self.notice = Some(Notice::error(message));
    }

    /// Handle one key press. Returns true when the application should exit.
    pub async fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }

        self.notice = None;

        match &mut self.screen {
            Screen::Loading => matches!(key.code, KeyCode::Esc | KeyCode::Char('q')),
            Screen::Login(state) => match login::handle_input(state, key) {
                Some(action) => self.on_login(action).await,
                None => false,
            },
            Screen::Register(state) => {
                if let Some(action) = register::handle_input(state, key) {
                    self.on_register(action).await;
                }
                false
            }
            Screen::Dashboard(_) => match dashboard::handle_input(key) {
                Some(action) => self.on_dashboard(action).await,
                None => false,
            },
            Screen::Clients(state) => {
                if let Some(action) = clients::handle_input(state, key) {
                    self.on_clients(action).await;
                }
                false
            }
            Screen::ClientWizard(state) => {
                if let Some(action) = client_wizard::handle_input(state, key) {
                    self.on_client_wizard(action).await;
                }
                false
            }
            Screen::Supervisor(state) => {
                if let Some(action) = supervisor::handle_input(state, key) {
                    match action {
                        SupervisorAction::Back => self.navigate(Route::Dashboard).await,
                        SupervisorAction::Refresh => self.reload_supervisor().await,
                    }
                }
                false
            }
            Screen::Unauthorized => match unauthorized::handle_input(key) {
                Some(UnauthorizedAction::Back) => {
                    self.navigate(Route::Dashboard).await;
                    false
                }
                Some(UnauthorizedAction::Quit) => true,
                None => false,
            },
        }
    }

    async fn on_login(&mut self, action: LoginAction) -> bool {
        match action {
            LoginAction::Quit => return true,
            LoginAction::Register => self.navigate(Route::Register).await,
            LoginAction::Missing(label) => {
                self.notice = Some(Notice::error(format!("{label} is required")));
            }
            LoginAction::Submit { email, password } => self.sign_in(&email, &password).await,
        }
        false
    }

    async fn sign_in(&mut self, email: &str, password: &str) {
        match self.services.auth.sign_in(email, password).await {
            Ok(principal) => {
                info!(principal = %principal.id, "sign-in accepted");
                self.session.sync().await;
                self.navigate(Route::Dashboard).await;
            }
            Err(BackendError::InvalidCredentials) => {
                warn!("sign-in rejected");
                self.notice = Some(Notice::error("Invalid email or password"));
            }
            Err(err) => {
                error!(error = %err, "sign-in failed");
                self.notice = Some(Notice::error("Could not sign in, try again later"));
            }
        }
    }

    async fn on_register(&mut self, action: RegisterAction) {
        match action {
            RegisterAction::Login => self.navigate(Route::Login).await,
            RegisterAction::Missing(label) => {
                self.notice = Some(Notice::error(format!("{label} is required")));
            }
            RegisterAction::Submit { name, email, password } => {
                self.register(name, email, password).await
            }
        }
    }

    async fn register(&mut self, name: String, email: String, password: String) {
        if !email.contains('@') {
            self.notice = Some(Notice::error("Email must be an email address"));
            return;
        }

        let principal = match self.services.auth.register(&email, &password).await {
            Ok(principal) => principal,
            Err(BackendError::AlreadyExists { .. }) => {
                self.notice = Some(Notice::error("An account with this email already exists"));
                return;
            }
            Err(err) => {
                error!(error = %err, "registration failed");
                self.notice = Some(Notice::error("Could not create the account"));
                return;
            }
        };

        let identity = Identity {
            id: principal.id,
            email: principal.email,
            role: Role::User,
            name,
        };
        if let Err(err) = self.services.profiles.insert_profile(&identity).await {
            error!(error = %err, user = %identity.id, "profile creation failed");
            self.notice = Some(Notice::error("Account created but the profile could not be saved"));
        }

        self.session.sync().await;
        self.navigate(Route::Dashboard).await;
    }

    async fn on_dashboard(&mut self, action: DashboardAction) -> bool {
        match action {
            DashboardAction::Quit => return true,
            DashboardAction::Clients => self.navigate(Route::Clients).await,
            DashboardAction::NewClient => self.navigate(Route::NewClient).await,
            DashboardAction::Supervisor => self.navigate(Route::Supervisor).await,
            DashboardAction::Refresh => self.reload_dashboard().await,
            DashboardAction::SignOut => self.sign_out().await,
        }
        false
    }

    /// Refresh the summary in place; on failure the previous numbers stay.
    async fn reload_dashboard(&mut self) {
        match self.directory.dashboard().await {
            Ok(summary) => {
                if let Screen::Dashboard(state) = &mut self.screen {
                    state.set_summary(summary);
                }
            }
            Err(err) => self.report("Could not load dashboard data", &err),
        }
    }

    async fn reload_supervisor(&mut self) {
        match self.directory.creators().await {
            Ok(summary) => {
                if let Screen::Supervisor(state) = &mut self.screen {
                    state.set_summary(summary);
                }
            }
            Err(err) => self.report("Could not load team activity", &err),
        }
    }

    async fn sign_out(&mut self) {
        if let Err(err) = self.session.sign_out().await {
            error!(error = %err, "sign-out failed");
            self.notice = Some(Notice::error("Could not sign out cleanly"));
        }
        self.resolve().await;
    }

    async fn on_clients(&mut self, action: ClientAction) {
        match action {
            ClientAction::Back => self.navigate(Route::Dashboard).await,
            ClientAction::NewClient => self.navigate(Route::NewClient).await,
            ClientAction::Refresh => self.reload_clients().await,
            ClientAction::DeleteClient(id) => self.delete_client(id).await,
        }
    }

    /// Reload the list in place; on failure the previous list stays.
    async fn reload_clients(&mut self) {
        match self.directory.list().await {
            Ok(list) => {
                if let Screen::Clients(state) = &mut self.screen {
                    state.replace(list);
                }
            }
            Err(err) => self.report("Could not load clients", &err),
        }
    }

    async fn delete_client(&mut self, id: Uuid) {
        match self.directory.delete(id).await {
            Ok(()) => {
                self.notice = Some(Notice::success("Client deleted"));
                self.reload_clients().await;
            }
            Err(err) => self.report("Could not delete client", &err),
        }
    }

    async fn on_client_wizard(&mut self, action: ClientWizardAction) {
        match action {
            ClientWizardAction::Cancel => self.navigate(Route::Clients).await,
            ClientWizardAction::Missing(label) => {
                self.notice = Some(Notice::error(format!("{label} is required")));
            }
            ClientWizardAction::Save(draft) => self.create_client(draft).await,
        }
    }

    async fn create_client(&mut self, draft: ClientDraft) {
        let actor = match guard(self.session.state(), None) {
            Guarded::Render(identity) => identity.clone(),
            Guarded::Placeholder | Guarded::Redirect(_) => {
                self.resolve().await;
                return;
            }
        };

        match self.directory.create(draft, &actor).await {
            Ok(client) => {
                self.notice = Some(Notice::success(format!("Client {} created", client.full_name())));
                self.navigate(Route::Clients).await;
            }
            Err(DirectoryError::DuplicateIdentification(number)) => {
                warn!(identification_number = %number, "duplicate client rejected");
                self.notice = Some(Notice::error(
                    "A client with this identification number already exists",
                ));
            }
            Err(err @ DirectoryError::Validation { .. }) => {
                self.notice = Some(Notice::error(format!("Invalid client: {err}")));
            }
            Err(err) => self.report("Could not create client", &err),
        }
    }

    pub fn draw<B: Backend>(&mut self, f: &mut Frame<B>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Length(2),
                    Constraint::Min(1),
                    Constraint::Length(2),
                ]
                .as_ref(),
            )
            .split(f.size());

        ui::render_header(f, chunks[0], self.route, self.session.identity());

        match &mut self.screen {
            Screen::Loading => ui::render_loading(f, chunks[1]),
            Screen::Login(state) => login::render_login(f, state, chunks[1]),
            Screen::Register(state) => register::render_register(f, state, chunks[1]),
            Screen::Dashboard(state) => dashboard::render_dashboard(f, state, chunks[1]),
            Screen::Clients(state) => clients::render_clients(f, state, chunks[1]),
            Screen::ClientWizard(state) => client_wizard::render_client_wizard(f, state, chunks[1]),
            Screen::Supervisor(state) => supervisor::render_supervisor(f, state, chunks[1]),
            Screen::Unauthorized => unauthorized::render_unauthorized(f, chunks[1]),
        }

        ui::render_footer(f, chunks[2], self.notice.as_ref());
    }

    /// Detach from the auth provider.
    pub fn shutdown(&mut self) {
        self.session.teardown();
        debug!(listeners = self.services.auth.listener_count(), "app shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::{AuthProvider, ClientStore, ProfileStore};
    use crate::ui::notice::NoticeKind;
    use chrono::Utc;
    use tui::{backend::TestBackend, Terminal};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c))).await;
        }
    }

    async fn anonymous_app() -> (Arc<MemoryBackend>, App) {
        let backend = Arc::new(MemoryBackend::new());
        let mut app = App::new(Services::from_backend(backend.clone()), Route::Dashboard);
        app.open().await;
        (backend, app)
    }

    async fn signed_in_app(role: Role) -> (Arc<MemoryBackend>, App, Identity) {
        let backend = Arc::new(MemoryBackend::new());
        let identity = backend
            .seed_user("staff@example.com", "pw", "Staff", role)
            .unwrap();
        backend.sign_in("staff@example.com", "pw").await.unwrap();
        let mut app = App::new(Services::from_backend(backend.clone()), Route::Dashboard);
        app.open().await;
        (backend, app, identity)
    }

    fn draft(identification_number: &str) -> ClientDraft {
        ClientDraft {
            identification_number: identification_number.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Ruiz".to_string(),
            email: "ana@example.com".to_string(),
            phone: "555-0100".to_string(),
            address: "1 Main St".to_string(),
        }
    }

    fn fill_wizard(app: &mut App, draft: &ClientDraft) {
        let Screen::ClientWizard(state) = &mut app.screen else {
            panic!("expected the client wizard");
        };
        let form = state.form_mut();
        form.set_value(0, &draft.identification_number);
        form.set_value(1, &draft.first_name);
        form.set_value(2, &draft.last_name);
        form.set_value(3, &draft.email);
        form.set_value(4, &draft.phone);
        form.set_value(5, &draft.address);
    }

    fn listed_clients(app: &App) -> Vec<String> {
        match &app.screen {
            Screen::Clients(state) => state
                .clients()
                .iter()
                .map(|c| c.identification_number.clone())
                .collect(),
            _ => panic!("expected the client list"),
        }
    }

    #[tokio::test]
    async fn unresolved_session_shows_placeholder_without_redirect() {
        let backend = Arc::new(MemoryBackend::new());
        let mut app = App::new(Services::from_backend(backend), Route::Clients);

        app.resolve().await;
        assert_eq!(app.route(), Route::Clients);
        assert!(matches!(app.screen, Screen::Loading));
    }

    #[tokio::test]
    async fn anonymous_start_lands_on_login() {
        let (_backend, app) = anonymous_app().await;
        assert_eq!(app.route(), Route::Login);
        assert!(matches!(app.screen, Screen::Login(_)));
    }

    #[tokio::test]
    async fn anonymous_navigation_to_guarded_routes_redirects_to_login() {
        let (_backend, mut app) = anonymous_app().await;
        for route in [Route::Dashboard, Route::Clients, Route::NewClient, Route::Supervisor] {
            app.navigate(route).await;
            assert_eq!(app.route(), Route::Login);
        }
    }

    #[tokio::test]
    async fn login_form_signs_in_and_opens_dashboard() {
        let (backend, mut app) = anonymous_app().await;
        backend
            .seed_user("ana@example.com", "secret", "Ana", Role::User)
            .unwrap();

        type_text(&mut app, "ana@example.com").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(&mut app, "secret").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::Dashboard);
        let Screen::Dashboard(state) = &app.screen else {
            panic!("expected the dashboard");
        };
        assert_eq!(state.summary().unwrap().total_clients, 0);
        assert_eq!(app.session.identity().map(|i| i.name.as_str()), Some("Ana"));
    }

    #[tokio::test]
    async fn wrong_password_stays_on_login() {
        let (backend, mut app) = anonymous_app().await;
        backend
            .seed_user("ana@example.com", "secret", "Ana", Role::User)
            .unwrap();

        type_text(&mut app, "ana@example.com").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(&mut app, "guess").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.notice, Some(Notice::error("Invalid email or password")));
    }

    #[tokio::test]
    async fn empty_login_form_reports_missing_field() {
        let (_backend, mut app) = anonymous_app().await;
        app.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(app.notice, Some(Notice::error("Email is required")));
    }

    #[tokio::test]
    async fn principal_without_profile_is_sent_back_to_login() {
        let (backend, mut app) = anonymous_app().await;
        backend.register("ghost@example.com", "pw").await.unwrap();
        backend.sign_out().await.unwrap();
        app.refresh_session().await;

        type_text(&mut app, "ghost@example.com").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(&mut app, "pw").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::Login);
        assert!(app.session.identity().is_none());
        assert!(!app.session.is_loading());
    }

    #[tokio::test]
    async fn registration_creates_user_profile() {
        let (backend, mut app) = anonymous_app().await;
        app.handle_key(key(KeyCode::F(2))).await;
        assert_eq!(app.route(), Route::Register);

        type_text(&mut app, "Nico").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(&mut app, "nico@example.com").await;
        app.handle_key(key(KeyCode::Tab)).await;
        type_text(&mut app, "pw").await;
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::Dashboard);
        let identity = app.session.identity().cloned().unwrap();
        assert_eq!(identity.role, Role::User);
        assert_eq!(backend.get_profile(identity.id).await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn user_role_is_turned_away_from_supervisor_view() {
        let (_backend, mut app, _) = signed_in_app(Role::User).await;
        app.handle_key(key(KeyCode::Char('s'))).await;

        assert_eq!(app.route(), Route::Unauthorized);
        assert!(matches!(app.screen, Screen::Unauthorized));

        app.handle_key(key(KeyCode::Enter)).await;
        assert_eq!(app.route(), Route::Dashboard);
    }

    #[tokio::test]
    async fn supervisor_sees_team_activity() {
        let (backend, mut app, supervisor) = signed_in_app(Role::Supervisor).await;
        backend.insert_client(&draft("S1"), Utc::now(), supervisor.id).await.unwrap();

        app.navigate(Route::Supervisor).await;
        let Screen::Supervisor(state) = &app.screen else {
            panic!("expected the supervisor view");
        };
        let summary = state.summary().unwrap();
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].clients, 1);
    }

    #[tokio::test]
    async fn wizard_creates_client_and_rejects_duplicate() {
        let (backend, mut app, identity) = signed_in_app(Role::User).await;

        app.navigate(Route::NewClient).await;
        fill_wizard(&mut app, &draft("A1"));
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::Clients);
        assert_eq!(listed_clients(&app), vec!["A1"]);
        assert_eq!(app.notice.as_ref().map(|n| n.kind), Some(NoticeKind::Success));
        let stored = backend.find_by_identification("A1").await.unwrap().unwrap();
        assert_eq!(stored.created_by, identity.id);

        app.handle_key(key(KeyCode::Char('n'))).await;
        assert_eq!(app.route(), Route::NewClient);
        fill_wizard(&mut app, &draft("A1"));
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::NewClient);
        assert_eq!(
            app.notice,
            Some(Notice::error("A client with this identification number already exists"))
        );
        assert_eq!(backend.count_clients().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_after_confirmation() {
        let (backend, mut app, identity) = signed_in_app(Role::User).await;
        backend.insert_client(&draft("D1"), Utc::now(), identity.id).await.unwrap();
        app.navigate(Route::Clients).await;
        assert_eq!(listed_clients(&app), vec!["D1"]);

        app.handle_key(key(KeyCode::Char('d'))).await;
        app.handle_key(key(KeyCode::Char('y'))).await;

        assert!(listed_clients(&app).is_empty());
        assert_eq!(app.notice, Some(Notice::success("Client deleted")));
        assert_eq!(backend.count_clients().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_list() {
        let (backend, mut app, identity) = signed_in_app(Role::User).await;
        backend.insert_client(&draft("K1"), Utc::now(), identity.id).await.unwrap();
        app.navigate(Route::Clients).await;

        backend.set_offline(true);
        app.handle_key(key(KeyCode::Char('r'))).await;

        assert_eq!(listed_clients(&app), vec!["K1"]);
        assert_eq!(app.notice, Some(Notice::error("Could not load clients")));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_summaries() {
        let (backend, mut app, identity) = signed_in_app(Role::Supervisor).await;
        backend.insert_client(&draft("R1"), Utc::now(), identity.id).await.unwrap();
        app.navigate(Route::Dashboard).await;

        backend.set_offline(true);
        app.handle_key(key(KeyCode::Char('r'))).await;

        let Screen::Dashboard(state) = &app.screen else {
            panic!("expected the dashboard");
        };
        assert_eq!(state.summary().unwrap().total_clients, 1);
        assert_eq!(app.notice, Some(Notice::error("Could not load dashboard data")));

        backend.set_offline(false);
        app.navigate(Route::Supervisor).await;
        backend.set_offline(true);
        app.handle_key(key(KeyCode::Char('r'))).await;

        let Screen::Supervisor(state) = &app.screen else {
            panic!("expected the supervisor view");
        };
        assert_eq!(state.summary().unwrap().rows[0].clients, 1);
        assert_eq!(app.notice, Some(Notice::error("Could not load team activity")));
    }

    #[tokio::test]
    async fn dashboard_outage_shows_notice() {
        let (backend, mut app, _) = signed_in_app(Role::User).await;
        backend.set_offline(true);
        app.navigate(Route::Dashboard).await;

        let Screen::Dashboard(state) = &app.screen else {
            panic!("expected the dashboard");
        };
        assert!(state.summary().is_none());
        assert_eq!(app.notice, Some(Notice::error("Could not load dashboard data")));
    }

    #[tokio::test]
    async fn failed_delete_leaves_list_unchanged() {
        let (backend, mut app, identity) = signed_in_app(Role::User).await;
        backend.insert_client(&draft("D2"), Utc::now(), identity.id).await.unwrap();
        app.navigate(Route::Clients).await;

        backend.set_offline(true);
        app.handle_key(key(KeyCode::Char('d'))).await;
        app.handle_key(key(KeyCode::Char('y'))).await;

        assert_eq!(listed_clients(&app), vec!["D2"]);
        assert_eq!(app.notice, Some(Notice::error("Could not delete client")));

        backend.set_offline(false);
        assert_eq!(backend.count_clients().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_create_stays_on_wizard() {
        let (backend, mut app, _) = signed_in_app(Role::User).await;
        app.navigate(Route::NewClient).await;
        fill_wizard(&mut app, &draft("C9"));

        backend.set_offline(true);
        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.route(), Route::NewClient);
        assert!(matches!(app.screen, Screen::ClientWizard(_)));
        assert_eq!(app.notice, Some(Notice::error("Could not create client")));

        backend.set_offline(false);
        assert_eq!(backend.count_clients().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sign_out_returns_to_login() {
        let (backend, mut app, _) = signed_in_app(Role::Admin).await;
        app.handle_key(key(KeyCode::Char('o'))).await;

        assert_eq!(app.route(), Route::Login);
        assert!(app.session.identity().is_none());

        app.refresh_session().await;
        assert_eq!(app.route(), Route::Login);
        assert_eq!(backend.listener_count(), 1);
    }

    #[tokio::test]
    async fn external_sign_out_redirects_open_guarded_screen() {
        let (backend, mut app, _) = signed_in_app(Role::User).await;
        app.navigate(Route::Clients).await;

        backend.sign_out().await.unwrap();
        app.refresh_session().await;

        assert_eq!(app.route(), Route::Login);
        assert!(matches!(app.screen, Screen::Login(_)));
    }

    #[tokio::test]
    async fn shutdown_detaches_session_listener() {
        let (backend, mut app) = anonymous_app().await;
        assert_eq!(backend.listener_count(), 1);
        app.shutdown();
        assert_eq!(backend.listener_count(), 0);
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_any_screen() {
        let (_backend, mut app, _) = signed_in_app(Role::User).await;
        app.navigate(Route::NewClient).await;
        let quit = app
            .handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
            .await;
        assert!(quit);
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[tokio::test]
    async fn renders_login_and_dashboard() {
        let (backend, mut app) = anonymous_app().await;
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();

        terminal.draw(|f| app.draw(f)).unwrap();
        assert!(buffer_text(&terminal).contains("Sign in"));

        backend
            .seed_user("ana@example.com", "pw", "Ana", Role::User)
            .unwrap();
        backend.sign_in("ana@example.com", "pw").await.unwrap();
        app.refresh_session().await;
        app.navigate(Route::Dashboard).await;

        terminal.draw(|f| app.draw(f)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Welcome, Ana"));
        assert!(text.contains("Total clients"));
    }
}
