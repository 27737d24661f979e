use crate::models::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Clients,
    NewClient,
    Supervisor,
    Unauthorized,
}

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Guarded { required_role: Option<Role> },
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Login,
        Route::Register,
        Route::Dashboard,
        Route::Clients,
        Route::NewClient,
        Route::Supervisor,
        Route::Unauthorized,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Clients => "/clients",
            Route::NewClient => "/clients/new",
            Route::Supervisor => "/supervisor",
            Route::Unauthorized => "/unauthorized",
        }
    }

    /// Resolve a path. The index path lands on the dashboard.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Some(Route::Dashboard);
        }
        Route::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register | Route::Unauthorized => Access::Public,
            Route::Dashboard | Route::Clients | Route::NewClient => {
                Access::Guarded { required_role: None }
            }
            Route::Supervisor => Access::Guarded {
                required_role: Some(Role::Supervisor),
            },
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Sign in",
            Route::Register => "Create account",
            Route::Dashboard => "Dashboard",
            Route::Clients => "Clients",
            Route::NewClient => "New client",
            Route::Supervisor => "Supervisor",
            Route::Unauthorized => "Unauthorized",
        }
    }
}
