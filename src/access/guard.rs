use std::fmt;

use tracing::debug;

use crate::error::StorageError;
use crate::models::{Role, UserSummary};
use crate::store::CredentialStore;

/// A section of the portal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Patient,
    Admin,
    HealthcareWorker,
    FacilityConsents,
    NotFound(String),
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match normalized {
            "/" => Route::Login,
            "/signup" => Route::Signup,
            "/patient" => Route::Patient,
            "/admin" => Route::Admin,
            "/healthcare-worker" => Route::HealthcareWorker,
            "/healthcare-worker/consents" => Route::FacilityConsents,
            _ => Route::NotFound(trimmed.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/",
            Route::Signup => "/signup",
            Route::Patient => "/patient",
            Route::Admin => "/admin",
            Route::HealthcareWorker => "/healthcare-worker",
            Route::FacilityConsents => "/healthcare-worker/consents",
            Route::NotFound(path) => path,
        }
    }

    /// Roles that may open the route. `None` means the route is public.
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Route::Login | Route::Signup | Route::NotFound(_) => None,
            Route::Patient => Some(&[Role::Patient]),
            Route::Admin => Some(&[Role::Admin]),
            Route::HealthcareWorker | Route::FacilityConsents => Some(&[Role::HealthcareWorker]),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The route can be shown. Carries the stored user when one exists.
    Allow(Option<UserSummary>),
    /// No access token is stored; send the visitor to login, remembering where they were going.
    RedirectToLogin { from: String },
    NotFound,
}

/// Decides whether the stored session may open a route.
pub struct RouteGate;

impl RouteGate {
    pub async fn check(
        route: &Route,
        credentials: &CredentialStore,
    ) -> Result<GateDecision, StorageError> {
        let active = credentials.active().await?;

        if let Route::NotFound(_) = route {
            return Ok(GateDecision::NotFound);
        }
        let Some(allowed) = route.allowed_roles() else {
            return Ok(GateDecision::Allow(active.and_then(|c| c.user)));
        };

        let Some(credential) = active else {
            debug!(route = route.path(), "No stored session; redirecting to login");
            return Ok(GateDecision::RedirectToLogin {
                from: route.path().to_string(),
            });
        };

        match credential.user {
            Some(user) if allowed.contains(&user.role) => Ok(GateDecision::Allow(Some(user))),
            user => {
                debug!(
                    route = route.path(),
                    role = user.as_ref().map(|u| u.role.as_str()).unwrap_or("none"),
                    "Role may not open route"
                );
                Ok(GateDecision::NotFound)
            }
        }
    }
}
