//! The route table.

use std::collections::HashMap;

use crate::RouteAccess;

/// One entry of the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub access: RouteAccess,
    /// A static redirect: entering this route means entering that one.
    /// Followed before the guard runs.
    pub redirect: Option<String>,
}

/// Static route metadata, keyed by path.
///
/// Paths the table doesn't know are public. The host application decides
/// what to render for them; the guard only cares about access.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// The application's routes:
    ///
    /// | Path | Access |
    /// |---|---|
    /// | `/` | redirect to `/dashboard` |
    /// | `/login`, `/register` | guest only |
    /// | `/dashboard`, `/profile`, `/settings` | requires auth |
    pub fn standard() -> Self {
        Self::builder()
            .redirect("/", "/dashboard")
            .route("/login", RouteAccess::GUEST_ONLY)
            .route("/register", RouteAccess::GUEST_ONLY)
            .route("/dashboard", RouteAccess::PROTECTED)
            .route("/profile", RouteAccess::PROTECTED)
            .route("/settings", RouteAccess::PROTECTED)
            .build()
    }

    /// Looks up a location, ignoring any query string or fragment.
    pub fn get(&self, location: &str) -> Option<&Route> {
        self.routes.get(path_of(location))
    }

    /// Access requirements of a location. Unknown paths are public.
    pub fn access(&self, location: &str) -> RouteAccess {
        self.get(location).map(|r| r.access).unwrap_or_default()
    }

    /// The static redirect target of a location, if it has one.
    pub fn redirect_of(&self, location: &str) -> Option<&str> {
        self.get(location).and_then(|r| r.redirect.as_deref())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strips the query string and fragment.
fn path_of(location: &str) -> &str {
    location
        .split(['?', '#'])
        .next()
        .unwrap_or(location)
}

/// Builds a [`RouteTable`]. Later entries for the same path replace
/// earlier ones.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: HashMap<String, Route>,
}

impl RouteTableBuilder {
    pub fn route(mut self, path: impl Into<String>, access: RouteAccess) -> Self {
        let path = path.into();
        self.routes.insert(
            path.clone(),
            Route {
                path,
                access,
                redirect: None,
            },
        );
        self
    }

    pub fn redirect(
        mut self,
        path: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let path = path.into();
        self.routes.insert(
            path.clone(),
            Route {
                path,
                access: RouteAccess::PUBLIC,
                redirect: Some(to.into()),
            },
        );
        self
    }

    pub fn build(self) -> RouteTable {
        RouteTable {
            routes: self.routes,
        }
    }
}
