//! # Route Access Control
//!
//! A static allow-list mapping (method, path pattern) to the audience that
//! may call it. Rules are checked in order and the first match wins, so more
//! specific patterns must precede wildcard ones (`/checklists/me` before
//! `/checklists/:student_id`). A request matching no rule is treated as an
//! unknown route.
//!
//! Ownership (a teacher's own section, a student's own submission) is not
//! expressible here and is checked by the handlers.

use axum::http::Method;
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::user::Role;

/// Identity attached to every authenticated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_teacher(&self) -> bool {
        self.role == Role::Teacher
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    /// Error unless the caller has one of `roles`
    pub fn require_any(&self, roles: &[Role]) -> AuthResult<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

/// Who may call a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// No token required
    Public,
    /// Any valid token
    Authenticated,
    /// A valid token whose role is listed
    Roles(&'static [Role]),
}

impl Audience {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Audience::Public | Audience::Authenticated => true,
            Audience::Roles(roles) => roles.contains(&role),
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Audience::Public)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Verb {
    pub fn from_method(method: &Method) -> Option<Self> {
        match method {
            &Method::GET | &Method::HEAD => Some(Verb::Get),
            &Method::POST => Some(Verb::Post),
            &Method::PUT => Some(Verb::Put),
            &Method::PATCH => Some(Verb::Patch),
            &Method::DELETE => Some(Verb::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub verb: Verb,
    /// `/`-separated segments; a segment starting with `:` matches any value
    pub pattern: &'static str,
    pub audience: Audience,
}

const fn rule(verb: Verb, pattern: &'static str, audience: Audience) -> Rule {
    Rule {
        verb,
        pattern,
        audience,
    }
}

const ADMIN: Audience = Audience::Roles(&[Role::Admin]);
const STAFF: Audience = Audience::Roles(&[Role::Admin, Role::Teacher]);
const STUDENT: Audience = Audience::Roles(&[Role::Student]);
const OWNER_OR_ADMIN: Audience = Audience::Roles(&[Role::Admin, Role::Student]);
const ANYONE: Audience = Audience::Authenticated;
const PUBLIC: Audience = Audience::Public;

use Verb::{Delete, Get, Patch, Post, Put};

pub const RULES: &[Rule] = &[
    rule(Get, "/health", PUBLIC),
    // auth
    rule(Post, "/api/auth/register", PUBLIC),
    rule(Post, "/api/auth/login", PUBLIC),
    rule(Get, "/api/auth/me", ANYONE),
    rule(Post, "/api/auth/change-password", ANYONE),
    // users
    rule(Get, "/api/users", STAFF),
    rule(Get, "/api/users/:id", STAFF),
    rule(Patch, "/api/users/:id", ADMIN),
    rule(Delete, "/api/users/:id", ADMIN),
    // invites
    rule(Post, "/api/invites/verify", PUBLIC),
    rule(Get, "/api/invites", ADMIN),
    rule(Post, "/api/invites", ADMIN),
    rule(Delete, "/api/invites/:id", ADMIN),
    // sections
    rule(Get, "/api/sections", ANYONE),
    rule(Post, "/api/sections", ADMIN),
    rule(Post, "/api/sections/join", STUDENT),
    rule(Get, "/api/sections/:id", ANYONE),
    rule(Patch, "/api/sections/:id", ADMIN),
    rule(Delete, "/api/sections/:id", ADMIN),
    rule(Post, "/api/sections/:id/students", STAFF),
    rule(Delete, "/api/sections/:id/students/:student_id", STAFF),
    // jobs
    rule(Get, "/api/jobs", ANYONE),
    rule(Post, "/api/jobs", STAFF),
    rule(Get, "/api/jobs/:id", ANYONE),
    rule(Patch, "/api/jobs/:id", STAFF),
    rule(Delete, "/api/jobs/:id", STAFF),
    // submissions
    rule(Get, "/api/submissions", ANYONE),
    rule(Post, "/api/submissions", STUDENT),
    rule(Get, "/api/submissions/:id", ANYONE),
    rule(Delete, "/api/submissions/:id", OWNER_OR_ADMIN),
    rule(Get, "/api/submissions/:id/prompt", ANYONE),
    rule(Put, "/api/submissions/:id/feedback", ANYONE),
    rule(Post, "/api/submissions/:id/grade", ANYONE),
    rule(Patch, "/api/submissions/:id/review", STAFF),
    // checklists
    rule(Get, "/api/checklists/me", STUDENT),
    rule(Post, "/api/checklists/me/items", STUDENT),
    rule(Patch, "/api/checklists/me/items/:item_id", STUDENT),
    rule(Delete, "/api/checklists/me/items/:item_id", STUDENT),
    rule(Get, "/api/checklists/:student_id", STAFF),
    // stats
    rule(Get, "/api/stats/weaknesses", STAFF),
    rule(Get, "/api/stats/overview", ADMIN),
];

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');

    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) => {
                if p.starts_with(':') {
                    if s.is_empty() {
                        return false;
                    }
                } else if p != s {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Find the first rule admitting this method and path
pub fn lookup(method: &Method, path: &str) -> Option<&'static Rule> {
    let verb = Verb::from_method(method)?;
    RULES
        .iter()
        .find(|r| r.verb == verb && pattern_matches(r.pattern, path))
}
