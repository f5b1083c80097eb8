//! Endpoints and payloads of the target API.
//!
//! Paths are relative to the configured host. Requests against a single company are reported
//! under a templated name, see [`CompanyResource::name`], so that statistics aggregate across
//! all companies.

use serde::{Deserialize, Serialize};

/// Obtain a bearer token from username and password.
pub const LOGIN: &str = "/api/auth/login";
/// Profile of the logged-in user.
pub const CURRENT_USER: &str = "/api/auth/user";
/// List or create companies.
pub const COMPANIES: &str = "/api/company";
/// List corporate groups.
pub const CORPORATE_GROUPS: &str = "/api/corporate-group";
/// List notifications.
pub const NOTIFICATIONS: &str = "/api/notification";
/// Admin panel overview.
pub const ADMIN_OVERVIEW: &str = "/api/admin/overview";
/// List or create users from the admin panel.
pub const ADMIN_USERS: &str = "/api/admin/user";

/// Password given to every user created by the load test.
pub const NEW_USER_PASSWORD: &str = "1234Abch#!";
/// Job title of the creator of a new company.
pub const COMPANY_CREATOR_JOB_TITLE: &str = "CEO";
/// Job title given to invited users.
pub const INVITE_JOB_TITLE: &str = "title";
/// Company role given to invited users.
pub const INVITE_ROLE: &str = "User";

/// A sub-resource of a single company.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompanyResource {
    /// Users of the company.
    Users,
    /// Projects of the company, also used to create a project.
    Projects,
    /// Users invited to the company that did not answer yet.
    PendingUsers,
    /// Activity feed.
    Activity,
    /// Users that can be invited to the company.
    UsersToInvite,
    /// Invite a user to the company.
    InviteUser,
}

impl CompanyResource {
    fn segment(self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Projects => "project",
            Self::PendingUsers => "pending-user",
            Self::Activity => "activity",
            Self::UsersToInvite => "user-to-invite",
            Self::InviteUser => "invite-user",
        }
    }

    /// The path of this resource for the given company.
    pub fn path(self, company_id: &str) -> String {
        format!("{COMPANIES}/{company_id}/{}", self.segment())
    }

    /// The name under which requests to this resource are recorded.
    pub fn name(self) -> &'static str {
        match self {
            Self::Users => "/api/company/{id}/user",
            Self::Projects => "/api/company/{id}/project",
            Self::PendingUsers => "/api/company/{id}/pending-user",
            Self::Activity => "/api/company/{id}/activity",
            Self::UsersToInvite => "/api/company/{id}/user-to-invite",
            Self::InviteUser => "/api/company/{id}/invite-user",
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
}

/// A company as listed by [`COMPANIES`].
#[derive(Debug, Deserialize)]
pub struct Company {
    /// Identifier of the company.
    pub id: String,
}

/// A project as listed by [`CompanyResource::Projects`].
#[derive(Debug, Deserialize)]
pub struct Project {
    /// Identifier of the project.
    pub id: String,
}

/// A user as listed by [`CompanyResource::UsersToInvite`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserToInvite {
    /// Identifier of the user.
    pub user_id: String,
}

/// Body of a `POST` to [`ADMIN_USERS`].
#[derive(Debug, Serialize)]
#[allow(missing_docs)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub username: String,
    pub password: &'static str,
}

/// Body of a `POST` to [`COMPANIES`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct NewCompany {
    pub job_title: &'static str,
    pub name: String,
}

/// Body of a `POST` to [`CompanyResource::InviteUser`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct Invitation {
    pub job_title: &'static str,
    pub project_ids: Vec<String>,
    pub role: &'static str,
    pub user_id: String,
}

/// Body of a `POST` to [`CompanyResource::Projects`].
#[derive(Debug, Serialize)]
#[allow(missing_docs)]
pub struct NewProject {
    pub name: String,
    pub code: String,
}
