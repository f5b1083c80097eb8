//! The actions of a virtual user.
//!
//! Every action is a fixed sequence of requests that mimics what the web application does when a
//! user navigates through it. Requests are issued strictly one after another. A failed request is
//! recorded and the sequence continues, unless a later step needs its response body: then the
//! action is aborted with an error. Steps that would act on an empty list are skipped.

use crate::api::{self, Company, CompanyResource, Invitation, NewCompany, NewProject, NewUser};
use crate::api::{Project, UserToInvite};
use crate::error::Result;
use crate::random::{RandomSource, choose};
use crate::session::Session;
use crate::workload::Task;

impl Session {
    /// Runs a single task to completion.
    pub async fn execute(&mut self, task: Task, random: &mut dyn RandomSource) -> Result<()> {
        match task {
            Task::BrowseHome => self.browse_home().await,
            Task::CreateUser => self.create_user().await,
            Task::CreateCompany => self.create_company().await,
            Task::AddUsersToCompany => self.add_users_to_company(random).await,
            Task::CreateProject => self.create_project(random).await,
        }
    }

    /// Opens the home page.
    pub async fn browse_home(&mut self) -> Result<()> {
        self.api.get(api::CURRENT_USER).await;
        self.api.get(api::COMPANIES).await;
        self.api.get(api::CORPORATE_GROUPS).await;
        self.api.get(api::NOTIFICATIONS).await;
        Ok(())
    }

    /// Opens the admin panel, creates a user and reloads the panel.
    pub async fn create_user(&mut self) -> Result<()> {
        self.open_admin_panel().await;

        let n = self.counters.users;
        let id = self.user_id();
        let user = NewUser {
            email: format!("{id}_user_{n}@ml.com"),
            name: format!("{id}_name_{n}"),
            surname: format!("{id}_surname_{n}"),
            username: format!("{id}_username_{n}"),
            password: api::NEW_USER_PASSWORD,
        };
        self.api.post(api::ADMIN_USERS, &user).await;
        self.counters.users += 1;

        self.open_admin_panel().await;
        Ok(())
    }

    /// Opens the home page, creates a company and reloads the page.
    pub async fn create_company(&mut self) -> Result<()> {
        self.open_company_list().await;

        let company = NewCompany {
            job_title: api::COMPANY_CREATOR_JOB_TITLE,
            name: format!("{}_company_{}", self.user_id(), self.counters.companies),
        };
        self.api.post(api::COMPANIES, &company).await;
        self.counters.companies += 1;

        self.open_company_list().await;
        Ok(())
    }

    /// Opens a random company and invites a random user into a random selection of its projects.
    pub async fn add_users_to_company(&mut self, random: &mut dyn RandomSource) -> Result<()> {
        let Some(company_id) = self.open_random_company(random).await? else {
            return Ok(());
        };

        let users_to_invite: Vec<UserToInvite> = self
            .api
            .get_named(
                &CompanyResource::UsersToInvite.path(&company_id),
                CompanyResource::UsersToInvite.name(),
            )
            .await
            .json()?;
        let projects: Vec<Project> = self
            .api
            .get_named(
                &CompanyResource::Projects.path(&company_id),
                CompanyResource::Projects.name(),
            )
            .await
            .json()?;
        if users_to_invite.is_empty() {
            return Ok(());
        }

        // Projects are drawn with replacement, so the same id can appear more than once.
        let count = random.up_to(projects.len());
        let project_ids = (0..count)
            .filter_map(|_| choose(random, &projects))
            .map(|project| project.id.clone())
            .collect();
        let Some(user) = choose(random, &users_to_invite) else {
            return Ok(());
        };

        let invitation = Invitation {
            job_title: api::INVITE_JOB_TITLE,
            project_ids,
            role: api::INVITE_ROLE,
            user_id: user.user_id.clone(),
        };
        self.api
            .post_named(
                &CompanyResource::InviteUser.path(&company_id),
                CompanyResource::InviteUser.name(),
                &invitation,
            )
            .await;

        self.api
            .get_named(
                &CompanyResource::PendingUsers.path(&company_id),
                CompanyResource::PendingUsers.name(),
            )
            .await;
        Ok(())
    }

    /// Opens a random company and creates a project in it.
    pub async fn create_project(&mut self, random: &mut dyn RandomSource) -> Result<()> {
        let Some(company_id) = self.open_random_company(random).await? else {
            return Ok(());
        };

        let n = self.counters.projects;
        let id = self.user_id();
        let project = NewProject {
            name: format!("{id}_project_name_{n}"),
            code: format!("{id}_project_code_{n}"),
        };
        self.api
            .post_named(
                &CompanyResource::Projects.path(&company_id),
                CompanyResource::Projects.name(),
                &project,
            )
            .await;
        self.counters.projects += 1;

        Ok(())
    }

    async fn open_admin_panel(&self) {
        self.api.get(api::ADMIN_OVERVIEW).await;
        self.api.get(api::ADMIN_USERS).await;
    }

    async fn open_company_list(&self) {
        self.api.get(api::COMPANIES).await;
        self.api.get(api::CORPORATE_GROUPS).await;
    }

    /// Lists the companies, picks one and opens its settings page.
    ///
    /// Returns `None` if there is no company.
    async fn open_random_company(&self, random: &mut dyn RandomSource) -> Result<Option<String>> {
        let companies: Vec<Company> = self.api.get(api::COMPANIES).await.json()?;
        let Some(company) = choose(random, &companies) else {
            return Ok(None);
        };
        let company_id = company.id.as_str();

        for resource in [
            CompanyResource::Users,
            CompanyResource::Projects,
            CompanyResource::PendingUsers,
            CompanyResource::Activity,
        ] {
            self.api
                .get_named(&resource.path(company_id), resource.name())
                .await;
        }

        Ok(Some(company_id.to_owned()))
    }
}
