//! The tasks a virtual user picks from, and the pause between two tasks.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use rand::Rng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

/// An action of a virtual user, made of a fixed sequence of requests.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Task {
    /// Open the home page.
    BrowseHome,
    /// Open the admin panel and create a user.
    CreateUser,
    /// Open the home page and create a company.
    CreateCompany,
    /// Open a company and invite a user into some of its projects.
    AddUsersToCompany,
    /// Open a company and create a project in it.
    CreateProject,
}

impl Task {
    /// All tasks, in the order of [`TaskWeights`].
    pub const ALL: [Task; 5] = [
        Task::BrowseHome,
        Task::CreateUser,
        Task::CreateCompany,
        Task::AddUsersToCompany,
        Task::CreateProject,
    ];

    /// A short name for logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            Task::BrowseHome => "browse_home",
            Task::CreateUser => "create_user",
            Task::CreateCompany => "create_company",
            Task::AddUsersToCompany => "add_users_to_company",
            Task::CreateProject => "create_project",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Relative selection weight of every [`Task`].
///
/// A task is picked with probability `weight / sum(weights)`. A weight of zero disables a task.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct TaskWeights {
    /// Weight of [`Task::BrowseHome`].
    pub browse_home: u32,
    /// Weight of [`Task::CreateUser`].
    pub create_user: u32,
    /// Weight of [`Task::CreateCompany`].
    pub create_company: u32,
    /// Weight of [`Task::AddUsersToCompany`].
    pub add_users_to_company: u32,
    /// Weight of [`Task::CreateProject`].
    pub create_project: u32,
}

impl TaskWeights {
    /// The weight of a single task.
    pub fn weight(&self, task: Task) -> u32 {
        match task {
            Task::BrowseHome => self.browse_home,
            Task::CreateUser => self.create_user,
            Task::CreateCompany => self.create_company,
            Task::AddUsersToCompany => self.add_users_to_company,
            Task::CreateProject => self.create_project,
        }
    }
}

impl Default for TaskWeights {
    fn default() -> Self {
        Self {
            browse_home: 10,
            create_user: 3,
            create_company: 1,
            add_users_to_company: 3,
            create_project: 2,
        }
    }
}

/// Weighted random selection of the next [`Task`].
#[derive(Clone, Debug)]
pub struct TaskSet {
    weights: TaskWeights,
    distribution: WeightedIndex<u32>,
}

impl TaskSet {
    /// Creates a task set from a weight table with at least one non-zero weight.
    pub fn new(weights: TaskWeights) -> Result<Self> {
        let distribution = WeightedIndex::new(Task::ALL.map(|task| weights.weight(task)))
            .context("invalid task weights, at least one task needs a positive weight")?;

        Ok(Self {
            weights,
            distribution,
        })
    }

    /// The probability that `task` is picked by [`TaskSet::next`].
    pub fn probability(&self, task: Task) -> f64 {
        let total: u32 = Task::ALL.iter().map(|t| self.weights.weight(*t)).sum();
        self.weights.weight(task) as f64 / total as f64
    }

    /// Picks the next task.
    pub fn next(&self, rng: &mut impl Rng) -> Task {
        Task::ALL[self.distribution.sample(rng)]
    }
}

/// A pause drawn uniformly from `min..=max`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    /// Creates a wait time between `min` and `max`, inclusive.
    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        ensure!(
            min <= max,
            "minimum wait time {min:?} exceeds maximum wait time {max:?}"
        );
        Ok(Self { min, max })
    }

    /// Draws the next pause.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rng.random_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}
