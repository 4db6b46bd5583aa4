//! Recipes, plans and the pipeline that runs them.
//!
//! A [`Recipe`] is what the user asks for on the command line. It expands into
//! a [`Plan`]: sequential stages of tasks that run in parallel within a stage,
//! followed by long-running [`Service`]s.

use std::fmt;
use std::str::FromStr;

use petgraph::Direction;
use petgraph::graph::NodeIndex;
use thiserror::Error;

use crate::config::{Config, Profile};
use crate::engine::{self, Report, TaskGraph};
use crate::error::{BuildError, PipelineError};
use crate::task::{Task, TaskContext};

/// Asset tasks of a development build.
const ASSETS: [Task; 5] = [
    Task::Markup,
    Task::Styles,
    Task::Scripts,
    Task::Images,
    Task::Fonts,
];

/// Asset tasks of a production build.
const ASSETS_MIN: [Task; 5] = [
    Task::Markup,
    Task::StylesMin,
    Task::ScriptsMin,
    Task::Images,
    Task::Fonts,
];

/// Long-running processes started once every task of a plan has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// HTTP server over the output directory, with live-reload.
    Serve,
    /// Re-run the matching task whenever a source file changes.
    Watch,
}

/// Named entry points, one per CLI task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recipe {
    Clean,
    Sass,
    Js,
    Images,
    Fonts,
    Html,
    Serve,
    Watch,
    #[default]
    Dev,
    Build,
}

#[derive(Debug, Error)]
#[error("Unknown task '{0}', expected one of: {names}", names = Recipe::NAMES.join(", "))]
pub struct UnknownRecipe(String);

impl Recipe {
    pub const ALL: [Recipe; 10] = [
        Recipe::Clean,
        Recipe::Sass,
        Recipe::Js,
        Recipe::Images,
        Recipe::Fonts,
        Recipe::Html,
        Recipe::Serve,
        Recipe::Watch,
        Recipe::Dev,
        Recipe::Build,
    ];

    const NAMES: [&'static str; 10] = [
        "clean", "sass", "js", "images", "fonts", "html", "serve", "watch", "dev", "build",
    ];

    pub fn name(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }

    pub fn profile(&self) -> Profile {
        match self {
            Recipe::Build => Profile::Production,
            _ => Profile::Development,
        }
    }

    pub fn plan(&self) -> Plan {
        let plan = Plan::new();

        match self {
            Recipe::Clean => plan.then([Task::Clean]),
            Recipe::Sass => plan.then([Task::Styles]),
            Recipe::Js => plan.then([Task::Scripts]),
            Recipe::Images => plan.then([Task::Images]),
            Recipe::Fonts => plan.then([Task::Fonts]),
            Recipe::Html => plan.then([Task::Markup]),
            Recipe::Serve => plan.with_service(Service::Serve),
            Recipe::Watch => plan
                .then(ASSETS)
                .with_service(Service::Serve)
                .with_service(Service::Watch),
            Recipe::Dev => plan
                .then([Task::Clean])
                .then(ASSETS)
                .with_service(Service::Serve)
                .with_service(Service::Watch),
            Recipe::Build => plan.then([Task::Clean]).then(ASSETS_MIN),
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Recipe {
    type Err = UnknownRecipe;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|recipe| recipe.name() == s)
            .ok_or_else(|| UnknownRecipe(s.to_string()))
    }
}

/// A task graph followed by services.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub graph: TaskGraph,
    pub services: Vec<Service>,
    last: Vec<NodeIndex>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage. Every task of the stage depends on every task of the
    /// previous one.
    pub fn then(mut self, stage: impl IntoIterator<Item = Task>) -> Self {
        let stage: Vec<_> = stage
            .into_iter()
            .map(|task| self.graph.add_node(task))
            .collect();

        for &prev in &self.last {
            for &next in &stage {
                self.graph.add_edge(prev, next, ());
            }
        }

        if !stage.is_empty() {
            self.last = stage;
        }

        self
    }

    pub fn with_service(mut self, service: Service) -> Self {
        if !self.services.contains(&service) {
            self.services.push(service);
        }
        self
    }

    /// Tasks grouped by how many tasks stand before them.
    pub fn stages(&self) -> Vec<Vec<Task>> {
        let Ok(order) = petgraph::algo::toposort(&self.graph, None) else {
            return vec![];
        };

        let mut depth = vec![0usize; self.graph.node_count()];
        for &index in &order {
            depth[index.index()] = self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .map(|dep| depth[dep.index()] + 1)
                .max()
                .unwrap_or(0);
        }

        let mut stages: Vec<Vec<Task>> = vec![];
        for index in self.graph.node_indices() {
            let d = depth[index.index()];
            if stages.len() <= d {
                stages.resize_with(d + 1, Vec::new);
            }
            stages[d].push(self.graph[index]);
        }

        stages
    }

    pub fn has_service(&self, service: Service) -> bool {
        self.services.contains(&service)
    }
}

/// Runs recipes against one configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the task graph of a plan, ignoring its services.
    pub fn execute(&self, plan: &Plan, live_reload: Option<u16>) -> Result<Report, BuildError> {
        let ctx = TaskContext::new(&self.config).with_live_reload(live_reload);
        engine::run(&plan.graph, &ctx)
    }

    /// Run a recipe to completion. With services in the plan this only
    /// returns once they stop.
    pub fn run(&self, recipe: Recipe) -> Result<Report, PipelineError> {
        let plan = recipe.plan();
        tracing::info!("running '{recipe}'");

        let live_reload = (plan.has_service(Service::Serve)
            && self.config.server.live_reload
            && recipe.profile() == Profile::Development)
            .then_some(self.config.server.reload_port);

        let report = self.execute(&plan, live_reload)?;

        let ctx = TaskContext::new(&self.config).with_live_reload(live_reload);
        self.start_services(&plan.services, &ctx)?;

        Ok(report)
    }

    fn start_services(&self, services: &[Service], ctx: &TaskContext) -> Result<(), PipelineError> {
        if services.is_empty() {
            return Ok(());
        }

        let serve = services.contains(&Service::Serve);
        let watch = services.contains(&Service::Watch);

        #[cfg(not(feature = "server"))]
        if serve {
            return Err(PipelineError::Unsupported("serve", "server"));
        }

        #[cfg(not(feature = "live"))]
        if watch {
            return Err(PipelineError::Unsupported("watch", "live"));
        }

        #[cfg(feature = "server")]
        let (server, hub) = if serve {
            use crate::error::ServeError;
            use crate::live::{LiveReload, Server};

            let hub = ctx
                .live_reload
                .map(|port| {
                    LiveReload::bind(port)
                        .map_err(|e| ServeError::Bind(([127, 0, 0, 1], port).into(), e))
                })
                .transpose()?;

            (Some(Server::start(ctx.config)?), hub)
        } else {
            (None, None)
        };

        #[cfg(all(feature = "live", not(feature = "server")))]
        let hub: Option<crate::live::LiveReload> = None;

        #[cfg(feature = "live")]
        if watch {
            crate::live::watch(ctx, hub.as_ref())?;
        }

        #[cfg(feature = "server")]
        if let Some(server) = server {
            server.wait()?;
        }

        Ok(())
    }
}
