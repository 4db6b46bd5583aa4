//! Parallel task scheduler.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError, channel};
use std::time::{Duration, Instant};

use indicatif::ProgressStyle;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::BuildError;
use crate::task::{Outcome, Task, TaskContext};

/// Tasks connected by "must finish before" edges.
pub type TaskGraph = DiGraph<Task, ()>;

#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub start: Instant,
    pub duration: Duration,
}

/// Everything the scheduler learned from a successful run.
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: HashMap<Task, Outcome>,
    pub execution_times: HashMap<Task, TaskExecution>,
}

impl Report {
    pub fn outcome(&self, task: Task) -> Option<&Outcome> {
        self.outcomes.get(&task)
    }

    /// Tasks in the order they were started.
    pub fn order(&self) -> Vec<Task> {
        let mut tasks: Vec<_> = self.execution_times.iter().collect();
        tasks.sort_by_key(|(task, exec)| (exec.start, **task));
        tasks.into_iter().map(|(task, _)| *task).collect()
    }
}

type Finished = (NodeIndex, Result<Outcome, BuildError>, Instant, Duration);

/// Next finished task. When called from a pool worker, pending pool work is
/// run while waiting, so a single-threaded pool can't starve the tasks.
fn wait(receiver: &Receiver<Finished>) -> Option<Finished> {
    loop {
        match receiver.try_recv() {
            Ok(finished) => return Some(finished),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }

        match rayon::yield_now() {
            None => return receiver.recv().ok(),
            Some(rayon::Yield::Executed) => {}
            _ => match receiver.recv_timeout(Duration::from_millis(5)) {
                Ok(finished) => return Some(finished),
                Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => {}
            },
        }
    }
}

/// Execute the graph on the rayon pool. A task is started as soon as every
/// task it depends on has finished.
///
/// The first failure stops scheduling. Tasks already running are allowed to
/// finish, then the failure is returned.
pub fn run(graph: &TaskGraph, ctx: &TaskContext) -> Result<Report, BuildError> {
    if let Err(cycle) = petgraph::algo::toposort(graph, None) {
        return Err(BuildError::Cycle(graph[cycle.node_id()].name()));
    }

    let mut dependents: HashMap<NodeIndex, Vec<NodeIndex>> = HashMap::new();
    for edge in graph.raw_edges() {
        dependents
            .entry(edge.source())
            .or_default()
            .push(edge.target());
    }

    let mut dependency_counts: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|i| (i, graph.neighbors_directed(i, Direction::Incoming).count()))
        .collect();

    let total = graph.node_count();
    let mut report = Report::default();

    if total == 0 {
        return Ok(report);
    }

    let started = Instant::now();

    let root_span = tracing::span!(Level::INFO, "building_tasks");
    root_span.pb_set_length(total as u64);
    root_span.pb_set_style(
        &ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    root_span.pb_set_message("Building tasks...");
    let _enter = root_span.enter();

    let task_style = ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());

    let mut failure = None;
    let mut completed = 0;

    // The coordinator blocks the calling thread, not a pool worker.
    rayon::in_place_scope(|s| {
        let (sender, receiver) = channel::<Finished>();

        let spawn_task = |index: NodeIndex| {
            let task = graph[index];
            let sender = sender.clone();
            let style = task_style.clone();

            s.spawn(move |_| {
                let span = tracing::span!(Level::INFO, "task", name = task.name());
                span.pb_set_style(&style);
                span.pb_set_message(&format!("Running {task}"));
                let _enter = span.enter();

                let start = Instant::now();

                // Tasks only share the read-only context, a panic can't leave
                // anything half-updated for the others.
                let result = match catch_unwind(AssertUnwindSafe(|| task.run(ctx))) {
                    Ok(Ok(outcome)) => Ok(outcome),
                    Ok(Err(e)) => Err(BuildError::Task(task.name(), e)),
                    Err(panic) => {
                        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            String::from("unknown payload")
                        };
                        Err(BuildError::Panic(task.name(), msg))
                    }
                };

                // the receiver only goes away once nothing is in flight
                let _ = sender.send((index, result, start, start.elapsed()));
            });
        };

        let mut in_flight = 0usize;

        for index in graph.node_indices() {
            if dependency_counts.get(&index).copied().unwrap_or(0) == 0 {
                spawn_task(index);
                in_flight += 1;
            }
        }

        while in_flight > 0 {
            let Some((index, result, start, duration)) = wait(&receiver) else {
                break;
            };

            in_flight -= 1;
            root_span.pb_inc(1);

            let task = graph[index];
            report
                .execution_times
                .insert(task, TaskExecution { start, duration });

            match result {
                Ok(outcome) => {
                    report.outcomes.insert(task, outcome);
                    completed += 1;
                }
                Err(e) => {
                    tracing::error!("task '{task}' failed");
                    failure.get_or_insert(e);
                }
            }

            if failure.is_some() {
                continue;
            }

            for &next in dependents.get(&index).into_iter().flatten() {
                if let Some(count) = dependency_counts.get_mut(&next) {
                    *count -= 1;
                    if *count == 0 {
                        spawn_task(next);
                        in_flight += 1;
                    }
                }
            }
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }

    if completed < total {
        return Err(BuildError::Stalled(total - completed));
    }

    tracing::info!("build complete {}", crate::io::as_overhead(started));

    Ok(report)
}
