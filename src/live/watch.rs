//! Watch mode.
//!
//! Every source category has a glob and a task. A debounced recursive watcher
//! sits on the static roots of those globs; each batch of events is mapped
//! back through the globs to the tasks that need to run again. After a task
//! finishes its reload hint is broadcast to connected browsers.

use std::collections::BTreeSet;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;

use crate::config::Config;
use crate::error::{BuildError, SourceError, WatchError};
use crate::live::LiveReload;
use crate::pattern::{SourceGlob, collapse_roots};
use crate::task::{Task, TaskContext};

/// Maps changed files to the task owning their category.
#[derive(Debug, Clone)]
pub struct Routes {
    routes: Vec<(SourceGlob, Task)>,
}

impl Routes {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let src = &config.paths.src;
        let root = &config.root;

        Ok(Self {
            routes: vec![
                (SourceGlob::new(root, &src.html)?, Task::Markup),
                (SourceGlob::new(root, &src.scss)?, Task::Styles),
                (SourceGlob::new(root, &src.js)?, Task::Scripts),
                (SourceGlob::new(root, &src.images)?, Task::Images),
                (SourceGlob::new(root, &src.fonts)?, Task::Fonts),
            ],
        })
    }

    /// Minimal set of directories to watch recursively.
    pub fn roots(&self) -> Vec<Utf8PathBuf> {
        collapse_roots(self.routes.iter().map(|(glob, _)| glob.base().to_owned()))
    }

    pub fn route(&self, path: &Utf8Path) -> Option<Task> {
        self.routes
            .iter()
            .find(|(glob, _)| glob.matches(path))
            .map(|(_, task)| *task)
    }

    /// Tasks to re-run for a batch of changed paths, each at most once.
    pub fn dirty<'a>(&self, paths: impl IntoIterator<Item = &'a Utf8Path>) -> BTreeSet<Task> {
        paths.into_iter().filter_map(|path| self.route(path)).collect()
    }
}

/// Watch the source tree until the event channel closes or a task fails.
pub fn watch(ctx: &TaskContext, hub: Option<&LiveReload>) -> Result<(), WatchError> {
    let routes = Routes::new(ctx.config)?;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;

    for path in routes.roots() {
        if !path.is_dir() {
            tracing::warn!("not watching {path}, directory doesn't exist");
            continue;
        }
        tracing::info!("watching {path}");
        debouncer.watch(&path, RecursiveMode::Recursive)?;
    }

    loop {
        match rx.recv()? {
            Ok(events) => {
                let paths = events
                    .iter()
                    .filter(|de| {
                        matches!(
                            de.event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        )
                    })
                    .flat_map(|de| de.event.paths.iter())
                    .filter_map(|path| Utf8Path::from_path(path));

                for task in routes.dirty(paths) {
                    tracing::info!("change detected, running '{task}'");

                    let outcome = task
                        .run(ctx)
                        .map_err(|e| BuildError::Task(task.name(), e))?;

                    if let Some(hub) = hub {
                        hub.notify(&outcome.reload);
                    }
                }
            }
            Err(errors) => {
                for e in errors {
                    tracing::error!("watch error: {e:?}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread::sleep;

    use super::*;
    use crate::task::tests::Fixture;

    fn routes() -> Routes {
        Routes::new(&Config::rooted("/shop")).unwrap()
    }

    #[test]
    fn test_route_by_category() {
        let routes = routes();
        let route = |path: &str| routes.route(Utf8Path::new(path));

        assert_eq!(route("/shop/src/html/index.html"), Some(Task::Markup));
        assert_eq!(route("/shop/src/scss/base/_reset.scss"), Some(Task::Styles));
        assert_eq!(route("/shop/src/js/main.js"), Some(Task::Scripts));
        assert_eq!(route("/shop/src/images/banners/sale.webp"), Some(Task::Images));
        assert_eq!(route("/shop/src/fonts/Vazir.ttf"), Some(Task::Fonts));
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let routes = routes();
        let route = |path: &str| routes.route(Utf8Path::new(path));

        assert_eq!(route("/shop/src/js/notes.md"), None);
        assert_eq!(route("/shop/src/images/raw.psd"), None);
        assert_eq!(route("/shop/dist/js/main.js"), None);
        assert_eq!(route("/elsewhere/src/js/main.js"), None);
    }

    #[test]
    fn test_batch_runs_each_task_once() {
        let routes = routes();
        let dirty = routes.dirty([
            Utf8Path::new("/shop/src/scss/main.scss"),
            Utf8Path::new("/shop/src/scss/_colors.scss"),
            Utf8Path::new("/shop/src/js/main.js"),
        ]);

        assert_eq!(
            dirty.into_iter().collect::<Vec<_>>(),
            vec![Task::Styles, Task::Scripts]
        );
    }

    #[test]
    fn test_roots_are_category_directories() {
        assert_eq!(
            routes().roots(),
            vec![
                Utf8PathBuf::from("/shop/src/fonts"),
                Utf8PathBuf::from("/shop/src/html"),
                Utf8PathBuf::from("/shop/src/images"),
                Utf8PathBuf::from("/shop/src/js"),
                Utf8PathBuf::from("/shop/src/scss"),
            ]
        );
    }

    #[test]
    fn test_overlapping_roots_collapse() {
        let mut config = Config::rooted("/shop");
        config.paths.src.html = "src/**/*.html".into();

        let routes = Routes::new(&config).unwrap();

        assert_eq!(routes.roots(), vec![Utf8PathBuf::from("/shop/src")]);
    }

    /// Rewrite `file` until `check` passes. The watcher needs a moment
    /// before it sees anything.
    fn touch_until(fixture: &Fixture, file: &str, data: &str, check: impl Fn() -> bool) -> bool {
        for _ in 0..30 {
            fixture.write(file, data);
            for _ in 0..10 {
                if check() {
                    return true;
                }
                sleep(Duration::from_millis(50));
            }
        }
        false
    }

    #[test]
    fn test_watch_reruns_tasks_until_one_fails() {
        let fixture = Fixture::new();
        fixture.write("src/scss/main.scss", "a { color: red; }");
        fixture.write("src/js/main.js", "zero();");

        // events carry canonical paths
        let mut config = fixture.config.clone();
        config.root = config.root.canonicalize_utf8().unwrap();

        let session = std::thread::spawn(move || watch(&TaskContext::new(&config), None));

        let bundle = || read_or_empty(&fixture, "dist/js/main.js");
        assert!(touch_until(&fixture, "src/js/main.js", "one();", || bundle().contains("one();")));

        // a broken stylesheet is logged, the session goes on
        fixture.write("src/scss/main.scss", "a { color: $missing; }");
        sleep(Duration::from_millis(600));
        assert!(!session.is_finished());
        assert!(touch_until(&fixture, "src/js/main.js", "two();", || bundle().contains("two();")));

        // any other failure ends it
        std::fs::remove_dir_all(fixture.root().join("dist/js")).unwrap();
        fixture.write("dist/js", "not a directory");
        assert!(touch_until(&fixture, "src/js/main.js", "three();", || session.is_finished()));

        let err = session.join().unwrap().unwrap_err();
        assert!(matches!(err, WatchError::Build(BuildError::Task("js", _))));
    }

    fn read_or_empty(fixture: &Fixture, path: &str) -> String {
        std::fs::read_to_string(fixture.root().join(path)).unwrap_or_default()
    }
}
