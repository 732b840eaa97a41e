use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, broadcast};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    ChildInfo, ChildSpec, Event, EventKind, Registry, RegistryError, RestartStrategy, Supervisor,
    SupervisorConfig, SupervisorError, SupervisorExit, WorkerError, WorkerFn,
};

/// Shared switchboard: fail a child by name, count factory calls.
#[derive(Default)]
struct Script {
    triggers: Mutex<HashMap<String, Arc<Notify>>>,
    builds: Mutex<Vec<String>>,
}

impl Script {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn trigger(&self, name: &str) -> Arc<Notify> {
        let mut triggers = self.triggers.lock().unwrap();
        Arc::clone(triggers.entry(name.to_string()).or_default())
    }

    fn fail(&self, name: &str) {
        self.trigger(name).notify_one();
    }

    fn builds(&self, name: &str) -> usize {
        self.builds.lock().unwrap().iter().filter(|n| *n == name).count()
    }

    fn body(&self, name: &str) -> Body {
        self.builds.lock().unwrap().push(name.to_string());
        let trigger = self.trigger(name);
        let run: RunFn = Box::new(move |ctx: CancellationToken| triggered(ctx, Arc::clone(&trigger)));
        WorkerFn::new(run)
    }
}

type TriggeredRun = std::pin::Pin<Box<dyn Future<Output = Result<(), WorkerError>> + Send>>;
type RunFn = Box<dyn Fn(CancellationToken) -> TriggeredRun + Send + Sync>;
type Body = WorkerFn<RunFn>;

fn triggered(ctx: CancellationToken, trigger: Arc<Notify>) -> TriggeredRun {
    Box::pin(async move {
        tokio::select! {
            _ = ctx.cancelled() => Ok(()),
            _ = trigger.notified() => Err(WorkerError::fail("triggered")),
        }
    })
}

fn plain(name: &str, script: &Arc<Script>) -> ChildSpec {
    ChildSpec::worker(name.to_string(), Arc::clone(script), |name: &str, s: &Arc<Script>| {
        Ok(s.body(name))
    })
}

fn actor(name: &str, script: &Arc<Script>) -> ChildSpec {
    ChildSpec::actor(
        name.to_string(),
        Arc::clone(script),
        |name: &str, _max_queue_len: usize, s: &Arc<Script>| Ok(s.body(name)),
    )
}

/// Ignores stop requests forever.
fn stubborn(name: &str) -> ChildSpec {
    ChildSpec::worker(name.to_string(), (), |_name: &str, _: &()| {
        Ok(WorkerFn::new(|_ctx: CancellationToken| async move {
            std::future::pending::<()>().await;
            Ok::<(), WorkerError>(())
        }))
    })
}

/// Fails `every` after each start; counts factory calls.
fn flapper(name: &str, every: Duration, builds: &Arc<AtomicUsize>) -> ChildSpec {
    ChildSpec::worker(
        name.to_string(),
        (every, Arc::clone(builds)),
        |_name: &str, (every, builds): &(Duration, Arc<AtomicUsize>)| {
            builds.fetch_add(1, Ordering::SeqCst);
            let every = *every;
            Ok(WorkerFn::new(move |ctx: CancellationToken| async move {
                tokio::select! {
                    _ = ctx.cancelled() => Ok(()),
                    _ = time::sleep(every) => Err(WorkerError::fail("flap")),
                }
            }))
        },
    )
}

async fn collect(
    rx: &mut broadcast::Receiver<Event>,
    done: impl Fn(&[Event]) -> bool,
) -> Vec<Event> {
    let mut seen = Vec::new();
    time::timeout(Duration::from_secs(600), async {
        while !done(seen.as_slice()) {
            match rx.recv().await {
                Ok(ev) => seen.push(ev),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await
    .expect("events arrive in time");
    seen
}

fn count(events: &[Event], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind == kind).count()
}

fn children_of(events: &[Event], kind: EventKind) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.kind == kind)
        .filter_map(|e| e.child.as_deref().map(str::to_string))
        .collect()
}

fn id_of(children: &[ChildInfo], name: &str) -> crate::WorkerId {
    children
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.id)
        .expect("child present")
}

#[tokio::test]
async fn starts_children_in_declared_order() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_children(["a", "b", "c"].map(|n| plain(n, &script)))
        .start()
        .expect("start");

    let children = sup.which_children().await.expect("running");
    let names: Vec<_> = children.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert!(children.iter().all(|c| c.alive));
    assert_eq!(*script.builds.lock().unwrap(), ["a", "b", "c"]);

    sup.shutdown().await.expect("shutdown");
    assert_eq!(sup.wait().await, SupervisorExit::Stopped);
}

#[tokio::test]
async fn duplicate_child_names_are_rejected() {
    let script = Script::new();
    let err = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_child(plain("a", &script))
        .with_child(plain("a", &script))
        .start()
        .expect_err("duplicate");

    assert!(matches!(err, SupervisorError::DuplicateChild { ref child, .. } if child == "a"));
    assert_eq!(script.builds("a"), 0);
}

#[tokio::test(start_paused = true)]
async fn one_for_one_restarts_only_the_failed_child() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_children(["a", "b", "c"].map(|n| plain(n, &script)))
        .start()
        .expect("start");
    let before = sup.which_children().await.expect("running");
    let mut rx = sup.subscribe();

    script.fail("b");
    let events = collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 1).await;

    assert_eq!(children_of(&events, EventKind::ChildFailed), ["b"]);
    assert!(children_of(&events, EventKind::ChildStopRequested).is_empty());
    assert_eq!(children_of(&events, EventKind::ChildStarted), ["b"]);

    let after = sup.which_children().await.expect("running");
    assert_eq!(id_of(&after, "a"), id_of(&before, "a"));
    assert_ne!(id_of(&after, "b"), id_of(&before, "b"));
    assert_eq!(id_of(&after, "c"), id_of(&before, "c"));
    assert_eq!(sup.restart_stats().await.expect("running").restart_count, 1);
}

#[tokio::test(start_paused = true)]
async fn one_for_all_stops_then_restarts_everyone_in_order() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_children(["a", "b", "c"].map(|n| plain(n, &script)))
        .start()
        .expect("start");
    let before = sup.which_children().await.expect("running");
    let mut rx = sup.subscribe();

    script.fail("b");
    let events = collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 3).await;

    assert_eq!(children_of(&events, EventKind::ChildStopRequested), ["a", "b", "c"]);
    assert_eq!(children_of(&events, EventKind::ChildStarted), ["a", "b", "c"]);
    let last_stop = events
        .iter()
        .rposition(|e| e.kind == EventKind::ChildStopRequested)
        .expect("stops");
    let first_start = events
        .iter()
        .position(|e| e.kind == EventKind::ChildStarted)
        .expect("starts");
    assert!(last_stop < first_start, "every stop precedes every start");

    let after = sup.which_children().await.expect("running");
    for name in ["a", "b", "c"] {
        assert_ne!(id_of(&after, name), id_of(&before, name));
    }
    assert_eq!(script.builds("a"), 2);
}

#[tokio::test(start_paused = true)]
async fn rest_for_one_leaves_earlier_children_alone() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::RestForOne)
        .with_children(["a", "b", "c", "d"].map(|n| plain(n, &script)))
        .start()
        .expect("start");
    let before = sup.which_children().await.expect("running");
    let mut rx = sup.subscribe();

    script.fail("b");
    let events = collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 3).await;

    assert_eq!(children_of(&events, EventKind::ChildStopRequested), ["b", "c", "d"]);
    assert_eq!(children_of(&events, EventKind::ChildStarted), ["b", "c", "d"]);

    let after = sup.which_children().await.expect("running");
    assert_eq!(id_of(&after, "a"), id_of(&before, "a"));
    for name in ["b", "c", "d"] {
        assert_ne!(id_of(&after, name), id_of(&before, name));
    }
}

#[tokio::test(start_paused = true)]
async fn restart_storm_stops_and_unregisters_the_supervisor() {
    let registry = Registry::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("steady", &script))
        .with_child(flapper("flapper", Duration::from_secs(1), &builds))
        .start()
        .expect("start");
    assert!(registry.contains("root"));

    let exit = sup.wait().await;
    assert_eq!(exit, SupervisorExit::RestartStorm { restart_count: 11 });
    assert_eq!(builds.load(Ordering::SeqCst), 12, "initial start plus 11 restarts");
    assert!(!registry.contains("root"));
    assert!(!registry.contains("steady"));
    assert!(matches!(
        sup.which_children().await,
        Err(SupervisorError::Stopped { .. })
    ));

    time::sleep(Duration::from_secs(30)).await;
    assert_eq!(builds.load(Ordering::SeqCst), 12, "no restarts after giving up");
}

#[tokio::test(start_paused = true)]
async fn quiet_gaps_reset_the_restart_count() {
    let builds = Arc::new(AtomicUsize::new(0));
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_child(flapper("slow", Duration::from_secs(15), &builds))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();

    collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 2).await;

    let stats = sup.restart_stats().await.expect("running");
    assert_eq!(stats.restart_count, 1);
    assert!(stats.last_restart.is_some());
    assert!(sup.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_all_never_waits_for_children() {
    let registry = Registry::new();
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .with_child(stubborn("stuck"))
        .with_child(actor("c", &script))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();
    let started = Instant::now();

    sup.stop_all();
    assert_eq!(sup.wait().await, SupervisorExit::Stopped);
    assert_eq!(started.elapsed(), Duration::ZERO);

    let events = collect(&mut rx, |evs| count(evs, EventKind::SupervisorStopped) == 1).await;
    assert_eq!(
        children_of(&events, EventKind::ChildStopRequested),
        ["a", "stuck", "c"]
    );
    assert!(registry.names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn reports_from_replaced_incarnations_are_ignored() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_children(["a", "b"].map(|n| plain(n, &script)))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();

    script.fail("a");
    script.fail("b");
    collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 2).await;
    time::sleep(Duration::from_millis(10)).await;

    assert_eq!(sup.restart_stats().await.expect("running").restart_count, 1);
    assert_eq!(script.builds("a"), 2);
    assert_eq!(script.builds("b"), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_timeout_orphans_the_child_and_continues() {
    let script = Script::new();
    let cfg = SupervisorConfig::default().with_join_timeout(Duration::from_secs(2));
    let sup = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_config(cfg)
        .with_child(stubborn("stuck"))
        .with_child(plain("flaky", &script))
        .start()
        .expect("start");
    let before = sup.which_children().await.expect("running");
    let mut rx = sup.subscribe();

    script.fail("flaky");
    let events = collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 2).await;

    let timeout = events
        .iter()
        .find(|e| e.kind == EventKind::ChildStopTimeout)
        .expect("stop timeout event");
    assert_eq!(timeout.child.as_deref(), Some("stuck"));
    assert_eq!(timeout.timeout_ms, Some(2000));

    let after = sup.which_children().await.expect("still supervising");
    assert_ne!(id_of(&after, "stuck"), id_of(&before, "stuck"));
    assert!(after.iter().all(|c| c.alive));
}

#[tokio::test]
async fn construction_failure_rolls_back_registrations() {
    let registry = Registry::new();
    let script = Script::new();
    let broken = ChildSpec::worker("broken", (), |_name: &str, _: &()| {
        Err::<Body, _>(WorkerError::fail("no config"))
    });

    let err = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .with_child(broken)
        .start()
        .expect_err("factory error");

    assert!(matches!(
        err,
        SupervisorError::ChildConstruction { ref child, .. } if child == "broken"
    ));
    assert_eq!(script.builds("a"), 1);
    assert!(registry.names().is_empty());
}

#[tokio::test]
async fn taken_supervisor_name_fails_startup() {
    let registry = Registry::new();
    let script = Script::new();
    let first = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .start()
        .expect("start");

    let err = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .start()
        .expect_err("name taken");
    assert!(matches!(
        err,
        SupervisorError::Registry(RegistryError::AlreadyRegistered { .. })
    ));
    assert_eq!(script.builds("a"), 0);

    first.stop_all();
    first.wait().await;
    assert!(registry.names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn nested_storm_escalates_to_the_parent() {
    let registry = Registry::new();
    let builds = Arc::new(AtomicUsize::new(0));
    let inner = Supervisor::builder("inner", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_config(
            SupervisorConfig::default().with_restart_intensity(2, Duration::from_secs(10)),
        )
        .with_child(flapper("flapper", Duration::from_secs(1), &builds));

    let parent = Supervisor::builder("outer", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(ChildSpec::supervisor(inner))
        .start()
        .expect("start");
    let mut rx = parent.subscribe();

    let events = collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 1).await;
    time::sleep(Duration::from_millis(10)).await;
    let failed = events
        .iter()
        .find(|e| e.kind == EventKind::ChildFailed)
        .expect("escalation reported");
    assert_eq!(failed.child.as_deref(), Some("inner"));
    assert!(
        failed
            .reason
            .as_deref()
            .is_some_and(|r| r.contains("escalated") && r.contains("restart storm"))
    );
    assert_eq!(builds.load(Ordering::SeqCst), 5, "4 in first subtree, 1 in the new one");
    assert!(registry.contains("inner"));

    parent.shutdown().await.expect("shutdown");
    parent.wait().await;
    assert!(registry.names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn shutdown_does_not_wait_for_daemons() {
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_child(plain("worker", &script))
        .with_child(stubborn("daemon").with_daemon(true))
        .start()
        .expect("start");
    let started = Instant::now();

    sup.shutdown().await.expect("daemon is not awaited");
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(sup.wait().await, SupervisorExit::Stopped);
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_stuck_children_after_grace() {
    let script = Script::new();
    let cfg = SupervisorConfig::default().with_grace(Duration::from_secs(3));
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_config(cfg)
        .with_child(plain("worker", &script))
        .with_child(stubborn("stuck"))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();

    let err = sup.shutdown().await.expect_err("grace exceeded");
    match err {
        SupervisorError::GraceExceeded { grace, stuck } => {
            assert_eq!(grace, Duration::from_secs(3));
            assert_eq!(stuck, ["stuck"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    let events = collect(&mut rx, |evs| count(evs, EventKind::SupervisorStopped) == 1).await;
    assert_eq!(count(&events, EventKind::GraceExceeded), 1);
    assert_eq!(count(&events, EventKind::AllStoppedWithin), 0);
}

#[tokio::test]
async fn siblings_are_registered_before_any_child_runs() {
    let registry = Registry::new();
    let found_later_sibling = Arc::new(AtomicBool::new(false));

    let first = ChildSpec::actor(
        "first",
        (Arc::clone(&registry), Arc::clone(&found_later_sibling)),
        |_name: &str, _max_queue_len: usize, (registry, found): &(Arc<Registry>, Arc<AtomicBool>)| {
            let registry = Arc::clone(registry);
            let found = Arc::clone(found);
            Ok(WorkerFn::new(move |ctx: CancellationToken| {
                let registry = Arc::clone(&registry);
                let found = Arc::clone(&found);
                async move {
                    found.store(registry.get_actor("second").is_ok(), Ordering::SeqCst);
                    ctx.cancelled().await;
                    Ok::<(), WorkerError>(())
                }
            }))
        },
    );
    let script = Script::new();

    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(first)
        .with_child(actor("second", &script))
        .start()
        .expect("start");
    tokio::task::yield_now().await;

    assert!(found_later_sibling.load(Ordering::SeqCst));
    let second = registry.get_actor("second").expect("registered");
    let children = sup.which_children().await.expect("running");
    assert_eq!(second.id(), id_of(&children, "second"));

    sup.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn restarted_actor_is_registered_under_its_new_identity() {
    let registry = Registry::new();
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("db", &script))
        .start()
        .expect("start");
    let old = registry.get_actor("db").expect("registered");
    let mut rx = sup.subscribe();

    script.fail("db");
    collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 1).await;

    let new = registry.get_actor("db").expect("re-registered");
    assert_ne!(new.id(), old.id());
    assert!(!new.is_stop_requested());
}

#[tokio::test(start_paused = true)]
async fn clean_exit_is_not_restarted() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let once = ChildSpec::worker("once", (), move |_name: &str, _: &()| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(WorkerFn::new(|_ctx: CancellationToken| async move {
            Ok::<(), WorkerError>(())
        }))
    });
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_child(once)
        .start()
        .expect("start");

    time::sleep(Duration::from_secs(1)).await;
    let children = sup.which_children().await.expect("running");
    assert!(!children[0].alive);
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn registry_stop_stops_a_supervisor() {
    let registry = Registry::new();
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .start()
        .expect("start");

    registry.stop("root").expect("registered");
    assert_eq!(sup.wait().await, SupervisorExit::Stopped);
    assert!(!sup.is_running());
    assert!(registry.names().is_empty());
    assert!(matches!(
        registry.stop("root"),
        Err(RegistryError::NotFound { .. })
    ));
}

/// Builds once through `script`, then every later build goes through `rebuild`.
fn breaks_on_rebuild(
    name: &str,
    script: &Arc<Script>,
    rebuild: fn() -> Result<Body, WorkerError>,
) -> ChildSpec {
    let built = Arc::new(AtomicUsize::new(0));
    ChildSpec::actor(
        name.to_string(),
        (Arc::clone(script), built),
        move |name: &str, _max_queue_len: usize, (s, built): &(Arc<Script>, Arc<AtomicUsize>)| {
            if built.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(s.body(name))
            } else {
                rebuild()
            }
        },
    )
}

#[tokio::test(start_paused = true)]
async fn failed_restart_rolls_back_and_stops_everyone() {
    let registry = Registry::new();
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForAll)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .with_child(actor("b", &script))
        .with_child(breaks_on_rebuild("c", &script, || {
            Err(WorkerError::fail("config vanished"))
        }))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();

    script.fail("a");
    let events = collect(&mut rx, |evs| count(evs, EventKind::SupervisorStopped) == 1).await;

    assert_eq!(children_of(&events, EventKind::ChildConstructionFailed), ["c"]);
    assert!(children_of(&events, EventKind::ChildStarted).is_empty());
    assert_eq!(script.builds("a"), 2);
    assert_eq!(script.builds("b"), 2);
    assert!(matches!(
        sup.wait().await,
        SupervisorExit::RestartFailed { ref child, .. } if child == "c"
    ));
    assert!(registry.names().is_empty());
}

#[tokio::test(start_paused = true)]
async fn panicking_factory_fails_the_restart_instead_of_the_supervisor() {
    let registry = Registry::new();
    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("steady", &script))
        .with_child(breaks_on_rebuild("fragile", &script, || panic!("lost its config")))
        .start()
        .expect("start");
    let steady = registry.get_actor("steady").expect("registered");

    script.fail("fragile");

    match sup.wait().await {
        SupervisorExit::RestartFailed { child, error } => {
            assert_eq!(child, "fragile");
            assert!(error.contains("lost its config"), "{error}");
        }
        other => panic!("unexpected exit: {other}"),
    }
    assert!(steady.is_stop_requested());
    assert!(registry.names().is_empty());
}

#[tokio::test]
async fn stop_all_leaves_a_name_reused_by_another_supervisor() {
    let registry = Registry::new();
    let script = Script::new();
    let root = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .start()
        .expect("start root");

    registry.stop("a").expect("registered");
    let other = Supervisor::builder("other", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(actor("a", &script))
        .start()
        .expect("start other");
    let taken_over = registry.get_actor("a").expect("registered").id();

    root.stop_all();
    assert_eq!(root.wait().await, SupervisorExit::Stopped);

    assert!(other.is_running());
    assert_eq!(registry.get_actor("a").expect("still registered").id(), taken_over);
    assert_eq!(registry.names(), ["a", "other"]);
}

#[tokio::test]
async fn exiting_supervisor_leaves_its_successor_registered() {
    let registry = Registry::new();
    let script = Script::new();
    let builder = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_registry(Arc::clone(&registry))
        .with_child(plain("a", &script));

    let first = builder.start().expect("start first");
    registry.stop("root").expect("registered");
    let second = builder.start().expect("name is free again");

    assert_eq!(first.wait().await, SupervisorExit::Stopped);
    let registered = registry.get_supervisor("root").expect("successor kept");
    assert!(registered.is_running());
    assert!(second.is_running());
}

/// `io::Write` sink shared with the test body.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn failures_are_logged_without_subscribers() {
    let out = Captured::default();
    let sink = out.clone();
    let _guard = tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish(),
    );

    let script = Script::new();
    let sup = Supervisor::builder("root", RestartStrategy::OneForOne)
        .with_child(plain("a", &script))
        .start()
        .expect("start");
    let mut rx = sup.subscribe();

    script.fail("a");
    collect(&mut rx, |evs| count(evs, EventKind::ChildStarted) == 1).await;

    let logged = String::from_utf8(out.0.lock().unwrap().clone()).expect("utf8");
    assert!(logged.contains("child terminated abnormally"), "{logged}");
    assert!(logged.contains("child=a"), "{logged}");
}
