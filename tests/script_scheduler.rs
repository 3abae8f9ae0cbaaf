use std::cell::RefCell;
use std::rc::Rc;

use anyhow::bail;
use kestrel_sandbox::config::AppConfig;
use kestrel_sandbox::scripts::{script_fn, ScriptHandle, ScriptScheduler};
use kestrel_sandbox::Runtime;

fn recorder(log: &Rc<RefCell<Vec<String>>>, name: &'static str) -> ScriptHandle {
    let log = Rc::clone(log);
    script_fn(name, move |_, _| {
        log.borrow_mut().push(name.to_string());
        Ok(())
    })
}

#[test]
fn scripts_run_in_priority_order_with_ties_in_registration_order() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = ScriptScheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    scheduler.register(recorder(&log, "late"), 5);
    scheduler.register(recorder(&log, "first"), -1);
    scheduler.register(recorder(&log, "late-twin"), 5);
    scheduler.register(recorder(&log, "middle"), 0);

    runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.016));
    assert_eq!(*log.borrow(), vec!["first", "middle", "late", "late-twin"]);
    assert_eq!(scheduler.frames_run(), 1);
}

#[test]
fn priority_order_does_not_depend_on_registration_order() {
    let entries: [(&'static str, i32); 4] = [("a", 3), ("b", -2), ("c", 0), ("d", 7)];
    let orders: [[usize; 4]; 4] = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    let mut runtime = Runtime::empty(AppConfig::default());
    for order in orders {
        let scheduler = ScriptScheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for index in order {
            let (name, priority) = entries[index];
            scheduler.register(recorder(&log, name), priority);
        }
        runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.016));
        assert_eq!(*log.borrow(), vec!["b", "c", "a", "d"], "registered in order {order:?}");
    }
}

#[test]
fn scripts_observe_the_clamped_delta() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = ScriptScheduler::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    scheduler.register(
        script_fn("dt", move |_, dt| {
            sink.borrow_mut().push(dt);
            Ok(())
        }),
        0,
    );

    let clamped = runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.5));
    runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.02));
    assert_eq!(clamped, 0.1);
    assert_eq!(*seen.borrow(), vec![0.1, 0.02]);
}

#[test]
fn changes_made_during_a_frame_apply_to_the_next_one() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = Rc::clone(runtime.scheduler());
    let log = Rc::new(RefCell::new(Vec::new()));
    let victim = recorder(&log, "victim");
    let newcomer = recorder(&log, "newcomer");

    let (victim_ref, newcomer_ref) = (victim.clone(), newcomer.clone());
    let fired = Rc::new(RefCell::new(false));
    let fired_flag = Rc::clone(&fired);
    let remover = script_fn("remover", move |ctx, _| {
        if !*fired_flag.borrow() {
            ctx.scheduler.unregister(&victim_ref);
            ctx.scheduler.register(newcomer_ref.clone(), 100);
            *fired_flag.borrow_mut() = true;
        }
        Ok(())
    });
    scheduler.register(remover, -100);
    scheduler.register(victim, 50);

    runtime.frame(0.016);
    assert_eq!(*log.borrow(), vec!["victim"], "the snapshot still holds the removed script");

    log.borrow_mut().clear();
    runtime.frame(0.016);
    assert_eq!(*log.borrow(), vec!["newcomer"]);
}

#[test]
fn a_failing_script_does_not_stop_the_frame() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = ScriptScheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    scheduler.register(script_fn("broken", |_, _| bail!("out of fuel")), 0);
    scheduler.register(recorder(&log, "after"), 1);

    runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.016));
    assert_eq!(*log.borrow(), vec!["after"]);
    let err = scheduler.last_error().expect("error recorded");
    assert!(err.contains("broken") && err.contains("out of fuel"), "{err}");
}

#[test]
fn disabled_scheduler_skips_scripts() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = ScriptScheduler::new();
    let log = Rc::new(RefCell::new(Vec::new()));
    scheduler.register(recorder(&log, "quiet"), 0);
    scheduler.set_enabled(false);
    runtime.with_frame_context(|ctx| scheduler.run_frame(ctx, 0.016));
    assert!(log.borrow().is_empty());
}

#[test]
fn after_render_callbacks_run_once_after_the_commit() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let scheduler = Rc::clone(runtime.scheduler());
    let calls = Rc::new(RefCell::new(Vec::new()));

    let sink = Rc::clone(&calls);
    scheduler.after_next_render(Box::new(move |ctx| {
        // The static world exists by the time deferred work runs, even on the very first frame.
        let floor = ctx.graph.find_by_name("Floor_Root");
        sink.borrow_mut().push(("first", floor.is_some()));
        let chained = Rc::clone(&sink);
        ctx.scheduler.after_next_render(Box::new(move |_| chained.borrow_mut().push(("chained", true))));
    }));
    assert_eq!(scheduler.pending_after_render(), 1);

    runtime.frame(0.016);
    assert_eq!(*calls.borrow(), vec![("first", true)]);
    assert_eq!(scheduler.pending_after_render(), 1);

    runtime.frame(0.016);
    runtime.frame(0.016);
    assert_eq!(*calls.borrow(), vec![("first", true), ("chained", true)]);
    assert_eq!(scheduler.pending_after_render(), 0);
}
