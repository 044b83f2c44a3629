
use std::collections::HashSet;
use std::sync::Arc;

use foreman::error::ForemanError;
use foreman::master::JobCommand;
use foreman::wire::Status;

use test_harness::{address, plan, report, test_config, test_master};

#[test]
fn test_job_ids_are_strictly_increasing_across_threads() {
    let (master, _clock) = test_master(test_config(100, 0, -1));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let master = Arc::clone(&master);
        handles.push(std::thread::spawn(move || {
            let mut ids = Vec::with_capacity(200);
            for _ in 0..200 {
                ids.push(master.new_job_id());
            }
            ids
        }));
    }

    let mut all_ids = Vec::new();
    for handle in handles {
        let ids = handle.join().expect("id thread");
        // Each thread sees its own allocations in increasing order.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        all_ids.extend(ids);
    }
    let unique: HashSet<u64> = all_ids.iter().copied().collect();
    assert_eq!(unique.len(), all_ids.len());
}

#[test]
fn test_run_to_completion_over_heartbeats() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let w1 = master.register_worker(address("host-a"));
    let w2 = master.register_worker(address("host-b"));
    assert!(w1 < w2);

    let job_id = master.run(plan("echo")).expect("admission");

    // First heartbeats pick up the start commands enqueued at admission.
    let commands = master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Running, None)]);
    assert_eq!(commands.len(), 1);
    assert!(matches!(commands[0], JobCommand::RunTask { task_id: 0, .. }));
    let commands = master.worker_heartbeat(w2, vec![report(job_id, 1, Status::Running, None)]);
    assert!(matches!(commands[0], JobCommand::RunTask { task_id: 1, .. }));

    let status = master.get_status(job_id).expect("status");
    assert_eq!(status.status, Status::Running);

    master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Completed, Some(b"a"))]);
    master.worker_heartbeat(w2, vec![report(job_id, 1, Status::Completed, Some(b"b"))]);

    let status = master.get_status(job_id).expect("status");
    assert_eq!(status.status, Status::Completed);
    assert_eq!(status.result.as_deref(), Some(b"ab".as_slice()));
    assert_eq!(status.children[0].worker_host, "host-a");
    assert_eq!(status.children[1].worker_host, "host-b");
}

#[test]
fn test_admission_denied_at_capacity() {
    let (master, _clock) = test_master(test_config(2, 1_000_000, -1));
    master.register_worker(address("host-a"));

    master.run(plan("echo")).expect("first");
    master.run(plan("echo")).expect("second");
    let denied = master.run(plan("echo"));
    assert!(matches!(denied, Err(ForemanError::ResourceExhausted(2))));
}

#[test]
fn test_run_of_unregistered_plan_name_fails() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let denied = master.run(plan("no-such-plan"));
    assert!(matches!(denied, Err(ForemanError::PlanDoesNotExist(_))));
    assert!(master.list().is_empty());
}

#[test]
fn test_cancel_and_status_of_unknown_job() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    assert!(matches!(
        master.cancel(12345),
        Err(ForemanError::JobDoesNotExist(12345))
    ));
    assert!(matches!(
        master.get_status(12345),
        Err(ForemanError::JobDoesNotExist(12345))
    ));
}

#[test]
fn test_purged_job_stays_listed() {
    let (master, clock) = test_master(test_config(1, 0, 1));
    let w1 = master.register_worker(address("host-a"));

    let first = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(first, 0, Status::Completed, None)]);
    clock.advance_ms(1);

    let second = master.run(plan("echo")).expect("admission after purge");
    let jobs = master.list();
    assert!(jobs.contains(&second));
    assert!(jobs.contains(&first), "purged id listed: {:?}", jobs);
    assert!(master.get_status(first).is_err());
}

#[test]
fn test_unknown_worker_heartbeat_gets_exactly_a_register_command() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let commands = master.worker_heartbeat(424242, vec![report(1, 0, Status::Running, None)]);
    assert_eq!(commands, vec![JobCommand::Register]);
}

#[test]
fn test_lost_worker_fails_its_tasks_and_is_removed() {
    let mut config = test_config(100, 0, -1);
    config.worker_timeout_ms = 60_000;
    let (master, clock) = test_master(config);

    let w1 = master.register_worker(address("host-a"));
    let job_id = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Running, None)]);

    // Silent past the timeout.
    clock.advance_ms(60_001);
    master.lost_worker_tick();

    let status = master.get_status(job_id).expect("status");
    assert_eq!(status.status, Status::Failed);
    assert!(status.error_message.contains(&format!("Worker {} is lost", w1)));
    assert!(master.worker_info_list().is_empty());
    assert_eq!(
        master.worker_heartbeat(w1, Vec::new()),
        vec![JobCommand::Register]
    );
}

#[test]
fn test_heartbeat_within_timeout_keeps_the_worker() {
    let mut config = test_config(100, 0, -1);
    config.worker_timeout_ms = 60_000;
    let (master, clock) = test_master(config);

    let w1 = master.register_worker(address("host-a"));
    clock.advance_ms(59_000);
    master.worker_heartbeat(w1, Vec::new());
    clock.advance_ms(59_000);

    master.lost_worker_tick();
    assert_eq!(master.worker_info_list().len(), 1);
}

#[test]
fn test_reregistration_evicts_the_previous_worker() {
    let (master, _clock) = test_master(test_config(100, 0, -1));

    let w1 = master.register_worker(address("host-a"));
    let job_id = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Running, None)]);

    // Same address again: the worker restarted.
    let w2 = master.register_worker(address("host-a"));
    assert_ne!(w1, w2);

    // The stale id is gone; the old incarnation is told to re-register.
    assert_eq!(master.worker_heartbeat(w1, Vec::new()), vec![JobCommand::Register]);

    let status = master.get_status(job_id).expect("status");
    assert_eq!(status.status, Status::Failed);
    assert_eq!(status.children[0].status, Status::Failed);

    let workers = master.worker_info_list();
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].id, w2);
}

#[test]
fn test_cancel_resolves_through_worker_reports() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let w1 = master.register_worker(address("host-a"));
    let w2 = master.register_worker(address("host-b"));

    let job_id = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Running, None)]);
    master.worker_heartbeat(w2, vec![report(job_id, 1, Status::Running, None)]);

    master.cancel(job_id).expect("cancel");
    // Cancellation is asynchronous; the plan is still running until
    // workers report back.
    assert_eq!(master.get_status(job_id).unwrap().status, Status::Running);

    let commands = master.worker_heartbeat(w1, vec![report(job_id, 0, Status::Canceled, None)]);
    assert!(commands
        .iter()
        .any(|c| matches!(c, JobCommand::CancelTask { task_id: 0, .. })));
    master.worker_heartbeat(w2, vec![report(job_id, 1, Status::Completed, Some(b"late"))]);

    // One canceled task wins over the late completion.
    assert_eq!(master.get_status(job_id).unwrap().status, Status::Canceled);
}

#[test]
fn test_summary_groups_by_state_and_orders_by_recency() {
    let (master, clock) = test_master(test_config(100, 1_000_000, -1));
    let w1 = master.register_worker(address("host-a"));

    let running = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(running, 0, Status::Running, None)]);

    clock.advance_ms(10);
    let completed_old = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(completed_old, 0, Status::Completed, None)]);

    clock.advance_ms(10);
    let completed_new = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(w1, vec![report(completed_new, 0, Status::Completed, None)]);

    let summary = master.get_summary();

    let completed_group = summary
        .summary_per_status
        .iter()
        .find(|g| g.status == Status::Completed)
        .expect("completed group");
    assert_eq!(completed_group.count, 2);
    let ids: Vec<u64> = completed_group.jobs.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![completed_new, completed_old]);

    let running_group = summary
        .summary_per_status
        .iter()
        .find(|g| g.status == Status::Running)
        .expect("running group");
    assert_eq!(running_group.count, 1);
    assert_eq!(running_group.jobs[0].id, running);

    assert_eq!(summary.recent_activities[0].id, completed_new);
}

#[test]
fn test_summary_breaks_timestamp_ties_by_id() {
    let (master, _clock) = test_master(test_config(100, 1_000_000, -1));
    let w1 = master.register_worker(address("host-a"));

    // Both plans complete at the same manual-clock instant.
    let a = master.run(plan("echo")).expect("admission");
    let b = master.run(plan("echo")).expect("admission");
    master.worker_heartbeat(
        w1,
        vec![
            report(a, 0, Status::Completed, None),
            report(b, 0, Status::Completed, None),
        ],
    );

    let summary = master.get_summary();
    let completed_group = summary
        .summary_per_status
        .iter()
        .find(|g| g.status == Status::Completed)
        .expect("completed group");
    let ids: Vec<u64> = completed_group.jobs.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.min(b), a.max(b)]);
}

#[tokio::test(start_paused = true)]
async fn test_started_master_sweeps_lost_workers_on_its_own() {
    let mut config = test_config(100, 0, -1);
    config.lost_worker_interval_ms = 50;
    config.worker_timeout_ms = 1_000;
    let (master, clock) = test_master(config);

    master.register_worker(address("host-a"));
    master.start();

    clock.advance_ms(1_001);
    // Let the detector loop get a few ticks in.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    assert!(master.worker_info_list().is_empty());
    master.stop();
}

#[test]
fn test_heartbeat_reports_spanning_jobs_are_routed_per_plan() {
    let (master, _clock) = test_master(test_config(100, 0, -1));
    let w1 = master.register_worker(address("host-a"));

    let first = master.run(plan("echo")).expect("admission");
    let second = master.run(plan("echo")).expect("admission");

    master.worker_heartbeat(
        w1,
        vec![
            report(first, 0, Status::Completed, Some(b"one")),
            report(second, 0, Status::Running, None),
            // Reports for vanished jobs are dropped quietly.
            report(999_999, 0, Status::Completed, None),
        ],
    );

    assert_eq!(master.get_status(first).unwrap().status, Status::Completed);
    assert_eq!(master.get_status(second).unwrap().status, Status::Running);
}
