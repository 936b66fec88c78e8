use ecodrive_core::{DefaultEvaluator, Env as _, Evaluator, Policy};
use ecodrive_env::error::EnvError;
use ecodrive_env::{
    CarFollowEnv, CarFollowEnvConfig, InMemoryTraces, InitialState, ManualTrace, ObsEncoding,
    RandomPolicy, ResetOptions, TraceRepository, VehicleTrace,
};

const DT: f64 = 0.1;

fn constant_trace(n: usize, v: f64) -> VehicleTrace {
    let time: Vec<f64> = (0..n).map(|i| i as f64 * DT).collect();
    let distance: Vec<f64> = time.iter().map(|t| v * t).collect();
    VehicleTrace::new(time, distance, vec![v; n]).unwrap()
}

fn env_with_trace(config: &CarFollowEnvConfig, trace: VehicleTrace, seed: u64) -> CarFollowEnv {
    let mut repo = InMemoryTraces::new();
    repo.insert("veh_1", trace);
    let repo: Box<dyn TraceRepository> = Box::new(repo);
    CarFollowEnv::with_repository(config, repo, seed)
}

fn pinned_reset(d0: f64, v0: f64) -> ResetOptions {
    ResetOptions {
        preceding_id: Some("veh_1".into()),
        t_beg: Some(0.0),
        initial_state: Some(InitialState { d0, v0 }),
        ..Default::default()
    }
}

#[test]
fn polynomial_reset_has_expected_shape() {
    let config = CarFollowEnvConfig::default();
    let mut env = env_with_trace(&config, constant_trace(101, 15.0), 0);

    let obs = env.reset_with(&pinned_reset(-20.0, 15.0)).unwrap();
    let row = obs.row();

    // 3 header slots plus 4 per segment for the two-segment horizon.
    assert_eq!(row.len(), 11);
    assert_eq!(row[2], 0.0);
    assert!((row[1] - 15.0).abs() < 1e-12);

    let model = env.trajectory().unwrap();
    assert_eq!(model.n_segments(), 2);
    // The window spans the whole trace.
    assert!(env.control_mode().unwrap().terminate);
}

#[test]
fn episode_terminates_on_matched_final_state() {
    let config = CarFollowEnvConfig::default().encoding(ObsEncoding::Relative);
    let mut env = env_with_trace(&config, constant_trace(601, 15.0), 0);

    // Rebased window positions are 0.1 + 1.5 k; coasting at 15 m/s from
    // d0 = -29.9 holds the gap at exactly 30 m, one metre ahead of the
    // terminal position target, and matches the terminal speed.
    env.reset_with(&pinned_reset(-29.9, 15.0)).unwrap();

    let mut steps = 0usize;
    loop {
        let (step, _) = env.step(&0.0.into());
        steps += 1;
        if step.is_done() {
            assert!(step.is_terminated);
            break;
        }
    }
    assert_eq!(steps, 101);
}

#[test]
fn off_target_final_step_truncates() {
    let config = CarFollowEnvConfig::default().encoding(ObsEncoding::Relative);
    let mut env = env_with_trace(&config, constant_trace(601, 15.0), 0);

    // Same coasting profile but 20 m further back; the horizon runs out
    // without the terminal condition being met.
    env.reset_with(&pinned_reset(-49.9, 15.0)).unwrap();

    let mut steps = 0usize;
    loop {
        let (step, _) = env.step(&0.0.into());
        steps += 1;
        if step.is_done() {
            assert!(step.is_truncated);
            assert!(!step.is_terminated);
            break;
        }
    }
    assert_eq!(steps, 101);
}

#[test]
fn unsafe_gap_overrides_the_action() {
    let config = CarFollowEnvConfig::default().encoding(ObsEncoding::Relative);
    let mut env = env_with_trace(&config, constant_trace(601, 15.0), 0);

    // Initial gap of 5 m against a 8.5 m speed-dependent minimum.
    env.reset_with(&pinned_reset(-4.9, 15.0)).unwrap();

    let (step, record) = env.step(&3.0.into());
    let forced = -0.5 * (8.5 - 5.0);
    assert!((step.act.0 - forced).abs() < 1e-9);
    assert!((record.get_scalar("action").unwrap() as f64 - forced).abs() < 1e-6);
}

#[test]
fn random_policy_episode_runs_to_completion() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = CarFollowEnvConfig::default();
    let mut env = env_with_trace(&config, constant_trace(601, 14.0), 7);
    let limits = env.limits();
    let mut policy = RandomPolicy::new(limits.a_min, limits.a_max, 7);

    let mut obs = env.reset().unwrap();
    let mut steps = 0usize;
    loop {
        let act = policy.sample(&obs);
        let (step, record) = env.step(&act);
        assert_eq!(step.obs.row().len(), 11);
        assert!(step.reward.is_finite());
        assert!(record.get_scalar("reward").is_ok());
        steps += 1;
        if step.is_done() {
            break;
        }
        obs = step.obs;
    }
    assert!(steps <= 101);
}

#[test]
fn exhausted_retries_surface_as_no_valid_window() {
    let mut config = CarFollowEnvConfig::default();
    config.max_retries = 25;
    let mut env = env_with_trace(&config, constant_trace(601, 0.0), 3);

    let err = env.reset().unwrap_err();
    match err.downcast_ref::<EnvError>() {
        Some(EnvError::NoValidWindow { attempts }) => assert_eq!(*attempts, 25),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn explicit_start_reports_stop_line() {
    let config = CarFollowEnvConfig::default().encoding(ObsEncoding::Relative);
    let mut env = env_with_trace(&config, constant_trace(601, 0.0), 3);

    env.reset_with(&pinned_reset(-20.0, 0.0)).unwrap();
    assert!(env.control_mode().unwrap().stop_line);

    // The flags ride along on every step.
    let (step, _) = env.step(&0.0.into());
    assert!(step.info.stop_line);
}

#[test]
fn manual_trace_bypasses_the_dataset() {
    let trace = constant_trace(101, 12.0);
    let manual = ManualTrace {
        id: "veh_ext".into(),
        time: trace.time().to_vec(),
        distance: trace.distance().to_vec(),
        speed: trace.speed().to_vec(),
    };

    // No dataset at all; the trace comes in through the reset options.
    let config = CarFollowEnvConfig::default();
    let mut env = CarFollowEnv::build(&config, 0).unwrap();
    let opts = ResetOptions {
        manual_trace: Some(manual),
        initial_state: Some(InitialState { d0: -20.0, v0: 12.0 }),
        ..Default::default()
    };

    env.reset_with(&opts).unwrap();
    assert_eq!(env.trajectory().unwrap().window().vehicle_id(), "veh_ext");

    // Without manual data there is nothing to sample from.
    let mut bare = CarFollowEnv::build(&config, 0).unwrap();
    assert!(bare.reset().is_err());
}

#[test]
fn keeping_the_vehicle_repeats_the_episode() {
    let config = CarFollowEnvConfig::default();
    let mut env = env_with_trace(&config, constant_trace(601, 14.0), 11);

    let opts = ResetOptions {
        random_vehicle: false,
        ..Default::default()
    };
    let first = env.reset_with(&opts).unwrap();
    let t_beg = env.trajectory().unwrap().window().t_beg();

    let second = env.reset_with(&opts).unwrap();
    assert_eq!(env.trajectory().unwrap().window().t_beg(), t_beg);
    for (a, b) in first.row().iter().zip(second.row().iter()) {
        assert_eq!(a, b);
    }
}

#[test]
fn evaluator_runs_over_a_csv_dataset() {
    use std::io::Write;
    use tempdir::TempDir;

    let dir = TempDir::new("ecodrive-eval").unwrap();
    let path = dir.path().join("traces.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "id,time,distance,speed").unwrap();
    for i in 0..601 {
        let t = i as f64 * DT;
        writeln!(file, "veh_1,{},{},{}", t, 15.0 * t, 15.0).unwrap();
    }
    drop(file);

    let config = CarFollowEnvConfig::default().data_path(&path);
    let mut evaluator = DefaultEvaluator::<CarFollowEnv>::new(&config, 0, 2).unwrap();
    let mut policy = RandomPolicy::new(-3.0, 3.0, 1);

    let record = evaluator.evaluate(&mut policy).unwrap();
    assert!(record.get_scalar("Episode return").unwrap().is_finite());
}

#[test]
fn gapped_dataset_loads_and_resamples_around_the_gap() {
    use std::io::Write;
    use tempdir::TempDir;

    // 120 s recording with 2 s of samples missing at t = 60, as after a
    // lane change.
    let dir = TempDir::new("ecodrive-gap").unwrap();
    let path = dir.path().join("traces.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "id,time,distance,speed").unwrap();
    for i in 0..1201 {
        let t = i as f64 * DT;
        if (60.0..62.0).contains(&t) {
            continue;
        }
        writeln!(file, "veh_1,{},{},{}", t, 14.0 * t, 14.0).unwrap();
    }
    drop(file);

    let config = CarFollowEnvConfig::default().data_path(&path);
    let mut env = CarFollowEnv::build(&config, 5).unwrap();

    for _ in 0..10 {
        env.reset().unwrap();
        let window = env.trajectory().unwrap().window();
        assert_eq!(window.t().len(), 101);
        let t_beg = window.t_beg();
        assert!(t_beg < 49.0 + 1e-9 || t_beg > 62.0 - 1e-9);
    }
}

#[test]
fn polynomial_blend_tracks_across_the_segment_boundary() {
    // A speed profile that actually bends, so the two fitted cubics
    // differ and the gated blend has real work to do at the boundary.
    let n = 601;
    let time: Vec<f64> = (0..n).map(|i| i as f64 * DT).collect();
    let speed: Vec<f64> = time.iter().map(|&t| 12.0 + 1.5 * (0.4 * t).sin()).collect();
    let mut d = 0.0;
    let distance: Vec<f64> = speed
        .iter()
        .map(|&v| {
            let out = d;
            d += v * DT;
            out
        })
        .collect();
    let trace = VehicleTrace::new(time, distance, speed).unwrap();

    let config = CarFollowEnvConfig::default();
    let mut env = env_with_trace(&config, trace, 0);
    env.reset_with(&pinned_reset(-30.0, 12.0)).unwrap();

    let segments = env.trajectory().unwrap().segments();
    let (a, b) = (segments[0].coeffs(), segments[1].coeffs());
    assert!(a.iter().zip(b.iter()).any(|(x, y)| (x - y).abs() > 1e-3));

    // Step well past the k = 50 boundary; the decoded position must keep
    // tracking the raw kinematics through the blend.
    for _ in 0..70 {
        let (step, _) = env.step(&0.2.into());
        let decoded = env.decode(&step.obs).unwrap();
        let state = env.state().unwrap();
        assert!(
            (decoded[[0, 0]] - state.position).abs() < 0.1,
            "decoded {} vs raw {} at k = {}",
            decoded[[0, 0]],
            state.position,
            step.obs.row()[2]
        );
        assert!((decoded[[0, 1]] - state.speed).abs() < 1e-9);
    }
    assert_eq!(env.current_step(), Some(70));
}

#[test]
fn relative_dynamics_track_the_raw_state() {
    let config = CarFollowEnvConfig::default().encoding(ObsEncoding::Relative);
    let mut env = env_with_trace(&config, constant_trace(601, 15.0), 0);

    env.reset_with(&pinned_reset(-30.0, 13.0)).unwrap();
    for _ in 0..10 {
        let (step, _) = env.step(&0.5.into());
        let decoded = env.decode(&step.obs).unwrap();
        let state = env.state().unwrap();
        assert!((decoded[[0, 0]] - state.position).abs() < 1e-9);
        assert!((decoded[[0, 1]] - state.speed).abs() < 1e-9);
    }
}

#[test]
fn polynomial_dynamics_track_the_raw_state() {
    // Constant speed: every segment cubic collapses to the same affine
    // profile, so the sigmoid-gated blend agrees with the raw kinematics
    // up to the gate tails.
    let config = CarFollowEnvConfig::default();
    let mut env = env_with_trace(&config, constant_trace(601, 15.0), 0);

    env.reset_with(&pinned_reset(-30.0, 13.0)).unwrap();
    for _ in 0..10 {
        let (step, _) = env.step(&0.5.into());
        let decoded = env.decode(&step.obs).unwrap();
        let state = env.state().unwrap();
        assert!((decoded[[0, 0]] - state.position).abs() < 1e-3);
        assert!((decoded[[0, 1]] - state.speed).abs() < 1e-9);
    }
}
