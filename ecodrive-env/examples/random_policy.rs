use anyhow::Result;
use ecodrive_env::{
    CarFollowEnv, CarFollowEnvConfig, RandomPolicy, TraceRepository, InMemoryTraces, VehicleTrace,
};
use ecodrive_core::{Env as _, Policy};
use log::info;

const DT: f64 = 0.1;

/// A synthetic 60 s trace with a gentle speed oscillation around 14 m/s.
fn synthetic_trace() -> VehicleTrace {
    let n = 601;
    let time: Vec<f64> = (0..n).map(|i| i as f64 * DT).collect();
    let speed: Vec<f64> = time.iter().map(|&t| 14.0 + 3.0 * (0.2 * t).sin()).collect();
    let mut d = 0.0;
    let distance: Vec<f64> = speed
        .iter()
        .map(|&v| {
            let out = d;
            d += v * DT;
            out
        })
        .collect();
    VehicleTrace::new(time, distance, speed).expect("synthetic trace is well formed")
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut repo = InMemoryTraces::new();
    repo.insert("veh_demo", synthetic_trace());
    let repo: Box<dyn TraceRepository> = Box::new(repo);

    let config = CarFollowEnvConfig::default();
    let mut env = CarFollowEnv::with_repository(&config, repo, 42);
    let limits = env.limits();
    let mut policy = RandomPolicy::new(limits.a_min, limits.a_max, 42);

    for episode in 0..5 {
        let mut obs = env.reset()?;
        let mut ret = 0.0;
        let mut steps = 0usize;

        loop {
            let act = policy.sample(&obs);
            let (step, _record) = env.step(&act);
            ret += step.reward;
            steps += 1;
            if step.is_done() {
                info!(
                    "episode {}: {} steps, return {:.3}, terminated = {}",
                    episode, steps, ret, step.is_terminated
                );
                break;
            }
            obs = step.obs;
        }
    }

    Ok(())
}
