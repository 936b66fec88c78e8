//! Policy.
use super::Env;
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A policy on an environment: a mapping from an observation to an action,
/// deterministic or stochastic.
///
/// This is the entire surface a learning algorithm needs to implement to
/// act on an environment in this crate.
pub trait Policy<E: Env> {
    /// Samples an action given an observation.
    fn sample(&mut self, obs: &E::Obs) -> E::Act;
}

/// An object that can be built from a serializable configuration.
pub trait Configurable {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Self;

    /// Builds the object from the YAML configuration at the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Ok(Self::build(config))
    }
}

#[cfg(test)]
mod tests {
    use super::Configurable;
    use serde::Deserialize;
    use std::io::Write;
    use tempdir::TempDir;

    #[derive(Clone, Deserialize)]
    struct GainConfig {
        gain: f64,
    }

    struct Gain {
        gain: f64,
    }

    impl Configurable for Gain {
        type Config = GainConfig;

        fn build(config: GainConfig) -> Self {
            Self { gain: config.gain }
        }
    }

    #[test]
    fn builds_from_yaml_path() {
        let dir = TempDir::new("ecodrive-policy").unwrap();
        let path = dir.path().join("gain.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "gain: 2.5").unwrap();
        drop(file);

        let gain = Gain::build_from_path(&path).unwrap();
        assert_eq!(gain.gain, 2.5);

        assert!(Gain::build_from_path(dir.path().join("missing.yaml")).is_err());
    }
}
