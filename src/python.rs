use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::config::DriverConfig;
use crate::control::{ControlError, Controller, PoleVelocityController};
use crate::driver::build_env;
use crate::env::{CartPole, Env, EnvError, RenderMode, Space, TimeLimit};

/// `error: cause: cause...`, since wrapping variants leave the cause to `source()`.
fn describe(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

fn control_err(e: ControlError) -> PyErr {
    match e {
        ControlError::InvalidObservation { .. } => PyValueError::new_err(describe(&e)),
        other => PyRuntimeError::new_err(describe(&other)),
    }
}

fn env_err(e: EnvError) -> PyErr {
    match e {
        EnvError::InvalidAction(_) => PyValueError::new_err(describe(&e)),
        other => PyRuntimeError::new_err(describe(&other)),
    }
}

/// Calculate the action for the next step of the cart-pole environment.
#[pyfunction]
fn get_action(obs: Vec<f64>) -> PyResult<i64> {
    PoleVelocityController.get_action(&obs).map_err(control_err)
}

/// Step-limited cart-pole environment.
#[pyclass(name = "CartPoleEnv")]
struct PyCartPoleEnv {
    inner: TimeLimit<CartPole>,
}

#[pymethods]
impl PyCartPoleEnv {
    #[new]
    #[pyo3(signature = (seed=None, max_episode_steps=500, render_mode=None))]
    fn new(seed: Option<u64>, max_episode_steps: u64, render_mode: Option<&str>) -> PyResult<Self> {
        let render_mode = match render_mode {
            None => RenderMode::None,
            Some("human") => RenderMode::Human,
            Some("ansi") => RenderMode::Ansi,
            Some(other) => {
                return Err(PyValueError::new_err(format!(
                    "unsupported render_mode {other:?}"
                )));
            }
        };
        let cfg = DriverConfig {
            seed,
            render_mode,
            max_episode_steps,
            ..DriverConfig::default()
        };
        cfg.validate()
            .map_err(|e| PyValueError::new_err(describe(&e)))?;

        Ok(Self {
            inner: build_env(&cfg).map_err(env_err)?,
        })
    }

    fn reset<'py>(&mut self, py: Python<'py>) -> PyResult<(Vec<f64>, Bound<'py, PyDict>)> {
        let (obs, _info) = self.inner.reset().map_err(env_err)?;
        Ok((obs.to_vec(), PyDict::new(py)))
    }

    fn step<'py>(
        &mut self,
        py: Python<'py>,
        action: usize,
    ) -> PyResult<(Vec<f64>, f64, bool, bool, Bound<'py, PyDict>)> {
        let step = self.inner.step(action).map_err(env_err)?;
        let info = PyDict::new(py);
        if let Some(elapsed) = step.info.get("elapsed_steps").and_then(|v| v.as_u64()) {
            info.set_item("elapsed_steps", elapsed)?;
        }
        Ok((
            step.obs.to_vec(),
            step.reward,
            step.terminated,
            step.truncated,
            info,
        ))
    }

    fn sample_action(&mut self) -> usize {
        self.inner.action_space_mut().sample()
    }

    fn render(&mut self) -> PyResult<Option<String>> {
        self.inner.render().map_err(env_err)
    }

    fn close(&mut self) -> PyResult<()> {
        self.inner.close().map_err(env_err)
    }
}

/// The name of this function must match the lib.name in Cargo.toml
#[pymodule]
fn cartpole_driver(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(get_action, m)?)?;
    m.add_class::<PyCartPoleEnv>()?;
    Ok(())
}
