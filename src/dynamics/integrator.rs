//! Fixed-step 4th-order Runge-Kutta integration over a [`VariableStore`].

use crate::core::vars::VariableStore;
use crate::dynamics::system::DifferentiableSystem;
use crate::error::{SimError, SimResult};

/// Classical RK4 integrator.
///
/// Owns its stage and scratch buffers so the steady-state stepping loop is
/// allocation-free; buffers are resized only when the state dimension
/// changes. A step either fully commits (smooth writes, `continuous = true`)
/// or, if any stage evaluation fails, leaves the store untouched.
#[derive(Debug, Default)]
pub struct RungeKutta4 {
    initial: Vec<f64>,
    inp: Vec<f64>,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    state_mask: Vec<bool>,
}

impl RungeKutta4 {
    pub fn new() -> Self {
        Self::default()
    }

    fn resize(&mut self, n: usize) {
        if self.initial.len() != n {
            self.initial.resize(n, 0.0);
            self.inp.resize(n, 0.0);
            self.k1.resize(n, 0.0);
            self.k2.resize(n, 0.0);
            self.k3.resize(n, 0.0);
            self.k4.resize(n, 0.0);
        }
    }

    /// Advances the store by one step of size `dt`.
    ///
    /// Only live, non-computed variables are integrated; computed variables
    /// are presented to the model as NaN so it can tell independent state
    /// from derived values.
    pub fn step<S: DifferentiableSystem>(
        &mut self,
        system: &mut S,
        vars: &mut VariableStore,
        dt: f64,
    ) -> SimResult<()> {
        let n = vars.num_variables();
        self.resize(n);
        vars.write_state_mask(&mut self.state_mask);

        vars.write_values(&mut self.initial, false);
        system.evaluate(&self.initial, &mut self.k1, dt)?;

        for i in 0..n {
            self.inp[i] = self.initial[i] + self.k1[i] * dt / 2.0;
        }
        system.evaluate(&self.inp, &mut self.k2, dt)?;

        for i in 0..n {
            self.inp[i] = self.initial[i] + self.k2[i] * dt / 2.0;
        }
        system.evaluate(&self.inp, &mut self.k3, dt)?;

        for i in 0..n {
            self.inp[i] = self.initial[i] + self.k3[i] * dt;
        }
        system.evaluate(&self.inp, &mut self.k4, dt)?;

        // all stages succeeded; stage the full result and validate it before
        // the first write so a bad slot cannot leave the store half-stepped
        for i in 0..n {
            self.inp[i] = self.initial[i]
                + dt / 6.0 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
            if self.state_mask[i] && self.inp[i].is_nan() {
                return Err(SimError::NotANumber { index: i });
            }
        }
        for i in 0..n {
            if !self.state_mask[i] {
                continue;
            }
            vars.set_value(i, self.inp[i], true)?;
            vars.set_rate(i, self.k1[i])?;
        }
        Ok(())
    }
}
