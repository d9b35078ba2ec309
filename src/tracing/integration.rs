//! Numerical integration of fiber steps.

use super::ftr;
use crate::geometry::{Point3, Vec3};
use std::fmt;

/// Explicit integration scheme for advancing along the step direction field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Integrator {
    /// Forward Euler, one direction evaluation per step.
    Euler,
    /// Second-order midpoint method, two direction evaluations per step.
    Midpoint,
    /// Classical fourth-order Runge-Kutta, four direction evaluations per step.
    RungeKutta4,
}

impl Integrator {
    /// Returns the number of direction evaluations made per step.
    pub fn evaluations_per_step(&self) -> usize {
        match self {
            Self::Euler => 1,
            Self::Midpoint => 2,
            Self::RungeKutta4 => 4,
        }
    }

    /// Returns the name of the scheme.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Euler => "Euler",
            Self::Midpoint => "midpoint",
            Self::RungeKutta4 => "RK4",
        }
    }

    /// Computes the step from the given position.
    ///
    /// # Parameters
    ///
    /// - `position`: Position at the start of the step.
    /// - `step_size`: Distance to advance per unit step direction.
    /// - `initial_direction`: Step direction at `position`.
    /// - `direction_at`: Closure evaluating the step direction at an intermediate
    /// position, returning `None` if the position is outside the field.
    ///
    /// # Returns
    ///
    /// A `Result` which is either:
    ///
    /// - `Ok`: Contains the step vector, or `None` if an intermediate position was outside the field.
    /// - `Err`: Contains the error returned by `direction_at`.
    ///
    /// # Type parameters
    ///
    /// - `D`: Mutable function type taking a position and returning an optional step direction.
    /// - `E`: Error type of the direction evaluation.
    pub fn step<D, E>(
        &self,
        position: &Point3<ftr>,
        step_size: ftr,
        initial_direction: &Vec3<ftr>,
        mut direction_at: D,
    ) -> Result<Option<Vec3<ftr>>, E>
    where
        D: FnMut(&Point3<ftr>) -> Result<Option<Vec3<ftr>>, E>,
    {
        let k1 = initial_direction;
        let half_step = 0.5 * step_size;
        match self {
            Self::Euler => Ok(Some(k1 * step_size)),
            Self::Midpoint => {
                let Some(k2) = direction_at(&(position + &(k1 * half_step)))? else {
                    return Ok(None);
                };
                Ok(Some(k2 * step_size))
            }
            Self::RungeKutta4 => {
                let Some(k2) = direction_at(&(position + &(k1 * half_step)))? else {
                    return Ok(None);
                };
                let Some(k3) = direction_at(&(position + &(&k2 * half_step)))? else {
                    return Ok(None);
                };
                let Some(k4) = direction_at(&(position + &(&k3 * step_size)))? else {
                    return Ok(None);
                };
                let sixth = step_size / 6.0;
                let third = step_size / 3.0;
                Ok(Some(k1 * sixth + &k2 * third + &k3 * third + &k4 * sixth))
            }
        }
    }
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
