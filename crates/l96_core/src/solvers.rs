use crate::traits::{ForwardMap, Scalar, Steppable, VectorField};
use anyhow::Result;

/// Classic Runge-Kutta 4th Order Solver
///
/// Holds the stage buffers so repeated steps do not allocate. The buffers
/// follow the length of the state handed to `step`.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![T::zero(); dim],
            k2: vec![T::zero(); dim],
            k3: vec![T::zero(); dim],
            k4: vec![T::zero(); dim],
            tmp: vec![T::zero(); dim],
        }
    }

    fn ensure_len(&mut self, len: usize) {
        if self.tmp.len() != len {
            for buffer in [
                &mut self.k1,
                &mut self.k2,
                &mut self.k3,
                &mut self.k4,
                &mut self.tmp,
            ] {
                buffer.resize(len, T::zero());
            }
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, field: &impl VectorField<T>, state: &mut [T], dt: T) -> Result<()> {
        let two = T::one() + T::one();
        let half = T::one() / two;
        let sixth = T::one() / (two + two + two);

        self.ensure_len(state.len());

        // k1 = f(y)
        field.apply(state, &mut self.k1)?;

        // k2 = f(y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        field.apply(&self.tmp, &mut self.k2)?;

        // k3 = f(y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        field.apply(&self.tmp, &mut self.k3)?;

        // k4 = f(y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        field.apply(&self.tmp, &mut self.k4)?;

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        Ok(())
    }
}

/// Advances `state` by one RK4 step of size `dt` and returns the new state.
///
/// The input is left untouched. `dt > 0` is assumed, not checked.
pub fn integrate<T: Scalar>(field: &impl VectorField<T>, state: &[T], dt: T) -> Result<Vec<T>> {
    let mut next = state.to_vec();
    RK4::new(state.len()).step(field, &mut next, dt)?;
    Ok(next)
}

/// RK4 applied to a fixed vector field with a fixed step: a ready-made forward map.
pub struct Rk4Map<T: Scalar, V> {
    field: V,
    dt: T,
    solver: RK4<T>,
}

impl<T: Scalar, V: VectorField<T>> Rk4Map<T, V> {
    pub fn new(field: V, dt: T) -> Self {
        let dim = field.dimension();
        Self {
            field,
            dt,
            solver: RK4::new(dim),
        }
    }

    pub fn field(&self) -> &V {
        &self.field
    }

    pub fn dt(&self) -> T {
        self.dt
    }
}

impl<T: Scalar, V: VectorField<T>> ForwardMap<T> for Rk4Map<T, V> {
    fn advance(&mut self, state: &[T], next: &mut [T]) -> Result<()> {
        next.copy_from_slice(state);
        self.solver.step(&self.field, next, self.dt)
    }
}

#[cfg(test)]
mod tests {
    use super::{integrate, Rk4Map, RK4};
    use crate::traits::{ForwardMap, Steppable, VectorField};
    use anyhow::{bail, Result};

    struct Decay {
        rate: f64,
    }

    impl VectorField<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, x: &[f64], out: &mut [f64]) -> Result<()> {
            for (o, v) in out.iter_mut().zip(x) {
                *o = -self.rate * v;
            }
            Ok(())
        }
    }

    struct Failing;

    impl VectorField<f64> for Failing {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _x: &[f64], _out: &mut [f64]) -> Result<()> {
            bail!("vector field exploded")
        }
    }

    #[test]
    fn integrate_matches_exponential_decay_to_fifth_order() {
        let field = Decay { rate: 1.0 };
        for &h in &[0.1_f64, 0.05] {
            let next = integrate(&field, &[1.0], h).expect("step");
            let exact = (-h).exp();
            // local truncation error of RK4 is h^5/120 for dx/dt = -x
            assert!((next[0] - exact).abs() <= h.powi(5) / 100.0);
        }

        let coarse = (integrate(&field, &[1.0], 0.2).expect("step")[0] - (-0.2f64).exp()).abs();
        let fine = (integrate(&field, &[1.0], 0.1).expect("step")[0] - (-0.1f64).exp()).abs();
        let ratio = coarse / fine;
        assert!(ratio > 28.0 && ratio < 36.0, "error ratio {ratio} is not ~2^5");
    }

    #[test]
    fn integrate_leaves_input_untouched() {
        let field = Decay { rate: 2.0 };
        let state = vec![1.0, -3.0, 0.5];
        let before = state.clone();
        let next = integrate(&field, &state, 0.1).expect("step");
        assert_eq!(state, before);
        assert_eq!(next.len(), state.len());
        assert_ne!(next, state);
    }

    #[test]
    fn integrate_propagates_field_errors() {
        let err = integrate(&Failing, &[1.0], 0.1).expect_err("should fail");
        assert!(format!("{err}").contains("exploded"));
    }

    #[test]
    fn stepper_resizes_for_longer_states() {
        let field = Decay { rate: 1.0 };
        let mut solver = RK4::new(1);
        let mut state = vec![1.0, 2.0, 4.0];
        solver.step(&field, &mut state, 0.1).expect("step");
        let factor = (-0.1f64).exp();
        for (value, start) in state.iter().zip([1.0, 2.0, 4.0]) {
            assert!((value - start * factor).abs() < 1e-6);
        }
    }

    #[test]
    fn rk4_map_agrees_with_integrate() {
        let mut map = Rk4Map::new(Decay { rate: 0.5 }, 0.01);
        let state = [3.0];
        let mut next = [0.0];
        map.advance(&state, &mut next).expect("advance");
        let expected = integrate(map.field(), &state, map.dt()).expect("step");
        assert_eq!(next[0], expected[0]);
    }
}
