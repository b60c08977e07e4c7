//! Mixed-radix enumeration of grounding tuples
//!
//! Enumerates every tuple `(g_0..g_{n-1})` with `1 <= g_i <= bounds[i]`,
//! the last position changing fastest. A zero-length bound list yields one
//! empty tuple; a zero bound yields nothing.

#[derive(Debug, Clone)]
pub struct Odometer {
    bounds: Vec<u32>,
    current: Vec<u32>,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Fresh,
    Running,
    Done,
}

impl Odometer {
    pub fn new(bounds: Vec<u32>) -> Self {
        let state = if bounds.contains(&0) {
            State::Done
        } else {
            State::Fresh
        };
        let current = vec![1; bounds.len()];
        Odometer {
            bounds,
            current,
            state,
        }
    }

    /// Advance and return the next tuple, or `None` at the end
    pub fn next_tuple(&mut self) -> Option<&[u32]> {
        match self.state {
            State::Done => return None,
            State::Fresh => {
                self.state = State::Running;
                return Some(&self.current);
            }
            State::Running => {}
        }

        for i in (0..self.current.len()).rev() {
            if self.current[i] < self.bounds[i] {
                self.current[i] += 1;
                return Some(&self.current);
            }
            self.current[i] = 1;
        }
        self.state = State::Done;
        None
    }

    /// Number of tuples the odometer enumerates in total
    pub fn count(bounds: &[u32]) -> u64 {
        bounds
            .iter()
            .try_fold(1u64, |acc, &b| acc.checked_mul(b as u64))
            .unwrap_or(u64::MAX)
    }
}
