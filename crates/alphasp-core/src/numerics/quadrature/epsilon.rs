//! Wynn epsilon-algorithm table (QUADPACK `qelg`).
//!
//! The extrapolating integrator appends one partial area per bisection of
//! the smallest subinterval; the table accelerates that sequence to its
//! limit and estimates the error from the last three extrapolated values.

/// Elements kept before the table is shifted down.
const TABLE_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub(super) struct EpsilonTable {
    entries: [f64; TABLE_LIMIT + 2],
    len: usize,
    recent: [f64; 3],
    calls: usize,
}

impl EpsilonTable {
    pub(super) fn new(first: f64) -> Self {
        let mut table = Self {
            entries: [0.0; TABLE_LIMIT + 2],
            len: 0,
            recent: [0.0; 3],
            calls: 0,
        };
        table.push(first);
        table
    }

    pub(super) fn len(&self) -> usize {
        self.len
    }

    pub(super) fn push(&mut self, area: f64) {
        // Early convergence exits leave the length untouched; drop the two
        // oldest elements rather than overrun the buffer.
        if self.len >= TABLE_LIMIT {
            self.entries.copy_within(2..self.len, 0);
            self.len -= 2;
        }
        self.entries[self.len] = area;
        self.len += 1;
    }

    /// Extrapolated limit of the stored sequence and its error estimate.
    ///
    /// The error is `f64::MAX` until three extrapolations are available.
    pub(super) fn extrapolate(&mut self) -> (f64, f64) {
        let n = self.len - 1;
        let current = self.entries[n];
        if n < 2 {
            return (current, f64::MAX);
        }

        let table = &mut self.entries;
        let new_elements = n / 2;
        let mut n_final = n;
        let mut result = current;
        let mut abs_error = f64::MAX;

        table[n + 2] = table[n];
        table[n] = f64::MAX;

        for i in 0..new_elements {
            let mut res = table[n - 2 * i + 2];
            let e0 = table[n - 2 * i - 2];
            let e1 = table[n - 2 * i - 1];
            let e2 = res;

            let e1_abs = e1.abs();
            let delta2 = e2 - e1;
            let err2 = delta2.abs();
            let tol2 = e2.abs().max(e1_abs) * f64::EPSILON;
            let delta3 = e1 - e0;
            let err3 = delta3.abs();
            let tol3 = e1_abs.max(e0.abs()) * f64::EPSILON;

            // e0, e1 and e2 agree to machine accuracy.
            if err2 < tol2 && err3 < tol3 {
                let error = (err2 + err3).max(5.0 * f64::EPSILON * res.abs());
                return (res, error);
            }

            let e3 = table[n - 2 * i];
            table[n - 2 * i] = e1;
            let delta1 = e1 - e3;
            let err1 = delta1.abs();
            let tol1 = e1_abs.max(e3.abs()) * f64::EPSILON;

            if err1 < tol1 || err2 < tol2 || err3 < tol3 {
                n_final = 2 * i;
                break;
            }

            let ss = (1.0 / delta1 + 1.0 / delta2) - 1.0 / delta3;
            // Irregular behaviour; drop the rest of the diagonal.
            if (ss * e1).abs() <= 1.0e-4 {
                n_final = 2 * i;
                break;
            }

            res = e1 + 1.0 / ss;
            table[n - 2 * i] = res;
            let error = err2 + (res - e2).abs() + err3;
            if error <= abs_error {
                abs_error = error;
                result = res;
            }
        }

        if n_final == TABLE_LIMIT - 1 {
            n_final = 2 * ((TABLE_LIMIT - 1) / 2);
        }

        if n % 2 == 1 {
            for i in 0..=new_elements {
                table[2 * i + 1] = table[2 * i + 3];
            }
        } else {
            for i in 0..=new_elements {
                table[2 * i] = table[2 * i + 2];
            }
        }
        if n != n_final {
            for i in 0..=n_final {
                table[i] = table[n - n_final + i];
            }
        }
        self.len = n_final + 1;

        if self.calls < 3 {
            self.recent[self.calls] = result;
            abs_error = f64::MAX;
        } else {
            abs_error = (result - self.recent[2]).abs()
                + (result - self.recent[1]).abs()
                + (result - self.recent[0]).abs();
            self.recent = [self.recent[1], self.recent[2], result];
        }
        self.calls += 1;

        (result, abs_error.max(5.0 * f64::EPSILON * result.abs()))
    }
}
