use streaming_iterator::StreamingIterator;
use vega_collections::Idx;
use vega_formalism::Object;

/// Streaming enumeration of all object tuples drawn from per-position
/// domains, lexicographically, without allocating per tuple.
///
/// `combinations(vec![])` yields exactly the empty tuple, which is what a
/// conditional effect without extra variables wants.
pub fn combinations(domains: Vec<Vec<Idx<Object>>>) -> Combinations {
    Combinations {
        odometer: vec![0; domains.len()],
        tuple: Vec::with_capacity(domains.len()),
        domains,
        state: State::Fresh,
    }
}

enum State {
    Fresh,
    Running,
    Done,
}

pub struct Combinations {
    domains: Vec<Vec<Idx<Object>>>,
    odometer: Vec<usize>,
    tuple: Vec<Idx<Object>>,
    state: State,
}

impl Combinations {
    fn load(&mut self) {
        self.tuple.clear();
        for (position, &digit) in self.odometer.iter().enumerate() {
            self.tuple.push(self.domains[position][digit]);
        }
    }

    /// Advances the odometer; returns false on wrap-around.
    fn step(&mut self) -> bool {
        for position in (0..self.odometer.len()).rev() {
            self.odometer[position] += 1;
            if self.odometer[position] < self.domains[position].len() {
                return true;
            }
            self.odometer[position] = 0;
        }
        false
    }
}

impl StreamingIterator for Combinations {
    type Item = [Idx<Object>];

    fn advance(&mut self) {
        match self.state {
            State::Fresh => {
                if self.domains.iter().any(|d| d.is_empty()) {
                    self.state = State::Done;
                } else {
                    self.load();
                    self.state = State::Running;
                }
            }
            State::Running => {
                if self.step() {
                    self.load();
                } else {
                    self.state = State::Done;
                }
            }
            State::Done => {}
        }
    }

    fn get(&self) -> Option<&[Idx<Object>]> {
        match self.state {
            State::Done | State::Fresh => None,
            State::Running => Some(&self.tuple),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(domains: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
        let domains = domains
            .into_iter()
            .map(|d| d.into_iter().map(Idx::new).collect())
            .collect();
        let mut iter = combinations(domains);
        let mut out = Vec::new();
        while let Some(tuple) = iter.next() {
            out.push(tuple.iter().map(|o| o.raw()).collect());
        }
        out
    }

    #[test]
    fn lexicographic_order() {
        assert_eq!(
            raw(vec![vec![0, 1], vec![5, 6]]),
            vec![vec![0, 5], vec![0, 6], vec![1, 5], vec![1, 6]]
        );
    }

    #[test]
    fn empty_domain_list_yields_unit() {
        assert_eq!(raw(vec![]), vec![Vec::<u32>::new()]);
    }

    #[test]
    fn any_empty_domain_yields_nothing() {
        assert!(raw(vec![vec![1], vec![]]).is_empty());
    }
}
