//! Single-sort growth for the marker-per-size encoding

/// Picks which failed sort grows after an unsatisfiable contour round.
///
/// Most rounds weigh a candidate by the number of clause instances the
/// next round would produce; every `size_weight_ratio + 1`-th round the
/// raw size is used instead, so a sort with cheap instances cannot starve
/// the others.
#[derive(Debug, Clone)]
pub struct ContourGrowth {
    alternator: u64,
    size_weight_ratio: u32,
}

impl ContourGrowth {
    pub fn new(size_weight_ratio: u32) -> Self {
        ContourGrowth {
            alternator: 0,
            size_weight_ratio,
        }
    }

    /// Lightest sort among `failed` that can still grow; the lowest id wins
    /// ties. `instance_weight` estimates the cost of a size vector.
    pub fn choose(
        &mut self,
        failed: &[usize],
        sizes: &[u32],
        maxima: &[u32],
        instance_weight: impl Fn(&[u32]) -> u64,
    ) -> Option<usize> {
        self.alternator += 1;
        let by_instances = self.alternator % (self.size_weight_ratio as u64 + 1) != 0;

        let mut best: Option<(u64, usize)> = None;
        let mut grown = sizes.to_vec();
        for &d in failed {
            if sizes[d] >= maxima[d] {
                continue;
            }
            let weight = if by_instances {
                grown[d] += 1;
                let w = instance_weight(&grown);
                grown[d] -= 1;
                w
            } else {
                sizes[d] as u64
            };
            if best.map_or(true, |b| (weight, d) < b) {
                best = Some((weight, d));
            }
        }
        best.map(|(_, d)| d)
    }
}
