//! Batch scheduling for parallel sweeps.
//!
//! Gauss-Seidel relaxes rows against live velocities, so two rows may only
//! run concurrently when they touch disjoint state. This module greedily
//! colors the row interference graph: rows conflict when they share a
//! movable block, or when one reads the other's multiplier through a
//! friction pairing. Rows of one color form a batch that can be relaxed
//! in parallel; batches run in sequence.
//!
//! Fixed and inactive blocks carry no velocity state, so sharing one (a
//! common ground body, say) does not serialize rows.

use hashbrown::HashMap;

use impulse_types::VariableId;

use crate::constraint::Constraint;
use crate::variables::VariableSet;

/// Colors already taken by a row's neighbors.
///
/// The fast path is a 64-bit mask; colorings that need more colors spill
/// into a sorted list.
#[derive(Debug, Clone, Default)]
struct UsedColors {
    mask: u64,
    overflow: Vec<usize>,
}

impl UsedColors {
    fn insert(&mut self, color: usize) {
        if color < 64 {
            self.mask |= 1 << color;
        } else if let Err(slot) = self.overflow.binary_search(&color) {
            self.overflow.insert(slot, color);
        }
    }

    fn merge(&mut self, other: &UsedColors) {
        self.mask |= other.mask;
        for &color in &other.overflow {
            self.insert(color);
        }
    }

    fn first_free(&self) -> usize {
        if self.mask != u64::MAX {
            return (!self.mask).trailing_zeros() as usize;
        }
        let mut candidate = 64;
        for &taken in &self.overflow {
            if taken == candidate {
                candidate += 1;
            } else if taken > candidate {
                break;
            }
        }
        candidate
    }
}

/// Assignment of constraint rows to parallel-safe batches.
///
/// A coloring indexes into the constraint slice it was built from and goes
/// stale when rows are added, removed, or rebound; rebuild it whenever the
/// system's wiring changes.
#[derive(Debug, Clone, Default)]
pub struct ConstraintColoring {
    batches: Vec<Vec<usize>>,
}

impl ConstraintColoring {
    /// Greedily color the valid rows of `constraints`.
    ///
    /// Rows are visited in index order and take the lowest color their
    /// neighbors have not claimed, so the result is deterministic and each
    /// batch lists row indices in ascending order. Invalid rows are left
    /// out entirely.
    #[must_use]
    pub fn build(variables: &VariableSet, constraints: &[Constraint]) -> Self {
        // Friction rows read their paired normal row's multiplier, which is
        // shared state even when the two rows do not share a movable block.
        let mut partners: Vec<Vec<usize>> = vec![Vec::new(); constraints.len()];
        for (index, constraint) in constraints.iter().enumerate() {
            if !constraint.is_valid() {
                continue;
            }
            if let Some(normal) = constraint.kind().normal_index() {
                let paired = normal.index();
                if paired < constraints.len() && paired != index {
                    partners[index].push(paired);
                    partners[paired].push(index);
                }
            }
        }

        let mut block_colors: HashMap<VariableId, UsedColors> = HashMap::new();
        let mut colors: Vec<Option<usize>> = vec![None; constraints.len()];
        let mut batches: Vec<Vec<usize>> = Vec::new();

        for (index, constraint) in constraints.iter().enumerate() {
            if !constraint.is_valid() {
                continue;
            }

            let sides = movable_sides(variables, constraint);

            let mut used = UsedColors::default();
            for id in sides.iter().flatten() {
                if let Some(taken) = block_colors.get(id) {
                    used.merge(taken);
                }
            }
            for &partner in &partners[index] {
                if let Some(color) = colors[partner] {
                    used.insert(color);
                }
            }

            let color = used.first_free();
            colors[index] = Some(color);
            for id in sides.iter().flatten() {
                block_colors.entry(*id).or_default().insert(color);
            }

            if color >= batches.len() {
                batches.resize_with(color + 1, Vec::new);
            }
            batches[color].push(index);
        }

        tracing::debug!(
            "colored {} constraint rows into {} batches",
            colors.iter().flatten().count(),
            batches.len()
        );

        Self { batches }
    }

    /// The batches, in execution order.
    #[must_use]
    pub fn batches(&self) -> &[Vec<usize>] {
        &self.batches
    }

    /// Number of batches.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Total number of rows across all batches.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    /// Whether no row was colored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// The sides of a row whose velocities a sweep can actually write.
fn movable_sides(variables: &VariableSet, constraint: &Constraint) -> [Option<VariableId>; 2] {
    let movable = |id: VariableId| {
        variables
            .get(id)
            .is_some_and(|var| var.is_active() && var.ndof() > 0)
            .then_some(id)
    };
    [
        constraint.variable_a().and_then(movable),
        constraint.variable_b().and_then(movable),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::projection::ConstraintKind;
    use crate::variables::{InverseMass, Variable};
    use hashbrown::HashSet;
    use impulse_types::ConstraintId;

    fn chain(blocks: usize) -> (VariableSet, Vec<Constraint>) {
        let mut variables = VariableSet::new();
        let ids: Vec<_> = (0..blocks)
            .map(|_| variables.insert(Variable::new(InverseMass::identity(1))))
            .collect();
        variables.assign_offsets();

        let mut constraints = Vec::new();
        for pair in ids.windows(2) {
            let mut c =
                Constraint::between(&variables, Some(pair[0]), Some(pair[1]), ConstraintKind::Equality);
            c.set_jacobian_a(&[1.0]).unwrap();
            c.set_jacobian_b(&[-1.0]).unwrap();
            constraints.push(c);
        }
        (variables, constraints)
    }

    #[test]
    fn test_chain_alternates_two_batches() {
        let (variables, constraints) = chain(6);
        let coloring = ConstraintColoring::build(&variables, &constraints);

        assert_eq!(coloring.num_batches(), 2);
        assert_eq!(coloring.batches()[0], vec![0, 2, 4]);
        assert_eq!(coloring.batches()[1], vec![1, 3]);
        assert_eq!(coloring.num_rows(), 5);
    }

    #[test]
    fn test_batch_rows_share_no_movable_block() {
        let (variables, mut constraints) = chain(10);
        // A long-range row on top of the chain to densify the graph
        let mut extra = Constraint::between(
            &variables,
            Some(VariableId::new(0)),
            Some(VariableId::new(7)),
            ConstraintKind::Equality,
        );
        extra.set_jacobian_a(&[1.0]).unwrap();
        extra.set_jacobian_b(&[-1.0]).unwrap();
        constraints.push(extra);

        let coloring = ConstraintColoring::build(&variables, &constraints);
        for batch in coloring.batches() {
            let mut seen = HashSet::new();
            for &row in batch {
                for id in movable_sides(&variables, &constraints[row]).iter().flatten() {
                    assert!(seen.insert(*id), "batch reuses block {id}");
                }
            }
        }
    }

    #[test]
    fn test_shared_fixed_block_does_not_serialize() {
        let mut variables = VariableSet::new();
        let ground = variables.insert(Variable::fixed());
        let bodies: Vec<_> = (0..5)
            .map(|_| variables.insert(Variable::new(InverseMass::identity(1))))
            .collect();
        variables.assign_offsets();

        let constraints: Vec<_> = bodies
            .iter()
            .map(|&body| {
                let mut c = Constraint::between(
                    &variables,
                    Some(body),
                    Some(ground),
                    ConstraintKind::LowerBounded,
                );
                c.set_jacobian_a(&[1.0]).unwrap();
                c
            })
            .collect();

        let coloring = ConstraintColoring::build(&variables, &constraints);
        assert_eq!(coloring.num_batches(), 1);
        assert_eq!(coloring.batches()[0].len(), 5);
    }

    #[test]
    fn test_friction_row_separated_from_its_normal() {
        // Sides chosen so the pair shares only the fixed ground: without
        // the pairing edge both rows would land in one batch.
        let mut variables = VariableSet::new();
        let ground = variables.insert(Variable::fixed());
        let a = variables.insert(Variable::new(InverseMass::identity(1)));
        let b = variables.insert(Variable::new(InverseMass::identity(1)));
        variables.assign_offsets();

        let mut normal =
            Constraint::between(&variables, Some(a), Some(ground), ConstraintKind::LowerBounded);
        normal.set_jacobian_a(&[1.0]).unwrap();
        let mut friction = Constraint::between(
            &variables,
            Some(b),
            Some(ground),
            ConstraintKind::FrictionCone {
                normal: ConstraintId::new(0),
                friction: 0.4,
            },
        );
        friction.set_jacobian_a(&[1.0]).unwrap();

        let coloring = ConstraintColoring::build(&variables, &[normal, friction]);
        assert_eq!(coloring.num_batches(), 2);
    }

    #[test]
    fn test_invalid_rows_left_out() {
        let (variables, mut constraints) = chain(4);
        constraints.push(Constraint::new(ConstraintKind::Equality));

        let coloring = ConstraintColoring::build(&variables, &constraints);
        assert_eq!(coloring.num_rows(), 3);
        let unbound = constraints.len() - 1;
        for batch in coloring.batches() {
            assert!(!batch.contains(&unbound));
        }
    }

    #[test]
    fn test_empty_list() {
        let variables = VariableSet::new();
        let coloring = ConstraintColoring::build(&variables, &[]);
        assert!(coloring.is_empty());
        assert_eq!(coloring.num_batches(), 0);
    }

    #[test]
    fn test_used_colors_overflow_probe() {
        let mut used = UsedColors::default();
        for color in 0..64 {
            used.insert(color);
        }
        assert_eq!(used.first_free(), 64);

        used.insert(64);
        used.insert(65);
        used.insert(67);
        assert_eq!(used.first_free(), 66);
    }
}
